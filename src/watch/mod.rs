pub mod aggregate;
pub mod directory;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod pattern;
pub mod pipeline;

use serde::{Deserialize, Serialize};

pub use directory::UserDirectory;
pub use error::ScanError;
pub use matcher::{RawMatch, WatchCatalog};

/// A chat message waiting to be scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque message identifier
    pub id: String,
    /// Internal id of the author
    pub author_id: String,
    /// The message text
    pub content: String,
}

/// A word (or `/regex/`) a user asked to be notified about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchWord {
    pub text: String,
    /// External id of the user who registered the word
    pub owner_id: String,
    /// Notify the owner even when they wrote the message themselves
    pub notify_self: bool,
    /// Notify the owner about messages written by bots
    pub notify_from_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable, human-facing id (e.g. a username)
    pub external_id: String,
    /// Storage/platform key
    pub internal_id: String,
    pub is_bot: bool,
}

/// One alert for one user about one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Matched word texts, unique, in first-seen order
    pub words: Vec<String>,
    pub target_external_id: String,
    pub target_internal_id: String,
    pub message_id: String,
    /// Only set in per-match mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_is_bot: Option<bool>,
}

/// How matches are turned into notifications
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// One notification per (message, target) with every matched word
    #[default]
    PerTarget,
    /// One notification per (message, word, target)
    PerMatch,
}

impl std::fmt::Display for NotifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyMode::PerTarget => write!(f, "per_target"),
            NotifyMode::PerMatch => write!(f, "per_match"),
        }
    }
}

/// Run the in-process matching pass over an immutable snapshot.
///
/// Pure: the same inputs always produce the same notifications in the same
/// order.
pub fn scan(
    messages: &[Message],
    catalog: &WatchCatalog,
    users: &UserDirectory,
    mode: NotifyMode,
) -> Vec<Notification> {
    let eligible = matcher::match_messages(messages, catalog, users)
        .into_iter()
        .filter(filter::is_eligible);

    match mode {
        NotifyMode::PerTarget => aggregate::aggregate_by_target(eligible),
        NotifyMode::PerMatch => aggregate::aggregate_per_match(eligible),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn user(external_id: &str, internal_id: &str, is_bot: bool) -> User {
        User {
            external_id: external_id.to_string(),
            internal_id: internal_id.to_string(),
            is_bot,
        }
    }

    pub fn word(text: &str, owner_id: &str, notify_self: bool, notify_from_bot: bool) -> WatchWord {
        WatchWord {
            text: text.to_string(),
            owner_id: owner_id.to_string(),
            notify_self,
            notify_from_bot,
        }
    }

    pub fn message(id: &str, author_id: &str, content: &str) -> Message {
        Message {
            id: id.to_string(),
            author_id: author_id.to_string(),
            content: content.to_string(),
        }
    }

    fn directory() -> UserDirectory {
        UserDirectory::new(vec![
            user("alice", "u1", false),
            user("bob", "u2", false),
            user("robot", "u3", true),
        ])
    }

    #[test]
    fn test_literal_match_notifies_owner() {
        let catalog = WatchCatalog::compile(vec![word("hello", "alice", false, true)]);
        let messages = vec![message("m1", "u2", "Hello world")];

        let notifications = scan(&messages, &catalog, &directory(), NotifyMode::PerTarget);

        assert_eq!(
            notifications,
            vec![Notification {
                words: vec!["hello".to_string()],
                target_external_id: "alice".to_string(),
                target_internal_id: "u1".to_string(),
                message_id: "m1".to_string(),
                author_is_bot: None,
            }]
        );
    }

    #[test]
    fn test_own_message_is_suppressed() {
        let catalog = WatchCatalog::compile(vec![word("hello", "alice", false, true)]);
        let messages = vec![message("m1", "u1", "Hello world")];

        assert!(scan(&messages, &catalog, &directory(), NotifyMode::PerTarget).is_empty());
    }

    #[test]
    fn test_regex_is_case_sensitive() {
        let catalog = WatchCatalog::compile(vec![word("/foo.*bar/", "alice", false, true)]);
        let messages = vec![
            message("m1", "u2", "foo123bar"),
            message("m2", "u2", "FOO123BAR"),
        ];

        let notifications = scan(&messages, &catalog, &directory(), NotifyMode::PerTarget);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message_id, "m1");
        assert_eq!(notifications[0].words, vec!["/foo.*bar/"]);
    }

    #[test]
    fn test_bot_message_is_suppressed() {
        let catalog = WatchCatalog::compile(vec![word("x", "alice", true, false)]);
        let messages = vec![message("m1", "u3", "x marks the spot")];

        assert!(scan(&messages, &catalog, &directory(), NotifyMode::PerTarget).is_empty());
    }

    #[test]
    fn test_words_for_same_target_are_merged() {
        let catalog = WatchCatalog::compile(vec![
            word("cat", "alice", false, true),
            word("dog", "alice", false, true),
        ]);
        let messages = vec![message("m1", "u2", "my dog chased a cat")];

        let notifications = scan(&messages, &catalog, &directory(), NotifyMode::PerTarget);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].words, vec!["cat", "dog"]);
    }

    #[test]
    fn test_per_match_mode_keeps_one_record_per_word() {
        let catalog = WatchCatalog::compile(vec![
            word("cat", "alice", false, true),
            word("dog", "alice", false, true),
        ]);
        let messages = vec![message("m1", "u3", "cat and dog")];

        let notifications = scan(&messages, &catalog, &directory(), NotifyMode::PerMatch);
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].words, vec!["cat"]);
        assert_eq!(notifications[1].words, vec!["dog"]);
        assert!(notifications.iter().all(|n| n.author_is_bot == Some(true)));
    }

    #[test]
    fn test_unknown_owner_is_skipped() {
        let catalog = WatchCatalog::compile(vec![
            word("hello", "nobody", true, true),
            word("hello", "bob", true, true),
        ]);
        let messages = vec![message("m1", "u1", "hello")];

        let notifications = scan(&messages, &catalog, &directory(), NotifyMode::PerTarget);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].target_external_id, "bob");
    }

    #[test]
    fn test_scan_is_idempotent() {
        let catalog = WatchCatalog::compile(vec![
            word("dog", "alice", false, true),
            word("/c.t/", "alice", false, true),
            word("dog", "bob", true, true),
        ]);
        let messages = vec![
            message("m1", "u2", "a dog and a cat"),
            message("m2", "u1", "cut the dog"),
        ];
        let users = directory();

        let first = scan(&messages, &catalog, &users, NotifyMode::PerTarget);
        let second = scan(&messages, &catalog, &users, NotifyMode::PerTarget);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
