use tracing::warn;

use super::pattern::WordPattern;
use super::{Message, User, UserDirectory, WatchWord};

/// Watch words with their patterns compiled, in catalog order
#[derive(Debug, Clone, Default)]
pub struct WatchCatalog {
    entries: Vec<(WatchWord, WordPattern)>,
}

impl WatchCatalog {
    /// Compile every word once. Words that fail to compile are dropped and
    /// logged.
    pub fn compile(words: Vec<WatchWord>) -> Self {
        let entries = words
            .into_iter()
            .filter_map(|word| match WordPattern::parse(&word.text) {
                Ok(pattern) => Some((word, pattern)),
                Err(e) => {
                    warn!(
                        "Ignoring watch word {:?} of {}: {}",
                        word.text, word.owner_id, e
                    );
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A word that matched a message, before eligibility is checked
#[derive(Debug, Clone, Copy)]
pub struct RawMatch<'a> {
    pub word: &'a WatchWord,
    pub message: &'a Message,
    /// `None` when the author is not in the directory
    pub author: Option<&'a User>,
    /// The word's owner
    pub target: &'a User,
}

/// Test every message against every catalog word.
///
/// Yields at most one match per (message, word), ordered by message and then
/// by catalog position. Words whose owner is unknown are skipped.
pub fn match_messages<'a>(
    messages: &'a [Message],
    catalog: &'a WatchCatalog,
    users: &'a UserDirectory,
) -> Vec<RawMatch<'a>> {
    let mut matches = Vec::new();

    for message in messages {
        let author = users.by_internal_id(&message.author_id);
        let lower_content = message.content.to_lowercase();

        for (word, pattern) in &catalog.entries {
            let Some(target) = users.by_external_id(&word.owner_id) else {
                continue;
            };
            if pattern.is_match(&message.content, &lower_content) {
                matches.push(RawMatch {
                    word,
                    message,
                    author,
                    target,
                });
            }
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::tests::{message, user, word};

    #[test]
    fn test_invalid_regex_is_dropped_from_catalog() {
        let catalog = WatchCatalog::compile(vec![
            word("/[oops/", "alice", true, true),
            word("fine", "alice", true, true),
        ]);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_matches_follow_message_then_catalog_order() {
        let users = UserDirectory::new(vec![user("alice", "u1", false), user("bob", "u2", false)]);
        let catalog = WatchCatalog::compile(vec![
            word("b", "bob", true, true),
            word("a", "alice", true, true),
        ]);
        let messages = vec![message("m1", "u1", "a b"), message("m2", "u2", "b")];

        let matches = match_messages(&messages, &catalog, &users);
        let seen: Vec<(&str, &str)> = matches
            .iter()
            .map(|m| (m.message.id.as_str(), m.word.text.as_str()))
            .collect();
        assert_eq!(seen, vec![("m1", "b"), ("m1", "a"), ("m2", "b")]);
    }

    #[test]
    fn test_unknown_author_still_matches() {
        let users = UserDirectory::new(vec![user("alice", "u1", false)]);
        let catalog = WatchCatalog::compile(vec![word("hi", "alice", false, false)]);
        let messages = vec![message("m1", "stranger", "hi there")];

        let matches = match_messages(&messages, &catalog, &users);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].author.is_none());
        assert_eq!(matches[0].target.internal_id, "u1");
    }

    #[test]
    fn test_repeated_occurrences_match_once() {
        let users = UserDirectory::new(vec![user("alice", "u1", false)]);
        let catalog = WatchCatalog::compile(vec![word("ha", "alice", true, true)]);
        let messages = vec![message("m1", "u1", "ha ha ha")];

        assert_eq!(match_messages(&messages, &catalog, &users).len(), 1);
    }
}
