use std::collections::HashMap;

use super::{Notification, RawMatch};

/// Merge eligible matches into one notification per (message, target).
///
/// Groups come out in the order they are first seen, and each group's words
/// keep first-seen order with duplicates removed.
pub fn aggregate_by_target<'a, I>(matches: I) -> Vec<Notification>
where
    I: IntoIterator<Item = RawMatch<'a>>,
{
    let mut notifications: Vec<Notification> = Vec::new();
    let mut groups: HashMap<(&'a str, &'a str), usize> = HashMap::new();

    for raw in matches {
        let key = (raw.message.id.as_str(), raw.target.internal_id.as_str());
        let idx = *groups.entry(key).or_insert_with(|| {
            notifications.push(Notification {
                words: Vec::new(),
                target_external_id: raw.target.external_id.clone(),
                target_internal_id: raw.target.internal_id.clone(),
                message_id: raw.message.id.clone(),
                author_is_bot: None,
            });
            notifications.len() - 1
        });

        let words = &mut notifications[idx].words;
        if !words.iter().any(|w| w == &raw.word.text) {
            words.push(raw.word.text.clone());
        }
    }

    notifications
}

/// One notification per match, carrying the author's bot flag.
pub fn aggregate_per_match<'a, I>(matches: I) -> Vec<Notification>
where
    I: IntoIterator<Item = RawMatch<'a>>,
{
    matches
        .into_iter()
        .map(|raw| Notification {
            words: vec![raw.word.text.clone()],
            target_external_id: raw.target.external_id.clone(),
            target_internal_id: raw.target.internal_id.clone(),
            message_id: raw.message.id.clone(),
            author_is_bot: Some(raw.author.is_some_and(|a| a.is_bot)),
        })
        .collect()
}

/// Split a newline-joined word list, dropping blanks and repeats.
pub fn split_matched_words(joined: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in joined.split('\n') {
        if word.is_empty() || words.iter().any(|w| w == word) {
            continue;
        }
        words.push(word.to_string());
    }
    words
}
