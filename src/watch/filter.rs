use super::RawMatch;

/// Apply the owner's self/bot notification policy to a match.
///
/// An author missing from the directory counts as neither the owner nor a bot.
pub fn is_eligible(raw: &RawMatch<'_>) -> bool {
    let author_is_target = raw
        .author
        .is_some_and(|author| author.external_id == raw.target.external_id);
    if !raw.word.notify_self && author_is_target {
        return false;
    }

    let author_is_bot = raw.author.is_some_and(|author| author.is_bot);
    if !raw.word.notify_from_bot && author_is_bot {
        return false;
    }

    true
}
