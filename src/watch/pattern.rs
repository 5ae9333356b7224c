use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

const PATTERN_CACHE_MAX: usize = 1024;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("watch words cannot span lines")]
    Multiline,

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// A compiled watch word.
///
/// Words written as `/.../` are regular expressions tested case-sensitively
/// against the raw message text. Anything else is a literal matched
/// case-insensitively as a substring.
#[derive(Debug, Clone)]
pub enum WordPattern {
    /// Lowercased literal
    Literal(String),
    Regex(Regex),
}

/// Whether a word uses the `/pattern/` form
pub fn is_regex_word(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('/') && text.ends_with('/')
}

impl WordPattern {
    /// Compile a word. Words containing a newline are rejected since store
    /// queries return matched words newline-joined.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        if text.contains('\n') {
            return Err(PatternError::Multiline);
        }
        if is_regex_word(text) {
            let body = text.trim_matches('/');
            Ok(WordPattern::Regex(Regex::new(body)?))
        } else {
            Ok(WordPattern::Literal(text.to_lowercase()))
        }
    }

    /// Test a message. `lower_content` must be `content.to_lowercase()`;
    /// callers scanning many words compute it once per message.
    pub fn is_match(&self, content: &str, lower_content: &str) -> bool {
        match self {
            WordPattern::Literal(word) => !word.is_empty() && lower_content.contains(word.as_str()),
            WordPattern::Regex(re) => re.is_match(content),
        }
    }
}

/// One-shot check of `word` against `content`. Unusable words never match.
pub fn word_matches(word: &str, content: &str) -> bool {
    match WordPattern::parse(word) {
        Ok(pattern) => pattern.is_match(content, &content.to_lowercase()),
        Err(_) => false,
    }
}

/// Compiled words keyed by their text, shared by every call of the store's
/// `word_matches` SQL function.
///
/// Unusable words are cached as `None` and logged once. The cache is
/// cleared when it reaches its bound.
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: RwLock<HashMap<String, Option<WordPattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, word: &str) -> Option<WordPattern> {
        if let Ok(guard) = self.patterns.read() {
            if let Some(pattern) = guard.get(word) {
                return pattern.clone();
            }
        }

        let compiled = match WordPattern::parse(word) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Ignoring watch word {:?}: {}", word, e);
                None
            }
        };

        if let Ok(mut guard) = self.patterns.write() {
            if guard.len() >= PATTERN_CACHE_MAX {
                guard.clear();
            }
            guard.insert(word.to_string(), compiled.clone());
        }

        compiled
    }

    pub fn is_match(&self, word: &str, content: &str) -> bool {
        self.get(word)
            .is_some_and(|pattern| pattern.is_match(content, &content.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.patterns.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
