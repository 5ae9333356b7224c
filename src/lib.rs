//! Keyword alerts for group chats.
//!
//! Users register watch words (literals or `/regex/`); each scan pass matches
//! incoming messages against them and produces one notification per
//! (message, word owner), honouring each word's self and bot opt-outs.

pub mod config;
pub mod platform;
pub mod scheduler;
pub mod store;
pub mod watch;
