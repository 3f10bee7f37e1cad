//! Conversations, their message streams and per-participant unread state.

pub mod directory;
pub mod live;
pub mod stream;
pub mod unread;
