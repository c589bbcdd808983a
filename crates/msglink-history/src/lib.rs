//! Ordered message history for msglink
//!
//! This crate provides:
//! - `MessageId`, the packed 64-bit message identifier
//! - `OrderedMessages`, a treap of known messages that tracks which
//!   neighbors are known to be adjacent
//! - `Cursor`, a gap-aware bidirectional cursor over the treap

#![forbid(unsafe_code)]

pub mod message_id;
pub mod ordered;

#[cfg(test)]
mod proptest_generators;

pub use message_id::MessageId;
pub use ordered::{AttachInfo, Cursor, Iter, OrderedMessage, OrderedMessages};
