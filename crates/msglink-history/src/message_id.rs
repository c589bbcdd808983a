//! Packed message identifiers.
//!
//! The server-assigned id lives in bits 20 and up. The low 20 bits hold
//! local ordering data: bit 2 marks a scheduled message and the two low
//! bits carry the message type.

use std::fmt;

const SERVER_ID_SHIFT: u32 = 20;
const MAX_SERVER_ID: i64 = 0x7FFF_FFFF;
const SHORT_TYPE_MASK: i64 = (1 << SERVER_ID_SHIFT) - 1;
const SCHEDULED_MASK: i64 = 4;
const TYPE_MASK: i64 = 3;
const TYPE_YET_UNSENT: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageId(i64);

impl MessageId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Id of the message the server numbered `server_id`.
    #[must_use]
    pub fn from_server(server_id: i32) -> Self {
        Self(i64::from(server_id) << SERVER_ID_SHIFT)
    }

    #[must_use]
    pub const fn min() -> Self {
        Self(TYPE_YET_UNSENT)
    }

    #[must_use]
    pub const fn max() -> Self {
        Self(MAX_SERVER_ID << SERVER_ID_SHIFT)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn server_id(self) -> i64 {
        self.0 >> SERVER_ID_SHIFT
    }

    #[must_use]
    pub const fn is_scheduled(self) -> bool {
        self.0 & SCHEDULED_MASK != 0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0 && self.0 <= Self::max().0 && !self.is_scheduled()
    }

    #[must_use]
    pub const fn is_server(self) -> bool {
        self.0 & SHORT_TYPE_MASK == 0
    }

    #[must_use]
    pub const fn is_yet_unsent(self) -> bool {
        self.0 & TYPE_MASK == TYPE_YET_UNSENT
    }
}

/// Server ids print as the plain server number; local ids as
/// `server.local`.
impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_server() {
            write!(f, "{}", self.server_id())
        } else {
            write!(f, "{}.{}", self.server_id(), self.0 & SHORT_TYPE_MASK)
        }
    }
}
