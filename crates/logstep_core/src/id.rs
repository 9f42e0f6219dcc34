//! Identifiers for logstep entities.
//!
//! Sessions are identified by UUIDs. Frames and variable scopes use small
//! monotonic integers because the protocol surface carries them as numbers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session identifier - one per launched replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Stack frame identifier, monotonic within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u32);

impl FrameId {
    /// Wrap a raw frame number
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw frame number
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Next identifier in sequence
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame_{}", self.0)
    }
}

/// Handle a client uses to ask for the children of a scope or variable.
///
/// Zero means "no children", matching the protocol convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariablesRef(u32);

impl VariablesRef {
    /// The "no children" handle
    pub const NONE: Self = Self(0);

    /// Wrap a raw handle
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw handle value
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this handle points at anything
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for VariablesRef {
    fn default() -> Self {
        Self::NONE
    }
}
