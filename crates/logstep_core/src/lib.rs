//! Logstep Core Types
//!
//! This crate contains pure types shared by every layer of the replay debugger.
//! Nothing here performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod id;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{FrameId, SessionId, VariablesRef};
