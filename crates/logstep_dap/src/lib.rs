//! Logstep Debug Adapter
//!
//! Serves a replayed debug log to a debugger front end over the debug adapter
//! protocol. The adapter owns one replay session at a time and answers every
//! request synchronously.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod protocol;
pub mod server;

pub use adapter::{DebugAdapter, Session};
pub use protocol::{Capabilities, Event, LaunchArguments, ProtocolMessage, Request, Response, TraceSettings};
pub use server::{DapServer, ServerError};
