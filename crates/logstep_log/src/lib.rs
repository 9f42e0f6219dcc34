//! Logstep Debug Log
//!
//! Loads a finished run's debug log and turns each line into a typed event.
//! Classification is total: any line, however malformed, yields an event.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod cursor;
pub mod event;
pub mod source;

pub use classify::{Classifier, classify_line, heap_dump_marker};
pub use cursor::Cursor;
pub use event::{Assignment, DebugEvent, EventKind, EventTag, FrameSignature, HeapDumpMarker, ScopeDeclaration, UserDebug};
pub use source::{LogSource, SourceError};
