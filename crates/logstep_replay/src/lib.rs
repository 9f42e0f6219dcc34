//! Logstep Replay Engine
//!
//! Reconstructs a steppable debugging session from a finished run's debug log.
//! Nothing is executed: frames, variables, and heap aliasing are rebuilt purely
//! from forward-only log evidence, and the engine decides where to pause. Heap
//! dump snapshots, when supplied, replace that evidence at their capture point.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod breakpoint;
pub mod checkpoint;
pub mod engine;
pub mod handlers;
pub mod heapdump;
pub mod stack;
pub mod state;
pub mod value;
pub mod variable;

pub use breakpoint::{ActiveBreakpoints, BreakpointIndex, LineBreakpointInfo};
pub use checkpoint::{ActionScriptType, Checkpoint, CheckpointRegistry, CheckpointUpdate};
pub use engine::{EngineOutput, ReplayConfig, ReplayEngine, StepKind, StepOutcome, StopReason};
pub use heapdump::{HeapDump, HeapDumpSet, HeapSnapshot, OverlayResult, apply_snapshot};
pub use stack::{CallStack, FrameSource, StackFrame};
pub use state::{FrameInfo, SessionState};
pub use value::PayloadValue;
pub use variable::{ChildrenId, ReferenceMap, VariableArena, VariableContainer, VariableMap};
