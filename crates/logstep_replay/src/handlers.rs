//! Event handlers.
//!
//! One exhaustive match applies a [`DebugEvent`] to the session state. The
//! return value says whether the event is pause-eligible: only the entry line
//! and executed statements are.

use crate::breakpoint::BreakpointIndex;
use crate::engine::EngineOutput;
use crate::stack::FrameSource;
use crate::state::SessionState;
use logstep_core::constants::EXEC_ANON_SIGNATURE;
use logstep_log::{DebugEvent, FrameSignature, LogSource, UserDebug};
use std::collections::BTreeMap;

/// Anonymous script line to log line table.
///
/// Each `Execute Anonymous:` marker line lists one script line, in order, so
/// the n-th marker maps script line n to the marker's position in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecAnonMapping {
    lines: BTreeMap<u32, u32>,
}

impl ExecAnonMapping {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a marker seen at a zero-based log position
    pub fn record(&mut self, position: usize) {
        let script_line = u32::try_from(self.lines.len() + 1).unwrap_or(u32::MAX);
        let log_line = u32::try_from(position + 1).unwrap_or(u32::MAX);
        self.lines.insert(script_line, log_line);
    }

    /// Log line for a script line; unmapped lines pass through
    #[must_use]
    pub fn translate(&self, script_line: u32) -> u32 {
        self.lines.get(&script_line).copied().unwrap_or(script_line)
    }

    /// Number of recorded markers
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no marker has been seen
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Read-only inputs the handlers consult
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Signature to file lookup
    pub index: &'a BreakpointIndex,
    /// The log being replayed
    pub log: &'a LogSource,
    /// Anonymous script line table
    pub exec_anon: &'a ExecAnonMapping,
}

impl HandlerContext<'_> {
    fn log_source(&self) -> FrameSource {
        FrameSource {
            name: self.log.name().to_string(),
            path: self.log.path().to_string_lossy().into_owned(),
        }
    }

    /// Source file for a signature, if it is user code
    #[must_use]
    pub fn source_for(&self, signature: &str) -> Option<FrameSource> {
        if signature == EXEC_ANON_SIGNATURE {
            return Some(self.log_source());
        }
        let source = self.index.file_for_signature(signature).map(FrameSource::from_path);
        if source.is_none() {
            tracing::trace!(signature, "no source for signature");
        }
        source
    }
}

/// Apply one event; returns whether it is pause-eligible
pub fn handle(
    state: &mut SessionState,
    ctx: &HandlerContext<'_>,
    event: &DebugEvent,
    output: &mut Vec<EngineOutput>,
) -> bool {
    match event {
        DebugEvent::LogEntry => {
            state.push_frame(ctx.log.name().to_string(), Some(ctx.log_source()), 1);
            true
        }
        DebugEvent::FrameEntry(frame) => {
            enter_frame(state, ctx, frame);
            false
        }
        DebugEvent::FrameExit(frame) => {
            let removed = state.exit_frame(&frame.name);
            if removed == 0 {
                tracing::trace!(name = %frame.name, "frame exit without matching entry");
            }
            false
        }
        DebugEvent::StatementExecute { line } => {
            execute_statement(state, ctx, *line);
            true
        }
        DebugEvent::VariableScopeBegin(declaration) => {
            state.declare(declaration);
            false
        }
        DebugEvent::VariableAssignment(assignment) => {
            state.assign(assignment);
            false
        }
        DebugEvent::UserDebug(debug) => {
            output.push(user_output(state, debug));
            false
        }
        DebugEvent::NoOp => false,
    }
}

fn enter_frame(state: &mut SessionState, ctx: &HandlerContext<'_>, frame: &FrameSignature) {
    let source = ctx.source_for(&frame.signature);
    state.push_frame(frame.name.clone(), source, 0);
}

fn execute_statement(state: &mut SessionState, ctx: &HandlerContext<'_>, line: u32) {
    if let Some(top) = state.top_frame_mut() {
        top.line = if top.name == EXEC_ANON_SIGNATURE {
            ctx.exec_anon.translate(line)
        } else {
            line
        };
    }
}

fn user_output(state: &SessionState, debug: &UserDebug) -> EngineOutput {
    EngineOutput::UserDebug {
        message: debug.message.clone(),
        level: debug.level.clone(),
        source: state.stack().peek().and_then(|frame| frame.source.clone()),
        line: debug.line,
    }
}
