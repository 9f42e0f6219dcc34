//! Replay engine.
//!
//! Walks the log forward one line at a time, applying each classified event to
//! the session state, and decides where execution appears to pause.

use crate::breakpoint::{ActiveBreakpoints, BreakpointIndex};
use crate::handlers::{ExecAnonMapping, HandlerContext, handle};
use crate::heapdump::{HeapDump, HeapDumpSet, OverlayResult, apply_snapshot};
use crate::stack::{CallStack, FrameSource};
use crate::state::SessionState;
use logstep_core::constants::EXEC_ANON_MARKER;
use logstep_core::{CoreResult, SessionId};
use logstep_log::{Classifier, Cursor, EventKind, HeapDumpMarker, LogSource, heap_dump_marker};
use serde::{Deserialize, Serialize};

/// Replay engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Pause on the log's first line before running
    pub stop_on_entry: bool,
    /// Refuse logs whose header lacks the required log levels
    pub check_log_levels: bool,
    /// Echo every processed line except user debug output
    pub echo_log_lines: bool,
}

/// Granularity of a resume request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Continue until a breakpoint
    Run,
    /// Next statement in this frame or a caller
    Over,
    /// Next statement anywhere
    In,
    /// Next statement in a caller
    Out,
}

impl StepKind {
    /// Whether a pause at depth `current` satisfies a step begun at depth `previous`
    #[must_use]
    pub const fn is_satisfied(self, previous: usize, current: usize) -> bool {
        match self {
            Self::Run => false,
            Self::Over => current != 0 && current <= previous,
            Self::In => current >= previous,
            Self::Out => current != 0 && current < previous,
        }
    }
}

/// Why the engine paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// Stopped on the first line
    Entry,
    /// A step completed
    Step,
    /// A breakpoint was hit
    Breakpoint,
}

impl StopReason {
    /// Reason text used on the protocol surface
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Step => "step",
            Self::Breakpoint => "breakpoint",
        }
    }
}

/// Result of a resume request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Execution paused
    Stopped(StopReason),
    /// The log is exhausted
    Terminated,
}

/// Text produced while replaying, for the host's debug console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineOutput {
    /// A user debug statement
    UserDebug {
        /// Message text
        message: String,
        /// Logging level
        level: String,
        /// Source of the frame that logged it
        source: Option<FrameSource>,
        /// Line of the debug statement
        line: u32,
    },
    /// A raw log line, echoed when tracing is on
    LogLine(String),
    /// Something about the log the user should know
    Warning(String),
}

/// Replay engine for one debug session
#[derive(Debug)]
pub struct ReplayEngine {
    id: SessionId,
    config: ReplayConfig,
    source: LogSource,
    index: BreakpointIndex,
    breakpoints: ActiveBreakpoints,
    cursor: Cursor,
    classifier: Classifier,
    state: SessionState,
    exec_anon: ExecAnonMapping,
    last_kind: Option<EventKind>,
    terminated: bool,
    output: Vec<EngineOutput>,
    heap_dumps: HeapDumpSet,
    last_heap_dump: Option<HeapDumpMarker>,
    saved_state: Option<SessionState>,
}

impl ReplayEngine {
    /// Create an engine over a loaded log
    #[must_use]
    pub fn new(source: LogSource, index: BreakpointIndex) -> Self {
        let (heap_dumps, warnings) = HeapDumpSet::scan(&source);
        Self {
            id: SessionId::new(),
            config: ReplayConfig::default(),
            source,
            index,
            breakpoints: ActiveBreakpoints::new(),
            cursor: Cursor::new(),
            classifier: Classifier::new(),
            state: SessionState::new(),
            exec_anon: ExecAnonMapping::new(),
            last_kind: None,
            terminated: false,
            output: warnings.into_iter().map(EngineOutput::Warning).collect(),
            heap_dumps,
            last_heap_dump: None,
            saved_state: None,
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate a log and create an engine for it
    ///
    /// # Errors
    ///
    /// Returns an error if the log has no content, or if log levels are
    /// checked and the header does not enable them.
    pub fn launch(source: LogSource, index: BreakpointIndex, config: ReplayConfig) -> CoreResult<Self> {
        source.validate(config.check_log_levels)?;
        let engine = Self::new(source, index).with_config(config);
        tracing::info!(
            session = %engine.id,
            log = engine.source.name(),
            lines = engine.source.non_blank_count(),
            "replay session started"
        );
        Ok(engine)
    }

    /// Consume lines until a pause-eligible event; returns whether one was found
    pub fn advance(&mut self) -> bool {
        if let Some(saved) = self.saved_state.take() {
            self.state = saved;
        }
        if self.last_kind == Some(EventKind::LogEntry) {
            self.state.pop_frame();
        }
        while let Some((position, line)) = self.cursor.advance(&self.source) {
            if self.classifier.has_started() && line.starts_with(EXEC_ANON_MARKER) {
                self.exec_anon.record(position);
            }
            let event = self.classifier.classify(line);
            if event.is_noop() {
                if let Some(marker) = heap_dump_marker(line) {
                    self.last_heap_dump = Some(marker);
                }
            }
            if self.config.echo_log_lines && !matches!(event.kind(), EventKind::UserDebug) {
                self.output.push(EngineOutput::LogLine(line.to_string()));
            }
            let ctx = HandlerContext {
                index: &self.index,
                log: &self.source,
                exec_anon: &self.exec_anon,
            };
            let paused = handle(&mut self.state, &ctx, &event, &mut self.output);
            self.last_kind = Some(event.kind());
            if paused {
                return true;
            }
        }
        false
    }

    /// Run until the step is satisfied, a breakpoint is hit, or the log ends
    pub fn resume(&mut self, kind: StepKind) -> StepOutcome {
        if self.terminated {
            return StepOutcome::Terminated;
        }
        let previous = self.state.stack().len();
        while self.cursor.has_more(&self.source) {
            if !self.advance() {
                break;
            }
            let current = self.state.stack().len();
            if kind.is_satisfied(previous, current) {
                tracing::debug!(?kind, previous, current, "step complete");
                return StepOutcome::Stopped(StopReason::Step);
            }
            if self.at_breakpoint() {
                return StepOutcome::Stopped(StopReason::Breakpoint);
            }
        }
        self.terminate()
    }

    /// Advance to the first pause for a stop-on-entry launch
    pub fn start_at_entry(&mut self) -> StepOutcome {
        if !self.terminated && self.advance() {
            StepOutcome::Stopped(StopReason::Entry)
        } else {
            self.terminate()
        }
    }

    fn terminate(&mut self) -> StepOutcome {
        if !self.terminated {
            tracing::info!(
                session = %self.id,
                lines = self.classifier.classified(),
                "replay reached end of log"
            );
        }
        self.terminated = true;
        StepOutcome::Terminated
    }

    /// Whether the innermost frame sits on an active breakpoint
    #[must_use]
    pub fn at_breakpoint(&self) -> bool {
        let Some(top) = self.state.stack().peek() else {
            return false;
        };
        let Some(source) = &top.source else {
            return false;
        };
        let hit = top.line != 0 && self.breakpoints.contains(&source.path, top.line);
        if hit {
            tracing::debug!(file = %source.path, line = top.line, "breakpoint hit");
        }
        hit
    }

    /// Replace the active breakpoints of a file with the lines that can bind.
    ///
    /// Returns, per requested line, whether it was verified.
    pub fn set_breakpoints(&mut self, file: &str, lines: &[u32]) -> Vec<bool> {
        let verified: Vec<bool> = lines.iter().map(|line| self.index.can_bind(file, *line)).collect();
        let bound = lines
            .iter()
            .zip(&verified)
            .filter(|(_, ok)| **ok)
            .map(|(line, _)| *line);
        self.breakpoints.set(file, bound);
        tracing::debug!(file, requested = lines.len(), active = self.breakpoints.lines_for(file).len(), "set breakpoints");
        verified
    }

    /// Attach heap dump snapshots by id; returns how many matched a dump in the log
    pub fn attach_overlay_results(&mut self, results: impl IntoIterator<Item = OverlayResult>) -> usize {
        let attached = self.heap_dumps.attach(results);
        tracing::debug!(session = %self.id, attached, dumps = self.heap_dumps.len(), "overlay results attached");
        attached
    }

    /// Dump for the innermost frame, when the replay has just passed its marker
    #[must_use]
    pub fn heap_dump_for_top_frame(&self) -> Option<&HeapDump> {
        let top = self.state.stack().peek()?;
        let seen = self.last_heap_dump.as_ref()?;
        let dump = self.heap_dumps.for_location(&top.name, top.line)?;
        (top.name.contains(&seen.class_name) && top.line == seen.line).then_some(dump)
    }

    /// Show the innermost frame's variables as its heap dump captured them.
    ///
    /// Applies at most once per marker. The log-derived state comes back on
    /// the next advance. Returns the id of the dump applied.
    pub fn apply_heap_dump(&mut self) -> Option<String> {
        let dump = self.heap_dump_for_top_frame()?;
        let id = dump.marker.id.clone();
        let snapshot = dump.overlay.as_ref().map(|overlay| overlay.heap_dump.clone());
        self.last_heap_dump = None;
        let Some(snapshot) = snapshot else {
            tracing::debug!(heap_dump = %id, "no overlay result for heap dump");
            return None;
        };
        let info = self.state.top_frame_info()?;
        let running_trigger = self.is_running_trigger();
        if self.saved_state.is_none() {
            self.saved_state = Some(self.state.clone());
        }
        let replaced = apply_snapshot(&mut self.state, info, &snapshot, running_trigger);
        tracing::info!(session = %self.id, heap_dump = %id, replaced, "heap dump applied");
        Some(id)
    }

    /// Whether the innermost frame runs a trigger body
    fn is_running_trigger(&self) -> bool {
        self.state
            .stack()
            .peek()
            .and_then(|frame| frame.source.as_ref())
            .is_some_and(|source| source.name.to_lowercase().ends_with(".trigger"))
    }

    /// Whether variables currently come from a heap dump
    #[must_use]
    pub const fn is_showing_heap_dump(&self) -> bool {
        self.saved_state.is_some()
    }

    /// Heap dumps announced by the log
    #[must_use]
    pub const fn heap_dumps(&self) -> &HeapDumpSet {
        &self.heap_dumps
    }

    /// Take the console output produced since the last call
    pub fn drain_output(&mut self) -> Vec<EngineOutput> {
        std::mem::take(&mut self.output)
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// The log being replayed
    #[must_use]
    pub const fn source(&self) -> &LogSource {
        &self.source
    }

    /// Breakpoint binding index
    #[must_use]
    pub const fn breakpoint_index(&self) -> &BreakpointIndex {
        &self.index
    }

    /// Verified breakpoints in effect
    #[must_use]
    pub const fn breakpoints(&self) -> &ActiveBreakpoints {
        &self.breakpoints
    }

    /// Reconstructed session state
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current call stack
    #[must_use]
    pub fn stack(&self) -> &CallStack {
        self.state.stack()
    }

    /// Anonymous script line table built so far
    #[must_use]
    pub const fn exec_anon(&self) -> &ExecAnonMapping {
        &self.exec_anon
    }

    /// Whether lines remain to replay
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.terminated && self.cursor.has_more(&self.source)
    }

    /// Whether the end of the log has been reported
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of lines classified so far
    #[must_use]
    pub const fn lines_classified(&self) -> usize {
        self.classifier.classified()
    }

    /// Number of non-blank lines the cursor has visited
    #[must_use]
    pub const fn cursor_advances(&self) -> usize {
        self.cursor.advances()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::LineBreakpointInfo;
    use proptest::prelude::*;

    const HEADER: &str = "48.0 APEX_CODE,FINEST;APEX_PROFILING,INFO;VISUALFORCE,FINER;";
    const CLASS_URI: &str = "file:///proj/classes/MyClass.cls";

    fn index() -> BreakpointIndex {
        BreakpointIndex::from_info(&[LineBreakpointInfo {
            uri: CLASS_URI.to_string(),
            typeref: "MyClass".to_string(),
            lines: vec![2, 5, 6],
        }])
    }

    fn simple_log() -> LogSource {
        let text = [
            HEADER,
            "12:00:00.0 (1)|CODE_UNIT_STARTED|[EXTERNAL]|MyClass",
            "12:00:00.0 (2)|STATEMENT_EXECUTE|[5]",
            "12:00:00.0 (3)|CODE_UNIT_FINISHED|MyClass",
        ]
        .join("\n");
        LogSource::from_contents("/logs/simple.log", &text)
    }

    fn nested_log() -> LogSource {
        let text = [
            HEADER,
            "t|CODE_UNIT_STARTED|[EXTERNAL]|MyClass",
            "t|STATEMENT_EXECUTE|[2]",
            "t|METHOD_ENTRY|[2]|01p|MyClass.helper()",
            "t|STATEMENT_EXECUTE|[5]",
            "t|STATEMENT_EXECUTE|[6]",
            "t|METHOD_EXIT|[2]|01p|MyClass.helper()",
            "t|STATEMENT_EXECUTE|[3]",
            "t|CODE_UNIT_FINISHED|MyClass",
        ]
        .join("\n");
        LogSource::from_contents("/logs/nested.log", &text)
    }

    /// Run the way a client without stop-on-entry does, collecting outcomes until termination
    fn run_to_end(engine: &mut ReplayEngine) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let outcome = engine.resume(StepKind::Run);
            outcomes.push(outcome);
            if outcome == StepOutcome::Terminated {
                return outcomes;
            }
        }
    }

    #[test]
    fn test_run_without_breakpoints_terminates_once() {
        let mut engine = ReplayEngine::new(simple_log(), index());
        let outcomes = run_to_end(&mut engine);
        assert_eq!(outcomes, vec![StepOutcome::Terminated]);
        assert!(engine.is_terminated());
        assert!(engine.stack().is_empty());
    }

    #[test]
    fn test_breakpoint_stops_before_termination() {
        let mut engine = ReplayEngine::new(simple_log(), index());
        assert_eq!(engine.set_breakpoints(CLASS_URI, &[5]), vec![true]);
        let outcomes = run_to_end(&mut engine);
        assert_eq!(
            outcomes,
            vec![StepOutcome::Stopped(StopReason::Breakpoint), StepOutcome::Terminated]
        );
    }

    #[test]
    fn test_breakpoint_top_frame() {
        let mut engine = ReplayEngine::new(simple_log(), index());
        engine.set_breakpoints(CLASS_URI, &[5]);
        assert_eq!(engine.resume(StepKind::Run), StepOutcome::Stopped(StopReason::Breakpoint));
        let top = engine.stack().peek().unwrap();
        assert_eq!(top.line, 5);
        assert_eq!(top.name, "MyClass");
        assert_eq!(top.source.as_ref().unwrap().path, CLASS_URI);
    }

    #[test]
    fn test_unverified_breakpoint_is_not_active() {
        let mut engine = ReplayEngine::new(simple_log(), index());
        assert_eq!(engine.set_breakpoints(CLASS_URI, &[4, 5]), vec![false, true]);
        assert_eq!(engine.breakpoints().lines_for(CLASS_URI), vec![5]);
        assert_eq!(engine.set_breakpoints("file:///other.cls", &[1]), vec![false]);
    }

    #[test]
    fn test_stop_on_entry() {
        let config = ReplayConfig {
            stop_on_entry: true,
            ..ReplayConfig::default()
        };
        let mut engine = ReplayEngine::launch(simple_log(), index(), config).unwrap();
        assert_eq!(engine.start_at_entry(), StepOutcome::Stopped(StopReason::Entry));
        assert_eq!(engine.stack().len(), 1);
        let root = engine.stack().peek().unwrap();
        assert_eq!(root.name, "simple.log");
        assert_eq!(root.line, 1);
        assert_eq!(root.source.as_ref().unwrap().path, "/logs/simple.log");

        assert_eq!(engine.resume(StepKind::In), StepOutcome::Stopped(StopReason::Step));
        assert_eq!(engine.stack().len(), 1);
        assert_eq!(engine.stack().peek().unwrap().name, "MyClass");
    }

    #[test]
    fn test_step_over_skips_callee() {
        let mut engine = ReplayEngine::new(nested_log(), index());
        engine.start_at_entry();
        assert_eq!(engine.resume(StepKind::In), StepOutcome::Stopped(StopReason::Step));
        assert_eq!(engine.stack().peek().unwrap().line, 2);

        assert_eq!(engine.resume(StepKind::Over), StepOutcome::Stopped(StopReason::Step));
        let top = engine.stack().peek().unwrap();
        assert_eq!(top.name, "MyClass");
        assert_eq!(top.line, 3);
    }

    #[test]
    fn test_step_in_and_out() {
        let mut engine = ReplayEngine::new(nested_log(), index());
        engine.start_at_entry();
        engine.resume(StepKind::In);
        assert_eq!(engine.resume(StepKind::In), StepOutcome::Stopped(StopReason::Step));
        assert_eq!(engine.stack().len(), 2);
        assert_eq!(engine.stack().peek().unwrap().line, 5);

        assert_eq!(engine.resume(StepKind::Out), StepOutcome::Stopped(StopReason::Step));
        assert_eq!(engine.stack().len(), 1);
        assert_eq!(engine.stack().peek().unwrap().line, 3);

        assert_eq!(engine.resume(StepKind::Out), StepOutcome::Terminated);
        assert_eq!(engine.resume(StepKind::Run), StepOutcome::Terminated);
    }

    #[test]
    fn test_breakpoint_inside_callee_during_step_over() {
        let mut engine = ReplayEngine::new(nested_log(), index());
        engine.set_breakpoints(CLASS_URI, &[6]);
        engine.start_at_entry();
        engine.resume(StepKind::In);
        assert_eq!(engine.resume(StepKind::Over), StepOutcome::Stopped(StopReason::Breakpoint));
        assert_eq!(engine.stack().peek().unwrap().name, "MyClass.helper()");
    }

    #[test]
    fn test_exec_anon_markers() {
        let text = [
            HEADER,
            "Execute Anonymous: Integer i = 1;",
            "Execute Anonymous: i++;",
            "t|CODE_UNIT_STARTED|[EXTERNAL]|execute_anonymous_apex",
            "t|STATEMENT_EXECUTE|[2]",
            "t|CODE_UNIT_FINISHED|execute_anonymous_apex",
        ]
        .join("\n");
        let mut engine = ReplayEngine::new(LogSource::from_contents("/logs/anon.log", &text), index());
        engine.start_at_entry();
        engine.resume(StepKind::In);
        assert_eq!(engine.exec_anon().len(), 2);
        let top = engine.stack().peek().unwrap();
        assert_eq!(top.name, "execute_anonymous_apex");
        assert_eq!(top.line, 3);
    }

    #[test]
    fn test_user_debug_output_and_echo() {
        let text = [
            HEADER,
            "t|CODE_UNIT_STARTED|[EXTERNAL]|MyClass",
            "t|USER_DEBUG|[2]|DEBUG|hello",
            "t|CODE_UNIT_FINISHED|MyClass",
        ]
        .join("\n");
        let config = ReplayConfig {
            echo_log_lines: true,
            ..ReplayConfig::default()
        };
        let mut engine = ReplayEngine::new(LogSource::from_contents("/logs/u.log", &text), index()).with_config(config);
        engine.resume(StepKind::Run);
        let output = engine.drain_output();
        let debug_count = output
            .iter()
            .filter(|o| matches!(o, EngineOutput::UserDebug { message, .. } if message == "hello"))
            .count();
        let echoed = output.iter().filter(|o| matches!(o, EngineOutput::LogLine(_))).count();
        assert_eq!(debug_count, 1);
        assert_eq!(echoed, 3);
        assert!(engine.drain_output().is_empty());
    }

    fn heap_dump_log() -> LogSource {
        let text = [
            HEADER,
            "t|CODE_UNIT_STARTED|[EXTERNAL]|MyClass",
            "t|METHOD_ENTRY|[1]|01p|MyClass.run()",
            "t|VARIABLE_SCOPE_BEGIN|[5]|theInt|Integer|false|false",
            "t|VARIABLE_ASSIGNMENT|[5]|theInt|1",
            "t|HEAP_DUMP|[6]|1ct01|MyClass||6",
            "t|STATEMENT_EXECUTE|[6]",
            "t|VARIABLE_ASSIGNMENT|[6]|theInt|2",
            "t|STATEMENT_EXECUTE|[7]",
            "t|HEAP_DUMP|[8]|1ct02|MyClass",
            "t|METHOD_EXIT|[1]|01p|MyClass.run()",
            "t|CODE_UNIT_FINISHED|MyClass",
        ]
        .join("\n");
        LogSource::from_contents("/logs/heap.log", &text)
    }

    fn overlay(id: &str, value: i64) -> OverlayResult {
        serde_json::from_value(serde_json::json!({
            "Id": id,
            "HeapDump": { "extents": [{
                "typeName": "Integer",
                "extent": [{ "address": "0x1", "symbols": ["theInt"], "value": { "value": value } }]
            }]}
        }))
        .unwrap()
    }

    fn local(engine: &ReplayEngine, name: &str) -> String {
        let info = engine.state().top_frame_info().unwrap();
        engine.state().arena().container(info.locals, name).unwrap().value.clone()
    }

    #[test]
    fn test_malformed_heap_dump_line_warns() {
        let mut engine = ReplayEngine::new(heap_dump_log(), index());
        assert_eq!(engine.heap_dumps().len(), 1);
        assert_eq!(
            engine.drain_output(),
            vec![EngineOutput::Warning(
                "Malformed log line 10: t|HEAP_DUMP|[8]|1ct02|MyClass".to_string()
            )]
        );
    }

    #[test]
    fn test_heap_dump_applied_then_reverted() {
        let mut engine = ReplayEngine::new(heap_dump_log(), index());
        assert_eq!(engine.attach_overlay_results([overlay("1ct01", 5)]), 1);
        engine.start_at_entry();
        assert_eq!(engine.resume(StepKind::In), StepOutcome::Stopped(StopReason::Step));
        assert_eq!(engine.stack().peek().unwrap().line, 6);
        assert_eq!(local(&engine, "theInt"), "1");

        assert_eq!(engine.apply_heap_dump().as_deref(), Some("1ct01"));
        assert!(engine.is_showing_heap_dump());
        assert_eq!(local(&engine, "theInt"), "5");
        assert_eq!(engine.apply_heap_dump(), None);

        assert_eq!(engine.resume(StepKind::In), StepOutcome::Stopped(StopReason::Step));
        assert!(!engine.is_showing_heap_dump());
        assert_eq!(engine.stack().peek().unwrap().line, 7);
        assert_eq!(local(&engine, "theInt"), "2");
        assert_eq!(engine.apply_heap_dump(), None);
    }

    #[test]
    fn test_heap_dump_without_overlay_is_skipped() {
        let mut engine = ReplayEngine::new(heap_dump_log(), index());
        engine.start_at_entry();
        engine.resume(StepKind::In);
        assert!(engine.heap_dump_for_top_frame().is_some());
        assert_eq!(engine.apply_heap_dump(), None);
        assert!(!engine.is_showing_heap_dump());
        assert_eq!(local(&engine, "theInt"), "1");
    }

    #[test]
    fn test_launch_rejects_empty_log() {
        let source = LogSource::from_contents("/logs/empty.log", "\n\n");
        let err = ReplayEngine::launch(source, index(), ReplayConfig::default()).unwrap_err();
        assert!(matches!(err, logstep_core::CoreError::EmptyLog { .. }));
    }

    #[test]
    fn test_launch_checks_levels_when_asked() {
        let source = LogSource::from_contents("/logs/l.log", "48.0 APEX_CODE,DEBUG;\nt|STATEMENT_EXECUTE|[1]");
        let config = ReplayConfig {
            check_log_levels: true,
            ..ReplayConfig::default()
        };
        assert!(ReplayEngine::launch(source.clone(), index(), config).is_err());
        assert!(ReplayEngine::launch(source, index(), ReplayConfig::default()).is_ok());
    }

    #[test]
    fn test_step_predicates() {
        assert!(!StepKind::Run.is_satisfied(1, 1));
        assert!(StepKind::Over.is_satisfied(2, 2));
        assert!(!StepKind::Over.is_satisfied(2, 3));
        assert!(!StepKind::Over.is_satisfied(2, 0));
        assert!(StepKind::In.is_satisfied(2, 3));
        assert!(StepKind::In.is_satisfied(0, 0));
        assert!(StepKind::Out.is_satisfied(2, 1));
        assert!(!StepKind::Out.is_satisfied(2, 2));
    }

    proptest::proptest! {
        #[test]
        fn prop_full_replay_classifies_each_line_once(
            lines in proptest::collection::vec(
                prop_oneof![
                    Just(String::new()),
                    Just("t|STATEMENT_EXECUTE|[3]".to_string()),
                    Just("t|METHOD_ENTRY|[1]|01p|MyClass.go()".to_string()),
                    Just("t|METHOD_EXIT|[1]|01p|MyClass.go()".to_string()),
                    Just("t|USER_DEBUG|[4]|DEBUG|x".to_string()),
                    "[a-z|]{0,10}",
                ],
                0..30,
            )
        ) {
            let mut all = vec![HEADER.to_string()];
            all.extend(lines);
            let source = LogSource::from_contents("/logs/p.log", &all.join("\n"));
            let expected = source.non_blank_count();
            let mut engine = ReplayEngine::new(source, index());
            while engine.resume(StepKind::In) != StepOutcome::Terminated {}
            prop_assert_eq!(engine.cursor_advances(), expected);
            prop_assert_eq!(engine.lines_classified(), expected);
        }
    }
}
