//! Debug adapter protocol messages.
//!
//! Only the subset of the protocol the replay adapter speaks is modelled.
//! Incoming requests keep their arguments as raw JSON; each handler decodes
//! the argument type it needs.

use logstep_core::{FrameId, VariablesRef};
use logstep_replay::{Checkpoint, LineBreakpointInfo, OverlayResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of every outgoing message, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    /// Client request
    Request(Request),
    /// Reply to a request
    Response(Response),
    /// Asynchronous notification
    Event(Event),
}

impl ProtocolMessage {
    /// Stamp the outgoing sequence number
    pub fn set_seq(&mut self, seq: i64) {
        match self {
            Self::Request(request) => request.seq = seq,
            Self::Response(response) => response.seq = seq,
            Self::Event(event) => event.seq = seq,
        }
    }

    /// The event, if this message is one
    #[must_use]
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    /// The response, if this message is one
    #[must_use]
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// Client request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Client sequence number
    pub seq: i64,
    /// Command name
    pub command: String,
    /// Command arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl Request {
    /// Build a request, mostly for tests and tooling
    #[must_use]
    pub fn new(seq: i64, command: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            seq,
            command: command.into(),
            arguments,
        }
    }
}

/// Reply to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Adapter sequence number
    pub seq: i64,
    /// Sequence number of the request being answered
    pub request_seq: i64,
    /// Whether the request succeeded
    pub success: bool,
    /// Command being answered
    pub command: String,
    /// Error text when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Command specific result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Asynchronous notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Adapter sequence number
    pub seq: i64,
    /// Event name
    pub event: String,
    /// Event specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Event {
    /// Event with an optional body; the sequence number is stamped on send
    #[must_use]
    pub fn new(event: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            seq: 0,
            event: event.into(),
            body,
        }
    }

    /// Event whose body is a serializable payload
    #[must_use]
    pub fn with_body(event: impl Into<String>, body: &impl Serialize) -> Self {
        Self::new(event, serde_json::to_value(body).ok())
    }
}

/// Adapter capabilities announced by `initialize`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// `configurationDone` is understood
    pub supports_configuration_done_request: bool,
    /// Breakpoint conditions are understood
    pub supports_conditional_breakpoints: bool,
    /// Hit conditions are understood
    pub supports_hit_conditional_breakpoints: bool,
    /// Hover evaluation is understood
    pub supports_evaluate_for_hovers: bool,
    /// Reverse execution is understood
    pub supports_step_back: bool,
    /// Variable writes are understood
    pub supports_set_variable: bool,
    /// Restarting a frame is understood
    pub supports_restart_frame: bool,
    /// Logpoints are understood
    pub supports_log_points: bool,
}

impl Capabilities {
    /// What the replay adapter supports
    #[must_use]
    pub fn replay() -> Self {
        Self {
            supports_configuration_done_request: true,
            supports_conditional_breakpoints: true,
            ..Self::default()
        }
    }
}

/// Trace categories enabled by the launch `trace` argument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Echo launch diagnostics
    pub launch: bool,
    /// Echo breakpoint verification
    pub breakpoints: bool,
    /// Echo every request
    pub protocol: bool,
    /// Echo every processed log line
    pub logfile: bool,
}

impl TraceSettings {
    /// Every category on
    #[must_use]
    pub const fn all() -> Self {
        Self {
            launch: true,
            breakpoints: true,
            protocol: true,
            logfile: true,
        }
    }

    /// Parse a comma separated category list; unknown names are ignored
    #[must_use]
    pub fn parse(categories: &str) -> Self {
        let mut settings = Self::default();
        for category in categories.split(',').map(str::trim) {
            match category {
                "all" => return Self::all(),
                "launch" => settings.launch = true,
                "breakpoints" => settings.breakpoints = true,
                "protocol" => settings.protocol = true,
                "logfile" => settings.logfile = true,
                _ => {}
            }
        }
        settings
    }
}

/// Raw `trace` launch argument: a flag or a category list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceArgument {
    /// `true` enables every category
    Flag(bool),
    /// `"launch,logfile"`
    Categories(String),
}

impl From<TraceArgument> for TraceSettings {
    fn from(argument: TraceArgument) -> Self {
        match argument {
            TraceArgument::Flag(true) => Self::all(),
            TraceArgument::Flag(false) => Self::default(),
            TraceArgument::Categories(list) => Self::parse(&list),
        }
    }
}

/// `launch` arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    /// Path of the log to replay
    #[serde(alias = "logFilePath")]
    pub log_file: String,
    /// Display name, defaults to the file name of the path
    #[serde(default)]
    pub log_file_name: Option<String>,
    /// Log text supplied in memory instead of read from the path
    #[serde(default)]
    pub log_file_contents: Option<String>,
    /// Pause on the first line
    #[serde(default)]
    pub stop_on_entry: bool,
    /// Refuse logs without the required log levels
    #[serde(default)]
    pub check_log_levels: bool,
    /// Diagnostic echo categories
    #[serde(default)]
    pub trace: Option<TraceArgument>,
    /// Valid breakpoint lines supplied by the language service
    #[serde(default)]
    pub line_breakpoint_info: Option<Vec<LineBreakpointInfo>>,
    /// Project root; accepted for compatibility
    #[serde(default)]
    pub project_path: Option<String>,
    /// Heap dump snapshots fetched by the client, matched to the log by id
    #[serde(default)]
    pub overlay_results: Option<Vec<OverlayResult>>,
}

/// Source reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Client path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One requested breakpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    /// Requested line
    pub line: u32,
    /// Condition text
    #[serde(default)]
    pub condition: Option<String>,
    /// Hit count condition
    #[serde(default)]
    pub hit_condition: Option<String>,
    /// Logpoint message
    #[serde(default)]
    pub log_message: Option<String>,
}

/// `setBreakpoints` arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    /// File the breakpoints belong to
    pub source: Source,
    /// Every breakpoint of the file
    #[serde(default)]
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
}

/// Verification result of one breakpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Whether the breakpoint can bind
    pub verified: bool,
    /// Requested line
    pub line: u32,
    /// File it was requested in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// `scopes` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    /// Frame to list scopes of
    pub frame_id: FrameId,
}

/// `variables` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    /// Handle of the map to list
    pub variables_reference: VariablesRef,
}

/// `evaluate` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    /// Expression text
    pub expression: String,
}

/// Thread listed by `threads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Thread id
    pub id: i64,
    /// Thread name
    pub name: String,
}

/// Frame listed by `stackTrace`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Frame id, valid for `scopes`
    pub id: FrameId,
    /// Display name
    pub name: String,
    /// Source file, absent for system code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Current line
    pub line: u32,
    /// Always zero
    pub column: u32,
}

/// Scope listed by `scopes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// `Local`, `Static` or `Global`
    pub name: String,
    /// Handle for `variables`
    pub variables_reference: VariablesRef,
    /// Always false
    pub expensive: bool,
}

/// Variable listed by `variables`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Name
    pub name: String,
    /// Display value
    pub value: String,
    /// Declared type
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    /// Handle of the children, zero when there are none
    pub variables_reference: VariablesRef,
}

/// `stopped` event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    /// `entry`, `step` or `breakpoint`
    pub reason: String,
    /// Always the synthetic thread
    pub thread_id: i64,
    /// Always true
    pub all_threads_stopped: bool,
}

/// `output` event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEventBody {
    /// `stdout`, `stderr` or `console`
    pub category: String,
    /// Text, newline terminated
    pub output: String,
    /// Source the output is attributed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line the output is attributed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Custom `checkpoint` event payload: the registry after a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEventBody {
    /// Registered checkpoints
    pub checkpoints: Vec<Checkpoint>,
}
