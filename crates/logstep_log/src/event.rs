//! Event types produced by classifying debug log lines.
//!
//! A line is classified once and the resulting [`DebugEvent`] carries only the
//! fields parsed from that line. Handlers in the replay crate consume them.

use serde::{Deserialize, Serialize};

/// Event tag vocabulary matched against the second field of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTag {
    /// `CODE_UNIT_STARTED`
    CodeUnitStarted,
    /// `CODE_UNIT_FINISHED`
    CodeUnitFinished,
    /// `CONSTRUCTOR_ENTRY`
    ConstructorEntry,
    /// `CONSTRUCTOR_EXIT`
    ConstructorExit,
    /// `METHOD_ENTRY`
    MethodEntry,
    /// `METHOD_EXIT`
    MethodExit,
    /// `VF_APEX_CALL_START`, a page controller call
    VfApexCallStart,
    /// `VF_APEX_CALL_END`
    VfApexCallEnd,
    /// `VARIABLE_SCOPE_BEGIN`
    VariableScopeBegin,
    /// `VARIABLE_ASSIGNMENT`
    VariableAssignment,
    /// `STATEMENT_EXECUTE`
    StatementExecute,
    /// `USER_DEBUG`
    UserDebug,
}

impl EventTag {
    /// Every tag the classifier recognizes
    pub const ALL: [Self; 12] = [
        Self::CodeUnitStarted,
        Self::CodeUnitFinished,
        Self::ConstructorEntry,
        Self::ConstructorExit,
        Self::MethodEntry,
        Self::MethodExit,
        Self::VfApexCallStart,
        Self::VfApexCallEnd,
        Self::VariableScopeBegin,
        Self::VariableAssignment,
        Self::StatementExecute,
        Self::UserDebug,
    ];

    /// Match a raw tag, case-sensitively
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == raw)
    }

    /// Tag text as written in the log
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeUnitStarted => "CODE_UNIT_STARTED",
            Self::CodeUnitFinished => "CODE_UNIT_FINISHED",
            Self::ConstructorEntry => "CONSTRUCTOR_ENTRY",
            Self::ConstructorExit => "CONSTRUCTOR_EXIT",
            Self::MethodEntry => "METHOD_ENTRY",
            Self::MethodExit => "METHOD_EXIT",
            Self::VfApexCallStart => "VF_APEX_CALL_START",
            Self::VfApexCallEnd => "VF_APEX_CALL_END",
            Self::VariableScopeBegin => "VARIABLE_SCOPE_BEGIN",
            Self::VariableAssignment => "VARIABLE_ASSIGNMENT",
            Self::StatementExecute => "STATEMENT_EXECUTE",
            Self::UserDebug => "USER_DEBUG",
        }
    }

    /// Constructor events name their frame `Type.Type`
    #[must_use]
    pub const fn is_constructor(self) -> bool {
        matches!(self, Self::ConstructorEntry | Self::ConstructorExit)
    }

    /// Page controller invocations take their method from `invoke(...)`
    #[must_use]
    pub const fn is_vf_call(self) -> bool {
        matches!(self, Self::VfApexCallStart | Self::VfApexCallEnd)
    }
}

impl std::fmt::Display for EventTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event kind without payload, used for counting and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// First line of the log
    LogEntry,
    /// A unit, constructor, method or page call began
    FrameEntry,
    /// A unit, constructor, method or page call ended
    FrameExit,
    /// A statement ran
    StatementExecute,
    /// A variable was declared
    VariableScopeBegin,
    /// A variable was assigned
    VariableAssignment,
    /// User debug output
    UserDebug,
    /// Ignored line
    NoOp,
}

impl EventKind {
    /// Events that push or pop frames
    #[must_use]
    pub const fn is_frame_affecting(self) -> bool {
        matches!(self, Self::LogEntry | Self::FrameEntry | Self::FrameExit)
    }
}

/// Frame name and lookup signature for an entry or exit line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSignature {
    /// Name shown in the stack and matched on exit
    pub name: String,
    /// Raw signature used to resolve the frame's source file
    pub signature: String,
}

/// Declaration of a variable before it holds a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDeclaration {
    /// Declared name, qualified with the class for statics
    pub name: String,
    /// Declared type
    pub type_name: String,
    /// Whether the variable holds a heap reference
    pub is_reference: bool,
    /// Whether the variable is class-scoped
    pub is_static: bool,
}

/// Value written to a variable path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Dotted target path, e.g. `this.a.Name`
    pub path: String,
    /// Raw value payload
    pub value: String,
    /// Trailing heap address, when the line carries one
    pub address: Option<String>,
}

/// Message written by user code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDebug {
    /// Source line of the debug statement
    pub line: u32,
    /// Logging level, e.g. `DEBUG`
    pub level: String,
    /// Message text
    pub message: String,
}

/// Heap dump captured at a line, as announced by a `HEAP_DUMP` line.
///
/// The dump contents are fetched separately and attached by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapDumpMarker {
    /// Overlay result id
    pub id: String,
    /// Class the dump was taken in
    pub class_name: String,
    /// Namespace of that class, possibly empty
    pub namespace: String,
    /// Source line of the dump
    pub line: u32,
}

/// A classified debug log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugEvent {
    /// First line of the log; opens the root frame
    LogEntry,
    /// A unit, method, constructor, or controller call started
    FrameEntry(FrameSignature),
    /// A unit, method, constructor, or controller call finished
    FrameExit(FrameSignature),
    /// A statement ran on the given line
    StatementExecute {
        /// Line number as logged
        line: u32,
    },
    /// A variable came into scope
    VariableScopeBegin(ScopeDeclaration),
    /// A variable was assigned
    VariableAssignment(Assignment),
    /// User code wrote a debug message
    UserDebug(UserDebug),
    /// Anything else
    NoOp,
}

impl DebugEvent {
    /// Kind of this event
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LogEntry => EventKind::LogEntry,
            Self::FrameEntry(_) => EventKind::FrameEntry,
            Self::FrameExit(_) => EventKind::FrameExit,
            Self::StatementExecute { .. } => EventKind::StatementExecute,
            Self::VariableScopeBegin(_) => EventKind::VariableScopeBegin,
            Self::VariableAssignment(_) => EventKind::VariableAssignment,
            Self::UserDebug(_) => EventKind::UserDebug,
            Self::NoOp => EventKind::NoOp,
        }
    }

    /// Whether this event is ignored by replay
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}
