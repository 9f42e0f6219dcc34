//! Virtual call stack.

use logstep_core::FrameId;
use serde::{Deserialize, Serialize};

/// Source file a frame executes in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSource {
    /// File name shown to the user
    pub name: String,
    /// File identifier breakpoints are keyed by
    pub path: String,
}

impl FrameSource {
    /// Source named after the last path segment of an identifier
    #[must_use]
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        Self { name, path }
    }
}

/// One reconstructed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Monotonic identifier within the session
    pub id: FrameId,
    /// Display name, also matched on exit
    pub name: String,
    /// Source file, absent for system code
    pub source: Option<FrameSource>,
    /// Current line, zero until a statement runs
    pub line: u32,
}

impl StackFrame {
    /// Whether an exit event carrying `target` closes this frame
    #[must_use]
    pub fn closes_on(&self, target: &str) -> bool {
        self.name == target || self.name.starts_with(target)
    }
}

/// LIFO stack of frames, innermost last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame
    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame; `None` on an empty stack
    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Innermost frame
    #[must_use]
    pub fn peek(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Innermost frame, mutable
    pub fn peek_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// Pop frames innermost first until one closed by `target` has been removed.
    ///
    /// If no frame on the stack matches, nothing is removed.
    pub fn pop_through(&mut self, target: &str) -> Vec<StackFrame> {
        let Some(index) = self.frames.iter().rposition(|frame| frame.closes_on(target)) else {
            return Vec::new();
        };
        let mut removed = Vec::with_capacity(self.frames.len() - index);
        while self.frames.len() > index {
            if let Some(frame) = self.pop() {
                removed.push(frame);
            }
        }
        removed
    }

    /// Frames outermost first
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Frames innermost first, as a debugger displays them
    pub fn innermost_first(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames.iter().rev()
    }

    /// Number of frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the stack is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
