//! Forward-only cursor over the lines of a log.

use crate::source::LogSource;

/// Cursor position in a log
///
/// Only moves forward. Blank lines are stepped over without counting as an
/// advance, so a full pass over a log advances once per non-blank line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    next: usize,
    current: Option<usize>,
    advances: usize,
}

impl Cursor {
    /// Cursor before the first line
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to the next non-blank line and return its position and text
    pub fn advance<'a>(&mut self, source: &'a LogSource) -> Option<(usize, &'a str)> {
        while let Some(line) = source.line(self.next) {
            let position = self.next;
            self.next += 1;
            if !line.is_empty() {
                self.current = Some(position);
                self.advances += 1;
                return Some((position, line));
            }
        }
        None
    }

    /// Whether any line remains past the cursor
    #[must_use]
    pub fn has_more(&self, source: &LogSource) -> bool {
        self.next < source.len()
    }

    /// Position of the line most recently returned
    #[must_use]
    pub const fn pos(&self) -> Option<usize> {
        self.current
    }

    /// Number of non-blank lines visited
    #[must_use]
    pub const fn advances(&self) -> usize {
        self.advances
    }
}
