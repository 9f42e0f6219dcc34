//! Checkpoint registry.
//!
//! A breakpoint whose condition carries the checkpoint marker is not a pause
//! point. It describes a diagnostic capture request that an external overlay
//! service persists. This module decides what is registered and enforces the
//! cap; it performs no network I/O.

use logstep_core::constants::{CHECKPOINT_MARKER, MAX_CHECKPOINTS};
use serde::{Deserialize, Serialize};

/// Language of a checkpoint action script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionScriptType {
    /// No script
    None,
    /// Apex statements
    Apex,
    /// A SOQL query
    #[serde(rename = "SOQL")]
    Soql,
}

impl ActionScriptType {
    /// Infer from script text: a leading `select` means SOQL
    #[must_use]
    pub fn infer(script: &str) -> Self {
        let trimmed = script.trim_start();
        if trimmed.is_empty() {
            Self::None
        } else if trimmed
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"))
        {
            Self::Soql
        } else {
            Self::Apex
        }
    }
}

/// Whether a breakpoint condition diverts it to the registry
#[must_use]
pub fn is_checkpoint_condition(condition: Option<&str>) -> bool {
    condition.is_some_and(|c| c.to_ascii_lowercase().contains(CHECKPOINT_MARKER))
}

/// Iteration count from a hit condition; the first run of digits, else 1
#[must_use]
pub fn parse_iterations(hit_condition: Option<&str>) -> u32 {
    hit_condition
        .and_then(|text| {
            let digits: String = text
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        })
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// One registered capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// File the checkpoint was set in
    pub uri: String,
    /// Outer type compiled from that file
    pub executable_type_name: String,
    /// Source line
    pub line: u32,
    /// Which hit of the line triggers capture
    pub iterations: u32,
    /// Script run at capture time
    pub action_script: String,
    /// Language of the script
    pub action_script_type: ActionScriptType,
    /// Always capture the heap
    pub is_dumping_heap: bool,
}

impl Checkpoint {
    /// Build from breakpoint request fields
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        executable_type_name: impl Into<String>,
        line: u32,
        hit_condition: Option<&str>,
        log_message: Option<&str>,
    ) -> Self {
        let action_script = log_message.unwrap_or_default().to_string();
        Self {
            uri: uri.into(),
            executable_type_name: executable_type_name.into(),
            line,
            iterations: parse_iterations(hit_condition),
            action_script_type: ActionScriptType::infer(&action_script),
            action_script,
            is_dumping_heap: true,
        }
    }
}

/// Result of replacing a file's checkpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointUpdate {
    /// Lines now registered
    pub accepted: Vec<u32>,
    /// Lines dropped because the registry was full
    pub rejected: Vec<u32>,
}

impl CheckpointUpdate {
    /// One warning covering every rejected line, if any
    #[must_use]
    pub fn warning(&self, file: &str, limit: usize) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.rejected.iter().map(u32::to_string).collect();
        Some(format!(
            "Only {limit} checkpoints can be set at a time. Removed {} checkpoint(s) from {file} at line(s) {}.",
            self.rejected.len(),
            lines.join(", ")
        ))
    }
}

/// Capped set of checkpoints owned by one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRegistry {
    checkpoints: Vec<Checkpoint>,
    limit: usize,
}

impl CheckpointRegistry {
    /// Empty registry with the standard cap
    #[must_use]
    pub fn new() -> Self {
        Self {
            checkpoints: Vec::new(),
            limit: MAX_CHECKPOINTS,
        }
    }

    /// Override the cap
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Replace a file's checkpoints, admitting new ones in order while room remains
    pub fn replace_file(&mut self, uri: &str, requested: Vec<Checkpoint>) -> CheckpointUpdate {
        self.checkpoints.retain(|cp| cp.uri != uri);
        let mut update = CheckpointUpdate::default();
        for checkpoint in requested {
            if self.checkpoints.len() < self.limit {
                update.accepted.push(checkpoint.line);
                self.checkpoints.push(checkpoint);
            } else {
                update.rejected.push(checkpoint.line);
            }
        }
        if !update.rejected.is_empty() {
            tracing::warn!(
                uri,
                rejected = update.rejected.len(),
                limit = self.limit,
                "checkpoint limit reached"
            );
        }
        update
    }

    /// Registered checkpoints in insertion order
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Whether a checkpoint exists at `uri:line`
    #[must_use]
    pub fn contains(&self, uri: &str, line: u32) -> bool {
        self.checkpoints
            .iter()
            .any(|cp| cp.uri == uri && cp.line == line)
    }

    /// Cap on registered checkpoints
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number registered
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether none is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

impl Default for CheckpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
