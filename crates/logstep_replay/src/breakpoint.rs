//! Breakpoint binding index.
//!
//! Built once per session from the language service's line breakpoint info.
//! Answers two questions: may a breakpoint bind at `file:line`, and which file
//! does an executable type name live in.

use indexmap::IndexMap;
use logstep_core::constants::{EXEC_ANON_SIGNATURE, TRIGGER_PREFIX};
use logstep_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

const FILE_SCHEME: &str = "file://";

/// One record of line breakpoint info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBreakpointInfo {
    /// Source file identifier
    #[serde(alias = "file")]
    pub uri: String,
    /// Executable type name compiled from that file
    #[serde(alias = "executableTypeName")]
    pub typeref: String,
    /// Lines a breakpoint may bind to
    #[serde(default)]
    pub lines: Vec<u32>,
}

/// Valid breakpoint lines per file and type name to file correlation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointIndex {
    lines_by_file: HashMap<String, BTreeSet<u32>>,
    typerefs: IndexMap<String, String>,
}

impl BreakpointIndex {
    /// Create an empty index; nothing can bind
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from info records, unioning lines of records that share a file
    #[must_use]
    pub fn from_info(info: &[LineBreakpointInfo]) -> Self {
        let mut index = Self::new();
        for record in info {
            index
                .lines_by_file
                .entry(record.uri.clone())
                .or_default()
                .extend(record.lines.iter().copied());
            index.typerefs.insert(record.typeref.clone(), record.uri.clone());
        }
        tracing::debug!(
            files = index.lines_by_file.len(),
            typerefs = index.typerefs.len(),
            "built breakpoint index"
        );
        index
    }

    /// Build from a JSON array of info records
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBreakpointInfo`] if the JSON is not an array of records.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let info: Vec<LineBreakpointInfo> =
            serde_json::from_str(json).map_err(|err| CoreError::InvalidBreakpointInfo {
                reason: err.to_string(),
            })?;
        Ok(Self::from_info(&info))
    }

    /// Whether `line` is a valid breakpoint line of `file`
    #[must_use]
    pub fn can_bind(&self, file: &str, line: u32) -> bool {
        self.lines_by_file
            .get(file)
            .is_some_and(|lines| lines.contains(&line))
    }

    /// File an executable type lives in
    #[must_use]
    pub fn file_for_typeref(&self, typeref: &str) -> Option<&str> {
        self.typerefs.get(typeref).map(String::as_str)
    }

    /// Outer type of a file: the type name with no nested `$` segment
    #[must_use]
    pub fn top_level_typeref(&self, file: &str) -> Option<&str> {
        self.typerefs
            .iter()
            .find(|(typeref, uri)| uri.as_str() == file && !typeref.contains('$'))
            .map(|(typeref, _)| typeref.as_str())
    }

    /// File that a logged signature executes in.
    ///
    /// Method signatures are cut back to their declaring type before lookup.
    /// The anonymous script signature is not in the index; callers map it to
    /// the log itself.
    #[must_use]
    pub fn file_for_signature(&self, signature: &str) -> Option<&str> {
        if signature == EXEC_ANON_SIGNATURE {
            return None;
        }
        let declaring = declaring_type(signature)?;
        self.typerefs
            .iter()
            .rev()
            .find(|(typeref, _)| normalize_typeref(typeref) == declaring)
            .map(|(_, uri)| uri.as_str())
    }

    /// Map a client path onto the identifier the index uses for it
    #[must_use]
    pub fn resolve_file(&self, client_path: &str) -> String {
        if self.lines_by_file.contains_key(client_path) {
            return client_path.to_string();
        }
        let uri = format!("{FILE_SCHEME}{client_path}");
        if self.lines_by_file.contains_key(&uri) {
            return uri;
        }
        client_path.to_string()
    }

    /// Number of files with line info
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.lines_by_file.len()
    }

    /// Whether no line info was supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines_by_file.is_empty()
    }
}

/// Client-facing path for a file identifier
#[must_use]
pub fn client_path(file: &str) -> &str {
    file.strip_prefix(FILE_SCHEME).unwrap_or(file)
}

/// `ns.Outer.Inner.method(Integer)` becomes `ns.Outer.Inner`
fn declaring_type(signature: &str) -> Option<String> {
    if !signature.ends_with(')') {
        return Some(signature.to_string());
    }
    let open = signature.find('(')?;
    let dot = signature[..open].rfind('.')?;
    Some(signature[..dot].to_string())
}

/// `ns/Outer$Inner` is logged as `ns.Outer.Inner`; trigger names are logged verbatim
fn normalize_typeref(typeref: &str) -> String {
    if typeref.starts_with(TRIGGER_PREFIX) {
        typeref.to_string()
    } else {
        typeref.replacen('/', ".", 1).replacen('$', ".", 1)
    }
}

/// Verified breakpoint lines currently set, per file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveBreakpoints {
    lines: HashMap<String, BTreeSet<u32>>,
}

impl ActiveBreakpoints {
    /// No breakpoints
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every breakpoint of a file
    pub fn set(&mut self, file: &str, lines: impl IntoIterator<Item = u32>) {
        let lines: BTreeSet<u32> = lines.into_iter().collect();
        if lines.is_empty() {
            self.lines.remove(file);
        } else {
            self.lines.insert(file.to_string(), lines);
        }
    }

    /// Whether a breakpoint is set at `file:line`
    #[must_use]
    pub fn contains(&self, file: &str, line: u32) -> bool {
        self.lines.get(file).is_some_and(|lines| lines.contains(&line))
    }

    /// Lines set in a file
    #[must_use]
    pub fn lines_for(&self, file: &str) -> Vec<u32> {
        self.lines
            .get(file)
            .map(|lines| lines.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total breakpoints across files
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.values().map(BTreeSet::len).sum()
    }

    /// Whether no breakpoint is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
