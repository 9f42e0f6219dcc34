//! Heap dump overlays.
//!
//! A `HEAP_DUMP` line announces that a full heap snapshot was captured at a
//! class and line. The snapshot arrives separately as an overlay result and is
//! attached by id. When a pause lands on a dump's location, the top frame's
//! variables are rebuilt from the snapshot instead of from log evidence.
//!
//! A rebuild runs in three passes: strings first, so they can be shown inline;
//! then every non-primitive value, materialized into fresh arena maps; then the
//! symbols bound to locals, statics and trigger context variables.

use crate::state::{FrameInfo, SessionState};
use crate::variable::{ChildrenId, ReferenceMap, UNASSIGNED, VariableArena, VariableContainer};
use logstep_core::constants::{ADDRESS_PREFIX, HEAP_DUMP_TAG, TRIGGER_CONTEXT_PREFIX};
use logstep_log::{HeapDumpMarker, LogSource, heap_dump_marker};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lowercased type names that never become expandable objects
const PRIMITIVE_TYPES: [&str; 11] = [
    "blob", "boolean", "date", "datetime", "decimal", "double", "id", "integer", "long", "string", "time",
];

/// Shown in place of a reference already being rendered further out
const ALREADY_OUTPUT: &str = "already output";

static NULL: Value = Value::Null;

/// Overlay result for one heap dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OverlayResult {
    /// Heap dump id, matched against the log's markers
    pub id: String,
    /// Class the dump was taken in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Line the dump was taken on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Captured heap
    pub heap_dump: HeapSnapshot,
}

/// Heap contents grouped by type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    /// One extent per type
    #[serde(default)]
    pub extents: Vec<Extent>,
}

/// Every live value of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extent {
    /// Type name, e.g. `List<Account>`
    pub type_name: String,
    /// Element type of a list or set, value type of a map
    #[serde(default)]
    pub collection_type: Option<String>,
    /// Values of this type
    #[serde(default)]
    pub extent: Vec<ExtentValue>,
}

/// One live value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentValue {
    /// Heap address
    pub address: String,
    /// Variable names bound to this value
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    /// Contents
    #[serde(default)]
    pub value: ExtentData,
}

/// Contents of a value.
///
/// Scalars and lists use `value`; a list holds `{"value": ...}` elements.
/// Maps and objects use `entry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtentData {
    /// Scalar or list elements
    #[serde(default)]
    pub value: Value,
    /// Map entries or object fields
    #[serde(default)]
    pub entry: Option<Vec<ExtentEntry>>,
}

/// Map entry or object field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtentEntry {
    /// Map key, or the field name of an object
    pub key_display_value: Value,
    /// Entry value
    pub value: EntryValue,
}

/// Wrapped entry value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryValue {
    /// Scalar or heap address
    #[serde(default)]
    pub value: Value,
}

/// A dump announced in the log, with its overlay once attached
#[derive(Debug, Clone, PartialEq)]
pub struct HeapDump {
    /// Where the dump was taken
    pub marker: HeapDumpMarker,
    /// Snapshot, if one was supplied
    pub overlay: Option<OverlayResult>,
}

/// Every heap dump a log announces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeapDumpSet {
    dumps: Vec<HeapDump>,
}

impl HeapDumpSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the dumps a log announces.
    ///
    /// Also returns one console warning per `HEAP_DUMP` line that cannot be read.
    #[must_use]
    pub fn scan(source: &LogSource) -> (Self, Vec<String>) {
        let needle = format!("|{HEAP_DUMP_TAG}|");
        let mut dumps = Vec::new();
        let mut warnings = Vec::new();
        for (index, line) in source.lines().iter().enumerate() {
            if !line.contains(&needle) {
                continue;
            }
            match heap_dump_marker(line) {
                Some(marker) => dumps.push(HeapDump { marker, overlay: None }),
                None => warnings.push(format!("Malformed log line {}: {line}", index + 1)),
            }
        }
        if !dumps.is_empty() {
            tracing::debug!(dumps = dumps.len(), malformed = warnings.len(), "heap dumps found");
        }
        (Self { dumps }, warnings)
    }

    /// Attach overlay results to their dumps by id; returns how many matched
    pub fn attach(&mut self, results: impl IntoIterator<Item = OverlayResult>) -> usize {
        let mut attached = 0;
        for result in results {
            match self.dumps.iter_mut().find(|dump| dump.marker.id == result.id) {
                Some(dump) => {
                    dump.overlay = Some(result);
                    attached += 1;
                }
                None => tracing::warn!(id = %result.id, "overlay result has no heap dump in the log"),
            }
        }
        attached
    }

    /// First dump whose class appears in the frame name and whose line matches
    #[must_use]
    pub fn for_location(&self, frame_name: &str, line: u32) -> Option<&HeapDump> {
        self.dumps
            .iter()
            .find(|dump| frame_name.contains(&dump.marker.class_name) && dump.marker.line == line)
    }

    /// All dumps, in log order
    #[must_use]
    pub fn dumps(&self) -> &[HeapDump] {
        &self.dumps
    }

    /// Number of dumps
    #[must_use]
    pub fn len(&self) -> usize {
        self.dumps.len()
    }

    /// Whether the log announces no dump
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dumps.is_empty()
    }
}

/// Rebuild a frame's variables from a snapshot; returns how many were replaced.
///
/// The address table is cleared first. Locals and statics are replaced only
/// when the frame already knows them; trigger context variables are added to
/// the ambient map when `running_trigger` is set.
pub fn apply_snapshot(
    state: &mut SessionState,
    info: FrameInfo,
    snapshot: &HeapSnapshot,
    running_trigger: bool,
) -> usize {
    let targets = symbol_targets(state, info, snapshot, running_trigger);
    let (arena, refs) = state.heap_mut();
    refs.clear();
    let mut rebuild = Rebuild::new(arena, refs, snapshot);
    let mut roots = Vec::new();
    for target in &targets {
        let container = rebuild.symbol(&target.name, target.extent, target.value);
        if let Some(vars) = rebuild.arena.get_mut(target.map) {
            vars.insert(target.name.clone(), container);
            roots.push(target.map);
        }
    }
    rebuild.refresh_displays(&roots);
    targets.len()
}

struct Target<'s> {
    map: ChildrenId,
    name: String,
    extent: &'s Extent,
    value: &'s ExtentValue,
}

fn symbol_targets<'s>(
    state: &SessionState,
    info: FrameInfo,
    snapshot: &'s HeapSnapshot,
    running_trigger: bool,
) -> Vec<Target<'s>> {
    let mut targets = Vec::new();
    for extent in &snapshot.extents {
        for value in &extent.extent {
            for symbol in value.symbols.iter().flatten() {
                let target = if state.arena().contains(info.locals, symbol) {
                    Some((info.locals, symbol.as_str()))
                } else if let Some(found) = static_target(state, symbol) {
                    Some(found)
                } else if running_trigger && symbol.starts_with(TRIGGER_CONTEXT_PREFIX) {
                    Some((info.globals, symbol.as_str()))
                } else {
                    None
                };
                if let Some((map, name)) = target {
                    targets.push(Target {
                        map,
                        name: name.to_string(),
                        extent,
                        value,
                    });
                }
            }
        }
    }
    targets
}

/// `Class.var` naming a static the class already holds
fn static_target<'n>(state: &SessionState, symbol: &'n str) -> Option<(ChildrenId, &'n str)> {
    let (class, var) = symbol.rsplit_once('.')?;
    let map = state.class_statics(class)?;
    state.arena().contains(map, var).then_some((map, var))
}

struct Rebuild<'a, 's> {
    arena: &'a mut VariableArena,
    refs: &'a mut ReferenceMap,
    strings: HashMap<&'s str, String>,
    leaves: HashMap<&'s str, (&'s Extent, &'s ExtentValue)>,
    built: HashMap<&'s str, ChildrenId>,
}

impl<'a, 's> Rebuild<'a, 's> {
    fn new(arena: &'a mut VariableArena, refs: &'a mut ReferenceMap, snapshot: &'s HeapSnapshot) -> Self {
        let mut strings = HashMap::new();
        let mut leaves = HashMap::new();
        for extent in &snapshot.extents {
            let lower = extent.type_name.to_lowercase();
            for value in &extent.extent {
                if lower == "string" {
                    strings.insert(value.address.as_str(), format!("'{}'", scalar_text(&value.value.value)));
                } else if !PRIMITIVE_TYPES.contains(&lower.as_str()) {
                    leaves.insert(value.address.as_str(), (extent, value));
                }
            }
        }
        Self {
            arena,
            refs,
            strings,
            leaves,
            built: HashMap::new(),
        }
    }

    /// Container for a symbol bound to an extent value
    fn symbol(&mut self, name: &str, extent: &Extent, value: &'s ExtentValue) -> VariableContainer {
        let address = value.address.as_str();
        let mut container = VariableContainer::declared(name, extent.type_name.clone());
        if let Some(text) = self.strings.get(address) {
            container.set_scalar(text.clone());
        } else if let Some(children) = self.object(address) {
            container.alias(children, address);
        } else {
            container.set_scalar(scalar_text(&value.value.value));
        }
        container
    }

    /// Children map of a non-primitive value, built once per address
    fn object(&mut self, address: &'s str) -> Option<ChildrenId> {
        if let Some(children) = self.built.get(address) {
            return Some(*children);
        }
        let (extent, value) = *self.leaves.get(address)?;
        let children = self.arena.alloc();
        // Registered before filling so cycles resolve to this map
        self.built.insert(address, children);
        self.refs.register(address, children);

        let element_type = extent.collection_type.as_deref().unwrap_or_default();
        let mut fields = Vec::new();
        match &value.value.entry {
            Some(entries) => {
                let is_map = is_collection_type(&extent.type_name);
                for entry in entries {
                    let (name, type_name) = if is_map {
                        (self.key_text(&entry.key_display_value), element_type)
                    } else {
                        (scalar_text(&entry.key_display_value), "")
                    };
                    fields.push(self.leaf(name, type_name, &entry.value.value));
                }
            }
            None => {
                for (index, element) in value.value.value.as_array().into_iter().flatten().enumerate() {
                    let raw = element.get("value").unwrap_or(&NULL);
                    fields.push(self.leaf(index.to_string(), element_type, raw));
                }
            }
        }
        if let Some(map) = self.arena.get_mut(children) {
            for field in fields {
                map.insert(field.name.clone(), field);
            }
        }
        Some(children)
    }

    /// Field, element or map value; addresses resolve to strings or objects
    fn leaf(&mut self, name: String, type_name: &str, raw: &'s Value) -> VariableContainer {
        let mut container = VariableContainer::declared(name, type_name);
        let Some(address) = raw.as_str().filter(|text| is_address(text)) else {
            container.set_scalar(scalar_text(raw));
            return container;
        };
        if let Some(text) = self.strings.get(address) {
            container.set_scalar(text.clone());
        } else if let Some(children) = self.object(address) {
            if container.type_name.is_empty() {
                if let Some((extent, _)) = self.leaves.get(address) {
                    container.type_name.clone_from(&extent.type_name);
                }
            }
            container.alias(children, address);
        } else {
            // Looked like an address but names nothing in the snapshot
            container.set_scalar(address);
        }
        container
    }

    fn key_text(&self, key: &Value) -> String {
        key.as_str()
            .and_then(|text| self.strings.get(text))
            .cloned()
            .unwrap_or_else(|| scalar_text(key))
    }

    /// Give every object container its rendered text
    fn refresh_displays(&mut self, roots: &[ChildrenId]) {
        let displays: HashMap<&str, String> = self
            .built
            .keys()
            .map(|address| (*address, self.render(address, &mut Vec::new())))
            .collect();
        let maps: Vec<ChildrenId> = self.built.values().copied().chain(roots.iter().copied()).collect();
        for id in maps {
            let Some(map) = self.arena.get_mut(id) else {
                continue;
            };
            for container in map.values_mut() {
                if let Some(display) = container.reference.as_deref().and_then(|addr| displays.get(addr)) {
                    container.value.clone_from(display);
                }
            }
        }
    }

    /// `Type:{a=1, b=2}` for objects, `(x, y)` for lists and sets, `{k=v}` for maps
    fn render(&self, address: &str, visited: &mut Vec<String>) -> String {
        if visited.iter().any(|seen| seen == address) {
            return ALREADY_OUTPUT.to_string();
        }
        let (Some(children), Some((extent, _))) = (self.built.get(address), self.leaves.get(address)) else {
            return address.to_string();
        };
        let lower = extent.type_name.to_lowercase();
        let sequence = lower.starts_with("list<") || lower.starts_with("set<");
        visited.push(address.to_string());
        let parts: Vec<String> = self
            .arena
            .get(*children)
            .into_iter()
            .flat_map(|map| map.values())
            .map(|field| match field.reference.as_deref() {
                Some(inner) if self.built.contains_key(inner) => self.render(inner, visited),
                _ if sequence => field.value.clone(),
                _ => format!("{}={}", field.name, field.value),
            })
            .collect();
        visited.pop();

        let body = parts.join(", ");
        if sequence {
            format!("({body})")
        } else if is_collection_type(&extent.type_name) {
            format!("{{{body}}}")
        } else {
            format!("{}:{{{body}}}", extent.type_name)
        }
    }
}

fn is_address(text: &str) -> bool {
    text.starts_with(ADDRESS_PREFIX)
}

fn is_collection_type(type_name: &str) -> bool {
    let lower = type_name.to_lowercase();
    lower.starts_with("map<") || lower.starts_with("list<") || lower.starts_with("set<")
}

/// Display text of a snapshot scalar; whole numbers drop their fraction
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => UNASSIGNED.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) if number.is_f64() => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => format!("{float:.0}"),
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}
