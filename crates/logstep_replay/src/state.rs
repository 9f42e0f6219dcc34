//! Mutable session state: frames, locals, statics, and heap aliasing.
//!
//! All variable storage lives in one [`VariableArena`]. Frames hold handles to
//! their locals map and to the statics map of their class; every frame of the
//! same class shares that statics handle.

use crate::stack::{CallStack, FrameSource, StackFrame};
use crate::value::{PayloadValue, display_scalar, parse_object};
use crate::variable::{ChildrenId, ReferenceMap, VariableArena, VariableContainer};
use indexmap::IndexMap;
use logstep_core::FrameId;
use logstep_log::{Assignment, ScopeDeclaration};
use std::collections::HashMap;

/// Per-frame variable scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Locals of this frame
    pub locals: ChildrenId,
    /// Statics of the frame's class, shared with other frames of that class
    pub statics: ChildrenId,
    /// Session-wide ambient variables
    pub globals: ChildrenId,
}

/// Everything a replay mutates
#[derive(Debug, Clone)]
pub struct SessionState {
    stack: CallStack,
    frame_infos: HashMap<FrameId, FrameInfo>,
    next_frame_id: FrameId,
    arena: VariableArena,
    refs: ReferenceMap,
    statics: IndexMap<String, ChildrenId>,
    globals: ChildrenId,
}

impl SessionState {
    /// Fresh state with an empty stack
    #[must_use]
    pub fn new() -> Self {
        let mut arena = VariableArena::new();
        let globals = arena.alloc();
        Self {
            stack: CallStack::new(),
            frame_infos: HashMap::new(),
            next_frame_id: FrameId::new(1),
            arena,
            refs: ReferenceMap::new(),
            statics: IndexMap::new(),
            globals,
        }
    }

    /// The call stack
    #[must_use]
    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    /// Innermost frame, mutable
    pub fn top_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.stack.peek_mut()
    }

    /// Variable storage
    #[must_use]
    pub fn arena(&self) -> &VariableArena {
        &self.arena
    }

    /// Heap address table
    #[must_use]
    pub fn refs(&self) -> &ReferenceMap {
        &self.refs
    }

    /// Variable storage and address table together, for wholesale rebuilds
    pub(crate) fn heap_mut(&mut self) -> (&mut VariableArena, &mut ReferenceMap) {
        (&mut self.arena, &mut self.refs)
    }

    /// Statics map of a class, if the class has been seen
    #[must_use]
    pub fn class_statics(&self, class: &str) -> Option<ChildrenId> {
        self.statics.get(class).copied()
    }

    /// Session-wide ambient map
    #[must_use]
    pub const fn globals(&self) -> ChildrenId {
        self.globals
    }

    /// Scopes of a frame
    #[must_use]
    pub fn frame_info(&self, id: FrameId) -> Option<FrameInfo> {
        self.frame_infos.get(&id).copied()
    }

    /// Scopes of the innermost frame
    #[must_use]
    pub fn top_frame_info(&self) -> Option<FrameInfo> {
        self.stack.peek().and_then(|frame| self.frame_info(frame.id))
    }

    /// Push a frame and give it fresh locals and its class statics
    pub fn push_frame(&mut self, name: String, source: Option<FrameSource>, line: u32) -> FrameId {
        let id = self.next_frame_id;
        self.next_frame_id = id.next();
        let statics = self.statics_for(frame_class(&name));
        let info = FrameInfo {
            locals: self.arena.alloc(),
            statics,
            globals: self.globals,
        };
        self.frame_infos.insert(id, info);
        self.stack.push(StackFrame { id, name, source, line });
        id
    }

    /// Pop the innermost frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        let frame = self.stack.pop()?;
        self.frame_infos.remove(&frame.id);
        Some(frame)
    }

    /// Pop through the innermost frame closed by `target`; returns how many were removed
    pub fn exit_frame(&mut self, target: &str) -> usize {
        let removed = self.stack.pop_through(target);
        for frame in &removed {
            self.frame_infos.remove(&frame.id);
        }
        removed.len()
    }

    /// Register a declared variable without a value
    pub fn declare(&mut self, declaration: &ScopeDeclaration) {
        if declaration.is_static {
            let (class, var) = match declaration.name.rsplit_once('.') {
                Some((class, var)) => (class.to_string(), var),
                None => (self.top_frame_class(), declaration.name.as_str()),
            };
            let map = self.statics_for(&class);
            if let Some(vars) = self.arena.get_mut(map) {
                vars.entry(var.to_string())
                    .or_insert_with(|| VariableContainer::declared(var, &declaration.type_name));
            }
        } else {
            let map = self.top_frame_info().map_or(self.globals, |info| info.locals);
            if let Some(vars) = self.arena.get_mut(map) {
                vars.insert(
                    declaration.name.clone(),
                    VariableContainer::declared(&declaration.name, &declaration.type_name),
                );
            }
        }
    }

    /// Apply a value to a variable path.
    ///
    /// For a bare name or `Class.static` the trailing address belongs to the
    /// value. For a field path such as `this.a` it names the object that owns
    /// the field. Unresolvable targets land in the ambient map.
    pub fn assign(&mut self, assignment: &Assignment) {
        let frame = self.top_frame_info();
        let address = assignment.address.as_deref();
        let Some((owner_path, field)) = assignment.path.rsplit_once('.') else {
            let name = assignment.path.as_str();
            let map = frame
                .and_then(|info| {
                    if self.arena.contains(info.locals, name) {
                        Some(info.locals)
                    } else if self.arena.contains(info.statics, name) {
                        Some(info.statics)
                    } else {
                        None
                    }
                })
                .unwrap_or(self.globals);
            self.assign_root(map, name, &assignment.value, address);
            return;
        };

        if let Some(class_map) = self.class_statics(owner_path) {
            if self.arena.contains(class_map, field) {
                self.assign_root(class_map, field, &assignment.value, address);
                return;
            }
        }

        let parent = self.resolve_owner(frame, owner_path, address);
        self.apply_value(parent, field, &assignment.value, None);
    }

    fn assign_root(&mut self, map: ChildrenId, name: &str, raw: &str, address: Option<&str>) {
        let Some(container) = self.arena.entry(map, name) else {
            return;
        };
        if name == "this" && container.reference.is_some() {
            return;
        }
        self.apply_value(map, name, raw, address);
    }

    /// Children map of the object that owns a field
    fn resolve_owner(&mut self, frame: Option<FrameInfo>, owner_path: &str, address: Option<&str>) -> ChildrenId {
        if let Some(shared) = address.and_then(|addr| self.refs.get(addr)) {
            return shared;
        }
        if let Some((map, name)) = self.walk(frame, owner_path) {
            if let Some(children) = self.ensure_children(map, &name) {
                if let Some(addr) = address {
                    self.refs.register(addr, children);
                    if let Some(owner) = self.arena.container_mut(map, &name) {
                        owner.reference.get_or_insert_with(|| addr.to_string());
                    }
                }
                return children;
            }
        }
        match address {
            Some(addr) => {
                let fresh = self.arena.alloc();
                self.refs.register(addr, fresh)
            }
            None => self.globals,
        }
    }

    /// Locate the container a dotted path names, allocating children along the way
    fn walk(&mut self, frame: Option<FrameInfo>, path: &str) -> Option<(ChildrenId, String)> {
        let segments: Vec<&str> = path.split('.').collect();
        let head = segments[0];
        let (mut map, rest) = match self.class_statics(head) {
            Some(class_map) if segments.len() > 1 => (class_map, &segments[1..]),
            _ => {
                let scope = [frame.map(|f| f.locals), frame.map(|f| f.statics), Some(self.globals)]
                    .into_iter()
                    .flatten()
                    .find(|scope| self.arena.contains(*scope, head))?;
                (scope, &segments[..])
            }
        };
        let (last, middle) = rest.split_last()?;
        for segment in middle {
            if !self.arena.contains(map, segment) {
                return None;
            }
            map = self.ensure_children(map, segment)?;
        }
        self.arena.contains(map, last).then(|| (map, (*last).to_string()))
    }

    fn ensure_children(&mut self, map: ChildrenId, name: &str) -> Option<ChildrenId> {
        if let Some(children) = self.arena.container(map, name)?.children {
            return Some(children);
        }
        let fresh = self.arena.alloc();
        let container = self.arena.container_mut(map, name)?;
        container.children = Some(fresh);
        container.value.clear();
        Some(fresh)
    }

    fn apply_value(&mut self, map: ChildrenId, name: &str, raw: &str, address: Option<&str>) {
        let Some(container) = self.arena.entry(map, name) else {
            return;
        };
        if is_collection(&container.type_name, raw) {
            container.set_scalar(raw);
            return;
        }
        if raw.trim_start().starts_with('{') {
            if let Some(fields) = parse_object(raw) {
                let children = self.object_children(map, name, address);
                for (key, value) in fields {
                    self.apply_payload(children, &key, value);
                }
                return;
            }
        }
        if let Some(shared) = self.refs.get(raw) {
            if let Some(container) = self.arena.container_mut(map, name) {
                container.alias(shared, raw);
            }
            return;
        }
        if let Some(container) = self.arena.container_mut(map, name) {
            container.set_scalar(display_scalar(raw));
        }
    }

    /// Children map an object value is written into, honoring aliasing
    fn object_children(&mut self, map: ChildrenId, name: &str, address: Option<&str>) -> ChildrenId {
        let (current, current_ref) = match self.arena.container(map, name) {
            Some(c) => (c.children, c.reference.clone()),
            None => (None, None),
        };
        let children = match address {
            Some(addr) => match self.refs.get(addr) {
                Some(shared) => shared,
                None => {
                    // A different address means a different object; stop sharing
                    let id = match (current, current_ref) {
                        (Some(existing), None) => existing,
                        _ => self.arena.alloc(),
                    };
                    self.refs.register(addr, id)
                }
            },
            None => match current {
                Some(existing) => existing,
                None => self.arena.alloc(),
            },
        };
        if let Some(container) = self.arena.container_mut(map, name) {
            container.children = Some(children);
            container.reference = address.map(str::to_string).or(container.reference.take());
            container.value.clear();
        }
        children
    }

    fn apply_payload(&mut self, map: ChildrenId, key: &str, value: PayloadValue) {
        match value {
            PayloadValue::Object(fields) => {
                let Some(children) = self.ensure_children_entry(map, key) else {
                    return;
                };
                for (inner_key, inner_value) in fields {
                    self.apply_payload(children, &inner_key, inner_value);
                }
            }
            PayloadValue::Str(text) => {
                let shared = self.refs.get(&text);
                if let Some(container) = self.arena.entry(map, key) {
                    match shared {
                        Some(shared) => container.alias(shared, &text),
                        None => container.set_scalar(format!("'{text}'")),
                    }
                }
            }
            PayloadValue::Raw(token) => {
                let shared = self.refs.get(&token);
                if let Some(container) = self.arena.entry(map, key) {
                    match shared {
                        Some(shared) => container.alias(shared, &token),
                        None => container.set_scalar(token),
                    }
                }
            }
        }
    }

    fn ensure_children_entry(&mut self, map: ChildrenId, key: &str) -> Option<ChildrenId> {
        self.arena.entry(map, key)?;
        self.ensure_children(map, key)
    }

    fn statics_for(&mut self, class: &str) -> ChildrenId {
        if let Some(existing) = self.statics.get(class) {
            return *existing;
        }
        let id = self.arena.alloc();
        self.statics.insert(class.to_string(), id);
        id
    }

    fn top_frame_class(&self) -> String {
        self.stack
            .peek()
            .map(|frame| frame_class(&frame.name).to_string())
            .unwrap_or_default()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Class owning a frame: the name up to its last `.`, ignoring arguments.
///
/// `Outer.Inner.run(ns.Type)` belongs to `Outer.Inner`, the constructor frame
/// `Type.Type` to `Type`, and a bare unit name to itself.
fn frame_class(name: &str) -> &str {
    let callable = name.split_once('(').map_or(name, |(head, _)| head);
    callable.rsplit_once('.').map_or(callable, |(class, _)| class)
}

fn is_collection(type_name: &str, raw: &str) -> bool {
    type_name.starts_with("Map<")
        || type_name.starts_with("List<")
        || type_name.starts_with("Set<")
        || raw.starts_with('[')
}
