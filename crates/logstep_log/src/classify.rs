//! Line classification.
//!
//! The first line of a log is always [`DebugEvent::LogEntry`]. Every later line
//! is classified on its own: split on `|`, match the second field against the
//! tag vocabulary, and fall back to [`DebugEvent::NoOp`] for anything that does
//! not fit. Unknown tags never abort a replay.

use crate::event::{Assignment, DebugEvent, EventTag, FrameSignature, HeapDumpMarker, ScopeDeclaration, UserDebug};
use logstep_core::constants::{ADDRESS_PREFIX, HEAP_DUMP_TAG, TRIGGER_PREFIX};

/// Fewest fields a line needs before its tag is looked at
const MIN_FIELDS: usize = 3;

/// Classifier holding the one bit of state the grammar needs
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    started: bool,
    classified: usize,
}

impl Classifier {
    /// Create a classifier that has not seen any line
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the next line of the log
    pub fn classify(&mut self, line: &str) -> DebugEvent {
        self.classified += 1;
        if !self.started {
            self.started = true;
            return DebugEvent::LogEntry;
        }
        classify_line(line)
    }

    /// Whether the entry line has been consumed
    #[must_use]
    pub const fn has_started(&self) -> bool {
        self.started
    }

    /// Number of lines classified so far
    #[must_use]
    pub const fn classified(&self) -> usize {
        self.classified
    }
}

/// Classify a line that is not the first line of the log
#[must_use]
pub fn classify_line(line: &str) -> DebugEvent {
    if line.is_empty() {
        return DebugEvent::NoOp;
    }
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < MIN_FIELDS {
        return DebugEvent::NoOp;
    }
    let Some(tag) = EventTag::parse(fields[1]) else {
        return DebugEvent::NoOp;
    };

    match tag {
        EventTag::CodeUnitStarted | EventTag::ConstructorEntry | EventTag::MethodEntry => {
            DebugEvent::FrameEntry(frame_signature(tag, &fields))
        }
        EventTag::CodeUnitFinished | EventTag::ConstructorExit | EventTag::MethodExit => {
            DebugEvent::FrameExit(frame_signature(tag, &fields))
        }
        EventTag::VfApexCallStart => {
            if is_extraneous_accessor(fields[fields.len() - 2]) {
                DebugEvent::NoOp
            } else {
                DebugEvent::FrameEntry(frame_signature(tag, &fields))
            }
        }
        EventTag::VfApexCallEnd => {
            if is_extraneous_accessor(fields[fields.len() - 2]) {
                DebugEvent::NoOp
            } else {
                DebugEvent::FrameExit(frame_signature(tag, &fields))
            }
        }
        EventTag::StatementExecute => match parse_bracketed_line(fields[2]) {
            Some(line) => DebugEvent::StatementExecute { line },
            None => DebugEvent::NoOp,
        },
        EventTag::UserDebug => user_debug(&fields).map_or(DebugEvent::NoOp, DebugEvent::UserDebug),
        EventTag::VariableScopeBegin => {
            scope_declaration(&fields).map_or(DebugEvent::NoOp, DebugEvent::VariableScopeBegin)
        }
        EventTag::VariableAssignment => {
            assignment(&fields).map_or(DebugEvent::NoOp, DebugEvent::VariableAssignment)
        }
    }
}

/// Parse a `HEAP_DUMP` line: `time|HEAP_DUMP|[line]|id|class|namespace|line`.
///
/// Heap dump lines never affect replay state, so [`classify_line`] reports them
/// as [`DebugEvent::NoOp`]; this is the only way to read them.
#[must_use]
pub fn heap_dump_marker(line: &str) -> Option<HeapDumpMarker> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < 7 || fields[1] != HEAP_DUMP_TAG {
        return None;
    }
    Some(HeapDumpMarker {
        id: fields[3].to_string(),
        class_name: fields[4].to_string(),
        namespace: fields[5].to_string(),
        line: fields[6].trim().parse().ok()?,
    })
}

/// Parse `[42]` into `42`
#[must_use]
pub fn parse_bracketed_line(field: &str) -> Option<u32> {
    let digits = field.strip_prefix('[')?.strip_suffix(']')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Strip the trigger namespace from a signature
#[must_use]
pub fn display_signature(signature: &str) -> &str {
    signature.strip_prefix(TRIGGER_PREFIX).unwrap_or(signature)
}

/// A page property access logs a bare `get(...)`/`set(...)` line next to the
/// `invoke(...)` line for the same call. Only the latter opens a frame.
fn is_extraneous_accessor(access: &str) -> bool {
    if access.contains("invoke(") {
        return false;
    }
    access
        .split(|c: char| c.is_whitespace() || c == '.')
        .any(|token| token.starts_with("get(") || token.starts_with("set("))
}

fn frame_signature(tag: EventTag, fields: &[&str]) -> FrameSignature {
    let signature = fields[fields.len() - 1];
    let name = if tag.is_constructor() {
        constructor_name(signature)
    } else if tag.is_vf_call() {
        controller_call_name(signature, fields[fields.len() - 2])
    } else {
        display_signature(signature).to_string()
    };
    FrameSignature {
        name,
        signature: signature.to_string(),
    }
}

fn constructor_name(type_name: &str) -> String {
    let last = type_name.rsplit('.').next().unwrap_or(type_name);
    format!("{type_name}.{last}")
}

fn controller_call_name(class_name: &str, access: &str) -> String {
    let method = access.find("invoke(").and_then(|start| {
        let rest = &access[start + "invoke(".len()..];
        rest.find(')').map(|end| &rest[..end])
    });
    match method {
        Some(method) if !method.is_empty() => format!("{class_name}.{method}()"),
        _ => class_name.to_string(),
    }
}

fn user_debug(fields: &[&str]) -> Option<UserDebug> {
    if fields.len() < 5 {
        return None;
    }
    let line = parse_bracketed_line(fields[2])?;
    Some(UserDebug {
        line,
        level: fields[3].to_string(),
        message: fields[4..].join("|"),
    })
}

fn scope_declaration(fields: &[&str]) -> Option<ScopeDeclaration> {
    if fields.len() < 5 {
        return None;
    }
    Some(ScopeDeclaration {
        name: fields[3].to_string(),
        type_name: fields[4].to_string(),
        is_reference: fields.get(5).is_some_and(|f| *f == "true"),
        is_static: fields.get(6).is_some_and(|f| *f == "true"),
    })
}

fn assignment(fields: &[&str]) -> Option<Assignment> {
    if fields.len() < 5 {
        return None;
    }
    let last = fields[fields.len() - 1];
    let (value_end, address) = if fields.len() >= 6 && last.starts_with(ADDRESS_PREFIX) {
        (fields.len() - 1, Some(last.to_string()))
    } else {
        (fields.len(), None)
    };
    Some(Assignment {
        path: fields[3].to_string(),
        value: fields[4..value_end].join("|"),
        address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use proptest::prelude::*;

    fn started() -> Classifier {
        let mut classifier = Classifier::new();
        classifier.classify("48.0 APEX_CODE,FINEST;APEX_PROFILING,INFO");
        classifier
    }

    #[test]
    fn test_first_line_is_log_entry() {
        let mut classifier = Classifier::new();
        assert!(!classifier.has_started());
        assert_eq!(classifier.classify("|METHOD_ENTRY|[1]|Foo.bar()"), DebugEvent::LogEntry);
        assert!(classifier.has_started());
        assert_eq!(classifier.classify(""), DebugEvent::NoOp);
        assert_eq!(classifier.classified(), 2);
    }

    #[test]
    fn test_empty_and_short_lines() {
        let mut classifier = started();
        assert_eq!(classifier.classify(""), DebugEvent::NoOp);
        assert_eq!(classifier.classify("no fields here"), DebugEvent::NoOp);
        assert_eq!(classifier.classify("time|METHOD_ENTRY"), DebugEvent::NoOp);
    }

    #[test]
    fn test_unknown_tag() {
        assert!(classify_line("time|HEAP_DUMP|[5]|x|y|z|10").is_noop());
        assert!(classify_line("time|SOMETHING_NEW|a|b").is_noop());
    }

    #[test]
    fn test_heap_dump_marker() {
        let marker = heap_dump_marker("12:00:00.0 (9)|HEAP_DUMP|[11]|1ct000001|MyClass|ns|11").unwrap();
        assert_eq!(marker.id, "1ct000001");
        assert_eq!(marker.class_name, "MyClass");
        assert_eq!(marker.namespace, "ns");
        assert_eq!(marker.line, 11);

        assert_eq!(heap_dump_marker("t|HEAP_DUMP|[11]|id|MyClass"), None);
        assert_eq!(heap_dump_marker("t|HEAP_DUMP|[11]|id|MyClass|ns|eleven"), None);
        assert_eq!(heap_dump_marker("t|USER_DEBUG|[11]|id|MyClass|ns|11"), None);
    }

    #[test]
    fn test_frame_entry_kinds() {
        for tag in ["CODE_UNIT_STARTED", "CONSTRUCTOR_ENTRY", "METHOD_ENTRY", "VF_APEX_CALL_START"] {
            let event = classify_line(&format!("|{tag}|"));
            assert_eq!(event.kind(), EventKind::FrameEntry, "{tag}");
        }
        for tag in ["CODE_UNIT_FINISHED", "CONSTRUCTOR_EXIT", "METHOD_EXIT", "VF_APEX_CALL_END"] {
            let event = classify_line(&format!("|{tag}|"));
            assert_eq!(event.kind(), EventKind::FrameExit, "{tag}");
        }
    }

    #[test]
    fn test_method_entry_name() {
        let event = classify_line("12:00:00.1 (1)|METHOD_ENTRY|[4]|01p000000000001|MyClass.doWork(Integer)");
        let DebugEvent::FrameEntry(frame) = event else {
            panic!("expected frame entry");
        };
        assert_eq!(frame.name, "MyClass.doWork(Integer)");
        assert_eq!(frame.signature, "MyClass.doWork(Integer)");
    }

    #[test]
    fn test_trigger_prefix_stripped() {
        let event = classify_line("t|CODE_UNIT_STARTED|[EXTERNAL]|01q|__sfdc_trigger/AccountTrigger");
        let DebugEvent::FrameEntry(frame) = event else {
            panic!("expected frame entry");
        };
        assert_eq!(frame.name, "AccountTrigger");
        assert_eq!(frame.signature, "__sfdc_trigger/AccountTrigger");
    }

    #[test]
    fn test_constructor_names() {
        let DebugEvent::FrameEntry(frame) = classify_line("t|CONSTRUCTOR_ENTRY|[2]|01p|<init>()|Foo") else {
            panic!("expected frame entry");
        };
        assert_eq!(frame.name, "Foo.Foo");

        let DebugEvent::FrameExit(frame) =
            classify_line("t|CONSTRUCTOR_EXIT|[2]|01p|<init>()|Outer.Inner")
        else {
            panic!("expected frame exit");
        };
        assert_eq!(frame.name, "Outer.Inner.Inner");
    }

    #[test]
    fn test_controller_call_names() {
        let DebugEvent::FrameEntry(frame) =
            classify_line("t|VF_APEX_CALL_START|[EXTERNAL]|01p|invoke(save)|PageController")
        else {
            panic!("expected frame entry");
        };
        assert_eq!(frame.name, "PageController.save()");

        let DebugEvent::FrameEntry(frame) =
            classify_line("t|VF_APEX_CALL_START|[EXTERNAL]|PageController <init>|PageController")
        else {
            panic!("expected frame entry");
        };
        assert_eq!(frame.name, "PageController");
    }

    #[test]
    fn test_controller_accessor_is_one_call() {
        assert!(classify_line("t|VF_APEX_CALL_START|[EXTERNAL]|PageController get(name)|PageController").is_noop());
        assert!(classify_line("t|VF_APEX_CALL_END|[EXTERNAL]|PageController set(name)|PageController").is_noop());
        let companion = classify_line("t|VF_APEX_CALL_START|[EXTERNAL]|PageController invoke(getName)|PageController");
        assert_eq!(companion.kind(), EventKind::FrameEntry);
    }

    #[test]
    fn test_statement_execute() {
        assert_eq!(
            classify_line("t|STATEMENT_EXECUTE|[5]"),
            DebugEvent::StatementExecute { line: 5 }
        );
        assert!(classify_line("t|STATEMENT_EXECUTE|[EXTERNAL]").is_noop());
        assert!(classify_line("t|STATEMENT_EXECUTE|[]").is_noop());
    }

    #[test]
    fn test_user_debug() {
        let event = classify_line("t|USER_DEBUG|[7]|DEBUG|hello|world");
        assert_eq!(
            event,
            DebugEvent::UserDebug(UserDebug {
                line: 7,
                level: "DEBUG".to_string(),
                message: "hello|world".to_string(),
            })
        );
        assert!(classify_line("t|USER_DEBUG|[7]|DEBUG").is_noop());
        assert!(classify_line("t|USER_DEBUG|[x]|DEBUG|msg").is_noop());
    }

    #[test]
    fn test_scope_begin() {
        let event = classify_line("fakeTime|VARIABLE_SCOPE_BEGIN|[38]|signature.staticInteger|Integer|false|true");
        assert_eq!(
            event,
            DebugEvent::VariableScopeBegin(ScopeDeclaration {
                name: "signature.staticInteger".to_string(),
                type_name: "Integer".to_string(),
                is_reference: false,
                is_static: true,
            })
        );
    }

    #[test]
    fn test_assignment_with_address() {
        let event = classify_line("fakeTime|VARIABLE_ASSIGNMENT|[8]|this|{}|0x00000000");
        assert_eq!(
            event,
            DebugEvent::VariableAssignment(Assignment {
                path: "this".to_string(),
                value: "{}".to_string(),
                address: Some("0x00000000".to_string()),
            })
        );
    }

    #[test]
    fn test_assignment_value_with_pipes() {
        let event = classify_line("t|VARIABLE_ASSIGNMENT|[3]|s|\"a|b\"");
        let DebugEvent::VariableAssignment(assignment) = event else {
            panic!("expected assignment");
        };
        assert_eq!(assignment.value, "\"a|b\"");
        assert_eq!(assignment.address, None);

        let event = classify_line("t|VARIABLE_ASSIGNMENT|[3]|s|\"a|b\"|0x1f");
        let DebugEvent::VariableAssignment(assignment) = event else {
            panic!("expected assignment");
        };
        assert_eq!(assignment.value, "\"a|b\"");
        assert_eq!(assignment.address.as_deref(), Some("0x1f"));
    }

    #[test]
    fn test_parse_bracketed_line() {
        assert_eq!(parse_bracketed_line("[12]"), Some(12));
        assert_eq!(parse_bracketed_line("12"), None);
        assert_eq!(parse_bracketed_line("[-1]"), None);
        assert_eq!(parse_bracketed_line("[EXTERNAL]"), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_classify_never_panics(line in ".*") {
            let _ = classify_line(&line);
        }

        #[test]
        fn prop_pipe_delimited_never_panics(fields in proptest::collection::vec("[A-Z_\\[\\]0-9a-z(). ]{0,12}", 0..8)) {
            let line = fields.join("|");
            let _ = classify_line(&line);
        }

        #[test]
        fn prop_first_line_always_entry(line in ".*") {
            let mut classifier = Classifier::new();
            prop_assert_eq!(classifier.classify(&line), DebugEvent::LogEntry);
        }
    }
}
