//! Request dispatcher.
//!
//! Translates protocol requests into replay engine calls. Each request yields
//! its response plus any events, already sequenced, in the order they must be
//! written: console output raised before the reply, the reply, then the
//! notifications the request caused.

use crate::protocol::{
    Breakpoint, Capabilities, CheckpointEventBody, EvaluateArguments, Event, LaunchArguments,
    OutputEventBody, ProtocolMessage, Request, Response, Scope, ScopesArguments,
    SetBreakpointsArguments, Source, SourceBreakpoint, StackFrame, StoppedEventBody, Thread,
    TraceSettings, Variable, VariablesArguments,
};
use logstep_core::constants::THREAD_ID;
use logstep_core::{CoreError, CoreResult, VariablesRef};
use logstep_log::LogSource;
use logstep_replay::breakpoint::client_path;
use logstep_replay::checkpoint::is_checkpoint_condition;
use logstep_replay::{
    BreakpointIndex, ChildrenId, Checkpoint, CheckpointRegistry, EngineOutput, FrameSource,
    ReplayConfig, ReplayEngine, StepKind, StepOutcome,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// One replay session owned by the adapter
#[derive(Debug)]
pub struct Session {
    engine: ReplayEngine,
    checkpoints: CheckpointRegistry,
    trace: TraceSettings,
}

impl Session {
    /// The replay engine
    #[must_use]
    pub const fn engine(&self) -> &ReplayEngine {
        &self.engine
    }

    /// Checkpoints registered in this session
    #[must_use]
    pub const fn checkpoints(&self) -> &CheckpointRegistry {
        &self.checkpoints
    }

    /// Trace categories in effect
    #[must_use]
    pub const fn trace(&self) -> TraceSettings {
        self.trace
    }
}

/// Outcome of a successful handler
#[derive(Debug, Default)]
struct Reply {
    body: Option<Value>,
    before: Vec<Event>,
    after: Vec<Event>,
}

impl Reply {
    fn body(body: &impl Serialize) -> Self {
        Self {
            body: serde_json::to_value(body).ok(),
            ..Self::default()
        }
    }
}

/// Debug adapter for replayed logs
#[derive(Debug, Default)]
pub struct DebugAdapter {
    session: Option<Session>,
    seq: i64,
    disconnected: bool,
}

impl DebugAdapter {
    /// Adapter with no session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active session, if a launch succeeded
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether `disconnect` has been handled
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Handle one request and return everything to send, in order
    pub fn handle(&mut self, request: &Request) -> Vec<ProtocolMessage> {
        tracing::debug!(seq = request.seq, command = %request.command, "request");
        let mut before = Vec::new();
        if self.session.as_ref().is_some_and(|s| s.trace.protocol) {
            before.push(console(format!("request: {} seq={}", request.command, request.seq)));
        }

        let result = match request.command.as_str() {
            "initialize" => Ok(Reply::body(&Capabilities::replay())),
            "launch" => self.launch(request),
            "configurationDone" => self.configuration_done(),
            "setBreakpoints" => self.set_breakpoints(request),
            "threads" => Ok(threads()),
            "stackTrace" => self.stack_trace(),
            "scopes" => self.scopes(request),
            "variables" => self.variables(request),
            "evaluate" => evaluate(request),
            "continue" => self.resume(StepKind::Run),
            "next" => self.resume(StepKind::Over),
            "stepIn" => self.resume(StepKind::In),
            "stepOut" => self.resume(StepKind::Out),
            "disconnect" => Ok(self.disconnect()),
            other => Err(CoreError::Protocol {
                message: format!("unsupported command: {other}"),
            }),
        };

        let (response, after) = match result {
            Ok(reply) => {
                before.extend(reply.before);
                (respond(request, true, None, reply.body), reply.after)
            }
            Err(err) => {
                tracing::warn!(command = %request.command, error = %err, "request failed");
                (respond(request, false, Some(err.to_string()), None), Vec::new())
            }
        };

        let mut messages: Vec<ProtocolMessage> = before.into_iter().map(ProtocolMessage::Event).collect();
        messages.push(ProtocolMessage::Response(response));
        messages.extend(after.into_iter().map(ProtocolMessage::Event));
        for message in &mut messages {
            self.seq += 1;
            message.set_seq(self.seq);
        }
        messages
    }

    fn launch(&mut self, request: &Request) -> CoreResult<Reply> {
        let args: LaunchArguments = arguments(request)?;
        let trace = args.trace.clone().map(TraceSettings::from).unwrap_or_default();
        let source = match &args.log_file_contents {
            Some(contents) => LogSource::from_contents(&args.log_file, contents),
            None => LogSource::load(&args.log_file)?,
        };
        let source = match args.log_file_name {
            Some(name) => source.with_name(name),
            None => source,
        };
        let index = BreakpointIndex::from_info(&args.line_breakpoint_info.unwrap_or_default());
        let config = ReplayConfig {
            stop_on_entry: args.stop_on_entry,
            check_log_levels: args.check_log_levels,
            echo_log_lines: trace.logfile,
        };

        let mut reply = Reply::default();
        if trace.launch {
            reply.before.push(console(format!(
                "launch: log={} lines={} bytes={} breakpoint files={}",
                args.log_file,
                source.non_blank_count(),
                source.size(),
                index.file_count()
            )));
        }
        let mut engine = ReplayEngine::launch(source, index, config)?;
        reply
            .before
            .push(stdout(format!("Replay session started for {}", engine.source().name())));
        if let Some(results) = args.overlay_results {
            let supplied = results.len();
            let attached = engine.attach_overlay_results(results);
            if attached < supplied {
                reply.before.push(console(format!(
                    "{} of {supplied} heap dump overlay results match no heap dump in the log",
                    supplied - attached
                )));
            }
        }
        reply.before.extend(engine.drain_output().into_iter().map(output_event));
        reply.after.push(Event::new("initialized", None));
        self.session = Some(Session {
            engine,
            checkpoints: CheckpointRegistry::new(),
            trace,
        });
        Ok(reply)
    }

    fn configuration_done(&mut self) -> CoreResult<Reply> {
        let session = self.session.as_mut().ok_or(CoreError::NoSession)?;
        if session.engine.config().stop_on_entry {
            let outcome = session.engine.start_at_entry();
            Ok(resume_reply(session, outcome))
        } else {
            self.resume(StepKind::Run)
        }
    }

    fn resume(&mut self, kind: StepKind) -> CoreResult<Reply> {
        let session = self.session.as_mut().ok_or(CoreError::NoSession)?;
        let outcome = session.engine.resume(kind);
        tracing::debug!(?kind, ?outcome, "resume");
        Ok(resume_reply(session, outcome))
    }

    fn set_breakpoints(&mut self, request: &Request) -> CoreResult<Reply> {
        let args: SetBreakpointsArguments = arguments(request)?;
        let session = self.session.as_mut().ok_or(CoreError::NoSession)?;
        let (Some(path), Some(requested)) = (args.source.path.clone(), args.breakpoints) else {
            return Ok(Reply::body(&json!({ "breakpoints": Vec::<Breakpoint>::new() })));
        };

        let index = session.engine.breakpoint_index();
        let uri = index.resolve_file(&path);
        let typeref = index.top_level_typeref(&uri).unwrap_or_default().to_string();
        let (marked, plain): (Vec<&SourceBreakpoint>, Vec<&SourceBreakpoint>) = requested
            .iter()
            .partition(|bp| is_checkpoint_condition(bp.condition.as_deref()));
        let checkpoints: Vec<Checkpoint> = marked
            .iter()
            .filter(|bp| index.can_bind(&uri, bp.line))
            .map(|bp| {
                Checkpoint::new(
                    uri.clone(),
                    typeref.clone(),
                    bp.line,
                    bp.hit_condition.as_deref(),
                    bp.log_message.as_deref(),
                )
            })
            .collect();

        let plain_lines: Vec<u32> = plain.iter().map(|bp| bp.line).collect();
        session.engine.set_breakpoints(&uri, &plain_lines);
        let had_checkpoints = session.checkpoints.checkpoints().iter().any(|cp| cp.uri == uri);
        let update = session.checkpoints.replace_file(&uri, checkpoints);

        let mut reply = Reply::default();
        let breakpoints: Vec<Breakpoint> = requested
            .iter()
            .map(|bp| {
                let verified = if is_checkpoint_condition(bp.condition.as_deref()) {
                    update.accepted.contains(&bp.line)
                } else {
                    session.engine.breakpoints().contains(&uri, bp.line)
                };
                Breakpoint {
                    verified,
                    line: bp.line,
                    source: Some(args.source.clone()),
                }
            })
            .collect();

        if session.trace.breakpoints {
            let verified: Vec<String> = session
                .engine
                .breakpoints()
                .lines_for(&uri)
                .iter()
                .map(u32::to_string)
                .collect();
            reply.before.push(console(format!(
                "setBreakpoints: path={path} uri={uri} verified lines={}",
                verified.join(",")
            )));
        }
        if let Some(warning) = update.warning(&path, session.checkpoints.limit()) {
            reply.after.push(console(warning));
        }
        if had_checkpoints || !marked.is_empty() {
            reply.after.push(Event::with_body(
                "checkpoint",
                &CheckpointEventBody {
                    checkpoints: session.checkpoints.checkpoints().to_vec(),
                },
            ));
        }
        reply.body = Some(json!({ "breakpoints": breakpoints }));
        Ok(reply)
    }

    fn stack_trace(&self) -> CoreResult<Reply> {
        let session = self.session.as_ref().ok_or(CoreError::NoSession)?;
        let frames: Vec<StackFrame> = session
            .engine
            .stack()
            .innermost_first()
            .map(|frame| StackFrame {
                id: frame.id,
                name: frame.name.clone(),
                source: frame.source.as_ref().map(client_source),
                line: frame.line,
                column: 0,
            })
            .collect();
        Ok(Reply::body(&json!({ "stackFrames": frames, "totalFrames": frames.len() })))
    }

    fn scopes(&mut self, request: &Request) -> CoreResult<Reply> {
        let args: ScopesArguments = arguments(request)?;
        let session = self.session.as_mut().ok_or(CoreError::NoSession)?;
        session.engine.apply_heap_dump();
        let scopes: Vec<Scope> = session
            .engine
            .state()
            .frame_info(args.frame_id)
            .map(|info| {
                [("Local", info.locals), ("Static", info.statics), ("Global", info.globals)]
                    .into_iter()
                    .map(|(name, map)| Scope {
                        name: name.to_string(),
                        variables_reference: map.variables_ref(),
                        expensive: false,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Reply::body(&json!({ "scopes": scopes })))
    }

    fn variables(&self, request: &Request) -> CoreResult<Reply> {
        let args: VariablesArguments = arguments(request)?;
        let session = self.session.as_ref().ok_or(CoreError::NoSession)?;
        let arena = session.engine.state().arena();
        let variables: Vec<Variable> = ChildrenId::from_variables_ref(args.variables_reference)
            .and_then(|id| arena.get(id))
            .map(|map| {
                map.values()
                    .map(|container| Variable {
                        name: container.name.clone(),
                        value: container.value.clone(),
                        type_name: container.type_name.clone(),
                        variables_reference: container
                            .children
                            .map_or(VariablesRef::NONE, ChildrenId::variables_ref),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Reply::body(&json!({ "variables": variables })))
    }

    fn disconnect(&mut self) -> Reply {
        if let Some(session) = self.session.take() {
            tracing::info!(session = %session.engine.id(), "session terminated");
        }
        self.disconnected = true;
        Reply {
            before: vec![stdout("Replay session terminated".to_string())],
            ..Reply::default()
        }
    }
}

fn threads() -> Reply {
    let threads = vec![Thread {
        id: THREAD_ID,
        name: String::new(),
    }];
    Reply::body(&json!({ "threads": threads }))
}

fn evaluate(request: &Request) -> CoreResult<Reply> {
    let args: EvaluateArguments = arguments(request)?;
    Ok(Reply::body(&json!({
        "result": args.expression,
        "variablesReference": VariablesRef::NONE,
    })))
}

/// Events for a resume: console output gathered while running, then the pause or end
fn resume_reply(session: &mut Session, outcome: StepOutcome) -> Reply {
    let mut after: Vec<Event> = session
        .engine
        .drain_output()
        .into_iter()
        .map(output_event)
        .collect();
    after.push(match outcome {
        StepOutcome::Stopped(reason) => Event::with_body(
            "stopped",
            &StoppedEventBody {
                reason: reason.as_str().to_string(),
                thread_id: THREAD_ID,
                all_threads_stopped: true,
            },
        ),
        StepOutcome::Terminated => Event::new("terminated", None),
    });
    Reply {
        after,
        ..Reply::default()
    }
}

fn output_event(output: EngineOutput) -> Event {
    match output {
        EngineOutput::UserDebug {
            message,
            source,
            line,
            ..
        } => Event::with_body(
            "output",
            &OutputEventBody {
                category: "stdout".to_string(),
                output: format!("{message}\n"),
                source: source.as_ref().map(client_source),
                line: Some(line),
            },
        ),
        EngineOutput::LogLine(line) => stdout(line),
        EngineOutput::Warning(text) => console(text),
    }
}

fn client_source(source: &FrameSource) -> Source {
    Source {
        name: Some(source.name.clone()),
        path: Some(client_path(&source.path).to_string()),
    }
}

fn stdout(text: String) -> Event {
    output_text("stdout", text)
}

fn console(text: String) -> Event {
    output_text("console", text)
}

fn output_text(category: &str, text: String) -> Event {
    Event::with_body(
        "output",
        &OutputEventBody {
            category: category.to_string(),
            output: format!("{text}\n"),
            source: None,
            line: None,
        },
    )
}

fn respond(request: &Request, success: bool, message: Option<String>, body: Option<Value>) -> Response {
    Response {
        seq: 0,
        request_seq: request.seq,
        success,
        command: request.command.clone(),
        message,
        body,
    }
}

fn arguments<T: DeserializeOwned>(request: &Request) -> CoreResult<T> {
    let raw = request.arguments.clone().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|err| CoreError::InvalidArguments {
        command: request.command.clone(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "48.0 APEX_CODE,FINEST;APEX_PROFILING,INFO;VISUALFORCE,FINER;";

    fn scenario_log() -> String {
        [
            HEADER,
            "12:00:00.0 (1)|CODE_UNIT_STARTED|[EXTERNAL]|MyClass",
            "12:00:00.0 (2)|VARIABLE_SCOPE_BEGIN|[5]|count|Integer|false|false",
            "12:00:00.0 (3)|VARIABLE_ASSIGNMENT|[5]|count|5",
            "12:00:00.0 (4)|STATEMENT_EXECUTE|[5]",
            "12:00:00.0 (5)|USER_DEBUG|[6]|DEBUG|count is 5",
            "12:00:00.0 (6)|CODE_UNIT_FINISHED|MyClass",
        ]
        .join("\n")
    }

    fn launch_args(stop_on_entry: bool) -> Value {
        json!({
            "logFile": "/logs/scenario.log",
            "logFileContents": scenario_log(),
            "stopOnEntry": stop_on_entry,
            "lineBreakpointInfo": [
                {"uri": "file:///proj/MyClass.cls", "typeref": "MyClass", "lines": [3, 4, 5, 6, 7, 8, 9]}
            ],
        })
    }

    struct Client {
        adapter: DebugAdapter,
        seq: i64,
    }

    impl Client {
        fn new() -> Self {
            Self {
                adapter: DebugAdapter::new(),
                seq: 0,
            }
        }

        fn send(&mut self, command: &str, arguments: Option<Value>) -> Vec<ProtocolMessage> {
            self.seq += 1;
            self.adapter.handle(&Request::new(self.seq, command, arguments))
        }

        fn launched(stop_on_entry: bool) -> Self {
            let mut client = Self::new();
            client.send("initialize", Some(json!({"adapterID": "logstep"})));
            let messages = client.send("launch", Some(launch_args(stop_on_entry)));
            assert!(response(&messages).success);
            client
        }
    }

    fn response(messages: &[ProtocolMessage]) -> &Response {
        messages.iter().find_map(ProtocolMessage::as_response).unwrap()
    }

    fn events<'a>(messages: &'a [ProtocolMessage], name: &str) -> Vec<&'a Event> {
        messages
            .iter()
            .filter_map(ProtocolMessage::as_event)
            .filter(|event| event.event == name)
            .collect()
    }

    fn set_breakpoints(client: &mut Client, breakpoints: Value) -> Vec<ProtocolMessage> {
        client.send(
            "setBreakpoints",
            Some(json!({"source": {"path": "/proj/MyClass.cls"}, "breakpoints": breakpoints})),
        )
    }

    #[test]
    fn test_initialize_capabilities() {
        let mut client = Client::new();
        let messages = client.send("initialize", None);
        let body = response(&messages).body.clone().unwrap();
        assert_eq!(body["supportsConfigurationDoneRequest"], true);
        assert_eq!(body["supportsConditionalBreakpoints"], true);
    }

    #[test]
    fn test_launch_then_initialized_event() {
        let mut client = Client::new();
        let messages = client.send("launch", Some(launch_args(false)));
        assert!(response(&messages).success);
        assert_eq!(events(&messages, "initialized").len(), 1);
        let last = messages.last().and_then(ProtocolMessage::as_event).unwrap();
        assert_eq!(last.event, "initialized");
        let seqs: Vec<i64> = messages
            .iter()
            .map(|m| serde_json::to_value(m).unwrap()["seq"].as_i64().unwrap())
            .collect();
        assert!(seqs.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_launch_failures() {
        let mut client = Client::new();
        let messages = client.send("launch", Some(json!({"logFile": "/definitely/missing.log"})));
        let reply = response(&messages);
        assert!(!reply.success);
        assert!(reply.message.as_deref().unwrap().contains("missing.log"));
        assert!(client.adapter.session().is_none());

        let messages = client.send("launch", Some(json!({"logFile": "/e.log", "logFileContents": "\n\n"})));
        assert!(!response(&messages).success);

        let messages = client.send("launch", None);
        assert!(!response(&messages).success);

        let messages = client.send("continue", None);
        assert_eq!(response(&messages).message.as_deref(), Some(CoreError::NoSession.to_string().as_str()));
    }

    #[test]
    fn test_launch_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(scenario_log().as_bytes()).unwrap();
        let mut client = Client::new();
        let path = file.path().to_string_lossy().into_owned();
        let messages = client.send("launch", Some(json!({"logFile": path, "logFileName": "named.log"})));
        assert!(response(&messages).success);
        let session = client.adapter.session().unwrap();
        assert_eq!(session.engine().source().name(), "named.log");
    }

    #[test]
    fn test_run_without_breakpoints_terminates() {
        let mut client = Client::launched(false);
        let messages = client.send("configurationDone", None);
        assert!(response(&messages).success);
        assert_eq!(events(&messages, "terminated").len(), 1);
        assert!(events(&messages, "stopped").is_empty());
        let output = events(&messages, "output");
        assert_eq!(output.len(), 1);
        let body = output[0].body.as_ref().unwrap();
        assert_eq!(body["output"], "count is 5\n");
        assert_eq!(body["line"], 6);
        assert_eq!(body["source"]["path"], "/proj/MyClass.cls");

        let messages = client.send("continue", None);
        assert!(response(&messages).success);
        assert_eq!(events(&messages, "terminated").len(), 1);
    }

    #[test]
    fn test_breakpoint_stop_and_inspection() {
        let mut client = Client::launched(false);
        let messages = set_breakpoints(&mut client, json!([{"line": 5}, {"line": 20}]));
        let body = response(&messages).body.clone().unwrap();
        assert_eq!(body["breakpoints"][0]["verified"], true);
        assert_eq!(body["breakpoints"][1]["verified"], false);
        assert_eq!(body["breakpoints"][1]["line"], 20);

        let messages = client.send("configurationDone", None);
        let stopped = events(&messages, "stopped");
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].body.as_ref().unwrap()["reason"], "breakpoint");
        assert!(events(&messages, "terminated").is_empty());

        let messages = client.send("threads", None);
        assert_eq!(response(&messages).body.clone().unwrap()["threads"][0]["id"], 1);

        let messages = client.send("stackTrace", Some(json!({"threadId": 1})));
        let body = response(&messages).body.clone().unwrap();
        let top = &body["stackFrames"][0];
        assert_eq!(top["name"], "MyClass");
        assert_eq!(top["line"], 5);
        assert_eq!(top["source"]["path"], "/proj/MyClass.cls");
        assert_eq!(top["source"]["name"], "MyClass.cls");

        let frame_id = top["id"].clone();
        let messages = client.send("scopes", Some(json!({"frameId": frame_id})));
        let scopes = response(&messages).body.clone().unwrap()["scopes"].clone();
        let names: Vec<&str> = scopes.as_array().unwrap().iter().map(|s| s["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Local", "Static", "Global"]);

        let local_ref = scopes[0]["variablesReference"].clone();
        let messages = client.send("variables", Some(json!({"variablesReference": local_ref})));
        let variables = response(&messages).body.clone().unwrap()["variables"].clone();
        assert_eq!(variables[0]["name"], "count");
        assert_eq!(variables[0]["value"], "5");
        assert_eq!(variables[0]["type"], "Integer");

        let messages = client.send("continue", None);
        assert_eq!(events(&messages, "terminated").len(), 1);
    }

    #[test]
    fn test_stop_on_entry_and_steps() {
        let mut client = Client::launched(true);
        let messages = client.send("configurationDone", None);
        let stopped = events(&messages, "stopped");
        assert_eq!(stopped[0].body.as_ref().unwrap()["reason"], "entry");

        let messages = client.send("stackTrace", Some(json!({"threadId": 1})));
        let body = response(&messages).body.clone().unwrap();
        assert_eq!(body["totalFrames"], 1);
        assert_eq!(body["stackFrames"][0]["name"], "scenario.log");
        assert_eq!(body["stackFrames"][0]["line"], 1);

        let messages = client.send("stepIn", Some(json!({"threadId": 1})));
        assert_eq!(events(&messages, "stopped")[0].body.as_ref().unwrap()["reason"], "step");

        let messages = client.send("next", Some(json!({"threadId": 1})));
        assert_eq!(events(&messages, "terminated").len(), 1);
    }

    #[test]
    fn test_heap_dump_overlay_replaces_variables() {
        let log = [
            HEADER,
            "t|CODE_UNIT_STARTED|[EXTERNAL]|MyClass",
            "t|VARIABLE_SCOPE_BEGIN|[5]|count|Integer|false|false",
            "t|VARIABLE_ASSIGNMENT|[5]|count|5",
            "t|HEAP_DUMP|[5]|1ct01|MyClass||5",
            "t|STATEMENT_EXECUTE|[5]",
            "t|HEAP_DUMP|[6]|1ct02",
            "t|CODE_UNIT_FINISHED|MyClass",
        ]
        .join("\n");
        let mut client = Client::new();
        let messages = client.send(
            "launch",
            Some(json!({
                "logFile": "/logs/heap.log",
                "logFileContents": log,
                "lineBreakpointInfo": [{"uri": "file:///proj/MyClass.cls", "typeref": "MyClass", "lines": [5]}],
                "overlayResults": [{
                    "Id": "1ct01",
                    "HeapDump": {"extents": [{
                        "typeName": "Integer",
                        "extent": [{"address": "0x1", "symbols": ["count"], "value": {"value": 42}}]
                    }]}
                }],
            })),
        );
        assert!(response(&messages).success);
        let warnings: Vec<&Event> = events(&messages, "output")
            .into_iter()
            .filter(|event| event.body.as_ref().unwrap()["category"] == "console")
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].body.as_ref().unwrap()["output"],
            "Malformed log line 7: t|HEAP_DUMP|[6]|1ct02\n"
        );

        set_breakpoints(&mut client, json!([{"line": 5}]));
        let messages = client.send("configurationDone", None);
        assert_eq!(events(&messages, "stopped").len(), 1);

        let messages = client.send("stackTrace", Some(json!({"threadId": 1})));
        let frame_id = response(&messages).body.clone().unwrap()["stackFrames"][0]["id"].clone();
        let messages = client.send("scopes", Some(json!({"frameId": frame_id})));
        let local_ref = response(&messages).body.clone().unwrap()["scopes"][0]["variablesReference"].clone();
        let messages = client.send("variables", Some(json!({"variablesReference": local_ref})));
        let variables = response(&messages).body.clone().unwrap()["variables"].clone();
        assert_eq!(variables[0]["name"], "count");
        assert_eq!(variables[0]["value"], "42");
        assert!(client.adapter.session().unwrap().engine().is_showing_heap_dump());

        let messages = client.send("continue", None);
        assert_eq!(events(&messages, "terminated").len(), 1);
    }

    #[test]
    fn test_unknown_scope_and_variables_are_empty() {
        let mut client = Client::launched(false);
        let messages = client.send("scopes", Some(json!({"frameId": 999})));
        assert_eq!(response(&messages).body.clone().unwrap()["scopes"], json!([]));
        let messages = client.send("variables", Some(json!({"variablesReference": 0})));
        assert_eq!(response(&messages).body.clone().unwrap()["variables"], json!([]));
    }

    #[test]
    fn test_checkpoint_overflow_single_warning() {
        let mut client = Client::launched(false);
        let marked: Vec<Value> = (3..=9)
            .map(|line| json!({"line": line, "condition": "Checkpoint", "hitCondition": "2"}))
            .collect();
        let messages = set_breakpoints(&mut client, Value::Array(marked));
        let body = response(&messages).body.clone().unwrap();
        let verified: Vec<bool> = body["breakpoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|bp| bp["verified"].as_bool().unwrap())
            .collect();
        assert_eq!(verified, vec![true, true, true, true, true, false, false]);

        let warnings: Vec<&Event> = events(&messages, "output")
            .into_iter()
            .filter(|e| e.body.as_ref().unwrap()["output"].as_str().unwrap().contains("Only 5 checkpoints"))
            .collect();
        assert_eq!(warnings.len(), 1);

        let checkpoint_events = events(&messages, "checkpoint");
        assert_eq!(checkpoint_events.len(), 1);
        let listed = checkpoint_events[0].body.as_ref().unwrap()["checkpoints"].as_array().unwrap().len();
        assert_eq!(listed, 5);

        let session = client.adapter.session().unwrap();
        assert_eq!(session.checkpoints().len(), 5);
        assert!(session.engine().breakpoints().is_empty());
        let first = &session.checkpoints().checkpoints()[0];
        assert_eq!(first.executable_type_name, "MyClass");
        assert_eq!(first.iterations, 2);
    }

    #[test]
    fn test_unbindable_checkpoint_not_registered() {
        let mut client = Client::launched(false);
        let messages = set_breakpoints(&mut client, json!([{"line": 50, "condition": "checkpoint"}]));
        let body = response(&messages).body.clone().unwrap();
        assert_eq!(body["breakpoints"][0]["verified"], false);
        assert!(client.adapter.session().unwrap().checkpoints().is_empty());
    }

    #[test]
    fn test_evaluate_unknown_and_disconnect() {
        let mut client = Client::launched(false);
        let messages = client.send("evaluate", Some(json!({"expression": "a + b"})));
        assert_eq!(response(&messages).body.clone().unwrap()["result"], "a + b");

        let messages = client.send("restartFrame", None);
        let reply = response(&messages);
        assert!(!reply.success);
        assert!(reply.message.as_deref().unwrap().contains("unsupported command"));

        let messages = client.send("disconnect", None);
        assert!(response(&messages).success);
        assert_eq!(events(&messages, "output").len(), 1);
        assert!(client.adapter.is_disconnected());
        assert!(client.adapter.session().is_none());
    }

    #[test]
    fn test_logfile_trace_echoes_lines() {
        let mut client = Client::new();
        let mut args = launch_args(false);
        args["trace"] = json!("logfile");
        assert!(response(&client.send("launch", Some(args))).success);
        let messages = client.send("configurationDone", None);
        let echoed = events(&messages, "output")
            .into_iter()
            .filter(|e| e.body.as_ref().unwrap()["output"].as_str().unwrap().contains("CODE_UNIT"))
            .count();
        assert_eq!(echoed, 2);
    }
}
