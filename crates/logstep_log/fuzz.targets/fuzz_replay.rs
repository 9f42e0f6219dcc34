#![no_main]
use libfuzzer_sys::fuzz_target;
use logstep_log::LogSource;
use logstep_replay::{BreakpointIndex, ReplayEngine, StepKind};

fuzz_target!(|data: &[u8]| {
    // A full replay of arbitrary text must terminate without panicking
    if let Ok(text) = std::str::from_utf8(data) {
        let source = LogSource::from_contents("fuzz.log", text);
        let mut engine = ReplayEngine::new(source, BreakpointIndex::new());
        while !engine.is_terminated() {
            let _ = engine.resume(StepKind::In);
        }
    }
});
