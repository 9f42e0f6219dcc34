#![no_main]
use libfuzzer_sys::fuzz_target;
use logstep_log::classify_line;

fuzz_target!(|data: &[u8]| {
    // Any text must classify without panicking
    if let Ok(text) = std::str::from_utf8(data) {
        for line in text.lines() {
            let _ = classify_line(line);
        }
    }
});
