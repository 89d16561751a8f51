#![no_main]

use changewatch::models::edivisive::protocol;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Tool output is read lossily, so any bytes are fair input
    let lines: Vec<String> = String::from_utf8_lossy(data)
        .lines()
        .map(str::to_string)
        .collect();

    // Neither parser may panic, whatever the tool prints
    let _ = protocol::check_validation(&lines);
    for point in protocol::parse_change_points(&lines) {
        assert!(point.summary.ends_with('%'));
    }
});
