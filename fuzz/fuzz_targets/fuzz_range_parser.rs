#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Range expressions come straight from users: any input must either
    // parse or be rejected, never panic
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(range) = mzrefine::refiner::parse_range(text) {
        // The bracketed form of a parsed range must parse as well
        let _ = mzrefine::refiner::parse_range(&range.to_string());
    }
});
