//! Fuzz test for canonical serialization
//!
//! Whenever arbitrary input parses and its tree serializes, the canonical
//! text must parse back to the same tree and print identically.
//!
//! Run with: cargo +nightly fuzz run round_trip_fuzz -- -max_total_time=60

#![no_main]

use cvu_dsl::{parse, serialize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(selectors) = parse(input) else {
        return;
    };
    let Ok(printed) = serialize(&selectors) else {
        return;
    };

    let reparsed = match parse(&printed) {
        Ok(reparsed) => reparsed,
        Err(err) => panic!("Canonical text failed to parse: {}\n{}", err, printed),
    };
    assert_eq!(selectors, reparsed, "Round trip changed the tree:\n{}", printed);
    assert_eq!(serialize(&reparsed).ok().as_deref(), Some(printed.as_str()));
});
