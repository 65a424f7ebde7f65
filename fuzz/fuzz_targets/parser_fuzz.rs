//! Fuzz test for the CVU parser
//!
//! Arbitrary UTF-8 either parses or fails with a ParseError carrying a
//! valid position. The session-aware grammar must accept everything the
//! default grammar accepts.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use cvu_dsl::{default_grammar, parse, parse_with};
use cvu_core::Domain;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let default = parse(input);
        match &default {
            Ok(selectors) => {
                for selector in selectors {
                    assert_eq!(selector.domain, Domain::Defaults);
                    assert!(!selector.selector.is_empty(), "Selector text should not be empty");
                }
            }
            Err(err) => {
                assert!(err.line() >= 1, "Error line should be >= 1");
                assert!(err.column() >= 1, "Error column should be >= 1");
                assert!(!err.to_string().is_empty(), "Error message should not be empty");
            }
        }

        let grammar = default_grammar().clone().with_session_definitions();
        let extended = parse_with(input, &grammar, Domain::Defaults);
        if default.is_ok() {
            assert!(extended.is_ok(), "Session grammar rejected {:?}", input);
        }
    }
});
