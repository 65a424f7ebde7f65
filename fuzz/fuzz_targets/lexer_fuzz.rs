//! Fuzz test for the CVU lexer
//!
//! Arbitrary UTF-8 either tokenizes to a stream ending in Eof or fails with
//! a positioned LexError. It never panics or loops.
//!
//! `-` boundaries: a `-` inside a word stays in the identifier (`a-1`), and a
//! number carries a minus sign exactly when its text starts with `-`.
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use cvu_dsl::{Lexer, TokenKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match Lexer::new(input).tokenize() {
            Ok(tokens) => {
                assert_eq!(
                    tokens.last().map(|t| &t.kind),
                    Some(&TokenKind::Eof),
                    "Last token should always be Eof"
                );
                for token in &tokens {
                    assert!(token.span.start <= token.span.end, "Span start should be <= end");
                    assert!(token.span.end <= input.len(), "Span should stay inside the input");
                    assert!(token.span.line >= 1, "Line numbers should be >= 1");
                    assert!(token.span.column >= 1, "Column numbers should be >= 1");

                    let text = input.get(token.span.start..token.span.end).unwrap_or_default();
                    match &token.kind {
                        TokenKind::Identifier(name) => {
                            assert!(!name.starts_with('-'), "Identifier {:?} starts with '-'", name);
                        }
                        TokenKind::Number(value) => {
                            assert_eq!(
                                value.is_sign_negative(),
                                text.starts_with('-'),
                                "Sign of {} disagrees with {:?}",
                                value,
                                text
                            );
                        }
                        _ => {}
                    }
                }

                // An identifier never hands a trailing `-1` to a number.
                for pair in tokens.windows(2) {
                    if let (TokenKind::Identifier(_), TokenKind::Number(_)) = (&pair[0].kind, &pair[1].kind) {
                        let next = input.get(pair[1].span.start..pair[1].span.end).unwrap_or_default();
                        if next.starts_with('-') {
                            assert!(
                                pair[0].span.end < pair[1].span.start,
                                "'-' split off identifier at {}",
                                pair[1].span.start
                            );
                        }
                    }
                }
            }
            Err(err) => {
                assert!(err.line() >= 1, "Error line should be >= 1");
                assert!(err.column() >= 1, "Error column should be >= 1");
            }
        }
    }
});
