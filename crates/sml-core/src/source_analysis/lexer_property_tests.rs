// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the lexer.
//!
//! The lexer must be a total function: any byte soup in, a well-formed
//! token stream out, ending in exactly one Eof sentinel.

use proptest::prelude::*;

use super::{lex, TokenKind};

proptest! {
    #[test]
    fn lexing_never_panics(input in any::<String>()) {
        let _ = lex(&input);
    }

    #[test]
    fn streams_end_with_exactly_one_eof(input in any::<String>()) {
        let tokens = lex(&input);
        prop_assert!(tokens.last().is_some_and(|t| t.kind.is_eof()));
        prop_assert_eq!(tokens.iter().filter(|t| t.kind.is_eof()).count(), 1);
        prop_assert_eq!(tokens.last().map(|t| t.indent), Some(-1));
    }

    #[test]
    fn token_lines_are_positive_and_nondecreasing(input in any::<String>()) {
        let mut last = 1;
        for token in lex(&input) {
            prop_assert!(token.line >= 1);
            prop_assert!(token.line >= last);
            last = token.line;
        }
    }

    #[test]
    fn keyword_tokens_have_nonnegative_indent(input in any::<String>()) {
        for token in lex(&input) {
            if matches!(token.kind, TokenKind::Keyword(_)) {
                prop_assert!(token.indent >= 0);
            }
        }
    }

    #[test]
    fn lexing_is_deterministic(input in any::<String>()) {
        prop_assert_eq!(lex(&input), lex(&input));
    }
}
