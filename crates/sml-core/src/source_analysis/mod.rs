// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Source analysis for SML model files.
//!
//! This module covers everything that happens before semantic parsing:
//!
//! - [`Lexer`] turns raw text into a stream of [`Token`]s, one per
//!   source line, each carrying its indentation depth
//! - [`parse_generic`] rebuilds the hierarchy implied by indentation
//!   into an untyped [`GenericNode`] tree
//! - [`KwTree`] declares which keywords may nest under which, and
//!   [`find_indentation_errors`] diagnoses violations with a concrete
//!   "move left/right" suggestion
//!
//! Lexical errors never abort the lexer (except unterminated string
//! literals); they surface as [`TokenKind::Error`] tokens which the
//! tree builder records as [`ParseError`]s and skips.

mod error;
mod generic;
mod grammar;
mod lexer;
mod token;

pub use error::{ParseError, NO_LINE};
pub use generic::{generic_to_string, parse_generic, GenericNode};
pub use grammar::{find_indentation_errors, is_valid_path, sml_grammar, KwTree};
pub use lexer::{lex, lex_with_comments, Lexer, TokenStream};
pub use token::{Comment, Keyword, Token, TokenKind};

#[cfg(test)]
mod lexer_property_tests;
