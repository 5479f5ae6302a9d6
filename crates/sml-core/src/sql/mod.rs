// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! SQL-side utilities.
//!
//! The SML parser treats SQL expressions as opaque text except for two
//! narrow needs: scanning join conditions for the one/many decorator
//! rules, and the atomicity checks consumers run on column and table
//! expressions. This module provides the shared tokenizer behind both,
//! plus the dialect-specific quoting helpers.
//!
//! None of this is a SQL parser; the tokenizer is a flat lexical split.

mod dialect;
mod tokenizer;

pub use dialect::{create_qualified_names, get_quotes, DialectError, DIALECT_DUCKDB};
pub use tokenizer::{
    is_column_expression_atomic, is_reserved_word, is_table_atomic, tokenize, SqlToken,
    SqlTokenKind,
};
