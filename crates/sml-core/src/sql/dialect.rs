// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Dialect-specific quoting helpers.
//!
//! Table and column names in the backend namespace can contain spaces
//! and other special characters, so they are enclosed in dialect
//! specific quotes when qualified names are built.

use thiserror::Error;

/// The DuckDB dialect identifier.
pub const DIALECT_DUCKDB: &str = "duckdb";

/// A dialect helper failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialectError {
    /// The dialect is not recognized by the quoting helpers.
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),
}

/// Returns the `(start, end)` quote strings for a dialect.
pub fn get_quotes(dialect: &str) -> Result<(&'static str, &'static str), DialectError> {
    if dialect.eq_ignore_ascii_case(DIALECT_DUCKDB) {
        Ok(("`", "`"))
    } else {
        Err(DialectError::UnsupportedDialect(dialect.to_owned()))
    }
}

/// Combines `names` into a dot-separated qualified name, quoting each
/// component that is not already quoted.
pub fn create_qualified_names(names: &[&str], dialect: &str) -> Result<String, DialectError> {
    if names.is_empty() {
        return Ok(String::new());
    }
    let (start, end) = get_quotes(dialect)?;
    let mut parts = Vec::with_capacity(names.len());
    for name in names {
        if name.starts_with(start) {
            parts.push((*name).to_owned());
        } else {
            parts.push(format!("{start}{name}{end}"));
        }
    }
    Ok(parts.join("."))
}
