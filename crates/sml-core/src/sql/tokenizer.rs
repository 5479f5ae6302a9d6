// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! A flat tokenizer for SQL expressions.
//!
//! Splits an expression into numbers, names, strings and operator
//! characters; adjacent `name . name` triples are merged into one
//! qualified-name token, and bare names matching the SQL-2003 reserved
//! word list are marked reserved. Positions are byte offsets into the
//! (newline-flattened) input.

use std::collections::HashSet;

use ecow::EcoString;
use once_cell::sync::Lazy;
use regex::Regex;

/// The kind of a [`SqlToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlTokenKind {
    /// A numeric literal: `42`, `.5`, `1e-3`.
    Number,
    /// A quoted string literal (single or double quotes).
    String,
    /// A bare, backquoted, or qualified name.
    Name,
    /// An operator or any other single non-space character.
    Op,
    /// A bare name that is a SQL reserved word (`AND`, `SELECT`, …).
    Reserved,
}

/// One token of a SQL expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlToken {
    /// Byte offset of the token in the input.
    pub position: usize,
    pub kind: SqlTokenKind,
    /// The token text. For a qualified name this is the table part.
    pub value: EcoString,
    /// The column part of a qualified `table.column` name.
    pub member: Option<EcoString>,
}

impl SqlToken {
    /// Returns `true` for numeric literals.
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self.kind, SqlTokenKind::Number)
    }

    /// Returns `true` for string literals.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self.kind, SqlTokenKind::String)
    }

    /// Returns `true` for (possibly qualified) names.
    #[must_use]
    pub const fn is_name(&self) -> bool {
        matches!(self.kind, SqlTokenKind::Name)
    }

    /// Returns `true` for operators.
    #[must_use]
    pub const fn is_op(&self) -> bool {
        matches!(self.kind, SqlTokenKind::Op)
    }

    /// Returns `true` for reserved words.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self.kind, SqlTokenKind::Reserved)
    }
}

/// Token alternation. Group order decides the token kind; the catch-all
/// turns any other non-space character into an operator token.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"((?:(?:\d+\.\d*)|(?:\.\d+)|(?:\d+))(?:[eE][-+]?\d+)?)"#, // 1: number
        r#"|([a-zA-Z_]\w*)"#,                                       // 2: name
        r#"|(<=|>=|<>)"#,                                           // 3: operator
        r#"|(`[^`]+`)"#,                                            // 4: backquoted name
        r#"|("(?:""|\\"|[^"])*")"#,                                 // 5: double-quoted string
        r#"|('(?:''|\\'|[^'])*')"#,                                 // 6: single-quoted string
        r#"|(\S)"#,                                                 // 7: catch-all
    ))
    .expect("token pattern compiles")
});

const GROUP_KINDS: [SqlTokenKind; 7] = [
    SqlTokenKind::Number,
    SqlTokenKind::Name,
    SqlTokenKind::Op,
    SqlTokenKind::Name,   // backquoted
    SqlTokenKind::String, // double-quoted
    SqlTokenKind::String, // single-quoted
    SqlTokenKind::Op,     // catch-all
];

/// Tokenizes a SQL expression.
///
/// Newlines are flattened to spaces first. `table . column` name
/// triples are merged into single qualified-name tokens; chains like
/// `a.b.c` are not merged further.
#[must_use]
pub fn tokenize(sql: &str) -> Vec<SqlToken> {
    let flat = sql.replace(['\n', '\r'], " ");
    let mut tokens: Vec<SqlToken> = Vec::new();
    for captures in TOKEN_RE.captures_iter(&flat) {
        for (group, kind) in GROUP_KINDS.iter().enumerate() {
            if let Some(m) = captures.get(group + 1) {
                tokens.push(SqlToken {
                    position: m.start(),
                    kind: *kind,
                    value: EcoString::from(m.as_str()),
                    member: None,
                });
                break;
            }
        }
    }

    // Merge `x . y` into one qualified-name token.
    let mut i = tokens.len().saturating_sub(1);
    while i > 1 {
        if tokens[i].is_name() && tokens[i - 1].value == "." && tokens[i - 2].is_name() {
            let member = tokens[i].value.clone();
            tokens[i - 2].member = Some(member);
            tokens.drain(i - 1..=i);
            if i < 3 {
                break;
            }
            i -= 3;
        } else {
            i -= 1;
        }
    }

    // Bare names that are reserved words.
    for token in &mut tokens {
        if token.is_name()
            && token.member.is_none()
            && RESERVED_WORDS.contains(token.value.to_uppercase().as_str())
        {
            token.kind = SqlTokenKind::Reserved;
        }
    }
    tokens
}

/// Returns `true` if `word` is a SQL reserved word (case-insensitive).
#[must_use]
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word.to_uppercase().as_str())
}

/// Returns `true` if `expression` is atomic: a single backquoted or
/// bracketed name, or any expression that tokenizes to one token.
#[must_use]
pub fn is_column_expression_atomic(expression: &str) -> bool {
    if is_special_atomic(expression) {
        return true;
    }
    tokenize(expression).len() == 1
}

fn is_special_atomic(expression: &str) -> bool {
    let bytes = expression.as_bytes();
    let n = bytes.len();
    if n > 2 {
        if bytes[0] == b'`' && bytes[n - 1] == b'`' && !expression[1..n - 1].contains('`') {
            return true;
        }
        if bytes[0] == b'['
            && bytes[n - 1] == b']'
            && !expression[1..n - 1].contains(['[', ']'])
        {
            return true;
        }
    }
    false
}

/// Returns `true` unless the table expression is itself a `select`.
#[must_use]
pub fn is_table_atomic(sql: &str) -> bool {
    let trimmed = sql.trim().trim_start_matches('(');
    let mut words = trimmed.split_whitespace();
    match (words.next(), words.next()) {
        (Some(first), Some(_)) => !first.eq_ignore_ascii_case("select"),
        _ => true,
    }
}

/// SQL-2003 reserved words, plus a handful of common non-reserved ones.
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    RESERVED_WORD_LIST.iter().copied().collect()
});

#[rustfmt::skip]
const RESERVED_WORD_LIST: &[&str] = &[
    // "reserved"
    "ADD", "ALL", "ALLOCATE", "ALTER", "AND", "ANY", "ARE", "ARRAY",
    "AS", "ASENSITIVE", "ASYMMETRIC", "AT", "ATOMIC", "AUTHORIZATION",
    "BEGIN", "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOOLEAN", "BOTH",
    "BY", "CALL", "CALLED", "CASCADED", "CASE", "CAST", "CHAR",
    "CHARACTER", "CHECK", "CLOB", "CLOSE", "COLLATE", "COLUMN", "COMMIT",
    "CONNECT", "CONSTRAINT", "CONTINUE", "CORRESPONDING", "CREATE",
    "CROSS", "CUBE", "CURRENT", "CURRENT_DATE",
    "CURRENT_DEFAULT_TRANSFORM_GROUP", "CURRENT_PATH", "CURRENT_ROLE",
    "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_TRANSFORM_GROUP_FOR_TYPE",
    "CURRENT_USER", "CURSOR", "CYCLE", "DATE", "DAY", "DEALLOCATE",
    "DEC", "DECIMAL", "DECLARE", "DEFAULT", "DELETE", "DEREF", "DESCRIBE",
    "DETERMINISTIC", "DISCONNECT", "DISTINCT", "DOUBLE", "DROP",
    "DYNAMIC", "EACH", "ELEMENT", "ELSE", "END", "END-EXEC", "ESCAPE",
    "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "EXTERNAL", "FALSE", "FETCH",
    "FILTER", "FLOAT", "FOR", "FOREIGN", "FREE", "FROM", "FULL",
    "FUNCTION", "GET", "GLOBAL", "GRANT", "GROUP", "GROUPING", "HAVING",
    "HOLD", "HOUR", "IDENTITY", "IMMEDIATE", "IN", "INDICATOR", "INNER",
    "INOUT", "INPUT", "INSENSITIVE", "INSERT", "INT", "INTEGER",
    "INTERSECT", "INTERVAL", "INTO", "IS", "ISOLATION", "JOIN", "LANGUAGE",
    "LARGE", "LATERAL", "LEADING", "LEFT", "LIKE", "LOCAL", "LOCALTIME",
    "LOCALTIMESTAMP", "MATCH", "MEMBER", "MERGE", "METHOD", "MINUTE",
    "MODIFIES", "MODULE", "MONTH", "MULTISET", "NATIONAL", "NATURAL",
    "NCHAR", "NCLOB", "NEW", "NO", "NONE", "NOT", "NULL", "NUMERIC",
    "OF", "OLD", "ON", "ONLY", "OPEN", "OR", "ORDER", "OUT", "OUTER",
    "OUTPUT", "OVER", "OVERLAPS", "PARAMETER", "PARTITION", "PRECISION",
    "PREPARE", "PRIMARY", "PROCEDURE", "RANGE", "READS", "REAL",
    "RECURSIVE", "REF", "REFERENCES", "REFERENCING", "REGR_AVGX",
    "REGR_AVGY", "REGR_COUNT", "REGR_INTERCEPT", "REGR_R2", "REGR_SLOPE",
    "REGR_SXX", "REGR_SXY", "REGR_SYY", "RELEASE", "RESULT", "RETURN",
    "RETURNS", "REVOKE", "RIGHT", "ROLLBACK", "ROLLUP", "ROW", "ROWS",
    "SAVEPOINT", "SCROLL", "SEARCH", "SECOND", "SELECT", "SENSITIVE",
    "SESSION_USER", "SET", "SIMILAR", "SMALLINT", "SOME", "SPECIFIC",
    "SPECIFICTYPE", "SQL", "SQLEXCEPTION", "SQLSTATE", "SQLWARNING",
    "START", "STATIC", "SUBMULTISET", "SYMMETRIC", "SYSTEM", "SYSTEM_USER",
    "TABLE", "THEN", "TIME", "TIMESTAMP", "TIMEZONE_HOUR", "TIMEZONE_MINUTE",
    "TO", "TRAILING", "TRANSLATION", "TREAT", "TRIGGER", "TRUE",
    "UESCAPE", "UNION", "UNIQUE", "UNKNOWN", "UNNEST", "UPDATE", "UPPER",
    "USER", "USING", "VALUE", "VALUES", "VAR_POP", "VAR_SAMP", "VARCHAR",
    "VARYING", "WHEN", "WHENEVER", "WHERE", "WIDTH_BUCKET", "WINDOW",
    "WITH", "WITHIN", "WITHOUT", "YEAR",
    // some of the "non-reserved"
    "ASC", "CEIL", "CEILING", "CHARACTERS",
    "CHARACTER_LENGTH", "CHARACTER_SET_CATALOG", "CHARACTER_SET_NAME",
    "CHARACTER_SET_SCHEMA", "CHAR_LENGTH", "CONTAINS",
    "DATETIME_INTERVAL_CODE", "DATETIME_INTERVAL_PRECISION",
    "DENSE_RANK", "DESC", "EQUALS", "EXCLUDE", "EXCLUDING", "EXP",
    "FIRST", "FLOOR", "FOLLOWING", "FOUND", "GO", "GOTO", "INCLUDING",
    "INTERSECTION", "KEY", "KEY_MEMBER", "KEY_TYPE", "LAST", "LENGTH",
    "LOWER", "MAXVALUE", "MESSAGE_LENGTH",
    "MESSAGE_OCTET_LENGTH", "MESSAGE_TEXT", "MINVALUE", "MOD",
    "NESTING", "NEXT", "NULLABLE", "NULLIF", "NULLS", "PERCENTILE_CONT",
    "PERCENTILE_DISC", "PERCENT_RANK", "POWER", "PRECEDING", "PRESERVE",
    "ROW_COUNT", "SIZE", "STDDEV_POP",
    "STDDEV_SAMP", "SUBSTRING", "TRIM", "TYPE",
    // extra
    "STRING", "DATETIME", "LIMIT",
];
