// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token types for SML lexical analysis.
//!
//! SML is lexed one line at a time; a token therefore represents a whole
//! source line: its indentation depth, the keyword that opens it, and an
//! optional value. Two sentinel kinds exist beyond ordinary keywords:
//! end-of-input, and error tokens that carry their diagnostic text so
//! downstream stages can record and skip them.

use ecow::EcoString;
use serde::{Deserialize, Serialize};

/// An SML keyword.
///
/// The vocabulary is fixed: every non-comment line starts with one of
/// these words. Variants are ordered alphabetically, matching the
/// order of [`Keyword::as_str`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Keyword {
    AuxiliaryColumn,
    Column,
    Combine,
    Criteria,
    Dataset,
    Description,
    Evaluation,
    Format,
    Granularity,
    Join,
    Label,
    Name,
    On,
    Operator,
    Project,
    Scheme,
    Sql,
    Table,
    Term,
    Then,
    Transformer,
    TransformerName,
    Type,
    Value,
}

impl Keyword {
    /// Looks up a keyword by its source spelling.
    #[must_use]
    pub fn from_str(word: &str) -> Option<Self> {
        Some(match word {
            "auxiliary_column" => Self::AuxiliaryColumn,
            "column" => Self::Column,
            "combine" => Self::Combine,
            "criteria" => Self::Criteria,
            "dataset" => Self::Dataset,
            "description" => Self::Description,
            "evaluation" => Self::Evaluation,
            "format" => Self::Format,
            "granularity" => Self::Granularity,
            "join" => Self::Join,
            "label" => Self::Label,
            "name" => Self::Name,
            "on" => Self::On,
            "operator" => Self::Operator,
            "project" => Self::Project,
            "scheme" => Self::Scheme,
            "sql" => Self::Sql,
            "table" => Self::Table,
            "term" => Self::Term,
            "then" => Self::Then,
            "transformer" => Self::Transformer,
            "transformer_name" => Self::TransformerName,
            "type" => Self::Type,
            "value" => Self::Value,
            _ => return None,
        })
    }

    /// Returns the source spelling of this keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuxiliaryColumn => "auxiliary_column",
            Self::Column => "column",
            Self::Combine => "combine",
            Self::Criteria => "criteria",
            Self::Dataset => "dataset",
            Self::Description => "description",
            Self::Evaluation => "evaluation",
            Self::Format => "format",
            Self::Granularity => "granularity",
            Self::Join => "join",
            Self::Label => "label",
            Self::Name => "name",
            Self::On => "on",
            Self::Operator => "operator",
            Self::Project => "project",
            Self::Scheme => "scheme",
            Self::Sql => "sql",
            Self::Table => "table",
            Self::Term => "term",
            Self::Then => "then",
            Self::Transformer => "transformer",
            Self::TransformerName => "transformer_name",
            Self::Type => "type",
            Self::Value => "value",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of token, not including indentation or value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A recognized keyword line.
    Keyword(Keyword),

    /// A lexical error; carries the diagnostic text.
    Error(EcoString),

    /// End of input. Emitted exactly once, with indent `-1`.
    Eof,
}

impl TokenKind {
    /// Returns `true` if this is the end-of-input marker.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns `true` if this is an error token.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the keyword if this token is one.
    #[must_use]
    pub const fn keyword(&self) -> Option<Keyword> {
        match self {
            Self::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}

/// A lexed source line.
///
/// `indent` counts leading whitespace with tabs expanded to four
/// spaces. `line` is 1-based. For error tokens `indent` is `-1` and the
/// diagnostic text lives in the kind; `value` is the line's value
/// payload otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of this token.
    pub kind: TokenKind,
    /// Indentation depth (spaces count 1, tabs count 4); `-1` for the
    /// Eof sentinel and error tokens.
    pub indent: i32,
    /// The value payload of the line; empty if none was given.
    pub value: EcoString,
    /// 1-based source line number.
    pub line: i32,
}

impl Token {
    /// Creates a keyword token.
    #[must_use]
    pub fn new(keyword: Keyword, indent: i32, value: impl Into<EcoString>, line: i32) -> Self {
        Self {
            kind: TokenKind::Keyword(keyword),
            indent,
            value: value.into(),
            line,
        }
    }

    /// Creates an error token with the standard `error at position N`
    /// message prefix. `pos` is the 0-based byte offset within the line.
    #[must_use]
    pub fn error(line: i32, pos: usize, detail: impl std::fmt::Display) -> Self {
        Self {
            kind: TokenKind::Error(EcoString::from(format!(
                "error at position {}: {detail}",
                pos + 1
            ))),
            indent: -1,
            value: EcoString::new(),
            line,
        }
    }

    /// Creates the end-of-input sentinel.
    #[must_use]
    pub fn eof(line: i32) -> Self {
        Self {
            kind: TokenKind::Eof,
            indent: -1,
            value: EcoString::new(),
            line,
        }
    }

    /// Returns the keyword of this token, if it is a keyword token.
    #[must_use]
    pub const fn keyword(&self) -> Option<Keyword> {
        self.kind.keyword()
    }
}

/// A comment recorded by the lexer.
///
/// Covers both whole-line comments (blank lines are recorded as `#`)
/// and trailing comments after a value. The lexer appends one final
/// record with empty text one line past the end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// The comment text including its `#` or `//` marker.
    pub text: EcoString,
    /// 1-based source line number.
    pub line: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_round_trips_through_spelling() {
        for word in [
            "auxiliary_column",
            "column",
            "combine",
            "criteria",
            "dataset",
            "description",
            "evaluation",
            "format",
            "granularity",
            "join",
            "label",
            "name",
            "on",
            "operator",
            "project",
            "scheme",
            "sql",
            "table",
            "term",
            "then",
            "transformer",
            "transformer_name",
            "type",
            "value",
        ] {
            let kw = Keyword::from_str(word).expect("known keyword");
            assert_eq!(kw.as_str(), word);
        }
        assert_eq!(Keyword::from_str("node"), None);
        assert_eq!(Keyword::from_str(""), None);
    }

    #[test]
    fn token_kind_predicates() {
        assert!(TokenKind::Eof.is_eof());
        assert!(!TokenKind::Eof.is_error());
        assert!(TokenKind::Error("bad".into()).is_error());
        assert_eq!(
            TokenKind::Keyword(Keyword::Table).keyword(),
            Some(Keyword::Table)
        );
        assert_eq!(TokenKind::Eof.keyword(), None);
    }

    #[test]
    fn error_token_message_format() {
        let token = Token::error(3, 2, "unknown keyword: node");
        assert_eq!(
            token.kind,
            TokenKind::Error("error at position 3: unknown keyword: node".into())
        );
        assert_eq!(token.indent, -1);
        assert_eq!(token.line, 3);
    }

    #[test]
    fn eof_token_shape() {
        let token = Token::eof(7);
        assert!(token.kind.is_eof());
        assert_eq!(token.indent, -1);
        assert_eq!(token.line, 7);
    }
}
