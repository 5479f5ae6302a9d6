// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parse error values.
//!
//! A [`ParseError`] pairs a user-facing message with the 1-based source
//! line it refers to, or [`NO_LINE`] when the problem is structural
//! (e.g. a missing required attribute has no line to point at). The
//! message text is stable: it is part of the crate's tested surface.

use miette::Diagnostic;
use thiserror::Error;

/// Line number used when an error has no specific source line.
pub const NO_LINE: i32 = -1;

/// A recoverable or fatal parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic()]
pub struct ParseError {
    /// User-facing description of the problem.
    pub message: String,
    /// 1-based source line, or [`NO_LINE`].
    pub line: i32,
}

impl ParseError {
    /// Creates an error at a specific source line.
    #[must_use]
    pub fn at(line: i32, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    /// Creates an error with no specific source line.
    #[must_use]
    pub fn structural(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: NO_LINE,
        }
    }
}
