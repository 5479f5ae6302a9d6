// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! SML parser core.
//!
//! SML is a small indentation-sensitive language for declaring data
//! models: a project of tables with typed columns, datasets that join
//! those tables, and schemes (rule sets with nested logical criteria).
//!
//! This crate contains the full pipeline from raw text to a validated
//! [`model::Project`]:
//! - Lexical analysis (line-based, indentation-aware tokenization)
//! - Generic tree construction (hierarchy inferred from indentation)
//! - Grammar validation (keyword nesting, with repair suggestions)
//! - Semantic parsing (typed entities, coercion, cross-checks)
//!
//! Parsing never aborts on the first problem: recoverable errors are
//! accumulated as [`source_analysis::ParseError`] values (up to a fixed
//! budget) and returned alongside whatever model could be built.
//!
//! # Example
//!
//! ```
//! use sml_core::parse_sml;
//!
//! let (project, errors) = parse_sml("project demo\n  table t\n    sql t", "");
//! assert!(errors.is_empty());
//! assert_eq!(project.name, "demo");
//! assert_eq!(project.table_names, vec!["t"]);
//! ```

pub mod model;
pub mod semantic_analysis;
pub mod source_analysis;
pub mod sql;

pub use semantic_analysis::{parse_sml, parse_sml_fragments};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::model::{
        Column, CombinationTerm, CriteriaTerm, CriteriaTermKind, CriteriaValue, DataType, Dataset,
        Join, JoinLink, Project, Scheme, SimpleTerm, Table,
    };
    pub use crate::semantic_analysis::{parse_sml, parse_sml_fragments};
    pub use crate::source_analysis::{Comment, Keyword, ParseError, Token, TokenKind};
}
