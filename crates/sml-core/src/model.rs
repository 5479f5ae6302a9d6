// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The semantic model produced by parsing.
//!
//! A [`Project`] owns its tables, datasets and schemes by value; there
//! are no back references. Cross-references between entities are name
//! strings resolved by map lookup at validation time. Insertion order
//! is preserved through the `*_names` vectors; the maps themselves are
//! `BTreeMap`s so iteration is deterministic but carries no source
//! order.
//!
//! All types serialize to JSON the way downstream consumers expect the
//! model to look (criteria values as plain scalars, data types as their
//! lowercase names).

use std::collections::BTreeMap;

use ecow::EcoString;
use serde::{Deserialize, Serialize};

/// The seven recognized column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Datetime,
    Float,
    Int,
    String,
    Time,
    Verbatim,
}

impl DataType {
    /// Looks up a data type by its source spelling.
    #[must_use]
    pub fn from_str(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "datetime" => Self::Datetime,
            "float" => Self::Float,
            "int" => Self::Int,
            "string" => Self::String,
            "time" => Self::Time,
            "verbatim" => Self::Verbatim,
            _ => return None,
        })
    }

    /// Returns the source spelling of this data type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Datetime => "datetime",
            Self::Float => "float",
            Self::Int => "int",
            Self::String => "string",
            Self::Time => "time",
            Self::Verbatim => "verbatim",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The top-level container; one per document in full-parse mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: EcoString,
    /// Table names in declaration order.
    pub table_names: Vec<EcoString>,
    pub tables: BTreeMap<EcoString, Table>,
    pub datasets: BTreeMap<EcoString, Dataset>,
    pub schemes: BTreeMap<EcoString, Scheme>,
}

/// A schema table: a name, a SQL expression, and typed columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: EcoString,
    pub description: EcoString,
    /// The SQL expression this table stands for; required, non-empty.
    pub sql: EcoString,
    /// Human-readable label; derived from the name when not declared.
    pub label: EcoString,
    /// Column names in declaration order.
    pub column_names: Vec<EcoString>,
    pub columns: BTreeMap<EcoString, Column>,
    /// Primary-key column names; every entry must resolve to a column
    /// (case-insensitively).
    pub pk: Vec<EcoString>,
}

impl Table {
    /// Creates an empty table with the given name.
    #[must_use]
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A table column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: EcoString,
    pub sql: EcoString,
    /// Human-readable label; derived from the name when not declared.
    pub label: EcoString,
    pub format: EcoString,
    /// The declared data type. `None` only ever survives alongside a
    /// recorded parse error.
    pub data_type: Option<DataType>,
    pub transformer: EcoString,
    pub transformer_name: EcoString,
}

/// A named set of tables joined together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: EcoString,
    pub label: EcoString,
    /// Names of the tables this dataset includes, in declaration order.
    pub table_names: Vec<EcoString>,
    /// Local copies of the included tables, populated in a post-pass so
    /// later project-level mutations do not affect the snapshot.
    pub tables: BTreeMap<EcoString, Table>,
    /// Joins in declaration order.
    pub joins: Vec<Join>,
}

/// One link in a join chain: a binary operator, the table it connects,
/// and the boolean condition. The first link of a chain has an empty
/// operator and condition; it only names the left-most table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinLink {
    pub operator: EcoString,
    pub table: EcoString,
    pub sql: EcoString,
}

/// A chain of two or more tables connected by join operators.
///
/// `one_table`/`one_columns` are only set for joins decorated as
/// `oneToMany`/`manyToOne`: they name the "one" side and the columns of
/// that table appearing in the equality condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub one_table: EcoString,
    pub one_columns: Vec<EcoString>,
    /// The chain, in source order; `then` links keep declaration order.
    pub links: Vec<JoinLink>,
}

/// A typed criteria value, coerced to the referenced column's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriteriaValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    Text(EcoString),
}

/// A simple predicate on one column of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleTerm {
    pub column: EcoString,
    pub table: EcoString,
    pub operator: EcoString,
    /// Only meaningful for `datetime` columns (e.g. `year`, `day`).
    pub granularity: EcoString,
    pub values: Vec<CriteriaValue>,
}

/// A logical combination of exactly two sub-terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinationTerm {
    pub logical_operator: EcoString,
    pub terms: Vec<CriteriaTerm>,
}

/// The body of a criteria term: either a simple predicate or a logical
/// combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriteriaTermKind {
    Simple(SimpleTerm),
    Combination(CombinationTerm),
}

/// A criterion: a name plus a simple or combined predicate tree.
///
/// The name is either user-supplied (a valid identifier) or an
/// 8-character generated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaTerm {
    pub name: EcoString,
    pub kind: CriteriaTermKind,
}

/// A named collection of criteria plus an opaque evaluation expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub name: EcoString,
    pub label: EcoString,
    pub description: EcoString,
    /// Criteria names in declaration order.
    pub criteria_names: Vec<EcoString>,
    pub criteria: BTreeMap<EcoString, CriteriaTerm>,
    /// Free-form expression over criteria names; not evaluated here.
    pub evaluation: EcoString,
}
