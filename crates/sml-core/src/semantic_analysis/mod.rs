// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Semantic analysis for SML.
//!
//! This module drives a recursive descent over the generic tree and
//! produces the typed model: [`Project`], [`Table`], [`Dataset`],
//! [`Scheme`] and friends. Along the way it coerces values, validates
//! cross-references and detects duplicate identifiers.
//!
//! Errors are accumulated, not thrown: parsing continues as far as the
//! structure allows and the caller receives the full list. Two things
//! cut a parse short: conditions that make continuation meaningless
//! (wrong root keyword, a join line that cannot be read at all) and
//! exhaustion of the error budget. Both are modeled as the [`Fatal`]
//! marker propagated with `?`; the public entry points convert it back
//! into the accumulated error list.

use std::collections::HashSet;

use ecow::EcoString;

use crate::model::{Column, DataType, Dataset, Project, Table};
use crate::source_analysis::{
    find_indentation_errors, parse_generic, sml_grammar, GenericNode, Keyword, Lexer, ParseError,
    TokenKind, TokenStream,
};

mod criteria;
mod joins;
mod string_utils;


pub use string_utils::{create_smart_label, is_valid_id, random_name};

/// Maximum number of errors accumulated per parse.
const MAX_ERRORS: usize = 100;

/// Marker for a parse that cannot continue; the errors live in the
/// parser's accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fatal;

pub(crate) type PResult<T> = Result<T, Fatal>;

/// The semantic parser: recursive descent plus an error accumulator.
#[derive(Debug)]
pub(crate) struct SmlParser {
    max_errors: usize,
    errors: Vec<ParseError>,
}

impl SmlParser {
    fn new() -> Self {
        Self {
            max_errors: MAX_ERRORS,
            errors: Vec::new(),
        }
    }

    fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    fn first_error(&self) -> Option<ParseError> {
        self.errors.first().cloned()
    }

    /// Records a recoverable error. Once the budget is exhausted the
    /// parse stops: the budget-filling error is still recorded, any
    /// further one is dropped.
    fn record(&mut self, error: ParseError) -> PResult<()> {
        if self.errors.len() < self.max_errors {
            self.errors.push(error);
            if self.errors.len() == self.max_errors {
                tracing::warn!(max_errors = self.max_errors, "parse error budget exhausted");
                return Err(Fatal);
            }
            Ok(())
        } else {
            Err(Fatal)
        }
    }

    /// Records an error after which parsing cannot continue.
    fn fatal(&mut self, error: ParseError) -> Fatal {
        let _ = self.record(error);
        Fatal
    }

    /// Returns the single child of a one-occurrence keyword, recording
    /// `message` when the keyword was given more than once.
    fn single<'a>(
        &mut self,
        list: &'a [GenericNode],
        line: i32,
        message: &str,
    ) -> PResult<&'a GenericNode> {
        if list.len() > 1 {
            self.record(ParseError::at(line, message))?;
        }
        Ok(&list[0])
    }

    /// Parses a leaf string value; descendents are not allowed.
    fn parse_string(&mut self, g: &GenericNode) -> PResult<EcoString> {
        if !g.children.is_empty() {
            self.record(ParseError::at(
                g.line,
                format!("\"{}\" cannot have descendents", g.keyword),
            ))?;
        }
        Ok(g.value.clone())
    }

    /// Parses a whitespace-separated list of identifiers.
    fn parse_id_list(&mut self, g: &GenericNode, allow_empty: bool) -> PResult<Vec<EcoString>> {
        let value = self.parse_string(g)?;
        if value.is_empty() {
            if allow_empty {
                return Ok(Vec::new());
            }
            self.record(ParseError::at(
                g.line,
                format!("\"{}\" has no values", g.keyword),
            ))?;
        }
        let ids: Vec<EcoString> = value.split_whitespace().map(EcoString::from).collect();
        for id in &ids {
            if !is_valid_id(id) {
                self.record(ParseError::at(
                    g.line,
                    format!("\"{}\" has invalid value: \"{id}\"", g.keyword),
                ))?;
            }
        }
        Ok(ids)
    }

    /// Parses a column data-type value.
    fn parse_datatype(&mut self, g: &GenericNode) -> PResult<Option<DataType>> {
        let value = self.parse_string(g)?;
        if value.is_empty() {
            self.record(ParseError::at(g.line, "empty type"))?;
        }
        let data_type = DataType::from_str(&value);
        if data_type.is_none() {
            self.record(ParseError::at(g.line, format!("invalid type: \"{value}\"")))?;
        }
        Ok(data_type)
    }

    /// Parses a `table` node into a [`Table`].
    fn parse_table(&mut self, g: &GenericNode) -> PResult<Table> {
        if g.keyword != Keyword::Table {
            return Err(self.fatal(ParseError::at(g.line, "value of the keyword must be table")));
        }
        if g.value.is_empty() {
            self.record(ParseError::at(g.line, "\"table\" has to have a name"))?;
        } else if !is_valid_id(&g.value) {
            self.record(ParseError::at(
                g.line,
                format!("invalid name for table: {}", g.value),
            ))?;
        }
        let mut table = Table::new(g.value.clone());

        for (&kw, list) in &g.children {
            match kw {
                Keyword::Description => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"descriptions\"s for a \"table\"")?;
                    table.description = self.parse_string(child)?;
                }
                Keyword::Sql => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"sql\"s for a \"table\"")?;
                    table.sql = self.parse_string(child)?;
                }
                Keyword::Label => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"label\"s for a \"table\"")?;
                    table.label = self.parse_string(child)?;
                }
                Keyword::Column | Keyword::AuxiliaryColumn => {} // below, in source order
                _ => {
                    self.record(ParseError::at(
                        g.line,
                        format!("\"table\" cannot contain \"{kw}\""),
                    ))?;
                }
            }
        }

        // Regular and auxiliary columns are semantically identical;
        // interleave them back into declaration order.
        let mut column_nodes: Vec<&GenericNode> = g
            .children_of(Keyword::Column)
            .iter()
            .chain(g.children_of(Keyword::AuxiliaryColumn))
            .collect();
        column_nodes.sort_by_key(|node| node.line);
        for child in column_nodes {
            let column = self.parse_column(child)?;
            if table.columns.contains_key(&column.name) {
                self.record(ParseError::at(
                    child.line,
                    format!(
                        "duplicate column \"{}\" in table \"{}\"",
                        column.name, table.name
                    ),
                ))?;
                continue;
            }
            table.column_names.push(column.name.clone());
            table.columns.insert(column.name.clone(), column);
        }

        if table.label.is_empty() {
            table.label = create_smart_label(&table.name).into();
        }
        if table.sql.is_empty() {
            self.record(ParseError::structural("\"table\" must have a  \"sql\""))?;
        }
        Ok(table)
    }

    /// Parses a `column` or `auxiliary_column` node.
    fn parse_column(&mut self, g: &GenericNode) -> PResult<Column> {
        if g.keyword != Keyword::Column && g.keyword != Keyword::AuxiliaryColumn {
            return Err(self.fatal(ParseError::at(g.line, "value of the keyword must be column")));
        }
        if g.value.is_empty() {
            self.record(ParseError::at(g.line, "\"column\" has to have a name"))?;
        } else if !is_valid_id(&g.value) {
            self.record(ParseError::at(
                g.line,
                format!("invalid name for column: {}", g.value),
            ))?;
        }
        let mut column = Column {
            name: g.value.clone(),
            ..Column::default()
        };
        let mut type_exists = false;

        for (&kw, list) in &g.children {
            match kw {
                Keyword::Sql => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"sql\"s for a \"column\"")?;
                    column.sql = self.parse_string(child)?;
                }
                Keyword::Label => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"label\"s for a \"column\"")?;
                    column.label = self.parse_string(child)?;
                }
                Keyword::Format => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"format\"s for a \"column\"")?;
                    column.format = self.parse_string(child)?;
                }
                Keyword::Type => {
                    type_exists = true;
                    let child =
                        self.single(list, g.line, "cannot have more than one \"type\"s for a \"column\"")?;
                    column.data_type = self.parse_datatype(child)?;
                }
                Keyword::Transformer => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"transformers\"s for a \"column\"",
                    )?;
                    column.transformer = self.parse_string(child)?;
                }
                Keyword::TransformerName => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"transformers_name\"s for a \"column\"",
                    )?;
                    column.transformer_name = self.parse_string(child)?;
                }
                _ => {
                    self.record(ParseError::at(
                        g.line,
                        format!("\"column\" cannot contain \"{kw}\""),
                    ))?;
                }
            }
        }

        if !type_exists {
            self.record(ParseError::at(
                g.line,
                format!(
                    "\"type\" is mandatory for a column, missing in column {}",
                    column.name
                ),
            ))?;
        }
        if column.label.is_empty() {
            column.label = create_smart_label(&column.name).into();
        }
        Ok(column)
    }

    /// Parses a `dataset` node into a [`Dataset`].
    ///
    /// The dataset's table map is filled with placeholder entries; the
    /// post-pass [`compute_derived_attributes`] replaces them with
    /// populated copies of the project-level tables.
    fn parse_dataset(&mut self, g: &GenericNode) -> PResult<Dataset> {
        if g.keyword != Keyword::Dataset {
            return Err(self.fatal(ParseError::at(g.line, "value of the keyword must be dataset")));
        }
        if g.value.is_empty() {
            self.record(ParseError::at(g.line, "\"dataset\" has to have a name"))?;
        } else if !is_valid_id(&g.value) {
            self.record(ParseError::at(
                g.line,
                format!("invalid name for dataset: {}", g.value),
            ))?;
        }
        let mut dataset = Dataset {
            name: g.value.clone(),
            ..Dataset::default()
        };

        for (&kw, list) in &g.children {
            match kw {
                Keyword::Table => {
                    for child in list {
                        let ids = self.parse_id_list(child, false)?;
                        for id in &ids {
                            dataset.tables.insert(id.clone(), Table::default());
                        }
                        dataset.table_names.extend(ids);
                    }
                }
                Keyword::Join => {
                    for child in list {
                        let join = self.parse_join(child)?;
                        dataset.joins.push(join);
                    }
                }
                Keyword::Label => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"label\"s for a \"dataset\"")?;
                    dataset.label = self.parse_string(child)?;
                }
                _ => {
                    self.record(ParseError::at(
                        g.line,
                        format!("\"dataset\" cannot contain \"{kw}\""),
                    ))?;
                }
            }
        }

        if dataset.label.is_empty() {
            dataset.label = create_smart_label(&dataset.name).into();
        }
        Ok(dataset)
    }

    /// Parses the `project` root into a [`Project`].
    ///
    /// Schemes are parsed in a second pass because their criteria need
    /// column data-types, which only exist once tables are populated.
    fn parse_project(&mut self, g: &GenericNode) -> PResult<Project> {
        if g.keyword != Keyword::Project {
            return Err(self.fatal(ParseError::structural("value of the keyword must be project")));
        }
        if g.value.is_empty() {
            self.record(ParseError::at(g.line, "\"project\" has to have a name"))?;
        }
        let mut project = Project {
            name: g.value.clone(),
            ..Project::default()
        };

        let mut scheme_found = false;
        for (&kw, list) in &g.children {
            match kw {
                Keyword::Table => {
                    for child in list {
                        let table = self.parse_table(child)?;
                        // A repeated definition (case-sensitive match)
                        // keeps the first occurrence.
                        if !project.tables.contains_key(&table.name) {
                            project.table_names.push(table.name.clone());
                            project.tables.insert(table.name.clone(), table);
                        }
                    }
                }
                Keyword::Dataset => {
                    for child in list {
                        let dataset = self.parse_dataset(child)?;
                        project.datasets.insert(dataset.name.clone(), dataset);
                    }
                }
                Keyword::Scheme => scheme_found = true,
                _ => {
                    self.record(ParseError::at(
                        g.line,
                        format!("\"project\" cannot contain \"{kw}\""),
                    ))?;
                }
            }
        }
        if scheme_found {
            for child in g.children_of(Keyword::Scheme) {
                let scheme = self.parse_scheme(child, &project.tables)?;
                project.schemes.insert(scheme.name.clone(), scheme);
            }
        }

        // Every table a dataset lists must exist in the project, and
        // every table a join mentions must be on the dataset's list.
        for dataset in project.datasets.values() {
            let mut included: HashSet<&str> = HashSet::new();
            for table in &dataset.table_names {
                if !project.tables.contains_key(table) {
                    self.record(ParseError::at(
                        g.line,
                        format!(
                            "table \"{table}\" in dataset \"{}\" not defined in project \"{}\"",
                            dataset.name, project.name
                        ),
                    ))?;
                }
                included.insert(table.as_str());
            }
            for join in &dataset.joins {
                for link in &join.links {
                    if !included.contains(link.table.as_str()) {
                        self.record(ParseError::at(
                            g.line,
                            format!(
                                "table \"{}\" in join of dataset \"{}\" not included in dataset",
                                link.table, dataset.name
                            ),
                        ))?;
                    }
                }
            }
        }

        for name in &project.table_names {
            if let Some(table) = project.tables.get(name) {
                for error in primary_key_errors(table, g.line) {
                    self.record(error)?;
                }
            }
        }
        Ok(project)
    }
}

/// Checks that every primary-key column resolves, case-insensitively,
/// to a defined column of the table.
fn primary_key_errors(table: &Table, line: i32) -> Vec<ParseError> {
    let columns: HashSet<EcoString> = table.columns.keys().map(|c| c.to_lowercase()).collect();
    table
        .pk
        .iter()
        .filter(|name| !columns.contains(&name.to_lowercase()))
        .map(|name| {
            ParseError::at(
                line,
                format!("pk \"{name}\" in table \"{}\" is not a known column", table.name),
            )
        })
        .collect()
}

/// Copies a table definition into a dataset-local snapshot.
///
/// The name is left alone; SQL and label only overwrite when set, and
/// columns, column order and primary keys are appended.
fn copy_table(dst: &mut Table, src: &Table) {
    if !src.sql.is_empty() {
        dst.sql = src.sql.clone();
    }
    if !src.label.is_empty() {
        dst.label = src.label.clone();
    }
    for (name, column) in &src.columns {
        dst.columns.insert(name.clone(), column.clone());
    }
    dst.column_names.extend(src.column_names.iter().cloned());
    dst.pk.extend(src.pk.iter().cloned());
}

/// Replaces each dataset's placeholder tables with populated copies of
/// the project-level tables it lists.
fn compute_derived_attributes(project: &mut Project) {
    let Project {
        tables, datasets, ..
    } = project;
    for dataset in datasets.values_mut() {
        for table_name in dataset.table_names.clone() {
            if let Some(src) = tables.get(&table_name) {
                let mut copy = Table::new(src.name.clone());
                copy_table(&mut copy, src);
                dataset.tables.insert(copy.name.clone(), copy);
            }
        }
    }
}

/// Case-insensitive uniqueness sweep over one table's columns.
fn ensure_unique_column_names(table: &Table) -> Vec<ParseError> {
    let mut seen: HashSet<EcoString> = HashSet::new();
    let mut errors = Vec::new();
    for name in &table.column_names {
        let lower = name.to_lowercase();
        if !seen.insert(lower.clone()) {
            errors.push(ParseError::structural(format!(
                "more than one column with the same name ({lower}) in table {}",
                table.name
            )));
        }
    }
    errors
}

/// Case-insensitive uniqueness sweep over table names, plus column
/// uniqueness within each table.
fn ensure_unique_table_and_column_names(project: &Project) -> Vec<ParseError> {
    let mut seen: HashSet<EcoString> = HashSet::new();
    let mut errors = Vec::new();
    for name in &project.table_names {
        let lower = name.to_lowercase();
        if !seen.insert(lower.clone()) {
            errors.push(ParseError::structural(format!(
                "more than one table with the same name: {lower}"
            )));
            continue;
        }
        if let Some(table) = project.tables.get(name) {
            errors.extend(ensure_unique_column_names(table));
        }
    }
    errors
}

/// Case-insensitive uniqueness sweep over dataset names.
fn ensure_unique_dataset_names(project: &Project) -> Vec<ParseError> {
    let mut seen: HashSet<EcoString> = HashSet::new();
    let mut errors = Vec::new();
    for name in project.datasets.keys() {
        let lower = name.to_lowercase();
        if !seen.insert(lower) {
            errors.push(ParseError::structural(format!(
                "more than one dataset with the same name: {}",
                name.to_lowercase()
            )));
        }
    }
    errors
}

/// Parses a full SML document whose root is `project`.
///
/// Returns the parsed project and every error found. When
/// `project_name` is non-empty it overrides the in-document name.
/// Uniqueness sweeps and dataset-table derivation only run when the
/// parse itself was clean.
#[must_use]
pub fn parse_sml(input: &str, project_name: &str) -> (Project, Vec<ParseError>) {
    tracing::debug!(bytes = input.len(), "parsing SML document");
    let mut stream = TokenStream::new(Lexer::new(input));
    let first = stream.next_token();
    let mut project = Project::default();
    let mut errors: Vec<ParseError> = Vec::new();

    let terminator = match first.kind.clone() {
        TokenKind::Error(message) => {
            errors.push(ParseError::at(first.line, format!("error: {message}")));
            return (project, errors);
        }
        TokenKind::Eof => first,
        TokenKind::Keyword(Keyword::Project) => {
            let (tree, next, generic_errors) = parse_generic(&mut stream, Keyword::Project, &first);
            if !generic_errors.is_empty() {
                return (project, generic_errors);
            }
            let grammar_errors = find_indentation_errors(&tree, sml_grammar());
            if !grammar_errors.is_empty() {
                return (project, grammar_errors);
            }
            let mut parser = SmlParser::new();
            match parser.parse_project(&tree) {
                Ok(parsed) => project = parsed,
                Err(Fatal) => return (Project::default(), parser.into_errors()),
            }
            errors.extend(parser.into_errors());
            if !project_name.is_empty() {
                project.name = project_name.into();
            }
            next
        }
        TokenKind::Keyword(other) => {
            errors.push(ParseError::at(
                first.line,
                format!("expecting project, got: {other}"),
            ));
            return (project, errors);
        }
    };

    if !terminator.kind.is_eof() {
        if terminator.kind.is_error() {
            errors.push(ParseError::at(terminator.line, "this should not happen"));
        }
        let name = terminator.keyword().map_or("", Keyword::as_str);
        errors.push(ParseError::at(
            terminator.line,
            format!("unexpected content beyond project: \"{name}\""),
        ));
    }
    if !errors.is_empty() {
        return (project, errors);
    }

    errors.extend(ensure_unique_table_and_column_names(&project));
    errors.extend(ensure_unique_dataset_names(&project));
    compute_derived_attributes(&mut project);
    (project, errors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentType {
    Table,
    Dataset,
    Scheme,
}

/// Infers the fragment type from a filename suffix, case-insensitively.
fn fragment_type(filename: &str) -> Option<FragmentType> {
    let lower = filename.to_lowercase();
    for (suffix, fragment) in [
        (".table.sml", FragmentType::Table),
        (".dataset.sml", FragmentType::Dataset),
        (".scheme.sml", FragmentType::Scheme),
    ] {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            return Some(fragment);
        }
    }
    None
}

/// Parses per-entity SML fragments and merges them into one project.
///
/// `inputs` and `filenames` are parallel arrays; the filename suffix
/// decides how each input is interpreted (`.table.sml`,
/// `.dataset.sml`). Files with other names are skipped. Errors reduce
/// to the first one found.
///
/// Scheme fragments are recognized but not accepted. Fragment mode
/// performs the uniqueness sweeps, but no dataset-table derivation and
/// no dataset-to-project cross-checks; both need the whole project.
pub fn parse_sml_fragments(inputs: &[&str], filenames: &[&str]) -> Result<Project, ParseError> {
    if inputs.len() != filenames.len() {
        return Err(ParseError::structural(
            "inputs length and filenames length do not match in API call",
        ));
    }
    tracing::debug!(fragments = inputs.len(), "parsing SML fragments");

    let mut table_trees = Vec::new();
    let mut dataset_trees = Vec::new();
    for (input, filename) in inputs.iter().zip(filenames.iter()) {
        let expected = match fragment_type(filename) {
            None => {
                tracing::debug!(file = %filename, "skipping file with unrecognized suffix");
                continue;
            }
            Some(FragmentType::Scheme) => {
                return Err(ParseError::structural("scheme fragments are not supported"));
            }
            Some(FragmentType::Table) => Keyword::Table,
            Some(FragmentType::Dataset) => Keyword::Dataset,
        };

        let mut stream = TokenStream::new(Lexer::new(input));
        let first = stream.next_token();
        let terminator = match first.kind.clone() {
            TokenKind::Error(message) => {
                return Err(ParseError::at(first.line, message.to_string()));
            }
            TokenKind::Eof => first,
            TokenKind::Keyword(kw) if kw == expected => {
                let (tree, next, generic_errors) =
                    parse_generic(&mut stream, expected, &first);
                if let Some(error) = generic_errors.into_iter().next() {
                    return Err(error);
                }
                let grammar = sml_grammar().subtree(expected);
                if let Some(error) = find_indentation_errors(&tree, grammar).into_iter().next() {
                    return Err(error);
                }
                if expected == Keyword::Dataset {
                    dataset_trees.push(tree);
                } else {
                    table_trees.push(tree);
                }
                next
            }
            TokenKind::Keyword(other) => {
                return Err(ParseError::at(
                    first.line,
                    format!(
                        "expecting {expected}, got: {other} in file {filename} line {}",
                        first.line
                    ),
                ));
            }
        };
        if !terminator.kind.is_eof() {
            if terminator.kind.is_error() {
                return Err(ParseError::at(terminator.line, "this should not happen"));
            }
            let name = terminator.keyword().map_or("", Keyword::as_str);
            return Err(ParseError::at(
                terminator.line,
                format!(
                    "unexpected content beyond {expected}: \"{name}\" (file {filename} line {})",
                    terminator.line
                ),
            ));
        }
    }

    let mut project = Project::default();
    let mut parser = SmlParser::new();
    for tree in &dataset_trees {
        let dataset = parser.parse_dataset(tree).ok();
        if let Some(error) = parser.first_error() {
            return Err(error);
        }
        if let Some(dataset) = dataset {
            project.datasets.insert(dataset.name.clone(), dataset);
        }
    }
    for tree in &table_trees {
        let table = parser.parse_table(tree).ok();
        if let Some(error) = parser.first_error() {
            return Err(error);
        }
        if let Some(table) = table {
            project.table_names.push(table.name.clone());
            project.tables.insert(table.name.clone(), table);
        }
    }

    if let Some(error) = ensure_unique_table_and_column_names(&project).into_iter().next() {
        return Err(error);
    }
    if let Some(error) = ensure_unique_dataset_names(&project).into_iter().next() {
        return Err(error);
    }
    Ok(project)
}
