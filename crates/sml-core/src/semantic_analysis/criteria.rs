// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Scheme and criteria parsing.
//!
//! Schemes are parsed in a second pass, after all tables exist: the
//! values of a criteria term are coerced to the data type of the
//! column the term references.
//!
//! A criterion is either a combination (a `combine` child holding the
//! logical operator and exactly two `term`s, each recursively a
//! criterion) or a simple term (`column`, `table`, `operator`,
//! optional `granularity` and `value`). Granularity is only valid on
//! `datetime` columns and turns every value into an integer.

use std::collections::BTreeMap;

use ecow::EcoString;

use crate::model::{
    CombinationTerm, CriteriaTerm, CriteriaTermKind, CriteriaValue, DataType, Scheme, SimpleTerm,
    Table,
};
use crate::source_analysis::{GenericNode, Keyword, ParseError};

use super::{create_smart_label, is_valid_id, random_name, PResult, SmlParser};

/// Operators whose value is a bracketed, comma-separated list.
const LIST_OPERATORS: [&str; 3] = ["age_between", "between", "in"];

impl SmlParser {
    /// Parses a `scheme` node into a [`Scheme`].
    pub(crate) fn parse_scheme(
        &mut self,
        g: &GenericNode,
        tables: &BTreeMap<EcoString, Table>,
    ) -> PResult<Scheme> {
        if g.keyword != Keyword::Scheme {
            return Err(self.fatal(ParseError::at(g.line, "value of the keyword must be scheme")));
        }
        if g.value.is_empty() {
            self.record(ParseError::at(g.line, "\"scheme\" has to have an ID"))?;
        } else if !is_valid_id(&g.value) {
            self.record(ParseError::at(
                g.line,
                format!("invalid name for scheme: {}", g.value),
            ))?;
        }
        let mut scheme = Scheme {
            name: g.value.clone(),
            ..Scheme::default()
        };

        let mut criteria_found = false;
        for (&kw, list) in &g.children {
            match kw {
                Keyword::Description => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"description\"s for a \"scheme\"",
                    )?;
                    scheme.description = self.parse_string(child)?;
                }
                Keyword::Label => {
                    let child =
                        self.single(list, g.line, "cannot have more than one \"label\"s for a \"scheme\"")?;
                    scheme.label = self.parse_string(child)?;
                }
                Keyword::Evaluation => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"evaluation\"s for a \"scheme\"",
                    )?;
                    scheme.evaluation = self.parse_string(child)?;
                }
                Keyword::Criteria => {
                    criteria_found = true;
                    for child in list {
                        let term = self.parse_criteria(child, tables)?;
                        scheme.criteria_names.push(term.name.clone());
                        scheme.criteria.insert(term.name.clone(), term);
                    }
                }
                _ => {
                    self.record(ParseError::at(
                        g.line,
                        format!("\"scheme\" cannot contain \"{kw}\""),
                    ))?;
                }
            }
        }
        if !criteria_found {
            self.record(ParseError::at(g.line, "no criteria terms found"))?;
        }
        if scheme.label.is_empty() {
            scheme.label = create_smart_label(&scheme.name).into();
        }
        Ok(scheme)
    }

    /// Parses one criterion: a combination when a `combine` child is
    /// present, a simple term otherwise. A criterion without a name
    /// gets a generated one.
    fn parse_criteria(
        &mut self,
        g: &GenericNode,
        tables: &BTreeMap<EcoString, Table>,
    ) -> PResult<CriteriaTerm> {
        let name = if g.value.is_empty() {
            random_name(8)
        } else {
            if !is_valid_id(&g.value) {
                self.record(ParseError::at(
                    g.line,
                    format!("invalid name for criteria: {}", g.value),
                ))?;
            }
            g.value.clone()
        };
        let kind = match g.children.get(&Keyword::Combine) {
            Some(list) => CriteriaTermKind::Combination(self.parse_combination(&list[0], tables)?),
            None => CriteriaTermKind::Simple(self.parse_simple_term(g, tables)?),
        };
        Ok(CriteriaTerm { name, kind })
    }

    /// Parses a `combine` node: the value is the logical operator and
    /// the two `term` children are criteria of their own.
    fn parse_combination(
        &mut self,
        g: &GenericNode,
        tables: &BTreeMap<EcoString, Table>,
    ) -> PResult<CombinationTerm> {
        let mut combination = CombinationTerm {
            logical_operator: g.value.clone(),
            terms: Vec::new(),
        };
        if let Some(list) = g.children.get(&Keyword::Term) {
            if list.len() != 2 {
                self.record(ParseError::at(
                    g.line,
                    "must have exactly two \"term\"s for a combination criteria",
                ))?;
            }
            for term in list {
                let parsed = self.parse_criteria(term, tables)?;
                combination.terms.push(parsed);
            }
        }
        Ok(combination)
    }

    /// Parses a simple criteria term and coerces its values.
    fn parse_simple_term(
        &mut self,
        g: &GenericNode,
        tables: &BTreeMap<EcoString, Table>,
    ) -> PResult<SimpleTerm> {
        let mut term = SimpleTerm::default();
        let mut table_found = false;
        let mut column_found = false;
        let mut operator_found = false;

        for (&kw, list) in &g.children {
            match kw {
                Keyword::Column => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"column\"s for a criteria term",
                    )?;
                    term.column = self.parse_string(child)?;
                    column_found = true;
                }
                Keyword::Table => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"table\"s for a criteria term",
                    )?;
                    term.table = self.parse_string(child)?;
                    table_found = true;
                }
                Keyword::Operator => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"operator\"s for a criteria term",
                    )?;
                    term.operator = self.parse_string(child)?;
                    operator_found = true;
                }
                Keyword::Granularity => {
                    let child = self.single(
                        list,
                        g.line,
                        "cannot have more than one \"granularity\"s for a criteria term",
                    )?;
                    term.granularity = self.parse_string(child)?;
                    // A granularity stands in for the operator in the
                    // presence check.
                    operator_found = true;
                }
                Keyword::Value => {} // handled after the lookups below
                _ => {
                    self.record(ParseError::at(
                        g.line,
                        format!("\"term\" cannot contain \"{kw}\""),
                    ))?;
                }
            }
        }
        if !table_found {
            self.record(ParseError::at(
                g.line,
                "must have exactly one \"table\" for a criteria term",
            ))?;
        }
        if !operator_found {
            self.record(ParseError::at(
                g.line,
                "must have exactly one \"operator\" for a criteria term",
            ))?;
        }
        if !column_found {
            self.record(ParseError::at(
                g.line,
                "must have exactly one \"column\" for a criteria term",
            ))?;
        }

        if let Some(list) = g.children.get(&Keyword::Value) {
            let value_string = self.parse_string(&list[0])?;
            if !term.table.is_empty() && !term.column.is_empty() {
                match find_datatype(tables, &term.table, &term.column) {
                    Err(message) => self.record(ParseError::at(g.line, message))?,
                    Ok(data_type) => {
                        let elements: Vec<String> = if LIST_OPERATORS
                            .iter()
                            .any(|op| term.operator.eq_ignore_ascii_case(op))
                        {
                            value_string
                                .trim_matches(|c| c == '[' || c == ']')
                                .split(',')
                                .map(str::to_owned)
                                .collect()
                        } else {
                            vec![value_string.to_string()]
                        };
                        for element in elements {
                            match typed_value(element.trim(), data_type) {
                                Ok(value) => term.values.push(value),
                                Err(message) => self.record(ParseError::at(g.line, message))?,
                            }
                        }
                    }
                }
            }
        }

        if !term.granularity.is_empty() {
            let data_type = tables
                .get(&term.table)
                .and_then(|table| table.columns.get(&term.column))
                .and_then(|column| column.data_type);
            if data_type == Some(DataType::Datetime) {
                let values = std::mem::take(&mut term.values);
                for value in values {
                    match value {
                        CriteriaValue::Text(text) => match text.parse::<i64>() {
                            Ok(number) => term.values.push(CriteriaValue::Int(number)),
                            Err(_) => {
                                self.record(ParseError::at(
                                    g.line,
                                    format!("cannot parse \"{text}\" as int"),
                                ))?;
                            }
                        },
                        other => term.values.push(other),
                    }
                }
            } else {
                let name = data_type.map_or("", DataType::as_str);
                self.record(ParseError::at(
                    g.line,
                    format!("can not have granularity with the data type {name}"),
                ))?;
            }
        }
        Ok(term)
    }
}

/// Looks up the data type of `table.column`, matching the column name
/// case-insensitively against the table's declared columns.
fn find_datatype(
    tables: &BTreeMap<EcoString, Table>,
    table: &str,
    column: &str,
) -> Result<Option<DataType>, String> {
    let Some(found) = tables.get(table) else {
        return Err(format!("table {table} does not exist"));
    };
    if found
        .column_names
        .iter()
        .any(|name| name.eq_ignore_ascii_case(column))
    {
        Ok(found.columns.get(column).and_then(|c| c.data_type))
    } else {
        Err(format!("column {column} does not exist in table {table}"))
    }
}

/// Coerces one raw value to the column's data type.
///
/// `time` columns are valid as columns but cannot be targeted by
/// criteria values.
fn typed_value(value: &str, data_type: Option<DataType>) -> Result<CriteriaValue, String> {
    match data_type {
        Some(DataType::String | DataType::Verbatim | DataType::Datetime) => {
            Ok(CriteriaValue::Text(value.into()))
        }
        Some(DataType::Int) => value
            .parse::<i64>()
            .map(CriteriaValue::Int)
            .map_err(|_| format!("cannot parse \"{value}\" as int")),
        Some(DataType::Float) => value
            .parse::<f32>()
            .map(CriteriaValue::Float)
            .map_err(|_| format!("cannot parse \"{value}\" as float")),
        Some(DataType::Bool) => parse_bool(value)
            .map(CriteriaValue::Bool)
            .ok_or_else(|| format!("cannot parse \"{value}\" as bool")),
        Some(DataType::Time) => Err("type time not supported".to_owned()),
        None => Err("type  not supported".to_owned()),
    }
}

/// Accepts the usual boolean spellings: `1 t T TRUE true True` and
/// `0 f F FALSE false False`.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic_analysis::parse_sml;
    use crate::model::Project;

    /// Wraps a criteria block (indented by four spaces) into a project
    /// with one table of every data type.
    fn scheme_source(criteria: &str) -> String {
        format!(
            "\
project p
  table fm
    sql fm
    column has_card
      type bool
      sql has_card
    column dob
      type datetime
      sql dob
    column age
      type int
      sql age
    column score
      type float
      sql score
    column gender
      type string
      sql gender
    column start
      type time
      sql start
  scheme my_scheme
{criteria}
    evaluation x
"
        )
    }

    fn parse_scheme_block(criteria: &str) -> (Project, Vec<crate::source_analysis::ParseError>) {
        parse_sml(&scheme_source(criteria), "")
    }

    fn simple_term(project: &Project, name: &str) -> SimpleTerm {
        match &project.schemes["my_scheme"].criteria[name].kind {
            CriteriaTermKind::Simple(term) => term.clone(),
            CriteriaTermKind::Combination(_) => panic!("expected a simple term"),
        }
    }

    #[test]
    fn bool_values_coerce() {
        let (project, errors) = parse_scheme_block(
            "    criteria x\n      column has_card\n      table fm\n      operator equals\n      value True",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(simple_term(&project, "x").values, vec![CriteriaValue::Bool(true)]);
    }

    #[test]
    fn int_values_coerce() {
        let (project, errors) = parse_scheme_block(
            "    criteria x\n      column age\n      table fm\n      operator gte\n      value 21",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(simple_term(&project, "x").values, vec![CriteriaValue::Int(21)]);
    }

    #[test]
    fn float_values_coerce() {
        let (project, errors) = parse_scheme_block(
            "    criteria x\n      column score\n      table fm\n      operator gte\n      value 75.5",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            simple_term(&project, "x").values,
            vec![CriteriaValue::Float(75.5)]
        );
    }

    #[test]
    fn bad_int_value_is_reported() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column age\n      table fm\n      operator gte\n      value elderly",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "cannot parse \"elderly\" as int");
    }

    #[test]
    fn list_operators_split_bracketed_values() {
        let (project, errors) = parse_scheme_block(
            "    criteria x\n      column gender\n      table fm\n      operator IN\n      value [female, other]",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            simple_term(&project, "x").values,
            vec![
                CriteriaValue::Text("female".into()),
                CriteriaValue::Text("other".into())
            ]
        );
    }

    #[test]
    fn age_between_with_granularity_turns_values_into_ints() {
        let (project, errors) = parse_scheme_block(
            "    criteria x\n      column dob\n      table fm\n      operator age_between\n      value [18, 50]\n      granularity year",
        );
        assert!(errors.is_empty(), "{errors:?}");
        let term = simple_term(&project, "x");
        assert_eq!(term.granularity, "year");
        assert_eq!(
            term.values,
            vec![CriteriaValue::Int(18), CriteriaValue::Int(50)]
        );
    }

    #[test]
    fn granularity_requires_datetime() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column gender\n      table fm\n      operator equals\n      value female\n      granularity year",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "can not have granularity with the data type string"
        );
    }

    #[test]
    fn granularity_values_must_be_integers() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column dob\n      table fm\n      operator age_between\n      value [young, old]\n      granularity year",
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "cannot parse \"young\" as int");
        assert_eq!(errors[1].message, "cannot parse \"old\" as int");
    }

    #[test]
    fn granularity_counts_as_the_operator() {
        // A term with a granularity but no operator passes the
        // presence checks.
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column dob\n      table fm\n      granularity year",
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn time_columns_cannot_carry_values() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column start\n      table fm\n      operator equals\n      value now",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "type time not supported");
    }

    #[test]
    fn unknown_table_and_column_are_reported() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column age\n      table ghost\n      operator gte\n      value 1",
        );
        assert_eq!(errors[0].message, "table ghost does not exist");

        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column ghost\n      table fm\n      operator gte\n      value 1",
        );
        assert_eq!(errors[0].message, "column ghost does not exist in table fm");
    }

    #[test]
    fn missing_parts_are_reported() {
        let (_, errors) = parse_scheme_block("    criteria x\n      column age\n      table fm");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "must have exactly one \"operator\" for a criteria term"
        );

        let (_, errors) = parse_scheme_block("    criteria x\n      operator gte\n      table fm");
        assert_eq!(
            errors[0].message,
            "must have exactly one \"column\" for a criteria term"
        );

        let (_, errors) = parse_scheme_block("    criteria x\n      column age\n      operator gte");
        assert_eq!(
            errors[0].message,
            "must have exactly one \"table\" for a criteria term"
        );
    }

    #[test]
    fn combinations_hold_exactly_two_terms() {
        let (project, errors) = parse_scheme_block(
            "    criteria either\n      combine OR\n        term first\n          column has_card\n          table fm\n          operator equals\n          value true\n        term second\n          column age\n          table fm\n          operator gte\n          value 60",
        );
        assert!(errors.is_empty(), "{errors:?}");
        let scheme = &project.schemes["my_scheme"];
        assert_eq!(scheme.criteria_names, vec!["either"]);
        let CriteriaTermKind::Combination(combination) = &scheme.criteria["either"].kind else {
            panic!("expected a combination");
        };
        assert_eq!(combination.logical_operator, "OR");
        assert_eq!(combination.terms.len(), 2);
        assert_eq!(combination.terms[0].name, "first");
        assert_eq!(combination.terms[1].name, "second");
    }

    #[test]
    fn nested_combinations_parse() {
        let (project, errors) = parse_scheme_block(
            "    criteria outer\n      combine OR\n        term left\n          combine AND\n            term a\n              column age\n              table fm\n              operator gte\n              value 18\n            term b\n              column has_card\n              table fm\n              operator equals\n              value true\n        term right\n          column gender\n          table fm\n          operator equals\n          value other",
        );
        assert!(errors.is_empty(), "{errors:?}");
        let CriteriaTermKind::Combination(outer) =
            &project.schemes["my_scheme"].criteria["outer"].kind
        else {
            panic!("expected a combination");
        };
        let CriteriaTermKind::Combination(inner) = &outer.terms[0].kind else {
            panic!("expected a nested combination");
        };
        assert_eq!(inner.logical_operator, "AND");
        assert_eq!(inner.terms.len(), 2);
    }

    #[test]
    fn wrong_term_count_is_reported() {
        let (_, errors) = parse_scheme_block(
            "    criteria either\n      combine OR\n        term only\n          column age\n          table fm\n          operator gte\n          value 18",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "must have exactly two \"term\"s for a combination criteria"
        );
    }

    #[test]
    fn unnamed_criteria_get_generated_names() {
        let (project, errors) = parse_scheme_block(
            "    criteria\n      column age\n      table fm\n      operator gte\n      value 18",
        );
        assert!(errors.is_empty(), "{errors:?}");
        let scheme = &project.schemes["my_scheme"];
        assert_eq!(scheme.criteria_names.len(), 1);
        let name = &scheme.criteria_names[0];
        assert_eq!(name.chars().count(), 8);
        assert!(scheme.criteria.contains_key(name));
    }

    #[test]
    fn invalid_criteria_names_are_reported() {
        let (_, errors) = parse_scheme_block(
            "    criteria bad-name\n      column age\n      table fm\n      operator gte\n      value 18",
        );
        assert_eq!(errors[0].message, "invalid name for criteria: bad-name");
    }

    #[test]
    fn scheme_requires_criteria() {
        let (_, errors) = parse_sml(
            "project p\n  table t\n    sql t\n  scheme empty\n    label Empty",
            "",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "no criteria terms found");
    }

    #[test]
    fn scheme_requires_a_name() {
        let (_, errors) = parse_sml(
            "project p\n  table t\n    sql t\n  scheme\n    criteria x\n      column c\n      table t\n      operator eq",
        "");
        assert!(errors
            .iter()
            .any(|e| e.message == "\"scheme\" has to have an ID"));
    }

    #[test]
    fn scheme_label_defaults_to_smart_label() {
        let (project, errors) = parse_scheme_block(
            "    criteria x\n      column age\n      table fm\n      operator gte\n      value 18",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(project.schemes["my_scheme"].label, "My Scheme");
    }

    #[test]
    fn scheme_rejects_unknown_children() {
        // `name` is in the grammar outline under scheme, but the
        // semantic parser does not accept it.
        let (_, errors) = parse_sml(
            "project p\n  table t\n    sql t\n  scheme s\n    name other\n    criteria x\n      column c\n      table t\n      operator eq",
            "",
        );
        assert!(errors
            .iter()
            .any(|e| e.message == "\"scheme\" cannot contain \"name\""));
    }

    #[test]
    fn term_rejects_unknown_children() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column age\n      table fm\n      operator gte\n      sql age > 18",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "\"term\" cannot contain \"sql\"");
    }

    #[test]
    fn duplicate_simple_term_parts_are_reported() {
        let (_, errors) = parse_scheme_block(
            "    criteria x\n      column age\n      column score\n      table fm\n      operator gte\n      value 1",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "cannot have more than one \"column\"s for a criteria term"
        );
    }

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("t"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("f"), Some(false));
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn typed_value_rejects_unknown_type() {
        assert_eq!(
            typed_value("x", None).expect_err("no type"),
            "type  not supported"
        );
    }
}
