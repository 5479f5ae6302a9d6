// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Join parsing.
//!
//! A `join` line carries the whole join spec in its value:
//!
//! ```text
//! join [oneToMany|manyToOne] <left> <operator words> <right>
//!     on <condition>
//!     then <operator words> <table>
//!         on <condition>
//! ```
//!
//! The operator may be spelled as a symbol (`<->`) or as SQL words
//! (`inner join`, `left outer join`, …); all spellings normalize to one
//! of four symbols. `then` links extend the chain one table at a time
//! and are ordered by source line. A one/many decorator restricts the
//! join to exactly two tables and requires the condition to be a
//! conjunction of equalities involving the "one" side.
//!
//! Join errors are fatal: a half-read join spec leaves nothing sensible
//! to continue from.

use ecow::EcoString;

use crate::model::{Join, JoinLink};
use crate::source_analysis::{GenericNode, Keyword, ParseError};
use crate::sql;

use super::{is_valid_id, PResult, SmlParser};

const DECORATOR_ONE_TO_MANY: &str = "oneToMany";
const DECORATOR_MANY_TO_ONE: &str = "manyToOne";

/// Recognizes a one/many decorator word, case-insensitively, returning
/// its canonical spelling.
fn normalized_one_to_many(word: &str) -> Option<&'static str> {
    if word.eq_ignore_ascii_case(DECORATOR_ONE_TO_MANY) {
        Some(DECORATOR_ONE_TO_MANY)
    } else if word.eq_ignore_ascii_case(DECORATOR_MANY_TO_ONE) {
        Some(DECORATOR_MANY_TO_ONE)
    } else {
        None
    }
}

/// Normalizes a join operator spelling to one of the four symbols.
fn normalize_join_operator(operator: &str) -> Option<&'static str> {
    Some(match operator.to_lowercase().as_str() {
        "<->" | "inner" | "inner join" | "join" => "<->",
        "-->" | "left outer join" | "left join" | "left" => "-->",
        "<--" | "right outer join" | "right join" | "right" => "<--",
        ">-<" | "full outer join" | "full join" | "full" => ">-<",
        _ => return None,
    })
}

impl SmlParser {
    /// Parses a `join` node into a [`Join`].
    pub(crate) fn parse_join(&mut self, g: &GenericNode) -> PResult<Join> {
        if g.keyword != Keyword::Join {
            return Err(self.fatal(ParseError::at(g.line, "value of the keyword must be join")));
        }
        if g.value.is_empty() {
            return Err(self.fatal(ParseError::at(g.line, "join is not specified")));
        }
        // Spec form: [decorator] tableL op... tableR (spaces required).
        let mut pieces: Vec<&str> = g.value.split_whitespace().collect();
        if pieces.len() < 3 {
            return Err(self.fatal(ParseError::at(
                g.line,
                format!("cannot parse \"join\": {}", g.value),
            )));
        }
        let decorator = normalized_one_to_many(pieces[0]);
        if decorator.is_some() {
            pieces.remove(0);
            if pieces.len() < 3 {
                return Err(self.fatal(ParseError::at(
                    g.line,
                    format!("cannot parse \"join\": {}", g.value),
                )));
            }
        }
        let n = pieces.len();
        let operator_words = pieces[1..n - 1].join(" ");
        let Some(operator) = normalize_join_operator(&operator_words) else {
            return Err(self.fatal(ParseError::at(
                g.line,
                format!("expected operator in \"join\", got: {operator_words}"),
            )));
        };

        let left = pieces[0];
        if !is_valid_id(left) {
            return Err(self.fatal(ParseError::at(
                g.line,
                format!("invalid table \"{left}\" in \"join\""),
            )));
        }
        let mut join = Join {
            links: vec![JoinLink {
                operator: EcoString::new(),
                table: left.into(),
                sql: EcoString::new(),
            }],
            ..Join::default()
        };
        let right = pieces[n - 1];
        if !is_valid_id(right) {
            return Err(self.fatal(ParseError::at(
                g.line,
                format!("invalid table \"{right}\" in \"join\""),
            )));
        }
        let mut link = JoinLink {
            operator: operator.into(),
            table: right.into(),
            sql: EcoString::new(),
        };

        let mut then_nodes: Vec<&GenericNode> = Vec::new();
        for (&kw, list) in &g.children {
            match kw {
                Keyword::On | Keyword::Sql => {
                    if !link.sql.is_empty() || list.len() > 1 {
                        return Err(self.fatal(ParseError::at(
                            g.line,
                            "cannot have more than one \"sql/on\"s for a \"join\"",
                        )));
                    }
                    let child = &list[0];
                    link.sql = self.parse_string(child)?;
                    let Some(first_word) = link.sql.split_whitespace().next() else {
                        return Err(self.fatal(ParseError::at(
                            child.line,
                            "no expression for a \"sql\" or \"on\" clause",
                        )));
                    };
                    if let Some(stray) = normalized_one_to_many(first_word) {
                        return Err(self.fatal(ParseError::at(
                            g.line,
                            format!(
                                "not expecting \"{stray}\" in \"sql\" or \"ON\" line, should be on the previous \"join\" line"
                            ),
                        )));
                    }
                }
                Keyword::Then => then_nodes = list.iter().collect(),
                _ => {
                    return Err(self.fatal(ParseError::at(
                        g.line,
                        format!("\"join\" cannot contain \"{kw}\""),
                    )));
                }
            }
        }
        if link.sql.is_empty() {
            return Err(self.fatal(ParseError::at(g.line, "no \"on\" clause for a \"join\"")));
        }
        join.links.push(link);

        // `then`s keep their declaration order.
        then_nodes.sort_by_key(|node| node.line);
        for then in then_nodes {
            join.links.push(self.parse_then(then)?);
        }

        if let Some(decorator) = decorator {
            if join.links.len() > 2 {
                return Err(self.fatal(ParseError::at(
                    g.line,
                    format!("\"{decorator}\" JOIN cannot connect more than 2 tables"),
                )));
            }
            join.one_table = if decorator == DECORATOR_MANY_TO_ONE {
                join.links[1].table.clone()
            } else {
                join.links[0].table.clone()
            };
            join.one_columns =
                self.validate_one_many_condition(&join.links[1].sql, &join.one_table, decorator, g.line)?;
        }
        Ok(join)
    }

    /// Parses one `then` link: `<operator words> <table>` plus an
    /// `on`/`sql` condition. Decorators are not allowed here.
    fn parse_then(&mut self, then: &GenericNode) -> PResult<JoinLink> {
        if then.value.is_empty() {
            return Err(self.fatal(ParseError::at(then.line, "\"then\" has to have value")));
        }
        let pieces: Vec<&str> = then.value.split_whitespace().collect();
        let n = pieces.len();
        if n < 2 {
            return Err(self.fatal(ParseError::at(
                then.line,
                format!("cannot parse \"then\": {}", then.value),
            )));
        }
        let operator_words = pieces[..n - 1].join(" ");
        let Some(operator) = normalize_join_operator(&operator_words) else {
            return Err(self.fatal(ParseError::at(
                then.line,
                format!("expected operator in \"then\", got: {operator_words}"),
            )));
        };
        let table = pieces[n - 1];
        if !is_valid_id(table) {
            return Err(self.fatal(ParseError::at(
                then.line,
                format!("invalid table \"{table}\" in \"then\""),
            )));
        }
        let mut link = JoinLink {
            operator: operator.into(),
            table: table.into(),
            sql: EcoString::new(),
        };
        for (&kw, list) in &then.children {
            match kw {
                Keyword::On | Keyword::Sql => {
                    if !link.sql.is_empty() || list.len() > 1 {
                        return Err(self.fatal(ParseError::at(
                            then.line,
                            "cannot have more than one \"sql/on\"s for a \"then\"",
                        )));
                    }
                    let child = &list[0];
                    link.sql = self.parse_string(child)?;
                    let Some(first_word) = link.sql.split_whitespace().next() else {
                        return Err(self.fatal(ParseError::at(
                            child.line,
                            "no expression for a \"sql\" or \"on\" clause",
                        )));
                    };
                    if let Some(stray) = normalized_one_to_many(first_word) {
                        return Err(self.fatal(ParseError::at(
                            then.line,
                            format!(
                                "not expecting \"{stray}\" in joins involving more than two tables"
                            ),
                        )));
                    }
                }
                _ => {
                    return Err(self.fatal(ParseError::at(
                        then.line,
                        format!("\"then\" cannot contain \"{kw}\""),
                    )));
                }
            }
        }
        if link.sql.is_empty() {
            return Err(self.fatal(ParseError::at(then.line, "no \"on\" clause for a \"then\"")));
        }
        Ok(link)
    }

    /// Validates the condition of a decorated join and extracts the
    /// "one" side's columns.
    ///
    /// Only conjunctions of equalities are accepted: `OR`/`NOT` and any
    /// operator other than `=` are reported. A qualified name whose
    /// table part matches the one-side table (case-insensitively)
    /// contributes its column; at least one must participate.
    fn validate_one_many_condition(
        &mut self,
        condition: &str,
        one_table: &str,
        decorator: &str,
        line: i32,
    ) -> PResult<Vec<EcoString>> {
        let mut one_columns = Vec::new();
        for token in sql::tokenize(condition) {
            if token.is_reserved()
                && (token.value.eq_ignore_ascii_case("OR") || token.value.eq_ignore_ascii_case("NOT"))
            {
                self.record(ParseError::at(
                    line,
                    format!(
                        "expecting simple conjunctions in {decorator} JOIN, found \"{}\"",
                        token.value
                    ),
                ))?;
            }
            if token.is_op() && token.value != "=" {
                self.record(ParseError::at(
                    line,
                    format!(
                        "expecting only equalities (=) in {decorator} JOIN, found \"{}\"",
                        token.value
                    ),
                ))?;
            }
            if token.is_name() && token.value.eq_ignore_ascii_case(one_table) {
                if let Some(member) = token.member {
                    one_columns.push(member);
                }
            }
        }
        if one_columns.is_empty() {
            self.record(ParseError::at(
                line,
                format!(
                    "did not find any column of table \"{one_table}\" participating in {decorator} JOIN"
                ),
            ))?;
        }
        Ok(one_columns)
    }
}
