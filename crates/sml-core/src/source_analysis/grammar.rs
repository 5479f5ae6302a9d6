// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The keyword grammar and indentation diagnostics.
//!
//! A [`KwTree`] declares which keywords may appear nested under which.
//! It is built once from an indented outline literal (see
//! [`sml_grammar`]) and consulted after generic-tree construction:
//! [`find_indentation_errors`] looks for the earliest child whose
//! keyword is not allowed under its parent and tries to suggest a
//! concrete repair ("maybe move left/right to be under X").
//!
//! When no repair can be found the validator stays silent and leaves
//! the diagnosis to the semantic parser, which will reject the child
//! under its actual parent with a more specific message.

use once_cell::sync::Lazy;

use super::generic::walk_generic;
use super::{GenericNode, Keyword, ParseError};

/// A node of the keyword grammar: one keyword and its legal children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KwTree {
    /// The keyword at this grammar position.
    pub keyword: Keyword,
    /// Keywords that may nest directly under it.
    pub children: Vec<KwTree>,
}

impl KwTree {
    /// Builds a grammar tree from an indented outline.
    ///
    /// Each line holds one keyword; children are indented by exactly
    /// two more spaces than their parent and the outline has a single
    /// root.
    ///
    /// # Panics
    ///
    /// Panics on a malformed outline; the outline is a compile-time
    /// literal, so this is an assertion on the grammar itself.
    #[must_use]
    pub fn from_outline(outline: &str) -> Self {
        let mut entries = Vec::new();
        for line in outline.trim().lines() {
            let spelled = line.trim_end();
            let word = spelled.trim_start();
            let indent = spelled.len() - word.len();
            assert!(indent % 2 == 0, "grammar outline must indent by two spaces");
            let keyword = Keyword::from_str(word)
                .unwrap_or_else(|| panic!("unknown keyword in grammar outline: {word}"));
            entries.push((indent / 2, keyword));
        }
        assert!(!entries.is_empty(), "grammar outline is empty");
        let mut pos = 0;
        let root = Self::build(&entries, &mut pos);
        assert!(pos == entries.len(), "grammar outline must have a single root");
        root
    }

    fn build(entries: &[(usize, Keyword)], pos: &mut usize) -> Self {
        let (depth, keyword) = entries[*pos];
        *pos += 1;
        let mut node = Self {
            keyword,
            children: Vec::new(),
        };
        while *pos < entries.len() && entries[*pos].0 == depth + 1 {
            node.children.push(Self::build(entries, pos));
        }
        assert!(
            *pos >= entries.len() || entries[*pos].0 <= depth + 1,
            "grammar outline skips an indentation level"
        );
        node
    }

    /// Returns the subtree rooted at a direct child `keyword`, or the
    /// whole tree when no such child exists. Used to validate
    /// fragmentary inputs (table-only or dataset-only files).
    #[must_use]
    pub fn subtree(&self, keyword: Keyword) -> &Self {
        self.children
            .iter()
            .find(|child| child.keyword == keyword)
            .unwrap_or(self)
    }
}

/// The SML keyword grammar.
///
/// Carried over verbatim from the language definition; the semantic
/// parser is the authority for keywords this outline underspecifies
/// (see [`find_indentation_errors`]).
#[must_use]
pub fn sml_grammar() -> &'static KwTree {
    static GRAMMAR: Lazy<KwTree> = Lazy::new(|| {
        KwTree::from_outline(
            "
project
  dataset
    table
    join
      on
      sql
      then
        on
        sql
    label
  table
    description
    sql
    label
    column
      sql
      label
      format
      type
      transformer
  scheme
    name
    description
    criteria
      column
      table
      operator
      value
      combine
        term
          column
          table
          operator
          value
          granularity
          combine
        column
        table
        operator
        value
        granularity
    evaluation
",
        )
    });
    &GRAMMAR
}

/// Tests whether `path` (root first) is a chain of legal nestings.
///
/// Every prefix except possibly the last element is expected to be
/// valid already; callers only probe where the final keyword may go.
#[must_use]
pub fn is_valid_path(path: &[Keyword], tree: &KwTree) -> bool {
    let mut children = std::slice::from_ref(tree);
    for (i, keyword) in path.iter().enumerate() {
        match children.iter().find(|c| c.keyword == *keyword) {
            Some(node) => children = &node.children,
            None => {
                debug_assert!(i == path.len() - 1, "only the last path element may be invalid");
                return false;
            }
        }
    }
    true
}

/// Validates a generic tree against the grammar and, on mismatch,
/// produces an actionable indentation diagnostic.
///
/// The earliest offending source line is located; the path of keywords
/// down to the previous source line (known valid) is then shortened
/// from the right until appending the offending keyword yields a legal
/// path. The first hit determines the suggested parent and whether the
/// line should move left or right. If no repair exists, an empty list
/// is returned and the semantic parser reports the problem instead.
#[must_use]
pub fn find_indentation_errors(g: &GenericNode, grammar: &KwTree) -> Vec<ParseError> {
    debug_assert_eq!(g.keyword, grammar.keyword, "root keyword mismatch");
    let Some((line, level)) = first_line_mismatch(1, g, grammar) else {
        return Vec::new();
    };

    // The keyword on the offending line, and the closest earlier line.
    let mut offending = None;
    let mut previous_line = -1;
    walk_generic(
        g,
        &mut |node| {
            if node.line == line {
                offending = Some(node.keyword);
            } else if node.line < line && node.line > previous_line {
                previous_line = node.line;
            }
            true
        },
        &mut |_| true,
    );
    let Some(keyword) = offending else {
        return Vec::new();
    };

    // The path from the root to the previous line is valid under the
    // grammar; probe every truncation of it as a parent candidate.
    let mut path = Vec::new();
    find_path(g, previous_line, &mut path);
    let mut sequence: Vec<Keyword> = path.iter().map(|node| node.keyword).collect();
    while !sequence.is_empty() {
        sequence.push(keyword);
        if is_valid_path(&sequence, grammar) {
            let parent_index = sequence.len() - 2;
            let new_level = (sequence.len() - 1) as i32;
            let direction = if new_level > level { "right" } else { "left" };
            let parent = sequence[parent_index];
            if parent == Keyword::Project {
                return vec![ParseError::at(
                    line,
                    format!("indentation error for \"{keyword}\", maybe move {direction}"),
                )];
            }
            let value = clipped_value(path[parent_index].value.trim());
            return vec![ParseError::at(
                line,
                format!(
                    "indentation error for \"{keyword}\", maybe move {direction} to be under \"{parent}\"{value}"
                ),
            )];
        }
        sequence.truncate(sequence.len() - 2);
    }
    Vec::new()
}

/// Formats a parent value for the diagnostic: elided when empty,
/// truncated to five characters when longer than eight.
fn clipped_value(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if value.chars().count() > 8 {
        let head: String = value.chars().take(5).collect();
        format!(" ({head}...)")
    } else {
        format!(" ({value})")
    }
}

/// Finds the earliest source line whose keyword is not allowed under
/// its parent. Returns that line and the parent's nesting level.
fn first_line_mismatch(level: i32, g: &GenericNode, grammar: &KwTree) -> Option<(i32, i32)> {
    let mut min: Option<(i32, i32)> = None;
    let mut consider = |candidate: (i32, i32), min: &mut Option<(i32, i32)>| {
        if min.map_or(true, |(best, _)| candidate.0 < best) {
            *min = Some(candidate);
        }
    };
    for (keyword, list) in &g.children {
        match grammar.children.iter().find(|c| c.keyword == *keyword) {
            Some(sub) => {
                for child in list {
                    if let Some(found) = first_line_mismatch(level + 1, child, sub) {
                        consider(found, &mut min);
                    }
                }
            }
            None => {
                for child in list {
                    consider((child.line, level), &mut min);
                }
            }
        }
    }
    min
}

/// Collects the path of nodes from `node` down to the node at `line`.
fn find_path<'a>(node: &'a GenericNode, line: i32, path: &mut Vec<&'a GenericNode>) -> bool {
    path.push(node);
    if node.line == line {
        return true;
    }
    for list in node.children.values() {
        for child in list {
            if find_path(child, line, path) {
                return true;
            }
        }
    }
    path.pop();
    false
}
