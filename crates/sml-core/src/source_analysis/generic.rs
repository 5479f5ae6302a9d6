// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The generic (untyped) tree.
//!
//! Indentation alone determines the hierarchy of an SML document, so the
//! token stream can be rebuilt into a tree without knowing anything
//! about which keywords may nest where. The result is a [`GenericNode`]
//! tree: keyword, value, line, and children grouped by keyword.
//!
//! Children under the same keyword keep their source order. Order
//! *across* keywords is not kept by the map; stages that need it (join
//! `then` chains, column interleaving, indentation diagnostics) recover
//! it from the `line` field.

use std::collections::BTreeMap;

use ecow::EcoString;

use super::{Keyword, ParseError, Token, TokenKind, TokenStream};

/// One node of the untyped document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericNode {
    /// The keyword that opened this node's line.
    pub keyword: Keyword,
    /// The line's value payload (may be empty).
    pub value: EcoString,
    /// 1-based source line.
    pub line: i32,
    /// Children grouped by keyword, in source order within each group.
    pub children: BTreeMap<Keyword, Vec<GenericNode>>,
}

impl GenericNode {
    /// Creates a leaf node.
    #[must_use]
    pub fn new(keyword: Keyword, value: impl Into<EcoString>, line: i32) -> Self {
        Self {
            keyword,
            value: value.into(),
            line,
            children: BTreeMap::new(),
        }
    }

    /// Returns the children under `keyword`, or an empty slice.
    #[must_use]
    pub fn children_of(&self, keyword: Keyword) -> &[GenericNode] {
        self.children.get(&keyword).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if this node has no children at all.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Builds a generic tree from the token stream.
///
/// `root` is the already-consumed token that opens the tree (its keyword
/// is passed separately so the builder is total). Returns the tree, the
/// token that terminated parsing (the first token whose indent is not
/// deeper than the root's, or Eof), and any non-fatal parse errors.
///
/// Error tokens in the stream are recorded and skipped. A token deeper
/// than the established child indent is reported as inconsistent
/// indentation and skipped.
pub fn parse_generic<I: Iterator<Item = Token>>(
    stream: &mut TokenStream<I>,
    keyword: Keyword,
    root: &Token,
) -> (GenericNode, Token, Vec<ParseError>) {
    let mut errors = Vec::new();
    let (node, next) = build(stream, keyword, root, &mut errors);
    (node, next, errors)
}

fn build<I: Iterator<Item = Token>>(
    stream: &mut TokenStream<I>,
    keyword: Keyword,
    root: &Token,
    errors: &mut Vec<ParseError>,
) -> (GenericNode, Token) {
    let mut node = GenericNode::new(keyword, root.value.clone(), root.line);
    let mut next = stream.next_token();
    while let TokenKind::Error(message) = &next.kind {
        errors.push(ParseError::at(next.line, message.to_string()));
        next = stream.next_token();
    }
    if next.indent > root.indent {
        // The first deeper token fixes the indent for all children.
        let child_indent = next.indent;
        while next.indent == child_indent {
            let Some(child_kw) = next.keyword() else {
                break; // error/Eof tokens carry indent -1, so unreachable
            };
            let (child, after) = build(stream, child_kw, &next, errors);
            node.children.entry(child.keyword).or_default().push(child);
            next = after;
        }
        if next.indent > root.indent {
            errors.push(ParseError::at(next.line, "inconsistent indentation"));
            next = stream.next_token();
        }
    }
    (node, next)
}

/// Walks the tree depth-first. `pre` runs before a node's children and
/// `post` after; returning `false` from either aborts the whole walk.
pub(crate) fn walk_generic(
    node: &GenericNode,
    pre: &mut dyn FnMut(&GenericNode) -> bool,
    post: &mut dyn FnMut(&GenericNode) -> bool,
) -> bool {
    if !pre(node) {
        return false;
    }
    for list in node.children.values() {
        for child in list {
            if !walk_generic(child, pre, post) {
                return false;
            }
        }
    }
    post(node)
}

/// Renders a generic tree back to canonical two-space-indented source.
///
/// Children are emitted in source order (by line), so re-lexing the
/// output reproduces an equivalent tree. Useful for debugging and for
/// round-trip tests; values are emitted bare, so this is only faithful
/// for values without embedded newlines or comment markers.
#[must_use]
pub fn generic_to_string(node: &GenericNode) -> String {
    let mut out = Vec::new();
    render(node, "", &mut out);
    out.join("\n")
}

fn render(node: &GenericNode, indent: &str, out: &mut Vec<String>) {
    if node.value.is_empty() {
        out.push(format!("{indent}{}", node.keyword));
    } else {
        out.push(format!("{indent}{} {}", node.keyword, node.value));
    }
    let mut children: Vec<&GenericNode> = node.children.values().flatten().collect();
    children.sort_by_key(|child| child.line);
    let deeper = format!("{indent}  ");
    for child in children {
        render(child, &deeper, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_analysis::lex;

    fn parse(source: &str) -> (GenericNode, Token, Vec<ParseError>) {
        let mut stream = TokenStream::new(lex(source).into_iter());
        let root = stream.next_token();
        let keyword = root.keyword().expect("root keyword");
        parse_generic(&mut stream, keyword, &root)
    }

    #[test]
    fn builds_nested_tree_from_indentation() {
        let (tree, next, errors) = parse(
            "project p\n  table t\n    sql select 1\n    column c\n      type int\n  table u\n    sql u",
        );
        assert!(errors.is_empty());
        assert!(next.kind.is_eof());
        assert_eq!(tree.keyword, Keyword::Project);
        assert_eq!(tree.value, "p");

        let tables = tree.children_of(Keyword::Table);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].value, "t");
        assert_eq!(tables[1].value, "u");

        let columns = tables[0].children_of(Keyword::Column);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].children_of(Keyword::Type)[0].value, "int");
    }

    #[test]
    fn sibling_order_within_keyword_is_source_order() {
        let (tree, _, _) = parse("project p\n  table b\n  table a\n  table c");
        let names: Vec<&str> = tree
            .children_of(Keyword::Table)
            .iter()
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn terminates_at_shallower_token() {
        let source = "project p\n  table t\n    sql x\n  table u";
        let mut stream = TokenStream::new(lex(source).into_iter());
        let root = stream.next_token(); // project
        let first_table = stream.next_token();
        let (tree, next, errors) = parse_generic(
            &mut stream,
            first_table.keyword().expect("table"),
            &first_table,
        );
        assert!(errors.is_empty());
        assert_eq!(tree.keyword, Keyword::Table);
        assert_eq!(tree.value, "t");
        // The second table terminated the subtree.
        assert_eq!(next.keyword(), Some(Keyword::Table));
        assert_eq!(next.value, "u");
        assert_eq!(root.value, "p");
    }

    #[test]
    fn records_and_skips_error_tokens() {
        let (tree, next, errors) = parse("project p\n  !bad\n  table t\n    sql x");
        assert!(next.kind.is_eof());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "error at position 3: expected keyword, got !");
        assert_eq!(errors[0].line, 2);
        // The table after the bad line still parses.
        assert_eq!(tree.children_of(Keyword::Table).len(), 1);
    }

    #[test]
    fn deeper_token_after_children_is_inconsistent_indentation() {
        let (tree, _, errors) = parse("project p\n  table t\n    sql x\n      label deep\n   label odd");
        // "label odd" at indent 3 is between table indent (2) and sql
        // indent (4): not a valid sibling anywhere.
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "inconsistent indentation");
        assert_eq!(errors[0].line, 5);
        assert_eq!(tree.children_of(Keyword::Table).len(), 1);
    }

    #[test]
    fn line_numbers_survive_into_nodes() {
        let (tree, _, _) = parse("project p\n  table t\n    sql x");
        assert_eq!(tree.line, 1);
        let table = &tree.children_of(Keyword::Table)[0];
        assert_eq!(table.line, 2);
        assert_eq!(table.children_of(Keyword::Sql)[0].line, 3);
    }

    #[test]
    fn generic_to_string_round_trips_shape() {
        let source = "project p\n  table t\n    sql select 1\n    column c\n      type int";
        let (tree, _, _) = parse(source);
        let emitted = generic_to_string(&tree);
        assert_eq!(emitted, source);
        let (reparsed, _, errors) = parse(&emitted);
        assert!(errors.is_empty());
        // Lines shift but the shape and values are identical.
        assert_eq!(reparsed.value, tree.value);
        assert_eq!(
            reparsed.children_of(Keyword::Table)[0]
                .children_of(Keyword::Column)[0]
                .children_of(Keyword::Type)[0]
                .value,
            "int"
        );
    }

    #[test]
    fn walk_visits_every_node() {
        let (tree, _, _) = parse("project p\n  table t\n    sql x\n  dataset d\n    label l");
        let mut seen = 0;
        walk_generic(&tree, &mut |_| {
            seen += 1;
            true
        }, &mut |_| true);
        assert_eq!(seen, 5);
    }

    #[test]
    fn walk_can_abort_early() {
        let (tree, _, _) = parse("project p\n  table t\n    sql x");
        let mut seen = 0;
        let aborted = !walk_generic(
            &tree,
            &mut |node| {
                seen += 1;
                node.keyword != Keyword::Table
            },
            &mut |_| true,
        );
        assert!(aborted);
        assert_eq!(seen, 2);
    }
}
