// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for SML model files.
//!
//! The lexer is line-oriented: every non-blank, non-comment source line
//! produces exactly one [`Token`] holding the line's indentation depth,
//! its keyword, and an optional value. Triple-quoted values may span
//! multiple lines; the token is emitted with the line number of the
//! terminating line.
//!
//! # Design Principles
//!
//! - **Error recovery**: a malformed line produces a [`TokenKind::Error`]
//!   token and lexing continues on the next line. The only fatal
//!   conditions are unterminated string literals, which stop the scan.
//! - **Explicit termination**: exactly one [`TokenKind::Eof`] token with
//!   indent `-1` ends every stream.
//! - **Comment preservation**: blank lines, comment lines and trailing
//!   comments are collected as [`Comment`] records for tools that care.
//!
//! # Value forms
//!
//! ```text
//! label some string            // bare: trimmed, ends at `//` or `#`
//! label "some string"          // double-quoted, \" escapes the quote
//! label 'some string'          // single-quoted, \' escapes the quote
//! label """line one
//! line two"""                  // triple-quoted, may span lines
//! ```
//!
//! Within a triple-quoted value, a line ending in a single backslash
//! suppresses the newline that would otherwise be inserted.

use ecow::EcoString;

use super::{Comment, Keyword, Token, TokenKind};

/// Tab stops count as this many spaces for indentation purposes.
const TAB_SIZE: i32 = 4;

/// A lexer over one SML input buffer.
///
/// Implements [`Iterator`], yielding every token including the final
/// [`TokenKind::Eof`] sentinel. Comments are accumulated internally and
/// can be retrieved with [`Lexer::take_comments`] after the stream is
/// drained (or use [`lex_with_comments`]).
#[derive(Debug)]
pub struct Lexer<'src> {
    lines: Vec<&'src str>,
    /// 0-based index of the next line to lex.
    line_idx: usize,
    comments: Vec<Comment>,
    /// Set when an unterminated literal stops the scan.
    fatal_at_line: Option<i32>,
    eof_emitted: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    ///
    /// Line separators `\r\n` are treated as `\n`.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let lines = source
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        Self {
            lines,
            line_idx: 0,
            comments: Vec::new(),
            fatal_at_line: None,
            eof_emitted: false,
        }
    }

    /// Returns the comments collected so far, leaving the lexer empty.
    ///
    /// The final record has empty text and points one line past the end
    /// of input; it is only present once the stream has been drained.
    #[must_use]
    pub fn take_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments)
    }

    fn emit_eof(&mut self) -> Option<Token> {
        if self.eof_emitted {
            return None;
        }
        self.eof_emitted = true;
        let line = self
            .fatal_at_line
            .unwrap_or(self.lines.len() as i32 + 1);
        self.comments.push(Comment {
            text: EcoString::new(),
            line,
        });
        Some(Token::eof(line))
    }

    /// Lexes the next token, consuming one or more source lines.
    #[expect(clippy::too_many_lines, reason = "single pass over one line")]
    fn next_token(&mut self) -> Option<Token> {
        if self.fatal_at_line.is_some() {
            return self.emit_eof();
        }
        while self.line_idx < self.lines.len() {
            let mut line = self.lines[self.line_idx];
            let line_num = self.line_idx as i32 + 1;
            let bytes = line.as_bytes();
            let mut pos = 0;

            // First: indentation.
            let mut indent = 0;
            while pos < bytes.len() {
                match bytes[pos] {
                    b' ' => {
                        pos += 1;
                        indent += 1;
                    }
                    b'\t' => {
                        pos += 1;
                        indent += TAB_SIZE;
                    }
                    _ => break,
                }
            }
            if pos >= line.len() || bytes[pos] == b'#' || line[pos..].starts_with("//") {
                // Blank or comment-only line.
                let text = if pos >= line.len() {
                    EcoString::from("#")
                } else {
                    EcoString::from(line[pos..].trim())
                };
                self.comments.push(Comment {
                    text,
                    line: line_num,
                });
                self.line_idx += 1;
                continue;
            }

            // Second: keyword.
            if !is_ident_start(bytes[pos]) {
                let got = line[pos..].chars().next().unwrap_or('?');
                self.line_idx += 1;
                return Some(Token::error(
                    line_num,
                    pos,
                    format!("expected keyword, got {got}"),
                ));
            }
            let mut end = pos + 1;
            while end < bytes.len() && is_ident_continue(bytes[end]) {
                end += 1;
            }
            let word = &line[pos..end];
            let Some(keyword) = Keyword::from_str(word) else {
                self.line_idx += 1;
                return Some(Token::error(
                    line_num,
                    pos,
                    format!("unknown keyword: {word}"),
                ));
            };
            pos = end;

            // Third: value.
            while pos < bytes.len() && is_inline_space(bytes[pos]) {
                pos += 1;
            }
            let mut value = String::new();
            if pos < line.len() {
                if line[pos..].starts_with("\"\"\"") {
                    match multiline_string(pos + 3, &self.lines[self.line_idx..]) {
                        None => {
                            self.fatal_at_line = Some(line_num);
                            // The scan stops here; position 0 marks "no
                            // position within a single line".
                            return Some(Token {
                                kind: TokenKind::Error(
                                    "error at position 0: multiline string not terminated".into(),
                                ),
                                indent: -1,
                                value: EcoString::new(),
                                line: line_num,
                            });
                        }
                        Some((new_pos, lines_consumed, text)) => {
                            value = text;
                            if lines_consumed > 0 {
                                self.line_idx += lines_consumed;
                                line = self.lines[self.line_idx];
                            }
                            pos = new_pos;
                        }
                    }
                } else if bytes[pos] == b'"' || bytes[pos] == b'\'' {
                    let delim = bytes[pos] as char;
                    match quoted_string(delim, pos + 1, line) {
                        None => {
                            self.fatal_at_line = Some(line_num);
                            return Some(Token::error(line_num, pos, "string not terminated"));
                        }
                        Some((after, text)) => {
                            value = text;
                            pos = after;
                        }
                    }
                } else {
                    // Bare value: runs to end of line or the first
                    // comment marker.
                    let rest = &line[pos..];
                    let end = match (rest.find("//"), rest.find('#')) {
                        (Some(a), Some(b)) => a.min(b),
                        (Some(a), None) => a,
                        (None, Some(b)) => b,
                        (None, None) => rest.len(),
                    };
                    value = rest[..end].trim().to_owned();
                    pos += end;
                }
            }

            // Fourth: optional trailing comment.
            let bytes = line.as_bytes();
            while pos < bytes.len() && is_inline_space(bytes[pos]) {
                pos += 1;
            }
            let token_line = self.line_idx as i32 + 1;
            if pos < line.len() {
                if bytes[pos] == b'#' || line[pos..].starts_with("//") {
                    self.comments.push(Comment {
                        text: EcoString::from(line[pos..].trim()),
                        line: token_line,
                    });
                } else {
                    self.line_idx += 1;
                    return Some(Token::error(
                        token_line,
                        pos,
                        format!("unexpected content: {}", &line[pos..]),
                    ));
                }
            }

            self.line_idx += 1;
            return Some(Token::new(keyword, indent, value, token_line));
        }
        self.emit_eof()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Scans a quoted value within one line.
///
/// `start` points just past the opening delimiter. The delimiter may be
/// escaped by a preceding backslash; other backslashes are kept as-is.
/// Returns the position just past the closing delimiter and the value,
/// or `None` if the line ends before the literal does.
fn quoted_string(delim: char, start: usize, line: &str) -> Option<(usize, String)> {
    let mut value = String::new();
    let mut i = start;
    loop {
        let j = line[i..].find(delim)?;
        if j == 0 || line.as_bytes()[i + j - 1] != b'\\' {
            value.push_str(&line[i..i + j]);
            return Some((i + j + 1, value));
        }
        value.push_str(&line[i..i + j - 1]);
        value.push(delim);
        i += j + 1;
    }
}

/// Scans a triple-quoted value starting at `pos` on `lines[0]`.
///
/// Returns the position just past the closing `"""` on the terminal
/// line, the number of extra lines consumed, and the value. Each
/// non-terminal line contributes its text plus `\n`, unless it ends
/// with a single backslash, which is removed and suppresses the
/// newline. Returns `None` when the literal is never terminated.
fn multiline_string(mut pos: usize, lines: &[&str]) -> Option<(usize, usize, String)> {
    let mut value = String::new();
    for (i, line) in lines.iter().enumerate() {
        if let Some(j) = line[pos..].find("\"\"\"") {
            value.push_str(&line[pos..pos + j]);
            return Some((pos + j + 3, i, value));
        }
        let piece = &line[pos..];
        if let Some(stripped) = piece.strip_suffix('\\') {
            value.push_str(stripped);
        } else {
            value.push_str(piece);
            value.push('\n');
        }
        pos = 0;
    }
    None
}

const fn is_ident_start(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

const fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

const fn is_inline_space(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Lexes a buffer into a vector of tokens, including the Eof sentinel.
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lexes a buffer, also returning the collected comments.
#[must_use]
pub fn lex_with_comments(source: &str) -> (Vec<Token>, Vec<Comment>) {
    let mut lexer = Lexer::new(source);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    (tokens, lexer.take_comments())
}

/// A token source that never runs dry.
///
/// The generic tree builder occasionally looks one token past a
/// subtree; after the underlying lexer is exhausted this keeps handing
/// out Eof tokens instead of panicking or blocking.
#[derive(Debug)]
pub struct TokenStream<I> {
    inner: I,
    last_line: i32,
}

impl<I: Iterator<Item = Token>> TokenStream<I> {
    /// Wraps a token iterator.
    #[must_use]
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            last_line: 1,
        }
    }

    /// Returns the next token, or an Eof token once exhausted.
    pub fn next_token(&mut self) -> Token {
        match self.inner.next() {
            Some(token) => {
                self.last_line = token.line;
                token
            }
            None => Token::eof(self.last_line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_empty_input() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].kind.is_eof());
        assert_eq!(tokens[0].indent, -1);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn lex_keyword_and_bare_value() {
        let tokens = lex("project demo");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(Keyword::Project, 0, "demo", 1));
        assert!(tokens[1].kind.is_eof());
    }

    #[test]
    fn lex_bare_value_is_trimmed_and_may_be_empty() {
        let tokens = lex("project   \ntable  spaced out  ");
        assert_eq!(tokens[0].value, "");
        assert_eq!(tokens[1].value, "spaced out");
    }

    #[test]
    fn lex_indentation_spaces_and_tabs() {
        let tokens = lex("project p\n  table t\n\tsql x");
        assert_eq!(tokens[0].indent, 0);
        assert_eq!(tokens[1].indent, 2);
        assert_eq!(tokens[2].indent, 4); // one tab
    }

    #[test]
    fn lex_line_numbers_are_one_based() {
        let tokens = lex("\nproject p\n\n  table t");
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 4);
    }

    #[test]
    fn lex_crlf_line_endings() {
        let tokens = lex("project p\r\n  table t\r\n");
        assert_eq!(tokens[0], Token::new(Keyword::Project, 0, "p", 1));
        assert_eq!(tokens[1], Token::new(Keyword::Table, 2, "t", 2));
    }

    #[test]
    fn lex_unknown_keyword_is_error_token() {
        let tokens = lex("\nproject blah\n  node foo");
        assert_eq!(
            tokens[1].kind,
            TokenKind::Error("error at position 3: unknown keyword: node".into())
        );
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[1].indent, -1);
        // Lexing continues to Eof.
        assert!(tokens[2].kind.is_eof());
    }

    #[test]
    fn lex_non_identifier_start_is_error_token() {
        let tokens = lex("project p\n  3kw x");
        assert_eq!(
            tokens[1].kind,
            TokenKind::Error("error at position 3: expected keyword, got 3".into())
        );
    }

    #[test]
    fn lex_double_quoted_value() {
        let tokens = lex(r#"description "table for beneficiary data""#);
        assert_eq!(tokens[0].value, "table for beneficiary data");
    }

    #[test]
    fn lex_single_quoted_value() {
        let tokens = lex("label 'hello world'");
        assert_eq!(tokens[0].value, "hello world");
    }

    #[test]
    fn lex_escaped_quote_inside_literal() {
        let tokens = lex(r#"label "say \"hi\" now""#);
        assert_eq!(tokens[0].value, r#"say "hi" now"#);
    }

    #[test]
    fn lex_backslash_not_before_delimiter_is_literal() {
        let tokens = lex(r#"label "a\b""#);
        assert_eq!(tokens[0].value, r"a\b");
    }

    #[test]
    fn lex_unterminated_quote_is_fatal() {
        let tokens = lex("label \"oops\ntable t");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Error("error at position 7: string not terminated".into())
        );
        // Fatal: the following line is never lexed.
        assert_eq!(tokens.len(), 2);
        assert!(tokens[1].kind.is_eof());
    }

    #[test]
    fn lex_triple_quoted_single_line() {
        let tokens = lex(r#"description """all on one line""""#);
        assert_eq!(tokens[0].value, "all on one line");
        assert_eq!(tokens[0].line, 1);
    }

    #[test]
    fn lex_triple_quoted_multi_line() {
        let tokens = lex("description \"\"\"first\nsecond\"\"\"\ntable t");
        assert_eq!(tokens[0].value, "first\nsecond");
        // The token carries the terminating line's number.
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1], Token::new(Keyword::Table, 0, "t", 3));
    }

    #[test]
    fn lex_triple_quoted_backslash_suppresses_newline() {
        let tokens = lex("description \"\"\"first\\\nsecond\"\"\"");
        assert_eq!(tokens[0].value, "firstsecond");
    }

    #[test]
    fn lex_unterminated_triple_quote_is_fatal() {
        let tokens = lex("description \"\"\"never ends\ntable t");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Error("error at position 0: multiline string not terminated".into())
        );
        assert_eq!(tokens.len(), 2);
        assert!(tokens[1].kind.is_eof());
    }

    #[test]
    fn lex_bare_value_stops_at_comment_markers() {
        let tokens = lex("sql select 1 // trailing\nsql select 2 # trailing");
        assert_eq!(tokens[0].value, "select 1");
        assert_eq!(tokens[1].value, "select 2");
    }

    #[test]
    fn lex_bare_value_stops_at_first_marker_of_either_kind() {
        let tokens = lex("sql a # b // c");
        assert_eq!(tokens[0].value, "a");
    }

    #[test]
    fn lex_trailing_garbage_after_quoted_value() {
        let tokens = lex("label \"x\" oops");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Error("error at position 11: unexpected content: oops".into())
        );
    }

    #[test]
    fn lex_trailing_comment_after_quoted_value() {
        let tokens = lex("label \"x\" # fine\nlabel 'y' // also fine");
        assert_eq!(tokens[0].value, "x");
        assert_eq!(tokens[1].value, "y");
        assert!(tokens[2].kind.is_eof());
    }

    #[test]
    fn lex_comment_records() {
        let (tokens, comments) = lex_with_comments("# header\n\nproject p // trailing\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            comments,
            vec![
                Comment {
                    text: "# header".into(),
                    line: 1
                },
                Comment {
                    text: "#".into(),
                    line: 2
                },
                Comment {
                    text: "// trailing".into(),
                    line: 3
                },
                Comment {
                    text: "#".into(),
                    line: 4
                },
                Comment {
                    text: "".into(),
                    line: 5
                },
            ]
        );
    }

    #[test]
    fn lex_eof_only_once() {
        let mut lexer = Lexer::new("project p");
        assert!(lexer.next().is_some());
        assert!(lexer.next().is_some_and(|t| t.kind.is_eof()));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn token_stream_hands_out_eof_forever() {
        let mut stream = TokenStream::new(lex("project p").into_iter());
        assert_eq!(stream.next_token().keyword(), Some(Keyword::Project));
        assert!(stream.next_token().kind.is_eof());
        assert!(stream.next_token().kind.is_eof());
        assert!(stream.next_token().kind.is_eof());
    }

    #[test]
    fn lex_all_value_forms_in_one_document() {
        let source = concat!(
            "project p\n",
            "  table t\n",
            "    description \"\"\"multi\nline\"\"\"\n",
            "    sql select * from t\n",
            "    label 'T'\n",
        );
        let values: Vec<EcoString> = lex(source).into_iter().map(|t| t.value).collect();
        assert_eq!(
            values,
            vec!["p", "t", "multi\nline", "select * from t", "T", ""]
        );
    }

    #[test]
    fn lex_keyword_at_end_of_line_has_empty_value() {
        let kinds = kinds("on");
        assert_eq!(kinds[0], TokenKind::Keyword(Keyword::On));
    }
}
