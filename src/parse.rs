// Copyright 2018 the remacro authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;

use crate::ast::{Node, Span};
use crate::error::{ErrorKind, InternalError};
use crate::lex;
use crate::selftest::{FieldCheck, TestSuite};

const TEST_MATCH: &str = "$match";
const TEST_NO_MATCH: &str = "$nomatch";
const TEST_MULTI_MATCH: &str = "$multimatch";
const TEST_END: &str = "$end";
const TEST_FIELD_PREFIX: &str = "$field.";
const TEST_FIELD_INDEXED_PREFIX: &str = "$field[";

/// Everything a template declares: the macro table plus the embedded
/// test suite.
#[derive(Debug)]
pub struct ParsedTemplate {
    pub macros: HashMap<String, Vec<Node>>,
    /// Name and definition-line span of the first macro defined.
    pub root: Option<(String, Span)>,
    pub suite: TestSuite,
}

/// Walk the template line by line, classifying each line and
/// populating the macro table and the test stores.
///
/// Blank lines and `//` comment lines are skipped. Every other line
/// must carry a `:` separating a directive or macro name from its
/// value. Parsing stops at the first malformed line.
pub fn parse(src: &str) -> Result<ParsedTemplate, InternalError> {
    Parser::new(src).run()
}

struct Parser<'input> {
    /// Each line paired with its byte offset into the source. Line
    /// text excludes the trailing `\n` and `\r`.
    lines: Vec<(usize, &'input str)>,
    macros: HashMap<String, Vec<Node>>,
    root: Option<(String, Span)>,
    suite: TestSuite,
}

fn split_lines(src: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (idx, c) in src.char_indices() {
        if c == '\n' {
            lines.push((start, strip_cr(&src[start..idx])));
            start = idx + 1;
        }
    }
    lines.push((start, strip_cr(&src[start..])));
    lines
}

fn strip_cr(line: &str) -> &str {
    if line.ends_with('\r') {
        &line[..line.len() - 1]
    } else {
        line
    }
}

impl<'input> Parser<'input> {
    fn new(src: &'input str) -> Self {
        Parser {
            lines: split_lines(src),
            macros: HashMap::new(),
            root: None,
            suite: TestSuite::new(),
        }
    }

    fn run(mut self) -> Result<ParsedTemplate, InternalError> {
        let mut at = 0;
        while at < self.lines.len() {
            let (start, line) = self.lines[at];

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                at += 1;
                continue;
            }

            let line_span = Span {
                start,
                end: start + line.len(),
            };

            let colon = match line.find(':') {
                Some(idx) => idx,
                None => {
                    return Err(InternalError::new(
                        ErrorKind::MissingColon,
                        line_span,
                    ))
                }
            };
            let name = &line[..colon];

            // Skip whitespace between the colon and the value; keep
            // anything trailing.
            let rest = &line[colon + 1..];
            let value = rest.trim_start();
            let value_at = start + colon + 1 + (rest.len() - value.len());

            if name.eq_ignore_ascii_case(TEST_MATCH) {
                self.suite.pass_tests.push(String::from(value));
            } else if name.eq_ignore_ascii_case(TEST_NO_MATCH) {
                self.suite.fail_tests.push(String::from(value));
            } else if name.eq_ignore_ascii_case(TEST_MULTI_MATCH) {
                at = self.multi_match_block(at, value, line_span)?;
            } else if name.starts_with(TEST_FIELD_PREFIX) {
                let field = &name[TEST_FIELD_PREFIX.len()..];
                self.field_directive(field, 0, value, line_span)?;
            } else if name.starts_with(TEST_FIELD_INDEXED_PREFIX) {
                self.indexed_field_directive(name, value, line_span)?;
            } else if name.starts_with('$') {
                return Err(InternalError::new(
                    ErrorKind::UnknownDirective {
                        name: String::from(name),
                    },
                    Span {
                        start,
                        end: start + colon,
                    },
                ));
            } else {
                self.macro_definition(name, value, value_at, line_span)?;
            }

            at += 1;
        }

        Ok(ParsedTemplate {
            macros: self.macros,
            root: self.root,
            suite: self.suite,
        })
    }

    fn macro_definition(
        &mut self,
        name: &str,
        value: &str,
        value_at: usize,
        line_span: Span,
    ) -> Result<(), InternalError> {
        if self.macros.contains_key(name) {
            return Err(InternalError::new(
                ErrorKind::DuplicateMacro {
                    name: String::from(name),
                },
                line_span,
            ));
        }

        let nodes = lex::tokenize(value, value_at)?;
        if self.root.is_none() {
            self.root = Some((String::from(name), line_span));
        }
        self.macros.insert(String::from(name), nodes);
        Ok(())
    }

    /// Consume the raw lines following a `$multimatch` directive up to
    /// the closing `$end`, and return the index of the `$end` line.
    ///
    /// The expected-match lines are taken verbatim: no trimming, no
    /// comment or blank skipping.
    fn multi_match_block(
        &mut self,
        at: usize,
        input: &str,
        directive_span: Span,
    ) -> Result<usize, InternalError> {
        let mut expected = Vec::new();
        let mut at = at + 1;
        while at < self.lines.len() {
            let (_, line) = self.lines[at];
            if line.eq_ignore_ascii_case(TEST_END) {
                self.suite.add_multi_match(input, expected);
                return Ok(at);
            }
            expected.push(String::from(line));
            at += 1;
        }

        Err(InternalError::new(
            ErrorKind::UnterminatedMultiMatch,
            directive_span,
        ))
    }

    fn field_directive(
        &mut self,
        field: &str,
        match_index: usize,
        value: &str,
        line_span: Span,
    ) -> Result<(), InternalError> {
        if field.trim().is_empty() {
            return Err(InternalError::new(
                ErrorKind::MissingFieldName,
                line_span,
            ));
        }

        let parts: Vec<&str> = value.split("$=").collect();
        if parts.len() != 2 {
            return Err(InternalError::new(
                ErrorKind::MissingFieldSeparator,
                line_span,
            ));
        }

        self.suite.add_field_check(
            parts[0].trim(),
            match_index,
            FieldCheck {
                field: String::from(field),
                expected: String::from(parts[1].trim()),
            },
        );
        Ok(())
    }

    /// `$field[<n>].<name>` — a field assertion against the `n`th
    /// occurrence when the pattern is applied in find-all mode.
    fn indexed_field_directive(
        &mut self,
        name: &str,
        value: &str,
        line_span: Span,
    ) -> Result<(), InternalError> {
        let rest = &name[TEST_FIELD_INDEXED_PREFIX.len()..];

        let close = match rest.find(']') {
            Some(idx) => idx,
            None => {
                return Err(InternalError::new(
                    ErrorKind::UnclosedFieldIndex,
                    line_span,
                ))
            }
        };

        let index_str = &rest[..close];
        let match_index: usize = match index_str.parse() {
            Ok(n) => n,
            Err(err) => {
                return Err(InternalError::new(
                    ErrorKind::BadFieldIndex {
                        index: String::from(index_str),
                        err,
                    },
                    line_span,
                ))
            }
        };

        let after = &rest[close + 1..];
        if !after.starts_with('.') {
            return Err(InternalError::new(
                ErrorKind::MissingDotAfterIndex,
                line_span,
            ));
        }

        self.field_directive(&after[1..], match_index, value, line_span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn parse_ok(src: &str) -> ParsedTemplate {
        parse(src).expect("the template to parse")
    }

    fn parse_err(src: &str) -> ErrorKind {
        parse(src).expect_err("the template to be rejected").kind
    }

    #[test]
    fn macro_definition_1() {
        let parsed = parse_ok("test: [a-z]+\n");
        assert_eq!(parsed.root.as_ref().unwrap().0, "test");
        assert_eq!(
            parsed.macros["test"][0].kind,
            NodeKind::Literal(String::from("[a-z]+"))
        );
    }

    #[test]
    fn root_is_first_defined_1() {
        let parsed = parse_ok("first: a\nsecond: b\n");
        assert_eq!(parsed.root.unwrap().0, "first");
    }

    #[test]
    fn comments_and_blanks_skipped_1() {
        let parsed = parse_ok("// a comment\n\n   \ntest: a\n  // indented\n");
        assert_eq!(parsed.macros.len(), 1);
    }

    #[test]
    fn value_keeps_trailing_whitespace_1() {
        let parsed = parse_ok("test:   a b  \n");
        assert_eq!(
            parsed.macros["test"][0].kind,
            NodeKind::Literal(String::from("a b  "))
        );
    }

    #[test]
    fn empty_template_has_no_root_1() {
        let parsed = parse_ok("// nothing here\n");
        assert!(parsed.root.is_none());
    }

    #[test]
    fn pass_and_fail_tests_1() {
        let parsed =
            parse_ok("t: a\n$match: yes\n$MATCH: also\n$nomatch: no\n");
        assert_eq!(parsed.suite.pass_tests, vec!["yes", "also"]);
        assert_eq!(parsed.suite.fail_tests, vec!["no"]);
    }

    #[test]
    fn multi_match_block_1() {
        let parsed = parse_ok("t: a\n$multimatch: a b\na\nb\n$end\n");
        assert_eq!(parsed.suite.multi_matches.len(), 1);
        assert_eq!(parsed.suite.multi_matches[0].input, "a b");
        assert_eq!(parsed.suite.multi_matches[0].expected, vec!["a", "b"]);
    }

    #[test]
    fn multi_match_lines_are_verbatim_1() {
        // comment-looking and indented lines count as expectations
        let parsed = parse_ok("t: a\n$multimatch: in\n// x\n  y\n$END\n");
        assert_eq!(parsed.suite.multi_matches[0].expected, vec!["// x", "  y"]);
    }

    #[test]
    fn multi_match_repeated_input_appends_1() {
        let parsed = parse_ok(
            "t: a\n$multimatch: in\na\n$end\n$multimatch: in\nb\n$end\n",
        );
        assert_eq!(parsed.suite.multi_matches.len(), 1);
        assert_eq!(parsed.suite.multi_matches[0].expected, vec!["a", "b"]);
    }

    #[test]
    fn field_directive_1() {
        let parsed = parse_ok("t: a\n$field.user: in put $= expected \n");
        let case = &parsed.suite.field_cases[0];
        assert_eq!(case.input, "in put");
        assert_eq!(case.match_index, 0);
        assert_eq!(case.checks[0].field, "user");
        assert_eq!(case.checks[0].expected, "expected");
    }

    #[test]
    fn indexed_field_directive_1() {
        let parsed = parse_ok("t: a\n$field[2].user: in $= out\n");
        assert_eq!(parsed.suite.field_cases[0].match_index, 2);
    }

    #[test]
    fn field_directives_group_1() {
        let parsed = parse_ok(
            "t: a\n\
             $field.a: in $= 1\n\
             $field.b: in $= 2\n\
             $field[1].a: in $= 3\n",
        );
        assert_eq!(parsed.suite.field_cases.len(), 2);
        assert_eq!(parsed.suite.field_cases[0].checks.len(), 2);
    }

    #[test]
    fn missing_colon_1() {
        match parse_err("not a definition\n") {
            ErrorKind::MissingColon => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn duplicate_macro_1() {
        match parse_err("test: a\ntest: b\n") {
            ErrorKind::DuplicateMacro { ref name } if name == "test" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn unknown_directive_1() {
        match parse_err("$bogus: x\n") {
            ErrorKind::UnknownDirective { ref name } if name == "$bogus" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn field_prefix_is_case_sensitive_1() {
        match parse_err("$FIELD.x: in $= out\n") {
            ErrorKind::UnknownDirective { .. } => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn unterminated_multi_match_1() {
        match parse_err("t: a\n$multimatch: in\na\nb\n") {
            ErrorKind::UnterminatedMultiMatch => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn missing_field_name_1() {
        match parse_err("t: a\n$field.: in $= out\n") {
            ErrorKind::MissingFieldName => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn missing_field_separator_1() {
        match parse_err("t: a\n$field.x: no separator\n") {
            ErrorKind::MissingFieldSeparator => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn double_field_separator_1() {
        match parse_err("t: a\n$field.x: a $= b $= c\n") {
            ErrorKind::MissingFieldSeparator => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn unclosed_field_index_1() {
        match parse_err("t: a\n$field[0.x: in $= out\n") {
            ErrorKind::UnclosedFieldIndex => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn bad_field_index_1() {
        match parse_err("t: a\n$field[x].y: in $= out\n") {
            ErrorKind::BadFieldIndex { ref index, .. } if index == "x" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn missing_field_index_1() {
        match parse_err("t: a\n$field[].y: in $= out\n") {
            ErrorKind::BadFieldIndex { ref index, .. } if index == "" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn missing_dot_after_index_1() {
        match parse_err("t: a\n$field[0]x: in $= out\n") {
            ErrorKind::MissingDotAfterIndex => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn tokenizer_errors_surface_1() {
        match parse_err("test: $(unclosed\n") {
            ErrorKind::LexicalError(_) => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn crlf_line_breaks_1() {
        let parsed = parse_ok("t: a\r\n$match: b\r\n");
        assert_eq!(parsed.suite.pass_tests, vec!["b"]);
        assert_eq!(
            parsed.macros["t"][0].kind,
            NodeKind::Literal(String::from("a"))
        );
    }
}
