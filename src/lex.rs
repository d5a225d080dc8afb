// Copyright 2018 the remacro authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::mem;

use crate::ast::{Node, NodeKind, Span};
use crate::error::{self, InternalError};

#[derive(Debug)]
pub enum LexicalErrorKind {
    BadMacroStart(char),
    EmptyMacroName,
    InvalidMacroName { name: String },
    UnterminatedMacroReference,
}

impl fmt::Display for LexicalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LexicalErrorKind::BadMacroStart(c) => {
                write!(f, "Expected '(' or a letter after '$' (found {:?}).", c)
            }
            LexicalErrorKind::EmptyMacroName => write!(f, "Empty macro name."),
            LexicalErrorKind::InvalidMacroName { name } => {
                write!(
                    f,
                    "Invalid macro name '{}': only letters are allowed.",
                    name
                )
            }
            LexicalErrorKind::UnterminatedMacroReference => {
                write!(f, "Unterminated macro reference: missing ')'.")
            }
        }
    }
}

/// Split one macro definition's right-hand side into literal and
/// macro-reference nodes.
///
/// `base` is the byte offset of `text` within the whole template
/// source, so that emitted spans line up with the original input.
pub fn tokenize(text: &str, base: usize) -> Result<Vec<Node>, InternalError> {
    Tokenizer::new(text, base).run()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Accumulating literal pattern text.
    Text,
    /// The character immediately after a `$`.
    MacroStart,
    /// Inside an unbracketed `$name` reference.
    MacroName,
    /// Inside a bracketed `$(name)` reference.
    MacroNameBracketed,
}

struct Tokenizer<'input> {
    text: &'input str,
    base: usize,
    state: State,
    nodes: Vec<Node>,
    /// The literal run or macro name currently being accumulated.
    buf: String,
    /// Offset within `text` where the token in `buf` began.
    token_start: usize,
}

impl<'input> Tokenizer<'input> {
    fn new(text: &'input str, base: usize) -> Self {
        Tokenizer {
            text,
            base,
            state: State::Text,
            nodes: Vec::new(),
            buf: String::new(),
            token_start: 0,
        }
    }

    fn run(mut self) -> Result<Vec<Node>, InternalError> {
        let text = self.text;
        for (at, c) in text.char_indices() {
            match self.state {
                State::Text => {
                    if c == '$' {
                        self.flush_literal(at);
                        self.token_start = at;
                        self.state = State::MacroStart;
                    } else {
                        if self.buf.is_empty() {
                            self.token_start = at;
                        }
                        self.buf.push(c);
                    }
                }
                State::MacroStart => {
                    if c == '(' {
                        self.state = State::MacroNameBracketed;
                    } else if c.is_alphabetic() {
                        self.buf.push(c);
                        self.state = State::MacroName;
                    } else {
                        return Err(self.error(
                            LexicalErrorKind::BadMacroStart(c),
                            at + c.len_utf8(),
                        ));
                    }
                }
                State::MacroName => {
                    if c.is_alphabetic() {
                        self.buf.push(c);
                    } else if c == '$' {
                        // adjacent references: `$first$second`
                        self.flush_macro(at)?;
                        self.token_start = at;
                        self.state = State::MacroStart;
                    } else {
                        self.flush_macro(at)?;
                        self.token_start = at;
                        self.buf.push(c);
                        self.state = State::Text;
                    }
                }
                State::MacroNameBracketed => {
                    if c == ')' {
                        self.flush_macro(at + 1)?;
                        self.state = State::Text;
                    } else {
                        self.buf.push(c);
                    }
                }
            }
        }

        match self.state {
            State::Text => self.flush_literal(self.text.len()),
            State::MacroStart => {
                // A `$` as the very last character is not a reference,
                // so end-of-pattern anchors like `Match$` pass through.
                self.buf.push('$');
                self.flush_literal(self.text.len());
            }
            State::MacroName => self.flush_macro(self.text.len())?,
            State::MacroNameBracketed => {
                return Err(self.error(
                    LexicalErrorKind::UnterminatedMacroReference,
                    self.text.len(),
                ));
            }
        }

        Ok(self.nodes)
    }

    fn flush_literal(&mut self, end: usize) {
        if self.buf.is_empty() {
            return;
        }
        let text = mem::replace(&mut self.buf, String::new());
        let span = self.span_to(end);
        self.nodes.push(Node::new(NodeKind::Literal(text), span));
    }

    fn flush_macro(&mut self, end: usize) -> Result<(), InternalError> {
        if self.buf.is_empty() {
            return Err(self.error(LexicalErrorKind::EmptyMacroName, end));
        }
        let name = mem::replace(&mut self.buf, String::new());
        if !name.chars().all(char::is_alphabetic) {
            return Err(
                self.error(LexicalErrorKind::InvalidMacroName { name }, end)
            );
        }
        let span = self.span_to(end);
        self.nodes.push(Node::new(NodeKind::Macro(name), span));
        Ok(())
    }

    fn span_to(&self, end: usize) -> Span {
        Span {
            start: self.base + self.token_start,
            end: self.base + end,
        }
    }

    fn error(&self, kind: LexicalErrorKind, end: usize) -> InternalError {
        InternalError::new(error::ErrorKind::LexicalError(kind), self.span_to(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<NodeKind> {
        tokenize(text, 0)
            .expect("the value to tokenize")
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    fn lex_err(text: &str) -> LexicalErrorKind {
        match tokenize(text, 0).expect_err("the value to be rejected").kind {
            error::ErrorKind::LexicalError(kind) => kind,
            kind => panic!("expected a lexical error, got {:?}", kind),
        }
    }

    fn lit(text: &str) -> NodeKind {
        NodeKind::Literal(String::from(text))
    }

    fn mac(name: &str) -> NodeKind {
        NodeKind::Macro(String::from(name))
    }

    #[test]
    fn plain_text_1() {
        assert_eq!(kinds("[a-z]+"), vec![lit("[a-z]+")]);
    }

    #[test]
    fn plain_text_empty() {
        assert_eq!(kinds(""), Vec::new());
    }

    #[test]
    fn reference_1() {
        assert_eq!(kinds("$foo"), vec![mac("foo")]);
    }

    #[test]
    fn reference_bracketed_1() {
        assert_eq!(kinds("$(foo)"), vec![mac("foo")]);
    }

    #[test]
    fn reference_bracketed_equals_unbracketed() {
        assert_eq!(kinds("$(foo)bar"), vec![mac("foo"), lit("bar")]);
        assert_eq!(kinds("$foo:bar"), vec![mac("foo"), lit(":bar")]);
    }

    #[test]
    fn reference_unicode_name_1() {
        assert_eq!(kinds("$naïve"), vec![mac("naïve")]);
    }

    #[test]
    fn adjacent_references_1() {
        assert_eq!(kinds("$first$second"), vec![mac("first"), mac("second")]);
    }

    #[test]
    fn reference_then_literal_1() {
        assert_eq!(
            kinds("$first###second"),
            vec![mac("first"), lit("###second")]
        );
    }

    #[test]
    fn mixed_1() {
        assert_eq!(
            kinds("^$(user)@$(domain)$"),
            vec![lit("^"), mac("user"), lit("@"), mac("domain"), lit("$")]
        );
    }

    #[test]
    fn trailing_dollar_1() {
        assert_eq!(kinds("Match$"), vec![lit("Match"), lit("$")]);
    }

    #[test]
    fn trailing_dollar_2() {
        assert_eq!(kinds("$"), vec![lit("$")]);
    }

    #[test]
    fn trailing_dollar_after_reference_1() {
        assert_eq!(kinds("$foo$"), vec![mac("foo"), lit("$")]);
    }

    #[test]
    fn spans_are_offset_by_base() {
        let nodes = tokenize("a$b", 10).unwrap();
        assert_eq!(nodes[0].span.start, 10);
        assert_eq!(nodes[0].span.end, 11);
        assert_eq!(nodes[1].span.start, 11);
        assert_eq!(nodes[1].span.end, 13);
    }

    #[test]
    fn bad_macro_start_1() {
        match lex_err("$1abc") {
            LexicalErrorKind::BadMacroStart('1') => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn bad_macro_start_double_dollar_1() {
        match lex_err("a$$b") {
            LexicalErrorKind::BadMacroStart('$') => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn empty_macro_name_1() {
        match lex_err("$()") {
            LexicalErrorKind::EmptyMacroName => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn invalid_macro_name_1() {
        match lex_err("$(foo1)") {
            LexicalErrorKind::InvalidMacroName { ref name } if name == "foo1" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn unterminated_reference_1() {
        match lex_err("$(foo") {
            LexicalErrorKind::UnterminatedMacroReference => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }
}
