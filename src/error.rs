// Copyright 2018 the remacro authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::num::ParseIntError;

use crate::ast::Span;
use crate::lex;

/// A structured remacro error.
///
/// This error type is never exposed to the user. We go to all this
/// trouble anyway in order to be able to provide nice formatted error
/// messages in the user facing error type.
///
/// We use the same type for template parse errors and for build/compile
/// errors so that the formatting code can be shared. If this type was
/// exposed to the user, we would probably want to split that up, but
/// we don't care about reporting.
#[derive(Debug)]
pub struct InternalError {
    pub kind: ErrorKind,
    pub span: Span,
}

impl InternalError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn overlay<'a, 'e>(&'e self, src: &'a str) -> ErrorSrcOverlay<'a, 'e> {
        ErrorSrcOverlay { src, err: self }
    }
}

// An InternalError must always be rendered against the template source
// via `overlay` before it reaches a user.
impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            r#"Bug in remacro. Internal errors should never be directly formatted.
               Please report this.
            "#
        )?;
        Ok(())
    }
}

pub struct ErrorSrcOverlay<'a, 'e> {
    src: &'a str,
    err: &'e InternalError,
}

impl<'a, 'e> fmt::Display for ErrorSrcOverlay<'a, 'e> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use crate::error::ErrorKind::*;

        write!(
            f,
            "{}",
            block_leftpad(
                &PosSpan::new(self.src, &self.err.span).highlight(self.src),
                4
            )
        )?;

        match &self.err.kind {
            LexicalError(kind) => {
                writeln!(f, "remacro lexical error:")?;
                writeln!(f, "{}", kind)?;
            }
            MissingColon => {
                writeln!(f, "Expected ':' after a directive or macro name.")?;
            }
            DuplicateMacro { name } => {
                writeln!(f, "Macro '{}' is defined twice.", name)?;
            }
            UnknownDirective { name } => {
                writeln!(f, "Unknown directive '{}'.", name)?;
            }
            MissingFieldName => {
                writeln!(f, "Expected a field name after '.'.")?;
            }
            MissingFieldSeparator => {
                writeln!(
                    f,
                    "Expected exactly one '$=' between the test input \
                     and the expected value."
                )?;
            }
            UnclosedFieldIndex => {
                writeln!(f, "Expected ']' to close the match index.")?;
            }
            BadFieldIndex { index, err } => {
                writeln!(
                    f,
                    "Error parsing '{}' as a match index: {}.",
                    index, err
                )?;
            }
            MissingDotAfterIndex => {
                writeln!(f, "Expected '.' after the match index.")?;
            }
            UnterminatedMultiMatch => {
                writeln!(f, "Unterminated multimatch block: missing '$end'.")?;
            }
            UnknownMacro { name } => {
                writeln!(f, "NameError: unknown macro '{}'.", name)?;
            }
            CircularReference { name } => {
                writeln!(f, "Circular reference detected for '{}'.", name)?;
            }
            RegexError { re, err } => {
                writeln!(f, "Error parsing the generated regex: /{}/", re)?;
                write!(f, "{}", block_leftpad(err, 4))?;
            }
        }

        Ok(())
    }
}

impl<'a, 'e> fmt::Debug for ErrorSrcOverlay<'a, 'e> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self)?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    //
    // Tokenizer errors, wrapped so they can be highlighted in the
    // source nicely.
    //
    LexicalError(lex::LexicalErrorKind),

    //
    // Directive parse errors.
    //
    MissingColon,
    DuplicateMacro { name: String },
    UnknownDirective { name: String },
    MissingFieldName,
    MissingFieldSeparator,
    UnclosedFieldIndex,
    BadFieldIndex { index: String, err: ParseIntError },
    MissingDotAfterIndex,
    UnterminatedMultiMatch,

    //
    // Build errors.
    //
    UnknownMacro { name: String },
    CircularReference { name: String },

    //
    // A composed pattern the regex engine refuses.
    //
    RegexError { re: String, err: String },
}

#[derive(Debug)]
struct PosSpan {
    /// 1-indexed starting line number
    start_line: usize,
    /// 1-indexed starting col number
    start_col: usize,
    /// 1-indexed ending line number
    end_line: usize,
    /// 1-indexed ending col number
    end_col: usize,
}

impl PosSpan {
    /// Construct a positional span from a span and the source.
    ///
    /// We take a complexity and speed hit here in order to make
    /// thinking about spans easier for anyone who wants to construct
    /// an error. Templates are small, so the perf hit is not bad, and
    /// it is much easier to think about spans in terms of byte offsets
    /// everywhere else.
    fn new(src: &str, span: &Span) -> Self {
        debug_assert!(span.start < src.len());
        debug_assert!(span.end <= src.len());
        debug_assert!(span.start != span.end);

        let mut line = 1;
        let mut col = 1;

        let mut ps = PosSpan {
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
        };

        for (idx, c) in src.char_indices() {
            if idx == span.start {
                ps.start_line = line;
                ps.start_col = col;
            } else if idx == span.end {
                ps.end_line = line;
                ps.end_col = col;
            }

            if c == '\n' {
                line += 1;
                col = 0;
            }
            col += 1;
        }
        if ps.end_line == 0 {
            ps.end_line = line;
            ps.end_col = col;
        }

        debug_assert!(ps.start_line != 0);
        debug_assert!(ps.start_col != 0);
        debug_assert!(ps.end_line != 0);
        debug_assert!(ps.end_col != 0);
        ps
    }

    /// Return a string highlighting the given positional span.
    fn highlight(&self, src: &str) -> String {
        let mut s =
            format!("at line {}, col {}:\n", self.start_line, self.start_col);

        for (i, line) in src.split('\n').enumerate() {
            let line_no = i + 1;

            // Print two lines of context
            if line_no > self.start_line.saturating_sub(Self::CONTEXT_LINES)
                && line_no < self.start_line.saturating_add(Self::CONTEXT_LINES)
            {
                s.push_str(&format!("{:04} > ", line_no));
                s.push_str(line.trim_end_matches('\r'));
                s.push('\n');
            }

            // Print uppercut chars indicating the section that
            // caused the error.
            if line_no == self.start_line {
                let end_col = if self.end_line == self.start_line {
                    self.end_col
                } else {
                    // the span runs to the end of this line
                    line.trim_end_matches('\r').chars().count() + 1
                };

                s.push_str("       "); // to match the start line indicator
                for i in 0..end_col.saturating_sub(1) {
                    let col_no = i + 1;

                    if col_no < self.start_col {
                        s.push(' ');
                    } else {
                        s.push('^');
                    }
                }
                s.push('\n');
            }
        }

        s
    }

    const CONTEXT_LINES: usize = 2;
}

//////////////////////////////////////////////////////////////////////////
//                                                                      //
//                             String Utils                             //
//                                                                      //
//////////////////////////////////////////////////////////////////////////

fn block_leftpad(block: &str, pad: usize) -> String {
    // Guess that most blocks are going to have columns of 100
    // chars or less.
    let mut s =
        String::with_capacity(block.len() + (pad * (block.len() / 100)));

    let mut pad_str = String::with_capacity(pad);
    for _ in 0..pad {
        pad_str.push(' ');
    }

    for line in block.split('\n') {
        if line.is_empty() {
            continue;
        }

        s.push_str(&pad_str);
        s.push_str(line);
        s.push('\n');
    }

    s
}
