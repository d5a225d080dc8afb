/*!
This crate provides a library for writing maintainable regular
expressions. When regex are small, their terse syntax is nice because
it allows you to say a lot with very little. As regex grow in size,
this terse syntax quickly becomes a liability, interfering with
maintainability. Remacro lets you factor a regex into named, reusable
macros, recombine them by reference, and keep example inputs right next
to the pattern so they double as regression tests.

A template is a small line-oriented program. Each `name: value` line
defines a macro; a macro's value is ordinary regex text which may
reference other macros with `$name` or `$(name)`. The first macro
defined is the root, and resolving it produces the final pattern.

# Example: an email matcher

```rust
use remacro::Remacro;

let email = Remacro::new(r"
email: ^$(user)@$(host)$
user: [a-zA-Z0-9._%+-]+
host: [a-zA-Z0-9.-]+\.[a-zA-Z]{2,}
").unwrap();

assert!(email.is_match("someone@example.com").unwrap());
assert!(!email.is_match("not an address").unwrap());
```

# Macro references

`$name` and `$(name)` are equivalent; the bracketed form exists so a
reference can butt up against text that would otherwise be read as part
of the name. Macro names may only contain letters. Two references can
sit right next to each other, and a reference followed by a `$` at the
very end of a line keeps its meaning as an end-of-pattern anchor:

```rust
use remacro::Remacro;

let path = Remacro::new(r"
path: $slash$word
slash: /
word: [a-z]+
").unwrap();

assert_eq!(path.regex_str(), "/[a-z]+");
```

A macro with no references passes its value through untouched:

```rust
use remacro::Remacro;

let tpl = Remacro::new("greeting: hello|hi").unwrap();
assert_eq!(tpl.regex_str(), "hello|hi");
```

Macros may reference macros defined later in the template; the whole
reference graph is checked when the template is constructed, so
unknown names and circular references fail up front rather than on
first use.

# Embedded tests

Templates carry their own examples. `$match` lines must match the
compiled pattern, `$nomatch` lines must not, and
[`Remacro::test`](struct.Remacro.html#method.test) replays all of them:

```rust
use remacro::Remacro;

let phone = Remacro::new(r"
phone: \b$(area)-$(line)\b
area: [0-9]{3}
line: [0-9]{4}
$match: call 555-0123 today
$nomatch: 55-0123
").unwrap();

assert!(phone.test().unwrap().passed());
```

A `$multimatch` block pins down every match the pattern should produce
over an input, in order, one per line, closed by `$end`:

```rust
use remacro::Remacro;

let words = Remacro::new(r"
word: [a-z]+
$multimatch: one two three
one
two
three
$end
").unwrap();

assert!(words.test().unwrap().passed());
```

`$field.<name>: <input> $= <expected>` asserts on the text captured by
one macro (see the next section), and `$field[<n>].<name>` does the
same against the `n`th match of the input instead of the first.

# Capture groups and fields

Compiling with [`Remacro::with_groups`](struct.Remacro.html#method.with_groups)
wraps every macro reference site in a named capture group, so a match
can be taken apart field by field:

```rust
use remacro::Remacro;

let kv = Remacro::with_groups(r"
pair: $(key)=$(value)
key: [a-z]+
value: [0-9]+
").unwrap();

let m = kv.find("retries=3").unwrap().unwrap();
assert_eq!(m.field("key"), Some("retries"));
assert_eq!(m.field("value"), Some("3"));
assert_eq!(m.field("nope"), None);
```

# Configuring the engine

The compiled engine comes from the [`regex`] crate, which is
re-exported at the crate root. To run the embedded tests against an
engine with non-default options, build it from
[`regex_str`](struct.Remacro.html#method.regex_str) and hand it to
[`test_with`](struct.Remacro.html#method.test_with):

```rust
use remacro::Remacro;
use remacro::regex::RegexBuilder;

let tpl = Remacro::new(r"
greeting: ^hello$
$match: HELLO
").unwrap();

assert!(!tpl.test().unwrap().passed());

let re = RegexBuilder::new(&tpl.regex_str())
    .case_insensitive(true)
    .build()
    .unwrap();
assert!(tpl.test_with(&re).passed());
```

# Comments

Blank lines are skipped, and so is any line whose first non-whitespace
characters are `//`.

# Error messages

Template errors implement a `Debug` instance written with the
expectation that the most common way to use remacro is
`Remacro::new(...).unwrap()`, so the messages show up nicely formatted
in the middle of rustc's panic output:

```rust,should_panic
use remacro::Remacro;
let _tpl = Remacro::new("test: $(unclosed").unwrap();
```

fails with

```text
remacro parse error:
    at line 1, col 7:
    0001 > test: $(unclosed
                 ^^^^^^^^^^
remacro lexical error:
Unterminated macro reference: missing ')'.
```
*/

mod ast;
mod error;
mod exec;
mod lex;
mod matches;
mod parse;
mod selftest;

pub use regex;

pub use crate::exec::TAG_PREFIX;
pub use crate::matches::Match;
pub use crate::selftest::{FieldCase, FieldCheck, MultiMatchCase, TestReport};

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::ast::{Node, Span};
use crate::error::{ErrorKind, InternalError};

/// A compiled macro template: the macro table, the embedded test
/// suite, and a lazily compiled regex engine.
#[derive(Clone)]
pub struct Remacro {
    macros: HashMap<String, Vec<Node>>,
    root: String,
    root_span: Span,
    suite: selftest::TestSuite,
    with_groups: bool,
    tags: exec::Tags,
    /// The template source, kept around to interpret spans when an
    /// error must be rendered after construction.
    src: String,
    /// Compiled-engine slot, written at most once.
    compiled: OnceLock<regex::Regex>,
}

impl Remacro {
    /// Parse a template, with capture groups disabled.
    ///
    /// The string is split on line breaks (`\n` or `\r\n`). Unknown
    /// and circular macro references are rejected here, not on first
    /// use.
    ///
    /// # Errors:
    ///
    /// A malformed template results in
    /// [`Error::ParseError`](enum.Error.html).
    pub fn new(template: &str) -> Result<Remacro, Error> {
        Self::parse_src(String::from(template), false)
    }

    /// Parse a template and wrap every macro reference site in a
    /// named capture group, enabling
    /// [`Match::field`](struct.Match.html#method.field) lookups and
    /// `$field` tests.
    pub fn with_groups(template: &str) -> Result<Remacro, Error> {
        Self::parse_src(String::from(template), true)
    }

    /// Parse a template supplied as a sequence of lines.
    pub fn from_lines<I, S>(lines: I, with_groups: bool) -> Result<Remacro, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut src = String::new();
        for (i, line) in lines.into_iter().enumerate() {
            if i > 0 {
                src.push('\n');
            }
            src.push_str(line.as_ref());
        }
        Self::parse_src(src, with_groups)
    }

    fn parse_src(src: String, with_groups: bool) -> Result<Remacro, Error> {
        let parsed = match parse::parse(&src) {
            Ok(parsed) => parsed,
            Err(err) => return Err(Error::parse(&err, &src)),
        };

        let (root, root_span) = match parsed.root {
            Some(root) => root,
            None => {
                return Err(Error::ParseError(String::from(
                    "the template defines no macros",
                )))
            }
        };

        // Build eagerly so unresolved and circular references surface
        // at construction.
        let tags = match exec::Builder::new(&parsed.macros, with_groups)
            .build(&root)
        {
            Ok((_, tags)) => tags,
            Err(err) => return Err(Error::parse(&err, &src)),
        };

        Ok(Remacro {
            macros: parsed.macros,
            root,
            root_span,
            suite: parsed.suite,
            with_groups,
            tags,
            src,
            compiled: OnceLock::new(),
        })
    }

    /// The pattern string the template compiles to.
    ///
    /// Reconstructed from the macro table on every call; the result is
    /// identical each time.
    pub fn regex_str(&self) -> String {
        match exec::Builder::new(&self.macros, self.with_groups)
            .build(&self.root)
        {
            Ok((pattern, _)) => pattern,
            // the reference graph was validated at construction
            Err(_) => panic!("Bug in remacro."),
        }
    }

    /// The compiled engine for this template, built on first use and
    /// cached.
    ///
    /// # Errors:
    ///
    /// The template language passes macro values through to the final
    /// pattern verbatim, so this is the point where a value that is
    /// not valid regex surfaces, as
    /// [`Error::RuntimeError`](enum.Error.html).
    pub fn regex(&self) -> Result<&regex::Regex, Error> {
        if let Some(re) = self.compiled.get() {
            return Ok(re);
        }

        let pattern = self.regex_str();
        if let Err(err) = regex_syntax::ast::parse::Parser::new().parse(&pattern)
        {
            let internal = InternalError::new(
                ErrorKind::RegexError {
                    re: pattern,
                    err: err.to_string(),
                },
                self.root_span.clone(),
            );
            return Err(Error::RuntimeError(format!(
                "{}",
                internal.overlay(&self.src)
            )));
        }

        let re = match regex::Regex::new(&pattern) {
            Ok(re) => re,
            Err(err) => {
                return Err(Error::RuntimeError(format!("{}", err)))
            }
        };

        // A concurrent caller may have won the race; both compiled the
        // same pattern, so either value serves.
        Ok(self.compiled.get_or_init(|| re))
    }

    /// True if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> Result<bool, Error> {
        Ok(self.regex()?.is_match(text))
    }

    /// The leftmost match of the pattern in `text`, if any.
    pub fn find<'t>(&self, text: &'t str) -> Result<Option<Match<'t, '_>>, Error> {
        let re = self.regex()?;
        Ok(re.captures(text).map(|caps| Match::new(caps, &self.tags)))
    }

    /// Every non-overlapping match of the pattern in `text`, in order.
    pub fn find_all<'t>(&self, text: &'t str) -> Result<Vec<Match<'t, '_>>, Error> {
        let re = self.regex()?;
        Ok(re
            .captures_iter(text)
            .map(|caps| Match::new(caps, &self.tags))
            .collect())
    }

    /// Run every example stored in the template against the compiled
    /// pattern.
    ///
    /// Test-content failures are reported in the returned
    /// [`TestReport`](struct.TestReport.html), never as an `Err`.
    pub fn test(&self) -> Result<TestReport, Error> {
        Ok(self.test_with(self.regex()?))
    }

    /// Run the embedded tests against an externally configured engine,
    /// e.g. one built with `regex::RegexBuilder` for case folding or
    /// size limits. The engine must have been compiled from
    /// [`regex_str`](#method.regex_str) for field lookups to resolve.
    pub fn test_with(&self, re: &regex::Regex) -> TestReport {
        selftest::evaluate(&self.suite, re, &self.tags, self.with_groups)
    }

    /// The `$match` examples, in template order.
    pub fn pass_tests(&self) -> &[String] {
        &self.suite.pass_tests
    }

    /// The `$nomatch` examples, in template order.
    pub fn fail_tests(&self) -> &[String] {
        &self.suite.fail_tests
    }

    /// The `$multimatch` examples, keyed by input string.
    pub fn multi_match_tests(&self) -> &[MultiMatchCase] {
        &self.suite.multi_matches
    }

    /// The `$field` examples, grouped by input string and match index.
    pub fn field_tests(&self) -> &[FieldCase] {
        &self.suite.field_cases
    }
}

/// A remacro error with a descriptive human-readable message explaining
/// what went wrong.
#[derive(Clone)]
pub enum Error {
    /// A parse error occurred.
    ParseError(String),

    /// A runtime error occurred.
    RuntimeError(String),
}

impl Error {
    fn parse(err: &InternalError, src: &str) -> Error {
        Error::ParseError(format!("{}", err.overlay(src)))
    }
}

impl failure::Fail for Error {}

// The debug formatter already provides a user-facing error so
// that .unwrap() will result in quick feedback.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use crate::Error::*;

        match self {
            ParseError(err) => {
                writeln!(f, "\nremacro parse error:")?;
                writeln!(f, "{}", err)?;
            }

            RuntimeError(err) => {
                writeln!(f, "\nremacro evaluation error:")?;
                writeln!(f, "{}", err)?;
            }
        }

        Ok(())
    }
}
