use std::fmt;

use regex::Captures;

use crate::exec::Tags;

/// A single successful match of a compiled template, with access to
/// the text captured at each macro reference site.
///
/// Produced by [`Remacro::find`](crate::Remacro::find) and
/// [`Remacro::find_all`](crate::Remacro::find_all).
pub struct Match<'t, 'r> {
    caps: Captures<'t>,
    tags: &'r Tags,
}

impl<'t, 'r> Match<'t, 'r> {
    pub(crate) fn new(caps: Captures<'t>, tags: &'r Tags) -> Self {
        Match { caps, tags }
    }

    /// The text matched by the whole pattern.
    pub fn as_str(&self) -> &'t str {
        // group 0 always participates in a match
        self.caps.get(0).unwrap().as_str()
    }

    /// Byte offset where the whole match starts.
    pub fn start(&self) -> usize {
        self.caps.get(0).unwrap().start()
    }

    /// Byte offset where the whole match ends.
    pub fn end(&self) -> usize {
        self.caps.get(0).unwrap().end()
    }

    /// Look up the text captured for the macro `name`.
    ///
    /// Returns `None` when the pattern has no capture group for
    /// `name` — an unknown macro, or a template compiled without
    /// groups. A reference that exists but captured nothing yields
    /// `Some("")`, which is a distinct outcome. When a macro is
    /// referenced from several sites, the first site that participated
    /// in this match wins.
    pub fn field(&self, name: &str) -> Option<&'t str> {
        self.tags.lookup(&self.caps, name)
    }
}

impl<'t, 'r> fmt::Debug for Match<'t, 'r> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Match").field("text", &self.as_str()).finish()
    }
}
