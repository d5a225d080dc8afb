// Copyright 2018 the remacro authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{HashMap, HashSet};

use regex::Captures;

use crate::ast::{Node, NodeKind};
use crate::error::{ErrorKind, InternalError};

/// Prefix for the named capture groups generated at macro reference
/// sites. Keeps generated tags clear of any groups the template author
/// writes by hand.
pub const TAG_PREFIX: &str = "__tag_";

/// The named-group tags generated for each macro, in pattern order.
///
/// The regex engine refuses duplicate group names, so when the same
/// macro is referenced from more than one site the second and later
/// tags carry an occurrence suffix: `__tag_x`, `__tag_x_2`, ...
#[derive(Debug, Clone, Default)]
pub struct Tags {
    by_macro: HashMap<String, Vec<String>>,
}

impl Tags {
    /// Generate and record the tag for the next reference to `name`.
    fn assign(&mut self, name: &str) -> String {
        let tags = self.by_macro.entry(String::from(name)).or_insert_with(Vec::new);
        let tag = if tags.is_empty() {
            format!("{}{}", TAG_PREFIX, name)
        } else {
            format!("{}{}_{}", TAG_PREFIX, name, tags.len() + 1)
        };
        tags.push(tag.clone());
        tag
    }

    /// Resolve a macro name to the text it captured within one match.
    ///
    /// Returns `None` when the pattern contains no reference to
    /// `name`. When references exist but none of them participated in
    /// this match (an unmatched alternation branch, say), the field
    /// resolves to an empty value, which is a distinct outcome.
    pub fn lookup<'t>(
        &self,
        caps: &Captures<'t>,
        name: &str,
    ) -> Option<&'t str> {
        let tags = self.by_macro.get(name)?;
        for tag in tags {
            if let Some(m) = caps.name(tag) {
                return Some(m.as_str());
            }
        }
        Some("")
    }
}

/// Recursive depth-first pattern builder over the macro table.
pub struct Builder<'m> {
    macros: &'m HashMap<String, Vec<Node>>,
    with_groups: bool,
    tags: Tags,
}

impl<'m> Builder<'m> {
    pub fn new(
        macros: &'m HashMap<String, Vec<Node>>,
        with_groups: bool,
    ) -> Self {
        Builder {
            macros,
            with_groups,
            tags: Tags::default(),
        }
    }

    /// Resolve `root` all the way down to the final pattern string,
    /// failing on unknown or cyclic references.
    pub fn build(mut self, root: &str) -> Result<(String, Tags), InternalError> {
        let mut ancestry = HashSet::new();
        ancestry.insert(String::from(root));
        let pattern = self.resolve(root, &mut ancestry)?;
        Ok((pattern, self.tags))
    }

    fn resolve(
        &mut self,
        name: &str,
        ancestry: &mut HashSet<String>,
    ) -> Result<String, InternalError> {
        let macros = self.macros;
        // Only entered for names already checked against the table:
        // the root by construction, references right below.
        let nodes = &macros[name];

        let mut out = String::new();
        for node in nodes {
            match &node.kind {
                NodeKind::Literal(text) => out.push_str(text),
                NodeKind::Macro(target) => {
                    if ancestry.contains(target) {
                        return Err(InternalError::new(
                            ErrorKind::CircularReference {
                                name: target.clone(),
                            },
                            node.span.clone(),
                        ));
                    }
                    if !macros.contains_key(target) {
                        return Err(InternalError::new(
                            ErrorKind::UnknownMacro {
                                name: target.clone(),
                            },
                            node.span.clone(),
                        ));
                    }

                    // Assign the tag before recursing so tags appear
                    // in pattern order, outermost first.
                    let tag = if self.with_groups {
                        Some(self.tags.assign(target))
                    } else {
                        None
                    };

                    ancestry.insert(target.clone());
                    let inner = self.resolve(target, ancestry)?;
                    ancestry.remove(target);

                    match tag {
                        Some(tag) => {
                            out.push_str("(?P<");
                            out.push_str(&tag);
                            out.push('>');
                            out.push_str(&inner);
                            out.push(')');
                        }
                        None => out.push_str(&inner),
                    }
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn build(template: &str, with_groups: bool) -> Result<String, InternalError> {
        let parsed = parse::parse(template).expect("the template to parse");
        let (root, _) = parsed.root.expect("a root macro");
        Builder::new(&parsed.macros, with_groups)
            .build(&root)
            .map(|(pattern, _)| pattern)
    }

    #[test]
    fn passthrough_1() {
        assert_eq!(build("test: [a-z]+\n", false).unwrap(), "[a-z]+");
    }

    #[test]
    fn nested_resolution_1() {
        let pattern = build("test: $a!\na: x$b\nb: y\n", false).unwrap();
        assert_eq!(pattern, "xy!");
    }

    #[test]
    fn diamond_is_legal_1() {
        let pattern = build("test: $a$b\na: $c\nb: $c\nc: x\n", false).unwrap();
        assert_eq!(pattern, "xx");
    }

    #[test]
    fn groups_wrap_reference_sites_1() {
        let pattern = build("test: $a-$b\na: x\nb: y\n", true).unwrap();
        assert_eq!(pattern, "(?P<__tag_a>x)-(?P<__tag_b>y)");
    }

    #[test]
    fn groups_nest_1() {
        let pattern = build("test: $outer\nouter: a$inner z\ninner: b+\n", true)
            .unwrap();
        assert_eq!(pattern, "(?P<__tag_outer>a(?P<__tag_inner>b+) z)");
    }

    #[test]
    fn duplicate_tags_get_suffixes_1() {
        let pattern = build("test: $word-$word\nword: [a-z]+\n", true).unwrap();
        assert_eq!(pattern, "(?P<__tag_word>[a-z]+)-(?P<__tag_word_2>[a-z]+)");
    }

    #[test]
    fn self_cycle_1() {
        match build("test: $test\n", false).unwrap_err().kind {
            ErrorKind::CircularReference { ref name } if name == "test" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn transitive_cycle_1() {
        match build("a: $b\nb: $a\n", false).unwrap_err().kind {
            ErrorKind::CircularReference { ref name } if name == "a" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }

    #[test]
    fn unknown_reference_1() {
        match build("test: $nope\n", false).unwrap_err().kind {
            ErrorKind::UnknownMacro { ref name } if name == "nope" => {}
            kind => panic!("wrong error: {:?}", kind),
        }
    }
}
