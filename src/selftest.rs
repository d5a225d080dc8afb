// Copyright 2018 the remacro authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use regex::Regex;

use crate::exec::Tags;

/// One `$multimatch` expectation: an input string and the matches the
/// pattern is expected to produce over it, in order.
#[derive(Debug, Clone)]
pub struct MultiMatchCase {
    pub(crate) input: String,
    pub(crate) expected: Vec<String>,
}

impl MultiMatchCase {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn expected(&self) -> &[String] {
        &self.expected
    }
}

/// A single `$field` assertion: a field name and its expected value.
#[derive(Debug, Clone)]
pub struct FieldCheck {
    pub(crate) field: String,
    pub(crate) expected: String,
}

impl FieldCheck {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }
}

/// All the field assertions registered against one (input string,
/// match index) pair.
#[derive(Debug, Clone)]
pub struct FieldCase {
    pub(crate) input: String,
    pub(crate) match_index: usize,
    pub(crate) checks: Vec<FieldCheck>,
}

impl FieldCase {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn match_index(&self) -> usize {
        self.match_index
    }

    pub fn checks(&self) -> &[FieldCheck] {
        &self.checks
    }
}

/// The four test stores a template carries.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestSuite {
    pub(crate) pass_tests: Vec<String>,
    pub(crate) fail_tests: Vec<String>,
    pub(crate) multi_matches: Vec<MultiMatchCase>,
    pub(crate) field_cases: Vec<FieldCase>,
}

impl TestSuite {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a `$multimatch` block. A repeated input string extends
    /// the existing expectation list rather than being rejected.
    pub(crate) fn add_multi_match(&mut self, input: &str, expected: Vec<String>) {
        match self.multi_matches.iter_mut().find(|c| c.input == input) {
            Some(case) => case.expected.extend(expected),
            None => self.multi_matches.push(MultiMatchCase {
                input: String::from(input),
                expected,
            }),
        }
    }

    /// Register a `$field` assertion, grouping by input string and
    /// match index.
    pub(crate) fn add_field_check(
        &mut self,
        input: &str,
        match_index: usize,
        check: FieldCheck,
    ) {
        let existing = self
            .field_cases
            .iter_mut()
            .find(|c| c.input == input && c.match_index == match_index);
        match existing {
            Some(case) => case.checks.push(check),
            None => self.field_cases.push(FieldCase {
                input: String::from(input),
                match_index,
                checks: vec![check],
            }),
        }
    }
}

/// The outcome of running a template's embedded tests.
#[derive(Debug, Clone)]
pub struct TestReport {
    failures: Vec<String>,
}

impl TestReport {
    /// True when every stored example held.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// One human-readable line per discrepancy, in evaluation order.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failures
    }
}

/// Run every stored example against `re`.
///
/// Test-content failures never abort evaluation; each discrepancy
/// becomes one diagnostic line and the report fails as a whole.
pub(crate) fn evaluate(
    suite: &TestSuite,
    re: &Regex,
    tags: &Tags,
    with_groups: bool,
) -> TestReport {
    let mut failures = Vec::new();

    for test in &suite.pass_tests {
        if !re.is_match(test) {
            failures.push(format!("Expected pass: {}", test));
        }
    }

    for test in &suite.fail_tests {
        if re.is_match(test) {
            failures.push(format!("Expected fail: {}", test));
        }
    }

    if !suite.field_cases.is_empty() && !with_groups {
        failures.push(String::from(
            "Field tests require capture groups: \
             compile the template with groups enabled",
        ));
    } else {
        for case in &suite.field_cases {
            let matches: Vec<_> = re.captures_iter(&case.input).collect();
            if matches.len() <= case.match_index {
                failures.push(format!(
                    "Expected a match at index {} of '{}' \
                     but found only {} match(es)",
                    case.match_index,
                    case.input,
                    matches.len()
                ));
                continue;
            }
            let caps = &matches[case.match_index];
            for check in &case.checks {
                match tags.lookup(caps, &check.field) {
                    None => {
                        failures.push(format!("Unknown field {}", check.field))
                    }
                    Some(actual) => {
                        if actual != check.expected {
                            failures.push(format!(
                                "Expected '{}' for field {} (match {}) \
                                 of '{}' but got '{}'",
                                check.expected,
                                check.field,
                                case.match_index,
                                case.input,
                                actual
                            ));
                        }
                    }
                }
            }
        }
    }

    for case in &suite.multi_matches {
        let found: Vec<&str> =
            re.find_iter(&case.input).map(|m| m.as_str()).collect();
        if found.len() != case.expected.len() {
            failures.push(format!(
                "Expected {} matches for '{}' but got {}: {:?}",
                case.expected.len(),
                case.input,
                found.len(),
                found
            ));
        } else {
            for (i, expected) in case.expected.iter().enumerate() {
                if expected.as_str() != found[i] {
                    failures.push(format!(
                        "Expected '{}' at match {} of '{}' but got '{}'",
                        expected, i, case.input, found[i]
                    ));
                }
            }
        }
    }

    TestReport { failures }
}
