//! Named rewrite rules and the runner that applies them in order.
//!
//! A [`Pipeline`] is an ordered list of [`RewriteRule`]s. Order carries
//! meaning: later rules assume the simplifications made by earlier ones. Each
//! rule can be looked up by name and applied on its own.

use std::{borrow::Cow, fmt};

use regex::{Captures, Regex};

/// What a rule does to its input.
enum Rewrite {
    /// Replace every match with a template; `$1`, `$name` and friends expand to
    /// capture groups.
    Template(Regex, &'static str),
    /// Replace every match with the result of a function of its captures.
    With(Regex, fn(&Captures<'_>) -> String),
    /// Replace every occurrence of a literal string.
    Literal(&'static str, &'static str),
    /// Arbitrary whole-text pass for rewrites that are not pattern based.
    Pass(fn(&str) -> Cow<'_, str>),
}

/// A single named step of a [`Pipeline`].
pub struct RewriteRule {
    name: &'static str,
    rewrite: Rewrite,
}

impl RewriteRule {
    /// Build a rule that replaces matches of `pattern` with `template`.
    ///
    /// # Panics
    /// Panics if `pattern` is not a valid regular expression.
    #[must_use]
    pub fn template(name: &'static str, pattern: &str, template: &'static str) -> Self {
        Self {
            name,
            rewrite: Rewrite::Template(compile(name, pattern), template),
        }
    }

    /// Build a rule that replaces matches of `pattern` with `f(captures)`.
    ///
    /// # Panics
    /// Panics if `pattern` is not a valid regular expression.
    #[must_use]
    pub fn with(name: &'static str, pattern: &str, f: fn(&Captures<'_>) -> String) -> Self {
        Self {
            name,
            rewrite: Rewrite::With(compile(name, pattern), f),
        }
    }

    /// Build a rule that deletes every match of `pattern`.
    ///
    /// # Panics
    /// Panics if `pattern` is not a valid regular expression.
    #[must_use]
    pub fn delete(name: &'static str, pattern: &str) -> Self {
        Self::template(name, pattern, "")
    }

    /// Build a rule that replaces every occurrence of `from` with `to`.
    #[must_use]
    pub fn literal(name: &'static str, from: &'static str, to: &'static str) -> Self {
        Self {
            name,
            rewrite: Rewrite::Literal(from, to),
        }
    }

    /// Build a rule from an arbitrary text transformation.
    #[must_use]
    pub fn pass(name: &'static str, f: fn(&str) -> Cow<'_, str>) -> Self {
        Self {
            name,
            rewrite: Rewrite::Pass(f),
        }
    }

    /// The rule's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply this rule alone.
    ///
    /// Text the rule does not touch is returned borrowed.
    #[must_use]
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.rewrite {
            Rewrite::Template(re, template) => re.replace_all(text, *template),
            Rewrite::With(re, f) => re.replace_all(text, |caps: &Captures<'_>| f(caps)),
            Rewrite::Literal(from, to) => {
                if from.is_empty() || !text.contains(*from) {
                    Cow::Borrowed(text)
                } else {
                    Cow::Owned(text.replace(*from, to))
                }
            }
            Rewrite::Pass(f) => f(text),
        }
    }
}

impl fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.rewrite {
            Rewrite::Template(re, _) | Rewrite::With(re, _) => re.as_str(),
            Rewrite::Literal(from, _) => *from,
            Rewrite::Pass(_) => "<pass>",
        };
        f.debug_struct("RewriteRule")
            .field("name", &self.name)
            .field("rewrite", &kind)
            .finish()
    }
}

fn compile(name: &str, pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("rule `{name}` has an invalid pattern: {e}"))
}

/// An ordered list of rewrite rules.
#[derive(Debug)]
pub struct Pipeline {
    rules: Vec<RewriteRule>,
}

impl Pipeline {
    /// Build a pipeline that applies `rules` in the given order.
    #[must_use]
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Run every rule over `text`, feeding each rule the previous output.
    #[must_use]
    pub fn run(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            let changed = match rule.apply(&current) {
                Cow::Borrowed(_) => None,
                Cow::Owned(next) => Some(next),
            };
            if let Some(next) = changed {
                current = next;
            }
        }
        current
    }

    /// Rules in execution order.
    #[must_use]
    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Find a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&RewriteRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Position of the named rule in execution order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name == name)
    }
}
