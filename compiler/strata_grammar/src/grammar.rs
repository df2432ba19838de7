//! Grammar representation and Lark-style rendering.

use std::fmt::{self, Write as _};

use rustc_hash::FxHashMap;

/// A terminal: an exact token or a regex the whole token must match.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminal {
    Literal(String),
    Regex(String),
}

/// Right-hand-side symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(Terminal),
    /// Reference to a rule by name.
    Rule(String),
    /// Placeholder filled during compilation. Only valid in templates.
    Hole(String),
}

impl Symbol {
    pub fn lit(text: impl Into<String>) -> Self {
        Symbol::Terminal(Terminal::Literal(text.into()))
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Symbol::Terminal(Terminal::Regex(pattern.into()))
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Symbol::Rule(name.into())
    }

    pub fn hole(name: impl Into<String>) -> Self {
        Symbol::Hole(name.into())
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

/// A named production with one or more alternatives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    pub name: String,
    pub alternatives: Vec<Vec<Symbol>>,
}

impl Rule {
    pub fn new(name: impl Into<String>, alternatives: Vec<Vec<Symbol>>) -> Self {
        Rule {
            name: name.into(),
            alternatives,
        }
    }

    /// Rule names referenced by any alternative, in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.alternatives.iter().flatten().filter_map(|sym| match sym {
            Symbol::Rule(name) => Some(name.as_str()),
            Symbol::Terminal(_) | Symbol::Hole(_) => None,
        })
    }
}

/// A verified context-free grammar.
///
/// Rules are kept in emission order; that order is part of the output and
/// is deterministic for a given compile input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grammar {
    start: String,
    rules: Vec<Rule>,
    ignore: Vec<String>,
}

impl Grammar {
    /// Build and verify a grammar.
    ///
    /// Unreachable rules are dropped; reachable rules must be defined,
    /// hole-free and productive.
    pub fn new(
        start: impl Into<String>,
        rules: Vec<Rule>,
        ignore: Vec<String>,
    ) -> Result<Self, crate::InvalidGrammar> {
        let grammar = Grammar {
            start: start.into(),
            rules,
            ignore,
        };
        crate::check::verify(grammar)
    }

    /// Assemble without verification. Callers must run the check pass.
    pub(crate) fn from_parts(start: String, rules: Vec<Rule>, ignore: Vec<String>) -> Self {
        Grammar {
            start,
            rules,
            ignore,
        }
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Rule>, Vec<String>) {
        (self.start, self.rules, self.ignore)
    }

    #[inline]
    pub fn start(&self) -> &str {
        &self.start
    }

    #[inline]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// `%ignore` regexes.
    #[inline]
    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Name to position in [`rules`](Self::rules).
    pub(crate) fn index(&self) -> FxHashMap<&str, usize> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), i))
            .collect()
    }

    /// Render in the Lark dialect.
    ///
    /// ```text
    /// start: "return" hole_expr ";"
    /// hole_expr: "user" "." "id" | "user" "." "name"
    /// %ignore /[ \t\r\n]+/
    /// ```
    pub fn to_lark(&self) -> String {
        let mut out = String::new();
        self.write_lark(&mut out);
        out
    }

    fn write_lark(&self, out: &mut String) {
        for rule in &self.rules {
            out.push_str(&rule.name);
            out.push(':');
            for (i, alt) in rule.alternatives.iter().enumerate() {
                if i > 0 {
                    out.push_str(" |");
                }
                for sym in alt {
                    out.push(' ');
                    write_symbol(out, sym);
                }
            }
            out.push('\n');
        }
        for pattern in &self.ignore {
            let _ = writeln!(out, "%ignore /{}/", escape_regex(pattern));
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lark())
    }
}

fn write_symbol(out: &mut String, sym: &Symbol) {
    match sym {
        Symbol::Terminal(Terminal::Literal(text)) => {
            out.push('"');
            for c in text.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    _ => out.push(c),
                }
            }
            out.push('"');
        }
        Symbol::Terminal(Terminal::Regex(pattern)) => {
            out.push('/');
            out.push_str(&escape_regex(pattern));
            out.push('/');
        }
        Symbol::Rule(name) => out.push_str(name),
        // Verified grammars never contain holes; templates render them so
        // they can be inspected.
        Symbol::Hole(name) => {
            out.push('<');
            out.push_str(name);
            out.push('>');
        }
    }
}

fn escape_regex(pattern: &str) -> String {
    pattern.replace('/', "\\/")
}
