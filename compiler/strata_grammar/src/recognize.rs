//! Earley recognition over terminal token sequences.
//!
//! Tokens are whole terminals: a literal terminal matches a token equal to
//! it, a regex terminal matches a token the regex matches in full. The
//! recognizer answers whether a sequence is a sentence, a viable prefix of
//! one, or neither. It does not build parse trees.

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::{Grammar, Symbol, Terminal};

/// Outcome of recognizing a token sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Recognition {
    /// The tokens form a complete sentence.
    Complete,
    /// The tokens can be extended to a sentence.
    Prefix,
    /// Token `at` cannot continue any derivation.
    Rejected { at: usize },
}

#[derive(Copy, Clone, Debug)]
enum Sym<'g> {
    Literal(&'g str),
    Regex(usize),
    Rule(usize),
    /// Unresolvable reference; verified grammars never produce one.
    Dead,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct Item {
    rule: usize,
    alt: usize,
    dot: usize,
    origin: usize,
}

/// Recognizer prepared for one grammar.
pub struct Recognizer<'g> {
    rules: Vec<Vec<Vec<Sym<'g>>>>,
    regexes: Vec<Regex>,
    nullable: Vec<bool>,
    start: Option<usize>,
}

impl<'g> Recognizer<'g> {
    /// Resolve rule references and compile regex terminals.
    pub fn new(grammar: &'g Grammar) -> Result<Self, regex::Error> {
        let index = grammar.index();
        let mut regexes = Vec::new();
        let mut rules = Vec::with_capacity(grammar.rules().len());

        for rule in grammar.rules() {
            let mut alts = Vec::with_capacity(rule.alternatives.len());
            for alt in &rule.alternatives {
                let mut syms = Vec::with_capacity(alt.len());
                for sym in alt {
                    syms.push(match sym {
                        Symbol::Terminal(Terminal::Literal(text)) => Sym::Literal(text.as_str()),
                        Symbol::Terminal(Terminal::Regex(pattern)) => {
                            regexes.push(Regex::new(&format!("^(?:{pattern})$"))?);
                            Sym::Regex(regexes.len() - 1)
                        }
                        Symbol::Rule(name) => index
                            .get(name.as_str())
                            .map_or(Sym::Dead, |&i| Sym::Rule(i)),
                        Symbol::Hole(_) => Sym::Dead,
                    });
                }
                alts.push(syms);
            }
            rules.push(alts);
        }

        let nullable = nullable(&rules);
        Ok(Recognizer {
            start: index.get(grammar.start()).copied(),
            rules,
            regexes,
            nullable,
        })
    }

    /// Recognize `tokens`.
    pub fn recognize<S: AsRef<str>>(&self, tokens: &[S]) -> Recognition {
        let Some(start) = self.start else {
            return Recognition::Rejected { at: 0 };
        };

        let n = tokens.len();
        let mut sets: Vec<Chart> = (0..=n).map(|_| Chart::default()).collect();
        for alt in 0..self.rules[start].len() {
            sets[0].add(Item {
                rule: start,
                alt,
                dot: 0,
                origin: 0,
            });
        }

        for i in 0..=n {
            if sets[i].items.is_empty() {
                return Recognition::Rejected { at: i.saturating_sub(1) };
            }

            let mut j = 0;
            while j < sets[i].items.len() {
                let item = sets[i].items[j];
                j += 1;

                match self.next(item) {
                    None => {
                        let waiting: Vec<Item> = sets[item.origin]
                            .items
                            .iter()
                            .filter(|w| {
                                matches!(self.next(**w), Some(Sym::Rule(r)) if r == item.rule)
                            })
                            .copied()
                            .collect();
                        for w in waiting {
                            sets[i].add(Item { dot: w.dot + 1, ..w });
                        }
                    }
                    Some(Sym::Rule(rule)) => {
                        for alt in 0..self.rules[rule].len() {
                            sets[i].add(Item {
                                rule,
                                alt,
                                dot: 0,
                                origin: i,
                            });
                        }
                        if self.nullable[rule] {
                            sets[i].add(Item {
                                dot: item.dot + 1,
                                ..item
                            });
                        }
                    }
                    Some(sym) => {
                        if i < n && self.matches(sym, tokens[i].as_ref()) {
                            sets[i + 1].add(Item {
                                dot: item.dot + 1,
                                ..item
                            });
                        }
                    }
                }
            }
        }

        let complete = sets[n].items.iter().any(|item| {
            item.rule == start && item.origin == 0 && self.next(*item).is_none()
        });
        if complete {
            Recognition::Complete
        } else {
            Recognition::Prefix
        }
    }

    fn next(&self, item: Item) -> Option<Sym<'g>> {
        self.rules[item.rule][item.alt].get(item.dot).copied()
    }

    fn matches(&self, sym: Sym<'_>, token: &str) -> bool {
        match sym {
            Sym::Literal(text) => text == token,
            Sym::Regex(i) => self.regexes[i].is_match(token),
            Sym::Rule(_) | Sym::Dead => false,
        }
    }
}

impl Grammar {
    /// Recognize `tokens` against this grammar.
    pub fn recognize<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Recognition, regex::Error> {
        Ok(Recognizer::new(self)?.recognize(tokens))
    }
}

#[derive(Default)]
struct Chart {
    items: Vec<Item>,
    seen: FxHashSet<Item>,
}

impl Chart {
    fn add(&mut self, item: Item) {
        if self.seen.insert(item) {
            self.items.push(item);
        }
    }
}

fn nullable(rules: &[Vec<Vec<Sym<'_>>>]) -> Vec<bool> {
    let mut nullable = vec![false; rules.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (i, alts) in rules.iter().enumerate() {
            if nullable[i] {
                continue;
            }
            let empty = alts.iter().any(|alt| {
                alt.iter()
                    .all(|sym| matches!(sym, Sym::Rule(r) if nullable[*r]))
            });
            if empty {
                nullable[i] = true;
                changed = true;
            }
        }
    }
    nullable
}
