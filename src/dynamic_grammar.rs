/*
    MIT License

    Copyright (c) 2020 Lars Krueger <lars_e_krueger@gmx.de>

    Permission is hereby granted, free of charge, to any person obtaining a copy
    of this software and associated documentation files (the "Software"), to deal
    in the Software without restriction, including without limitation the rights
    to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
    copies of the Software, and to permit persons to whom the Software is
    furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in all
    copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
    OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
    SOFTWARE.
*/

//! Build a grammar at runtime

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use itertools::Itertools;

use crate::grammar::{CompiledGrammar, RuleId, SymbolId};

/// Number of symbol ids.
const MAX_SYMBOL_ID: SymbolId = std::u16::MAX;

/// List of errors when processing grammars
#[derive(Debug)]
pub enum Error {
    /// Too many entries to compile
    TooLarge(String),
    /// Non-terminal used in a rule without a rule for it
    NoRule(String),
    /// Terminal used as the left hand side of a rule
    TerminalWithRule(String),
    /// No start symbol set
    EmptyStart,
    /// Empty string used in a rule
    EmptySymbol,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TooLarge(what) => write!(f, "too many entries to compile: {}", what),
            Error::NoRule(sym) => write!(f, "non-terminal without a rule: {}", sym),
            Error::TerminalWithRule(sym) => {
                write!(f, "terminal used as the left hand side of a rule: {}", sym)
            }
            Error::EmptyStart => write!(f, "no start symbol set"),
            Error::EmptySymbol => write!(f, "empty string used as a symbol name"),
        }
    }
}

/// Type alias for Results with Errors
type Result<T> = std::result::Result<T, Error>;

/// Grammar symbols, terminals and non-terminals, in textual representation.
///
/// Terminals are matched against input symbols by identity; non-terminals refer to the rules
/// that define them.
#[derive(Debug, Clone)]
pub enum TextSymbol {
    Terminal(String),
    NonTerminal(String),
}

/// A grammar rule or production, e.g. S -> A B c, in textual representation.
#[derive(Debug, Clone)]
pub struct TextRule {
    /// Name of a non-terminal symbol.
    lhs: String,
    rhs: Vec<TextSymbol>,
}

impl TextRule {
    /// Create a new rule for the given symbol.
    ///
    /// ```ignore
    /// TextRule::new("left")
    /// ```
    ///
    /// corresponds to
    /// ```ignore
    /// <left> ::=
    /// ```
    ///
    /// in [BNF](https://en.wikipedia.org/wiki/Backus%E2%80%93Naur_form).
    pub fn new(lhs: &str) -> Self {
        Self {
            lhs: lhs.to_string(),
            rhs: Vec::new(),
        }
    }

    /// Append a non-terminal to a rule.
    pub fn nt(mut self, name: &str) -> Self {
        self.rhs.push(TextSymbol::NonTerminal(name.to_string()));
        self
    }

    /// Append a terminal to a rule.
    pub fn t(mut self, name: &str) -> Self {
        self.rhs.push(TextSymbol::Terminal(name.to_string()));
        self
    }
}

/// Grammar builder, textual representation of production rules: S -> A B C
///
/// When a grammar has been completely defined, it needs to be compiled to be used by the
/// recognizer. This will create the look-up tables and the static analysis (nulling symbols,
/// right recursion) required for efficient recognition.
#[derive(Debug)]
pub struct TextGrammar {
    /// Rule table
    rules: Vec<TextRule>,

    /// Non-terminal to start derivations from
    start: String,
}

/// Machine readable representation of a grammar, dynamically built from a TextGrammar.
#[derive(Debug)]
pub struct DynamicGrammar {
    /// Names of all symbols. Index corresponds to the symbol id. Non-terminals come first,
    /// terminals after them.
    symbol_names: Vec<String>,

    /// Number of non-terminal symbols. Every id below this has at least one rule.
    nt_count: SymbolId,

    /// Rules as indices into the symbol table, sorted by lhs so that the alternatives of a
    /// symbol form a contiguous range.
    rules: Vec<(SymbolId, Vec<SymbolId>)>,

    /// Index of the first rule of each symbol. One entry per symbol plus a trailing sentinel;
    /// terminals get an empty range.
    first_rule: Vec<RuleId>,

    /// Index of start symbol
    start: SymbolId,

    /// Per symbol: derives the empty string and nothing else.
    nulling: Vec<bool>,

    /// Per rule: the rightmost non-nulling symbol can derive a string ending in the lhs.
    right_recursive: Vec<bool>,
}

/// Walk the "a derivation can end in" edges from `from`, looking for `target`.
///
/// The relation is reflexive: every symbol ends with itself.
fn can_end_with(from: SymbolId, target: SymbolId, ends_in: &[Vec<SymbolId>]) -> bool {
    let mut seen = vec![false; ends_in.len()];
    let mut stack = vec![from];
    while let Some(sym) = stack.pop() {
        if sym == target {
            return true;
        }
        if seen[sym as usize] {
            continue;
        }
        seen[sym as usize] = true;
        for next in ends_in[sym as usize].iter() {
            if !seen[*next as usize] {
                stack.push(*next);
            }
        }
    }
    false
}

impl TextGrammar {
    /// Return a new grammar builder.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            start: String::new(),
        }
    }

    /// Add a rule.
    pub fn add(&mut self, rule: TextRule) {
        self.rules.push(rule);
    }

    /// Set the start symbol. This can be overwritten and may contain an unknown symbol until
    /// just before [compile](#method.compile) is called.
    pub fn set_start(&mut self, sym: &str) {
        self.start = sym.to_string();
    }

    /// Compile the grammar for efficient use.
    ///
    /// If the given grammar is incorrect or inconsistent, return an error.
    pub fn compile(self) -> Result<DynamicGrammar> {
        if self.start.is_empty() {
            return Err(Error::EmptyStart);
        }
        if self.rules.len() > (MAX_SYMBOL_ID as usize) {
            return Err(Error::TooLarge("Rules".to_string()));
        }

        // Assign non-terminal ids in order of first appearance on a left hand side.
        let mut nonterminals: HashMap<String, usize> = HashMap::new();
        for rule in self.rules.iter() {
            if rule.lhs.is_empty() {
                return Err(Error::EmptySymbol);
            }
            // The dot can grow to the full rhs length (i.e. past the last entry).
            if rule.rhs.len() >= (MAX_SYMBOL_ID as usize) {
                return Err(Error::TooLarge(rule.lhs.clone()));
            }
            let next_id = nonterminals.len();
            nonterminals.entry(rule.lhs.clone()).or_insert(next_id);
        }

        // Assign terminal ids in order of first appearance on a right hand side, and check
        // that every referenced non-terminal has a rule.
        let mut terminals: HashMap<String, usize> = HashMap::new();
        for rule in self.rules.iter() {
            for sym in rule.rhs.iter() {
                match sym {
                    TextSymbol::NonTerminal(name) => {
                        if name.is_empty() {
                            return Err(Error::EmptySymbol);
                        }
                        if !nonterminals.contains_key(name) {
                            return Err(Error::NoRule(name.clone()));
                        }
                    }
                    TextSymbol::Terminal(name) => {
                        if name.is_empty() {
                            return Err(Error::EmptySymbol);
                        }
                        if nonterminals.contains_key(name) {
                            return Err(Error::TerminalWithRule(name.clone()));
                        }
                        let next_id = terminals.len();
                        terminals.entry(name.clone()).or_insert(next_id);
                    }
                }
            }
        }

        let nt_count = nonterminals.len();
        let symbol_count = nt_count + terminals.len();
        if symbol_count > (MAX_SYMBOL_ID as usize) {
            return Err(Error::TooLarge(
                "Terminals and NonTerminals together".to_string(),
            ));
        }

        // The start symbol counts as used on a rhs, so it needs a rule as well.
        let start = *nonterminals
            .get(&self.start)
            .ok_or_else(|| Error::NoRule(self.start.clone()))?;

        // Build the symbol name table by sorting the key-value pairs by id.
        let mut symbol_names: Vec<String> = nonterminals
            .iter()
            .sorted_by(|a, b| Ord::cmp(a.1, b.1))
            .map(|(name, _)| name.clone())
            .collect();
        symbol_names.extend(
            terminals
                .iter()
                .sorted_by(|a, b| Ord::cmp(a.1, b.1))
                .map(|(name, _)| name.clone()),
        );

        // Build the rules. The sort is stable, so alternatives of one symbol keep the order
        // in which they were added.
        let mut rules: Vec<(SymbolId, Vec<SymbolId>)> = self
            .rules
            .iter()
            .map(|rule| {
                let lhs = nonterminals[&rule.lhs] as SymbolId;
                let rhs = rule
                    .rhs
                    .iter()
                    .map(|sym| match sym {
                        TextSymbol::NonTerminal(name) => nonterminals[name] as SymbolId,
                        TextSymbol::Terminal(name) => (nt_count + terminals[name]) as SymbolId,
                    })
                    .collect();
                (lhs, rhs)
            })
            .collect();
        rules.sort_by_key(|rule| rule.0);

        // First-rule index per symbol. Terminals end up with empty ranges.
        let mut first_rule = Vec::with_capacity(symbol_count + 1);
        let mut next = 0;
        for sym in 0..=symbol_count {
            while next < rules.len() && (rules[next].0 as usize) < sym {
                next += 1;
            }
            first_rule.push(next as RuleId);
        }

        // Nullability analysis, two least fixpoints. `nullable` = can derive the empty
        // string. `nonempty` = can derive at least one non-empty string.
        let mut nullable = vec![false; symbol_count];
        let mut changed = true;
        while changed {
            changed = false;
            for (lhs, rhs) in rules.iter() {
                if !nullable[*lhs as usize] && rhs.iter().all(|sym| nullable[*sym as usize]) {
                    nullable[*lhs as usize] = true;
                    changed = true;
                }
            }
        }

        let mut nonempty = vec![false; symbol_count];
        for term in nt_count..symbol_count {
            nonempty[term] = true;
        }
        changed = true;
        while changed {
            changed = false;
            for (lhs, rhs) in rules.iter() {
                if !nonempty[*lhs as usize] && rhs.iter().any(|sym| nonempty[*sym as usize]) {
                    nonempty[*lhs as usize] = true;
                    changed = true;
                }
            }
        }

        let nulling: Vec<bool> = (0..symbol_count)
            .map(|sym| nullable[sym] && !nonempty[sym])
            .collect();

        // The rightmost non-nulling symbol of each rule. Trailing nulling symbols consume no
        // input and are skipped.
        let tails: Vec<Option<SymbolId>> = rules
            .iter()
            .map(|(_, rhs)| rhs.iter().rev().copied().find(|sym| !nulling[*sym as usize]))
            .collect();

        // Per symbol, the symbols one of its derivations can end in, one step deep.
        let mut ends_in: Vec<Vec<SymbolId>> = vec![Vec::new(); symbol_count];
        for (rule, (lhs, _)) in rules.iter().enumerate() {
            if let Some(tail) = tails[rule] {
                let edges = &mut ends_in[*lhs as usize];
                if !edges.contains(&tail) {
                    edges.push(tail);
                }
            }
        }

        let right_recursive: Vec<bool> = rules
            .iter()
            .enumerate()
            .map(|(rule, (lhs, _))| match tails[rule] {
                Some(tail) => can_end_with(tail, *lhs, &ends_in),
                None => false,
            })
            .collect();

        Ok(DynamicGrammar {
            symbol_names,
            nt_count: nt_count as SymbolId,
            rules,
            first_rule,
            start: start as SymbolId,
            nulling,
            right_recursive,
        })
    }
}

impl CompiledGrammar for DynamicGrammar {
    fn start_symbol(&self) -> SymbolId {
        self.start
    }

    fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn lhs(&self, rule: RuleId) -> SymbolId {
        self.rules[rule as usize].0
    }

    fn rhs(&self, rule: RuleId) -> &[SymbolId] {
        &self.rules[rule as usize].1
    }

    fn alternatives(&self, sym: SymbolId) -> Range<RuleId> {
        self.first_rule[sym as usize]..self.first_rule[sym as usize + 1]
    }

    fn is_nulling(&self, sym: SymbolId) -> bool {
        self.nulling[sym as usize]
    }

    fn is_right_recursive(&self, rule: RuleId) -> bool {
        self.right_recursive[rule as usize]
    }

    fn symbol_count(&self) -> SymbolId {
        self.symbol_names.len() as SymbolId
    }

    fn symbol_name(&self, sym: SymbolId) -> &str {
        &self.symbol_names[sym as usize]
    }
}

impl DynamicGrammar {
    /// Convert the name of a symbol to its SymbolId.
    ///
    /// This function is slow and should not be used for mass queries.
    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names
            .iter()
            .position(|candidate| candidate == name)
            .map(|id| id as SymbolId)
    }

    /// True iff the symbol has no rules of its own, i.e. it can only be matched against the
    /// input.
    pub fn is_terminal(&self, sym: SymbolId) -> bool {
        sym >= self.nt_count
    }
}
