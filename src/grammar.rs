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

//! Grammar interface consumed by the recognizer

use std::ops::Range;

/// Symbol IDs are indices into the symbol table. As such, they can be fairly small integers to
/// save space. 16 bit should be sufficient for all purposes. If not, file a feature request.
pub type SymbolId = u16;

/// Rule IDs are indices into the rule table, with the same size rationale as `SymbolId`.
pub type RuleId = u16;

/// A rule together with a cursor ("dot") on its right hand side. The dot marks how much of the
/// rule has been recognized; the symbol after the dot is what the rule expects next.
///
/// The rule length is not stored here. All queries that need it (`postdot`, `penult`,
/// `is_complete`) go through the grammar that issued the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DottedRule {
    /// Index of the rule in the grammar.
    pub rule: RuleId,
    /// Cursor position on the right hand side, in [0, rhs.len()].
    pub dot: u16,
}

impl DottedRule {
    /// A fresh handle with the dot before the first right-hand-side symbol.
    pub fn new(rule: RuleId) -> Self {
        Self { rule, dot: 0 }
    }

    /// The same rule with the dot moved one symbol to the right.
    pub fn advance_dot(&self) -> Self {
        Self {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }
}

/// Trait to access a checked and compacted representation of a grammar.
///
/// Symbols (terminals and non-terminals) are identified by small integers. For debugging and
/// queries, the names of all symbols are kept in a table.
///
/// The following invariants hold for any implementation:
///
/// * Rules with the same left-hand-side symbol occupy a contiguous range of rule IDs, so that
///   `alternatives` can hand out a plain index range.
/// * All static analysis the recognizer consumes (`is_nulling`, `is_right_recursive`) is
///   finished before the first query. The recognizer never derives these facts itself.
pub trait CompiledGrammar {
    /// Id of the default start symbol.
    fn start_symbol(&self) -> SymbolId;

    /// Number of rules.
    ///
    /// Calls to `lhs` and `rhs` will always be below the returned number.
    fn rule_count(&self) -> usize;

    /// Left-hand-side symbol of a rule.
    fn lhs(&self, rule: RuleId) -> SymbolId;

    /// Right-hand-side symbols of a rule. Empty rules have an empty slice.
    fn rhs(&self, rule: RuleId) -> &[SymbolId];

    /// The rules that have `sym` as their left hand side, as a range of rule IDs. The range is
    /// empty for terminals.
    fn alternatives(&self, sym: SymbolId) -> Range<RuleId>;

    /// True iff `sym` derives the empty string and never derives anything else. Always false
    /// for terminals.
    fn is_nulling(&self, sym: SymbolId) -> bool;

    /// True iff the rule's rightmost non-nulling symbol can derive a string that ends in the
    /// rule's own left hand side.
    fn is_right_recursive(&self, rule: RuleId) -> bool;

    /// Number of symbols, terminals and non-terminals together.
    fn symbol_count(&self) -> SymbolId;

    /// Printable name of a symbol.
    fn symbol_name(&self, sym: SymbolId) -> &str;

    /// The symbol after the dot, or `None` when the dot is past the last symbol.
    fn postdot(&self, dotted: DottedRule) -> Option<SymbolId> {
        self.rhs(dotted.rule).get(dotted.dot as usize).copied()
    }

    /// True iff the dot is past the last right-hand-side symbol.
    fn is_complete(&self, dotted: DottedRule) -> bool {
        (dotted.dot as usize) >= self.rhs(dotted.rule).len()
    }

    /// The last right-hand-side symbol, but only when the dot sits directly before it and the
    /// rule has at least two symbols. `None` in every other position.
    ///
    /// This is the transition symbol of the Leo optimization: recognizing it completes the
    /// rule in one step.
    fn penult(&self, dotted: DottedRule) -> Option<SymbolId> {
        let rhs = self.rhs(dotted.rule);
        if rhs.len() >= 2 && (dotted.dot as usize) + 1 == rhs.len() {
            rhs.last().copied()
        } else {
            None
        }
    }

    /// Render a dotted rule as `LHS -> pre • post` for chart dumps and log output.
    fn dotted_rule_to_string(&self, dotted: DottedRule) -> String {
        let mut out = format!("{} ->", self.symbol_name(self.lhs(dotted.rule)));
        let rhs = self.rhs(dotted.rule);
        for (i, sym) in rhs.iter().enumerate() {
            if i == dotted.dot as usize {
                out.push_str(" •");
            }
            out.push(' ');
            out.push_str(self.symbol_name(*sym));
        }
        if dotted.dot as usize >= rhs.len() {
            out.push_str(" •");
        }
        out
    }
}
