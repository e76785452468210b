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

//! Earley recognizer with Leo's right-recursion optimization

use log::debug;

use crate::grammar::{CompiledGrammar, DottedRule, SymbolId};

/// Entry in the recognition chart. The dotted rule indicates the next symbol to be recognized
/// (terminal or non-terminal). The second field is the earleme at which recognition of the
/// rule began.
///
/// The start is usize as to not limit the length of the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EarleyItem {
    /// Rule progress.
    pub dotted: DottedRule,
    /// Earleme at which recognition of this rule began.
    pub start: usize,
}

impl EarleyItem {
    /// The same item with the dot moved over one recognized symbol.
    fn advanced(&self) -> Self {
        Self {
            dotted: self.dotted.advance_dot(),
            start: self.start,
        }
    }
}

/// Memoized shortcut for right-recursive reductions.
///
/// When the transition symbol completes at the earleme holding this record, the stored item is
/// the topmost item of the whole reduction chain, already advanced. Looking it up replaces the
/// chain walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeoItem {
    /// Completed symbol this item shortcuts over.
    pub transition: SymbolId,
    /// Topmost item of the reduction chain.
    pub item: EarleyItem,
}

/// Earley/Leo recognizer.
///
/// Decides whether a finite input is derivable from a start symbol. The chart grows
/// monotonically during a single [recognize](#method.recognize) call and is reset (with
/// capacity retained) by the next one.
///
/// The chart is stored flat: one append-only item vector, one append-only Leo vector, and an
/// index vector marking where each earleme begins in both.
pub struct Recognizer<G: CompiledGrammar> {
    /// Compiled grammar to recognize against.
    grammar: G,

    /// All Earley items of the current parse, grouped by earleme in insertion order.
    items: Vec<EarleyItem>,

    /// All Leo items of the current parse, grouped by earleme in insertion order.
    leo_items: Vec<LeoItem>,

    /// (earley, leo) index of the first item belonging to each earleme. Both components are
    /// non-decreasing. Length is the number of opened earlemes.
    earleme_start: Vec<(usize, usize)>,
}

impl<G: CompiledGrammar> Recognizer<G> {
    /// Create a new recognizer, given a grammar.
    pub fn new(grammar: G) -> Self {
        Self {
            grammar,
            items: Vec::new(),
            leo_items: Vec::new(),
            earleme_start: Vec::new(),
        }
    }

    /// Borrow the grammar
    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    /// Decide whether `source` is derivable from `start`.
    ///
    /// The input is accepted iff every input symbol was consumed and the final earleme holds a
    /// completed rule of the start symbol spanning the whole input.
    pub fn recognize(&mut self, source: &[SymbolId], start: SymbolId) -> bool {
        self.items.clear();
        self.leo_items.clear();
        self.earleme_start.clear();
        self.items.reserve(source.len() + 1);
        self.earleme_start.reserve(source.len() + 1);

        // Open earleme 0 and seed it with the alternatives of the start symbol.
        self.earleme_start.push((0, 0));
        for rule in self.grammar.alternatives(start) {
            self.insert_earley(EarleyItem {
                dotted: DottedRule::new(rule),
                start: 0,
            });
        }

        let mut earleme = 0;
        while earleme < self.earleme_start.len() {
            let mut visit = self.earleme_start[earleme].0;
            // Prediction and reduction append to the earleme currently being visited. The
            // bound must be re-read every iteration so those items are visited as well.
            while visit < self.items.len() {
                let item = self.items[visit];
                if self.grammar.is_complete(item.dotted) {
                    self.reduce(item);
                } else {
                    self.predict(item);
                }
                self.add_any_leo_item(item);
                visit += 1;
            }
            // One input symbol per earleme. A failed scan opens no new earleme and thereby
            // ends the loop.
            if let Some(token) = source.get(earleme) {
                self.scan(*token);
            }
            earleme += 1;
        }

        let accepted = self.accepted(source.len(), start);
        debug!(
            "recognize: {} earlemes, {} items, {} leo items, accepted: {}",
            self.earleme_start.len(),
            self.items.len(),
            self.leo_items.len(),
            accepted
        );
        accepted
    }

    /// Final-state check: the whole input was scanned and the last earleme contains a
    /// completed rule of the start symbol that began at earleme 0.
    fn accepted(&self, source_len: usize, start: SymbolId) -> bool {
        if self.earleme_start.len() != source_len + 1 {
            return false;
        }
        let (lo, hi) = self.earley_bounds(self.earleme_start.len() - 1);
        self.items[lo..hi].iter().any(|item| {
            item.start == 0
                && self.grammar.is_complete(item.dotted)
                && self.grammar.lhs(item.dotted.rule) == start
        })
    }

    /// Index of the earleme currently being filled.
    fn current_earleme(&self) -> usize {
        self.earleme_start.len() - 1
    }

    /// Half-open item index range of an earleme. The last earleme extends to the end of the
    /// item vector.
    fn earley_bounds(&self, earleme: usize) -> (usize, usize) {
        let lo = self.earleme_start[earleme].0;
        let hi = if earleme + 1 < self.earleme_start.len() {
            self.earleme_start[earleme + 1].0
        } else {
            self.items.len()
        };
        (lo, hi)
    }

    /// Half-open Leo index range of an earleme.
    fn leo_bounds(&self, earleme: usize) -> (usize, usize) {
        let lo = self.earleme_start[earleme].1;
        let hi = if earleme + 1 < self.earleme_start.len() {
            self.earleme_start[earleme + 1].1
        } else {
            self.leo_items.len()
        };
        (lo, hi)
    }

    /// Predict function of the Earley algorithm: queue the alternatives of the expected
    /// symbol in the current earleme. A nulling symbol is additionally treated as already
    /// recognized, advancing the predicting item without consuming input.
    fn predict(&mut self, item: EarleyItem) {
        let postdot = self
            .grammar
            .postdot(item.dotted)
            .expect("predict requires an incomplete item");
        let here = self.current_earleme();
        for rule in self.grammar.alternatives(postdot) {
            self.insert_earley(EarleyItem {
                dotted: DottedRule::new(rule),
                start: here,
            });
        }
        if self.grammar.is_nulling(postdot) {
            self.insert_earley(item.advanced());
        }
    }

    /// Complete function of the Earley algorithm. A Leo item at the completed item's start
    /// earleme replaces the whole reduction chain with its memoized top; otherwise every item
    /// there expecting the completed symbol advances.
    fn reduce(&mut self, item: EarleyItem) {
        let lhs = self.grammar.lhs(item.dotted.rule);
        match self.find_leo(item.start, lhs) {
            Some(leo) => self.insert_earley(leo.item),
            None => self.earley_reduce(item, lhs),
        }
    }

    /// Classic Earley completion without the Leo shortcut.
    fn earley_reduce(&mut self, item: EarleyItem, lhs: SymbolId) {
        let lo = self.earleme_start[item.start].0;
        if item.start == self.current_earleme() {
            // Completions append to the very slice being searched (empty rules complete in
            // the earleme that predicted them). The bound must be re-read every iteration.
            let mut origin = lo;
            while origin < self.items.len() {
                let candidate = self.items[origin];
                if self.grammar.postdot(candidate.dotted) == Some(lhs) {
                    self.insert_earley(candidate.advanced());
                }
                origin += 1;
            }
        } else {
            let hi = self.earleme_start[item.start + 1].0;
            for origin in lo..hi {
                let candidate = self.items[origin];
                if self.grammar.postdot(candidate.dotted) == Some(lhs) {
                    self.insert_earley(candidate.advanced());
                }
            }
        }
    }

    /// Scan function of the Earley algorithm: advance every item of the current earleme that
    /// expects `token`. The first match opens the next earleme; no match leaves the chart
    /// unchanged, which ends the parse.
    fn scan(&mut self, token: SymbolId) {
        let (lo, hi) = self.earley_bounds(self.current_earleme());
        let mut opened = false;
        for scanned in lo..hi {
            let item = self.items[scanned];
            if self.grammar.postdot(item.dotted) != Some(token) {
                continue;
            }
            if !opened {
                self.earleme_start
                    .push((self.items.len(), self.leo_items.len()));
                opened = true;
            }
            self.insert_earley(item.advanced());
        }
    }

    /// Record a Leo item for `item` if it is Leo-eligible. An existing Leo item at the item's
    /// start earleme is the top of an older chain and is carried over; otherwise the advanced
    /// item itself becomes the chain top.
    fn add_any_leo_item(&mut self, item: EarleyItem) {
        if !self.is_leo_eligible(item.dotted) {
            return;
        }
        let transition = self
            .grammar
            .penult(item.dotted)
            .expect("Leo-eligible item has a penult symbol");
        let lhs = self.grammar.lhs(item.dotted.rule);
        match self.find_leo(item.start, lhs) {
            Some(predecessor) => self.insert_leo(predecessor.item, transition),
            None => self.insert_leo(item.advanced(), transition),
        }
    }

    /// A dotted rule is Leo-eligible iff its rule is right recursive, the dot sits at the
    /// penult position, and no other item of the current earleme shares that penult
    /// transition.
    ///
    /// The uniqueness test is a snapshot: items appended later in the same earleme are not
    /// seen. This is sound because prediction and reduction reach their fixpoint within an
    /// earleme before the next scan.
    fn is_leo_eligible(&self, dotted: DottedRule) -> bool {
        if !self.grammar.is_right_recursive(dotted.rule) {
            return false;
        }
        match self.grammar.penult(dotted) {
            Some(transition) => self.unique_penult(transition),
            None => false,
        }
    }

    /// True iff exactly one item of the current earleme sits at the penult position of its
    /// rule with this transition symbol.
    fn unique_penult(&self, transition: SymbolId) -> bool {
        let lo = self.earleme_start[self.current_earleme()].0;
        self.items[lo..]
            .iter()
            .filter(|item| self.grammar.penult(item.dotted) == Some(transition))
            .count()
            == 1
    }

    /// Look up the Leo item of an earleme by transition symbol. At most one exists per
    /// earleme and transition.
    fn find_leo(&self, earleme: usize, transition: SymbolId) -> Option<LeoItem> {
        let (lo, hi) = self.leo_bounds(earleme);
        self.leo_items[lo..hi]
            .iter()
            .find(|leo| leo.transition == transition)
            .copied()
    }

    /// Add an item to the current earleme if it is not already present.
    ///
    /// Earleme slices stay small by design, so a linear scan beats a hash set here.
    fn insert_earley(&mut self, item: EarleyItem) {
        let lo = self.earleme_start[self.current_earleme()].0;
        if self.items[lo..].iter().any(|present| *present == item) {
            return;
        }
        self.items.push(item);
    }

    /// Add a Leo item to the current earleme unless its transition symbol is already taken.
    /// A duplicate insertion must agree on the memoized item; a mismatch indicates an
    /// inconsistent grammar.
    fn insert_leo(&mut self, item: EarleyItem, transition: SymbolId) {
        let lo = self.earleme_start[self.current_earleme()].1;
        let present = self.leo_items[lo..]
            .iter()
            .find(|leo| leo.transition == transition)
            .map(|leo| leo.item);
        match present {
            Some(present) => debug_assert_eq!(present, item),
            None => self.leo_items.push(LeoItem { transition, item }),
        }
    }
}

impl<G: CompiledGrammar> Recognizer<G> {
    /// Number of earlemes opened by the last parse. Between 1 and input length + 1.
    pub fn earleme_count(&self) -> usize {
        self.earleme_start.len()
    }

    /// Total number of Earley items generated by the last parse.
    pub fn earley_item_count(&self) -> usize {
        self.items.len()
    }

    /// Total number of Leo items generated by the last parse.
    pub fn leo_item_count(&self) -> usize {
        self.leo_items.len()
    }

    /// The Earley items of one earleme, in insertion order.
    pub fn items_at(&self, earleme: usize) -> &[EarleyItem] {
        let (lo, hi) = self.earley_bounds(earleme);
        &self.items[lo..hi]
    }

    /// The Leo items of one earleme, in insertion order.
    pub fn leo_items_at(&self, earleme: usize) -> &[LeoItem] {
        let (lo, hi) = self.leo_bounds(earleme);
        &self.leo_items[lo..hi]
    }

    /// Render the whole chart, earleme by earleme: first the Leo items, then the Earley
    /// items, both in insertion order.
    pub fn chart_text(&self) -> String {
        let mut out = String::new();
        for earleme in 0..self.earleme_start.len() {
            out.push_str(&format!("chart[{}]:\n", earleme));
            for leo in self.leo_items_at(earleme) {
                out.push_str(&format!(
                    "  Leo {}: {} ({})\n",
                    self.grammar.symbol_name(leo.transition),
                    self.grammar.dotted_rule_to_string(leo.item.dotted),
                    leo.item.start
                ));
            }
            for item in self.items_at(earleme) {
                out.push_str(&format!(
                    "  {} ({})\n",
                    self.grammar.dotted_rule_to_string(item.dotted),
                    item.start
                ));
            }
        }
        out
    }

    pub fn print_chart(&self) {
        print!("{}", self.chart_text());
    }

    pub fn trace_chart(&self) {
        for line in self.chart_text().lines() {
            log::trace!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic_grammar::{DynamicGrammar, TextGrammar, TextRule};

    fn sym(grammar: &DynamicGrammar, name: &str) -> SymbolId {
        grammar.symbol_id(name).expect("symbol should be known")
    }

    /// Repeat one terminal n times.
    fn repeated(grammar: &DynamicGrammar, name: &str, n: usize) -> Vec<SymbolId> {
        vec![sym(grammar, name); n]
    }

    /// S -> a S | a
    fn right_recursive_grammar() -> DynamicGrammar {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S").t("a").nt("S"));
        grammar.add(TextRule::new("S").t("a"));
        grammar.compile().expect("compilation should have worked")
    }

    /// Check the chart set semantics: no duplicate items within an earleme, no duplicate Leo
    /// transitions within an earleme.
    fn assert_chart_invariants<G: CompiledGrammar>(recognizer: &Recognizer<G>) {
        for earleme in 0..recognizer.earleme_count() {
            let items = recognizer.items_at(earleme);
            for (i, a) in items.iter().enumerate() {
                assert!(a.start <= earleme);
                for b in items.iter().skip(i + 1) {
                    assert_ne!(a, b, "duplicate item in earleme {}", earleme);
                }
            }
            let leos = recognizer.leo_items_at(earleme);
            for (i, a) in leos.iter().enumerate() {
                assert!(a.item.start <= earleme);
                for b in leos.iter().skip(i + 1) {
                    assert_ne!(
                        a.transition, b.transition,
                        "duplicate Leo transition in earleme {}",
                        earleme
                    );
                }
            }
        }
    }

    /// S ->
    #[test]
    fn empty_rule_empty_input() {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S"));
        let grammar = grammar.compile().expect("compilation should have worked");
        let start = sym(&grammar, "S");

        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&[], start));
        assert_eq!(recognizer.earleme_count(), 1);
        let items = recognizer.items_at(0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, 0);
        assert!(recognizer.grammar().is_complete(items[0].dotted));
        assert_eq!(recognizer.grammar().lhs(items[0].dotted.rule), start);
    }

    /// S -> a
    #[test]
    fn single_terminal() {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S").t("a"));
        let grammar = grammar.compile().expect("compilation should have worked");
        let a = sym(&grammar, "a");
        let start = sym(&grammar, "S");

        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&[a], start));
        assert!(!recognizer.recognize(&[], start));
        assert!(!recognizer.recognize(&[a, a], start));
    }

    /// S -> a S | a with Leo: the chart stays linear in the input length.
    #[test]
    fn right_recursion_stays_linear() {
        let grammar = right_recursive_grammar();
        let start = sym(&grammar, "S");
        let input = repeated(&grammar, "a", 4);
        let mut recognizer = Recognizer::new(grammar);

        assert!(recognizer.recognize(&input, start));
        assert_eq!(recognizer.earleme_count(), 5);
        assert_chart_invariants(&recognizer);
        // The reduction chains collapsed into Leo items, one per inner earleme.
        assert!(recognizer.leo_item_count() >= 3);

        for n in &[8usize, 16, 32, 64] {
            let input = repeated(recognizer.grammar(), "a", *n);
            assert!(recognizer.recognize(&input, start));
            assert!(
                recognizer.earley_item_count() <= 6 * n + 8,
                "chart grew superlinearly: {} items for {} symbols",
                recognizer.earley_item_count(),
                n
            );
            assert_chart_invariants(&recognizer);
        }
    }

    /// S -> S a | a. No Leo shortcut applies, plain Earley handles it.
    #[test]
    fn left_recursion() {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S").nt("S").t("a"));
        grammar.add(TextRule::new("S").t("a"));
        let grammar = grammar.compile().expect("compilation should have worked");
        let start = sym(&grammar, "S");
        let input = repeated(&grammar, "a", 3);

        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&input, start));
        assert!(!recognizer.recognize(&[], start));
        assert_chart_invariants(&recognizer);
    }

    /// S -> S S | a is ambiguous; the recognizer accepts regardless of how many derivations
    /// exist.
    #[test]
    fn ambiguous_grammar() {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S").nt("S").nt("S"));
        grammar.add(TextRule::new("S").t("a"));
        let grammar = grammar.compile().expect("compilation should have worked");
        let start = sym(&grammar, "S");
        let input = repeated(&grammar, "a", 3);

        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&input, start));
        assert_chart_invariants(&recognizer);
    }

    /// S -> A B, A -> , B -> b. Prediction must advance over the nulling A.
    #[test]
    fn nulling_symbol_propagation() {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S").nt("A").nt("B"));
        grammar.add(TextRule::new("A"));
        grammar.add(TextRule::new("B").t("b"));
        let grammar = grammar.compile().expect("compilation should have worked");
        let b = sym(&grammar, "b");
        let start = sym(&grammar, "S");

        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&[b], start));
        assert!(!recognizer.recognize(&[], start));
        assert_chart_invariants(&recognizer);
    }

    /// A failed scan opens no earleme; the remaining input is never looked at.
    #[test]
    fn rejection_mid_input() {
        let mut grammar = TextGrammar::new();
        grammar.set_start("S");
        grammar.add(TextRule::new("S").t("a").t("b"));
        let grammar = grammar.compile().expect("compilation should have worked");
        let a = sym(&grammar, "a");
        let b = sym(&grammar, "b");
        let start = sym(&grammar, "S");

        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&[a, b], start));
        assert!(!recognizer.recognize(&[a], start));
        assert!(!recognizer.recognize(&[b], start));
        assert!(!recognizer.recognize(&[a, a], start));
        assert_eq!(recognizer.earleme_count(), 2);
        assert!(!recognizer.recognize(&[b, a], start));
        assert_eq!(recognizer.earleme_count(), 1);
    }

    /// Two runs over the same input leave the same chart behind.
    #[test]
    fn reinitialization_is_idempotent() {
        let grammar = right_recursive_grammar();
        let start = sym(&grammar, "S");
        let input = repeated(&grammar, "a", 5);
        let mut recognizer = Recognizer::new(grammar);

        let first = recognizer.recognize(&input, start);
        let first_chart = recognizer.chart_text();
        let second = recognizer.recognize(&input, start);
        assert_eq!(first, second);
        assert_eq!(first_chart, recognizer.chart_text());
    }

    #[test]
    fn chart_description_format() {
        let grammar = right_recursive_grammar();
        let start = sym(&grammar, "S");
        let input = repeated(&grammar, "a", 2);
        let mut recognizer = Recognizer::new(grammar);
        assert!(recognizer.recognize(&input, start));

        let text = recognizer.chart_text();
        assert!(text.starts_with("chart[0]:\n"));
        assert!(text.contains("  S -> • a S (0)\n"));
        assert!(text.contains("  Leo S: S -> a S • (0)\n"));
        assert!(text.contains("  S -> a S • (0)\n"));
    }
}
