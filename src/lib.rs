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

//! Earleo public API
//!
//! A context-free grammar recognizer in the MARPA family: Earley recognition with Leo's
//! right-recursion optimization, which keeps the chart linear for right-recursive grammars.
//!
//! ```
//! use earleo::{Recognizer, TextGrammar, TextRule};
//!
//! // S -> a S | a
//! let mut grammar = TextGrammar::new();
//! grammar.set_start("S");
//! grammar.add(TextRule::new("S").t("a").nt("S"));
//! grammar.add(TextRule::new("S").t("a"));
//! let grammar = grammar.compile().unwrap();
//!
//! let a = grammar.symbol_id("a").unwrap();
//! let start = grammar.symbol_id("S").unwrap();
//! let mut recognizer = Recognizer::new(grammar);
//! assert!(recognizer.recognize(&[a, a, a], start));
//! assert!(!recognizer.recognize(&[], start));
//! ```

mod dynamic_grammar;
mod grammar;
mod recognizer;

pub use dynamic_grammar::{DynamicGrammar, Error, TextGrammar, TextRule, TextSymbol};
pub use grammar::{CompiledGrammar, DottedRule, RuleId, SymbolId};
pub use recognizer::{EarleyItem, LeoItem, Recognizer};
