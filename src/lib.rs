//! Grammar-driven lexical tokenizer for the icelang editor integration.
//!
//! A [`Grammar`] is loaded once from a declarative rule set (named rule
//! groups of single-line matches and begin/end regions) and then shared
//! read-only; a [`Tokenizer`] scans source text line by line against it,
//! threading a [`ScanState`] with the currently open regions, and produces
//! scope-tagged [`Token`]s for a theme or decoration layer to consume.
//!
//! ```
//! use icelang_syntax::{Tokenizer, icelang};
//!
//! let tokenizer = Tokenizer::new(icelang());
//! let (lines, state) = tokenizer.tokenize("set x = 1 -- one");
//! assert!(state.is_clean());
//! assert!(!lines[0].is_empty());
//! ```

mod error;
mod grammar;
mod icelang;
mod scope;
mod tokenizer;

pub use error::{Error, GrammarError};
pub use grammar::{Grammar, RawGrammar, RuleId};
pub use icelang::{ICELANG_GRAMMAR_JSON, icelang};
pub use scope::Scope;
pub use tokenizer::{RegionFrame, ScanState, Token, Tokenizer};
