//! The bundled icelang grammar.

use std::sync::LazyLock;

use crate::grammar::{Grammar, RawGrammar};

/// The icelang grammar definition as shipped, in the external grammar
/// definition format
pub const ICELANG_GRAMMAR_JSON: &str = include_str!("../grammars/icelang.json");

static ICELANG: LazyLock<Grammar> = LazyLock::new(|| {
    RawGrammar::load_from_str(ICELANG_GRAMMAR_JSON)
        .and_then(|raw| Ok(raw.compile()?))
        .expect("bundled icelang grammar is valid")
});

/// The compiled icelang grammar, loaded once and shared; tokenization
/// sessions for any number of documents can borrow it concurrently.
pub fn icelang() -> &'static Grammar {
    &ICELANG
}
