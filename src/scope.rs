//! Interned scope names.
//!
//! Scope names like `comment.line.double-dash.icelang` are attached to every
//! token and compared constantly during scanning, so they are interned once
//! in a global repository and carried around as a single index afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// A hierarchical scope name such as `string.quoted.single.icelang`.
///
/// Internally an index into the global scope repository; comparisons and
/// copies are trivial. The string form is only rebuilt for display.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope(u32);

impl Scope {
    /// Interns a scope name, returning the existing entry if it was seen before.
    pub fn new(name: &str) -> Scope {
        lock_scope_repo().intern(name.trim())
    }

    /// Rebuild the string form. Only meant for display and diagnostics.
    pub fn as_str(self) -> String {
        lock_scope_repo().resolve(self).to_owned()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope(\"{}\")", self.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::new(name)
    }
}

/// Maps scope strings to indices so equal names always yield equal `Scope`s.
struct ScopeRepository {
    names: Vec<String>,
    index_map: HashMap<String, u32>,
}

impl ScopeRepository {
    fn new() -> Self {
        Self {
            names: Vec::new(),
            index_map: HashMap::new(),
        }
    }

    fn intern(&mut self, name: &str) -> Scope {
        if let Some(&index) = self.index_map.get(name) {
            return Scope(index);
        }

        let index = self.names.len() as u32;
        self.names.push(name.to_owned());
        self.index_map.insert(name.to_owned(), index);
        Scope(index)
    }

    fn resolve(&self, scope: Scope) -> &str {
        &self.names[scope.0 as usize]
    }
}

static SCOPE_REPO: std::sync::LazyLock<Mutex<ScopeRepository>> =
    std::sync::LazyLock::new(|| Mutex::new(ScopeRepository::new()));

fn lock_scope_repo() -> MutexGuard<'static, ScopeRepository> {
    SCOPE_REPO.lock().expect("Failed to lock scope repository")
}
