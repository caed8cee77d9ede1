use std::fmt;

use crate::grammar::RuleId;
use crate::scope::Scope;

/// One open region: the rule that opened it and the scope path active
/// inside it (enclosing region scopes outermost first, this region's own
/// scope last).
#[derive(Clone, PartialEq)]
pub struct RegionFrame {
    pub rule: RuleId,
    pub scopes: Vec<Scope>,
}

/// The context carried between lines of one document: the stack of
/// currently open regions, innermost last.
///
/// Created empty at the start of a document and threaded by value through
/// each `scan_line` call; it is never shared between documents, which keeps
/// parallel tokenization of independent documents trivial.
#[derive(Clone, PartialEq, Default)]
pub struct ScanState {
    frames: Vec<RegionFrame>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a region's begin pattern matches
    pub(crate) fn push(&mut self, rule: RuleId, scopes: Vec<Scope>) {
        self.frames.push(RegionFrame { rule, scopes });
    }

    /// Called when the innermost region's end pattern matches.
    /// Regions close strictly in last-opened-first-closed order.
    pub(crate) fn pop(&mut self) -> Option<RegionFrame> {
        self.frames.pop()
    }

    /// The innermost open region, if any
    pub fn top(&self) -> Option<&RegionFrame> {
        self.frames.last()
    }

    /// Number of currently open regions
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// True when no region is open. A document that ends with a clean state
    /// is well formed; an unclean state at end of input means unterminated
    /// regions, which is a diagnostic, not an error.
    pub fn is_clean(&self) -> bool {
        self.frames.is_empty()
    }

    /// The scope path active at the current position: empty at top level,
    /// otherwise the innermost region's accumulated scopes.
    pub fn scopes(&self) -> &[Scope] {
        self.frames.last().map(|f| f.scopes.as_slice()).unwrap_or(&[])
    }

    /// The scope of each open region, outermost first. Used to report
    /// unterminated regions at end of input.
    pub fn open_scopes(&self) -> Vec<Scope> {
        self.frames
            .iter()
            .map(|f| *f.scopes.last().expect("frame scopes never empty"))
            .collect()
    }
}

impl fmt::Debug for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ScanState:")?;
        if self.frames.is_empty() {
            return writeln!(f, "  (no open regions)");
        }

        for (depth, frame) in self.frames.iter().enumerate() {
            let indent = "  ".repeat(depth + 1);
            write!(f, "{indent}rule={}", frame.rule.as_index())?;
            write!(f, " scopes=[")?;
            for (i, scope) in frame.scopes.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{scope}")?;
            }
            writeln!(f, "]")?;
        }

        Ok(())
    }
}
