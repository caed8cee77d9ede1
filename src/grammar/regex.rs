use std::fmt;

/// A compiled matching pattern, keeping the source text around for
/// diagnostics.
///
/// Patterns are compiled eagerly while the grammar loads so that every
/// pattern error surfaces before any scanning starts; nothing is compiled
/// during tokenization.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: regex::Regex,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        let regex = regex::Regex::new(source)?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this pattern could produce a zero-width match anywhere.
    ///
    /// Decided structurally from the parsed pattern rather than by probing
    /// the empty string: assertions like `\b` match zero-width mid-line but
    /// not on `""`, and such a rule would stall the scanner just the same.
    /// A minimum match length of zero means some input has a zero-width
    /// match.
    pub fn can_match_empty(&self) -> bool {
        regex_syntax::parse(&self.source)
            .ok()
            .is_some_and(|hir| hir.properties().minimum_len() == Some(0))
    }

    /// Earliest match starting at or after `pos`. Anchors keep their meaning
    /// relative to the whole line: `^` only matches at offset 0 even when
    /// `pos > 0`.
    pub fn find_at(&self, line: &str, pos: usize) -> Option<(usize, usize)> {
        self.regex
            .find_at(line, pos)
            .map(|m| (m.start(), m.end()))
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_at_skips_earlier_text() {
        let pattern = Pattern::compile(r"\d+").unwrap();
        assert_eq!(pattern.find_at("ab 12 cd 34", 4), Some((4, 5)));
        assert_eq!(pattern.find_at("ab 12 cd 34", 5), Some((9, 11)));
    }

    #[test]
    fn caret_only_matches_line_start() {
        let pattern = Pattern::compile(r"^--").unwrap();
        assert_eq!(pattern.find_at("-- note", 0), Some((0, 2)));
        assert_eq!(pattern.find_at("x -- note", 2), None);
    }

    #[test]
    fn zero_width_check() {
        assert!(Pattern::compile(r"a*").unwrap().can_match_empty());
        assert!(Pattern::compile(r"").unwrap().can_match_empty());
        assert!(!Pattern::compile(r"a+").unwrap().can_match_empty());
        assert!(!Pattern::compile(r"--.*").unwrap().can_match_empty());
    }

    #[test]
    fn zero_width_check_catches_bare_assertions() {
        // These never match the empty string but are zero-width elsewhere
        assert!(Pattern::compile(r"\b").unwrap().can_match_empty());
        assert!(Pattern::compile(r"\B").unwrap().can_match_empty());
        assert!(Pattern::compile(r"^").unwrap().can_match_empty());
        assert!(Pattern::compile(r"(?:\b|x)").unwrap().can_match_empty());
        // An assertion next to real width is fine
        assert!(!Pattern::compile(r"\bif\b").unwrap().can_match_empty());
    }
}
