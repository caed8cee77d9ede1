//! The line scanner: turns (grammar, source text) into scope-tagged tokens.
//!
//! Scanning is a pure left-to-right sweep over one line at a time. At every
//! position the active rule set is evaluated with ordered alternation: the
//! earliest-starting match wins, declaration order breaks ties, and the
//! innermost open region's end pattern takes part ahead of its nested rules
//! unless the region opted into `applyEndPatternLast`. Scanning never fails;
//! text no rule accounts for is simply left untagged.

use std::ops::Range;

use crate::grammar::{Grammar, Rule, RuleId};
use crate::scope::Scope;

mod stack;

pub use stack::{RegionFrame, ScanState};

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Byte span within the line (start inclusive, end exclusive, 0-based)
    pub span: Range<usize>,
    /// Scope names ordered from outermost enclosing region to the token's
    /// own scope, which is always last. Never empty.
    pub scopes: Vec<Scope>,
}

impl Token {
    /// The token's own scope name
    pub fn scope(&self) -> Scope {
        *self.scopes.last().expect("token scopes never empty")
    }

    /// The enclosing region scopes, outermost first, without the token's
    /// own scope
    pub fn scope_path(&self) -> &[Scope] {
        &self.scopes[..self.scopes.len() - 1]
    }
}

/// Small wrapper so we only produce valid tokens: spans stay contiguous,
/// empty spans and untagged spans emit nothing but still advance.
#[derive(Debug, Clone, Default)]
struct TokenAccumulator {
    tokens: Vec<Token>,
    /// Position up to which tokens have been generated
    last_end_pos: usize,
}

impl TokenAccumulator {
    fn produce(&mut self, end_pos: usize, scopes: &[Scope]) {
        if end_pos <= self.last_end_pos {
            return;
        }

        // An empty scope path means top-level text no rule matched; the gap
        // is left untagged rather than emitted as a token.
        if !scopes.is_empty() {
            self.tokens.push(Token {
                span: self.last_end_pos..end_pos,
                scopes: scopes.to_vec(),
            });
        }

        self.last_end_pos = end_pos;
    }
}

/// What to do with the winning candidate at a scan position
#[derive(Debug, Copy, Clone, PartialEq)]
enum Action {
    /// The innermost region's end pattern matched: pop it
    Close,
    /// A single-line rule matched: emit and move on
    Emit(RuleId),
    /// A region's begin pattern matched: push it
    Open(RuleId),
}

#[derive(Debug, Copy, Clone)]
struct Candidate {
    start: usize,
    end: usize,
    action: Action,
}

/// Scans source text against one grammar.
///
/// Holds only a shared reference to the grammar, so any number of
/// tokenizers (one per document) can run concurrently against the same
/// grammar value. All per-document state lives in the [`ScanState`] threaded
/// through [`Tokenizer::scan_line`].
#[derive(Debug)]
pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Tokenize one line, resuming from `state` and returning the state to
    /// resume the next line with.
    ///
    /// Total over all input: a line can never fail to scan, and an
    /// end-of-line with regions still open just carries them forward.
    pub fn scan_line(&self, mut state: ScanState, line: &str) -> (Vec<Token>, ScanState) {
        let mut acc = TokenAccumulator::default();
        let mut pos = 0;

        loop {
            let Some(candidate) = self.find_candidate(&state, line, pos) else {
                // Remainder of the line: untagged at top level, tagged with
                // the region scope inside an open region.
                acc.produce(line.len(), state.scopes());
                break;
            };

            #[cfg(feature = "debug")]
            log::debug!(
                "[scan_line] {:?} at {}..{} => {:?}",
                candidate.action,
                candidate.start,
                candidate.end,
                &line[candidate.start..candidate.end]
            );

            match candidate.action {
                Action::Close => {
                    let scopes = state
                        .top()
                        .expect("close candidate without open region")
                        .scopes
                        .clone();
                    acc.produce(candidate.start, &scopes);
                    // The closing delimiter keeps the region's scope
                    acc.produce(candidate.end, &scopes);
                    state.pop();
                }
                Action::Emit(id) => {
                    acc.produce(candidate.start, state.scopes());
                    let Rule::Match(rule) = self.grammar.rule(id) else {
                        unreachable!("emit action for a region rule")
                    };
                    let mut scopes = state.scopes().to_vec();
                    scopes.push(rule.scope);
                    acc.produce(candidate.end, &scopes);
                }
                Action::Open(id) => {
                    acc.produce(candidate.start, state.scopes());
                    let region = self.grammar.region(id);
                    let mut scopes = state.scopes().to_vec();
                    scopes.push(region.scope);
                    acc.produce(candidate.end, &scopes);
                    state.push(id, scopes);
                }
            }

            if candidate.end > pos {
                pos = candidate.end;
            } else if candidate.action != Action::Close {
                // Forward-progress backstop. Zero-width match/begin patterns
                // are rejected at load time so this cannot trigger for a
                // validated grammar; a zero-width Close is fine because each
                // pop shrinks the stack.
                acc.produce(line.len(), state.scopes());
                break;
            }
        }

        (acc.tokens, state)
    }

    /// Find the winning candidate at or after `pos`: smallest start offset,
    /// candidate order breaking ties. The candidate order is the innermost
    /// region's end pattern followed by its nested rules (flipped when the
    /// region applies its end pattern last), or the root rules when no
    /// region is open.
    fn find_candidate(&self, state: &ScanState, line: &str, pos: usize) -> Option<Candidate> {
        // Keep `cand` if it starts strictly earlier than the current best;
        // at equal starts the earlier-considered candidate stays. Returns
        // true once the best starts flush at the scan position, which no
        // later candidate can beat.
        fn consider(best: &mut Option<Candidate>, cand: Candidate, pos: usize) -> bool {
            let better = match *best {
                Some(b) => cand.start < b.start,
                None => true,
            };
            if better {
                *best = Some(cand);
            }
            best.is_some_and(|b| b.start == pos)
        }

        let mut best: Option<Candidate> = None;

        let rules: &[RuleId] = match state.top() {
            Some(frame) => {
                let region = self.grammar.region(frame.rule);
                if !region.apply_end_pattern_last
                    && let Some((start, end)) = region.end.find_at(line, pos)
                    && consider(
                        &mut best,
                        Candidate {
                            start,
                            end,
                            action: Action::Close,
                        },
                        pos,
                    )
                {
                    return best;
                }
                &region.patterns
            }
            None => self.grammar.root_patterns(),
        };

        for &id in rules {
            let found = match self.grammar.rule(id) {
                Rule::Match(rule) => rule
                    .pattern
                    .find_at(line, pos)
                    .map(|(start, end)| Candidate {
                        start,
                        end,
                        action: Action::Emit(id),
                    }),
                Rule::Region(region) => {
                    region
                        .begin
                        .find_at(line, pos)
                        .map(|(start, end)| Candidate {
                            start,
                            end,
                            action: Action::Open(id),
                        })
                }
            };
            if let Some(cand) = found
                && consider(&mut best, cand, pos)
            {
                return best;
            }
        }

        if let Some(frame) = state.top() {
            let region = self.grammar.region(frame.rule);
            if region.apply_end_pattern_last
                && let Some((start, end)) = region.end.find_at(line, pos)
            {
                consider(
                    &mut best,
                    Candidate {
                        start,
                        end,
                        action: Action::Close,
                    },
                    pos,
                );
            }
        }

        best
    }

    /// Tokenize a whole document, splitting on `\n` and threading the scan
    /// state across lines. Returns one token list per line plus the final
    /// state; a non-clean final state means unterminated regions at end of
    /// input, which callers may surface as a warning.
    pub fn tokenize(&self, text: &str) -> (Vec<Vec<Token>>, ScanState) {
        let mut state = ScanState::new();
        if text.is_empty() {
            return (Vec::new(), state);
        }

        let mut lines_tokens = Vec::new();
        for line in text.split('\n') {
            let (tokens, new_state) = self.scan_line(state, line);
            lines_tokens.push(tokens);
            state = new_state;
        }

        #[cfg(feature = "debug")]
        if !state.is_clean() {
            log::warn!(
                "document ended with {} unterminated region(s): {:?}",
                state.depth(),
                state.open_scopes()
            );
        }

        (lines_tokens, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::RawGrammar;

    fn grammar(json: &str) -> Grammar {
        RawGrammar::load_from_str(json).unwrap().compile().unwrap()
    }

    const STRING_GRAMMAR: &str = r##"{
        "scopeName": "source.test",
        "patterns": [ { "include": "#strings" } ],
        "repository": {
            "strings": {
                "name": "string.quoted.double",
                "begin": "\"",
                "end": "\"",
                "patterns": [
                    { "match": "\\\\.", "name": "constant.character.escape" }
                ]
            }
        }
    }"##;

    const BLOCK_COMMENT_GRAMMAR: &str = r##"{
        "scopeName": "source.test",
        "patterns": [
            { "name": "comment.block", "begin": "/\\*", "end": "\\*/" }
        ]
    }"##;

    #[test]
    fn tokenizing_twice_is_deterministic() {
        let grammar = grammar(STRING_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);
        let text = "\"a\\\"b\" plain \"open";

        let (first, first_state) = tokenizer.tokenize(text);
        let (second, second_state) = tokenizer.tokenize(text);
        assert_eq!(first, second);
        assert_eq!(first_state, second_state);
    }

    #[test]
    fn spans_partition_the_line() {
        let grammar = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [
                    { "match": "\\d+", "name": "constant.numeric" },
                    { "match": "[a-z]+", "name": "variable.other" }
                ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&grammar);

        let line = "x = 12 + foo; ";
        let (tokens, _) = tokenizer.scan_line(ScanState::new(), line);

        // Non-overlapping, in order, within the line
        let mut last_end = 0;
        for token in &tokens {
            assert!(token.span.start >= last_end);
            assert!(token.span.end <= line.len());
            assert!(token.span.start < token.span.end);
            last_end = token.span.end;
        }
        // Tokens plus untagged gaps cover exactly the matched text
        let spans: Vec<_> = tokens.iter().map(|t| t.span.clone()).collect();
        assert_eq!(spans, vec![0..1, 4..6, 9..12]);
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let longer_first = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [
                    { "match": "ab", "name": "rule.long" },
                    { "match": "a", "name": "rule.short" }
                ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&longer_first);
        let (tokens, _) = tokenizer.scan_line(ScanState::new(), "ab");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, 0..2);
        assert_eq!(tokens[0].scope().as_str(), "rule.long");

        let shorter_first = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [
                    { "match": "a", "name": "rule.short" },
                    { "match": "ab", "name": "rule.long" }
                ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&shorter_first);
        let (tokens, _) = tokenizer.scan_line(ScanState::new(), "ab");
        assert_eq!(tokens[0].span, 0..1);
        assert_eq!(tokens[0].scope().as_str(), "rule.short");
    }

    #[test]
    fn earliest_start_beats_declaration_order() {
        let grammar = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [
                    { "match": "yy", "name": "rule.later" },
                    { "match": "xx", "name": "rule.earlier" }
                ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&grammar);

        // xx starts at 2, yy at 5; xx wins despite being declared second
        let (tokens, _) = tokenizer.scan_line(ScanState::new(), "..xx.yy");
        assert_eq!(tokens[0].span, 2..4);
        assert_eq!(tokens[0].scope().as_str(), "rule.earlier");
        assert_eq!(tokens[1].span, 5..7);
        assert_eq!(tokens[1].scope().as_str(), "rule.later");
    }

    #[test]
    fn escaped_delimiter_does_not_close_the_region() {
        let grammar = grammar(STRING_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);

        // Open quote, a, backslash, quote, b - no closing quote
        let line = "\"a\\\"b";
        let (tokens, state) = tokenizer.scan_line(ScanState::new(), line);

        assert_eq!(
            tokens,
            vec![
                Token {
                    span: 0..1,
                    scopes: vec![Scope::new("string.quoted.double")],
                },
                Token {
                    span: 1..2,
                    scopes: vec![Scope::new("string.quoted.double")],
                },
                Token {
                    span: 2..4,
                    scopes: vec![
                        Scope::new("string.quoted.double"),
                        Scope::new("constant.character.escape"),
                    ],
                },
                Token {
                    span: 4..5,
                    scopes: vec![Scope::new("string.quoted.double")],
                },
            ]
        );
        // The escaped quote did not terminate the string
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn escaped_delimiter_then_real_close() {
        let grammar = grammar(STRING_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);

        let (tokens, state) = tokenizer.scan_line(ScanState::new(), "\"a\\\"b\"");
        assert!(state.is_clean());
        // Escape token in the middle, closing quote at the end
        assert_eq!(tokens.last().unwrap().span, 5..6);
        assert!(
            tokens
                .iter()
                .any(|t| t.span == (2..4) && t.scope().as_str() == "constant.character.escape")
        );
    }

    #[test]
    fn region_persists_across_lines() {
        let grammar = grammar(BLOCK_COMMENT_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);
        let comment = Scope::new("comment.block");

        let mut state = ScanState::new();

        let (tokens, new_state) = tokenizer.scan_line(state, "/* start");
        state = new_state;
        assert_eq!(state.depth(), 1);
        assert_eq!(tokens[0].span, 0..2);
        assert!(tokens.iter().all(|t| t.scopes == vec![comment]));
        assert_eq!(tokens.last().unwrap().span.end, 8);

        let (tokens, new_state) = tokenizer.scan_line(state, "middle");
        state = new_state;
        assert_eq!(state.depth(), 1);
        // The whole interior line is one comment token
        assert_eq!(tokens, vec![Token { span: 0..6, scopes: vec![comment] }]);

        let (tokens, new_state) = tokenizer.scan_line(state, "end */");
        state = new_state;
        assert!(state.is_clean());
        assert!(tokens.iter().all(|t| t.scopes == vec![comment]));
        assert_eq!(tokens.last().unwrap().span, 4..6);
    }

    #[test]
    fn top_level_gaps_are_untagged() {
        let grammar = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [ { "match": "b+", "name": "rule.b" } ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&grammar);

        let (tokens, _) = tokenizer.scan_line(ScanState::new(), "aa bb aa");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, 3..5);
    }

    #[test]
    fn nested_regions_close_innermost_first() {
        let grammar = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [ { "include": "#outer" } ],
                "repository": {
                    "outer": { "name": "region.outer", "begin": "\\(", "end": "\\)",
                               "patterns": [ { "include": "#inner" } ] },
                    "inner": { "name": "region.inner", "begin": "\\[", "end": "\\]" }
                }
            }"##,
        );
        let tokenizer = Tokenizer::new(&grammar);
        let outer = Scope::new("region.outer");
        let inner = Scope::new("region.inner");

        let (tokens, state) = tokenizer.scan_line(ScanState::new(), "([x])");
        assert!(state.is_clean());
        assert_eq!(
            tokens,
            vec![
                Token { span: 0..1, scopes: vec![outer] },
                Token { span: 1..2, scopes: vec![outer, inner] },
                Token { span: 2..3, scopes: vec![outer, inner] },
                Token { span: 3..4, scopes: vec![outer, inner] },
                Token { span: 4..5, scopes: vec![outer] },
            ]
        );
    }

    #[test]
    fn end_pattern_wins_ties_by_default() {
        // End pattern and the nested rule both match at offset 1
        let grammar = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [
                    { "name": "region.r", "begin": "<", "end": "x",
                      "patterns": [ { "match": "x.", "name": "rule.nested" } ] }
                ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&grammar);

        let (tokens, state) = tokenizer.scan_line(ScanState::new(), "<xy");
        assert!(state.is_clean());
        assert_eq!(tokens[1].span, 1..2);
        assert_eq!(tokens[1].scope().as_str(), "region.r");
    }

    #[test]
    fn apply_end_pattern_last_flips_the_tie() {
        let grammar = grammar(
            r##"{
                "scopeName": "source.test",
                "patterns": [
                    { "name": "region.r", "begin": "<", "end": "x",
                      "applyEndPatternLast": true,
                      "patterns": [ { "match": "x.", "name": "rule.nested" } ] }
                ]
            }"##,
        );
        let tokenizer = Tokenizer::new(&grammar);

        let (tokens, state) = tokenizer.scan_line(ScanState::new(), "<xy");
        // The nested rule consumed "xy"; the end pattern never matched
        assert_eq!(state.depth(), 1);
        assert_eq!(tokens[1].span, 1..3);
        assert_eq!(tokens[1].scope().as_str(), "rule.nested");
    }

    #[test]
    fn tokenize_reports_unterminated_regions() {
        let grammar = grammar(BLOCK_COMMENT_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);

        let (lines, state) = tokenizer.tokenize("before\n/* open\nstill inside");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_empty());
        assert_eq!(state.depth(), 1);
        assert_eq!(state.open_scopes(), vec![Scope::new("comment.block")]);
    }

    #[test]
    fn tokenize_empty_text() {
        let grammar = grammar(BLOCK_COMMENT_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);

        let (lines, state) = tokenizer.tokenize("");
        assert!(lines.is_empty());
        assert!(state.is_clean());
    }

    #[test]
    fn scope_accessors_split_name_and_path() {
        let grammar = grammar(STRING_GRAMMAR);
        let tokenizer = Tokenizer::new(&grammar);

        let (tokens, _) = tokenizer.scan_line(ScanState::new(), "\"\\n\"");
        let escape = tokens
            .iter()
            .find(|t| t.scope().as_str() == "constant.character.escape")
            .unwrap();
        assert_eq!(escape.scope_path(), &[Scope::new("string.quoted.double")]);
    }
}
