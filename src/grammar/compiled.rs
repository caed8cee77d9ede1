use std::collections::BTreeMap;

use crate::error::GrammarError;
use crate::grammar::raw::{RawGrammar, RawPattern, RawRepositoryEntry};
use crate::grammar::regex::Pattern;
use crate::scope::Scope;

/// Index of a rule in the grammar's rule arena
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuleId(u16);

impl RuleId {
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// A single-line rule: one pattern, one scope
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub scope: Scope,
    pub pattern: Pattern,
}

/// A begin/end delimited region, possibly spanning multiple lines.
///
/// `patterns` holds the nested rules evaluated while the region is open,
/// with every include already resolved to rule ids at compile time.
#[derive(Debug, Clone)]
pub struct RegionRule {
    pub scope: Scope,
    pub begin: Pattern,
    pub end: Pattern,
    pub apply_end_pattern_last: bool,
    pub patterns: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Match(MatchRule),
    Region(RegionRule),
}

/// A validated, immutable grammar.
///
/// Rules live in a flat arena and reference each other by [`RuleId`]; no
/// lookup by name happens during scanning. The value is read-only and can be
/// shared across concurrent tokenization sessions.
#[derive(Debug, Clone)]
pub struct Grammar {
    scope_name: String,
    file_types: Vec<String>,
    rules: Vec<Rule>,
    root: Vec<RuleId>,
}

impl Grammar {
    pub fn from_raw(raw: RawGrammar) -> Result<Self, GrammarError> {
        Compiler::default().compile(raw)
    }

    /// The grammar's own identifier, e.g. `source.icelang`
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    /// File extensions this grammar applies to
    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    /// Whether a file extension (with or without a leading dot) is one of
    /// the grammar's declared file types
    pub fn matches_file_type(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.file_types
            .iter()
            .any(|ft| ft.eq_ignore_ascii_case(extension))
    }

    /// The rules active when no region is open, includes already expanded
    /// in declaration order
    pub fn root_patterns(&self) -> &[RuleId] {
        &self.root
    }

    pub(crate) fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.as_index()]
    }

    /// The region behind `id`. Only called with ids taken from the region
    /// stack, which never holds match rules.
    pub(crate) fn region(&self, id: RuleId) -> &RegionRule {
        match &self.rules[id.as_index()] {
            Rule::Region(region) => region,
            Rule::Match(_) => unreachable!("region stack holds a match rule"),
        }
    }
}

/// One slot of an unresolved pattern list: either a rule that was compiled
/// in place, or an include still to be expanded
enum Entry {
    Rule(RuleId),
    Include(String),
}

#[derive(Default)]
struct Compiler {
    rules: Vec<Rule>,
    /// Per-group entry lists, flattened into rule ids once every group exists
    groups: BTreeMap<String, Vec<Entry>>,
    /// Regions whose nested pattern lists still contain includes,
    /// with the group name they were declared in for error reporting
    pending: Vec<(RuleId, String, Vec<Entry>)>,
}

impl Compiler {
    fn compile(mut self, raw: RawGrammar) -> Result<Grammar, GrammarError> {
        // First pass: compile every concrete rule, leaving includes symbolic
        for (name, entry) in raw.repository {
            let entries = match entry {
                RawRepositoryEntry::DirectArray(patterns) => {
                    self.compile_patterns(&name, patterns)?
                }
                RawRepositoryEntry::Pattern(pattern) => self.compile_pattern(&name, pattern)?,
            };
            if entries.is_empty() {
                return Err(GrammarError::EmptyGroup { group: name });
            }
            self.groups.insert(name, entries);
        }

        let root_entries = self.compile_patterns("patterns", raw.patterns)?;
        if root_entries.is_empty() {
            return Err(GrammarError::EmptyGroup {
                group: "patterns".to_owned(),
            });
        }

        // Second pass: every group is known, expand includes into rule ids
        let root = flatten("patterns", &root_entries, &self.groups)?;
        for (id, group, entries) in std::mem::take(&mut self.pending) {
            let resolved = flatten(&group, &entries, &self.groups)?;
            match &mut self.rules[id.as_index()] {
                Rule::Region(region) => region.patterns = resolved,
                Rule::Match(_) => unreachable!("pending entry for a match rule"),
            }
        }

        Ok(Grammar {
            scope_name: raw.scope_name,
            file_types: raw.file_types,
            rules: self.rules,
            root,
        })
    }

    fn compile_patterns(
        &mut self,
        group: &str,
        patterns: Vec<RawPattern>,
    ) -> Result<Vec<Entry>, GrammarError> {
        let mut out = Vec::new();
        for pattern in patterns {
            out.extend(self.compile_pattern(group, pattern)?);
        }
        Ok(out)
    }

    fn compile_pattern(
        &mut self,
        group: &str,
        pattern: RawPattern,
    ) -> Result<Vec<Entry>, GrammarError> {
        match pattern {
            RawPattern::Match(m) => {
                let pattern = self.compile_regex(group, &m.match_, true)?;
                let id = self.push_rule(Rule::Match(MatchRule {
                    scope: Scope::new(&m.name),
                    pattern,
                }))?;
                Ok(vec![Entry::Rule(id)])
            }
            RawPattern::Region(r) => {
                let begin = self.compile_regex(group, &r.begin, true)?;
                // A zero-width end cannot stall the scanner: closing pops a
                // frame and the stack is finite, so only begin/match
                // patterns are held to the zero-width rule.
                let end = self.compile_regex(group, &r.end, false)?;
                let id = self.push_rule(Rule::Region(RegionRule {
                    scope: Scope::new(&r.name),
                    begin,
                    end,
                    apply_end_pattern_last: r.apply_end_pattern_last,
                    patterns: Vec::new(),
                }))?;
                let nested = self.compile_patterns(group, r.patterns)?;
                self.pending.push((id, group.to_owned(), nested));
                Ok(vec![Entry::Rule(id)])
            }
            RawPattern::Include(inc) => {
                let name = inc.include.trim_start_matches('#').to_owned();
                Ok(vec![Entry::Include(name)])
            }
            // Plain containers are transparent: their rules are spliced in place
            RawPattern::Group(g) => self.compile_patterns(group, g.patterns),
        }
    }

    fn compile_regex(
        &mut self,
        group: &str,
        source: &str,
        reject_zero_width: bool,
    ) -> Result<Pattern, GrammarError> {
        let pattern = Pattern::compile(source).map_err(|error| GrammarError::InvalidPattern {
            group: group.to_owned(),
            pattern: source.to_owned(),
            error,
        })?;

        if reject_zero_width && pattern.can_match_empty() {
            return Err(GrammarError::PossiblyZeroWidthPattern {
                group: group.to_owned(),
                pattern: pattern.source().to_owned(),
            });
        }

        Ok(pattern)
    }

    fn push_rule(&mut self, rule: Rule) -> Result<RuleId, GrammarError> {
        let id = u16::try_from(self.rules.len()).map_err(|_| GrammarError::TooManyRules {
            count: self.rules.len() + 1,
        })?;
        self.rules.push(rule);
        Ok(RuleId(id))
    }
}

/// Expand an entry list into plain rule ids, in declaration order.
///
/// `visiting` catches include chains that return to a group they already
/// passed through: such a chain never crosses a rule that consumes input
/// (rule boundaries stop the expansion), so it would recurse forever.
fn flatten(
    group: &str,
    entries: &[Entry],
    groups: &BTreeMap<String, Vec<Entry>>,
) -> Result<Vec<RuleId>, GrammarError> {
    let mut out = Vec::new();
    let mut visiting = Vec::new();
    flatten_into(group, entries, groups, &mut visiting, &mut out)?;
    Ok(out)
}

fn flatten_into(
    group: &str,
    entries: &[Entry],
    groups: &BTreeMap<String, Vec<Entry>>,
    visiting: &mut Vec<String>,
    out: &mut Vec<RuleId>,
) -> Result<(), GrammarError> {
    for entry in entries {
        match entry {
            Entry::Rule(id) => out.push(*id),
            Entry::Include(name) => {
                if visiting.iter().any(|v| v == name) {
                    return Err(GrammarError::IncludeCycle {
                        group: name.clone(),
                    });
                }
                let target = groups.get(name).ok_or_else(|| GrammarError::UnresolvedInclude {
                    group: group.to_owned(),
                    include: name.clone(),
                })?;
                visiting.push(name.clone());
                flatten_into(name, target, groups, visiting, out)?;
                visiting.pop();
            }
        }
    }
    Ok(())
}
