use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::grammar::compiled::Grammar;

/// A rule that matches within a single line
///
/// # Examples
/// ```json
/// {
///   "match": "\\b(if|else|match)\\b",
///   "name": "keyword.control.icelang"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawMatch {
    /// The scope name assigned to the matched text
    pub name: String,
    /// The regular expression to match against
    #[serde(rename(deserialize = "match"))]
    pub match_: String,
}

/// A rule that matches a region delimited by begin/end patterns, possibly
/// spanning multiple lines
///
/// # Examples
/// ```json
/// {
///   "name": "string.quoted.single.icelang",
///   "begin": "'",
///   "end": "'",
///   "patterns": [
///     { "match": "\\\\.", "name": "constant.character.escape.icelang" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct RawRegion {
    /// The scope name assigned to the whole region, delimiters included
    pub name: String,
    /// Regular expression matching the opening delimiter
    pub begin: String,
    /// Regular expression matching the closing delimiter
    pub end: String,
    /// Rules evaluated only while the region is open
    /// Example: escape sequences within strings
    #[serde(default)]
    pub patterns: Vec<RawPattern>,
    /// Rank the end pattern after the nested rules when both match at the
    /// same offset. Defaults to false: the end pattern is checked first.
    #[serde(default)]
    pub apply_end_pattern_last: bool,
}

/// A reference to a named repository entry
///
/// # Examples
/// ```json
/// { "include": "#comments" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawInclude {
    /// Reference to a repository entry in this grammar, written `#name`
    pub include: String,
}

/// A plain container of rules, used for repository entries that group
/// several rules under one name
#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
    pub patterns: Vec<RawPattern>,
}

/// Union of every rule shape appearing in a pattern list
///
/// The order matters for serde deserialization - variants with more required
/// fields are tried first so a region is never mistaken for a match rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPattern {
    /// Begin/end delimited region, e.g. strings and block comments
    Region(RawRegion),
    /// Reference to a repository entry
    Include(RawInclude),
    /// Single-line match, e.g. keywords and numbers
    Match(RawMatch),
    /// Container of further rules (most general, must be last)
    Group(RawGroup),
}

/// The two accepted shapes for a repository entry
///
/// # Examples
/// ```json
/// {
///   "repository": {
///     "keywords": [
///       { "match": "\\bif\\b", "name": "keyword.control.icelang" }
///     ],
///     "strings": { "name": "string.quoted.single.icelang", "begin": "'", "end": "'" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRepositoryEntry {
    /// Direct array of rules (like `"keywords": [...]`)
    DirectArray(Vec<RawPattern>),
    /// A single rule, or a `{ "patterns": [...] }` container
    Pattern(RawPattern),
}

/// Top-level structure of a grammar definition document
///
/// # Examples
/// ```json
/// {
///   "scopeName": "source.icelang",
///   "fileTypes": ["ic"],
///   "patterns": [
///     { "include": "#comments" },
///     { "include": "#strings" }
///   ],
///   "repository": {
///     "comments": { "match": "--.*", "name": "comment.line.double-dash.icelang" },
///     "strings": { "name": "string.quoted.single.icelang", "begin": "'", "end": "'" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct RawGrammar {
    /// Unique identifier for this grammar's scope
    /// Example: "source.icelang"
    pub scope_name: String,
    /// File extensions this grammar applies to
    /// Example: ["ic", "icelang"]
    #[serde(default)]
    pub file_types: Vec<String>,
    /// Root rules, applied when no region is open
    #[serde(default)]
    pub patterns: Vec<RawPattern>,
    /// Named rule groups referenced by includes
    #[serde(default)]
    pub repository: BTreeMap<String, RawRepositoryEntry>,
}

impl RawGrammar {
    pub fn load_from_str(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(&path)?;
        Ok(serde_json::from_reader(&file)?)
    }

    /// Validate and compile this raw grammar into an immutable [`Grammar`]
    pub fn compile(self) -> Result<Grammar, crate::error::GrammarError> {
        Grammar::from_raw(self)
    }
}
