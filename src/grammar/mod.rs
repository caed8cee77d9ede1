mod compiled;
mod raw;
mod regex;

pub use compiled::{Grammar, MatchRule, RegionRule, Rule, RuleId};
pub use raw::RawGrammar;
pub use self::regex::Pattern;
