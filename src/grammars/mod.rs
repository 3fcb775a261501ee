mod compiled;
mod raw;
mod regex;

pub use compiled::{
    AlternationRule, BeginEndRule, Capture, CaptureTable, Grammar, Include, IncludeRule, MatchRule,
    Rule, RuleId,
};
pub(crate) use compiled::ROOT_RULE_ID;
pub use raw::{RawCapture, RawGrammar, RawRule};
pub use regex::{MatchObject, Regex, ScanState};
