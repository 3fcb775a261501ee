//! A TextMate grammar engine: loads `.tmLanguage`/JSON grammars and parses
//! text into a nested scope tree, the structure a text editor queries to
//! answer "what scope covers this offset" when highlighting.

mod error;
mod grammars;
mod node;
mod parser;
mod registry;

pub use error::Error;
pub use grammars::{
    AlternationRule, BeginEndRule, Capture, CaptureTable, Grammar, Include, IncludeRule,
    MatchObject, MatchRule, RawCapture, RawGrammar, RawRule, Regex, Rule, RuleId, ScanState,
};
pub use node::Node;
pub use parser::Parser;
pub use registry::Registry;
