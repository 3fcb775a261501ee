use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::LimoneResult;
use crate::grammars::raw::{RawCapture, RawGrammar, RawRule};
use crate::grammars::regex::Regex;

/// Index of a rule in its grammar's arena
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuleId(u16);

impl RuleId {
    pub(crate) fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// The root rule of every grammar: the alternation over its top-level
/// patterns
pub(crate) const ROOT_RULE_ID: RuleId = RuleId(0);

/// An (index, scope name) pair of a capture table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub index: usize,
    pub name: String,
}

/// A sparse capture-group table, kept sorted by group index ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureTable(Vec<Capture>);

impl CaptureTable {
    fn from_raw(raw: BTreeMap<String, RawCapture>) -> Self {
        let mut captures: Vec<Capture> = raw
            .into_iter()
            .filter_map(|(key, capture)| match key.parse() {
                Ok(index) => Some(Capture {
                    index,
                    name: capture.name.unwrap_or_default(),
                }),
                Err(_) => {
                    log::debug!("ignoring non-numeric capture key {:?}", key);
                    None
                }
            })
            .collect();
        captures.sort_by_key(|c| c.index);
        CaptureTable(captures)
    }

    #[cfg(test)]
    pub(crate) fn from_entries(mut entries: Vec<Capture>) -> Self {
        entries.sort_by_key(|c| c.index);
        CaptureTable(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capture> {
        self.0.iter()
    }
}

/// A parsed `include` reference, resolved at match time
///
/// Allowed values:
/// * repository reference, e.g. `#entity.name.class`
/// * scope name of another grammar, e.g. `source.ts`
/// * path of another grammar file
/// * `$`-directives (`$self`, `$base`), which are not supported and
///   degrade to "never matches"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Include {
    Local(String),
    External(String),
    Directive(String),
}

impl From<&str> for Include {
    fn from(value: &str) -> Self {
        match value.as_bytes().first() {
            Some(b'#') => Include::Local(value[1..].to_string()),
            Some(b'$') => Include::Directive(value.to_string()),
            _ => Include::External(value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pub name: Option<String>,
    pub regex: Regex,
    pub captures: CaptureTable,
}

#[derive(Debug, Clone)]
pub struct BeginEndRule {
    pub name: Option<String>,
    pub begin: Regex,
    /// A region without an end pattern closes with its begin match
    pub end: Option<Regex>,
    /// Fallback table for both the begin and the end match
    pub captures: CaptureTable,
    pub begin_captures: CaptureTable,
    pub end_captures: CaptureTable,
    pub patterns: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub struct IncludeRule {
    pub reference: Include,
}

#[derive(Debug, Clone)]
pub struct AlternationRule {
    pub name: Option<String>,
    pub patterns: Vec<RuleId>,
}

/// One grammar production. The variant decides how the rule is searched:
/// a `match` regex, a `begin`/`end` region, an `include` reference, or a
/// plain ordered alternation over children.
#[derive(Debug, Clone)]
pub enum Rule {
    Match(MatchRule),
    BeginEnd(BeginEndRule),
    Include(IncludeRule),
    Alternation(AlternationRule),
}

impl Rule {
    pub fn name(&self) -> Option<&str> {
        match self {
            Rule::Match(r) => r.name.as_deref(),
            Rule::BeginEnd(r) => r.name.as_deref(),
            Rule::Include(_) => None,
            Rule::Alternation(r) => r.name.as_deref(),
        }
    }

    /// The child rules scanned by the first-match alternation
    pub(crate) fn subpatterns(&self) -> &[RuleId] {
        match self {
            Rule::BeginEnd(r) => &r.patterns,
            Rule::Alternation(r) => &r.patterns,
            Rule::Match(_) | Rule::Include(_) => &[],
        }
    }
}

/// The compiled, logically immutable form of a grammar: a rule arena with
/// integer cross-references plus the repository lookup used by `#key`
/// includes.
///
/// A `Grammar` holds no match state; all of that lives in the parser, so a
/// single instance can be shared by any number of concurrent parses.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub name: String,
    pub scope_name: String,
    pub file_types: Vec<String>,
    pub first_line_match: Option<String>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) repository: HashMap<String, RuleId>,
}

impl Grammar {
    /// Reads and compiles a grammar file. Prefer `Registry::resolve_by_path`
    /// when the grammar participates in cross-grammar includes.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> LimoneResult<Self> {
        Ok(RawGrammar::load_from_file(path)?.compile())
    }

    pub(crate) fn from_raw(raw: RawGrammar) -> Self {
        let mut grammar = Self {
            name: raw.name,
            scope_name: raw.scope_name,
            file_types: raw.file_types,
            first_line_match: raw.first_line_match,
            rules: Vec::new(),
            repository: HashMap::new(),
        };

        // rule 0 is the root alternation; reserve its spot before its
        // children claim ids
        grammar.rules.push(Rule::Alternation(AlternationRule {
            name: None,
            patterns: Vec::new(),
        }));
        let root_patterns = raw
            .patterns
            .into_iter()
            .map(|p| grammar.compile_rule(p))
            .collect();
        grammar.rules[ROOT_RULE_ID.as_index()] = Rule::Alternation(AlternationRule {
            name: None,
            patterns: root_patterns,
        });

        for (key, rule) in raw.repository {
            let id = grammar.compile_rule(rule);
            grammar.repository.insert(key, id);
        }

        grammar
    }

    fn compile_rule(&mut self, raw: RawRule) -> RuleId {
        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        // a rule populating several of match/begin/include keeps only the
        // highest-priority shape
        let rule = if let Some(pattern) = raw.match_ {
            Rule::Match(MatchRule {
                name,
                regex: Regex::new(pattern),
                captures: CaptureTable::from_raw(raw.captures),
            })
        } else if let Some(begin) = raw.begin {
            let patterns = raw
                .patterns
                .into_iter()
                .map(|p| self.compile_rule(p))
                .collect();
            Rule::BeginEnd(BeginEndRule {
                name,
                begin: Regex::new(begin),
                end: raw.end.map(Regex::new),
                captures: CaptureTable::from_raw(raw.captures),
                begin_captures: CaptureTable::from_raw(raw.begin_captures),
                end_captures: CaptureTable::from_raw(raw.end_captures),
                patterns,
            })
        } else if let Some(include) = raw.include {
            Rule::Include(IncludeRule {
                reference: include.as_str().into(),
            })
        } else {
            let patterns = raw
                .patterns
                .into_iter()
                .map(|p| self.compile_rule(p))
                .collect();
            Rule::Alternation(AlternationRule { name, patterns })
        };

        let id = RuleId(self.rules.len() as u16);
        self.rules.push(rule);
        id
    }

    pub(crate) fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.as_index()]
    }

    pub(crate) fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
