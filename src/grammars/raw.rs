use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::LimoneResult;
use crate::grammars::compiled::Grammar;

/// A capture group entry, assigning a scope name to matched text
///
/// # Examples
/// ```json
/// {
///   "1": { "name": "entity.name.function.js" },
///   "2": { "name": "punctuation.definition.parameters.begin.js" }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCapture {
    /// The scope name to assign to the captured text
    pub name: Option<String>,
}

/// One production as it appears in a grammar file.
///
/// Everything is optional; which fields are populated decides what kind of
/// rule this compiles to, in the order `match` > `begin` > `include` >
/// plain alternation over `patterns`.
///
/// # Examples
/// ```json
/// {
///   "match": "\\b(function)\\s+(\\w+)\\s*\\(",
///   "name": "meta.function.declaration.js",
///   "captures": {
///     "1": { "name": "storage.type.function.js" },
///     "2": { "name": "entity.name.function.js" }
///   }
/// }
/// ```
///
/// ```json
/// {
///   "name": "string.quoted.double.js",
///   "begin": "\"",
///   "end": "\"",
///   "patterns": [
///     { "match": "\\\\.", "name": "constant.character.escape.js" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all(deserialize = "camelCase"))]
pub struct RawRule {
    /// Optional scope name for the matched region
    pub name: Option<String>,
    /// Reference to another rule or grammar:
    /// - "#name" - repository entry in the same grammar
    /// - "source.lang" or a file path - another grammar, via the registry
    /// - "$self"/"$base" - unsupported directives, degrade to "never matches"
    pub include: Option<String>,
    /// Single-shot regular expression
    #[serde(rename(deserialize = "match"))]
    pub match_: Option<String>,
    /// Regular expression opening a region rule
    pub begin: Option<String>,
    /// Regular expression closing a region rule; a region without one closes
    /// with its begin match
    pub end: Option<String>,
    /// Capture groups of the `match` regex, also the fallback table for
    /// `begin`/`end` when the specific tables below are absent.
    /// Key is the capture group number ("1", "2", ...)
    pub captures: BTreeMap<String, RawCapture>,
    /// Capture groups specifically for the `begin` match
    pub begin_captures: BTreeMap<String, RawCapture>,
    /// Capture groups specifically for the `end` match
    pub end_captures: BTreeMap<String, RawCapture>,
    /// Child rules: the alternation body of a plain rule, or the rules that
    /// may match inside a `begin`/`end` region
    pub patterns: Vec<RawRule>,
}

/// Top-level structure of a grammar file, either JSON or an XML property
/// list (`.tmLanguage`)
///
/// # Examples
/// ```json
/// {
///   "name": "JavaScript",
///   "scopeName": "source.js",
///   "fileTypes": ["js", "jsx", "mjs"],
///   "firstLineMatch": "^#!.*\\bnode\\b",
///   "patterns": [
///     { "include": "#statements" }
///   ],
///   "repository": {
///     "statements": { "patterns": [{ "include": "#keywords" }] }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all(deserialize = "camelCase"))]
pub struct RawGrammar {
    /// Human-readable name of the language
    pub name: String,
    /// Unique identifier for this grammar's scope
    /// Example: "source.js", "text.html.markdown"
    pub scope_name: String,
    /// File extensions this grammar applies to
    pub file_types: Vec<String>,
    /// Optional regex to identify files by their first line content
    pub first_line_match: Option<String>,
    /// Root rules, applied in order when tokenizing
    pub patterns: Vec<RawRule>,
    /// Named rules that can be referenced with "#name" includes
    pub repository: HashMap<String, RawRule>,
}

impl RawGrammar {
    /// Reads a grammar file, sniffing the property-list and JSON formats
    /// from the content. Malformed files are an error, never a partial
    /// grammar.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> LimoneResult<Self> {
        let data = fs::read(&path)?;
        let trimmed = data
            .strip_prefix(b"\xef\xbb\xbf")
            .unwrap_or(&data)
            .trim_ascii_start();
        if trimmed.starts_with(b"{") || trimmed.starts_with(b"[") {
            Self::from_json_bytes(&data)
        } else {
            Self::from_plist(&data)
        }
    }

    pub fn from_json(data: &str) -> LimoneResult<Self> {
        Ok(serde_json::from_str(data)?)
    }

    fn from_json_bytes(data: &[u8]) -> LimoneResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn from_plist(data: &[u8]) -> LimoneResult<Self> {
        Ok(plist::from_bytes(data)?)
    }

    /// Compile this raw grammar into its arena form
    pub fn compile(self) -> Grammar {
        Grammar::from_raw(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_fields_deserialize_from_json() {
        let rule: RawRule = serde_json::from_str(
            r#"{
                "name": "string.quoted.double",
                "begin": "\"",
                "end": "\"",
                "beginCaptures": { "0": { "name": "punctuation.begin" } },
                "endCaptures": { "0": { "name": "punctuation.end" } },
                "patterns": [{ "match": "\\\\.", "name": "constant.escape" }]
            }"#,
        )
        .unwrap();
        assert_eq!(rule.begin.as_deref(), Some("\""));
        assert_eq!(rule.end.as_deref(), Some("\""));
        assert_eq!(
            rule.begin_captures["0"].name.as_deref(),
            Some("punctuation.begin")
        );
        assert_eq!(rule.patterns.len(), 1);
        assert_eq!(rule.patterns[0].match_.as_deref(), Some("\\\\."));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let grammar: RawGrammar = serde_json::from_str(
            r#"{
                "name": "Toy",
                "scopeName": "source.toy",
                "uuid": "F5A4FF68-7E27-4D4A-B7E5-2C7C2A0B4EF8",
                "foldingStartMarker": "\\{",
                "patterns": []
            }"#,
        )
        .unwrap();
        assert_eq!(grammar.scope_name, "source.toy");
    }

    #[test]
    fn loads_a_json_grammar_file() {
        let grammar = RawGrammar::load_from_file("testdata/toy.json").unwrap();
        assert_eq!(grammar.name, "Toy");
        assert_eq!(grammar.scope_name, "source.toy");
        assert_eq!(grammar.file_types, vec!["toy"]);
        assert!(grammar.repository.contains_key("block"));
    }

    #[test]
    fn loads_a_plist_grammar_file() {
        let grammar = RawGrammar::load_from_file("testdata/toy.tmLanguage").unwrap();
        assert_eq!(grammar.name, "Toy Plist");
        assert_eq!(grammar.scope_name, "text.toy.plist");
        assert!(!grammar.patterns.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(RawGrammar::load_from_file("testdata/nope.json").is_err());
    }
}
