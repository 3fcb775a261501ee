use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, LimoneResult};
use crate::grammars::{Grammar, MatchObject, ROOT_RULE_ID, Rule};
use crate::node::Node;
use crate::registry::Registry;

use cache::{GrammarHost, RuleRef};
use captures::build_capture_nodes;

mod cache;
mod captures;

/// Iteration budget shared by the driver loop and the region end-search
/// loops. Running out means the rule set can match without ever advancing
/// the cursor, which is a grammar defect.
const MAX_ITERATIONS: usize = 10_000;

const ROOT_REF: RuleRef = RuleRef {
    host: 0,
    rule: ROOT_RULE_ID,
};

/// A single-use parse of one text with one grammar.
///
/// The parser owns all mutable match state (cached results, pruned child
/// sets, search cursors), so the `Grammar` and `Registry` behind the `Arc`s
/// can be shared freely with other parsers running in parallel.
pub struct Parser {
    /// Grammars in play: the one the parse started with, plus one entry for
    /// each externally included grammar, loaded on first reference
    hosts: Vec<GrammarHost>,
    /// Include target -> host index, `None` for targets that failed to load
    externals: HashMap<String, Option<usize>>,
    registry: Arc<Registry>,
    text: Arc<str>,
    budget: usize,
    include_depth: usize,
}

impl Parser {
    pub fn new(grammar: Arc<Grammar>, registry: Arc<Registry>, text: &str) -> Self {
        Self {
            hosts: vec![GrammarHost::new(grammar)],
            externals: HashMap::new(),
            registry,
            text: Arc::from(text),
            budget: MAX_ITERATIONS,
            include_depth: 0,
        }
    }

    /// Parses the whole buffer into a scope tree rooted at a node named
    /// after the grammar's scope, spanning the input.
    ///
    /// Text between and after matches is simply not represented by a node;
    /// callers treat those gaps as unscoped. Node ranges are character
    /// indices into the text this parser was built with.
    pub fn parse(&mut self) -> LimoneResult<Node> {
        let text = Arc::clone(&self.text);
        let mut root = Node::new(self.hosts[0].grammar.scope_name.clone(), 0..0);
        self.budget = MAX_ITERATIONS;

        let mut pos = 0;
        while pos < text.len() && self.budget > 0 {
            self.budget -= 1;
            let Some((winner, mo)) = self.match_cache(ROOT_REF, &text, pos) else {
                break;
            };
            // a match beyond the next line break restarts the scan at the
            // start of the line it belongs to
            if let Some(offset) = text[pos..].find(['\n', '\r']) {
                let nl = pos + offset;
                if nl < mo.start() {
                    pos = nl;
                    let bytes = text.as_bytes();
                    while pos < text.len() && (bytes[pos] == b'\n' || bytes[pos] == b'\r') {
                        pos += 1;
                    }
                    continue;
                }
            }
            let node = self.create_node(winner, &text, &mo)?;
            pos = node.range.end;
            root.append(node);
        }
        if self.budget == 0 {
            return Err(Error::IterationLimit(MAX_ITERATIONS));
        }

        // search offsets are bytes into the UTF-8 text; the caller gets
        // character indices
        if !text.is_empty() {
            let mut lut = vec![0usize; text.len() + 1];
            let mut chars = 0;
            for (byte_index, _) in text.char_indices() {
                lut[byte_index] = chars;
                chars += 1;
            }
            lut[text.len()] = chars;
            patch(&lut, &mut root);
            root.range = 0..chars;
        }
        root.update_range();
        Ok(root)
    }

    /// Builds the node for a matched rule: its captures, and for a region
    /// rule everything up to (and including) its end match.
    fn create_node(&mut self, r: RuleRef, text: &str, mo: &MatchObject) -> LimoneResult<Node> {
        let grammar = Arc::clone(&self.hosts[r.host].grammar);
        let rule = grammar.rule(r.rule);
        let mut node = Node::new(rule.name().unwrap_or_default(), mo.start()..mo.end());

        match rule {
            Rule::Match(rule) => {
                build_capture_nodes(mo, &mut node, &rule.captures);
            }
            Rule::BeginEnd(rule) => {
                let begin_table = if rule.begin_captures.is_empty() {
                    &rule.captures
                } else {
                    &rule.begin_captures
                };
                build_capture_nodes(mo, &mut node, begin_table);

                if let Some(end_regex) = &rule.end {
                    let mut found = false;
                    let mut search_pos = node.range.end;
                    let mut close = text.len();
                    while search_pos < text.len() {
                        if self.budget == 0 {
                            return Err(Error::IterationLimit(MAX_ITERATIONS));
                        }
                        self.budget -= 1;

                        let mut scan = self.hosts[r.host].cache[r.rule.as_index()].end_scan;
                        let end_match = end_regex.find(text, search_pos, &mut scan);
                        self.hosts[r.host].cache[r.rule.as_index()].end_scan = scan;

                        let Some(end_match) = end_match else {
                            close = if found {
                                search_pos
                            } else {
                                // no end anywhere: close the region at the
                                // end of the line instead of swallowing the
                                // rest of the input
                                match text[search_pos..].find('\n') {
                                    Some(nl) => search_pos + nl,
                                    None => text.len(),
                                }
                            };
                            break;
                        };
                        close = end_match.end();

                        // nested rules may still apply before the end match
                        if let Some((child_rule, child_mo)) = self.first_match(r, text, search_pos)
                        {
                            if child_mo.start() < end_match.start()
                                || (child_mo.start() == end_match.start()
                                    && node.range.start == node.range.end)
                            {
                                found = true;
                                let child = self.create_node(child_rule, text, &child_mo)?;
                                search_pos = child.range.end;
                                node.append(child);
                                continue;
                            }
                        }

                        let end_table = if rule.end_captures.is_empty() {
                            &rule.captures
                        } else {
                            &rule.end_captures
                        };
                        build_capture_nodes(&end_match, &mut node, end_table);
                        break;
                    }
                    node.range.end = close;
                }
            }
            Rule::Include(_) | Rule::Alternation(_) => {}
        }

        node.update_range();
        Ok(node)
    }

    /// The text the parser was built with
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text covered by a character range, clamped to the input
    pub fn data(&self, a: usize, b: usize) -> String {
        self.text
            .chars()
            .skip(a)
            .take(b.saturating_sub(a))
            .collect()
    }
}

fn patch(lut: &[usize], node: &mut Node) {
    node.range.start = lut[node.range.start];
    node.range.end = lut[node.range.end];
    for child in &mut node.children {
        patch(lut, child);
    }
}
