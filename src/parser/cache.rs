use std::sync::Arc;

use crate::grammars::{Grammar, Include, MatchObject, ROOT_RULE_ID, Rule, RuleId, ScanState};
use crate::parser::Parser;

/// Include chains deeper than this are grammar defects (an include cycle
/// with no begin/end rule in between) and degrade to "no match"
const MAX_INCLUDE_DEPTH: usize = 128;

/// A rule addressed across every grammar instance this parse has loaded:
/// host 0 is the grammar the parse started with, further hosts are grammars
/// pulled in by external includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleRef {
    pub(crate) host: usize,
    pub(crate) rule: RuleId,
}

/// The per-parse mutable state of one rule: cached search results, the
/// pruned child set, and the search cursors. Keeping it out of `Rule`
/// leaves `Grammar` free to be shared between concurrent parses.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuleCache {
    /// Whether `result` reflects a finished search. A computed `None`
    /// result is final: the rule can never match again this parse.
    computed: bool,
    result: Option<(RuleRef, MatchObject)>,
    /// Children still in play for the first-match scan; pruned as they
    /// stop matching. `None` until the rule is first searched.
    active: Option<Vec<RuleRef>>,
    pub(crate) scan: ScanState,
    pub(crate) end_scan: ScanState,
}

/// One grammar participating in a parse, together with its cache table
#[derive(Debug)]
pub(crate) struct GrammarHost {
    pub(crate) grammar: Arc<Grammar>,
    pub(crate) cache: Vec<RuleCache>,
}

impl GrammarHost {
    pub(crate) fn new(grammar: Arc<Grammar>) -> Self {
        let cache = vec![RuleCache::default(); grammar.rule_count()];
        Self { grammar, cache }
    }
}

impl Parser {
    /// Finds what rule `r` matches at or after `pos`, consulting and
    /// refreshing the rule's cached result.
    ///
    /// Searches in order: `match` regex, `begin` regex, include target,
    /// then the first-match alternation over children. The winning rule is
    /// the one whose regex actually matched, which for includes and
    /// alternations is a descendant of `r`.
    pub(crate) fn match_cache(
        &mut self,
        r: RuleRef,
        text: &str,
        pos: usize,
    ) -> Option<(RuleRef, MatchObject)> {
        {
            let cache = &self.hosts[r.host].cache[r.rule.as_index()];
            if cache.computed {
                match &cache.result {
                    None => return None,
                    Some((winner, mo)) if mo.start() >= pos => {
                        let winner = *winner;
                        let wcache = &self.hosts[winner.host].cache[winner.rule.as_index()];
                        if wcache.computed && wcache.result.is_some() {
                            return self.hosts[r.host].cache[r.rule.as_index()].result.clone();
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        let grammar = Arc::clone(&self.hosts[r.host].grammar);
        let result = match grammar.rule(r.rule) {
            Rule::Match(rule) => {
                let mut scan = self.hosts[r.host].cache[r.rule.as_index()].scan;
                let found = rule.regex.find(text, pos, &mut scan);
                self.hosts[r.host].cache[r.rule.as_index()].scan = scan;
                found.map(|mo| (r, mo))
            }
            Rule::BeginEnd(rule) => {
                let mut scan = self.hosts[r.host].cache[r.rule.as_index()].scan;
                let found = rule.begin.find(text, pos, &mut scan);
                self.hosts[r.host].cache[r.rule.as_index()].scan = scan;
                found.map(|mo| (r, mo))
            }
            Rule::Include(rule) => self.resolve_include(r, &rule.reference, &grammar, text, pos),
            Rule::Alternation(_) => self.first_match(r, text, pos),
        };

        let cache = &mut self.hosts[r.host].cache[r.rule.as_index()];
        cache.computed = true;
        cache.result = result.clone();
        result
    }

    /// Finds the best next match among the children of `r`: the lowest
    /// match start wins, and a tie keeps the earlier-declared child.
    pub(crate) fn first_match(
        &mut self,
        r: RuleRef,
        text: &str,
        pos: usize,
    ) -> Option<(RuleRef, MatchObject)> {
        let mut active = self.take_active(r);
        let mut best: Option<(RuleRef, MatchObject)> = None;
        let mut i = 0;
        while i < active.len() {
            match self.match_cache(active[i], text, pos) {
                // if it doesn't match now it never will again, since the
                // search position only advances
                None => {
                    active.remove(i);
                }
                Some((winner, mo)) => {
                    if best.as_ref().is_none_or(|(_, b)| mo.start() < b.start()) {
                        let at_pos = mo.start() == pos;
                        best = Some((winner, mo));
                        // a match right at the start can't be beaten;
                        // stop the scan here
                        if at_pos {
                            break;
                        }
                    }
                    i += 1;
                }
            }
        }
        self.hosts[r.host].cache[r.rule.as_index()].active = Some(active);
        best
    }

    fn take_active(&mut self, r: RuleRef) -> Vec<RuleRef> {
        if let Some(active) = self.hosts[r.host].cache[r.rule.as_index()].active.take() {
            return active;
        }
        self.hosts[r.host]
            .grammar
            .rule(r.rule)
            .subpatterns()
            .iter()
            .map(|&rule| RuleRef { host: r.host, rule })
            .collect()
    }

    fn resolve_include(
        &mut self,
        r: RuleRef,
        reference: &Include,
        grammar: &Grammar,
        text: &str,
        pos: usize,
    ) -> Option<(RuleRef, MatchObject)> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            log::debug!("include depth limit reached at {:?}", reference);
            return None;
        }
        self.include_depth += 1;
        let result = match reference {
            Include::Local(key) => match grammar.repository.get(key).copied() {
                Some(rule) => self.match_cache(RuleRef { host: r.host, rule }, text, pos),
                None => {
                    log::debug!("no entry {:?} in the {} repository", key, grammar.name);
                    None
                }
            },
            Include::External(target) => match self.external_host(target) {
                Some(host) => self.match_cache(
                    RuleRef {
                        host,
                        rule: ROOT_RULE_ID,
                    },
                    text,
                    pos,
                ),
                None => None,
            },
            Include::Directive(directive) => {
                if self.registry.note_failed(directive) {
                    log::warn!("unhandled include directive: {}", directive);
                }
                None
            }
        };
        self.include_depth -= 1;
        result
    }

    /// The host index of an externally included grammar, loading it through
    /// the registry the first time this parse references it. A target that
    /// fails to resolve is remembered (and warned about) once.
    fn external_host(&mut self, target: &str) -> Option<usize> {
        if let Some(&known) = self.externals.get(target) {
            return known;
        }
        let host = if self.registry.has_failed(target) {
            None
        } else {
            match self.registry.resolve_or_load(target) {
                Ok(grammar) => {
                    self.hosts.push(GrammarHost::new(Arc::new(grammar)));
                    Some(self.hosts.len() - 1)
                }
                Err(err) => {
                    if self.registry.note_failed(target) {
                        log::warn!("include of {:?} failed: {}", target, err);
                    }
                    None
                }
            }
        };
        self.externals.insert(target.to_string(), host);
        host
    }
}
