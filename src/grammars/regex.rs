use std::fmt;
use std::sync::OnceLock;

use onig::{Region, SearchOptions};

/// A regex wrapper that keeps the source pattern and compiles lazily at
/// runtime. A pattern that fails to compile never matches; the grammar it
/// belongs to still loads.
pub struct Regex {
    pattern: String,
    compiled: OnceLock<Option<onig::Regex>>,
}

impl Clone for Regex {
    fn clone(&self) -> Self {
        // A fresh clone recompiles instead of sharing the compiled program
        Regex::new(self.pattern.clone())
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

impl Regex {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn compiled(&self) -> Option<&onig::Regex> {
        self.compiled
            .get_or_init(|| match onig::Regex::new(&self.pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    log::warn!("couldn't compile pattern {:?}: {}", self.pattern, err);
                    None
                }
            })
            .as_ref()
    }

    /// Finds the first match starting at or after `pos`, resuming the scan
    /// from where the previous call on the same text stopped.
    ///
    /// `scan` remembers how far the text has already been proven to contain
    /// no match usable from `pos`; a backward jump (a smaller `pos` than the
    /// previous call, or a different text) resets it to the start.
    pub fn find(&self, text: &str, pos: usize, scan: &mut ScanState) -> Option<MatchObject> {
        let re = self.compiled()?;
        if pos < scan.last_index {
            scan.last_found = 0;
        }
        scan.last_index = pos;
        while scan.last_found < text.len() {
            let haystack = &text[scan.last_found..];
            let mut region = Region::new();
            re.search_with_options(
                haystack,
                0,
                haystack.len(),
                SearchOptions::SEARCH_OPTION_NONE,
                Some(&mut region),
            )?;
            let (start, _) = region.pos(0)?;
            if scan.last_found + start < pos {
                // A hit before `pos` only proves there is nothing usable up
                // to its start; skip a whole character past a zero-width hit
                if start == 0 {
                    scan.last_found += haystack.chars().next().map_or(1, char::len_utf8);
                } else {
                    scan.last_found += start;
                }
                continue;
            }
            return Some(MatchObject::from_region(&region, scan.last_found));
        }
        None
    }
}

/// The two cursors of a resumable search: the `pos` of the previous call and
/// the offset the scan has advanced to. Per-rule, per-parse state; the
/// compiled pattern itself is shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    last_index: usize,
    last_found: usize,
}

/// Capture-group spans of a single match, with absolute offsets into the
/// searched text. Group 0 is the whole match; a group that did not
/// participate in the match is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchObject {
    start: usize,
    end: usize,
    groups: Vec<Option<(usize, usize)>>,
}

impl MatchObject {
    fn from_region(region: &Region, base: usize) -> Self {
        let groups: Vec<_> = (0..region.len())
            .map(|i| region.pos(i).map(|(a, b)| (a + base, b + base)))
            .collect();
        let (start, end) = groups[0].unwrap_or((base, base));
        Self { start, end, groups }
    }

    #[cfg(test)]
    pub(crate) fn from_groups(groups: Vec<Option<(usize, usize)>>) -> Self {
        let (start, end) = groups.first().copied().flatten().unwrap_or((0, 0));
        Self { start, end, groups }
    }

    /// Start offset of the whole match
    pub fn start(&self) -> usize {
        self.start
    }

    /// End offset (exclusive) of the whole match
    pub fn end(&self) -> usize {
        self.end
    }

    /// The span of capture group `index`, if the group exists and matched
    pub fn group(&self, index: usize) -> Option<(usize, usize)> {
        self.groups.get(index).copied().flatten()
    }

    /// Number of capture groups, the whole match included
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_shifts_offsets_to_absolute() {
        let re = Regex::new(r"(b)(c)");
        let mut scan = ScanState::default();
        let mo = re.find("aaabc", 0, &mut scan).unwrap();
        assert_eq!(mo.start(), 3);
        assert_eq!(mo.end(), 5);
        assert_eq!(mo.group(1), Some((3, 4)));
        assert_eq!(mo.group(2), Some((4, 5)));
    }

    #[test]
    fn find_skips_matches_before_pos() {
        let re = Regex::new("ab");
        let mut scan = ScanState::default();
        let mo = re.find("ab ab ab", 3, &mut scan).unwrap();
        assert_eq!((mo.start(), mo.end()), (3, 5));
        // resuming further ahead reuses the cursor
        let mo = re.find("ab ab ab", 6, &mut scan).unwrap();
        assert_eq!((mo.start(), mo.end()), (6, 8));
    }

    #[test]
    fn monotonic_resume_matches_fresh_search() {
        let text = "fn x() { fn y() { } }";
        let resumed = Regex::new(r"fn \w");
        let mut scan = ScanState::default();
        for pos in 0..text.len() {
            let fresh = Regex::new(r"fn \w");
            let mut fresh_scan = ScanState::default();
            assert_eq!(
                resumed.find(text, pos, &mut scan),
                fresh.find(text, pos, &mut fresh_scan),
                "divergence at pos {}",
                pos
            );
        }
    }

    #[test]
    fn backward_jump_resets_the_cursor() {
        let re = Regex::new("a");
        let mut scan = ScanState::default();
        assert_eq!(re.find("a b a", 2, &mut scan).map(|m| m.start()), Some(4));
        // jumping backward must find the earlier occurrence again
        assert_eq!(re.find("a b a", 0, &mut scan).map(|m| m.start()), Some(0));
    }

    #[test]
    fn zero_width_hits_advance_the_scan() {
        // matches zero-width everywhere; asking past the start must not loop
        let re = Regex::new(r"x*");
        let mut scan = ScanState::default();
        let mo = re.find("abc", 2, &mut scan).unwrap();
        assert_eq!((mo.start(), mo.end()), (2, 2));
    }

    #[test]
    fn unmatched_group_is_none() {
        let re = Regex::new("(a)|(b)");
        let mut scan = ScanState::default();
        let mo = re.find("b", 0, &mut scan).unwrap();
        assert_eq!(mo.group(1), None);
        assert_eq!(mo.group(2), Some((0, 1)));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let re = Regex::new("(unclosed");
        let mut scan = ScanState::default();
        assert_eq!(re.find("(unclosed", 0, &mut scan), None);
    }

    #[test]
    fn clone_starts_from_a_fresh_program() {
        let re = Regex::new("b");
        let mut scan = ScanState::default();
        assert_eq!(re.find("abc", 0, &mut scan).map(|m| m.start()), Some(1));
        let clone = re.clone();
        let mut scan2 = ScanState::default();
        assert_eq!(clone.find("abc", 0, &mut scan2).map(|m| m.start()), Some(1));
    }
}
