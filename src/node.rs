use std::fmt;
use std::ops::Range;

/// One entry of the parse output tree: a scope name (possibly empty for
/// unnamed rules), a half-open character range, and ordered children.
///
/// Structural contract: every child's range is contained in its parent's,
/// children's ranges do not overlap and start in non-decreasing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub range: Range<usize>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            name: name.into(),
            range,
            children: Vec::new(),
        }
    }

    pub(crate) fn append(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Expands this node's bounds to cover all of its children plus its own
    /// initial bounds, recursively
    pub(crate) fn update_range(&mut self) -> Range<usize> {
        for child in &mut self.children {
            let range = child.update_range();
            if range.start < self.range.start {
                self.range.start = range.start;
            }
            if range.end > self.range.end {
                self.range.end = range.end;
            }
        }
        self.range.clone()
    }

    /// Scope names covering `offset`, innermost first. Unnamed nodes are
    /// skipped; an offset outside this node yields an empty path.
    pub fn scope_path_at(&self, offset: usize) -> Vec<&str> {
        let mut path = Vec::new();
        self.collect_scopes_at(offset, &mut path);
        path
    }

    /// The full scope path at `offset` as a single space-separated name,
    /// innermost to outermost
    pub fn scope_name_at(&self, offset: usize) -> String {
        self.scope_path_at(offset).join(" ")
    }

    fn collect_scopes_at<'a>(&'a self, offset: usize, out: &mut Vec<&'a str>) {
        if !self.range.contains(&offset) {
            return;
        }
        for child in &self.children {
            child.collect_scopes_at(offset, out);
        }
        if !self.name.is_empty() {
            out.push(&self.name);
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{}-{}: \"{}\"",
            "",
            self.range.start,
            self.range.end,
            self.name,
            indent = depth * 2
        )?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_range_covers_children() {
        let mut node = Node::new("outer", 3..4);
        node.append(Node::new("a", 1..2));
        node.append(Node::new("b", 5..9));
        assert_eq!(node.update_range(), 1..9);
        assert_eq!(node.range, 1..9);
    }

    #[test]
    fn update_range_reaches_grandchildren() {
        let mut inner = Node::new("inner", 4..5);
        inner.append(Node::new("deep", 4..12));
        let mut node = Node::new("outer", 4..6);
        node.append(inner);
        assert_eq!(node.update_range(), 4..12);
        assert_eq!(node.children[0].range, 4..12);
    }

    #[test]
    fn scope_path_is_innermost_first() {
        let mut root = Node::new("source.t", 0..10);
        let mut string = Node::new("string.quoted", 2..8);
        string.append(Node::new("constant.escape", 3..5));
        root.append(string);

        assert_eq!(
            root.scope_path_at(4),
            vec!["constant.escape", "string.quoted", "source.t"]
        );
        assert_eq!(root.scope_path_at(6), vec!["string.quoted", "source.t"]);
        assert_eq!(root.scope_path_at(1), vec!["source.t"]);
        assert_eq!(
            root.scope_name_at(3),
            "constant.escape string.quoted source.t"
        );
        assert!(root.scope_path_at(10).is_empty());
    }

    #[test]
    fn unnamed_nodes_are_left_out_of_scope_paths() {
        let mut root = Node::new("source.t", 0..5);
        let mut anon = Node::new("", 1..4);
        anon.append(Node::new("kw.t", 2..3));
        root.append(anon);
        assert_eq!(root.scope_path_at(2), vec!["kw.t", "source.t"]);
    }

    #[test]
    fn display_renders_an_indented_tree() {
        let mut root = Node::new("source.t", 0..7);
        let mut block = Node::new("block", 0..7);
        block.append(Node::new("block", 2..5));
        root.append(block);
        assert_eq!(
            root.to_string(),
            "0-7: \"source.t\"\n  0-7: \"block\"\n    2-5: \"block\"\n"
        );
    }
}
