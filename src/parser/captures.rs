use crate::grammars::{CaptureTable, MatchObject};
use crate::node::Node;

fn covers(outer: Option<(usize, usize)>, inner: Option<(usize, usize)>) -> bool {
    match (outer, inner) {
        (Some((a, b)), Some((c, d))) => a <= c && d <= b,
        (None, None) => true,
        _ => false,
    }
}

/// Creates a node for each capture-table entry and attaches it under
/// `parent`, or under an earlier capture node whose range covers it.
///
/// Groups 0 and 1 anchor directly to `parent`; every later group nests
/// under the closest preceding group that textually covers it, resolved
/// transitively through groups that produced no node. A table entry whose
/// group is out of range or did not participate in the match is skipped.
pub(crate) fn build_capture_nodes(mo: &MatchObject, parent: &mut Node, table: &CaptureTable) {
    let group_count = mo.group_count();

    // parent_index[i] is the closest earlier group covering group i; the
    // default 0 anchors to the parent node
    let mut parent_index = vec![0usize; group_count];
    for i in 2..group_count {
        for j in (0..i).rev() {
            if covers(mo.group(j), mo.group(i)) {
                parent_index[i] = j;
                break;
            }
        }
    }

    // nodes are created in table order (ascending group index), so every
    // attachment target has a smaller slot than its children
    let mut nodes: Vec<Option<Node>> = Vec::new();
    let mut child_slots: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_group: Vec<Option<usize>> = vec![None; group_count];
    let mut parent_slots: Vec<usize> = Vec::new();

    for capture in table.iter() {
        let index = capture.index;
        if index >= group_count {
            continue;
        }
        let Some((start, end)) = mo.group(index) else {
            continue;
        };

        let slot = nodes.len();
        nodes.push(Some(Node::new(capture.name.clone(), start..end)));
        child_slots.push(Vec::new());
        slot_of_group[index] = Some(slot);

        if index == 0 {
            parent_slots.push(slot);
            continue;
        }
        // walk ancestors until one has a node; groups 0 and 1 fall back to
        // the parent node when nothing was created for them
        let mut j = index;
        loop {
            j = parent_index[j];
            if let Some(target) = slot_of_group[j] {
                child_slots[target].push(slot);
                break;
            }
            if j < 2 {
                parent_slots.push(slot);
                break;
            }
        }
    }

    for slot in (0..nodes.len()).rev() {
        for &child in &child_slots[slot] {
            let child_node = nodes[child].take().expect("child slot already consumed");
            nodes[slot]
                .as_mut()
                .expect("parent slot already consumed")
                .children
                .push(child_node);
        }
    }
    for &slot in &parent_slots {
        if let Some(node) = nodes[slot].take() {
            parent.append(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammars::Capture;

    fn table(entries: &[(usize, &str)]) -> CaptureTable {
        CaptureTable::from_entries(
            entries
                .iter()
                .map(|(index, name)| Capture {
                    index: *index,
                    name: name.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn nested_groups_nest_in_the_output_tree() {
        // groups at [0,10), [2,4), [2,3): each covered by the previous one
        let mo = MatchObject::from_groups(vec![Some((0, 10)), Some((2, 4)), Some((2, 3))]);
        let mut parent = Node::new("parent", 0..10);
        build_capture_nodes(&mo, &mut parent, &table(&[(0, "g0"), (1, "g1"), (2, "g2")]));

        assert_eq!(parent.children.len(), 1);
        let g0 = &parent.children[0];
        assert_eq!((g0.name.as_str(), g0.range.clone()), ("g0", 0..10));
        let g1 = &g0.children[0];
        assert_eq!((g1.name.as_str(), g1.range.clone()), ("g1", 2..4));
        let g2 = &g1.children[0];
        assert_eq!((g2.name.as_str(), g2.range.clone()), ("g2", 2..3));
        assert!(g2.children.is_empty());
    }

    #[test]
    fn sibling_groups_attach_to_the_parent() {
        let mo = MatchObject::from_groups(vec![Some((0, 9)), Some((0, 3)), Some((5, 9))]);
        let mut parent = Node::new("parent", 0..9);
        build_capture_nodes(&mo, &mut parent, &table(&[(1, "key"), (2, "value")]));

        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.children[0].range, 0..3);
        assert_eq!(parent.children[1].range, 5..9);
    }

    #[test]
    fn group_zero_node_becomes_the_anchor_for_the_rest() {
        let mo = MatchObject::from_groups(vec![Some((0, 9)), Some((0, 3)), Some((5, 9))]);
        let mut parent = Node::new("parent", 0..9);
        build_capture_nodes(
            &mo,
            &mut parent,
            &table(&[(0, "expr"), (1, "key"), (2, "value")]),
        );

        assert_eq!(parent.children.len(), 1);
        let expr = &parent.children[0];
        assert_eq!(expr.name, "expr");
        assert_eq!(expr.children.len(), 2);
        assert_eq!(expr.children[0].name, "key");
        assert_eq!(expr.children[1].name, "value");
    }

    #[test]
    fn sentinel_and_stale_indices_are_skipped() {
        let mo = MatchObject::from_groups(vec![Some((0, 5)), None, Some((1, 2))]);
        let mut parent = Node::new("parent", 0..5);
        build_capture_nodes(
            &mo,
            &mut parent,
            &table(&[(1, "missing"), (2, "present"), (7, "stale")]),
        );

        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].name, "present");
    }

    #[test]
    fn only_table_entries_produce_nodes() {
        let mo = MatchObject::from_groups(vec![Some((0, 6)), Some((0, 2)), Some((3, 6))]);
        let mut parent = Node::new("parent", 0..6);
        build_capture_nodes(&mo, &mut parent, &table(&[(2, "only")]));

        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].name, "only");
        assert_eq!(parent.children[0].range, 3..6);
    }
}
