use std::collections::{HashMap, HashSet};

use crate::models::{TopicNode, TopicOption, TopicRow};

/// Pre-order flattening: each node is emitted before its children.
///
/// Walks an explicit stack, so tree depth is bounded by memory only.
pub fn flatten(forest: &[TopicNode]) -> Vec<TopicOption> {
    let mut options = Vec::new();
    let mut stack: Vec<&TopicNode> = forest.iter().rev().collect();

    while let Some(node) = stack.pop() {
        options.push(TopicOption {
            id: node.id,
            label: node.name.clone(),
        });
        stack.extend(node.children.iter().rev());
    }

    options
}

/// Rebuilds a forest from adjacency rows.
///
/// Rows whose parent is missing from the set become roots. Siblings are
/// ordered by `(position, id)`. Rows that never connect to a root are dropped.
pub fn build_forest(rows: Vec<TopicRow>) -> Vec<TopicNode> {
    let known: HashSet<i64> = rows.iter().map(|row| row.id).collect();
    let total = rows.len();
    let mut roots = Vec::new();
    let mut by_parent: HashMap<i64, Vec<TopicRow>> = HashMap::new();

    for row in rows {
        match row.parent_id {
            Some(parent) if known.contains(&parent) => {
                by_parent.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    let ordered = preorder(roots, &mut by_parent);
    if ordered.len() < total {
        tracing::warn!(
            dropped = total - ordered.len(),
            "topic rows unreachable from any root were dropped"
        );
    }

    assemble(ordered)
}

/// Rows in pre-order, each paired with the index of its parent in the output.
fn preorder(
    roots: Vec<TopicRow>,
    by_parent: &mut HashMap<i64, Vec<TopicRow>>,
) -> Vec<(TopicRow, Option<usize>)> {
    let mut ordered = Vec::new();
    let mut stack: Vec<(TopicRow, Option<usize>)> = sorted_siblings(roots)
        .into_iter()
        .rev()
        .map(|row| (row, None))
        .collect();

    while let Some((row, parent)) = stack.pop() {
        let index = ordered.len();
        let children = by_parent.remove(&row.id).unwrap_or_default();
        stack.extend(
            sorted_siblings(children)
                .into_iter()
                .rev()
                .map(|child| (child, Some(index))),
        );
        ordered.push((row, parent));
    }

    ordered
}

fn sorted_siblings(mut rows: Vec<TopicRow>) -> Vec<TopicRow> {
    rows.sort_by_key(|row| (row.position, row.id));
    rows
}

/// Builds nodes bottom-up: in reverse pre-order every child is finished
/// before its parent is reached.
fn assemble(ordered: Vec<(TopicRow, Option<usize>)>) -> Vec<TopicNode> {
    let mut pending: Vec<Vec<TopicNode>> = Vec::new();
    pending.resize_with(ordered.len(), Vec::new);
    let mut roots = Vec::new();

    for (index, (row, parent)) in ordered.into_iter().enumerate().rev() {
        let mut children = std::mem::take(&mut pending[index]);
        children.reverse();
        let node = TopicNode {
            id: Some(row.id),
            name: Some(row.name),
            children,
        };
        match parent {
            Some(parent) => pending[parent].push(node),
            None => roots.push(node),
        }
    }

    roots.reverse();
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEEP: i64 = 50_000;

    fn ids(options: &[TopicOption]) -> Vec<i64> {
        options.iter().filter_map(|option| option.id).collect()
    }

    fn row(id: i64, parent_id: Option<i64>, position: i32) -> TopicRow {
        TopicRow {
            id,
            parent_id,
            name: format!("topic {id}"),
            position,
        }
    }

    #[test]
    fn flattens_parent_before_children() {
        let forest = vec![TopicNode::new(
            1,
            "A",
            vec![TopicNode::new(2, "B", vec![]), TopicNode::new(3, "C", vec![])],
        )];
        assert_eq!(ids(&flatten(&forest)), vec![1, 2, 3]);
    }

    #[test]
    fn descends_before_moving_to_siblings() {
        let d = TopicNode::new(4, "D", vec![]);
        let forest = vec![
            TopicNode::new(1, "A", vec![TopicNode::new(2, "B", vec![d])]),
            TopicNode::new(3, "C", vec![]),
        ];
        let labels: Vec<_> = flatten(&forest)
            .into_iter()
            .filter_map(|option| option.label)
            .collect();
        assert_eq!(labels, vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn empty_forest_yields_no_options() {
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn malformed_nodes_pass_through() {
        let raw = r#"[
            {"name": "no id"},
            {"id": 7, "subSubject": [{"id": 8, "subSubject": null}]}
        ]"#;
        let forest: Vec<TopicNode> = serde_json::from_str(raw).unwrap();
        let options = flatten(&forest);
        assert_eq!(
            options,
            vec![
                TopicOption {
                    id: None,
                    label: Some("no id".to_string()),
                },
                TopicOption {
                    id: Some(7),
                    label: None,
                },
                TopicOption {
                    id: Some(8),
                    label: None,
                },
            ]
        );
    }

    #[test]
    fn forest_orders_siblings_by_position() {
        let forest = build_forest(vec![
            row(10, None, 1),
            row(11, Some(10), 2),
            row(12, Some(10), 1),
            row(20, None, 0),
        ]);
        assert_eq!(ids(&flatten(&forest)), vec![20, 10, 12, 11]);
        assert_eq!(forest[1].children.len(), 2);
    }

    #[test]
    fn orphans_become_roots_and_cycles_are_dropped() {
        let forest = build_forest(vec![
            row(1, None, 0),
            row(2, Some(99), 0),
            row(3, Some(4), 0),
            row(4, Some(3), 0),
            row(5, Some(5), 0),
        ]);
        assert_eq!(ids(&flatten(&forest)), vec![1, 2]);
    }

    #[test]
    fn nested_rows_keep_their_subtrees() {
        let forest = build_forest(vec![
            row(1, None, 0),
            row(2, Some(1), 0),
            row(3, Some(1), 1),
            row(4, Some(3), 0),
            row(5, None, 1),
            row(6, Some(5), 0),
        ]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children.len(), 2);
        assert_eq!(forest[0].children[1].children[0].id, Some(4));
        assert_eq!(ids(&flatten(&forest)), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn deep_parent_chain_builds_flattens_and_drops() {
        let rows = (0..DEEP)
            .map(|id| row(id, if id == 0 { None } else { Some(id - 1) }, 0))
            .collect();
        let forest = build_forest(rows);
        assert_eq!(forest.len(), 1);

        let options = flatten(&forest);
        assert_eq!(options.len() as i64, DEEP);
        assert_eq!(ids(&options), (0..DEEP).collect::<Vec<_>>());
        drop(forest);
    }

    #[test]
    fn deep_nested_nodes_flatten_in_order() {
        let mut node = TopicNode::new(DEEP - 1, "leaf", vec![]);
        for id in (0..DEEP - 1).rev() {
            node = TopicNode::new(id, "branch", vec![node]);
        }
        let forest = vec![node];
        assert_eq!(ids(&flatten(&forest)), (0..DEEP).collect::<Vec<_>>());
    }

    fn arb_forest() -> impl Strategy<Value = Vec<TopicNode>> {
        let leaf = any::<i64>().prop_map(|id| TopicNode::new(id, "leaf", vec![]));
        let node = leaf.prop_recursive(5, 64, 4, |inner| {
            (any::<i64>(), prop::collection::vec(inner, 0..4))
                .prop_map(|(id, children)| TopicNode::new(id, "branch", children))
        });
        prop::collection::vec(node, 0..5)
    }

    fn preorder_ids(nodes: &[TopicNode], out: &mut Vec<i64>) {
        for node in nodes {
            out.extend(node.id);
            preorder_ids(&node.children, out);
        }
    }

    proptest! {
        #[test]
        fn flatten_keeps_every_node_in_preorder(forest in arb_forest()) {
            let mut expected = Vec::new();
            preorder_ids(&forest, &mut expected);
            let options = flatten(&forest);
            prop_assert_eq!(options.len(), expected.len());
            prop_assert_eq!(ids(&options), expected);
        }
    }
}
