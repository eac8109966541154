//! Property tests over randomly shaped diff trees
//!
//! 1. Layout is a pure function of the visible tree.
//! 2. Nodes on the same depth never share a breadth coordinate.
//! 3. Toggling a node twice restores the visible set.
//! 4. A page from a superseded load never reaches the store.
//! 5. After every applied page, labels match the records loaded so far.
//! 6. Pages delivered out of order leave the same store as in-order delivery.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use snitchdiff_core::loader::{PageOutcome, PageRequest, StructureOutcome};
use snitchdiff_core::render::{tidy_layout, LayoutSpacing};
use snitchdiff_core::tree::LabelView;
use snitchdiff_core::{
    DiffLoader, DiffRequest, DiffTree, DiffViewConfig, NodeMap, NodePage, NodeRecord, Side,
    StructureFrame, StructurePoll, StructureResponse,
};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Parent index for every node after the root; node `i + 1` hangs below
/// some node in `0..=i`
fn parents_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<prop::sample::Index>(), 0..40).prop_map(|picks| {
        picks
            .iter()
            .enumerate()
            .map(|(i, pick)| pick.index(i + 1))
            .collect()
    })
}

fn frame_of(node: usize, children: &[Vec<usize>]) -> StructureFrame {
    let side = match node % 3 {
        0 => Side::Both,
        1 => Side::Left,
        _ => Side::Right,
    };
    children[node].iter().fold(
        StructureFrame::new("n", &format!("{:03}", node), side),
        |frame, &kid| frame.with_child(frame_of(kid, children)),
    )
}

fn response(parents: &[usize]) -> StructureResponse {
    let count = parents.len() + 1;
    let mut children = vec![Vec::new(); count];
    for (i, &parent) in parents.iter().enumerate() {
        children[parent].push(i + 1);
    }
    let mut nodemap = NodeMap::new();
    for i in 0..count {
        nodemap.insert("n", &format!("{:03}", i), i);
    }
    StructureResponse {
        frame: Some(frame_of(0, &children)),
        nodemap,
        nodecount: count,
    }
}

fn tree(parents: &[usize]) -> DiffTree {
    let response = response(parents);
    let frame = response.frame.as_ref().unwrap();
    DiffTree::build(frame, &response.nodemap, response.nodecount).unwrap()
}

fn records(count: usize) -> Vec<NodeRecord> {
    (0..count)
        .map(|i| {
            let mut record = NodeRecord::default();
            record.both.insert("name".to_string(), json!(format!("v{}", i)));
            record
        })
        .collect()
}

fn config(page_size: usize) -> DiffViewConfig {
    let mut config = DiffViewConfig {
        page_size,
        collapse_below_root: false,
        ..DiffViewConfig::default()
    };
    config
        .label_properties
        .insert("n".to_string(), "name".to_string());
    config
}

fn request(id: &str) -> DiffRequest {
    DiffRequest::new(
        "n",
        id,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
    )
}

fn loaded(parents: &[usize], page_size: usize, id: &str) -> DiffLoader {
    let mut loader = DiffLoader::new(&config(page_size));
    loader.begin(request(id));
    let token = loader.next_structure_poll().unwrap();
    let outcome = loader.on_structure(token, Ok(StructurePoll::Ready(response(parents))));
    assert!(matches!(outcome, StructureOutcome::Loaded { .. }));
    loader
}

fn spacing() -> LayoutSpacing {
    LayoutSpacing::from_config(&DiffViewConfig::default())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Layout determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_is_deterministic(parents in parents_strategy()) {
        let a = tidy_layout(&tree(&parents), spacing());
        let b = tidy_layout(&tree(&parents), spacing());
        prop_assert_eq!(a, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. No two nodes at one depth share a breadth position
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn same_depth_nodes_are_separated(parents in parents_strategy()) {
        let tree = tree(&parents);
        let layout = tidy_layout(&tree, spacing());
        prop_assert_eq!(layout.positions.len(), tree.len());

        let mut by_depth: Vec<Vec<f64>> = Vec::new();
        for &(idx, p) in &layout.positions {
            let depth = tree.node(idx).depth;
            if by_depth.len() <= depth {
                by_depth.resize(depth + 1, Vec::new());
            }
            prop_assert!((p.x - depth as f64 * layout.depth_step).abs() < 1e-9);
            by_depth[depth].push(p.y);
        }
        for mut level in by_depth {
            level.sort_by(|a, b| a.partial_cmp(b).unwrap());
            for pair in level.windows(2) {
                prop_assert!(pair[1] - pair[0] > 1e-9, "overlap at {:?}", pair);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Toggle twice is the identity on visibility
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn toggle_twice_restores_visible_set(
        parents in parents_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut tree = tree(&parents);
        let before = tree.visible();
        let target = before[pick.index(before.len())];

        tree.toggle(target);
        let hidden = tree.visible();
        tree.toggle(target);

        prop_assert_eq!(tree.visible(), before.clone());
        if !tree.node(target).children.ids().is_empty() {
            prop_assert!(hidden.len() < before.len());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Superseded pages are discarded
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn superseded_page_never_lands(
        parents in parents_strategy(),
        page_size in 1usize..8,
    ) {
        let count = parents.len() + 1;
        let mut loader = loaded(&parents, page_size, "first");
        let stale = loader.next_page().unwrap();

        loader.begin(request("second"));
        let token = loader.next_structure_poll().unwrap();
        loader.on_structure(token, Ok(StructurePoll::Ready(response(&parents))));

        let end = page_size.min(count);
        let page = NodePage { nodes: records(count)[..end].to_vec() };
        let outcome = loader.on_page(stale, Ok(page.into()));

        prop_assert!(matches!(outcome, PageOutcome::Discarded(_)));
        prop_assert_eq!(loader.store().filled(), 0);
        prop_assert_eq!(loader.offset(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Labels track loaded records page by page
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn labels_match_loaded_records(
        parents in parents_strategy(),
        page_size in 1usize..8,
    ) {
        let count = parents.len() + 1;
        let all = records(count);
        let view = LabelView::from_config(&config(page_size));
        let mut loader = loaded(&parents, page_size, "labels");

        while let Some(page) = loader.next_page() {
            let end = (page.offset + page.limit).min(count);
            let nodes = all[page.offset..end].to_vec();
            let outcome = loader.on_page(page, Ok(NodePage { nodes }.into()));
            let applied = matches!(outcome, PageOutcome::Applied { .. });
            prop_assert!(applied);

            let filled = loader.offset();
            let tree = loader.tree().unwrap();
            for idx in tree.all() {
                let node = tree.node(idx);
                let expected = if node.store_index < filled {
                    view.label(&node.key, all.get(node.store_index))
                } else {
                    view.label(&node.key, None)
                };
                prop_assert_eq!(&node.label, &expected);
            }
        }

        prop_assert!(loader.state().is_terminal());
        prop_assert_eq!(loader.store().filled(), count);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Out-of-order delivery converges on the in-order store
// ═════════════════════════════════════════════════════════════════════════

/// Tree shape, page size and a shuffled order over the page offsets
fn delivery_strategy() -> impl Strategy<Value = (Vec<usize>, usize, Vec<usize>)> {
    (parents_strategy(), 1usize..8).prop_flat_map(|(parents, page_size)| {
        let count = parents.len() + 1;
        let offsets: Vec<usize> = (0..count).step_by(page_size).collect();
        (Just(parents), Just(page_size), Just(offsets).prop_shuffle())
    })
}

fn page_at(all: &[NodeRecord], offset: usize, limit: usize) -> NodePage {
    let end = (offset + limit).min(all.len());
    NodePage { nodes: all[offset..end].to_vec() }
}

proptest! {
    #[test]
    fn out_of_order_pages_match_in_order_store(
        (parents, page_size, order) in delivery_strategy(),
    ) {
        let count = parents.len() + 1;
        let all = records(count);

        let mut in_order = loaded(&parents, page_size, "ordered");
        while let Some(page) = in_order.next_page() {
            let nodes = page_at(&all, page.offset, page.limit);
            in_order.on_page(page, Ok(nodes.into()));
        }

        // Every page answered at once, arriving in shuffled order; anything
        // ahead of the cursor bounces and is delivered again next round
        let mut shuffled = loaded(&parents, page_size, "shuffled");
        let generation = shuffled.generation();
        let mut pending = order.clone();
        let mut rounds = 0;
        while !pending.is_empty() && !shuffled.state().is_terminal() {
            rounds += 1;
            prop_assert!(rounds <= order.len(), "delivery stopped making progress");
            let mut bounced = Vec::new();
            for offset in pending {
                let request = PageRequest { generation, offset, limit: page_size };
                let nodes = page_at(&all, offset, page_size);
                match shuffled.on_page(request, Ok(nodes.into())) {
                    PageOutcome::Applied { range, .. } => prop_assert_eq!(range.start, offset),
                    PageOutcome::Discarded(_) => bounced.push(offset),
                    other => prop_assert!(false, "unexpected outcome {:?}", other),
                }
            }
            pending = bounced;
        }

        prop_assert_eq!(shuffled.state(), in_order.state());
        prop_assert_eq!(shuffled.offset(), in_order.offset());
        prop_assert_eq!(shuffled.store().filled(), in_order.store().filled());
        for i in 0..count {
            prop_assert_eq!(shuffled.store().get(i), in_order.store().get(i));
        }
    }
}
