//! Loader Demonstration
//!
//! Drives the sans-IO `DiffLoader` by hand, without a runtime:
//! 1. Structure poll (pending, then ready)
//! 2. Paged node loading with label updates
//! 3. Full render, collapse of one host and the resulting transitions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use serde_json::json;
use snitchdiff_core::loader::PageOutcome;
use snitchdiff_core::render::Phase;
use snitchdiff_core::{
    DiffLoader, DiffRequest, DiffViewConfig, NodeKey, NodeMap, NodePage, NodeRecord, Side, Size,
    StructureFrame, StructurePoll, StructureResponse, TreeRenderer,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== snitchdiff Loader Demo ===\n");

    let mut config = DiffViewConfig {
        page_size: 2,
        collapse_below_root: false,
        ..DiffViewConfig::default()
    };
    config
        .label_properties
        .insert("host".to_string(), "hostname".to_string());

    // ===== Part 1: Structure =====
    println!("## Part 1: Structure\n");

    let frame = StructureFrame::new("environment", "prod", Side::Both)
        .with_child(
            StructureFrame::new("host", "h1", Side::Both)
                .with_child(StructureFrame::new("device", "eth0", Side::Left)),
        )
        .with_child(StructureFrame::new("host", "h2", Side::Right));
    let mut nodemap = NodeMap::new();
    nodemap.insert("environment", "prod", 0);
    nodemap.insert("host", "h1", 1);
    nodemap.insert("device", "eth0", 2);
    nodemap.insert("host", "h2", 3);

    let mut loader = DiffLoader::new(&config);
    loader.begin(DiffRequest::new(
        "environment",
        "prod",
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
    ));

    let token = loader.next_structure_poll().unwrap();
    println!("poll 1: {:?}", loader.on_structure(token, Ok(StructurePoll::Pending)));
    let token = loader.next_structure_poll().unwrap();
    let ready = StructurePoll::Ready(StructureResponse {
        frame: Some(frame),
        nodemap,
        nodecount: 4,
    });
    println!("poll 2: {:?}", loader.on_structure(token, Ok(ready)));
    println!("state:  {}\n", loader.state());

    // ===== Part 2: Pages =====
    println!("## Part 2: Node pages\n");

    let records: Vec<NodeRecord> = ["prod", "web-01", "eth0", "web-02"]
        .iter()
        .map(|name| {
            let mut record = NodeRecord::default();
            record.both.insert("hostname".to_string(), json!(name));
            record
        })
        .collect();

    while let Some(page) = loader.next_page() {
        let end = (page.offset + page.limit).min(records.len());
        let nodes = records[page.offset..end].to_vec();
        if let PageOutcome::Applied { range, complete, relabeled } =
            loader.on_page(page, Ok(NodePage { nodes }.into()))
        {
            println!(
                "page {:?}: {} labels changed, complete = {}",
                range,
                relabeled.len(),
                complete
            );
        }
    }
    println!("state:  {}\n", loader.state());

    // ===== Part 3: Render =====
    println!("## Part 3: Render\n");

    let mut renderer = TreeRenderer::new(&config);
    let viewport = Size::new(1280.0, 720.0);
    let tree = loader.tree_mut().expect("structure loaded");
    let root = tree.root();
    for node in &renderer.render_full(tree, viewport, root).nodes {
        println!("  {:>6.1} {:>6.1}  {:<24} {}", node.to.x, node.to.y, node.label, node.class());
    }

    let h1 = tree.require(&NodeKey::new("host", "h1"))?;
    tree.toggle(h1);
    let scene = renderer.render_full(tree, viewport, h1);
    println!(
        "\nafter collapsing host:h1: {} updated, {} exiting",
        scene.count(Phase::Update),
        scene.count(Phase::Exit)
    );

    Ok(())
}
