use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{DiffViewConfig, Margins};
use crate::geometry::{Point, Size};
use crate::log_op_end;
use crate::log_op_start;
use crate::model::NodeKey;
use crate::render::keyed_diff::keyed_diff;
use crate::render::layout::{tidy_layout, Layout, LayoutSpacing};
use crate::render::scene::{LabelAnchor, LinkPath, LinkVisual, NodeVisual, Phase, Scene};
use crate::tree::{DiffTree, NodeIdx};

/// New label text for an on-screen node
#[derive(Debug, Clone, PartialEq)]
pub struct LabelUpdate {
    pub key: NodeKey,
    pub label: String,
}

/// Turns the visible part of a [`DiffTree`] into a [`Scene`]
///
/// Keeps the node and link positions of the previous pass so that the next
/// one can be reconciled against it.
#[derive(Debug, Clone)]
pub struct TreeRenderer {
    spacing: LayoutSpacing,
    margin: Margins,
    duration: Duration,
    node_radius: f64,
    label_offset: f64,
    placed: Vec<(NodeKey, Point)>,
    linked: Vec<(NodeKey, LinkPath)>,
    layout: Layout,
    scene: Scene,
    /// Index into `scene.nodes` of every node still on screen
    on_screen: HashMap<NodeKey, usize>,
}

impl TreeRenderer {
    pub fn new(config: &DiffViewConfig) -> Self {
        Self {
            spacing: LayoutSpacing::from_config(config),
            margin: config.margin,
            duration: config.transition(),
            node_radius: config.node_radius,
            label_offset: config.label_offset,
            placed: Vec::new(),
            linked: Vec::new(),
            layout: Layout::default(),
            scene: Scene::default(),
            on_screen: HashMap::new(),
        }
    }

    /// Forget the previous pass; the next render treats every node as new
    pub fn reset(&mut self) {
        self.placed.clear();
        self.linked.clear();
        self.layout = Layout::default();
        self.scene = Scene::default();
        self.on_screen.clear();
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Viewport minus margins
    pub fn inner_size(&self, viewport: Size) -> Size {
        Size::new(
            (viewport.width - self.margin.left - self.margin.right).max(0.0),
            (viewport.height - self.margin.top - self.margin.bottom).max(0.0),
        )
    }

    /// Full layout and reconciliation pass
    ///
    /// `source` is the node the change originated from (the clicked node,
    /// or the root): entering nodes grow out of its previous position and
    /// exiting nodes shrink into its new one. Afterwards every visible
    /// node's `previous` equals its new `position`.
    pub fn render_full(&mut self, tree: &mut DiffTree, viewport: Size, source: NodeIdx) -> &Scene {
        let started = Instant::now();
        log_op_start!("render_full", node_count = tree.len());

        if tree.is_empty() {
            self.reset();
            log_op_end!("render_full", duration_ms = started.elapsed().as_millis() as u64);
            return &self.scene;
        }

        if self.placed.is_empty() {
            let root = tree.root();
            tree.node_mut(root).previous = self.inner_size(viewport).center();
        }

        let layout = tidy_layout(tree, self.spacing);
        for &(idx, position) in &layout.positions {
            tree.node_mut(idx).position = position;
        }

        let origin_before = tree.node(source).previous;
        let origin_after = tree.node(source).position;

        let placed: Vec<(NodeKey, Point)> = layout
            .positions
            .iter()
            .map(|&(idx, p)| (tree.node(idx).key.clone(), p))
            .collect();
        let linked: Vec<(NodeKey, LinkPath)> = layout
            .positions
            .iter()
            .filter_map(|&(idx, p)| {
                let parent = tree.node(idx).parent?;
                Some((
                    tree.node(idx).key.clone(),
                    LinkPath::new(p, tree.node(parent).position),
                ))
            })
            .collect();

        let node_diff = keyed_diff(&self.placed, &placed);
        let link_diff = keyed_diff(&self.linked, &linked);

        let old_positions: HashMap<&NodeKey, Point> = node_diff
            .persisting
            .iter()
            .map(|p| (&p.key, p.old))
            .collect();
        let mut nodes = Vec::with_capacity(placed.len() + node_diff.exiting.len());
        for &(idx, _) in &layout.positions {
            let node = tree.node(idx);
            let (phase, from) = match old_positions.get(&node.key) {
                Some(old) => (Phase::Update, *old),
                None => (Phase::Enter, origin_before),
            };
            nodes.push(self.visual(tree, idx, phase, from, node.position));
        }
        for (key, old) in &node_diff.exiting {
            // exiting nodes are hidden now but still in the arena
            if let Some(idx) = tree.find(key) {
                nodes.push(self.visual(tree, idx, Phase::Exit, *old, origin_after));
            }
        }

        let mut links = Vec::with_capacity(linked.len() + link_diff.exiting.len());
        for (key, path) in &link_diff.entering {
            links.push(LinkVisual {
                child: key.clone(),
                phase: Phase::Enter,
                from: LinkPath::collapsed(origin_before),
                to: *path,
            });
        }
        for persisting in &link_diff.persisting {
            links.push(LinkVisual {
                child: persisting.key.clone(),
                phase: Phase::Update,
                from: persisting.old,
                to: persisting.new,
            });
        }
        for (key, path) in &link_diff.exiting {
            links.push(LinkVisual {
                child: key.clone(),
                phase: Phase::Exit,
                from: *path,
                to: LinkPath::collapsed(origin_after),
            });
        }

        for &(idx, position) in &layout.positions {
            tree.node_mut(idx).previous = position;
        }

        tracing::debug!(
            entering = node_diff.entering.len(),
            persisting = node_diff.persisting.len(),
            exiting = node_diff.exiting.len(),
            breadth = layout.breadth,
            "reconciled render pass"
        );

        self.on_screen = nodes
            .iter()
            .enumerate()
            .filter(|(_, v)| v.phase != Phase::Exit)
            .map(|(i, v)| (v.key.clone(), i))
            .collect();
        self.placed = placed;
        self.linked = linked;
        self.layout = layout;
        self.scene = Scene {
            nodes,
            links,
            duration: self.duration,
        };

        log_op_end!(
            "render_full",
            duration_ms = started.elapsed().as_millis() as u64,
            node_count = self.placed.len()
        );
        &self.scene
    }

    /// Label-only pass over already rendered nodes
    ///
    /// Never moves anything. Nodes that are not on screen are skipped; they
    /// pick up their label on the next full render.
    pub fn relabel(&mut self, tree: &DiffTree, changed: &[NodeIdx]) -> Vec<LabelUpdate> {
        let started = Instant::now();
        let mut updates = Vec::new();
        for &idx in changed {
            let node = tree.node(idx);
            let Some(visual) = self
                .on_screen
                .get(&node.key)
                .and_then(|&i| self.scene.nodes.get_mut(i))
            else {
                continue;
            };
            if visual.label != node.label {
                visual.label = node.label.clone();
                updates.push(LabelUpdate {
                    key: node.key.clone(),
                    label: node.label.clone(),
                });
            }
        }
        log_op_end!(
            "relabel",
            duration_ms = started.elapsed().as_millis() as u64,
            changed = changed.len(),
            updated = updates.len()
        );
        updates
    }

    fn visual(&self, tree: &DiffTree, idx: NodeIdx, phase: Phase, from: Point, to: Point) -> NodeVisual {
        let node = tree.node(idx);
        let internal = !node.children.visible().is_empty();
        let (anchor, label_dx) = if internal {
            (LabelAnchor::End, -self.label_offset)
        } else {
            (LabelAnchor::Start, self.label_offset)
        };
        NodeVisual {
            key: node.key.clone(),
            label: node.label.clone(),
            side: node.side,
            internal,
            has_hidden_children: node.children.is_collapsed(),
            anchor,
            label_dx,
            radius: self.node_radius,
            phase,
            from,
            to,
        }
    }
}
