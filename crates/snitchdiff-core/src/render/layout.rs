//! Tidy tree layout
//!
//! Buchheim, Jünger and Leipert's linear-time variant of the Reingold-Tilford
//! / Walker algorithm. Siblings sit one unit apart, cousins two. The breadth
//! axis is then scaled to fit `max_breadth × pixels_per_sibling`; the depth
//! axis is a fixed step per level derived from the longest label.
//!
//! Output coordinates are tree space with the depth axis horizontal (`x`)
//! and the breadth axis vertical (`y`).

use std::collections::HashMap;

use crate::config::DiffViewConfig;
use crate::geometry::Point;
use crate::tree::{DiffTree, NodeIdx};

/// Spacing knobs of the layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpacing {
    pub pixels_per_sibling: f64,
    pub label_char_width: f64,
}

impl LayoutSpacing {
    pub fn from_config(config: &DiffViewConfig) -> Self {
        Self {
            pixels_per_sibling: config.pixels_per_sibling,
            label_char_width: config.label_char_width,
        }
    }
}

/// Positions of every visible node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    /// Visible nodes in pre-order with their tree-space position
    pub positions: Vec<(NodeIdx, Point)>,
    /// Widest level of the visible tree
    pub max_breadth: usize,
    /// Length of the breadth axis in pixels
    pub breadth: f64,
    /// Distance between consecutive depth levels in pixels
    pub depth_step: f64,
}

impl Layout {
    pub fn position(&self, idx: NodeIdx) -> Option<Point> {
        self.positions.iter().find(|(i, _)| *i == idx).map(|(_, p)| *p)
    }
}

/// Scratch node of the tidy algorithm
///
/// Slot 0 is a synthetic parent of the root so the root has a sibling list
/// like every other node.
#[derive(Debug, Clone)]
struct Tidy {
    parent: Option<usize>,
    children: Vec<usize>,
    /// Index among siblings
    number: usize,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    ancestor: usize,
    default_ancestor: Option<usize>,
    thread: Option<usize>,
}

impl Tidy {
    fn new(me: usize, parent: Option<usize>, number: usize) -> Self {
        Self {
            parent,
            children: Vec::new(),
            number,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            ancestor: me,
            default_ancestor: None,
            thread: None,
        }
    }
}

/// Lay out the visible part of `tree`
pub fn tidy_layout(tree: &DiffTree, spacing: LayoutSpacing) -> Layout {
    let visible = tree.visible();
    if visible.is_empty() {
        return Layout::default();
    }

    let mut nodes = vec![Tidy::new(0, None, 0)];
    let mut slot_of: HashMap<NodeIdx, usize> = HashMap::with_capacity(visible.len());
    let mut level_width: Vec<usize> = vec![1];

    for &idx in &visible {
        let node = tree.node(idx);
        let parent = node
            .parent
            .and_then(|p| slot_of.get(&p).copied())
            .unwrap_or(0);
        let me = nodes.len();
        let number = nodes[parent].children.len();
        nodes.push(Tidy::new(me, Some(parent), number));
        nodes[parent].children.push(me);
        slot_of.insert(idx, me);

        let kids = node.children.visible().len();
        if kids > 0 {
            if level_width.len() <= node.depth + 1 {
                level_width.resize(node.depth + 2, 0);
            }
            level_width[node.depth + 1] += kids;
        }
    }

    // left-to-right post-order over the real tree
    let mut order = Vec::with_capacity(visible.len());
    let mut stack = vec![1];
    while let Some(v) = stack.pop() {
        order.push(v);
        stack.extend(nodes[v].children.iter().copied());
    }
    for &v in order.iter().rev() {
        first_walk(&mut nodes, v);
    }

    nodes[0].modifier = -nodes[1].prelim;
    let mut raw = vec![0.0; nodes.len()];
    let mut stack = vec![1];
    while let Some(v) = stack.pop() {
        let parent = nodes[v].parent.unwrap_or(0);
        raw[v] = nodes[v].prelim + nodes[parent].modifier;
        nodes[v].modifier += nodes[parent].modifier;
        stack.extend(nodes[v].children.iter().copied());
    }

    let max_breadth = level_width.iter().copied().max().unwrap_or(1);
    let breadth = max_breadth as f64 * spacing.pixels_per_sibling;
    let depth_step = tree.max_label_len() as f64 * spacing.label_char_width;

    // fit the breadth axis into [0, breadth]
    let mut left = 1;
    let mut right = 1;
    for v in 1..nodes.len() {
        if raw[v] < raw[left] {
            left = v;
        }
        if raw[v] > raw[right] {
            right = v;
        }
    }
    let s = if left == right {
        1.0
    } else {
        separation(&nodes, left, right) / 2.0
    };
    let tx = s - raw[left];
    let kx = breadth / (raw[right] + s + tx);

    let positions = visible
        .iter()
        .map(|&idx| {
            let v = slot_of[&idx];
            let depth = tree.node(idx).depth as f64;
            (idx, Point::new(depth * depth_step, (raw[v] + tx) * kx))
        })
        .collect();

    Layout {
        positions,
        max_breadth,
        breadth,
        depth_step,
    }
}

fn separation(n: &[Tidy], a: usize, b: usize) -> f64 {
    if n[a].parent == n[b].parent {
        1.0
    } else {
        2.0
    }
}

fn next_left(n: &[Tidy], v: usize) -> Option<usize> {
    n[v].children.first().copied().or(n[v].thread)
}

fn next_right(n: &[Tidy], v: usize) -> Option<usize> {
    n[v].children.last().copied().or(n[v].thread)
}

fn first_walk(n: &mut [Tidy], v: usize) {
    let parent = n[v].parent.unwrap_or(0);
    let left_sibling = if n[v].number > 0 {
        Some(n[parent].children[n[v].number - 1])
    } else {
        None
    };

    let ends = (n[v].children.first().copied(), n[v].children.last().copied());
    if let (Some(first), Some(last)) = ends {
        execute_shifts(n, v);
        let midpoint = (n[first].prelim + n[last].prelim) / 2.0;
        match left_sibling {
            Some(w) => {
                n[v].prelim = n[w].prelim + separation(n, v, w);
                n[v].modifier = n[v].prelim - midpoint;
            }
            None => n[v].prelim = midpoint,
        }
    } else if let Some(w) = left_sibling {
        n[v].prelim = n[w].prelim + separation(n, v, w);
    }

    let default_ancestor = n[parent]
        .default_ancestor
        .unwrap_or(n[parent].children[0]);
    let ancestor = apportion(n, v, left_sibling, default_ancestor);
    n[parent].default_ancestor = Some(ancestor);
}

fn execute_shifts(n: &mut [Tidy], v: usize) {
    let mut shift = 0.0;
    let mut change = 0.0;
    for k in (0..n[v].children.len()).rev() {
        let w = n[v].children[k];
        n[w].prelim += shift;
        n[w].modifier += shift;
        change += n[w].change;
        shift += n[w].shift + change;
    }
}

fn move_subtree(n: &mut [Tidy], wm: usize, wp: usize, shift: f64) {
    let change = shift / (n[wp].number as f64 - n[wm].number as f64);
    n[wp].change -= change;
    n[wp].shift += shift;
    n[wm].change += change;
    n[wp].prelim += shift;
    n[wp].modifier += shift;
}

fn next_ancestor(n: &[Tidy], vim: usize, v: usize, ancestor: usize) -> usize {
    if n[n[vim].ancestor].parent == n[v].parent {
        n[vim].ancestor
    } else {
        ancestor
    }
}

/// Push `v`'s subtree right until it clears every subtree to its left
fn apportion(n: &mut [Tidy], v: usize, left_sibling: Option<usize>, ancestor: usize) -> usize {
    let Some(w) = left_sibling else {
        return ancestor;
    };
    let mut ancestor = ancestor;
    let parent = n[v].parent.unwrap_or(0);

    let mut vop = v;
    let mut vom = n[parent].children[0];
    let mut sip = n[v].modifier;
    let mut sop = n[v].modifier;
    let mut sim = n[w].modifier;
    let mut som = n[vom].modifier;

    let mut inner_minus = next_right(n, w);
    let mut inner_plus = next_left(n, v);
    while let (Some(vim), Some(vip)) = (inner_minus, inner_plus) {
        let (Some(outer_minus), Some(outer_plus)) = (next_left(n, vom), next_right(n, vop)) else {
            break;
        };
        vom = outer_minus;
        vop = outer_plus;
        n[vop].ancestor = v;

        let shift = n[vim].prelim + sim - n[vip].prelim - sip + separation(n, vim, vip);
        if shift > 0.0 {
            let from = next_ancestor(n, vim, v, ancestor);
            move_subtree(n, from, v, shift);
            sip += shift;
            sop += shift;
        }
        sim += n[vim].modifier;
        sip += n[vip].modifier;
        som += n[vom].modifier;
        sop += n[vop].modifier;

        inner_minus = next_right(n, vim);
        inner_plus = next_left(n, vip);
    }

    if let Some(vim) = inner_minus {
        if next_right(n, vop).is_none() {
            n[vop].thread = Some(vim);
            n[vop].modifier += sim - sop;
        }
    }
    if let Some(vip) = inner_plus {
        if next_left(n, vom).is_none() {
            n[vom].thread = Some(vip);
            n[vom].modifier += sip - som;
            ancestor = v;
        }
    }
    ancestor
}
