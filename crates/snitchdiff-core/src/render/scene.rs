//! Backend-neutral description of a rendered tree
//!
//! A [`Scene`] is what one render pass produces: every node and link that
//! should be on screen (plus the ones on their way out) with start and end
//! positions for the transition. A drawing shell samples it with
//! [`NodeVisual::at`] / [`LinkVisual::at`] as time advances.

use std::time::Duration;

use serde::Serialize;

use crate::geometry::{ease_cubic_in_out, Point};
use crate::model::{NodeKey, Side};

/// Where a visual is in its lifecycle for this pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

/// Which end of the label sits at the anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAnchor {
    /// Text runs leftwards from the anchor; used for expanded internal nodes
    End,
    Start,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeVisual {
    pub key: NodeKey,
    pub label: String,
    pub side: Side,
    /// Has visible children
    pub internal: bool,
    /// Has children that are currently collapsed
    pub has_hidden_children: bool,
    pub anchor: LabelAnchor,
    /// Horizontal label offset from the node centre
    pub label_dx: f64,
    pub radius: f64,
    pub phase: Phase,
    pub from: Point,
    pub to: Point,
}

impl NodeVisual {
    /// Space separated class list, e.g. `"node node--internal added"`
    pub fn class(&self) -> String {
        let shape = if self.internal {
            "node--internal"
        } else {
            "node--leaf"
        };
        format!("node {} {}", shape, self.side.css_class())
    }

    /// Class of the node's circle; `"empty"` unless children are hidden
    pub fn circle_class(&self) -> &'static str {
        if self.has_hidden_children {
            ""
        } else {
            "empty"
        }
    }

    /// Position at transition progress `t` in `[0, 1]`
    pub fn at(&self, t: f64) -> Point {
        self.from.lerp(self.to, ease_cubic_in_out(t))
    }
}

/// Cubic "diagonal" between a child and its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkPath {
    pub source: Point,
    pub target: Point,
}

impl LinkPath {
    pub fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }

    /// A zero-length link sitting on one point
    pub fn collapsed(at: Point) -> Self {
        Self::new(at, at)
    }

    /// SVG path data; control points share the horizontal midpoint
    pub fn to_svg(&self) -> String {
        let (s, d) = (self.source, self.target);
        let mid = (s.x + d.x) / 2.0;
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            s.x, s.y, mid, s.y, mid, d.y, d.x, d.y
        )
    }

    pub fn lerp(&self, to: &LinkPath, t: f64) -> LinkPath {
        LinkPath::new(self.source.lerp(to.source, t), self.target.lerp(to.target, t))
    }
}

/// Link from a node to its parent, keyed by the child
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkVisual {
    pub child: NodeKey,
    pub phase: Phase,
    pub from: LinkPath,
    pub to: LinkPath,
}

impl LinkVisual {
    pub fn at(&self, t: f64) -> LinkPath {
        self.from.lerp(&self.to, ease_cubic_in_out(t))
    }
}

/// Output of one render pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    /// Entering and persisting nodes in pre-order, then exiting nodes
    pub nodes: Vec<NodeVisual>,
    pub links: Vec<LinkVisual>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl Scene {
    pub fn node(&self, key: &NodeKey) -> Option<&NodeVisual> {
        self.nodes.iter().find(|n| &n.key == key)
    }

    /// Nodes that remain after the transition
    pub fn settled(&self) -> impl Iterator<Item = &NodeVisual> {
        self.nodes.iter().filter(|n| n.phase != Phase::Exit)
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.nodes.iter().filter(|n| n.phase == phase).count()
    }

    /// Drop exiting visuals and pin every remaining one at its target
    pub fn settle(&mut self) {
        self.nodes.retain(|n| n.phase != Phase::Exit);
        self.links.retain(|l| l.phase != Phase::Exit);
        for node in &mut self.nodes {
            node.from = node.to;
            node.phase = Phase::Update;
        }
        for link in &mut self.links {
            link.from = link.to;
            link.phase = Phase::Update;
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visual(phase: Phase) -> NodeVisual {
        NodeVisual {
            key: NodeKey::new("host", "h1"),
            label: "host: h1".to_string(),
            side: Side::Right,
            internal: true,
            has_hidden_children: false,
            anchor: LabelAnchor::End,
            label_dx: -15.0,
            radius: 10.0,
            phase,
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 50.0),
        }
    }

    #[test]
    fn test_class_combines_shape_and_side() {
        let v = visual(Phase::Enter);
        assert_eq!(v.class(), "node node--internal added");
        assert_eq!(v.circle_class(), "empty");
    }

    #[test]
    fn test_sampling_hits_endpoints() {
        let v = visual(Phase::Update);
        assert_eq!(v.at(0.0), v.from);
        assert_eq!(v.at(1.0), v.to);
        assert_eq!(v.at(0.5), Point::new(50.0, 25.0));
    }

    #[test]
    fn test_diagonal_svg() {
        let link = LinkPath::new(Point::new(100.0, 40.0), Point::new(0.0, 10.0));
        assert_eq!(link.to_svg(), "M 100 40 C 50 40, 50 10, 0 10");
    }

    #[test]
    fn test_settle_drops_exits() {
        let mut scene = Scene {
            nodes: vec![visual(Phase::Enter), visual(Phase::Exit)],
            links: Vec::new(),
            duration: Duration::from_millis(750),
        };

        scene.settle();

        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.nodes[0].from, scene.nodes[0].to);
        assert_eq!(scene.count(Phase::Update), 1);
    }
}
