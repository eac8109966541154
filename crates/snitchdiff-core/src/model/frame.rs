//! Structure-phase wire types
//!
//! The structure response carries the parent/child skeleton of the diff, a
//! node map from `(entity type, entity id)` to the index of the node's
//! detailed record, and the declared total node count.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{DiffError, Result};

/// Which snapshot a node is present in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Only in the left snapshot (removed)
    Left,
    /// Only in the right snapshot (added)
    Right,
    /// In both snapshots, properties possibly changed
    Both,
}

impl Side {
    /// Visual class used by renderers
    pub fn css_class(&self) -> &'static str {
        match self {
            Side::Left => "removed",
            Side::Right => "added",
            Side::Both => "unchanged",
        }
    }
}

/// One node of the structure skeleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureFrame {
    /// Entity type
    pub model: String,
    /// Entity id
    pub id: String,
    pub side: Side,
    #[serde(default)]
    pub children: Vec<StructureFrame>,
}

impl StructureFrame {
    pub fn new(model: impl Into<String>, id: impl Into<String>, side: Side) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
            side,
            children: Vec::new(),
        }
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: StructureFrame) -> Self {
        self.children.push(child);
        self
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.model, &self.id)
    }

    /// Pre-order walk over the whole frame without recursion
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a StructureFrame)) {
        let mut stack = vec![self];
        while let Some(frame) = stack.pop() {
            visit(frame);
            stack.extend(frame.children.iter().rev());
        }
    }

    /// Total number of nodes in this frame
    pub fn count(&self) -> usize {
        let mut n = 0;
        self.walk(|_| n += 1);
        n
    }
}

/// Stable identity of a node across re-renders
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub entity_type: String,
    pub entity_id: String,
}

impl NodeKey {
    pub fn new(entity_type: &str, entity_id: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        }
    }

    /// Parse `type:id`; the id may itself contain colons
    pub fn parse(text: &str) -> Option<Self> {
        let (entity_type, entity_id) = text.split_once(':')?;
        if entity_type.is_empty() || entity_id.is_empty() {
            return None;
        }
        Some(Self::new(entity_type, entity_id))
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

/// Entity type -> entity id -> index into the node store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeMap(BTreeMap<String, BTreeMap<String, usize>>);

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity_type: &str, entity_id: &str, index: usize) {
        self.0
            .entry(entity_type.to_string())
            .or_default()
            .insert(entity_id.to_string(), index);
    }

    pub fn index_of(&self, entity_type: &str, entity_id: &str) -> Option<usize> {
        self.0.get(entity_type)?.get(entity_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every frame node is mapped, and that every mapped index is
    /// below the declared node count
    ///
    /// # Errors
    ///
    /// `MissingNodeMapping` or `NodeIndexOutOfRange` for the first offender
    /// in frame pre-order.
    pub fn validate(&self, frame: &StructureFrame, node_count: usize) -> Result<()> {
        let mut failure = None;
        frame.walk(|node| {
            if failure.is_some() {
                return;
            }
            match self.index_of(&node.model, &node.id) {
                None => {
                    failure = Some(DiffError::MissingNodeMapping {
                        entity_type: node.model.clone(),
                        entity_id: node.id.clone(),
                    })
                }
                Some(index) if index >= node_count => {
                    failure = Some(DiffError::NodeIndexOutOfRange {
                        entity_type: node.model.clone(),
                        entity_id: node.id.clone(),
                        index,
                        node_count,
                    })
                }
                Some(_) => {}
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A structure response that carries a result
#[derive(Debug, Clone, PartialEq)]
pub struct StructureResponse {
    /// `None` means the snapshots have no meaningful differences
    pub frame: Option<StructureFrame>,
    pub nodemap: NodeMap,
    pub nodecount: usize,
}

impl StructureResponse {
    pub fn empty() -> Self {
        Self {
            frame: None,
            nodemap: NodeMap::new(),
            nodecount: 0,
        }
    }
}

/// Outcome of one structure poll
#[derive(Debug, Clone, PartialEq)]
pub enum StructurePoll {
    /// The diff is still being computed server side
    Pending,
    Ready(StructureResponse),
}

#[derive(Deserialize)]
struct StructureEnvelope {
    #[serde(default, deserialize_with = "present")]
    frame: Option<Option<StructureFrame>>,
    #[serde(default)]
    nodemap: NodeMap,
    #[serde(default)]
    nodecount: usize,
}

/// Distinguishes an explicit `null` from an absent key
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl StructurePoll {
    /// Decode the structure endpoint's JSON body
    ///
    /// An absent `frame` key decodes to `Pending`; `"frame": null` to a ready
    /// response without a frame.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let envelope: StructureEnvelope = serde_json::from_str(text)?;
        Ok(match envelope.frame {
            None => StructurePoll::Pending,
            Some(frame) => StructurePoll::Ready(StructureResponse {
                frame,
                nodemap: envelope.nodemap,
                nodecount: envelope.nodecount,
            }),
        })
    }
}
