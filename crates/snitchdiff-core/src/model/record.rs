use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// Property name to value
pub type PropertyMap = BTreeMap<String, Value>;

/// Detailed per-node property diff, fetched lazily in pages
///
/// A property unchanged across snapshots lives in `both`; a changed one
/// appears in `left` and/or `right` instead, never in `both`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub left: PropertyMap,
    #[serde(default)]
    pub right: PropertyMap,
    #[serde(default)]
    pub both: PropertyMap,
}

impl NodeRecord {
    /// Value of a property, preferring `both`, then `right`, then `left`
    pub fn value(&self, property: &str) -> Option<&Value> {
        self.both
            .get(property)
            .or_else(|| self.right.get(property))
            .or_else(|| self.left.get(property))
    }

    /// Union of property names over all three maps, sorted and deduplicated
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .left
            .keys()
            .chain(self.right.keys())
            .chain(self.both.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// One page of node records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePage {
    pub nodes: Vec<NodeRecord>,
}

impl NodePage {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Outcome of one node page fetch
#[derive(Debug, Clone, PartialEq)]
pub enum NodePoll {
    /// Records for this page are not ready yet; ask again next tick
    Pending,
    Ready(NodePage),
}

#[derive(Deserialize)]
struct NodeEnvelope {
    nodes: Option<Vec<NodeRecord>>,
}

impl NodePoll {
    /// Decode the nodes endpoint's JSON body
    ///
    /// A body without a `nodes` key decodes to `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let envelope: NodeEnvelope = serde_json::from_str(text)?;
        Ok(match envelope.nodes {
            None => NodePoll::Pending,
            Some(nodes) => NodePoll::Ready(NodePage { nodes }),
        })
    }
}

impl From<NodePage> for NodePoll {
    fn from(page: NodePage) -> Self {
        NodePoll::Ready(page)
    }
}

/// Render a property value for display
///
/// Strings are shown bare, `null` as empty, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
