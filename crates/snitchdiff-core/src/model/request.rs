use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one diff: an entity and the two snapshot times to compare
///
/// Immutable once issued. A session restarts loading only when a request
/// that differs from the active one arrives (or on explicit refresh).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffRequest {
    /// Entity type of the diff root (e.g. `environment`)
    pub entity_type: String,
    /// Entity id of the diff root
    pub entity_id: String,
    /// Snapshot time of the left side
    pub left: DateTime<Utc>,
    /// Snapshot time of the right side
    pub right: DateTime<Utc>,
}

impl DiffRequest {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        left: DateTime<Utc>,
        right: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            left,
            right,
        }
    }
}

impl std::fmt::Display for DiffRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} [{} .. {}]",
            self.entity_type,
            self.entity_id,
            self.left.to_rfc3339(),
            self.right.to_rfc3339()
        )
    }
}
