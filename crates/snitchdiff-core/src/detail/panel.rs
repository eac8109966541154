use serde::Serialize;

use crate::model::{display_value, NodeKey, NodeRecord};

/// Which part of the record a cell value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Unchanged across snapshots
    Both,
    Left,
    Right,
}

impl Provenance {
    /// Highlight class; unchanged values carry none
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Provenance::Both => None,
            Provenance::Left => Some("diffLeft"),
            Provenance::Right => Some("diffRight"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailCell {
    pub value: String,
    pub provenance: Provenance,
}

/// How a property differs between the two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowChange {
    Unchanged,
    /// Only in the left snapshot
    Removed,
    /// Only in the right snapshot
    Added,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub property: String,
    pub left: DetailCell,
    pub right: DetailCell,
    pub change: RowChange,
}

/// Side-by-side property table of one selected node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailPanel {
    pub key: NodeKey,
    pub rows: Vec<DetailRow>,
}

impl DetailPanel {
    /// One row per property name across `left`, `right` and `both`, sorted
    pub fn build(key: NodeKey, record: &NodeRecord) -> Self {
        let rows = record
            .property_names()
            .into_iter()
            .map(|property| row(record, property))
            .collect();
        Self { key, rows }
    }

    pub fn row(&self, property: &str) -> Option<&DetailRow> {
        self.rows.iter().find(|r| r.property == property)
    }

    /// Rows that differ between the snapshots
    pub fn changed(&self) -> impl Iterator<Item = &DetailRow> {
        self.rows.iter().filter(|r| r.change != RowChange::Unchanged)
    }
}

fn row(record: &NodeRecord, property: &str) -> DetailRow {
    if let Some(value) = record.both.get(property) {
        let cell = DetailCell {
            value: display_value(value),
            provenance: Provenance::Both,
        };
        return DetailRow {
            property: property.to_string(),
            left: cell.clone(),
            right: cell,
            change: RowChange::Unchanged,
        };
    }

    let left = record.left.get(property);
    let right = record.right.get(property);
    let change = match (left, right) {
        (Some(_), None) => RowChange::Removed,
        (None, Some(_)) => RowChange::Added,
        _ => RowChange::Modified,
    };
    DetailRow {
        property: property.to_string(),
        left: DetailCell {
            value: left.map(display_value).unwrap_or_default(),
            provenance: Provenance::Left,
        },
        right: DetailCell {
            value: right.map(display_value).unwrap_or_default(),
            provenance: Provenance::Right,
        },
        change,
    }
}
