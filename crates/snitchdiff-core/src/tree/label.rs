use std::collections::BTreeMap;

use crate::config::DiffViewConfig;
use crate::model::{display_value, NodeKey, NodeRecord};

/// Per entity type, the property whose value labels the node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelView {
    properties: BTreeMap<String, String>,
}

impl LabelView {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn from_config(config: &DiffViewConfig) -> Self {
        Self::new(config.label_properties.clone())
    }

    pub fn property_for(&self, entity_type: &str) -> Option<&str> {
        self.properties.get(entity_type).map(String::as_str)
    }

    /// Label for a node
    ///
    /// `"{type}: {value}"` once the record is loaded and a display property is
    /// configured for the type (empty value if the record lacks it), otherwise
    /// the placeholder `"{type}: {id}"`.
    pub fn label(&self, key: &NodeKey, record: Option<&NodeRecord>) -> String {
        match (record, self.property_for(&key.entity_type)) {
            (Some(record), Some(property)) => {
                let value = record.value(property).map(display_value).unwrap_or_default();
                format!("{}: {}", key.entity_type, value)
            }
            _ => placeholder(key),
        }
    }
}

/// Label shown before a node's record has loaded
pub fn placeholder(key: &NodeKey) -> String {
    format!("{}: {}", key.entity_type, key.entity_id)
}
