//! Diff view configuration
//!
//! Every knob has a default matching the stock viewer behaviour, so an empty
//! TOML document is a valid configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{DiffError, Result};

/// Layout margins around the tree group, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            bottom: 20.0,
            left: 250.0,
            right: 250.0,
        }
    }
}

/// Configuration for loading, layout and camera behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffViewConfig {
    /// Period of both the structure poll and the node-page poll
    pub poll_interval_ms: u64,
    /// Node records requested per page
    pub page_size: usize,
    /// Duration of node, link and camera transitions
    pub transition_ms: u64,
    /// Period of the drag auto-pan timer
    pub autopan_interval_ms: u64,
    /// Pixels panned per auto-pan tick
    pub pan_speed: f64,
    /// Width of the edge band that triggers auto-pan
    pub pan_boundary: f64,
    pub node_radius: f64,
    /// Vertical pixels per sibling at the widest tree level
    pub pixels_per_sibling: f64,
    /// Horizontal pixels per label character, per depth level
    pub label_char_width: f64,
    /// Distance between a node centre and its label
    pub label_offset: f64,
    pub margin: Margins,
    /// Zoom clamp as `[min, max]`
    pub scale_extent: [f64; 2],
    /// Collapse every child subtree of the root on first render
    pub collapse_below_root: bool,
    /// Entity type to the property shown in its label
    pub label_properties: BTreeMap<String, String>,
}

impl Default for DiffViewConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            page_size: 500,
            transition_ms: 750,
            autopan_interval_ms: 50,
            pan_speed: 200.0,
            pan_boundary: 20.0,
            node_radius: 10.0,
            pixels_per_sibling: 25.0,
            label_char_width: 10.0,
            label_offset: 15.0,
            margin: Margins::default(),
            scale_extent: [0.1, 3.0],
            collapse_below_root: true,
            label_properties: BTreeMap::new(),
        }
    }
}

impl DiffViewConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed TOML or out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DiffViewConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(invalid("page_size must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than zero"));
        }
        if self.autopan_interval_ms == 0 {
            return Err(invalid("autopan_interval_ms must be greater than zero"));
        }
        let [min, max] = self.scale_extent;
        if !(min > 0.0 && min < max) {
            return Err(invalid(format!(
                "scale_extent must satisfy 0 < min < max, got [{}, {}]",
                min, max
            )));
        }
        if self.pixels_per_sibling <= 0.0 || self.label_char_width <= 0.0 {
            return Err(invalid("layout spacing must be positive"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn autopan_interval(&self) -> Duration {
        Duration::from_millis(self.autopan_interval_ms)
    }
}

fn invalid(reason: impl Into<String>) -> DiffError {
    DiffError::InvalidConfig {
        reason: reason.into(),
    }
}
