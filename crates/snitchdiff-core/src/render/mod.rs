//! Rendering: tidy layout, keyed reconciliation and scene output

pub mod keyed_diff;
pub mod layout;
pub mod renderer;
pub mod scene;

pub use keyed_diff::{keyed_diff, KeyedDiff, Persisting};
pub use layout::{tidy_layout, Layout, LayoutSpacing};
pub use renderer::{LabelUpdate, TreeRenderer};
pub use scene::{LabelAnchor, LinkPath, LinkVisual, NodeVisual, Phase, Scene};
