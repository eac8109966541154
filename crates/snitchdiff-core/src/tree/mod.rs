//! Diff tree model: arena hierarchy, collapse/expand state and labels

pub mod arena;
pub mod label;

pub use arena::{Children, DiffTree, NodeIdx, ViewNode};
pub use label::LabelView;
