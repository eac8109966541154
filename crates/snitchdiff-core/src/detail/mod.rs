//! Property detail panel of a selected node

pub mod panel;

pub use panel::{DetailCell, DetailPanel, DetailRow, Provenance, RowChange};
