//! snitchdiff core - incremental structural-diff tree viewer engine
//!
//! Loads a two-snapshot structural diff in two phases (a cheap structure
//! skeleton, then paged node details) and keeps an interactive tree view of
//! it up to date while pages arrive:
//! - [`loader`]: sans-IO load state machine, async session, polling timers
//! - [`store`]: flat node-record store filled page by page
//! - [`tree`]: arena tree with collapse/expand state and labels
//! - [`render`]: tidy layout and keyed enter/update/exit reconciliation
//! - [`viewport`]: pan/zoom transform, camera transitions, edge auto-pan
//! - [`detail`]: side-by-side property table of a selected node

pub mod config;
pub mod detail;
pub mod errors;
pub mod geometry;
pub mod loader;
pub mod logging_facility;
pub mod model;
pub mod render;
pub mod store;
pub mod tree;
pub mod viewport;

// Re-export commonly used types
pub use config::DiffViewConfig;
pub use detail::DetailPanel;
pub use errors::{DiffError, ExError, ExErrorKind, Result};
pub use geometry::{Point, Size};
pub use loader::{DiffLoader, DiffSession, DiffSource, LoadState, Scheduler, TimerHandle, TokioScheduler};
pub use model::{DiffRequest, NodeKey, NodeMap, NodePage, NodePoll, NodeRecord, Side, StructureFrame, StructurePoll, StructureResponse};
pub use render::{Scene, TreeRenderer};
pub use store::NodeStore;
pub use tree::{DiffTree, NodeIdx};
pub use viewport::{Transform, ViewportController};
