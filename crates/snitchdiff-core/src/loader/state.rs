use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one diff load
///
/// `LoadingStructure → LoadingNodes → Done`, or `LoadingStructure → Empty`
/// when the two snapshots do not differ. `Error` is terminal and reachable
/// from both loading states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadState {
    #[default]
    LoadingStructure,
    LoadingNodes,
    Done,
    Empty,
    Error,
}

impl LoadState {
    /// Status line text
    pub fn human(self) -> &'static str {
        match self {
            LoadState::LoadingStructure => "Loading Structure",
            LoadState::LoadingNodes => "Loading Nodes",
            LoadState::Done => "Done",
            LoadState::Empty => "No meaningful differences.",
            LoadState::Error => "Error loading diff",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Done | LoadState::Empty | LoadState::Error)
    }

    /// Whether a tree exists to render
    pub fn has_tree(self) -> bool {
        matches!(self, LoadState::LoadingNodes | LoadState::Done)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.human())
    }
}
