//! Fixture-backed diff source and the shared load driver

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::Args;
use snitchdiff_core::errors::{DiffError, Result};
use snitchdiff_core::{
    DiffRequest, DiffSession, DiffSource, DiffViewConfig, LoadState, NodePage, NodePoll, NodeRecord, Size,
    StructurePoll, TokioScheduler,
};

/// Arguments shared by every command that loads a diff
#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Directory holding structure.json and nodes.json
    #[arg(long)]
    pub fixtures: PathBuf,

    /// Entity type of the diff root
    #[arg(long = "type")]
    pub entity_type: String,

    /// Entity id of the diff root
    #[arg(long)]
    pub id: String,

    /// Left snapshot time (RFC 3339)
    #[arg(long)]
    pub left: DateTime<Utc>,

    /// Right snapshot time (RFC 3339)
    #[arg(long)]
    pub right: DateTime<Utc>,

    /// TOML view configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Poll period in milliseconds; overrides the config file
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Give up if loading has not finished after this many seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = 1280.0)]
    pub width: f64,

    #[arg(long, default_value_t = 720.0)]
    pub height: f64,
}

impl LoadArgs {
    fn request(&self) -> DiffRequest {
        DiffRequest::new(&self.entity_type, &self.id, self.left, self.right)
    }

    fn view_config(&self) -> Result<DiffViewConfig> {
        let mut config = match &self.config {
            Some(path) => DiffViewConfig::load(path)?,
            None => DiffViewConfig::default(),
        };
        config.poll_interval_ms = self.poll_ms;
        Ok(config)
    }
}

/// Serves a diff from two JSON files
///
/// `structure.json` is the structure endpoint body (`{frame, nodemap,
/// nodecount}`); `nodes.json` is the full node record array, sliced into
/// pages on request.
#[derive(Debug)]
pub struct FixtureSource {
    structure: StructurePoll,
    nodes: Vec<NodeRecord>,
}

impl FixtureSource {
    /// Read both fixture files from `dir`
    ///
    /// # Errors
    ///
    /// `Io` for unreadable files, `Serialization` for malformed JSON.
    pub fn open(dir: &Path) -> Result<Self> {
        let structure_text = std::fs::read_to_string(dir.join("structure.json"))?;
        let structure = StructurePoll::from_json(&structure_text)?;
        let nodes_text = std::fs::read_to_string(dir.join("nodes.json"))?;
        let nodes: Vec<NodeRecord> = serde_json::from_str(&nodes_text)?;
        tracing::debug!(dir = %dir.display(), nodes = nodes.len(), "fixtures loaded");
        Ok(Self { structure, nodes })
    }
}

#[async_trait]
impl DiffSource for FixtureSource {
    async fn fetch_structure(&self, _request: &DiffRequest) -> Result<StructurePoll> {
        Ok(self.structure.clone())
    }

    async fn fetch_nodes(&self, _request: &DiffRequest, offset: usize, limit: usize) -> Result<NodePoll> {
        let end = offset.saturating_add(limit).min(self.nodes.len());
        let start = offset.min(end);
        Ok(NodePage {
            nodes: self.nodes[start..end].to_vec(),
        }
        .into())
    }
}

/// Run one load to a terminal state and hand back the session
///
/// # Errors
///
/// Fixture and config errors, or `Transport` when the load does not settle
/// within the timeout.
pub async fn load(args: &LoadArgs) -> Result<DiffSession> {
    let config = args.view_config()?;
    let source = Arc::new(FixtureSource::open(&args.fixtures)?);
    let scheduler = Arc::new(TokioScheduler::current()?);
    let session = DiffSession::new(source, scheduler, config, Size::new(args.width, args.height))?;

    let mut status = session.subscribe();
    session.update(args.request());

    let settle = async {
        while !status.borrow_and_update().is_terminal() {
            if status.changed().await.is_err() {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(args.timeout_secs), settle)
        .await
        .map_err(|_| DiffError::Transport {
            message: format!(
                "load still in state '{}' after {}s",
                session.state(),
                args.timeout_secs
            ),
        })?;

    Ok(session)
}

/// Current-thread runtime with timers, as the session needs
///
/// # Errors
///
/// Returns `Internal` if the runtime cannot be built.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| DiffError::Internal {
            message: format!("failed to start runtime: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_source_slices_pages() {
        let source = FixtureSource {
            structure: StructurePoll::Pending,
            nodes: vec![NodeRecord::default(); 7],
        };
        let request = DiffRequest::new("environment", "prod", Utc::now(), Utc::now());

        let page_len = |poll: NodePoll| match poll {
            NodePoll::Ready(page) => page.len(),
            NodePoll::Pending => panic!("fixtures are always ready"),
        };

        assert_eq!(page_len(source.fetch_nodes(&request, 0, 5).await.unwrap()), 5);
        assert_eq!(page_len(source.fetch_nodes(&request, 5, 5).await.unwrap()), 2);
        assert_eq!(page_len(source.fetch_nodes(&request, 10, 5).await.unwrap()), 0);
    }

    #[tokio::test]
    async fn test_zero_poll_ms_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("structure.json"), r#"{"frame": null}"#).unwrap();
        std::fs::write(dir.path().join("nodes.json"), "[]").unwrap();
        let args = LoadArgs {
            fixtures: dir.path().to_path_buf(),
            entity_type: "environment".to_string(),
            id: "prod".to_string(),
            left: Utc::now(),
            right: Utc::now(),
            config: None,
            poll_ms: 0,
            timeout_secs: 1,
            width: 1280.0,
            height: 720.0,
        };

        let result = load(&args).await;
        assert!(matches!(result, Err(DiffError::InvalidConfig { .. })));
    }
}
