//! Shared fixtures for integration tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use snitchdiff_core::errors::{DiffError, Result};
use snitchdiff_core::{
    DiffRequest, DiffSession, DiffSource, DiffViewConfig, NodeMap, NodePage, NodePoll, NodeRecord, Side,
    Size, StructureFrame, StructurePoll, StructureResponse, TokioScheduler,
};

/// A call the mock source received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Structure(String),
    Nodes { entity: String, offset: usize, limit: usize },
}

/// Scripted [`DiffSource`] that records every call
///
/// Structure polls consume the script front to back and then keep
/// answering with its last entry.
pub struct MockSource {
    structure: Mutex<VecDeque<Result<StructurePoll>>>,
    nodes: Vec<NodeRecord>,
    fail_at: Option<usize>,
    pending_nodes: Mutex<usize>,
    structure_delay: Option<Duration>,
    node_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new(structure: Vec<Result<StructurePoll>>, nodes: Vec<NodeRecord>) -> Self {
        Self {
            structure: Mutex::new(structure.into()),
            nodes,
            fail_at: None,
            pending_nodes: Mutex::new(0),
            structure_delay: None,
            node_delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Structure ready on the first poll
    pub fn ready(response: StructureResponse, nodes: Vec<NodeRecord>) -> Self {
        Self::new(vec![Ok(StructurePoll::Ready(response))], nodes)
    }

    /// Fail the node fetch at `offset` with a transport error
    pub fn failing_nodes_at(mut self, offset: usize) -> Self {
        self.fail_at = Some(offset);
        self
    }

    /// Answer the first `count` node fetches with `Pending`
    pub fn pending_nodes(self, count: usize) -> Self {
        *self.pending_nodes.lock().unwrap() = count;
        self
    }

    /// Delay every structure fetch by `delay`
    pub fn with_structure_delay(mut self, delay: Duration) -> Self {
        self.structure_delay = Some(delay);
        self
    }

    /// Delay every node fetch by `delay`
    pub fn with_node_delay(mut self, delay: Duration) -> Self {
        self.node_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn structure_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Structure(_)))
            .count()
    }

    /// Offsets of node fetches, in call order
    pub fn node_offsets(&self) -> Vec<usize> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Nodes { offset, .. } => Some(*offset),
                Call::Structure(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl DiffSource for MockSource {
    async fn fetch_structure(&self, request: &DiffRequest) -> Result<StructurePoll> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Structure(request.entity_id.clone()));
        if let Some(delay) = self.structure_delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.structure.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }

    async fn fetch_nodes(&self, request: &DiffRequest, offset: usize, limit: usize) -> Result<NodePoll> {
        self.calls.lock().unwrap().push(Call::Nodes {
            entity: request.entity_id.clone(),
            offset,
            limit,
        });
        if let Some(delay) = self.node_delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut pending = self.pending_nodes.lock().unwrap();
            if *pending > 0 {
                *pending -= 1;
                return Ok(NodePoll::Pending);
            }
        }
        if self.fail_at == Some(offset) {
            return Err(DiffError::Transport {
                message: "connection reset".to_string(),
            });
        }
        let end = (offset + limit).min(self.nodes.len());
        let start = offset.min(end);
        Ok(NodePage {
            nodes: self.nodes[start..end].to_vec(),
        }
        .into())
    }
}

#[allow(dead_code)]
pub fn request(entity_id: &str) -> DiffRequest {
    DiffRequest::new(
        "environment",
        entity_id,
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
    )
}

#[allow(dead_code)]
pub fn config() -> DiffViewConfig {
    let mut config = DiffViewConfig::default();
    config
        .label_properties
        .insert("host".to_string(), "hostname".to_string());
    config
}

/// Environment root with `node_count - 1` host children
///
/// Store index follows walk order; host `i` gets `hostname = "node-{i+1}"`.
#[allow(dead_code)]
pub fn wide_diff(node_count: usize) -> (StructureResponse, Vec<NodeRecord>) {
    let mut frame = StructureFrame::new("environment", "prod", Side::Both);
    let mut nodemap = NodeMap::new();
    nodemap.insert("environment", "prod", 0);
    let mut records = vec![record_with("name", "prod")];

    for i in 1..node_count {
        let id = format!("h{:05}", i);
        let side = match i % 3 {
            0 => Side::Left,
            1 => Side::Right,
            _ => Side::Both,
        };
        frame = frame.with_child(StructureFrame::new("host", &id, side));
        nodemap.insert("host", &id, i);
        records.push(record_with("hostname", &format!("node-{}", i)));
    }

    let response = StructureResponse {
        frame: Some(frame),
        nodemap,
        nodecount: node_count,
    };
    (response, records)
}

#[allow(dead_code)]
pub fn record_with(property: &str, value: &str) -> NodeRecord {
    let mut record = NodeRecord::default();
    record.both.insert(property.to_string(), json!(value));
    record
}

#[allow(dead_code)]
pub fn session(source: Arc<MockSource>) -> DiffSession {
    let scheduler = TokioScheduler::current().unwrap();
    DiffSession::new(source, Arc::new(scheduler), config(), Size::new(1280.0, 720.0)).unwrap()
}

/// Advance paused time and let spawned fetches run
#[allow(dead_code)]
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
