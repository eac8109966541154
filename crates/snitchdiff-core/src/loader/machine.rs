//! Sans-IO diff loader
//!
//! Owns everything a load produces (node map, node store, tree) and decides
//! which request goes out next. It never performs I/O itself: the caller
//! asks for the next request, performs it, and hands the result back
//! together with the token it was issued. Tokens from a superseded load or
//! a stale offset are discarded without touching any state.

use std::ops::Range;
use std::time::Instant;

use crate::config::DiffViewConfig;
use crate::errors::{DiffError, Result};
use crate::loader::state::LoadState;
use crate::model::{DiffRequest, NodeKey, NodeMap, NodePoll, NodeRecord, StructurePoll};
use crate::store::NodeStore;
use crate::tree::{DiffTree, LabelView, NodeIdx};
use crate::{log_op_end, log_op_error, log_op_start};

/// Identifies one call to [`DiffLoader::begin`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A node page to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: Generation,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructureOutcome {
    /// Server still computing; poll again
    Pending,
    /// Response belongs to a superseded load or arrived after the structure
    Discarded,
    Loaded { node_count: usize },
    Empty,
    Failed(DiffError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Page not ready server side; the same offset goes out again
    Pending,
    Discarded(DiffError),
    Applied {
        range: Range<usize>,
        complete: bool,
        /// Nodes whose label text changed
        relabeled: Vec<NodeIdx>,
    },
    Failed(DiffError),
}

#[derive(Debug, Clone)]
pub struct DiffLoader {
    page_size: usize,
    collapse_below_root: bool,
    labels: LabelView,
    generation: Generation,
    request: Option<DiffRequest>,
    state: LoadState,
    cancelled: bool,
    structure_in_flight: bool,
    offset: usize,
    page_in_flight: Option<usize>,
    nodemap: NodeMap,
    store: NodeStore,
    tree: Option<DiffTree>,
}

impl DiffLoader {
    pub fn new(config: &DiffViewConfig) -> Self {
        Self {
            page_size: config.page_size,
            collapse_below_root: config.collapse_below_root,
            labels: LabelView::from_config(config),
            generation: Generation::default(),
            request: None,
            state: LoadState::LoadingStructure,
            cancelled: false,
            structure_in_flight: false,
            offset: 0,
            page_in_flight: None,
            nodemap: NodeMap::new(),
            store: NodeStore::new(),
            tree: None,
        }
    }

    /// Start loading `request`, dropping everything from the previous load
    pub fn begin(&mut self, request: DiffRequest) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        tracing::debug!(
            generation = self.generation.0,
            request = %request,
            "begin diff load"
        );
        self.request = Some(request);
        self.state = LoadState::LoadingStructure;
        self.structure_in_flight = false;
        self.offset = 0;
        self.page_in_flight = None;
        self.nodemap = NodeMap::new();
        self.store.clear();
        self.tree = None;
        self.cancelled = false;
        self.generation
    }

    /// Stop the current load where it stands
    ///
    /// Every outstanding token goes stale and no further poll or page is
    /// handed out until the next [`begin`](Self::begin). State, store and
    /// tree keep what had landed.
    pub fn cancel(&mut self) {
        self.generation = Generation(self.generation.0 + 1);
        self.cancelled = true;
        self.structure_in_flight = false;
        self.page_in_flight = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Token for the next structure poll, unless one is already out
    pub fn next_structure_poll(&mut self) -> Option<Generation> {
        if self.state != LoadState::LoadingStructure
            || self.request.is_none()
            || self.cancelled
            || self.structure_in_flight
        {
            return None;
        }
        self.structure_in_flight = true;
        Some(self.generation)
    }

    pub fn on_structure(&mut self, generation: Generation, result: Result<StructurePoll>) -> StructureOutcome {
        if generation != self.generation || self.state != LoadState::LoadingStructure {
            tracing::debug!(
                generation = generation.0,
                current = self.generation.0,
                "discarding stale structure response"
            );
            return StructureOutcome::Discarded;
        }
        self.structure_in_flight = false;

        let response = match result {
            Ok(StructurePoll::Pending) => return StructureOutcome::Pending,
            Ok(StructurePoll::Ready(response)) => response,
            Err(err) => {
                self.state = LoadState::Error;
                return StructureOutcome::Failed(DiffError::StructureFetchFailed {
                    message: err.to_string(),
                });
            }
        };

        let Some(frame) = response.frame else {
            self.state = LoadState::Empty;
            return StructureOutcome::Empty;
        };

        let started = Instant::now();
        log_op_start!("build_tree", node_count = response.nodecount);
        let mut tree = match DiffTree::build(&frame, &response.nodemap, response.nodecount) {
            Ok(tree) => tree,
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                log_op_error!("build_tree", err.clone(), duration_ms = duration_ms);
                self.state = LoadState::Error;
                return StructureOutcome::Failed(err);
            }
        };
        if self.collapse_below_root {
            tree.collapse_below_root();
        }

        log_op_end!(
            "build_tree",
            duration_ms = started.elapsed().as_millis() as u64,
            node_count = tree.len()
        );

        self.nodemap = response.nodemap;
        self.store = NodeStore::with_capacity(response.nodecount);
        self.tree = Some(tree);
        self.offset = 0;
        self.state = LoadState::LoadingNodes;
        StructureOutcome::Loaded {
            node_count: response.nodecount,
        }
    }

    /// The next node page to fetch
    ///
    /// `None` outside `LoadingNodes` and while the page at the cursor is
    /// still in flight, so pages go out in strictly increasing offset order.
    pub fn next_page(&mut self) -> Option<PageRequest> {
        if self.state != LoadState::LoadingNodes || self.cancelled || self.page_in_flight.is_some() {
            return None;
        }
        self.page_in_flight = Some(self.offset);
        Some(PageRequest {
            generation: self.generation,
            offset: self.offset,
            limit: self.page_size,
        })
    }

    pub fn on_page(&mut self, request: PageRequest, result: Result<NodePoll>) -> PageOutcome {
        if request.generation != self.generation
            || self.state != LoadState::LoadingNodes
            || request.offset != self.offset
        {
            return PageOutcome::Discarded(DiffError::StaleResponseDiscarded {
                offset: request.offset,
                cursor: self.offset,
            });
        }
        self.page_in_flight = None;

        let page = match result {
            Ok(NodePoll::Ready(page)) => page,
            Ok(NodePoll::Pending) => return PageOutcome::Pending,
            Err(err) => {
                self.state = LoadState::Error;
                return PageOutcome::Failed(DiffError::NodeFetchFailed {
                    offset: request.offset,
                    message: err.to_string(),
                });
            }
        };

        let len = page.len();
        let range = match self.store.write_page(request.offset, page.nodes) {
            Ok(range) => range,
            Err(err) => {
                self.state = LoadState::Error;
                return PageOutcome::Failed(err);
            }
        };
        self.offset += len;

        let complete = len < self.page_size || self.store.is_complete();
        let mut relabeled = match &mut self.tree {
            Some(tree) => tree.relabel(&self.store, &self.labels, Some(range.clone())),
            None => Vec::new(),
        };
        if complete {
            self.state = LoadState::Done;
            if let Some(tree) = &mut self.tree {
                relabeled.extend(tree.relabel(&self.store, &self.labels, None));
            }
        }

        PageOutcome::Applied {
            range,
            complete,
            relabeled,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn request(&self) -> Option<&DiffRequest> {
        self.request.as_ref()
    }

    /// Offset of the next page to request
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn nodemap(&self) -> &NodeMap {
        &self.nodemap
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn tree(&self) -> Option<&DiffTree> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut DiffTree> {
        self.tree.as_mut()
    }

    pub fn labels(&self) -> &LabelView {
        &self.labels
    }

    /// Loaded record of a node, if its page has arrived
    pub fn record(&self, key: &NodeKey) -> Option<&NodeRecord> {
        self.store
            .lookup(&self.nodemap, &key.entity_type, &key.entity_id)
    }
}
