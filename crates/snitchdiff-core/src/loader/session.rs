//! Async driver around [`DiffLoader`]
//!
//! A [`DiffSession`] owns the loader, the renderer, the viewport and the
//! timers of one diff view. Structure and node polls fire from scheduler
//! timers; each tick starts a detached fetch whose result is applied back
//! under the session lock. The lock is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use snitchdiff_core_types::RequestId;
use tokio::sync::watch;

use crate::config::DiffViewConfig;
use crate::detail::DetailPanel;
use crate::errors::{DiffError, Result};
use crate::geometry::{Point, Size};
use crate::loader::machine::{DiffLoader, Generation, PageOutcome, PageRequest, StructureOutcome};
use crate::loader::scheduler::{Scheduler, TimerHandle};
use crate::loader::source::DiffSource;
use crate::loader::state::LoadState;
use crate::model::{DiffRequest, NodeKey, NodePoll, StructurePoll};
use crate::render::{LabelUpdate, Scene, TreeRenderer};
use crate::tree::{DiffTree, NodeIdx};
use crate::viewport::{AutoPanCommand, DragAutoPan, Transform, ViewportController};
use crate::{log_op_end, log_op_error, log_op_start};

/// One interactive diff view
///
/// Dropping the session cancels every timer it started.
pub struct DiffSession {
    shared: Arc<Shared>,
}

struct Shared {
    source: Arc<dyn DiffSource>,
    scheduler: Arc<dyn Scheduler>,
    config: DiffViewConfig,
    status: watch::Sender<LoadState>,
    state: Mutex<SessionState>,
}

struct SessionState {
    loader: DiffLoader,
    renderer: TreeRenderer,
    viewport: ViewportController,
    autopan: DragAutoPan,
    selected: Option<DetailPanel>,
    label_updates: Vec<LabelUpdate>,
    request_id: RequestId,
    structure_timer: Option<TimerHandle>,
    node_timer: Option<TimerHandle>,
    autopan_timer: Option<TimerHandle>,
}

impl SessionState {
    fn tree_mut(&mut self) -> Result<&mut DiffTree> {
        self.loader.tree_mut().ok_or(DiffError::TreeNotLoaded)
    }

    /// Full render pass from `source` (root when `None`), then centre on it
    fn render(&mut self, source: Option<NodeIdx>) {
        let size = self.viewport.size();
        let Some(tree) = self.loader.tree_mut() else {
            return;
        };
        let source = source.unwrap_or_else(|| tree.root());
        self.renderer.render_full(tree, size, source);
        let focus = tree.node(source).position;
        self.viewport.center_on(focus);
    }

    fn relabel(&mut self, changed: &[NodeIdx]) {
        if let Some(tree) = self.loader.tree() {
            let updates = self.renderer.relabel(tree, changed);
            self.label_updates.extend(updates);
        }
    }

    fn cancel_polls(&mut self) {
        self.structure_timer = None;
        self.node_timer = None;
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: LoadState) {
        self.status.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn start_timer(self: &Arc<Self>, period: Duration, tick: fn(&Arc<Shared>)) -> TimerHandle {
        let weak: Weak<Shared> = Arc::downgrade(self);
        self.scheduler.every(
            period,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    tick(&shared);
                }
            }),
        )
    }

    fn restart(self: &Arc<Self>, st: &mut SessionState, request: DiffRequest) {
        st.cancel_polls();
        st.autopan_timer = None;
        st.autopan.on_end();
        st.renderer.reset();
        st.selected = None;
        st.label_updates.clear();
        st.request_id = RequestId::new();

        tracing::info!(request_id = %st.request_id, request = %request, "diff request issued");
        st.loader.begin(request);
        st.structure_timer = Some(self.start_timer(self.config.poll_interval(), Shared::poll_structure));
    }

    fn poll_structure(self: &Arc<Self>) {
        let (generation, request, request_id) = {
            let mut st = self.lock();
            let Some(request) = st.loader.request().cloned() else {
                return;
            };
            let Some(generation) = st.loader.next_structure_poll() else {
                return;
            };
            (generation, request, st.request_id.clone())
        };

        let source = Arc::clone(&self.source);
        let weak = Arc::downgrade(self);
        self.scheduler.spawn(Box::pin(async move {
            let started = Instant::now();
            log_op_start!("load_structure", request_id = %request_id);
            let result = source.fetch_structure(&request).await;
            if let Some(shared) = weak.upgrade() {
                shared.apply_structure(generation, result, started);
            }
        }));
    }

    fn apply_structure(self: &Arc<Self>, generation: Generation, result: Result<StructurePoll>, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let mut st = self.lock();

        match st.loader.on_structure(generation, result) {
            StructureOutcome::Pending => {
                tracing::debug!(duration_ms, "structure not ready yet");
            }
            StructureOutcome::Discarded => {}
            StructureOutcome::Loaded { node_count } => {
                st.structure_timer = None;
                log_op_end!("load_structure", duration_ms = duration_ms, node_count = node_count);
                st.render(None);
                st.node_timer = Some(self.start_timer(self.config.poll_interval(), Shared::poll_nodes));
            }
            StructureOutcome::Empty => {
                st.structure_timer = None;
                log_op_end!("load_structure", duration_ms = duration_ms, state = "empty");
            }
            StructureOutcome::Failed(err) => {
                st.structure_timer = None;
                log_op_error!("load_structure", err, duration_ms = duration_ms);
            }
        }

        let state = st.loader.state();
        drop(st);
        self.publish(state);
    }

    fn poll_nodes(self: &Arc<Self>) {
        let (page, request, request_id) = {
            let mut st = self.lock();
            let Some(request) = st.loader.request().cloned() else {
                return;
            };
            let Some(page) = st.loader.next_page() else {
                return;
            };
            (page, request, st.request_id.clone())
        };

        let source = Arc::clone(&self.source);
        let weak = Arc::downgrade(self);
        self.scheduler.spawn(Box::pin(async move {
            let started = Instant::now();
            log_op_start!("load_nodes_page", request_id = %request_id, offset = page.offset);
            let result = source.fetch_nodes(&request, page.offset, page.limit).await;
            if let Some(shared) = weak.upgrade() {
                shared.apply_page(page, result, started);
            }
        }));
    }

    fn apply_page(&self, page: PageRequest, result: Result<NodePoll>, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let mut st = self.lock();

        match st.loader.on_page(page, result) {
            PageOutcome::Pending => {
                tracing::debug!(duration_ms, offset = page.offset, "node page not ready yet");
            }
            PageOutcome::Discarded(reason) => {
                tracing::debug!(%reason, "node page discarded");
            }
            PageOutcome::Applied {
                range,
                complete,
                relabeled,
            } => {
                log_op_end!(
                    "load_nodes_page",
                    duration_ms = duration_ms,
                    offset = range.start,
                    page_len = range.len()
                );
                st.relabel(&relabeled);
                if complete {
                    st.node_timer = None;
                    tracing::info!(node_count = st.loader.store().filled(), "diff load complete");
                }
            }
            PageOutcome::Failed(err) => {
                st.node_timer = None;
                log_op_error!("load_nodes_page", err, duration_ms = duration_ms, offset = page.offset);
            }
        }

        let state = st.loader.state();
        drop(st);
        self.publish(state);
    }

    fn autopan_tick(self: &Arc<Self>) {
        let mut st = self.lock();
        match st.autopan.direction() {
            Some(direction) => {
                let (dx, dy) = direction.delta(self.config.pan_speed);
                st.viewport.pan_by(dx, dy);
            }
            None => st.autopan_timer = None,
        }
    }
}

impl DiffSession {
    /// # Errors
    ///
    /// `InvalidConfig` when `config` fails validation; a zero poll or
    /// auto-pan period would never tick.
    pub fn new(
        source: Arc<dyn DiffSource>,
        scheduler: Arc<dyn Scheduler>,
        config: DiffViewConfig,
        viewport: Size,
    ) -> Result<Self> {
        config.validate()?;
        let (status, _) = watch::channel(LoadState::LoadingStructure);
        let state = SessionState {
            loader: DiffLoader::new(&config),
            renderer: TreeRenderer::new(&config),
            viewport: ViewportController::new(&config, viewport),
            autopan: DragAutoPan::default(),
            selected: None,
            label_updates: Vec::new(),
            request_id: RequestId::new(),
            structure_timer: None,
            node_timer: None,
            autopan_timer: None,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                source,
                scheduler,
                config,
                status,
                state: Mutex::new(state),
            }),
        })
    }

    /// Load `request`, unless it is the one already active
    ///
    /// Cancels both poll timers, drops every result of the previous load and
    /// starts structure polling. The first poll fires after one interval.
    /// After [`teardown`](Self::teardown) the same request loads again.
    pub fn update(&self, request: DiffRequest) -> bool {
        let mut st = self.shared.lock();
        if st.loader.request() == Some(&request) && !st.loader.is_cancelled() {
            return false;
        }
        self.shared.restart(&mut st, request);
        drop(st);
        self.shared.publish(LoadState::LoadingStructure);
        true
    }

    /// Reload the active request from scratch
    pub fn refresh(&self) -> bool {
        let mut st = self.shared.lock();
        let Some(request) = st.loader.request().cloned() else {
            return false;
        };
        self.shared.restart(&mut st, request);
        drop(st);
        self.shared.publish(LoadState::LoadingStructure);
        true
    }

    /// Cancel every timer (structure poll, node poll, auto-pan)
    ///
    /// Fetches already in flight are discarded when they return, so nothing
    /// lands in the node store and no timer restarts afterwards.
    pub fn teardown(&self) {
        let mut st = self.shared.lock();
        st.loader.cancel();
        st.cancel_polls();
        st.autopan_timer = None;
        st.autopan.on_end();
        tracing::debug!(request_id = %st.request_id, "diff session torn down");
    }

    pub fn state(&self) -> LoadState {
        self.shared.lock().loader.state()
    }

    /// Watch load state changes
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.shared.status.subscribe()
    }

    pub fn request(&self) -> Option<DiffRequest> {
        self.shared.lock().loader.request().cloned()
    }

    pub fn config(&self) -> &DiffViewConfig {
        &self.shared.config
    }

    /// Scene of the latest full render, with labels kept current
    pub fn scene(&self) -> Scene {
        self.shared.lock().renderer.scene().clone()
    }

    pub fn transform(&self) -> Transform {
        self.shared.lock().viewport.transform()
    }

    pub fn selected(&self) -> Option<DetailPanel> {
        self.shared.lock().selected.clone()
    }

    /// Label changes since the last call
    pub fn take_label_updates(&self) -> Vec<LabelUpdate> {
        std::mem::take(&mut self.shared.lock().label_updates)
    }

    /// Records loaded so far and the declared node count
    pub fn progress(&self) -> (usize, usize) {
        let st = self.shared.lock();
        (st.loader.store().filled(), st.loader.store().capacity())
    }

    pub fn with_tree<R>(&self, f: impl FnOnce(&DiffTree) -> R) -> Option<R> {
        self.shared.lock().loader.tree().map(f)
    }

    pub fn autopan_active(&self) -> bool {
        self.shared.lock().autopan_timer.is_some()
    }

    /// Toggle one level below `key`, re-render from it and centre on it
    ///
    /// # Errors
    ///
    /// `TreeNotLoaded` before a structure has loaded, `UnknownNode` for a key
    /// outside the tree.
    pub fn click(&self, key: &NodeKey) -> Result<()> {
        let mut st = self.shared.lock();
        let tree = st.tree_mut()?;
        let idx = tree.require(key)?;
        tree.toggle(idx);
        st.render(Some(idx));
        Ok(())
    }

    /// Expand the whole tree and re-render from the root
    ///
    /// # Errors
    ///
    /// `TreeNotLoaded` before a structure has loaded.
    pub fn expand_all(&self) -> Result<()> {
        let mut st = self.shared.lock();
        let tree = st.tree_mut()?;
        let root = tree.root();
        tree.expand(root);
        st.render(None);
        Ok(())
    }

    /// Select `key` for the detail panel
    ///
    /// Returns false, leaving the selection alone, while the node's record
    /// has not loaded yet.
    ///
    /// # Errors
    ///
    /// `TreeNotLoaded` before a structure has loaded, `UnknownNode` for a key
    /// outside the tree.
    pub fn right_click(&self, key: &NodeKey) -> Result<bool> {
        let mut st = self.shared.lock();
        st.tree_mut()?.require(key)?;
        let Some(record) = st.loader.record(key) else {
            return Ok(false);
        };
        let panel = DetailPanel::build(key.clone(), record);
        st.selected = Some(panel);
        Ok(true)
    }

    pub fn close_detail(&self) {
        self.shared.lock().selected = None;
    }

    /// Pointer move during a drag; starts or stops edge auto-pan
    pub fn drag_move(&self, pointer: Point) {
        let mut st = self.shared.lock();
        let size = st.viewport.size();
        match st.autopan.on_move(pointer, size, self.shared.config.pan_boundary) {
            AutoPanCommand::Start => {
                let timer = self
                    .shared
                    .start_timer(self.shared.config.autopan_interval(), Shared::autopan_tick);
                st.autopan_timer = Some(timer);
            }
            AutoPanCommand::Stop => st.autopan_timer = None,
            AutoPanCommand::Nothing => {}
        }
    }

    pub fn drag_end(&self) {
        let mut st = self.shared.lock();
        if st.autopan.on_end() == AutoPanCommand::Stop {
            st.autopan_timer = None;
        }
    }

    pub fn wheel(&self, delta_y: f64, pointer: Point) -> Transform {
        self.shared.lock().viewport.wheel(delta_y, pointer)
    }

    pub fn pan_by(&self, dx: f64, dy: f64) -> Transform {
        self.shared.lock().viewport.pan_by(dx, dy)
    }

    /// Advance the camera animation by `dt`
    pub fn tick_camera(&self, dt: Duration) -> Transform {
        self.shared.lock().viewport.tick(dt)
    }

    /// New viewport size; re-lays out without refetching
    ///
    /// Ignored for rendering while the structure is still loading. Returns
    /// whether a render pass ran.
    pub fn resize(&self, size: Size) -> bool {
        let mut st = self.shared.lock();
        st.viewport.resize(size);
        if st.loader.state() == LoadState::LoadingStructure || st.loader.tree().is_none() {
            return false;
        }
        st.render(None);
        true
    }
}

impl Drop for DiffSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for DiffSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.shared.lock();
        f.debug_struct("DiffSession")
            .field("state", &st.loader.state())
            .field("request", &st.loader.request())
            .finish()
    }
}
