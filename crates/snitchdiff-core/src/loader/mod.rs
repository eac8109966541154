//! Diff loading: the sans-IO state machine, its async session driver and
//! the seams it talks through (data source, scheduler)

pub mod machine;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod state;

pub use machine::{DiffLoader, Generation, PageOutcome, PageRequest, StructureOutcome};
pub use scheduler::{BoxFuture, BoxTask, Scheduler, TimerHandle, TokioScheduler};
pub use session::DiffSession;
pub use source::DiffSource;
pub use state::LoadState;
