use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::model::{DiffRequest, NodePoll, StructurePoll};

/// Remote provider of diff structure and node pages
///
/// Implementations report transport problems as errors; the loader turns
/// them into the matching fetch failure.
#[async_trait]
pub trait DiffSource: Send + Sync {
    /// Poll for the diff structure; `Pending` while the server computes it
    async fn fetch_structure(&self, request: &DiffRequest) -> Result<StructurePoll>;

    /// Up to `limit` node records starting at `offset`; `Pending` while
    /// the server has not prepared them
    async fn fetch_nodes(&self, request: &DiffRequest, offset: usize, limit: usize) -> Result<NodePoll>;
}

#[async_trait]
impl<T: DiffSource + ?Sized> DiffSource for Arc<T> {
    async fn fetch_structure(&self, request: &DiffRequest) -> Result<StructurePoll> {
        (**self).fetch_structure(request).await
    }

    async fn fetch_nodes(&self, request: &DiffRequest, offset: usize, limit: usize) -> Result<NodePoll> {
        (**self).fetch_nodes(request, offset, limit).await
    }
}
