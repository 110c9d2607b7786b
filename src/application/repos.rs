//! Repository traits describing the content-source adapter.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{CursorPage, FeedCursor, PageRequest, PaginationError};
use crate::domain::posts::{PostDetail, PostSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("content api transport error: {0}")]
    Transport(String),
    #[error("content api returned status {status}")]
    Status { status: u16 },
    #[error("content api response could not be decoded: {message}")]
    Decode { message: String },
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Read-only access to the external content repository.
///
/// The feed and detail services depend on this seam; the production
/// implementation talks HTTP, tests substitute an in-memory stub.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Type-filtered summary query with field projection and a page-size
    /// limit. Order is the server-provided order, never re-sorted here.
    async fn list_summaries(
        &self,
        request: PageRequest<FeedCursor>,
    ) -> Result<CursorPage<PostSummary>, RepoError>;

    /// Single-document lookup by uid, optionally pinned to a preview ref.
    async fn find_by_uid(
        &self,
        uid: &str,
        ref_override: Option<&str>,
    ) -> Result<Option<PostDetail>, RepoError>;

    /// Reachability probe against the content API.
    async fn health(&self) -> Result<(), RepoError>;
}
