//! Shared cursor pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FeedCursorPayload {
    next_page: String,
}

/// Cursor for paginating the post feed.
///
/// Wraps the content API's next-page locator; the encoded form embedded in
/// pages is opaque to clients and meaningful only to the content client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    next_page: String,
}

impl FeedCursor {
    pub fn new(next_page: impl Into<String>) -> Self {
        Self {
            next_page: next_page.into(),
        }
    }

    /// The continuation locator as reported by the content API.
    pub fn next_page(&self) -> &str {
        &self.next_page
    }

    pub fn encode(&self) -> String {
        let payload = FeedCursorPayload {
            next_page: self.next_page.clone(),
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing feed cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: FeedCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            next_page: payload.next_page,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
///
/// An absent `next_cursor` marks the end of the collection.
#[derive(Debug, Clone)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
