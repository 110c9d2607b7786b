use std::convert::Infallible;
use std::sync::Arc;

use askama::Template;
use async_stream::stream;
use axum::response::{
    IntoResponse, Response,
    sse::{Event, Sse},
};
use datastar::prelude::{ElementPatchMode, PatchElements, PatchSignals};
use thiserror::Error;

use crate::application::error::HttpError;
use crate::application::pagination::{FeedCursor, PageRequest};
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::posts::{self, PostSummary};
use crate::presentation::views::{
    FeedLoaderTemplate, FeedLoaderView, PageContext, PostCard, PostCardsAppendTemplate,
    TemplateRenderError,
};

/// Cards appended by one incremental load, plus the replacement cursor.
#[derive(Clone)]
pub struct AppendPayload {
    pub cards: Vec<PostCard>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Orchestrates paginated retrieval of post summaries.
///
/// The feed loader partial is the single holder of the cursor: every load
/// fetches at the cursor it carries and replaces it with the next one, so
/// appended cards always derive from the fetched page rather than from
/// client-held list state.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    page_size: u32,
}

impl FeedService {
    pub fn new(posts: Arc<dyn PostsRepo>, page_size: u32) -> Self {
        Self { posts, page_size }
    }

    fn decode_cursor(&self, cursor: Option<&str>) -> Result<Option<FeedCursor>, FeedError> {
        cursor
            .map(FeedCursor::decode)
            .transpose()
            .map_err(|err| FeedError::InvalidCursor(err.to_string()))
    }

    /// Full listing context for the page at `cursor` (first page when absent).
    pub async fn page_context(&self, cursor: Option<&str>) -> Result<PageContext, FeedError> {
        let decoded = self.decode_cursor(cursor)?;
        let page = self
            .posts
            .list_summaries(PageRequest::new(self.page_size, decoded))
            .await?;

        let cards: Vec<PostCard> = page.items.iter().map(summary_to_card).collect();
        let post_count = cards.len();

        Ok(PageContext {
            posts: cards,
            post_count,
            has_results: post_count > 0,
            loader: FeedLoaderView {
                next_cursor: page.next_cursor,
            },
        })
    }

    /// The incremental-load operation: fetch the page at `cursor`, return
    /// the cards to append and the cursor that replaces the current one.
    pub async fn append_payload(&self, cursor: Option<&str>) -> Result<AppendPayload, FeedError> {
        let decoded = self.decode_cursor(cursor)?;
        let page = self
            .posts
            .list_summaries(PageRequest::new(self.page_size, decoded))
            .await?;

        Ok(AppendPayload {
            cards: page.items.iter().map(summary_to_card).collect(),
            next_cursor: page.next_cursor,
        })
    }
}

fn summary_to_card(summary: &PostSummary) -> PostCard {
    PostCard {
        uid: summary.uid.clone(),
        title: summary.title.clone(),
        subtitle: summary.subtitle.clone(),
        author: summary.author.clone(),
        published: posts::format_display_date(summary.first_publication_date),
    }
}

/// Server-driven append: patch the new cards into the post grid, swap the
/// feed loader for one carrying the replacement cursor (or none, ending
/// the affordance), and release the client's `feedLoading` guard.
pub fn build_append_response(payload: AppendPayload) -> Result<Response, HttpError> {
    let AppendPayload { cards, next_cursor } = payload;

    let mut events = Vec::new();

    if !cards.is_empty() {
        let cards_html = PostCardsAppendTemplate { posts: cards }.render().map_err(|err| {
            HttpError::from(TemplateRenderError::new(
                "application::feed::build_append_response",
                "Template rendering failed",
                err,
            ))
        })?;
        events.push(
            PatchElements::new(cards_html)
                .selector("#post-grid")
                .mode(ElementPatchMode::Append)
                .write_as_axum_sse_event(),
        );
    }

    let loader_html = FeedLoaderTemplate {
        loader: FeedLoaderView { next_cursor },
    }
    .render()
    .map_err(|err| {
        HttpError::from(TemplateRenderError::new(
            "application::feed::build_append_response",
            "Template rendering failed",
            err,
        ))
    })?;
    events.push(
        PatchElements::new(loader_html)
            .selector("#feed-sentinel-container")
            .mode(ElementPatchMode::Inner)
            .write_as_axum_sse_event(),
    );

    events.push(PatchSignals::new(r#"{"feedLoading": false}"#).write_as_axum_sse_event());

    let body = stream! {
        for event in events {
            yield Ok::<Event, Infallible>(event);
        }
    };
    Ok(Sse::new(body).into_response())
}
