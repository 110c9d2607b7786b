use std::sync::Arc;

use askama::Template;
use metrics::counter;
use thiserror::Error;
use tracing::error;
use url::form_urlencoded;

use crate::application::repos::{PostsRepo, RepoError};
use crate::cache::{PageCache, PageEntry};
use crate::domain::posts::{self, PostDetail};
use crate::domain::rich_text;
use crate::presentation::views::{
    CommentsView, ContentBlockView, LayoutContext, PostTemplate, PostView, SiteChrome,
};

/// Outcome of routing a slug through the materialization cache.
pub enum Resolution {
    /// The page is materialized; serve this HTML.
    Ready(String),
    /// A fetch-and-render task is in flight; show the loading placeholder.
    Building,
    /// The content source does not know this document.
    NotFound,
}

#[derive(Debug, Error)]
pub enum DetailError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("post page rendering failed: {0}")]
    Render(String),
}

/// Resolves posts by slug and assembles their rendered pages.
#[derive(Clone)]
pub struct DetailService {
    posts: Arc<dyn PostsRepo>,
    cache: Arc<PageCache>,
    site: SiteChrome,
    comments: CommentsView,
}

impl DetailService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        cache: Arc<PageCache>,
        site: SiteChrome,
        comments: CommentsView,
    ) -> Self {
        Self {
            posts,
            cache,
            site,
            comments,
        }
    }

    /// Resolve `slug` through the cache.
    ///
    /// A slug never seen before registers a `Building` entry, schedules
    /// the background materialization, and answers `Building` immediately;
    /// the request is served the placeholder instead of blocking on the
    /// content API.
    pub fn resolve(&self, slug: &str) -> Resolution {
        if let Some(entry) = self.cache.lookup(slug) {
            return match entry {
                PageEntry::Ready(html) => Resolution::Ready(html),
                PageEntry::Building => Resolution::Building,
                PageEntry::Missing => Resolution::NotFound,
            };
        }

        if self.cache.begin_build(slug) {
            let service = self.clone();
            let slug = slug.to_string();
            tokio::spawn(async move {
                service.materialize(slug).await;
            });
        }

        Resolution::Building
    }

    async fn materialize(&self, slug: String) {
        counter!("spacetravelling_page_materialize_total").increment(1);
        match self.posts.find_by_uid(&slug, None).await {
            Ok(Some(detail)) => match self.render_post_page(detail, false) {
                Ok(html) => self.cache.fill_ready(&slug, html),
                Err(err) => {
                    error!(
                        target = "spacetravelling::detail",
                        slug = %slug,
                        error = %err,
                        "materialization render failed"
                    );
                    self.cache.clear(&slug);
                }
            },
            Ok(None) => self.cache.fill_missing(&slug),
            Err(err) => {
                // Leave no entry behind so a later request retries.
                error!(
                    target = "spacetravelling::detail",
                    slug = %slug,
                    error = %err,
                    "materialization fetch failed"
                );
                self.cache.clear(&slug);
            }
        }
    }

    /// Render `slug` at a preview ref, bypassing the cache entirely.
    pub async fn preview(
        &self,
        slug: &str,
        preview_ref: &str,
    ) -> Result<Option<String>, DetailError> {
        let Some(detail) = self.posts.find_by_uid(slug, Some(preview_ref)).await? else {
            return Ok(None);
        };
        self.render_post_page(detail, true).map(Some)
    }

    fn render_post_page(
        &self,
        detail: PostDetail,
        previewing: bool,
    ) -> Result<String, DetailError> {
        let exit_url = previewing.then(|| exit_preview_url(&detail.uid));
        let view = build_post_view(detail, exit_url, self.comments.clone());
        let template = PostTemplate {
            view: LayoutContext::new(self.site.clone(), view),
        };
        template
            .render()
            .map_err(|err| DetailError::Render(err.to_string()))
    }
}

fn exit_preview_url(uid: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("currentUrl", &format!("/post/{uid}"))
        .finish();
    format!("/api/exit-preview?{query}")
}

fn build_post_view(
    detail: PostDetail,
    exit_url: Option<String>,
    comments: CommentsView,
) -> PostView {
    let reading_label = posts::reading_time_label(&detail.content);
    let blocks = detail
        .content
        .iter()
        .map(|block| ContentBlockView {
            heading: block.heading.clone(),
            body_html: rich_text::as_html(&block.body),
        })
        .collect();

    PostView {
        uid: detail.uid,
        title: detail.title,
        subtitle: detail.subtitle,
        author: detail.author,
        published: posts::format_display_date(detail.first_publication_date),
        banner_url: detail.banner_url,
        reading_label,
        blocks,
        exit_url,
        comments,
    }
}
