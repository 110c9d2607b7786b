use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(site: SiteChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(site, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Site-wide chrome shared by every page.
#[derive(Clone)]
pub struct SiteChrome {
    pub title: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site: SiteChrome,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(site: SiteChrome, content: T) -> Self {
        Self { site, content }
    }
}

/// One feed entry as rendered on the listing page.
#[derive(Clone)]
pub struct PostCard {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub published: String,
}

/// The load-more affordance; carries the cursor for the next append, or
/// nothing once the collection is exhausted.
#[derive(Clone)]
pub struct FeedLoaderView {
    pub next_cursor: Option<String>,
}

pub struct PageContext {
    pub posts: Vec<PostCard>,
    pub post_count: usize,
    pub has_results: bool,
    pub loader: FeedLoaderView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<PageContext>,
}

#[derive(Template)]
#[template(path = "partials/content.html")]
pub struct PostsPartial {
    pub content: PageContext,
}

#[derive(Template)]
#[template(path = "partials/feed_loader.html")]
pub struct FeedLoaderTemplate {
    pub loader: FeedLoaderView,
}

#[derive(Template)]
#[template(path = "partials/post_cards_append.html")]
pub struct PostCardsAppendTemplate {
    pub posts: Vec<PostCard>,
}

/// Fixed attributes of the third-party comment widget script.
#[derive(Clone)]
pub struct CommentsView {
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

#[derive(Clone)]
pub struct ContentBlockView {
    pub heading: String,
    pub body_html: String,
}

pub struct PostView {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub published: String,
    pub banner_url: Option<String>,
    pub reading_label: String,
    pub blocks: Vec<ContentBlockView>,
    pub exit_url: Option<String>,
    pub comments: CommentsView,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostView>,
}

/// Placeholder shown while a page is still being materialized.
pub struct LoadingView {
    pub message: String,
}

impl LoadingView {
    pub fn materializing() -> Self {
        Self {
            message: "Carregando...".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub view: LayoutContext<LoadingView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Página não encontrada".to_string(),
            message: "O conteúdo que você procura não existe. Volte para a página inicial para continuar navegando.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
