use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CACHE_CONTROL},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use metrics::counter;
use serde::Deserialize;

use crate::{
    application::{
        detail::{DetailError, DetailService, Resolution},
        error::HttpError,
        feed::{self, FeedService},
        preview as preview_session,
        repos::PostsRepo,
    },
    domain::preview::{SyncInputs, reconcile},
    presentation::views::{
        IndexTemplate, LayoutContext, LoadingTemplate, LoadingView, PostsPartial, SiteChrome,
        render_not_found_response, render_template_response,
    },
};

use super::{
    DATASTAR_REQUEST_HEADER, content_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub detail: Arc<DetailService>,
    pub posts: Arc<dyn PostsRepo>,
    pub site: SiteChrome,
    /// Content repository name; keys the content source's preview cookie.
    pub repository: String,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/post/{slug}", get(post_detail))
        .route("/ui/posts", get(posts_partial))
        .route("/api/preview", get(preview_entry))
        .route("/api/exit-preview", get(exit_preview))
        .route("/_health/content", get(content_health))
        .route("/static/public/{*path}", get(crate::infra::assets::serve_public))
        .fallback(fallback_not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorQuery {
    cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PreviewEntryQuery {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExitPreviewQuery {
    #[serde(rename = "currentUrl")]
    current_url: Option<String>,
}

async fn index(State(state): State<HttpState>, Query(query): Query<CursorQuery>) -> Response {
    match state.feed.page_context(query.cursor.as_deref()).await {
        Ok(content) => {
            let view = LayoutContext::new(state.site.clone(), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn posts_partial(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<CursorQuery>,
) -> Result<Response, HttpError> {
    let cursor = query.cursor.as_deref();

    if headers.contains_key(DATASTAR_REQUEST_HEADER) {
        let payload = state.feed.append_payload(cursor).await?;
        return feed::build_append_response(payload);
    }

    let content = state.feed.page_context(cursor).await?;
    Ok(render_template_response(
        PostsPartial { content },
        StatusCode::OK,
    ))
}

/// Post page: one preview reconciliation pass, then either the preview
/// render (never cached) or the materialization-cache resolution.
async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Response {
    let session = preview_session::session_ref(&jar);
    let cookie_ref = preview_session::content_cookie_ref(&jar, &state.repository);
    let current_path = format!("/post/{slug}");

    let outcome = reconcile(SyncInputs {
        routing_preview: session.is_some(),
        cookie_ref: cookie_ref.as_deref(),
        rendered_ref: session.as_deref(),
        document_id: &slug,
        current_path: &current_path,
    });
    if let Some(target) = outcome.redirect_target() {
        counter!("spacetravelling_preview_redirect_total").increment(1);
        return Redirect::temporary(&target).into_response();
    }

    if let Some(token) = session {
        return match state.detail.preview(&slug, &token).await {
            Ok(Some(html)) => {
                let mut response = Html(html).into_response();
                set_no_store(&mut response);
                response
            }
            Ok(None) => render_not_found_response(state.site.clone()),
            Err(err) => detail_error_to_response(err),
        };
    }

    match state.detail.resolve(&slug) {
        Resolution::Ready(html) => Html(html).into_response(),
        Resolution::Building => {
            let view = LayoutContext::new(state.site.clone(), LoadingView::materializing());
            render_template_response(LoadingTemplate { view }, StatusCode::OK)
        }
        Resolution::NotFound => render_not_found_response(state.site.clone()),
    }
}

/// `GET /api/preview?token=<ref>&documentId=<uid>`: establish the preview
/// session and land on the document.
async fn preview_entry(jar: CookieJar, Query(query): Query<PreviewEntryQuery>) -> Response {
    let token = query.token.filter(|token| !token.is_empty());
    let document_id = query
        .document_id
        .filter(|id| !id.is_empty() && is_safe_document_id(id));

    let (Some(token), Some(document_id)) = (token, document_id) else {
        return HttpError::new(
            "infra::http::preview_entry",
            StatusCode::BAD_REQUEST,
            "Invalid preview request",
            "preview entry requires a token and a documentId",
        )
        .into_response();
    };

    let jar = jar.add(preview_session::session_cookie(&token));
    (jar, Redirect::temporary(&format!("/post/{document_id}"))).into_response()
}

/// `GET /api/exit-preview?currentUrl=<path>`: clear the preview session
/// and return to the carried page.
async fn exit_preview(jar: CookieJar, Query(query): Query<ExitPreviewQuery>) -> Response {
    let target = preview_session::sanitize_return_path(query.current_url.as_deref());
    let jar = jar.add(preview_session::session_removal_cookie());
    (jar, Redirect::temporary(&target)).into_response()
}

async fn content_health(State(state): State<HttpState>) -> Response {
    content_health_response(state.posts.health().await)
}

async fn fallback_not_found(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.site.clone())
}

fn is_safe_document_id(id: &str) -> bool {
    id.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn detail_error_to_response(err: DetailError) -> Response {
    match err {
        DetailError::Repo(repo) => HttpError::from(repo).into_response(),
        DetailError::Render(message) => HttpError::new(
            "infra::http::post_detail",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template rendering failed",
            message,
        )
        .into_response(),
    }
}

fn set_no_store(response: &mut Response) {
    let value = HeaderValue::from_static("no-store");
    response.headers_mut().insert(CACHE_CONTROL, value);
}
