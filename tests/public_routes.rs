use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use spacetravelling::application::detail::DetailService;
use spacetravelling::application::feed::FeedService;
use spacetravelling::application::pagination::{CursorPage, FeedCursor, PageRequest};
use spacetravelling::application::repos::{PostsRepo, RepoError};
use spacetravelling::cache::PageCache;
use spacetravelling::domain::posts::{
    ContentBlock, PostDetail, PostSummary, parse_publication_date,
};
use spacetravelling::domain::rich_text::{BlockKind, RichTextBlock};
use spacetravelling::infra::http::{HttpState, build_router};
use spacetravelling::presentation::views::{CommentsView, SiteChrome};

const SECOND_PAGE: &str = "https://content.example/api/v2/documents/search?page=2";
const KNOWN_SLUG: &str = "como-utilizar-hooks";

fn summary(uid: &str, title: &str) -> PostSummary {
    PostSummary {
        uid: uid.to_string(),
        first_publication_date: parse_publication_date("2021-03-15T10:30:00Z").expect("date"),
        title: title.to_string(),
        subtitle: "Pensando em sincronização em vez de ciclos de vida".to_string(),
        author: "Joseph Oliveira".to_string(),
    }
}

fn paragraph(text: &str) -> RichTextBlock {
    RichTextBlock {
        kind: BlockKind::Paragraph,
        text: text.to_string(),
        spans: Vec::new(),
    }
}

fn known_detail(previewing: bool) -> PostDetail {
    let title = if previewing {
        "Como utilizar Hooks (rascunho)"
    } else {
        "Como utilizar Hooks"
    };
    PostDetail {
        uid: KNOWN_SLUG.to_string(),
        first_publication_date: parse_publication_date("2021-03-15T10:30:00Z").expect("date"),
        title: title.to_string(),
        subtitle: "Pensando em sincronização em vez de ciclos de vida".to_string(),
        banner_url: Some("https://images.example/banner.png".to_string()),
        author: "Joseph Oliveira".to_string(),
        content: vec![ContentBlock {
            heading: "Proin et varius".to_string(),
            body: vec![paragraph(&vec!["palavra"; 198].join(" "))],
        }],
    }
}

#[derive(Clone, Default)]
struct StaticContentRepo;

#[async_trait]
impl PostsRepo for StaticContentRepo {
    async fn list_summaries(
        &self,
        request: PageRequest<FeedCursor>,
    ) -> Result<CursorPage<PostSummary>, RepoError> {
        match request.cursor {
            None => Ok(CursorPage::new(
                vec![
                    summary(KNOWN_SLUG, "Como utilizar Hooks"),
                    summary("criando-um-app-cra-do-zero", "Criando um app CRA do zero"),
                ],
                Some(FeedCursor::new(SECOND_PAGE).encode()),
            )),
            Some(cursor) if cursor.next_page() == SECOND_PAGE => Ok(CursorPage::new(
                vec![
                    summary("otimizando-performance", "Otimizando performance"),
                    summary("testes-com-jest", "Testes com Jest"),
                ],
                None,
            )),
            Some(_) => Ok(CursorPage::empty()),
        }
    }

    async fn find_by_uid(
        &self,
        uid: &str,
        ref_override: Option<&str>,
    ) -> Result<Option<PostDetail>, RepoError> {
        if uid == KNOWN_SLUG {
            Ok(Some(known_detail(ref_override.is_some())))
        } else {
            Ok(None)
        }
    }

    async fn health(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

fn test_router() -> Router {
    let repo: Arc<dyn PostsRepo> = Arc::new(StaticContentRepo);
    let cache = Arc::new(PageCache::new(std::num::NonZeroUsize::new(16).expect("capacity")));
    let site = SiteChrome {
        title: "spacetravelling".to_string(),
        base_url: "http://127.0.0.1:3000".to_string(),
    };
    let comments = CommentsView {
        repo: "thiagosawada/05-criando-projeto-do-zero-react".to_string(),
        issue_term: "pathname".to_string(),
        label: "comment :speech_balloon:".to_string(),
        theme: "photon-dark".to_string(),
    };

    let feed = Arc::new(FeedService::new(repo.clone(), 2));
    let detail = Arc::new(DetailService::new(
        repo.clone(),
        cache,
        site.clone(),
        comments,
    ));

    build_router(HttpState {
        feed,
        detail,
        posts: repo,
        site,
        repository: "spacetravelling".to_string(),
    })
}

async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.expect("collect body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn get_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .expect("request")
}

fn preview_cookie_pair(reference: &str) -> String {
    let payload = format!(r#"{{"spacetravelling.prismic.io":{{"preview":"{reference}"}}}}"#);
    let encoded: String =
        percent_encoding::utf8_percent_encode(&payload, percent_encoding::NON_ALPHANUMERIC)
            .to_string();
    format!("io.prismic.preview={encoded}")
}

#[tokio::test]
async fn index_renders_the_first_page_with_a_load_more_affordance() {
    let response = test_router().oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Como utilizar Hooks"));
    assert!(body.contains("Criando um app CRA do zero"));
    assert!(body.contains("15 mar 2021"));
    assert!(body.contains("Carregar mais posts"));
}

#[tokio::test]
async fn append_returns_the_second_page_and_ends_the_affordance() {
    let router = test_router();

    let first = router.clone().oneshot(get("/")).await.expect("response");
    let first_body = body_to_string(first.into_body()).await;
    let cursor = first_body
        .split("cursor=")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .expect("cursor embedded in the loader");

    let response = router
        .oneshot(get(&format!("/ui/posts?cursor={cursor}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Otimizando performance"));
    assert!(body.contains("Testes com Jest"));
    assert!(!body.contains("Carregar mais posts"));
}

#[tokio::test]
async fn datastar_append_patches_grid_loader_and_signal() {
    let cursor = FeedCursor::new(SECOND_PAGE).encode();
    let request = Request::builder()
        .uri(format!("/ui/posts?cursor={cursor}"))
        .header("datastar-request", "true")
        .body(Body::empty())
        .expect("request");

    let response = test_router().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Otimizando performance"));
    assert!(body.contains("#post-grid"));
    assert!(body.contains("#feed-sentinel-container"));
    assert!(body.contains("feedLoading"));
}

#[tokio::test]
async fn invalid_cursor_is_a_client_error() {
    let response = test_router()
        .oneshot(get("/?cursor=%21%21%21"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_slug_shows_the_placeholder_then_resolves_to_not_found() {
    let router = test_router();

    let first = router
        .clone()
        .oneshot(get("/post/nao-existe"))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);
    let body = body_to_string(first.into_body()).await;
    assert!(body.contains("Carregando..."));

    let mut last_status = StatusCode::OK;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let response = router
            .clone()
            .oneshot(get("/post/nao-existe"))
            .await
            .expect("response");
        last_status = response.status();
        if last_status == StatusCode::NOT_FOUND {
            break;
        }
    }
    assert_eq!(last_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn known_slug_materializes_into_the_full_page() {
    let router = test_router();

    let first = router
        .clone()
        .oneshot(get(&format!("/post/{KNOWN_SLUG}")))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);
    let placeholder = body_to_string(first.into_body()).await;
    assert!(placeholder.contains("Carregando..."));

    let mut page = String::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let response = router
            .clone()
            .oneshot(get(&format!("/post/{KNOWN_SLUG}")))
            .await
            .expect("response");
        let body = body_to_string(response.into_body()).await;
        if body.contains("Como utilizar Hooks") {
            page = body;
            break;
        }
    }

    // 3 heading words + 198 body words = 201 words, one over the 200 wpm budget.
    assert!(page.contains("Como utilizar Hooks"));
    assert!(page.contains("2 min"));
    assert!(page.contains("banner.png"));
    assert!(page.contains("utteranc.es/client.js"));
}

#[tokio::test]
async fn stale_preview_cookie_redirects_to_the_entry_endpoint() {
    let cookies = format!(
        "{}; spacetravelling_preview=X",
        preview_cookie_pair("Y")
    );
    let response = test_router()
        .oneshot(get_with_cookies(&format!("/post/{KNOWN_SLUG}"), &cookies))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header");
    assert_eq!(
        location,
        format!("/api/preview?token=Y&documentId={KNOWN_SLUG}")
    );
}

#[tokio::test]
async fn matching_preview_refs_render_the_draft_without_caching() {
    let cookies = format!(
        "{}; spacetravelling_preview=X",
        preview_cookie_pair("X")
    );
    let response = test_router()
        .oneshot(get_with_cookies(&format!("/post/{KNOWN_SLUG}"), &cookies))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("no-store")
    );
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Como utilizar Hooks (rascunho)"));
    assert!(body.contains("Sair do modo Preview"));
}

#[tokio::test]
async fn preview_session_without_a_cookie_redirects_to_the_exit_endpoint() {
    let response = test_router()
        .oneshot(get_with_cookies(
            &format!("/post/{KNOWN_SLUG}"),
            "spacetravelling_preview=X",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header");
    assert_eq!(
        location,
        format!("/api/exit-preview?currentUrl=%2Fpost%2F{KNOWN_SLUG}")
    );
}

#[tokio::test]
async fn content_cookie_outside_a_session_enters_preview() {
    let cookies = preview_cookie_pair("Z");
    let response = test_router()
        .oneshot(get_with_cookies(&format!("/post/{KNOWN_SLUG}"), &cookies))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header");
    assert_eq!(
        location,
        format!("/api/preview?token=Z&documentId={KNOWN_SLUG}")
    );
}

#[tokio::test]
async fn preview_entry_sets_the_session_cookie_and_lands_on_the_document() {
    let response = test_router()
        .oneshot(get("/api/preview?token=draft-ref&documentId=meu-post"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/post/meu-post")
    );

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("set-cookie header");
    assert!(set_cookie.contains("spacetravelling_preview=draft-ref"));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn preview_entry_requires_token_and_document() {
    let response = test_router()
        .oneshot(get("/api/preview?token=draft-ref"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test_router()
        .oneshot(get("/api/preview?token=draft-ref&documentId=../admin"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exit_preview_clears_the_session_and_returns_to_the_page() {
    let response = test_router()
        .oneshot(get("/api/exit-preview?currentUrl=%2Fpost%2Fmeu-post"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/post/meu-post")
    );

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("set-cookie header");
    assert!(set_cookie.contains("spacetravelling_preview="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn exit_preview_refuses_offsite_return_paths() {
    let response = test_router()
        .oneshot(get("/api/exit-preview?currentUrl=https%3A%2F%2Fevil.example"))
        .await
        .expect("response");

    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/")
    );
}

#[tokio::test]
async fn health_reports_content_reachability() {
    let response = test_router()
        .oneshot(get("/_health/content"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_routes_render_the_not_found_page() {
    let response = test_router()
        .oneshot(get("/totalmente/desconhecido"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Página não encontrada"));
}
