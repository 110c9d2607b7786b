//! Preview session plumbing: the cookies behind the entry/exit endpoints.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use percent_encoding::percent_decode_str;

use crate::domain::preview;

/// JSON cookie set by the content source's preview mechanism.
pub const CONTENT_PREVIEW_COOKIE: &str = "io.prismic.preview";

/// Session cookie marking a rendering session as previewing; its value is
/// the draft ref pages are rendered with.
pub const PREVIEW_SESSION_COOKIE: &str = "spacetravelling_preview";

/// Cookie establishing a preview session for `token`.
pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((PREVIEW_SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie clearing the preview session.
pub fn session_removal_cookie() -> Cookie<'static> {
    Cookie::build((PREVIEW_SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// The draft ref of the current preview session, if one is active.
pub fn session_ref(jar: &CookieJar) -> Option<String> {
    jar.get(PREVIEW_SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// The preview ref carried by the content source's cookie, if any.
///
/// The raw value is percent-decoded before the JSON payload is parsed;
/// anything malformed reads as "no ref".
pub fn content_cookie_ref(jar: &CookieJar, repository: &str) -> Option<String> {
    let raw = jar.get(CONTENT_PREVIEW_COOKIE)?.value();
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    preview::cookie_preview_ref(&decoded, repository)
}

/// Constrain the exit endpoint's return path to site-relative targets.
pub fn sanitize_return_path(raw: Option<&str>) -> String {
    match raw {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}
