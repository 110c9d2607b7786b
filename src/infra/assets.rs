//! Embedded static asset serving utilities.

use std::borrow::Cow;

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::{Mime, MimeGuess};

use crate::application::error::ErrorReport;

static PUBLIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static/public");

/// Serve embedded public static assets.
pub async fn serve_public(path: Option<Path<String>>) -> Response {
    serve_static(&PUBLIC_ASSETS, path, "infra::assets::serve_public")
}

fn serve_static(
    bundle: &'static Dir<'static>,
    path: Option<Path<String>>,
    source: &'static str,
) -> Response {
    let captured = path.map(|Path(value)| value);
    match resolve_asset(bundle, captured) {
        Some(asset) => asset.into_response(),
        None => not_found_response(source),
    }
}

fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

struct Asset<'a> {
    contents: Cow<'a, [u8]>,
    mime: MimeGuess,
}

fn resolve_asset(bundle: &'static Dir<'static>, path: Option<String>) -> Option<Asset<'static>> {
    let mut candidate = path.unwrap_or_default();
    if candidate.starts_with('/') {
        candidate = candidate.trim_start_matches('/').to_string();
    }

    // Disallow directory listings and traversal.
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }

    let file = bundle.get_file(&candidate)?;
    Some(Asset {
        contents: Cow::Borrowed(file.contents()),
        mime: mime_guess::from_path(&candidate),
    })
}

impl Asset<'static> {
    fn into_response(self) -> Response {
        let mime: Mime = self.mime.first_or_octet_stream();
        let bytes = Bytes::from(self.contents.into_owned());

        let mut response = Response::new(Body::from(bytes));
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=31536000, immutable"),
        );
        response
    }
}
