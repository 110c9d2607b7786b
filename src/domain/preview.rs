//! Preview reconciliation: aligning the content source's preview cookie
//! with the session a post page is rendered under.
//!
//! Evaluated exactly once per post-page request, with every input passed
//! explicitly; the outcome is either "render as-is" or a single redirect.

use url::form_urlencoded;

/// Inputs captured at the moment a post page is requested.
#[derive(Debug, Clone, Copy)]
pub struct SyncInputs<'a> {
    /// Whether the routing layer considers this request a preview request
    /// (the preview session cookie is present).
    pub routing_preview: bool,
    /// Preview ref carried by the content source's cookie, if any.
    pub cookie_ref: Option<&'a str>,
    /// The ref this page is being rendered with, if previewing.
    pub rendered_ref: Option<&'a str>,
    /// Identifier of the document being viewed.
    pub document_id: &'a str,
    /// Path of the current page, used to return here after exiting.
    pub current_path: &'a str,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not previewing and no preview cookie: render the published page.
    Dormant,
    /// Previewing and the cookie agrees with the rendered ref.
    Matched,
    /// Previewing, but the cookie points at a different draft version.
    Stale { token: String, document_id: String },
    /// Previewing without a cookie: the session must be torn down.
    MissingCookie { current_url: String },
    /// Not previewing while the cookie is set: enter preview mode.
    Entering { token: String, document_id: String },
}

impl Reconciliation {
    /// The redirect this outcome demands, if any.
    pub fn redirect_target(&self) -> Option<String> {
        match self {
            Reconciliation::Dormant | Reconciliation::Matched => None,
            Reconciliation::Stale { token, document_id }
            | Reconciliation::Entering { token, document_id } => {
                Some(entry_url(token, document_id))
            }
            Reconciliation::MissingCookie { current_url } => Some(exit_url(current_url)),
        }
    }
}

/// Decide what a post-page request must do about preview state.
pub fn reconcile(inputs: SyncInputs<'_>) -> Reconciliation {
    match (inputs.routing_preview, inputs.cookie_ref) {
        (true, Some(cookie_ref)) => {
            if inputs.rendered_ref == Some(cookie_ref) {
                Reconciliation::Matched
            } else {
                Reconciliation::Stale {
                    token: cookie_ref.to_string(),
                    document_id: inputs.document_id.to_string(),
                }
            }
        }
        (true, None) => Reconciliation::MissingCookie {
            current_url: inputs.current_path.to_string(),
        },
        (false, Some(cookie_ref)) => Reconciliation::Entering {
            token: cookie_ref.to_string(),
            document_id: inputs.document_id.to_string(),
        },
        (false, None) => Reconciliation::Dormant,
    }
}

fn entry_url(token: &str, document_id: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", token)
        .append_pair("documentId", document_id)
        .finish();
    format!("/api/preview?{query}")
}

fn exit_url(current_url: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("currentUrl", current_url)
        .finish();
    format!("/api/exit-preview?{query}")
}

/// Extract the preview ref for `repository` from the content source's
/// JSON cookie payload.
///
/// The cookie is set by an external system; any shape mismatch reads as
/// "no ref" rather than an error.
pub fn cookie_preview_ref(raw: &str, repository: &str) -> Option<String> {
    let payload: serde_json::Value = serde_json::from_str(raw).ok()?;
    payload
        .get(format!("{repository}.prismic.io"))?
        .get("preview")?
        .as_str()
        .map(str::to_string)
}
