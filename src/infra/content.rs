//! HTTP adapter for the headless content API.
//!
//! Documents decode into fully-optional DTOs first and convert into
//! validated domain values afterwards; a document with no identity or
//! publication date is skipped, while absent display fields render as
//! empty strings instead of failing the page.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::application::pagination::{CursorPage, FeedCursor, PageRequest, PaginationError};
use crate::application::repos::{PostsRepo, RepoError};
use crate::config::ContentSettings;
use crate::domain::posts::{self, ContentBlock, PostDetail, PostSummary};
use crate::domain::rich_text::{BlockKind, InlineSpan, RichTextBlock, SpanStyle};
use crate::infra::error::InfraError;

const SOURCE: &str = "infra::content";

/// Read-only client for a Prismic-shaped content repository.
pub struct ContentClient {
    client: Client,
    base: Url,
    document_type: String,
    access_token: Option<String>,
}

impl ContentClient {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let api_url = settings
            .api_url
            .as_ref()
            .ok_or_else(|| InfraError::configuration("content api url is not configured"))?;

        let mut base = Url::parse(api_url)
            .map_err(|err| InfraError::configuration(format!("invalid content api url: {err}")))?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            client,
            base,
            document_type: settings.document_type.clone(),
            access_token: settings.access_token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("spacetravelling/", env!("CARGO_PKG_VERSION"))
    }

    fn index_url(&self) -> Url {
        let mut url = self
            .base
            .join("api/v2")
            .expect("static api index path joins onto a valid base");
        self.append_token(&mut url);
        url
    }

    fn search_url(&self) -> Url {
        self.base
            .join("api/v2/documents/search")
            .expect("static search path joins onto a valid base")
    }

    fn append_token(&self, url: &mut Url) {
        if let Some(token) = self.access_token.as_ref() {
            let already = url
                .query_pairs()
                .any(|(key, _)| key == "access_token");
            if !already {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
    }

    /// Validate a decoded cursor before fetching it: the locator must
    /// point back at the configured content repository.
    fn continuation_url(&self, cursor: &FeedCursor) -> Result<Url, RepoError> {
        let mut url = Url::parse(cursor.next_page()).map_err(|err| {
            RepoError::from(PaginationError::InvalidCursor(err.to_string()))
        })?;
        let same_origin = url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default();
        if !same_origin {
            return Err(RepoError::from(PaginationError::InvalidCursor(
                "cursor does not belong to the configured content repository".to_string(),
            )));
        }
        self.append_token(&mut url);
        Ok(url)
    }

    async fn master_ref(&self) -> Result<String, RepoError> {
        let index: ApiIndexDto = self.get_json(self.index_url()).await?;
        index
            .refs
            .iter()
            .find(|entry| entry.is_master_ref)
            .or_else(|| index.refs.first())
            .and_then(|entry| entry.reference.clone())
            .ok_or_else(|| RepoError::decode("api index reports no refs"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RepoError> {
        counter!("spacetravelling_content_fetch_total").increment(1);
        let response = self.client.get(url).send().await.map_err(|err| {
            counter!("spacetravelling_content_fetch_error_total").increment(1);
            RepoError::transport(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            counter!("spacetravelling_content_fetch_error_total").increment(1);
            return Err(RepoError::Status {
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|err| {
            counter!("spacetravelling_content_fetch_error_total").increment(1);
            RepoError::decode(err.to_string())
        })
    }
}

#[async_trait]
impl PostsRepo for ContentClient {
    async fn list_summaries(
        &self,
        request: PageRequest<FeedCursor>,
    ) -> Result<CursorPage<PostSummary>, RepoError> {
        let url = match request.cursor.as_ref() {
            Some(cursor) => self.continuation_url(cursor)?,
            None => {
                let reference = self.master_ref().await?;
                let mut url = self.search_url();
                url.query_pairs_mut()
                    .append_pair("ref", &reference)
                    .append_pair(
                        "q",
                        &format!("[[at(document.type,\"{}\")]]", self.document_type),
                    )
                    .append_pair(
                        "fetch",
                        &format!(
                            "{t}.title,{t}.subtitle,{t}.author",
                            t = self.document_type
                        ),
                    )
                    .append_pair("orderings", "[document.first_publication_date desc]")
                    .append_pair("pageSize", &request.limit.to_string());
                self.append_token(&mut url);
                url
            }
        };

        let payload: SearchResponseDto = self.get_json(url).await?;

        let mut summaries = Vec::with_capacity(payload.results.len());
        for document in &payload.results {
            match decode_summary(document) {
                Ok(summary) => summaries.push(summary),
                Err(reason) => {
                    warn!(
                        target = SOURCE,
                        reason = %reason,
                        "skipping undecodable document in listing"
                    );
                }
            }
        }

        let next_cursor = payload
            .next_page
            .map(|next_page| FeedCursor::new(next_page).encode());
        Ok(CursorPage::new(summaries, next_cursor))
    }

    async fn find_by_uid(
        &self,
        uid: &str,
        ref_override: Option<&str>,
    ) -> Result<Option<PostDetail>, RepoError> {
        if uid.is_empty() || uid.contains('"') {
            return Ok(None);
        }

        let reference = match ref_override {
            Some(reference) => reference.to_string(),
            None => self.master_ref().await?,
        };

        let mut url = self.search_url();
        url.query_pairs_mut()
            .append_pair("ref", &reference)
            .append_pair(
                "q",
                &format!("[[at(my.{}.uid,\"{uid}\")]]", self.document_type),
            )
            .append_pair("pageSize", "1");
        self.append_token(&mut url);

        let payload: SearchResponseDto = self.get_json(url).await?;
        match payload.results.first() {
            Some(document) => decode_detail(document)
                .map(Some)
                .map_err(RepoError::decode),
            None => Ok(None),
        }
    }

    async fn health(&self) -> Result<(), RepoError> {
        let index: ApiIndexDto = self.get_json(self.index_url()).await?;
        if index.refs.is_empty() {
            return Err(RepoError::decode("api index reports no refs"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiIndexDto {
    #[serde(default)]
    refs: Vec<ApiRefDto>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiRefDto {
    #[serde(rename = "ref")]
    reference: Option<String>,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponseDto {
    #[serde(default)]
    results: Vec<DocumentDto>,
    next_page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentDto {
    uid: Option<String>,
    first_publication_date: Option<String>,
    #[serde(default)]
    data: DataDto,
}

#[derive(Debug, Default, Deserialize)]
struct DataDto {
    title: Option<Value>,
    subtitle: Option<Value>,
    author: Option<Value>,
    banner: Option<BannerDto>,
    #[serde(default)]
    content: Vec<ContentGroupDto>,
}

#[derive(Debug, Default, Deserialize)]
struct BannerDto {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentGroupDto {
    heading: Option<Value>,
    #[serde(default)]
    body: Vec<RichTextNodeDto>,
}

#[derive(Debug, Default, Deserialize)]
struct RichTextNodeDto {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    #[serde(default)]
    spans: Vec<SpanDto>,
}

#[derive(Debug, Default, Deserialize)]
struct SpanDto {
    start: Option<usize>,
    end: Option<usize>,
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<Value>,
}

/// Read a field delivered either as a plain string or as structured text.
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Array(nodes) => {
            let joined = nodes
                .iter()
                .filter_map(|node| node.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined)
        }
        _ => None,
    }
}

fn identity(document: &DocumentDto) -> Result<(String, time::OffsetDateTime), String> {
    let uid = document
        .uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| "document has no uid".to_string())?;
    let published = document
        .first_publication_date
        .as_deref()
        .and_then(posts::parse_publication_date)
        .ok_or_else(|| format!("document `{uid}` has no parseable publication date"))?;
    Ok((uid, published))
}

fn decode_summary(document: &DocumentDto) -> Result<PostSummary, String> {
    let (uid, first_publication_date) = identity(document)?;
    Ok(PostSummary {
        uid,
        first_publication_date,
        title: text_field(document.data.title.as_ref()).unwrap_or_default(),
        subtitle: text_field(document.data.subtitle.as_ref()).unwrap_or_default(),
        author: text_field(document.data.author.as_ref()).unwrap_or_default(),
    })
}

fn decode_detail(document: &DocumentDto) -> Result<PostDetail, String> {
    let (uid, first_publication_date) = identity(document)?;
    let content = document
        .data
        .content
        .iter()
        .map(|group| ContentBlock {
            heading: text_field(group.heading.as_ref()).unwrap_or_default(),
            body: group.body.iter().map(decode_rich_text_node).collect(),
        })
        .collect();

    Ok(PostDetail {
        uid,
        first_publication_date,
        title: text_field(document.data.title.as_ref()).unwrap_or_default(),
        subtitle: text_field(document.data.subtitle.as_ref()).unwrap_or_default(),
        banner_url: document
            .data
            .banner
            .as_ref()
            .and_then(|banner| banner.url.clone()),
        author: text_field(document.data.author.as_ref()).unwrap_or_default(),
        content,
    })
}

fn decode_rich_text_node(node: &RichTextNodeDto) -> RichTextBlock {
    let kind = match node.kind.as_deref() {
        Some("preformatted") => BlockKind::Preformatted,
        Some("list-item") => BlockKind::ListItem,
        Some("o-list-item") => BlockKind::OrderedListItem,
        Some(name) if name.starts_with("heading") => {
            let level = name
                .trim_start_matches("heading")
                .parse::<u8>()
                .unwrap_or(1);
            BlockKind::Heading(level)
        }
        // Unknown node kinds degrade to paragraphs rather than dropping text.
        _ => BlockKind::Paragraph,
    };

    RichTextBlock {
        kind,
        text: node.text.clone().unwrap_or_default(),
        spans: node.spans.iter().filter_map(decode_span).collect(),
    }
}

fn decode_span(span: &SpanDto) -> Option<InlineSpan> {
    let start = span.start?;
    let end = span.end?;
    let style = match span.kind.as_deref()? {
        "strong" => SpanStyle::Strong,
        "em" => SpanStyle::Em,
        "hyperlink" => {
            let target = span
                .data
                .as_ref()?
                .get("url")
                .and_then(Value::as_str)?
                .to_string();
            SpanStyle::Hyperlink(target)
        }
        _ => return None,
    };
    Some(InlineSpan { start, end, style })
}
