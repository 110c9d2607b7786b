use time::{
    OffsetDateTime, format_description::FormatItem, format_description::well_known::Rfc3339,
    macros::format_description,
};

use crate::domain::rich_text::{self, RichTextBlock};

/// Words-per-minute assumed by the reading-time estimate.
pub const READING_SPEED_WPM: usize = 200;

/// Portuguese month abbreviations, indexed by calendar month minus one.
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Offset variant emitted by the content API (`2021-03-15T10:30:00+0000`),
/// which RFC 3339 parsing rejects for the missing offset colon.
const COMPACT_OFFSET_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

/// A feed entry: the projection of a post the listing page needs.
///
/// Immutable once decoded; identity is the `uid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: OffsetDateTime,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A fully-loaded post as rendered on its own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: OffsetDateTime,
    pub title: String,
    pub subtitle: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

/// One heading + rich-text body group within a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// Parse a publication timestamp as reported by the content API.
///
/// Accepts RFC 3339 and the API's compact `+0000` offset spelling.
pub fn parse_publication_date(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(value, COMPACT_OFFSET_FORMAT))
        .ok()
}

/// Format a timestamp in the fixed display locale: `15 mar 2021`.
pub fn format_display_date(moment: OffsetDateTime) -> String {
    let month = MONTH_ABBREVIATIONS[usize::from(u8::from(moment.month())) - 1];
    format!("{:02} {} {}", moment.day(), month, moment.year())
}

/// Date-and-time variant of [`format_display_date`]: `15 mar 2021, às 10:30`.
pub fn format_display_datetime(moment: OffsetDateTime) -> String {
    format!(
        "{}, às {:02}:{:02}",
        format_display_date(moment),
        moment.hour(),
        moment.minute()
    )
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimate the reading time of a post in whole minutes.
///
/// Tokenizes every block's heading and plain-text body on whitespace runs,
/// sums the counts, and divides by [`READING_SPEED_WPM`], rounding up.
/// Content with no words estimates to zero minutes.
pub fn reading_time_minutes(content: &[ContentBlock]) -> usize {
    let words: usize = content
        .iter()
        .map(|block| word_count(&block.heading) + word_count(&rich_text::as_text(&block.body)))
        .sum();
    words.div_ceil(READING_SPEED_WPM)
}

/// Reading-time estimate as rendered next to the post metadata: `4 min`.
pub fn reading_time_label(content: &[ContentBlock]) -> String {
    format!("{} min", reading_time_minutes(content))
}
