//! Structured rich text as delivered by the content source.
//!
//! Blocks arrive pre-sanitized upstream; conversion here escapes text
//! content and rebuilds markup structure, it does not sanitize.

use crate::util::html::escape_text;

/// Block-level node kinds understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Preformatted,
    Heading(u8),
    ListItem,
    OrderedListItem,
}

/// Inline formatting applied to a character range of a block's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub start: usize,
    pub end: usize,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStyle {
    Strong,
    Em,
    Hyperlink(String),
}

/// One rich-text node: a typed block of text with inline spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichTextBlock {
    pub kind: BlockKind,
    pub text: String,
    pub spans: Vec<InlineSpan>,
}

/// Plain-text rendering: block texts joined by a single space.
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum OpenList {
    None,
    Unordered,
    Ordered,
}

/// HTML rendering of a block sequence.
///
/// Consecutive list items coalesce into a single `<ul>`/`<ol>`. Heading
/// levels outside 1..=6 clamp to that range.
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open = OpenList::None;

    for block in blocks {
        let wanted = match block.kind {
            BlockKind::ListItem => OpenList::Unordered,
            BlockKind::OrderedListItem => OpenList::Ordered,
            _ => OpenList::None,
        };
        if open != wanted {
            close_list(&mut html, open);
            open_list(&mut html, wanted);
            open = wanted;
        }

        let body = render_spans(&block.text, &block.spans);
        match block.kind {
            BlockKind::Paragraph => {
                html.push_str("<p>");
                html.push_str(&body);
                html.push_str("</p>");
            }
            BlockKind::Preformatted => {
                html.push_str("<pre>");
                html.push_str(&body);
                html.push_str("</pre>");
            }
            BlockKind::Heading(level) => {
                let level = level.clamp(1, 6);
                html.push_str(&format!("<h{level}>"));
                html.push_str(&body);
                html.push_str(&format!("</h{level}>"));
            }
            BlockKind::ListItem | BlockKind::OrderedListItem => {
                html.push_str("<li>");
                html.push_str(&body);
                html.push_str("</li>");
            }
        }
    }

    close_list(&mut html, open);
    html
}

fn open_list(html: &mut String, list: OpenList) {
    match list {
        OpenList::None => {}
        OpenList::Unordered => html.push_str("<ul>"),
        OpenList::Ordered => html.push_str("<ol>"),
    }
}

fn close_list(html: &mut String, list: OpenList) {
    match list {
        OpenList::None => {}
        OpenList::Unordered => html.push_str("</ul>"),
        OpenList::Ordered => html.push_str("</ol>"),
    }
}

/// Apply inline spans to a block's text by character offsets.
///
/// Spans with out-of-range offsets, and spans overlapping an earlier one,
/// are dropped rather than propagated as an error.
fn render_spans(text: &str, spans: &[InlineSpan]) -> String {
    let chars: Vec<char> = text.chars().collect();

    let mut ordered: Vec<&InlineSpan> = spans
        .iter()
        .filter(|span| span.start < span.end && span.end <= chars.len())
        .collect();
    ordered.sort_by_key(|span| (span.start, span.end));

    let mut html = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for span in ordered {
        if span.start < cursor {
            continue;
        }
        push_escaped(&mut html, &chars[cursor..span.start]);
        match &span.style {
            SpanStyle::Strong => {
                html.push_str("<strong>");
                push_escaped(&mut html, &chars[span.start..span.end]);
                html.push_str("</strong>");
            }
            SpanStyle::Em => {
                html.push_str("<em>");
                push_escaped(&mut html, &chars[span.start..span.end]);
                html.push_str("</em>");
            }
            SpanStyle::Hyperlink(target) => {
                html.push_str("<a href=\"");
                html.push_str(&escape_text(target));
                html.push_str("\">");
                push_escaped(&mut html, &chars[span.start..span.end]);
                html.push_str("</a>");
            }
        }
        cursor = span.end;
    }
    push_escaped(&mut html, &chars[cursor..]);
    html
}

fn push_escaped(html: &mut String, chars: &[char]) {
    let segment: String = chars.iter().collect();
    html.push_str(&escape_text(&segment));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(kind: BlockKind, text: &str) -> RichTextBlock {
        RichTextBlock {
            kind,
            text: text.to_string(),
            spans: Vec::new(),
        }
    }

    #[test]
    fn plain_text_joins_blocks_with_spaces() {
        let blocks = [
            plain(BlockKind::Paragraph, "primeiro bloco"),
            plain(BlockKind::Paragraph, "segundo"),
        ];
        assert_eq!(as_text(&blocks), "primeiro bloco segundo");
    }

    #[test]
    fn paragraphs_escape_markup() {
        let blocks = [plain(BlockKind::Paragraph, "a < b & c")];
        assert_eq!(as_html(&blocks), "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn strong_span_wraps_its_character_range() {
        let block = RichTextBlock {
            kind: BlockKind::Paragraph,
            text: "muito importante".to_string(),
            spans: vec![InlineSpan {
                start: 6,
                end: 16,
                style: SpanStyle::Strong,
            }],
        };
        assert_eq!(as_html(&[block]), "<p>muito <strong>importante</strong></p>");
    }

    #[test]
    fn hyperlink_target_is_escaped() {
        let block = RichTextBlock {
            kind: BlockKind::Paragraph,
            text: "link".to_string(),
            spans: vec![InlineSpan {
                start: 0,
                end: 4,
                style: SpanStyle::Hyperlink("https://example.com/?a=1&b=\"2\"".to_string()),
            }],
        };
        let html = as_html(&[block]);
        assert!(html.contains("href=\"https://example.com/?a=1&amp;b=&quot;2&quot;\""));
        assert!(html.contains(">link</a>"));
    }

    #[test]
    fn consecutive_list_items_share_one_list() {
        let blocks = [
            plain(BlockKind::ListItem, "um"),
            plain(BlockKind::ListItem, "dois"),
            plain(BlockKind::Paragraph, "depois"),
        ];
        assert_eq!(
            as_html(&blocks),
            "<ul><li>um</li><li>dois</li></ul><p>depois</p>"
        );
    }

    #[test]
    fn ordered_items_close_an_open_unordered_list() {
        let blocks = [
            plain(BlockKind::ListItem, "um"),
            plain(BlockKind::OrderedListItem, "primeiro"),
        ];
        assert_eq!(
            as_html(&blocks),
            "<ul><li>um</li></ul><ol><li>primeiro</li></ol>"
        );
    }

    #[test]
    fn trailing_list_is_closed() {
        let blocks = [plain(BlockKind::OrderedListItem, "só")];
        assert_eq!(as_html(&blocks), "<ol><li>só</li></ol>");
    }

    #[test]
    fn malformed_and_overlapping_spans_are_dropped() {
        let block = RichTextBlock {
            kind: BlockKind::Paragraph,
            text: "abcdef".to_string(),
            spans: vec![
                InlineSpan {
                    start: 0,
                    end: 3,
                    style: SpanStyle::Strong,
                },
                InlineSpan {
                    start: 2,
                    end: 5,
                    style: SpanStyle::Em,
                },
                InlineSpan {
                    start: 4,
                    end: 99,
                    style: SpanStyle::Em,
                },
            ],
        };
        assert_eq!(as_html(&[block]), "<p><strong>abc</strong>def</p>");
    }

    #[test]
    fn heading_levels_clamp_to_html_range() {
        let blocks = [plain(BlockKind::Heading(9), "título")];
        assert_eq!(as_html(&blocks), "<h6>título</h6>");
    }
}
