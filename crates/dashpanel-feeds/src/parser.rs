//! RSS 2.0 / Atom item extraction.
//!
//! The document is read into a small element tree first so that each field
//! can be located the way a selector query would: first matching descendant
//! in document order. Parsing never fails; anything unreadable yields an
//! empty list.

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Items kept per feed
pub const MAX_ITEMS: usize = 8;
/// Items shown per feed
pub const RENDER_ITEMS: usize = 6;
/// Excerpt length in characters
pub const EXCERPT_CHARS: usize = 220;
/// Deepest element nesting accepted before a document is rejected
pub const MAX_DEPTH: usize = 256;

/// A single headline from a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    /// `None` where the feed names no author (shown as an empty string)
    pub author: Option<String>,
    /// `None` where no image could be found (shown as an empty string)
    pub image_url: Option<String>,
    pub excerpt: String,
}

impl FeedItem {
    /// Title to display, falling back to the link
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.link
        } else {
            &self.title
        }
    }

    /// "author • date" line; either part may be missing.
    pub fn meta_line(&self) -> String {
        let date = self
            .published_at
            .map(|d| d.format("%b %-d, %Y %H:%M").to_string());

        [self.author.clone(), date]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

#[derive(Debug)]
enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Default)]
struct Element {
    local: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attrs = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = match attr.unescape_value() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                };
                (key, value)
            })
            .collect();

        Self {
            local,
            attrs,
            children: Vec::new(),
        }
    }

    fn is(&self, local: &str) -> bool {
        self.local == local
    }

    /// Non-blank attribute value
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// All descendants in document order, excluding `self`
    fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            out.push(child);
            child.walk(out);
        }
    }

    fn find(&self, local: &str) -> Option<&Element> {
        self.descendants().into_iter().find(|el| el.is(local))
    }

    /// Concatenated text of this element and all descendants
    fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Trimmed text of the first matching descendant, if non-empty
    fn find_text(&self, local: &str) -> Option<String> {
        self.find(local)
            .map(|el| el.text().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Matching elements at any depth; matches are not searched further.
    fn collect_named<'a>(&'a self, local: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.is(local) {
                out.push(child);
            } else {
                child.collect_named(local, out);
            }
        }
    }
}

/// Build an element tree, or `None` if the document is not well formed or
/// nests deeper than [`MAX_DEPTH`]. Tree walks recurse, so depth stays bounded.
fn parse_document(xml: &str) -> Option<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if stack.len() > MAX_DEPTH {
                    tracing::debug!("Feed XML nested deeper than {} elements", MAX_DEPTH);
                    return None;
                }
                stack.push(Element::from_start(&start));
            }
            Ok(Event::Empty(start)) => {
                let element = Element::from_start(&start);
                stack.last_mut()?.children.push(Node::Element(element));
            }
            Ok(Event::End(_)) => {
                let element = stack.pop()?;
                stack.last_mut()?.children.push(Node::Element(element));
            }
            Ok(Event::Text(text)) => {
                let value = match text.unescape() {
                    Ok(value) => value.into_owned(),
                    // HTML entities such as &nbsp; are not XML entities
                    Err(_) => String::from_utf8_lossy(&text).into_owned(),
                };
                stack.last_mut()?.children.push(Node::Text(value));
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data).into_owned();
                stack.last_mut()?.children.push(Node::Text(value));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    "Feed XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                );
                return None;
            }
        }
    }

    // Unclosed elements at end of input
    if stack.len() != 1 {
        return None;
    }
    stack.pop()
}

fn img_src_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).ok())
        .as_ref()
}

fn tag_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").ok()).as_ref()
}

fn strip_tags(html: &str) -> Cow<'_, str> {
    match tag_pattern() {
        Some(pattern) => pattern.replace_all(html, ""),
        None => Cow::Borrowed(html),
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn extract_link(item: &Element, source_url: &str) -> String {
    if let Some(text) = item.find_text("link") {
        return text;
    }

    let links: Vec<&Element> = item
        .descendants()
        .into_iter()
        .filter(|el| el.is("link") && el.attr("href").is_some())
        .collect();
    let alternate = links
        .iter()
        .find(|el| matches!(el.attr("rel"), None | Some("alternate")))
        .or_else(|| links.first());
    if let Some(href) = alternate.and_then(|el| el.attr("href")) {
        return href.to_string();
    }

    item.find_text("guid")
        .or_else(|| item.find_text("id"))
        .unwrap_or_else(|| source_url.to_string())
}

fn extract_date(item: &Element) -> Option<DateTime<Utc>> {
    ["pubDate", "date", "published", "updated"]
        .iter()
        .find_map(|name| item.find_text(name))
        .and_then(|raw| parse_date(&raw))
}

fn extract_author(item: &Element) -> Option<String> {
    item.find_text("author")
        .or_else(|| item.find_text("creator"))
        .or_else(|| item.find("author").and_then(|a| a.find_text("name")))
}

fn extract_image(item: &Element) -> Option<String> {
    let descendants = item.descendants();

    let enclosures: Vec<&Element> = descendants
        .iter()
        .copied()
        .filter(|el| el.is("enclosure") && el.attr("url").is_some())
        .collect();
    let enclosure = enclosures
        .iter()
        .find(|el| el.attr("type").is_some_and(|t| t.starts_with("image")))
        .or_else(|| enclosures.first());
    if let Some(url) = enclosure.and_then(|el| el.attr("url")) {
        return Some(url.to_string());
    }

    let media = descendants
        .iter()
        .find(|el| (el.is("content") || el.is("thumbnail")) && el.attr("url").is_some())
        .and_then(|el| el.attr("url"));
    if let Some(url) = media {
        return Some(url.to_string());
    }

    let body = ["encoded", "description", "content", "summary"]
        .iter()
        .find_map(|name| item.find(name).map(Element::text).filter(|t| !t.trim().is_empty()));
    if let (Some(body), Some(pattern)) = (body, img_src_pattern()) {
        if let Some(src) = pattern.captures(&body).and_then(|c| c.get(1)) {
            return Some(src.as_str().to_string());
        }
    }

    descendants
        .iter()
        .find(|el| el.is("img"))
        .and_then(|el| el.attr("src"))
        .map(str::to_string)
}

fn extract_excerpt(item: &Element) -> String {
    let body = ["description", "encoded", "summary", "content"]
        .iter()
        .find_map(|name| item.find(name).map(Element::text).filter(|t| !t.trim().is_empty()))
        .unwrap_or_default();

    strip_tags(&body).trim().chars().take(EXCERPT_CHARS).collect()
}

fn to_item(item: &Element, source_url: &str) -> FeedItem {
    FeedItem {
        title: item.find_text("title").unwrap_or_default(),
        link: extract_link(item, source_url),
        published_at: extract_date(item),
        author: extract_author(item),
        image_url: extract_image(item),
        excerpt: extract_excerpt(item),
    }
}

/// Extract up to [`MAX_ITEMS`] items from an RSS or Atom document.
///
/// `source_url` is used as the link of items that carry none.
pub fn parse_feed(xml: &str, source_url: &str) -> Vec<FeedItem> {
    let root = match parse_document(xml) {
        Some(root) => root,
        None => return Vec::new(),
    };

    let mut nodes = Vec::new();
    root.collect_named("item", &mut nodes);
    if nodes.is_empty() {
        root.collect_named("entry", &mut nodes);
    }

    nodes
        .into_iter()
        .take(MAX_ITEMS)
        .map(|item| to_item(item, source_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SOURCE: &str = "https://example.com/feed/";

    fn rss(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:media="http://search.yahoo.com/mrss/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example</title>
    <link>https://example.com/</link>
    {}
  </channel>
</rss>"#,
            items
        )
    }

    #[test]
    fn test_single_item_fields() {
        let xml = rss(r#"
            <item>
              <title> First post </title>
              <link>https://example.com/first</link>
              <pubDate>Wed, 15 Oct 2025 14:30:00 GMT</pubDate>
              <dc:creator>Jane Writer</dc:creator>
              <enclosure url="https://example.com/first.jpg" type="image/jpeg" length="0"/>
              <description>&lt;p&gt;Hello &lt;b&gt;world&lt;/b&gt;&lt;/p&gt;</description>
            </item>"#);

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.title, "First post");
        assert_eq!(item.link, "https://example.com/first");
        assert_eq!(
            item.published_at,
            Some(Utc.with_ymd_and_hms(2025, 10, 15, 14, 30, 0).unwrap())
        );
        assert_eq!(item.author.as_deref(), Some("Jane Writer"));
        assert_eq!(item.image_url.as_deref(), Some("https://example.com/first.jpg"));
        assert_eq!(item.excerpt, "Hello world");
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let xml = rss(r#"
            <item><title>A</title><link>https://example.com/a</link></item>
            <item><title>B</title><guid>urn:b</guid></item>"#);

        assert_eq!(parse_feed(&xml, SOURCE), parse_feed(&xml, SOURCE));
    }

    #[test]
    fn test_enclosure_wins_over_media_thumbnail() {
        let xml = rss(r#"
            <item>
              <title>Pic</title>
              <media:thumbnail url="https://example.com/thumb.jpg"/>
              <enclosure url="https://example.com/enclosure.jpg" type="image/png"/>
            </item>"#);

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items[0].image_url.as_deref(), Some("https://example.com/enclosure.jpg"));
    }

    #[test]
    fn test_image_enclosure_preferred_over_audio_enclosure() {
        let xml = rss(r#"
            <item>
              <enclosure url="https://example.com/episode.mp3" type="audio/mpeg"/>
              <enclosure url="https://example.com/cover.jpg" type="image/jpeg"/>
            </item>"#);

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items[0].image_url.as_deref(), Some("https://example.com/cover.jpg"));

        let xml = rss(r#"<item><enclosure url="https://example.com/episode.mp3" type="audio/mpeg"/></item>"#);
        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items[0].image_url.as_deref(), Some("https://example.com/episode.mp3"));
    }

    #[test]
    fn test_media_content_then_body_image_then_img_child() {
        let xml = rss(r#"<item><media:content url="https://example.com/media.jpg" medium="image"/></item>"#);
        assert_eq!(
            parse_feed(&xml, SOURCE)[0].image_url.as_deref(),
            Some("https://example.com/media.jpg")
        );

        let xml = rss(r#"
            <item>
              <content:encoded><![CDATA[<p><IMG class="hero" SRC='https://example.com/inline.png'/>Body</p>]]></content:encoded>
            </item>"#);
        assert_eq!(
            parse_feed(&xml, SOURCE)[0].image_url.as_deref(),
            Some("https://example.com/inline.png")
        );

        let xml = rss(r#"<item><title>x</title><img src="https://example.com/child.gif"/></item>"#);
        assert_eq!(
            parse_feed(&xml, SOURCE)[0].image_url.as_deref(),
            Some("https://example.com/child.gif")
        );

        let xml = rss("<item><title>none</title></item>");
        assert_eq!(parse_feed(&xml, SOURCE)[0].image_url, None);
    }

    #[test]
    fn test_long_description_is_truncated() {
        let long = "x".repeat(300);
        let xml = rss(&format!("<item><description>{}</description></item>", long));

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items[0].excerpt.chars().count(), EXCERPT_CHARS);
        assert_eq!(items[0].excerpt, "x".repeat(EXCERPT_CHARS));
    }

    #[test]
    fn test_truncation_respects_multibyte_characters() {
        let long = "é".repeat(300);
        let xml = rss(&format!("<item><description><![CDATA[<p>{}</p>]]></description></item>", long));

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items[0].excerpt, "é".repeat(EXCERPT_CHARS));
    }

    #[test]
    fn test_malformed_xml_yields_empty_list() {
        for xml in [
            "",
            "not xml at all",
            "<rss><channel><item><title>x</title></channel></rss>",
            "<rss><channel><item><title>unterminated",
        ] {
            assert!(parse_feed(xml, SOURCE).is_empty(), "input: {:?}", xml);
        }
    }

    #[test]
    fn test_deeply_nested_document_yields_empty_list() {
        let depth = 100_000;
        let body = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let xml = rss(&format!("<item><title>deep</title><description>{}</description></item>", body));

        assert!(parse_feed(&xml, SOURCE).is_empty());
    }

    #[test]
    fn test_nesting_within_limit_still_parses() {
        let depth = 100;
        let body = format!("{}x{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let xml = rss(&format!("<item><title>nested</title><description>{}</description></item>", body));

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].excerpt, "x");
    }

    #[test]
    fn test_items_capped() {
        let items: String = (0..10)
            .map(|i| format!("<item><title>t{}</title></item>", i))
            .collect();

        let parsed = parse_feed(&rss(&items), SOURCE);
        assert_eq!(parsed.len(), MAX_ITEMS);
        assert_eq!(parsed[0].title, "t0");
        assert_eq!(parsed[7].title, "t7");
    }

    #[test]
    fn test_link_falls_back_to_guid_then_source() {
        let xml = rss(r#"
            <item><title>g</title><guid isPermaLink="true">https://example.com/by-guid</guid></item>
            <item><title>s</title></item>"#);

        let items = parse_feed(&xml, SOURCE);
        assert_eq!(items[0].link, "https://example.com/by-guid");
        assert_eq!(items[1].link, SOURCE);
    }

    #[test]
    fn test_atom_entries() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom example</title>
  <entry>
    <title>Atom entry</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" href="https://example.com/entry"/>
    <id>urn:uuid:1</id>
    <published>2025-10-15T09:15:00-04:00</published>
    <author><name>Sam Author</name></author>
    <summary>Short summary</summary>
  </entry>
</feed>"#;

        let items = parse_feed(xml, SOURCE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Atom entry");
        assert_eq!(items[0].link, "https://example.com/entry");
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2025, 10, 15, 13, 15, 0).unwrap())
        );
        assert_eq!(items[0].author.as_deref(), Some("Sam Author"));
        assert_eq!(items[0].excerpt, "Short summary");
    }

    #[test]
    fn test_unparseable_date_is_none() {
        let xml = rss("<item><pubDate>sometime last week</pubDate></item>");
        assert_eq!(parse_feed(&xml, SOURCE)[0].published_at, None);
    }

    #[test]
    fn test_meta_line() {
        let item = FeedItem {
            title: String::new(),
            link: "https://example.com/x".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2025, 10, 15, 14, 30, 0).unwrap()),
            author: Some("Jane".to_string()),
            image_url: None,
            excerpt: String::new(),
        };
        assert_eq!(item.meta_line(), "Jane • Oct 15, 2025 14:30");
        assert_eq!(item.display_title(), "https://example.com/x");
    }
}
