use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;

use crate::classify::Classifier;
use crate::types::Item;
use crate::util::{strip_markup, truncate_with_marker};

/// Default description length, in terminal columns, before the marker.
pub const DEFAULT_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ParseError {
    /// Document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// Document looked like Atom but feed-rs rejected it.
    #[error("Atom parse error: {0}")]
    Atom(String),
}

/// Per-document normalization settings.
///
/// Descriptions longer than `description_chars` columns are cut and get a
/// trailing `...`; shorter descriptions are kept whole with no marker.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub description_chars: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            description_chars: DEFAULT_DESCRIPTION_CHARS,
        }
    }
}

/// One `<item>` as it appears in the document, before any cleanup.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    media_url: Option<String>,
    enclosure_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Link,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"description" => Some(Field::Description),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            _ => None,
        }
    }

    fn slot(self, entry: &mut RawEntry) -> &mut Option<String> {
        match self {
            Field::Title => &mut entry.title,
            Field::Description => &mut entry.description,
            Field::Link => &mut entry.link,
            Field::PubDate => &mut entry.pub_date,
        }
    }
}

/// Parses a feed document into normalized, classified items.
///
/// RSS `<item>` elements are read with quick-xml. A document with no items
/// whose root is `<feed>` is handed to feed-rs so Atom sources also work.
///
/// Items sharing a link within this document are collapsed to the first one.
///
/// # Errors
///
/// Returns [`ParseError`] if the document is not well-formed. An empty but
/// valid channel yields `Ok(vec![])`.
pub fn parse_items(
    document: &str,
    source_name: &str,
    options: &ParseOptions,
    classifier: &Classifier,
) -> Result<Vec<Item>, ParseError> {
    let (entries, root) = read_rss_entries(document)?;

    let entries = if entries.is_empty() && root.as_deref() == Some("feed") {
        tracing::debug!(source = %source_name, "No RSS items, parsing as Atom");
        read_atom_entries(document)?
    } else {
        entries
    };

    Ok(normalize(entries, source_name, options, classifier))
}

fn read_rss_entries(document: &str) -> Result<(Vec<RawEntry>, Option<String>), ParseError> {
    // quick-xml never expands <!ENTITY> declarations, so hostile DOCTYPEs
    // surface as unescape errors rather than entity expansion.
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<RawEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut root: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                if let Some(entry) = current.as_mut() {
                    read_media_attributes(&e, entry);
                    if field.is_none() {
                        if let Some(f) = Field::from_name(e.name().as_ref()) {
                            // First occurrence of each field wins.
                            if f.slot(entry).is_none() {
                                field = Some(f);
                                text.clear();
                            }
                        }
                    }
                } else if e.name().as_ref() == b"item" {
                    current = Some(RawEntry::default());
                }
            }
            Ok(Event::Empty(e)) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                if let Some(entry) = current.as_mut() {
                    read_media_attributes(&e, entry);
                }
            }
            Ok(Event::Text(e)) if field.is_some() => {
                // Feeds routinely carry HTML entities quick-xml doesn't know;
                // keep them raw and let strip_markup decode them.
                match e.unescape() {
                    Ok(s) => text.push_str(&s),
                    Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                }
            }
            Ok(Event::CData(e)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    if Field::from_name(name.as_ref()) == Some(f) {
                        *f.slot(entry) = Some(std::mem::take(&mut text));
                        field = None;
                    }
                }
                if name.as_ref() == b"item" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    field = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok((entries, root))
}

/// Picks up image candidates from `<media:content>` and `<enclosure>`.
fn read_media_attributes(e: &BytesStart<'_>, entry: &mut RawEntry) {
    let is_media = e.local_name().as_ref() == b"content";
    let is_enclosure = e.name().as_ref() == b"enclosure";
    if !is_media && !is_enclosure {
        return;
    }

    let mut url = None;
    let mut mime = None;
    for attr in e.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.trim().to_string(),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping malformed media attribute");
                continue;
            }
        };
        match attr.key.as_ref() {
            b"url" => url = Some(value),
            b"type" => mime = Some(value),
            _ => {}
        }
    }

    let url = url.filter(|u| !u.is_empty());
    if is_media {
        if entry.media_url.is_none() {
            entry.media_url = url;
        }
    } else if entry.enclosure_url.is_none()
        && mime.is_some_and(|m| m.to_ascii_lowercase().starts_with("image"))
    {
        entry.enclosure_url = url;
    }
}

fn read_atom_entries(document: &str) -> Result<Vec<RawEntry>, ParseError> {
    let feed =
        feed_rs::parser::parse(document.as_bytes()).map_err(|e| ParseError::Atom(e.to_string()))?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let media_url = entry
                .media
                .iter()
                .flat_map(|m| m.content.iter())
                .find_map(|c| c.url.as_ref().map(|u| u.to_string()));
            RawEntry {
                title: entry.title.map(|t| t.content),
                description: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body)),
                link: entry.links.first().map(|l| l.href.clone()),
                pub_date: entry.published.or(entry.updated).map(|dt| dt.to_rfc2822()),
                media_url,
                enclosure_url: None,
            }
        })
        .collect();

    Ok(entries)
}

fn normalize(
    entries: Vec<RawEntry>,
    source_name: &str,
    options: &ParseOptions,
    classifier: &Classifier,
) -> Vec<Item> {
    let fetched_ms = Utc::now().timestamp_millis();
    let mut seen_links = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let link = entry.link.as_deref().map(str::trim).unwrap_or_default().to_string();
        if !seen_links.insert(link.clone()) {
            continue;
        }

        let raw_description = entry.description.unwrap_or_default();
        let title = strip_markup(entry.title.as_deref().unwrap_or_default());
        let description = strip_markup(&raw_description);
        let category = classifier.classify(&title, &description).to_string();

        let image = entry
            .media_url
            .or(entry.enclosure_url)
            .or_else(|| find_img_src(&raw_description));

        let pub_date = entry.pub_date.map(|d| d.trim().to_string()).unwrap_or_default();
        let published = parse_pub_date(&pub_date);

        items.push(Item {
            id: item_id(source_name, index, fetched_ms),
            title,
            description: truncate_with_marker(&description, options.description_chars)
                .into_owned(),
            link,
            pub_date,
            published,
            category,
            source: source_name.to_string(),
            image,
            is_favorite: false,
        });
    }

    items
}

/// `{source}-{position}-{millis}-{random}`. Only used to key items in views.
fn item_id(source_name: &str, index: usize, fetched_ms: i64) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}-{}", source_name, index, fetched_ms, &random[..9])
}

fn img_regex() -> &'static Regex {
    static IMG: OnceLock<Regex> = OnceLock::new();
    IMG.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"'>]+)["']"#).expect("img pattern is valid")
    })
}

/// Best-effort scan of description HTML for the first `<img src=...>`.
fn find_img_src(html: &str) -> Option<String> {
    img_regex()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses RSS (RFC 2822) dates, falling back to RFC 3339 for feeds that
/// put ISO timestamps in `<pubDate>`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
