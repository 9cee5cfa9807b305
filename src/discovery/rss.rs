//! RSS 2.0 / RSS 1.0 / Atom feed parsing.
//!
//! Feeds are read with a streaming reader. Only unprefixed element names
//! count, so extensions such as `atom:link` or `media:content` are skipped.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::models::SourceCandidate;
use crate::utils::{parse_timestamp, strip_query};

/// `<link>` as RSS text or Atom `href` attribute.
#[derive(Debug, Default)]
struct FeedLink {
    href: Option<String>,
    rel: Option<String>,
    text: Option<String>,
}

impl FeedLink {
    fn from_element(e: &BytesStart<'_>) -> Self {
        let mut link = FeedLink::default();
        for attr in e.attributes().flatten() {
            let value = decode_text(String::from_utf8_lossy(&attr.value).into_owned());
            match attr.key.as_ref() {
                b"href" => link.href = Some(value),
                b"rel" => link.rel = Some(value),
                _ => {}
            }
        }
        link
    }

    fn target(&self) -> Option<&str> {
        self.href
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .or_else(|| self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()))
    }

    fn is_alternate(&self) -> bool {
        matches!(self.rel.as_deref(), None | Some("alternate"))
    }
}

#[derive(Debug, Default)]
struct FeedEntry {
    links: Vec<FeedLink>,
    pub_date: Option<String>,
    updated: Option<String>,
}

impl FeedEntry {
    /// The entry's article link: first alternate link, else first link.
    fn link(&self) -> String {
        self.links
            .iter()
            .find(|l| l.is_alternate() && l.target().is_some())
            .or_else(|| self.links.first())
            .and_then(FeedLink::target)
            .map(|l| strip_query(l).to_string())
            .unwrap_or_default()
    }

    fn published_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let raw = [&self.pub_date, &self.updated]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty());
        match raw {
            Some(s) => parse_timestamp(s),
            None => Some(now),
        }
    }
}

/// Entry children whose text is kept.
#[derive(Debug, Clone, Copy)]
enum Field {
    Link,
    PubDate,
    Updated,
}

impl Field {
    /// Only unprefixed names count: `atom:link` or `dc:date` are extensions.
    fn of(qname: &[u8]) -> Option<Self> {
        match qname {
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

fn is_entry(qname: &[u8]) -> bool {
    matches!(qname, b"item" | b"entry")
}

fn decode_text(raw: String) -> String {
    match unescape(&raw) {
        Ok(Cow::Owned(s)) => s,
        _ => raw,
    }
}

/// Parse a feed into candidates, in document order, at most `max_items`.
///
/// RSS 2.0 `channel/item`, RDF root-level `item` and Atom `entry` are all
/// read. Namespaced children of an entry (`atom:link`, `media:content`,
/// `content:encoded`, ...) are ignored. Entries without a date get `now`;
/// entries with an unparseable date get `None`. Query strings are removed
/// from links.
///
/// # Errors
///
/// The reader's error when the document is not well-formed XML.
pub fn parse_feed(
    xml: &str,
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<Vec<SourceCandidate>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut candidates = Vec::new();

    let mut depth = 0usize;
    let mut entry: Option<(usize, FeedEntry)> = None;
    let mut field: Option<(Field, String)> = None;

    while candidates.len() < max_items {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let name = e.name();
                match &mut entry {
                    None => {
                        if is_entry(name.as_ref()) {
                            entry = Some((depth, FeedEntry::default()));
                        }
                    }
                    Some((at, current)) => {
                        if depth == *at + 1 {
                            field = Field::of(name.as_ref()).map(|f| (f, String::new()));
                            if matches!(field, Some((Field::Link, _))) {
                                current.links.push(FeedLink::from_element(&e));
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some((at, current)) = &mut entry {
                    if depth == *at && e.name().as_ref() == b"link" {
                        current.links.push(FeedLink::from_element(&e));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, buf)) = &mut field {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(t) => {
                if let Some((_, buf)) = &mut field {
                    buf.push_str(&escape(String::from_utf8_lossy(&t).as_ref()));
                }
            }
            Event::GeneralRef(r) => {
                if let Some((_, buf)) = &mut field {
                    buf.push('&');
                    buf.push_str(&String::from_utf8_lossy(&r));
                    buf.push(';');
                }
            }
            Event::End(_) => {
                let entry_depth = entry.as_ref().map(|(at, _)| *at);
                if entry_depth == Some(depth) {
                    if let Some((_, done)) = entry.take() {
                        candidates.push(SourceCandidate::new(done.link(), done.published_at(now)));
                    }
                } else if let (Some((kind, raw)), Some((_, current))) = (field.take(), &mut entry) {
                    let text = decode_text(raw);
                    match kind {
                        Field::Link => {
                            if let Some(link) = current.links.last_mut() {
                                link.text = Some(text);
                            }
                        }
                        Field::PubDate => current.pub_date = Some(text),
                        Field::Updated => current.updated = Some(text),
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(candidates)
}
