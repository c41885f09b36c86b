use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// SEC-003: Maximum element nesting accepted in a feed document.
const MAX_XML_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Document has no <channel> element")]
    MissingChannel,

    /// SEC-003: Nesting depth exceeds safety limit.
    #[error("XML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// A parsed RSS document with all text fields entity-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub channel_title: String,
    pub channel_link: String,
    pub channel_description: String,
    pub items: Vec<RemoteItem>,
}

/// One `<item>` of a channel. `pub_date` is kept verbatim; the pipeline
/// decides whether it is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub pub_date: String,
}

#[derive(Default)]
struct RawItem {
    title: String,
    link: String,
    description: String,
    pub_date: String,
}

impl RawItem {
    fn finish(self) -> RemoteItem {
        let description = decode_entities(&self.description);
        RemoteItem {
            title: decode_entities(&self.title),
            link: self.link,
            description: if description.is_empty() {
                None
            } else {
                Some(description)
            },
            pub_date: self.pub_date,
        }
    }
}

/// Parses an RSS 2.0 document.
///
/// Only direct children of `<channel>` and `<item>` are read, matched by
/// their qualified name, so namespaced siblings such as `<atom:link>` or
/// `<content:encoded>` never shadow the plain RSS fields.
///
/// Text is decoded twice: once for the XML layer (which also accepts HTML
/// named entities like `&nbsp;` that strict XML would reject) and once more
/// for titles and descriptions, because publishers routinely double-encode.
/// CDATA sections skip the XML layer.
///
/// # Security
///
/// `<!DOCTYPE>` and `<!ENTITY>` declarations are never expanded (SEC-002).
pub fn parse_rss(bytes: &[u8]) -> Result<FeedDocument, ParseError> {
    let content = String::from_utf8_lossy(bytes);
    let mut reader = Reader::from_str(&content);

    let mut doc = FeedDocument::default();
    let mut channel_seen = false;
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut item: Option<RawItem> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_XML_DEPTH));
                }
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"channel" => channel_seen = true,
                    b"item" if parent_is(&stack, b"channel") => item = Some(RawItem::default()),
                    _ => {}
                }
                if is_field_level(&stack) {
                    text.clear();
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                // <item/> still counts as an item; it just has nothing usable
                if e.name().as_ref() == b"item" && parent_is(&stack, b"channel") {
                    doc.items.push(RawItem::default().finish());
                }
            }
            // Only character data directly inside a field counts; markup
            // nested in a field is dropped but the text around it is kept.
            Ok(Event::Text(t)) if is_inside_field(&stack) => {
                text.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::CData(c)) if is_inside_field(&stack) => {
                // Re-escape so the XML-layer decode hands CDATA back verbatim
                text.push_str(&String::from_utf8_lossy(&c).replace('&', "&amp;"));
            }
            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                let value = || decode_entities(text.trim());

                if parent_is(&stack, b"item") {
                    if let Some(raw) = item.as_mut() {
                        match name.as_slice() {
                            b"title" => raw.title = value(),
                            b"link" => raw.link = value(),
                            b"description" => raw.description = value(),
                            b"pubDate" => raw.pub_date = value(),
                            _ => {}
                        }
                    }
                } else if parent_is(&stack, b"channel") {
                    match name.as_slice() {
                        b"title" => doc.channel_title = decode_entities(&value()),
                        b"link" => doc.channel_link = value(),
                        b"description" => doc.channel_description = decode_entities(&value()),
                        b"item" => {
                            if let Some(raw) = item.take() {
                                doc.items.push(raw.finish());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !channel_seen {
        return Err(ParseError::MissingChannel);
    }

    Ok(doc)
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().is_some_and(|top| top.as_slice() == name)
}

/// An element opened now would be a field of `<channel>` or `<item>`.
fn is_field_level(stack: &[Vec<u8>]) -> bool {
    parent_is(stack, b"channel") || parent_is(stack, b"item")
}

/// The innermost open element is a field of `<channel>` or `<item>`.
fn is_inside_field(stack: &[Vec<u8>]) -> bool {
    stack
        .split_last()
        .is_some_and(|(_, outer)| is_field_level(outer))
}

/// Decode XML and HTML character references (`&amp;`, `&#8217;`, `&nbsp;`, ...).
fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
