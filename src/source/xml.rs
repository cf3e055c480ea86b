//! Event source over markup documents (`.tmx`, `.tsx`, `.tx`).

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::builder::Event;
use crate::error::{GraphError, Result};
use crate::schema::RawAttributes;

/// Lazily pulls events from a markup document.
///
/// Text and CDATA directly inside an element are accumulated and handed
/// over with that element's end event.
pub struct XmlEvents<'a> {
    reader: Reader<&'a [u8]>,
    text: Vec<String>,
    pending_end: Option<String>,
    done: bool,
}

impl<'a> XmlEvents<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            reader: Reader::from_str(source),
            text: Vec::new(),
            pending_end: None,
            done: false,
        }
    }

    fn syntax_error(&self, message: impl std::fmt::Display) -> GraphError {
        GraphError::Source {
            message: format!("{} (near byte {})", message, self.reader.buffer_position()),
            help: Some("Check that the document is well-formed XML".to_string()),
        }
    }

    fn append_text(&mut self, text: &str) {
        if let Some(buffer) = self.text.last_mut() {
            buffer.push_str(text);
        }
    }

    fn pull(&mut self) -> Result<Option<Event>> {
        loop {
            let event = self.reader.read_event().map_err(|e| self.syntax_error(e))?;
            match event {
                XmlEvent::Start(start) => {
                    let (tag, attributes) = start_parts(&start)?;
                    self.text.push(String::new());
                    return Ok(Some(Event::start(tag, attributes)));
                }
                XmlEvent::Empty(start) => {
                    let (tag, attributes) = start_parts(&start)?;
                    self.pending_end = Some(tag.clone());
                    return Ok(Some(Event::start(tag, attributes)));
                }
                XmlEvent::End(end) => {
                    let tag = tag_name(end.name())?;
                    let text = self.text.pop().filter(|t| !t.is_empty());
                    return Ok(Some(Event::end(tag, text)));
                }
                XmlEvent::Text(text) => {
                    let text = text.unescape().map_err(|e| self.syntax_error(e))?;
                    self.append_text(&text);
                }
                XmlEvent::CData(data) => {
                    let data = std::str::from_utf8(&data).map_err(|e| self.syntax_error(e))?;
                    self.append_text(data);
                }
                XmlEvent::Eof => return Ok(None),
                // declarations, comments, processing instructions
                _ => {}
            }
        }
    }
}

impl Iterator for XmlEvents<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(tag) = self.pending_end.take() {
            return Some(Ok(Event::end(tag, None)));
        }
        if self.done {
            return None;
        }

        match self.pull() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn tag_name(name: QName<'_>) -> Result<String> {
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|e| GraphError::Source {
            message: format!("tag name is not UTF-8: {}", e),
            help: None,
        })
}

fn start_parts(start: &BytesStart<'_>) -> Result<(String, RawAttributes)> {
    let tag = tag_name(start.name())?;
    let mut attributes = RawAttributes::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| GraphError::Source {
            message: format!("bad attribute on <{}>: {}", tag, e),
            help: None,
        })?;
        let key = tag_name(attr.key)?;
        let value = attr.unescape_value().map_err(|e| GraphError::Source {
            message: format!("bad value for '{}' on <{}>: {}", key, tag, e),
            help: None,
        })?;
        attributes.insert(key, value.into_owned());
    }

    Ok((tag, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EventKind;

    fn collect(source: &str) -> Result<Vec<Event>> {
        XmlEvents::new(source).collect()
    }

    #[test]
    fn test_empty_element_is_start_then_end() {
        let events = collect(r#"<tile gid="5"/>"#).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Start);
        assert_eq!(events[0].attributes.get("gid").map(String::as_str), Some("5"));
        assert_eq!(events[1].kind, EventKind::End);
        assert_eq!(events[1].tag, "tile");
    }

    #[test]
    fn test_text_delivered_with_end() {
        let events = collect("<data encoding=\"csv\">\n1,2,\n3,4\n</data>").unwrap();
        assert_eq!(events[1].text.as_deref(), Some("\n1,2,\n3,4\n"));
    }

    #[test]
    fn test_child_text_does_not_leak_to_parent() {
        let events = collect("<layer><data>7</data></layer>").unwrap();
        let tags: Vec<_> = events.iter().map(|e| (e.tag.as_str(), e.text.as_deref())).collect();
        assert_eq!(
            tags,
            vec![("layer", None), ("data", None), ("data", Some("7")), ("layer", None)]
        );
    }

    #[test]
    fn test_declaration_and_comments_skipped() {
        let events = collect("<?xml version=\"1.0\"?>\n<!-- hi --><map/>").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tag, "map");
    }

    #[test]
    fn test_entities_unescaped() {
        let events = collect(r#"<property name="a&amp;b" value="&lt;x&gt;"/>"#).unwrap();
        assert_eq!(events[0].attributes["name"], "a&b");
        assert_eq!(events[0].attributes["value"], "<x>");
    }

    #[test]
    fn test_cdata_is_text() {
        let events = collect("<property name=\"n\"><![CDATA[a<b]]></property>").unwrap();
        assert_eq!(events[1].text.as_deref(), Some("a<b"));
    }

    #[test]
    fn test_syntax_error_is_source_error() {
        let result = collect("<map><layer></map>");
        assert!(matches!(result, Err(GraphError::Source { .. })));
    }
}
