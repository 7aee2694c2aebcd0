//! Pull-based XML tokenizer that turns a byte stream into handler callbacks.
//!
//! Adjacent character data (text, CDATA sections, entity and character
//! references) is coalesced into a single text event, so a handler sees the
//! same events whether or not the source used escapes.

use super::event_model::{Attribute, QName, StreamEventHandler};
use crate::error::TransformError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope namespace declarations, one frame per open element.
#[derive(Debug, Default)]
struct NamespaceStack {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceStack {
    fn push(&mut self, declarations: Vec<(String, String)>) {
        self.frames.push(declarations);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// `""` looks up the default namespace; an empty URI means undeclared.
    fn resolve(&self, prefix: &str) -> Option<String> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE.to_string());
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }
}

pub struct XmlTokenizer<R: BufRead> {
    reader: Reader<R>,
    href: String,
    buffer_capacity: usize,
}

impl<R: BufRead> XmlTokenizer<R> {
    /// `href` names the source in error messages.
    pub fn new(source: R, href: impl Into<String>) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            href: href.into(),
            buffer_capacity: 8 * 1024,
        }
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Reads the whole source, delivering events to `handler` as they are
    /// recognized.
    pub fn run<H>(mut self, handler: &mut H) -> Result<H::Output, TransformError>
    where
        H: StreamEventHandler<Error = TransformError>,
    {
        let mut buf = Vec::with_capacity(self.buffer_capacity);
        let mut pending_text = String::new();
        let mut namespaces = NamespaceStack::default();
        let mut open_names: Vec<QName> = Vec::new();

        handler.start_document()?;

        loop {
            let event = self
                .reader
                .read_event_into(&mut buf)
                .map_err(|e| self.malformed(e))?;

            match event {
                Event::Text(e) => pending_text.push_str(self.utf8(&e)?),
                Event::CData(e) => pending_text.push_str(self.utf8(&e)?),
                Event::GeneralRef(e) => {
                    let name = self.utf8(&e)?;
                    pending_text.push(self.resolve_reference(name)?);
                }
                Event::Start(e) => {
                    flush_text(handler, &mut pending_text)?;
                    let (name, attributes) = self.element(&e, &mut namespaces)?;
                    handler.start_element(&name, &attributes)?;
                    open_names.push(name);
                }
                Event::Empty(e) => {
                    flush_text(handler, &mut pending_text)?;
                    let (name, attributes) = self.element(&e, &mut namespaces)?;
                    handler.start_element(&name, &attributes)?;
                    handler.end_element(&name)?;
                    namespaces.pop();
                }
                Event::End(_) => {
                    flush_text(handler, &mut pending_text)?;
                    if let Some(name) = open_names.pop() {
                        handler.end_element(&name)?;
                    }
                    namespaces.pop();
                }
                Event::Comment(e) => {
                    flush_text(handler, &mut pending_text)?;
                    handler.comment(self.utf8(&e)?)?;
                }
                Event::PI(e) => {
                    flush_text(handler, &mut pending_text)?;
                    let content = self.utf8(&e)?;
                    let (target, data) = content
                        .split_once(char::is_whitespace)
                        .unwrap_or((content, ""));
                    handler.processing_instruction(target, data.trim_start())?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !open_names.is_empty() {
            return Err(TransformError::streaming_source(
                &self.href,
                format!("unexpected end of input, {} element(s) still open", open_names.len()),
            ));
        }
        flush_text(handler, &mut pending_text)?;
        log::trace!("finished tokenizing '{}'", self.href);
        handler.end_document()
    }

    fn element(
        &self,
        start: &BytesStart<'_>,
        namespaces: &mut NamespaceStack,
    ) -> Result<(QName, Vec<Attribute>), TransformError> {
        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| self.malformed(e))?;
            let key = self.utf8(attribute.key.as_ref())?.to_string();
            let raw = self.utf8(&attribute.value)?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| self.malformed(e))?
                .into_owned();

            if key == "xmlns" {
                declarations.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((key, value));
            }
        }
        namespaces.push(declarations);

        let mut name = QName::parse(self.utf8(start.name().as_ref())?);
        name.namespace_uri = namespaces.resolve(name.prefix.as_deref().unwrap_or(""));

        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let mut attribute = Attribute::new(key, value);
                // Unprefixed attributes are in no namespace.
                attribute.name.namespace_uri = attribute
                    .name
                    .prefix
                    .as_deref()
                    .and_then(|prefix| namespaces.resolve(prefix));
                attribute
            })
            .collect();

        Ok((name, attributes))
    }

    fn resolve_reference(&self, name: &str) -> Result<char, TransformError> {
        let resolved = if let Some(hex) = name.strip_prefix("#x") {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(decimal) = name.strip_prefix('#') {
            decimal.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            quick_xml::escape::resolve_predefined_entity(name).and_then(|s| s.chars().next())
        };
        resolved.ok_or_else(|| {
            TransformError::streaming_source(&self.href, format!("unknown reference '&{};'", name))
        })
    }

    fn utf8<'b>(&self, bytes: &'b [u8]) -> Result<&'b str, TransformError> {
        std::str::from_utf8(bytes).map_err(|e| self.malformed(e))
    }

    fn malformed(&self, error: impl std::fmt::Display) -> TransformError {
        TransformError::streaming_source(
            &self.href,
            format!(
                "malformed XML at byte {}: {}",
                self.reader.buffer_position(),
                error
            ),
        )
    }
}

fn flush_text<H>(handler: &mut H, pending: &mut String) -> Result<(), TransformError>
where
    H: StreamEventHandler<Error = TransformError>,
{
    if !pending.is_empty() {
        handler.text(pending)?;
        pending.clear();
    }
    Ok(())
}
