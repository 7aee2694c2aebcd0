//! Output sinks and the replayable content-event buffer.

use crate::streaming::QName;
use serde::Serialize;

/// Destination for the events produced by executing instructions.
///
/// Attributes and namespaces belong to the most recently started element.
pub trait OutputSink {
    fn start_element(&mut self, name: &QName);
    fn attribute(&mut self, name: &QName, value: &str);
    fn end_element(&mut self, name: &QName);
    fn text(&mut self, text: &str);
    fn comment(&mut self, text: &str);
    fn processing_instruction(&mut self, target: &str, data: &str);
    /// An empty prefix with an empty URI undeclares the default namespace.
    fn namespace(&mut self, prefix: &str, uri: &str);

    /// Whether the sink can hold markup; text-only sinks return `false`.
    fn supports_structure(&self) -> bool {
        true
    }
}

/// Forwarding through a mutable reference.
impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn start_element(&mut self, name: &QName) {
        (**self).start_element(name)
    }
    fn attribute(&mut self, name: &QName, value: &str) {
        (**self).attribute(name, value)
    }
    fn end_element(&mut self, name: &QName) {
        (**self).end_element(name)
    }
    fn text(&mut self, text: &str) {
        (**self).text(text)
    }
    fn comment(&mut self, text: &str) {
        (**self).comment(text)
    }
    fn processing_instruction(&mut self, target: &str, data: &str) {
        (**self).processing_instruction(target, data)
    }
    fn namespace(&mut self, prefix: &str, uri: &str) {
        (**self).namespace(prefix, uri)
    }
    fn supports_structure(&self) -> bool {
        (**self).supports_structure()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum OutputEvent {
    StartElement { name: QName },
    Attribute { name: QName, value: String },
    EndElement { name: QName },
    Text { text: String },
    Comment { text: String },
    ProcessingInstruction { target: String, data: String },
    Namespace { prefix: String, uri: String },
}

impl OutputEvent {
    pub fn apply_to(&self, sink: &mut dyn OutputSink) {
        match self {
            OutputEvent::StartElement { name } => sink.start_element(name),
            OutputEvent::Attribute { name, value } => sink.attribute(name, value),
            OutputEvent::EndElement { name } => sink.end_element(name),
            OutputEvent::Text { text } => sink.text(text),
            OutputEvent::Comment { text } => sink.comment(text),
            OutputEvent::ProcessingInstruction { target, data } => {
                sink.processing_instruction(target, data)
            }
            OutputEvent::Namespace { prefix, uri } => sink.namespace(prefix, uri),
        }
    }
}

/// An ordered, replayable log of output events.
///
/// Appended to while content executes into it; afterwards it is tested for
/// emptiness, flattened to text, or replayed in full.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContentBuffer {
    events: Vec<OutputEvent>,
}

impl ContentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<OutputEvent> {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Concatenated text events, ignoring markup, comments and instructions.
    pub fn text_content(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                OutputEvent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn replay_into(&self, sink: &mut dyn OutputSink) {
        for event in &self.events {
            event.apply_to(sink);
        }
    }

    /// The event log as JSON, for diagnostics.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn push(&mut self, event: OutputEvent) {
        self.events.push(event);
    }
}

impl OutputSink for ContentBuffer {
    fn start_element(&mut self, name: &QName) {
        self.push(OutputEvent::StartElement { name: name.clone() });
    }
    fn attribute(&mut self, name: &QName, value: &str) {
        self.push(OutputEvent::Attribute {
            name: name.clone(),
            value: value.to_string(),
        });
    }
    fn end_element(&mut self, name: &QName) {
        self.push(OutputEvent::EndElement { name: name.clone() });
    }
    fn text(&mut self, text: &str) {
        self.push(OutputEvent::Text {
            text: text.to_string(),
        });
    }
    fn comment(&mut self, text: &str) {
        self.push(OutputEvent::Comment {
            text: text.to_string(),
        });
    }
    fn processing_instruction(&mut self, target: &str, data: &str) {
        self.push(OutputEvent::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        });
    }
    fn namespace(&mut self, prefix: &str, uri: &str) {
        self.push(OutputEvent::Namespace {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        });
    }
}

/// A text-only sink: keeps text, drops everything else.
#[derive(Debug, Default)]
pub struct TextCollector {
    text: String,
}

impl TextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl OutputSink for TextCollector {
    fn start_element(&mut self, _name: &QName) {}
    fn attribute(&mut self, _name: &QName, _value: &str) {}
    fn end_element(&mut self, _name: &QName) {}
    fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }
    fn comment(&mut self, _text: &str) {}
    fn processing_instruction(&mut self, _target: &str, _data: &str) {}
    fn namespace(&mut self, _prefix: &str, _uri: &str) {}

    fn supports_structure(&self) -> bool {
        false
    }
}

/// Sends buffered content to `sink`: a full replay when the sink holds
/// markup, otherwise the flattened text as a single text event.
pub fn emit_grounded(buffer: &ContentBuffer, sink: &mut dyn OutputSink) {
    if sink.supports_structure() {
        buffer.replay_into(sink);
    } else {
        let text = buffer.text_content();
        if !text.is_empty() {
            sink.text(&text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContentBuffer {
        let mut buffer = ContentBuffer::new();
        let p = QName::new("p");
        buffer.start_element(&p);
        buffer.attribute(&QName::new("class"), "lead");
        buffer.text("Hello, ");
        buffer.comment("skip me");
        buffer.text("world");
        buffer.end_element(&p);
        buffer
    }

    #[test]
    fn test_text_content_ignores_markup() {
        assert_eq!(sample().text_content(), "Hello, world");
        assert!(ContentBuffer::new().is_empty());
    }

    #[test]
    fn test_replay_is_identical() {
        let buffer = sample();
        let mut copy = ContentBuffer::new();
        buffer.replay_into(&mut copy);
        assert_eq!(copy, buffer);
    }

    #[test]
    fn test_emit_grounded_flattens_for_text_sinks() {
        let mut text = TextCollector::new();
        emit_grounded(&sample(), &mut text);
        assert_eq!(text.as_str(), "Hello, world");

        let mut events = ContentBuffer::new();
        emit_grounded(&sample(), &mut events);
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_forwarding_through_reference() {
        fn write(mut sink: impl OutputSink) -> bool {
            sink.text("via reference");
            sink.supports_structure()
        }

        let mut inner = ContentBuffer::new();
        assert!(write(&mut inner));
        assert!(!write(&mut TextCollector::new()));
        assert_eq!(inner.text_content(), "via reference");
    }

    #[test]
    fn test_events_serialize_to_json() {
        let mut buffer = ContentBuffer::new();
        buffer.namespace("", "");
        buffer.processing_instruction("pi", "data");

        let json: serde_json::Value = serde_json::from_str(&buffer.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["event"], "namespace");
        assert_eq!(json[0]["uri"], "");
        assert_eq!(json[1]["event"], "processing-instruction");
        assert_eq!(json[1]["target"], "pi");
    }
}
