use serde::Serialize;
use std::fmt;

/// A possibly prefixed XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub local_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,
}

impl QName {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_name: local_name.into(),
            namespace_uri: None,
        }
    }

    pub fn with_namespace(
        prefix: Option<String>,
        local_name: impl Into<String>,
        namespace_uri: Option<String>,
    ) -> Self {
        Self {
            prefix,
            local_name: local_name.into(),
            namespace_uri,
        }
    }

    /// Splits a lexical `prefix:local` name.
    pub fn parse(lexical: &str) -> Self {
        match lexical.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => {
                Self::with_namespace(Some(prefix.to_string()), local, None)
            }
            _ => Self::new(lexical),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: QName::parse(&name.into()),
            value: value.into(),
        }
    }
}

/// Structural events delivered by a streaming tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    StartDocument,
    EndDocument,
    StartElement {
        name: QName,
        attributes: Vec<Attribute>,
    },
    EndElement {
        name: QName,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

impl StreamEvent {
    pub fn start(name: &str, attributes: Vec<Attribute>) -> Self {
        StreamEvent::StartElement {
            name: QName::parse(name),
            attributes,
        }
    }

    pub fn end(name: &str) -> Self {
        StreamEvent::EndElement {
            name: QName::parse(name),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        StreamEvent::Text(content.into())
    }

    pub fn is_start_element(&self) -> bool {
        matches!(self, StreamEvent::StartElement { .. })
    }

    pub fn is_end_element(&self) -> bool {
        matches!(self, StreamEvent::EndElement { .. })
    }

    pub fn element_name(&self) -> Option<&QName> {
        match self {
            StreamEvent::StartElement { name, .. } => Some(name),
            StreamEvent::EndElement { name } => Some(name),
            _ => None,
        }
    }
}

/// Receives structural events from a streaming tokenizer, in document order.
pub trait StreamEventHandler {
    type Output;
    type Error;

    fn start_document(&mut self) -> Result<(), Self::Error>;
    fn end_document(&mut self) -> Result<Self::Output, Self::Error>;

    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<(), Self::Error>;
    fn end_element(&mut self, name: &QName) -> Result<(), Self::Error>;

    fn text(&mut self, content: &str) -> Result<(), Self::Error>;
    fn comment(&mut self, content: &str) -> Result<(), Self::Error>;
    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), Self::Error>;
}

/// Feeds an already tokenized event sequence to a handler.
pub fn drive_events<H, I>(handler: &mut H, events: I) -> Result<H::Output, H::Error>
where
    H: StreamEventHandler,
    I: IntoIterator<Item = StreamEvent>,
{
    let mut output = None;
    for event in events {
        match event {
            StreamEvent::StartDocument => handler.start_document()?,
            StreamEvent::EndDocument => output = Some(handler.end_document()?),
            StreamEvent::StartElement { name, attributes } => {
                handler.start_element(&name, &attributes)?
            }
            StreamEvent::EndElement { name } => handler.end_element(&name)?,
            StreamEvent::Text(content) => handler.text(&content)?,
            StreamEvent::Comment(content) => handler.comment(&content)?,
            StreamEvent::ProcessingInstruction { target, data } => {
                handler.processing_instruction(&target, &data)?
            }
        }
    }
    match output {
        Some(output) => Ok(output),
        None => handler.end_document(),
    }
}
