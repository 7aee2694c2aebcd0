use nom::bytes::complete::{take_while, take_while_m_n};
use nom::combinator::recognize;
use nom::{IResult, Parser};
use thiserror::Error;

/// Failures raised while executing an instruction tree.
///
/// `Evaluation` and `Dynamic` failures can be intercepted by a try/catch
/// construct; every other kind aborts the transformation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("{message}")]
    Evaluation {
        message: String,
        construct: Option<&'static str>,
    },

    #[error("{code}: {message}")]
    Dynamic {
        code: String,
        message: String,
        value: Option<String>,
        construct: Option<&'static str>,
    },

    #[error("FORX0002: invalid regular expression '{pattern}': {message}")]
    PatternSyntax { pattern: String, message: String },

    #[error("{code}: {message}")]
    Construction { code: &'static str, message: String },

    #[error("cannot read streamed document '{href}': {message}")]
    StreamingSource { href: String, message: String },
}

impl TransformError {
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
            construct: None,
        }
    }

    pub fn dynamic(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dynamic {
            code: code.into(),
            message: message.into(),
            value: None,
            construct: None,
        }
    }

    /// A coded failure carrying the offending value, exposed to catch
    /// handlers as `err:value`.
    pub fn dynamic_with_value(
        code: impl Into<String>,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Dynamic {
            code: code.into(),
            message: message.into(),
            value: Some(value.into()),
            construct: None,
        }
    }

    pub fn pattern_syntax(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PatternSyntax {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn construction(code: &'static str, message: impl Into<String>) -> Self {
        Self::Construction {
            code,
            message: message.into(),
        }
    }

    pub fn streaming_source(href: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamingSource {
            href: href.into(),
            message: message.into(),
        }
    }

    /// Whether a try/catch construct may intercept this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Evaluation { .. } | Self::Dynamic { .. })
    }

    /// The error code carried at the start of the message, if any.
    pub fn error_code(&self) -> Option<String> {
        classify_error_message(&self.to_string()).map(str::to_string)
    }

    /// The attached value of a coded failure.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Dynamic { value, .. } => value.as_deref(),
            _ => None,
        }
    }

    /// Records the construct a failure surfaced through.
    ///
    /// The innermost annotation wins and the message text is never touched.
    pub fn in_construct(mut self, name: &'static str) -> Self {
        match &mut self {
            Self::Evaluation { construct, .. } | Self::Dynamic { construct, .. } => {
                construct.get_or_insert(name);
            }
            _ => {}
        }
        self
    }

    pub fn construct(&self) -> Option<&'static str> {
        match self {
            Self::Evaluation { construct, .. } | Self::Dynamic { construct, .. } => *construct,
            _ => None,
        }
    }
}

/// Letters, digits, then an optional lowercase suffix, e.g. `XTDE0540`.
fn error_code_token(input: &str) -> IResult<&str, &str> {
    recognize((
        take_while_m_n(4, 4, |c: char| c.is_ascii_alphabetic()),
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        take_while(|c: char| c.is_ascii_lowercase()),
    ))
    .parse(input)
}

/// Extracts the error code a failure message starts with.
///
/// The code must be followed by `:` or a space, and that delimiter must sit
/// within the first twelve characters of the message.
pub fn classify_error_message(message: &str) -> Option<&str> {
    let (rest, token) = error_code_token(message).ok()?;
    let delimited = rest.starts_with(':') || rest.starts_with(' ');
    (delimited && token.len() < 12).then_some(token)
}
