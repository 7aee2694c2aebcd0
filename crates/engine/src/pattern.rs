//! Match patterns for accumulator rules.
//!
//! A pattern is tested against a single streamed node, walking up the
//! node's ancestor chain for multi-step paths, so it never needs anything
//! that has not been read yet.

use crate::error::TransformError;
use crate::streaming::{StreamedNode, StreamedNodeKind};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::multispace0;
use nom::combinator::{map, opt, recognize, value};
use nom::multi::{separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};
use std::fmt;

/// The rule-selection contract: does this node match?
pub trait Pattern: fmt::Debug + Send + Sync {
    fn matches(&self, node: &StreamedNode) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    /// `prefix:local`, `local`, `prefix:*` or `*`.
    Name {
        prefix: Option<String>,
        local: Option<String>,
    },
    Text,
    Comment,
    ProcessingInstruction,
    AnyNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchAxis {
    Child,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MatchStep {
    axis: MatchAxis,
    node_test: NodeTest,
}

/// A single location path within a pattern, e.g. `/orders/order`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPathPattern {
    is_absolute: bool,
    steps: Vec<MatchStep>,
}

/// A compiled match pattern: a union of location paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    paths: Vec<LocationPathPattern>,
    original_text: String,
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original_text)
    }
}

impl Pattern for PathPattern {
    fn matches(&self, node: &StreamedNode) -> bool {
        self.paths.iter().any(|path| path.matches(node))
    }
}

impl LocationPathPattern {
    fn matches(&self, node: &StreamedNode) -> bool {
        if self.is_absolute && self.steps.is_empty() {
            return node.is_document();
        }

        let mut current = Some(node);
        for step in self.steps.iter().rev() {
            match current {
                Some(n) if step.matches(n) => current = n.parent().map(|p| p.as_ref()),
                _ => return false,
            }
        }

        if self.is_absolute {
            current.is_some_and(StreamedNode::is_document)
        } else {
            true
        }
    }
}

impl MatchStep {
    fn matches(&self, node: &StreamedNode) -> bool {
        let kind_ok = match self.axis {
            MatchAxis::Attribute => node.kind == StreamedNodeKind::Attribute,
            MatchAxis::Child => !matches!(
                node.kind,
                StreamedNodeKind::Attribute | StreamedNodeKind::Document
            ),
        };
        if !kind_ok {
            return false;
        }

        match &self.node_test {
            NodeTest::Name { prefix, local } => {
                let principal = match self.axis {
                    MatchAxis::Child => StreamedNodeKind::Element,
                    MatchAxis::Attribute => StreamedNodeKind::Attribute,
                };
                let Some(name) = node.name.as_ref().filter(|_| node.kind == principal) else {
                    return false;
                };
                let prefix_ok = prefix.is_none() || prefix == &name.prefix;
                let local_ok = local.as_ref().is_none_or(|l| l == &name.local_name);
                prefix_ok && local_ok
            }
            NodeTest::Text => node.kind == StreamedNodeKind::Text,
            NodeTest::Comment => node.kind == StreamedNodeKind::Comment,
            NodeTest::ProcessingInstruction => {
                node.kind == StreamedNodeKind::ProcessingInstruction
            }
            NodeTest::AnyNode => true,
        }
    }
}

/// Compiles a pattern such as `item`, `order/item`, `/`, `text()`, `@id`
/// or `a|b`.
pub fn parse(text: &str) -> Result<PathPattern, TransformError> {
    match pattern_parser(text.trim()) {
        Ok(("", paths)) => Ok(PathPattern {
            paths,
            original_text: text.to_string(),
        }),
        Ok((rest, _)) => Err(TransformError::construction(
            "XTSE0340",
            format!("invalid pattern '{}': unexpected '{}'", text, rest),
        )),
        Err(e) => Err(TransformError::construction(
            "XTSE0340",
            format!("invalid pattern '{}': {}", text, e),
        )),
    }
}

fn ncname(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')),
    ))
    .parse(input)
}

fn kind_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        value(NodeTest::Text, tag("text()")),
        value(NodeTest::Comment, tag("comment()")),
        value(NodeTest::ProcessingInstruction, tag("processing-instruction()")),
        value(NodeTest::AnyNode, tag("node()")),
    ))
    .parse(input)
}

fn local_or_wildcard(input: &str) -> IResult<&str, Option<String>> {
    alt((
        value(None, tag("*")),
        map(ncname, |local: &str| Some(local.to_string())),
    ))
    .parse(input)
}

fn name_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(
            pair(terminated(ncname, tag(":")), local_or_wildcard),
            |(prefix, local)| NodeTest::Name {
                prefix: Some(prefix.to_string()),
                local,
            },
        ),
        map(local_or_wildcard, |local| NodeTest::Name {
            prefix: None,
            local,
        }),
    ))
    .parse(input)
}

fn step_parser(input: &str) -> IResult<&str, MatchStep> {
    alt((
        map(preceded(tag("@"), name_test), |node_test| MatchStep {
            axis: MatchAxis::Attribute,
            node_test,
        }),
        map(alt((kind_test, name_test)), |node_test| MatchStep {
            axis: MatchAxis::Child,
            node_test,
        }),
    ))
    .parse(input)
}

fn path_parser(input: &str) -> IResult<&str, LocationPathPattern> {
    let (rest, root) = opt(tag::<_, _, nom::error::Error<&str>>("/")).parse(input)?;
    let is_absolute = root.is_some();

    let (rest, steps) = if is_absolute {
        separated_list0(tag("/"), step_parser).parse(rest)?
    } else {
        separated_list1(tag("/"), step_parser).parse(rest)?
    };

    Ok((rest, LocationPathPattern { is_absolute, steps }))
}

fn pattern_parser(input: &str) -> IResult<&str, Vec<LocationPathPattern>> {
    separated_list1(delimited(multispace0, tag("|"), multispace0), path_parser).parse(input)
}
