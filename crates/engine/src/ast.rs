//! The instruction tree.
//!
//! A compiler builds this tree once; the executor walks it any number of
//! times. Each node owns its children, and nothing in the tree changes after
//! construction except the regex cache slot inside [`AnalyzeString`].

use crate::context::VarName;
use crate::expr::{Avt, Expr};
use crate::regex_cache::RegexCache;
use crate::streaming::Streamability;
use crate::streaming::accumulator::AccumulatorRule;
use crate::streaming::QName;
use std::sync::Arc;

/// An ordered run of sibling instructions.
#[derive(Debug, Default)]
pub struct Body(pub Vec<Instruction>);

impl Body {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self(instructions)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn streamability(&self) -> Streamability {
        Streamability::weakest(self.0.iter().map(Instruction::streamability))
    }
}

impl From<Vec<Instruction>> for Body {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self(instructions)
    }
}

impl From<Instruction> for Body {
    fn from(instruction: Instruction) -> Self {
        Self(vec![instruction])
    }
}

#[derive(Debug)]
pub struct When {
    pub test: Expr,
    pub body: Body,
}

#[derive(Debug)]
pub struct CatchClause {
    /// Error codes this clause handles; empty catches everything.
    pub errors: Vec<String>,
    pub body: Body,
}

impl CatchClause {
    pub fn any(body: impl Into<Body>) -> Self {
        Self {
            errors: Vec::new(),
            body: body.into(),
        }
    }

    pub fn codes<I, S>(errors: I, body: impl Into<Body>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
            body: body.into(),
        }
    }

    pub fn matches(&self, code: Option<&str>) -> bool {
        self.errors.is_empty()
            || self
                .errors
                .iter()
                .any(|pattern| pattern == "*" || Some(pattern.as_str()) == code)
    }
}

/// `analyze-string`: splits the string value of `select` into matching and
/// non-matching runs of `regex`.
#[derive(Debug)]
pub struct AnalyzeString {
    pub select: Expr,
    pub regex: Avt,
    pub flags: Option<Avt>,
    pub matching: Option<Body>,
    pub non_matching: Option<Body>,
    pub(crate) cache: RegexCache,
}

impl AnalyzeString {
    pub fn new(select: Expr, regex: impl Into<Avt>) -> Self {
        Self {
            select,
            regex: regex.into(),
            flags: None,
            matching: None,
            non_matching: None,
            cache: RegexCache::default(),
        }
    }

    pub fn with_flags(mut self, flags: impl Into<Avt>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    pub fn on_match(mut self, body: impl Into<Body>) -> Self {
        self.matching = Some(body.into());
        self
    }

    pub fn on_non_match(mut self, body: impl Into<Body>) -> Self {
        self.non_matching = Some(body.into());
        self
    }

    pub fn regex_cache(&self) -> &RegexCache {
        &self.cache
    }

    fn streamability(&self) -> Streamability {
        let flags = self.flags.as_ref().map(Avt::streamability);
        Streamability::weakest(
            [
                Some(self.select.streamability()),
                Some(self.regex.streamability()),
                flags,
                self.matching.as_ref().map(Body::streamability),
                self.non_matching.as_ref().map(Body::streamability),
            ]
            .into_iter()
            .flatten(),
        )
    }
}

#[derive(Debug)]
pub enum Instruction {
    Sequence(Body),
    Text(String),
    CharacterReference(char),
    ValueOf {
        select: Expr,
        separator: Option<Avt>,
    },
    /// Binds `name` for the following siblings, from `select` or else from
    /// the text of the grounded body.
    Variable {
        name: VarName,
        select: Option<Expr>,
        body: Body,
    },
    If {
        test: Expr,
        body: Body,
    },
    Choose {
        whens: Vec<When>,
        otherwise: Option<Body>,
    },
    Try {
        body: Body,
        catches: Vec<CatchClause>,
        rollback_output: bool,
    },
    AnalyzeString(Box<AnalyzeString>),
    Comment {
        select: Option<Expr>,
        body: Body,
    },
    ProcessingInstruction {
        name: Avt,
        select: Option<Expr>,
        body: Body,
    },
    Namespace {
        name: Avt,
        select: Option<Expr>,
        body: Body,
    },
    WherePopulated {
        body: Body,
    },
    Stream {
        href: Avt,
        body: Body,
    },
    /// Consumed by the accumulator manager; executing it does nothing.
    AccumulatorRule(Arc<AccumulatorRule>),
    LiteralElement {
        name: QName,
        attributes: Vec<(QName, Avt)>,
        body: Body,
    },
    Attribute {
        name: Avt,
        select: Option<Expr>,
        body: Body,
    },
}

impl Instruction {
    pub fn text(text: impl Into<String>) -> Self {
        Instruction::Text(text.into())
    }

    pub fn value_of(select: Expr) -> Self {
        Instruction::ValueOf {
            select,
            separator: None,
        }
    }

    pub fn element(name: &str, body: impl Into<Body>) -> Self {
        Instruction::LiteralElement {
            name: QName::parse(name),
            attributes: Vec::new(),
            body: body.into(),
        }
    }

    pub fn variable(name: impl Into<VarName>, select: Expr) -> Self {
        Instruction::Variable {
            name: name.into(),
            select: Some(select),
            body: Body::empty(),
        }
    }

    pub fn comment(body: impl Into<Body>) -> Self {
        Instruction::Comment {
            select: None,
            body: body.into(),
        }
    }

    pub fn where_populated(body: impl Into<Body>) -> Self {
        Instruction::WherePopulated { body: body.into() }
    }

    pub fn stream(href: impl Into<Avt>, body: impl Into<Body>) -> Self {
        Instruction::Stream {
            href: href.into(),
            body: body.into(),
        }
    }

    /// Static streaming capability; composites take the weakest of their
    /// parts, and buffering constructs are at least `Grounded`.
    pub fn streamability(&self) -> Streamability {
        match self {
            Instruction::Text(_)
            | Instruction::CharacterReference(_)
            | Instruction::AccumulatorRule(_)
            | Instruction::Stream { .. } => Streamability::Full,

            Instruction::Sequence(body) => body.streamability(),
            Instruction::ValueOf { select, separator } => select
                .streamability()
                .combine(separator.as_ref().map_or(Streamability::Full, Avt::streamability)),
            Instruction::Variable { select, body, .. } => match select {
                Some(select) => select.streamability(),
                None => body.streamability().grounded(),
            },
            Instruction::If { test, body } => test.streamability().combine(body.streamability()),
            Instruction::Choose { whens, otherwise } => Streamability::weakest(
                whens
                    .iter()
                    .flat_map(|w| [w.test.streamability(), w.body.streamability()])
                    .chain(otherwise.as_ref().map(Body::streamability)),
            ),
            Instruction::Try {
                body,
                catches,
                rollback_output,
            } => {
                let inner = Streamability::weakest(
                    std::iter::once(body.streamability())
                        .chain(catches.iter().map(|c| c.body.streamability())),
                );
                if *rollback_output { inner.grounded() } else { inner }
            }
            Instruction::AnalyzeString(analyze) => analyze.streamability(),
            Instruction::Comment { select, body } => grounded_content(select, body),
            Instruction::ProcessingInstruction { name, select, body }
            | Instruction::Namespace { name, select, body } => {
                name.streamability().combine(grounded_content(select, body))
            }
            Instruction::WherePopulated { .. } => Streamability::Grounded,
            Instruction::LiteralElement {
                attributes, body, ..
            } => Streamability::weakest(
                attributes
                    .iter()
                    .map(|(_, avt)| avt.streamability())
                    .chain(std::iter::once(body.streamability())),
            ),
            Instruction::Attribute { name, select, body } => match select {
                Some(select) => name.streamability().combine(select.streamability()),
                None => name.streamability().combine(body.streamability().grounded()),
            },
        }
    }
}

fn grounded_content(select: &Option<Expr>, body: &Body) -> Streamability {
    let content = match select {
        Some(select) => select.streamability(),
        None => body.streamability(),
    };
    content.grounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr;

    fn partial() -> Expr {
        expr::from_fn_with(Streamability::Partial, |_| Ok(crate::value::Value::empty()))
    }

    #[test]
    fn test_leaves_are_full() {
        assert_eq!(Instruction::text("x").streamability(), Streamability::Full);
        assert_eq!(Instruction::CharacterReference('a').streamability(), Streamability::Full);
        assert_eq!(Body::empty().streamability(), Streamability::Full);
    }

    #[test]
    fn test_composites_take_weakest_child() {
        let choose = Instruction::Choose {
            whens: vec![When {
                test: expr::literal(true),
                body: Body::from(Instruction::value_of(partial())),
            }],
            otherwise: Some(Body::from(Instruction::text("no"))),
        };
        assert_eq!(choose.streamability(), Streamability::Partial);

        let seq = Instruction::Sequence(vec![Instruction::text("a"), Instruction::text("b")].into());
        assert_eq!(seq.streamability(), Streamability::Full);
    }

    #[test]
    fn test_buffering_constructs_are_grounded() {
        assert_eq!(
            Instruction::where_populated(Instruction::text("x")).streamability(),
            Streamability::Grounded
        );
        assert_eq!(
            Instruction::comment(Instruction::text("x")).streamability(),
            Streamability::Grounded
        );
        // A weaker child still wins over grounding.
        assert_eq!(
            Instruction::comment(Instruction::value_of(partial())).streamability(),
            Streamability::Partial
        );

        let try_rollback = Instruction::Try {
            body: Body::from(Instruction::text("x")),
            catches: vec![],
            rollback_output: true,
        };
        assert_eq!(try_rollback.streamability(), Streamability::Grounded);
    }

    #[test]
    fn test_stream_is_full_regardless_of_body() {
        let stream = Instruction::stream("in.xml", Instruction::value_of(partial()));
        assert_eq!(stream.streamability(), Streamability::Full);
    }

    #[test]
    fn test_catch_clause_matching() {
        let specific = CatchClause::codes(["XTDE0540"], Body::empty());
        assert!(specific.matches(Some("XTDE0540")));
        assert!(!specific.matches(Some("FOER0000")));
        assert!(!specific.matches(None));

        assert!(CatchClause::any(Body::empty()).matches(None));
        assert!(CatchClause::codes(["*"], Body::empty()).matches(None));
    }
}
