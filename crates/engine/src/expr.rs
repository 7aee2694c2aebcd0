//! The expression-evaluator contract and a handful of reference expressions.
//!
//! The engine never parses expressions. A compiler (or a host) hands it
//! objects implementing [`Expression`]; the small implementations here cover
//! what instruction trees built by hand usually need.

use crate::context::{ExecutionContext, VarName};
use crate::error::TransformError;
use crate::streaming::Streamability;
use crate::value::{Item, Value};
use std::fmt;

pub trait Expression: fmt::Debug + Send + Sync {
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError>;

    fn streamability(&self) -> Streamability {
        Streamability::Full
    }
}

pub type Expr = Box<dyn Expression>;

#[derive(Debug, Clone)]
pub struct Literal(pub Value);

impl Expression for Literal {
    fn evaluate(&self, _ctx: &ExecutionContext) -> Result<Value, TransformError> {
        Ok(self.0.clone())
    }
}

/// `.`
#[derive(Debug, Clone, Copy)]
pub struct ContextItem;

impl Expression for ContextItem {
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError> {
        ctx.item()
            .cloned()
            .map(Value::from)
            .ok_or_else(|| TransformError::dynamic("XPDY0002", "the context item is absent"))
    }
}

/// `$name`
#[derive(Debug, Clone)]
pub struct VariableRef(pub VarName);

impl Expression for VariableRef {
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError> {
        ctx.variable(&self.0).cloned().ok_or_else(|| {
            TransformError::dynamic("XPST0008", format!("variable ${} is not in scope", self.0))
        })
    }
}

/// `regex-group(n)`, or a named group of the active match.
#[derive(Debug, Clone)]
pub enum RegexGroup {
    Index(usize),
    Name(String),
}

impl Expression for RegexGroup {
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError> {
        let text = match (ctx.regex_match(), self) {
            (None, _) => "",
            (Some(m), RegexGroup::Index(i)) => m.group(*i),
            (Some(m), RegexGroup::Name(name)) => m.named_group(name),
        };
        Ok(Value::from(text))
    }
}

/// Current value of a named accumulator.
#[derive(Debug, Clone)]
pub struct AccumulatorRef(pub String);

impl Expression for AccumulatorRef {
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError> {
        ctx.accumulator_value(&self.0).ok_or_else(|| {
            TransformError::dynamic(
                "XTDE3340",
                format!("accumulator '{}' is not applicable here", self.0),
            )
        })
    }
}

/// `@name` of the context node.
#[derive(Debug, Clone)]
pub struct AttributeRef(pub String);

impl Expression for AttributeRef {
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError> {
        match ctx.item() {
            Some(Item::Node(node)) => Ok(node
                .attribute_value(&self.0)
                .map(Value::from)
                .unwrap_or_default()),
            _ => Err(TransformError::dynamic(
                "XPTY0020",
                format!("@{} requires a node as the context item", self.0),
            )),
        }
    }
}

/// Raises a coded dynamic error, like `error(QName(...), 'message')`.
#[derive(Debug, Clone)]
pub struct Raise {
    pub code: String,
    pub message: String,
}

impl Expression for Raise {
    fn evaluate(&self, _ctx: &ExecutionContext) -> Result<Value, TransformError> {
        Err(TransformError::dynamic(self.code.clone(), self.message.clone()))
    }
}

/// Adapts a closure to the evaluator contract.
pub struct FnExpression<F> {
    f: F,
    streamability: Streamability,
}

impl<F> fmt::Debug for FnExpression<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExpression")
            .field("streamability", &self.streamability)
            .finish_non_exhaustive()
    }
}

impl<F> Expression for FnExpression<F>
where
    F: Fn(&ExecutionContext) -> Result<Value, TransformError> + Send + Sync,
{
    fn evaluate(&self, ctx: &ExecutionContext) -> Result<Value, TransformError> {
        (self.f)(ctx)
    }

    fn streamability(&self) -> Streamability {
        self.streamability
    }
}

pub fn literal(value: impl Into<Value>) -> Expr {
    Box::new(Literal(value.into()))
}

pub fn empty() -> Expr {
    Box::new(Literal(Value::empty()))
}

pub fn context_item() -> Expr {
    Box::new(ContextItem)
}

pub fn variable(name: impl Into<VarName>) -> Expr {
    Box::new(VariableRef(name.into()))
}

pub fn regex_group(index: usize) -> Expr {
    Box::new(RegexGroup::Index(index))
}

pub fn named_group(name: impl Into<String>) -> Expr {
    Box::new(RegexGroup::Name(name.into()))
}

pub fn accumulator(name: impl Into<String>) -> Expr {
    Box::new(AccumulatorRef(name.into()))
}

pub fn attribute(name: impl Into<String>) -> Expr {
    Box::new(AttributeRef(name.into()))
}

pub fn raise(code: impl Into<String>, message: impl Into<String>) -> Expr {
    Box::new(Raise {
        code: code.into(),
        message: message.into(),
    })
}

pub fn from_fn<F>(f: F) -> Expr
where
    F: Fn(&ExecutionContext) -> Result<Value, TransformError> + Send + Sync + 'static,
{
    from_fn_with(Streamability::Full, f)
}

/// Like [`from_fn`], reporting the given streaming capability.
pub fn from_fn_with<F>(streamability: Streamability, f: F) -> Expr
where
    F: Fn(&ExecutionContext) -> Result<Value, TransformError> + Send + Sync + 'static,
{
    Box::new(FnExpression { f, streamability })
}

#[derive(Debug)]
pub enum AvtPart {
    Fixed(String),
    Dynamic(Expr),
}

/// An attribute value template: fixed text interleaved with expressions
/// whose string values are spliced in at execution time.
#[derive(Debug)]
pub struct Avt {
    parts: Vec<AvtPart>,
}

impl Avt {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            parts: vec![AvtPart::Fixed(text.into())],
        }
    }

    pub fn dynamic(expr: Expr) -> Self {
        Self {
            parts: vec![AvtPart::Dynamic(expr)],
        }
    }

    pub fn from_parts(parts: Vec<AvtPart>) -> Self {
        Self { parts }
    }

    pub fn evaluate(&self, ctx: &ExecutionContext) -> Result<String, TransformError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                AvtPart::Fixed(text) => out.push_str(text),
                AvtPart::Dynamic(expr) => out.push_str(&expr.evaluate(ctx)?.as_string()),
            }
        }
        Ok(out)
    }

    pub fn streamability(&self) -> Streamability {
        Streamability::weakest(self.parts.iter().map(|part| match part {
            AvtPart::Fixed(_) => Streamability::Full,
            AvtPart::Dynamic(expr) => expr.streamability(),
        }))
    }
}

impl From<&str> for Avt {
    fn from(text: &str) -> Self {
        Avt::fixed(text)
    }
}

impl From<String> for Avt {
    fn from(text: String) -> Self {
        Avt::fixed(text)
    }
}

impl From<Expr> for Avt {
    fn from(expr: Expr) -> Self {
        Avt::dynamic(expr)
    }
}
