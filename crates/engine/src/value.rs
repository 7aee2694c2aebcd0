//! Values produced by expressions and bound to variables.

use crate::error::TransformError;
use crate::streaming::StreamedNode;
use std::fmt;
use std::sync::Arc;

/// A single item of a value sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(Arc<StreamedNode>),
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
}

impl Item {
    pub fn string_value(&self) -> String {
        match self {
            Item::Node(node) => node.string_value(),
            Item::String(s) => s.clone(),
            Item::Integer(n) => n.to_string(),
            Item::Double(d) => format_double(*d),
            Item::Boolean(b) => b.to_string(),
        }
    }

    pub fn as_node(&self) -> Option<&Arc<StreamedNode>> {
        match self {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF" } else { "-INF" }.to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        d.to_string()
    }
}

impl From<Arc<StreamedNode>> for Item {
    fn from(node: Arc<StreamedNode>) -> Self {
        Item::Node(node)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::String(s.to_string())
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::String(s)
    }
}

impl From<i64> for Item {
    fn from(n: i64) -> Self {
        Item::Integer(n)
    }
}

impl From<f64> for Item {
    fn from(d: f64) -> Self {
        Item::Double(d)
    }
}

impl From<bool> for Item {
    fn from(b: bool) -> Self {
        Item::Boolean(b)
    }
}

/// An ordered sequence of items; a single item is a sequence of length one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Value(Vec<Item>);

impl Value {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        Self(items)
    }

    pub fn single(item: impl Into<Item>) -> Self {
        Self(vec![item.into()])
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn into_items(self) -> Vec<Item> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first(&self) -> Option<&Item> {
        self.0.first()
    }

    /// String values of all items joined by `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(Item::string_value)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// String value with items separated by single spaces.
    pub fn as_string(&self) -> String {
        self.join(" ")
    }

    /// The single integer this value holds, if it holds exactly one number
    /// without a fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self.0.as_slice() {
            [Item::Integer(n)] => Some(*n),
            [Item::Double(d)] if d.fract() == 0.0 => Some(*d as i64),
            [Item::String(s)] => s.trim().parse().ok(),
            [Item::Node(node)] => node.string_value().trim().parse().ok(),
            _ => None,
        }
    }

    /// Effective boolean value, used for guards.
    pub fn effective_boolean(&self) -> Result<bool, TransformError> {
        match self.0.as_slice() {
            [] => Ok(false),
            [Item::Node(_), ..] => Ok(true),
            [Item::Boolean(b)] => Ok(*b),
            [Item::String(s)] => Ok(!s.is_empty()),
            [Item::Integer(n)] => Ok(*n != 0),
            [Item::Double(d)] => Ok(*d != 0.0 && !d.is_nan()),
            _ => Err(TransformError::dynamic(
                "FORG0006",
                format!(
                    "effective boolean value is not defined for a sequence of {} atomic values",
                    self.0.len()
                ),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

macro_rules! value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(item: $ty) -> Self {
                    Value::single(item)
                }
            }
        )*
    };
}

value_from!(Item, Arc<StreamedNode>, &str, String, i64, f64, bool);

impl FromIterator<Item> for Value {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Value(iter.into_iter().collect())
    }
}
