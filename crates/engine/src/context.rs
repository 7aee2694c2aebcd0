//! Execution context and the static metadata it refers to.
//!
//! An [`ExecutionContext`] is never mutated once a caller can see it. Every
//! derivation (new context item, new variable scope, new regex match) builds
//! a fresh context that shares the rest of its state with the parent, so a
//! child execution can never leak bindings back to its caller.

use crate::error::TransformError;
use crate::expr::Expr;
use crate::resolver::{PassThroughResolver, UriResolver};
use crate::streaming::accumulator::{AccumulatorDefinition, AccumulatorHandle, AccumulatorPhase};
use crate::streaming::StreamedNode;
use crate::value::{Item, Value};
use regex::{Captures, Regex};
use serde::Deserialize;
use sluice_traits::ResourceProvider;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Namespace of the variables bound inside a catch handler.
pub const ERR_NAMESPACE: &str = "http://www.w3.org/2005/xqt-errors";

/// An expanded variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarName {
    pub namespace: Option<String>,
    pub local: String,
}

impl VarName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// A name in the error namespace, e.g. `err:code`.
    pub fn err(local: impl Into<String>) -> Self {
        Self::qualified(ERR_NAMESPACE, local)
    }
}

impl From<&str> for VarName {
    fn from(local: &str) -> Self {
        Self::local(local)
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Tuning for streamed sub-documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Run the stream body for text events that contain only whitespace.
    pub keep_whitespace_text: bool,
    /// Initial capacity of the tokenizer's event buffer, in bytes.
    pub read_buffer_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            keep_whitespace_text: false,
            read_buffer_capacity: 8 * 1024,
        }
    }
}

impl StreamOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug)]
pub struct GlobalVariable {
    pub name: VarName,
    pub select: Expr,
}

/// Metadata shared by every context of one transformation.
#[derive(Debug)]
pub struct StaticContext {
    base_uri: Option<String>,
    accumulators: Vec<AccumulatorDefinition>,
    global_variables: Vec<GlobalVariable>,
    resource_provider: Option<Arc<dyn ResourceProvider>>,
    uri_resolver: Arc<dyn UriResolver>,
    stream_options: StreamOptions,
}

impl Default for StaticContext {
    fn default() -> Self {
        Self {
            base_uri: None,
            accumulators: Vec::new(),
            global_variables: Vec::new(),
            resource_provider: None,
            uri_resolver: Arc::new(PassThroughResolver),
            stream_options: StreamOptions::default(),
        }
    }
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn with_accumulator(mut self, definition: AccumulatorDefinition) -> Self {
        self.accumulators.push(definition);
        self
    }

    /// Declares a global variable; declarations are evaluated in order, so a
    /// later one may refer to an earlier one.
    pub fn with_global_variable(mut self, name: impl Into<VarName>, select: Expr) -> Self {
        self.global_variables.push(GlobalVariable {
            name: name.into(),
            select,
        });
        self
    }

    pub fn with_resource_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.resource_provider = Some(provider);
        self
    }

    pub fn with_uri_resolver(mut self, resolver: Arc<dyn UriResolver>) -> Self {
        self.uri_resolver = resolver;
        self
    }

    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.stream_options = options;
        self
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    pub fn accumulators(&self) -> &[AccumulatorDefinition] {
        &self.accumulators
    }

    pub fn global_variables(&self) -> &[GlobalVariable] {
        &self.global_variables
    }

    pub fn resource_provider(&self) -> Option<&Arc<dyn ResourceProvider>> {
        self.resource_provider.as_ref()
    }

    pub fn uri_resolver(&self) -> &dyn UriResolver {
        self.uri_resolver.as_ref()
    }

    pub fn stream_options(&self) -> &StreamOptions {
        &self.stream_options
    }
}

/// The state of one regex match made by analyze-string.
#[derive(Debug, Clone, PartialEq)]
pub struct RegexMatch {
    /// Group 0 is the whole match.
    groups: Vec<Option<String>>,
    names: HashMap<String, usize>,
}

impl RegexMatch {
    pub fn from_captures(captures: &Captures<'_>, regex: &Regex) -> Self {
        let groups = captures
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let names = regex
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| name.map(|n| (n.to_string(), i)))
            .collect();
        Self { groups, names }
    }

    pub fn text(&self) -> &str {
        self.group(0)
    }

    /// The text of a capture group; groups that did not participate, and
    /// groups that do not exist, yield an empty string.
    pub fn group(&self, index: usize) -> &str {
        self.groups
            .get(index)
            .and_then(|g| g.as_deref())
            .unwrap_or("")
    }

    pub fn named_group(&self, name: &str) -> &str {
        self.names.get(name).map(|&i| self.group(i)).unwrap_or("")
    }

    pub fn group_count(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }
}

#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<VarName, Value>,
    parent: Option<Rc<Scope>>,
}

/// The dynamic state an instruction executes against.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    item: Option<Item>,
    scope: Rc<Scope>,
    regex_match: Option<Rc<RegexMatch>>,
    accumulators: Option<AccumulatorHandle>,
    static_context: Arc<StaticContext>,
}

impl ExecutionContext {
    /// Creates the top-level context, binding the global variables.
    pub fn new(static_context: Arc<StaticContext>) -> Result<Self, TransformError> {
        let mut ctx = Self {
            item: None,
            scope: Rc::new(Scope::default()),
            regex_match: None,
            accumulators: None,
            static_context: Arc::clone(&static_context),
        };
        for global in static_context.global_variables() {
            let value = global.select.evaluate(&ctx)?;
            ctx = ctx.with_variable(global.name.clone(), value);
        }
        Ok(ctx)
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn regex_match(&self) -> Option<&RegexMatch> {
        self.regex_match.as_deref()
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_context
    }

    pub fn with_item(&self, item: impl Into<Item>) -> Self {
        Self {
            item: Some(item.into()),
            ..self.clone()
        }
    }

    pub fn with_regex_match(&self, regex_match: Option<RegexMatch>) -> Self {
        Self {
            regex_match: regex_match.map(Rc::new),
            ..self.clone()
        }
    }

    pub fn with_accumulators(&self, accumulators: Option<AccumulatorHandle>) -> Self {
        Self {
            accumulators,
            ..self.clone()
        }
    }

    /// Pushes one scope holding all of `bindings`.
    pub fn with_bindings<I>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (VarName, Value)>,
    {
        let scope = Scope {
            bindings: bindings.into_iter().collect(),
            parent: Some(Rc::clone(&self.scope)),
        };
        Self {
            scope: Rc::new(scope),
            ..self.clone()
        }
    }

    pub fn push_scope(&self) -> Self {
        self.with_bindings(std::iter::empty())
    }

    pub fn with_variable(&self, name: impl Into<VarName>, value: Value) -> Self {
        self.with_bindings([(name.into(), value)])
    }

    /// Looks a variable up, innermost scope first.
    pub fn variable(&self, name: &VarName) -> Option<&Value> {
        let mut scope: &Scope = &self.scope;
        loop {
            if let Some(value) = scope.bindings.get(name) {
                return Some(value);
            }
            scope = scope.parent.as_deref()?;
        }
    }

    /// Number of scopes on the chain, including the root scope.
    pub fn scope_depth(&self) -> usize {
        std::iter::successors(Some(&*self.scope), |s| s.parent.as_deref()).count()
    }

    /// The context a streamed sub-document's body runs against: the
    /// enclosing scopes stay visible under a fresh empty scope, the item is
    /// the document node and no regex match is active.
    pub fn for_stream(&self, document: Arc<StreamedNode>) -> Self {
        Self {
            item: Some(Item::Node(document)),
            regex_match: None,
            accumulators: None,
            ..self.push_scope()
        }
    }

    /// Current value of a named accumulator, if one is being tracked.
    pub fn accumulator_value(&self, name: &str) -> Option<Value> {
        self.accumulators
            .as_ref()
            .and_then(|state| state.borrow().value(name).cloned())
    }

    /// Phase of the rule that last updated a named accumulator.
    pub fn accumulator_phase(&self, name: &str) -> Option<AccumulatorPhase> {
        self.accumulators
            .as_ref()
            .and_then(|state| state.borrow().phase(name))
    }
}
