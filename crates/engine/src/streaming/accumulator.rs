//! Accumulators: named running values updated by pattern-matched rules as a
//! document streams past.

use super::node::StreamedNode;
use crate::context::{ExecutionContext, VarName};
use crate::error::TransformError;
use crate::expr::Expr;
use crate::pattern::Pattern;
use crate::value::Value;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// When a rule fires relative to the node's descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccumulatorPhase {
    /// On the way down, before the node's content is read.
    Pre,
    /// On the way up, after the node's end.
    Post,
}

/// A (match pattern, phase, new-value expression) triple.
#[derive(Debug)]
pub struct AccumulatorRule {
    pub pattern: Box<dyn Pattern>,
    pub phase: AccumulatorPhase,
    /// Evaluated with the matched node as context item and `$value` bound
    /// to the accumulator's current value.
    pub select: Expr,
}

impl AccumulatorRule {
    pub fn pre(pattern: impl Pattern + 'static, select: Expr) -> Self {
        Self {
            pattern: Box::new(pattern),
            phase: AccumulatorPhase::Pre,
            select,
        }
    }

    pub fn post(pattern: impl Pattern + 'static, select: Expr) -> Self {
        Self {
            pattern: Box::new(pattern),
            phase: AccumulatorPhase::Post,
            select,
        }
    }

    pub fn applies_to(&self, node: &StreamedNode, phase: AccumulatorPhase) -> bool {
        self.phase == phase && self.pattern.matches(node)
    }
}

#[derive(Debug)]
pub struct AccumulatorDefinition {
    pub name: String,
    pub initial_value: Expr,
    pub rules: Vec<Arc<AccumulatorRule>>,
}

impl AccumulatorDefinition {
    pub fn new(name: impl Into<String>, initial_value: Expr) -> Self {
        Self {
            name: name.into(),
            initial_value,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: AccumulatorRule) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Adds a rule that is also referenced from an instruction tree.
    pub fn with_shared_rule(mut self, rule: Arc<AccumulatorRule>) -> Self {
        self.rules.push(rule);
        self
    }

    fn rule_for(&self, node: &StreamedNode, phase: AccumulatorPhase) -> Option<&AccumulatorRule> {
        self.rules
            .iter()
            .map(Arc::as_ref)
            .find(|rule| rule.applies_to(node, phase))
    }
}

/// Current accumulator values, readable by expressions through the context.
#[derive(Debug, Default)]
pub struct AccumulatorState {
    values: HashMap<String, Value>,
    phases: HashMap<String, AccumulatorPhase>,
}

impl AccumulatorState {
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Phase of the rule that last fired; `None` before any rule fired.
    pub fn phase(&self, name: &str) -> Option<AccumulatorPhase> {
        self.phases.get(name).copied()
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    fn initialize(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
        self.phases.remove(name);
    }

    fn update(&mut self, name: &str, value: Value, phase: AccumulatorPhase) {
        self.values.insert(name.to_string(), value);
        self.phases.insert(name.to_string(), phase);
    }
}

pub type AccumulatorHandle = Rc<RefCell<AccumulatorState>>;

/// Applies the declared accumulators' rules at traversal points of one
/// streamed document.
#[derive(Debug, Default)]
pub struct AccumulatorManager {
    state: AccumulatorHandle,
}

impl AccumulatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> AccumulatorHandle {
        Rc::clone(&self.state)
    }

    /// Evaluates every initial value against `ctx`, in declaration order.
    pub fn initialize(&self, ctx: &ExecutionContext) -> Result<(), TransformError> {
        for definition in ctx.static_context().accumulators() {
            let initial = definition.initial_value.evaluate(ctx)?;
            log::trace!("accumulator '{}' starts at '{}'", definition.name, initial);
            self.state.borrow_mut().initialize(&definition.name, initial);
        }
        Ok(())
    }

    /// Fires, for each accumulator, the first rule of `phase` matching
    /// `node`. `ctx` must carry `node` as its context item.
    pub fn apply(
        &self,
        ctx: &ExecutionContext,
        node: &StreamedNode,
        phase: AccumulatorPhase,
    ) -> Result<(), TransformError> {
        for definition in ctx.static_context().accumulators() {
            let Some(rule) = definition.rule_for(node, phase) else {
                continue;
            };
            // Read, evaluate, then write: the rule may itself read accumulators.
            let current = self
                .state
                .borrow()
                .value(&definition.name)
                .cloned()
                .unwrap_or_default();
            let rule_ctx = ctx.with_variable(VarName::local("value"), current);
            let next = rule.select.evaluate(&rule_ctx)?;
            log::trace!(
                "accumulator '{}' {:?} rule -> '{}'",
                definition.name,
                phase,
                next
            );
            self.state.borrow_mut().update(&definition.name, next, phase);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use crate::expr;
    use crate::pattern;
    use crate::streaming::{Attribute, NodeCursor, QName};

    fn add_amount() -> Expr {
        expr::from_fn(|ctx| {
            let current = ctx
                .variable(&VarName::local("value"))
                .and_then(Value::as_integer)
                .unwrap_or(0);
            let amount = expr::attribute("amount").evaluate(ctx)?.as_integer().unwrap_or(0);
            Ok(Value::from(current + amount))
        })
    }

    fn context_with(definitions: Vec<AccumulatorDefinition>) -> ExecutionContext {
        let statics = definitions
            .into_iter()
            .fold(StaticContext::new(), StaticContext::with_accumulator);
        ExecutionContext::new(Arc::new(statics)).unwrap()
    }

    #[test]
    fn test_initialize_and_sum() {
        let ctx = context_with(vec![
            AccumulatorDefinition::new("total", expr::literal(0_i64))
                .with_rule(AccumulatorRule::pre(pattern::parse("item").unwrap(), add_amount())),
        ]);
        let manager = AccumulatorManager::new();
        let ctx = ctx.with_accumulators(Some(manager.handle()));
        manager.initialize(&ctx).unwrap();
        assert_eq!(ctx.accumulator_value("total"), Some(Value::from(0_i64)));
        assert_eq!(ctx.accumulator_phase("total"), None);

        let mut cursor = NodeCursor::new();
        cursor.push_element(QName::new("items"), vec![]);
        for amount in ["10", "25"] {
            let item = cursor.push_element(QName::new("item"), vec![Attribute::new("amount", amount)]);
            manager
                .apply(&ctx.with_item(Arc::clone(&item)), &item, AccumulatorPhase::Pre)
                .unwrap();
            cursor.pop_element();
        }

        assert_eq!(ctx.accumulator_value("total"), Some(Value::from(35_i64)));
        assert_eq!(ctx.accumulator_phase("total"), Some(AccumulatorPhase::Pre));
    }

    #[test]
    fn test_first_matching_rule_per_phase_wins() {
        let ctx = context_with(vec![
            AccumulatorDefinition::new("last", expr::literal("none"))
                .with_rule(AccumulatorRule::pre(pattern::parse("item").unwrap(), expr::literal("item")))
                .with_rule(AccumulatorRule::pre(pattern::parse("*").unwrap(), expr::literal("any")))
                .with_rule(AccumulatorRule::post(pattern::parse("*").unwrap(), expr::literal("closed"))),
        ]);
        let manager = AccumulatorManager::new();
        let ctx = ctx.with_accumulators(Some(manager.handle()));
        manager.initialize(&ctx).unwrap();

        let node = StreamedNode::element(QName::new("item"), vec![], 1, 1);
        manager.apply(&ctx, &node, AccumulatorPhase::Pre).unwrap();
        assert_eq!(ctx.accumulator_value("last"), Some(Value::from("item")));

        manager.apply(&ctx, &node, AccumulatorPhase::Post).unwrap();
        assert_eq!(ctx.accumulator_value("last"), Some(Value::from("closed")));
        assert_eq!(ctx.accumulator_phase("last"), Some(AccumulatorPhase::Post));
    }

    #[test]
    fn test_rule_may_read_other_accumulators() {
        let ctx = context_with(vec![
            AccumulatorDefinition::new("count", expr::literal(0_i64)).with_rule(
                AccumulatorRule::pre(
                    pattern::parse("item").unwrap(),
                    expr::from_fn(|ctx| {
                        let n = ctx.accumulator_value("count").and_then(|v| v.as_integer());
                        Ok(Value::from(n.unwrap_or(0) + 1))
                    }),
                ),
            ),
        ]);
        let manager = AccumulatorManager::new();
        let ctx = ctx.with_accumulators(Some(manager.handle()));
        manager.initialize(&ctx).unwrap();

        let node = StreamedNode::element(QName::new("item"), vec![], 1, 1);
        manager.apply(&ctx, &node, AccumulatorPhase::Pre).unwrap();
        manager.apply(&ctx, &node, AccumulatorPhase::Pre).unwrap();
        assert_eq!(ctx.accumulator_value("count"), Some(Value::from(2_i64)));
    }

    #[test]
    fn test_rule_failure_propagates() {
        let ctx = context_with(vec![
            AccumulatorDefinition::new("bad", expr::empty())
                .with_rule(AccumulatorRule::pre(pattern::parse("*").unwrap(), expr::raise("FOER0000", "no"))),
        ]);
        let manager = AccumulatorManager::new();
        let ctx = ctx.with_accumulators(Some(manager.handle()));
        manager.initialize(&ctx).unwrap();

        let node = StreamedNode::element(QName::new("x"), vec![], 1, 1);
        let err = manager.apply(&ctx, &node, AccumulatorPhase::Pre).unwrap_err();
        assert_eq!(err.error_code().as_deref(), Some("FOER0000"));
    }
}
