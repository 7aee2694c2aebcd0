//! Instruction execution.
//!
//! [`Instruction::execute`] dispatches to the handlers in
//! `executor_handlers`; composites recurse into their children with derived
//! contexts and leaves write to the sink.
//!
//! # Grounding
//!
//! A construct that must see its whole content before emitting anything
//! runs that content into a [`ContentBuffer`] via [`ground`], inspects it, and
//! then replays, discards or flattens it. Every buffering construct goes
//! through this one helper.

use crate::ast::{Body, Instruction};
use crate::context::{ExecutionContext, StaticContext};
use crate::error::TransformError;
use crate::executor_handlers::{
    analyze_string, control_flow, literals, markup, streaming_instructions, variables,
};
use crate::expr::Expr;
use crate::output::{ContentBuffer, OutputSink, TextCollector};
use crate::value::Item;
use std::sync::Arc;

impl Instruction {
    pub fn execute(
        &self,
        ctx: &ExecutionContext,
        out: &mut dyn OutputSink,
    ) -> Result<(), TransformError> {
        match self {
            Instruction::Sequence(body) => body.execute(ctx, out),
            Instruction::Text(text) => literals::handle_text(text, out),
            Instruction::CharacterReference(c) => literals::handle_character_reference(*c, out),
            Instruction::ValueOf { select, separator } => {
                literals::handle_value_of(select, separator.as_ref(), ctx, out)
            }
            Instruction::Variable { name, select, body } => {
                // Outside a body there are no following siblings to bind for.
                variables::evaluate_variable(name, select.as_ref(), body, ctx).map(drop)
            }
            Instruction::If { test, body } => control_flow::handle_if(test, body, ctx, out),
            Instruction::Choose { whens, otherwise } => {
                control_flow::handle_choose(whens, otherwise.as_ref(), ctx, out)
            }
            Instruction::Try {
                body,
                catches,
                rollback_output,
            } => control_flow::handle_try(body, catches, *rollback_output, ctx, out),
            Instruction::AnalyzeString(analyze) => {
                analyze_string::handle_analyze_string(analyze, ctx, out)
            }
            Instruction::Comment { select, body } => {
                markup::handle_comment(select.as_ref(), body, ctx, out)
            }
            Instruction::ProcessingInstruction { name, select, body } => {
                markup::handle_processing_instruction(name, select.as_ref(), body, ctx, out)
            }
            Instruction::Namespace { name, select, body } => {
                markup::handle_namespace(name, select.as_ref(), body, ctx, out)
            }
            Instruction::WherePopulated { body } => markup::handle_where_populated(body, ctx, out),
            Instruction::Stream { href, body } => {
                streaming_instructions::handle_stream(href, body, ctx, out)
            }
            Instruction::AccumulatorRule(_) => {
                log::warn!("accumulator rule executed directly; rules only fire while streaming");
                Ok(())
            }
            Instruction::LiteralElement {
                name,
                attributes,
                body,
            } => literals::handle_literal_element(name, attributes, body, ctx, out),
            Instruction::Attribute { name, select, body } => {
                literals::handle_attribute(name, select.as_ref(), body, ctx, out)
            }
        }
    }
}

impl Body {
    /// Executes the instructions in order. A variable binding is visible to
    /// the siblings that follow it, and to nothing else.
    pub fn execute(
        &self,
        ctx: &ExecutionContext,
        out: &mut dyn OutputSink,
    ) -> Result<(), TransformError> {
        let mut scoped: Option<ExecutionContext> = None;
        for instruction in &self.0 {
            let current = scoped.as_ref().unwrap_or(ctx);
            match instruction {
                Instruction::Variable { name, select, body } => {
                    let value = variables::evaluate_variable(name, select.as_ref(), body, current)?;
                    scoped = Some(current.with_variable(name.clone(), value));
                }
                _ => instruction.execute(current, out)?,
            }
        }
        Ok(())
    }
}

/// Runs `body` into a fresh buffer and returns the buffer.
pub fn ground(body: &Body, ctx: &ExecutionContext) -> Result<ContentBuffer, TransformError> {
    let mut buffer = ContentBuffer::new();
    body.execute(ctx, &mut buffer)?;
    Ok(buffer)
}

/// The text a content-taking construct works with: the string value of
/// `select` when present, otherwise the text produced by `body`.
pub(crate) fn content_text(
    select: Option<&Expr>,
    body: &Body,
    ctx: &ExecutionContext,
) -> Result<String, TransformError> {
    match select {
        Some(select) => Ok(select.evaluate(ctx)?.as_string()),
        None => {
            let mut collector = TextCollector::new();
            body.execute(ctx, &mut collector)?;
            Ok(collector.into_text())
        }
    }
}

/// Executes a root body against a new top-level context.
pub fn transform(
    body: &Body,
    static_context: Arc<StaticContext>,
    item: Option<Item>,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let ctx = ExecutionContext::new(static_context)?;
    let ctx = match item {
        Some(item) => ctx.with_item(item),
        None => ctx,
    };
    log::debug!(
        "executing {} top-level instruction(s), capability {}",
        body.instructions().len(),
        body.streamability()
    );
    body.execute(&ctx, out)
}
