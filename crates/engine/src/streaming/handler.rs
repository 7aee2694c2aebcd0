//! The handler that runs a stream body as a sub-document is tokenized.

use super::accumulator::{AccumulatorManager, AccumulatorPhase};
use super::event_model::{Attribute, QName, StreamEventHandler};
use super::node::{NodeCursor, StreamedNode};
use crate::ast::Body;
use crate::context::ExecutionContext;
use crate::error::TransformError;
use crate::output::OutputSink;
use std::sync::Arc;

/// Executes `body` once per element start and once per text node, with the
/// streamed node as context item, firing accumulator rules around each
/// visit.
pub struct BodyStreamHandler<'a> {
    ctx: ExecutionContext,
    body: &'a Body,
    out: &'a mut dyn OutputSink,
    cursor: NodeCursor,
    accumulators: Option<AccumulatorManager>,
    keep_whitespace_text: bool,
    invocations: usize,
}

impl<'a> BodyStreamHandler<'a> {
    /// Builds the sub-document context from `enclosing`. Accumulators are
    /// wired, and their initial values evaluated, only when some are
    /// declared.
    pub fn new(
        enclosing: &ExecutionContext,
        body: &'a Body,
        out: &'a mut dyn OutputSink,
    ) -> Result<Self, TransformError> {
        let cursor = NodeCursor::new();
        let mut ctx = enclosing.for_stream(cursor.document());
        let statics = enclosing.static_context();

        let accumulators = if statics.accumulators().is_empty() {
            None
        } else {
            let manager = AccumulatorManager::new();
            ctx = ctx.with_accumulators(Some(manager.handle()));
            manager.initialize(&ctx)?;
            Some(manager)
        };

        Ok(Self {
            ctx,
            body,
            out,
            cursor,
            accumulators,
            keep_whitespace_text: statics.stream_options().keep_whitespace_text,
            invocations: 0,
        })
    }

    fn fire(&self, node: &Arc<StreamedNode>, phase: AccumulatorPhase) -> Result<(), TransformError> {
        match &self.accumulators {
            Some(manager) => manager.apply(&self.ctx.with_item(Arc::clone(node)), node, phase),
            None => Ok(()),
        }
    }

    /// Attributes never run the body, but rules such as `item/@id` see them
    /// right after their element's pre-descent rules.
    fn fire_attributes(&self, element: &Arc<StreamedNode>) -> Result<(), TransformError> {
        if self.accumulators.is_none() {
            return Ok(());
        }
        for attribute in &element.attributes {
            let node = Arc::new(StreamedNode {
                parent: Some(Arc::clone(element)),
                ..StreamedNode::attribute(attribute.name.clone(), attribute.value.as_str(), element.depth + 1)
            });
            self.fire(&node, AccumulatorPhase::Pre)?;
            self.fire(&node, AccumulatorPhase::Post)?;
        }
        Ok(())
    }

    fn run_body(&mut self, node: &Arc<StreamedNode>) -> Result<(), TransformError> {
        let node_ctx = self.ctx.with_item(Arc::clone(node));
        self.body.execute(&node_ctx, &mut *self.out)?;
        self.invocations += 1;
        Ok(())
    }
}

impl StreamEventHandler for BodyStreamHandler<'_> {
    /// Number of body invocations.
    type Output = usize;
    type Error = TransformError;

    fn start_document(&mut self) -> Result<(), TransformError> {
        let document = self.cursor.document();
        self.fire(&document, AccumulatorPhase::Pre)
    }

    fn end_document(&mut self) -> Result<usize, TransformError> {
        let document = self.cursor.document();
        self.fire(&document, AccumulatorPhase::Post)?;
        Ok(self.invocations)
    }

    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<(), TransformError> {
        let node = self.cursor.push_element(name.clone(), attributes.to_vec());
        log::trace!("stream: <{}> at depth {}", name, node.depth);
        self.fire(&node, AccumulatorPhase::Pre)?;
        self.fire_attributes(&node)?;
        self.run_body(&node)
    }

    fn end_element(&mut self, _name: &QName) -> Result<(), TransformError> {
        match self.cursor.pop_element() {
            Some(node) => self.fire(&node, AccumulatorPhase::Post),
            None => Ok(()),
        }
    }

    fn text(&mut self, content: &str) -> Result<(), TransformError> {
        if !self.keep_whitespace_text && content.trim().is_empty() {
            return Ok(());
        }
        let node = self.cursor.text(content);
        self.fire(&node, AccumulatorPhase::Pre)?;
        self.run_body(&node)?;
        self.fire(&node, AccumulatorPhase::Post)
    }

    fn comment(&mut self, content: &str) -> Result<(), TransformError> {
        self.cursor.comment(content);
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), TransformError> {
        self.cursor.processing_instruction(target, data);
        Ok(())
    }
}
