//! # sluice-engine
//!
//! Execution engine for a streaming, XSLT-style transformation language.
//!
//! The engine interprets an instruction tree built by a compiler (or by hand)
//! and writes output events to an [`OutputSink`]. While doing so it decides,
//! per construct, whether it can pass events straight through or must buffer
//! a subtree first; every construct reports that decision statically through
//! [`Instruction::streamability`].
//!
//! ## Features
//!
//! - **Conditionals**: `If` and `Choose` with first-true-guard dispatch
//! - **Error recovery**: `Try` with ordered catch clauses, code matching and
//!   optional output rollback
//! - **Text splitting**: `AnalyzeString` with a per-node compiled-regex cache
//! - **Grounding**: `WherePopulated`, comments, processing instructions and
//!   namespaces buffer their content before emitting
//! - **Streaming**: `Stream` re-enters a tokenizer over an external document
//!   and runs its body incrementally, with accumulators updated as nodes pass
//!
//! ## Collaborators
//!
//! Expressions and match patterns are traits ([`Expression`], [`Pattern`]);
//! the [`expr`] and [`pattern`] modules ship small reference implementations.
//! External documents are read through [`sluice_traits::ResourceProvider`].
//!
//! ## Modules
//!
//! - [`ast`]: the instruction tree and its streamability classification
//! - [`executor`]: instruction execution and the grounding helper
//! - [`context`]: execution context, scopes and static configuration
//! - [`output`]: sinks and the replayable content buffer
//! - [`streaming`]: tokenizer, streamed nodes, accumulators
//! - [`error`]: the error type and error-code classification

pub mod ast;
pub mod context;
pub mod error;
pub mod executor;
pub mod expr;
pub mod output;
pub mod pattern;
pub mod regex_cache;
pub mod resolver;
pub mod streaming;
pub mod value;

mod executor_handlers;

pub use ast::{AnalyzeString, Body, CatchClause, Instruction, When};
pub use context::{ExecutionContext, RegexMatch, StaticContext, StreamOptions, VarName};
pub use error::{TransformError, classify_error_message};
pub use executor::{ground, transform};
pub use executor_handlers::control_flow::ErrorInfo;
pub use executor_handlers::markup::{sanitize_comment, sanitize_pi_data};
pub use expr::{Avt, Expr, Expression};
pub use output::{ContentBuffer, OutputEvent, OutputSink, TextCollector, emit_grounded};
pub use pattern::{PathPattern, Pattern};
pub use resolver::{BaseUriResolver, PassThroughResolver, UriResolver};
pub use streaming::{AccumulatorDefinition, AccumulatorPhase, AccumulatorRule, Streamability};
pub use value::{Item, Value};


#[cfg(any(test, feature = "testing"))]
pub mod test_helpers {
    use crate::ast::Body;
    use crate::context::StaticContext;
    use crate::error::TransformError;
    use crate::executor::transform;
    use crate::output::ContentBuffer;
    use crate::value::Item;
    use std::sync::Arc;

    pub fn run_body(body: &Body) -> Result<ContentBuffer, TransformError> {
        run_with(body, StaticContext::new(), None)
    }

    pub fn run_with(
        body: &Body,
        statics: StaticContext,
        item: Option<Item>,
    ) -> Result<ContentBuffer, TransformError> {
        let mut out = ContentBuffer::new();
        transform(body, Arc::new(statics), item, &mut out)?;
        Ok(out)
    }

    pub fn run_text(body: &Body) -> Result<String, TransformError> {
        run_body(body).map(|buffer| buffer.text_content())
    }
}
