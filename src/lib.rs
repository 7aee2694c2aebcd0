//! # sluice
//!
//! Facade over the sluice workspace: a streaming execution engine for
//! compiled XML transformation trees, plus the resource providers that feed
//! it external documents.
//!
//! Most hosts only need [`Transformer`]:
//!
//! ```no_run
//! use sluice::{Body, Instruction, Transformer, expr};
//!
//! let transformer = Transformer::builder()
//!     .with_body(Body::from(Instruction::value_of(expr::literal("hello"))))
//!     .build()?;
//! assert_eq!(transformer.transform_to_text(None)?, "hello");
//! # Ok::<(), sluice::SluiceError>(())
//! ```

pub mod error;
pub mod transformer;

pub use error::SluiceError;
pub use transformer::{Transformer, TransformerBuilder};

pub use sluice_engine::{
    AccumulatorDefinition, AccumulatorPhase, AccumulatorRule, AnalyzeString, Avt, Body,
    CatchClause, ContentBuffer, ErrorInfo, ExecutionContext, Expr, Expression, Instruction, Item,
    OutputEvent, OutputSink, PathPattern, Pattern, StaticContext, StreamOptions, Streamability,
    TextCollector, TransformError, Value, VarName, When, expr, pattern, resolver,
};
pub use sluice_traits::{
    FilesystemResourceProvider, InMemoryResourceProvider, ResourceError, ResourceProvider,
};
