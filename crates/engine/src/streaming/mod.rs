pub mod accumulator;
pub mod analysis;
pub mod event_model;
pub mod handler;
pub mod node;
pub mod tokenizer;

pub use accumulator::{
    AccumulatorDefinition, AccumulatorManager, AccumulatorPhase, AccumulatorRule,
    AccumulatorState,
};
pub use analysis::Streamability;
pub use event_model::{Attribute, QName, StreamEvent, StreamEventHandler, drive_events};
pub use handler::BodyStreamHandler;
pub use node::{NodeCursor, StreamedNode, StreamedNodeKind};
pub use tokenizer::XmlTokenizer;
