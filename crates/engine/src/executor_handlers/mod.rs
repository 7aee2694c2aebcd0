//! Runtime handlers, one module per family of instructions.

pub(crate) mod analyze_string;
pub(crate) mod control_flow;
pub(crate) mod literals;
pub(crate) mod markup;
pub(crate) mod streaming_instructions;
pub(crate) mod variables;
