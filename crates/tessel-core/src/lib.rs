//! Core intermediate representation for the Tessel graph optimizer.
//!
//! This crate provides the foundational abstractions the optimizer builds on:
//! - Arena-backed IR with nested blocks (`IrGraph`, `IrNode`, `IrValue`, `IrBlock`)
//! - Scoped node construction (`InsertPointGuard` and the builder methods)
//! - The `Pass` trait and pipeline stages
//! - Value types and static node attributes

pub mod attribute;
pub mod display;
pub mod ir;
pub mod ir_builder;
pub mod pass;
pub mod types;

// Re-export commonly used types
pub use attribute::AttributeValue;
pub use ir::{BlockId, IrBlock, IrGraph, IrNode, IrValue, NodeId, OpKind, Use, ValueId};
pub use ir_builder::InsertPointGuard;
pub use pass::{Pass, Stage};
pub use types::{DataType, Device, Dimension, TensorShape, TensorType, ValueType};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tessel-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Attribute error: {0}")]
    Attribute(String),

    /// The graph is malformed in a way no rewrite can recover from.
    #[error("Invariant violated at node {node:?}: {message}")]
    InvariantViolation { node: NodeId, message: String },

    #[error("Pass '{name}' failed: {source}")]
    Pass {
        name: String,
        #[source]
        source: Box<Error>,
    },
}
