//! Optimization passes over the Tessel IR.

mod dead_code_elimination;
mod peephole;

pub use dead_code_elimination::{DeadCodeEliminationPass, eliminate_dead_code};
pub use peephole::{PeepholePass, peephole_optimize};
