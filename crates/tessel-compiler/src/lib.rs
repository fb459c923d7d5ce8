//! Local graph optimizer for the Tessel IR.
//!
//! The optimizer is organized as a pipeline of passes that run in stages:
//! 1. **Optimization** - Peephole rewrites that rewire uses to cheaper values
//! 2. **Cleanup** - Removal of nodes left without consumers
//!
//! The peephole pass runs its own dead code sweep at the end, so the default
//! pipeline has a single pass.
//!
//! # Example
//!
//! ```
//! use tessel_compiler::optimize;
//! use tessel_core::{DataType, Device, IrGraph, ValueType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = IrGraph::new();
//! let root = graph.root();
//! let x = graph.add_input(root, ValueType::tensor(DataType::F32, Device::Cpu, &[2, 3]))?;
//! let t1 = graph.transpose(x)?;
//! let t2 = graph.transpose(t1)?;
//! graph.register_output(root, t2)?;
//!
//! optimize(&mut graph)?;
//! assert_eq!(graph.block_outputs(root)?, &[x]);
//! assert_eq!(graph.node_count(), 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod passes;

pub use config::PeepholeConfig;
pub use passes::{DeadCodeEliminationPass, PeepholePass, eliminate_dead_code, peephole_optimize};

// Re-export commonly used types from tessel-core
pub use tessel_core::{Error, IrGraph, Pass, Result, Stage};

/// Optimizer pipeline with pluggable passes.
///
/// Passes run in stage order: Optimization then Cleanup. Within a stage,
/// passes run in the order they were registered.
pub struct OptimizerPipeline {
    /// All passes to run, ordered by (stage, registration order) at run time.
    passes: Vec<Box<dyn Pass>>,
}

impl OptimizerPipeline {
    /// Create a pipeline holding a `PeepholePass` with the given configuration.
    pub fn new(config: PeepholeConfig) -> Self {
        let mut pipeline = Self::empty();
        pipeline.add_pass(PeepholePass::with_config(config));
        pipeline
    }

    /// Create a pipeline with no passes.
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a custom pass to the pipeline.
    ///
    /// The pass is slotted into its stage (from `pass.stage()`) when the
    /// pipeline runs.
    ///
    /// # Returns
    ///
    /// Returns a mutable reference to self for method chaining.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Names of the registered passes, in registration order until the first run.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over `graph`, in place.
    ///
    /// # Returns
    ///
    /// Returns `true` if any pass changed the graph.
    ///
    /// # Errors
    ///
    /// Stops at the first failing pass and returns `Error::Pass` naming it.
    #[tracing::instrument(skip_all, fields(num_nodes = graph.node_count(), num_passes = self.passes.len()))]
    pub fn run(&mut self, graph: &mut IrGraph) -> Result<bool> {
        // Stable sort keeps registration order within a stage
        self.passes.sort_by_key(|p| p.stage());

        let mut changed = false;
        for pass in &self.passes {
            let _span =
                tracing::debug_span!("pass", name = pass.name(), stage = ?pass.stage()).entered();
            let pass_changed = pass.run(graph).map_err(|e| Error::Pass {
                name: pass.name().to_string(),
                source: Box::new(e),
            })?;
            tracing::debug!(changed = pass_changed, "pass finished");
            changed |= pass_changed;
        }

        Ok(changed)
    }
}

impl Default for OptimizerPipeline {
    fn default() -> Self {
        Self::new(PeepholeConfig::default())
    }
}

/// Optimize a graph in place with the default pipeline.
///
/// Returns `true` if the graph changed.
pub fn optimize(graph: &mut IrGraph) -> Result<bool> {
    OptimizerPipeline::default().run(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{DataType, Device, ValueType};

    #[test]
    fn test_default_pipeline() {
        let pipeline = OptimizerPipeline::default();
        assert_eq!(pipeline.pass_names(), vec!["peephole"]);
    }

    #[test]
    fn test_passes_sorted_by_stage() {
        let mut pipeline = OptimizerPipeline::empty();
        pipeline
            .add_pass(DeadCodeEliminationPass::new())
            .add_pass(PeepholePass::new());

        let mut graph = IrGraph::new();
        assert!(!pipeline.run(&mut graph).unwrap());
        assert_eq!(pipeline.pass_names(), vec!["peephole", "dead_code_elimination"]);
    }

    #[test]
    fn test_pass_error_is_wrapped() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph
            .add_input(root, ValueType::tensor(DataType::F32, Device::Cpu, &[2]))
            .unwrap();
        let node = graph
            .create_node(tessel_core::OpKind::TypeAs, &[x], 1)
            .unwrap();
        graph.append_node(root, node).unwrap();

        let err = optimize(&mut graph).unwrap_err();
        match err {
            Error::Pass { name, source } => {
                assert_eq!(name, "peephole");
                assert!(matches!(*source, Error::InvariantViolation { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
