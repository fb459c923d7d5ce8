//! Optimization pass trait and stage definitions.

use crate::Result;
use crate::ir::IrGraph;

/// Pipeline stage for organizing passes.
///
/// Passes are grouped into stages and run in a fixed order. Within each stage,
/// passes run in the order they were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Local rewrites that replace nodes with cheaper equivalents.
    ///
    /// Passes in this stage rewire uses and may insert nodes, but leave the
    /// replaced nodes in place.
    Optimization,

    /// Removal of nodes left without consumers by earlier stages.
    Cleanup,
}

/// Trait for implementing graph passes.
///
/// A pass is a graph transformation that runs during a specific stage.
///
/// # Return Value
///
/// The `run()` method returns `Ok(true)` if the pass made changes to the
/// graph, or `Ok(false)` if no changes were made.
///
/// # Example
///
/// ```ignore
/// struct DeadCodeEliminationPass;
///
/// impl Pass for DeadCodeEliminationPass {
///     fn name(&self) -> &str {
///         "dead_code_elimination"
///     }
///
///     fn stage(&self) -> Stage {
///         Stage::Cleanup
///     }
///
///     fn run(&self, graph: &mut IrGraph) -> Result<bool> {
///         let root = graph.root();
///         let removed = eliminate_dead_code(graph, root)?;
///         Ok(removed > 0)
///     }
/// }
/// ```
pub trait Pass: Send + Sync {
    /// Get the pass name (used for logging and error reports).
    fn name(&self) -> &str;

    /// Get the stage this pass belongs to.
    fn stage(&self) -> Stage;

    /// Run the pass on the given graph.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the pass made changes to the graph.
    /// * `Ok(false)` if no changes were made.
    /// * `Err(_)` if the pass found the graph violating an invariant.
    fn run(&self, graph: &mut IrGraph) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoOpPass;

    impl Pass for NoOpPass {
        fn name(&self) -> &str {
            "noop"
        }

        fn stage(&self) -> Stage {
            Stage::Optimization
        }

        fn run(&self, _graph: &mut IrGraph) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_pass_trait() {
        let pass: Box<dyn Pass> = Box::new(NoOpPass);
        assert_eq!(pass.name(), "noop");
        assert_eq!(pass.stage(), Stage::Optimization);

        let mut graph = IrGraph::new();
        assert!(!pass.run(&mut graph).unwrap());
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Optimization < Stage::Cleanup);
    }
}
