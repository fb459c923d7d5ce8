//! Dead code elimination.
//!
//! Backward sweep over a block that destroys nodes nobody reads. Nested
//! blocks are cleaned before the node that owns them is considered.

use tessel_core::{BlockId, IrGraph, NodeId, Pass, Result, Stage};

/// Remove every dead node from `block` and the blocks nested inside it.
///
/// A node is dead when none of its outputs has a use, it has no side effects,
/// and none of its nested blocks contains a side-effecting node. Block
/// parameters and returns are never removed. Nodes are visited in reverse
/// order so a chain of dead nodes disappears in a single sweep.
///
/// Returns the number of nodes removed.
pub fn eliminate_dead_code(graph: &mut IrGraph, block: BlockId) -> Result<usize> {
    let mut removed = 0;
    let nodes = graph.block_nodes(block)?.to_vec();

    for node_id in nodes.into_iter().rev() {
        let nested = graph.node(node_id)?.blocks().to_vec();
        for inner in nested {
            removed += eliminate_dead_code(graph, inner)?;
        }

        if is_dead(graph, node_id)? {
            graph.destroy_node(node_id)?;
            removed += 1;
        }
    }

    Ok(removed)
}

fn is_dead(graph: &IrGraph, node_id: NodeId) -> Result<bool> {
    let node = graph.node(node_id)?;

    if node.kind().is_block_boundary() {
        return Ok(false);
    }

    if node.outputs().iter().any(|&output| graph.has_uses(output)) {
        return Ok(false);
    }

    Ok(!has_side_effects(graph, node_id)?)
}

fn has_side_effects(graph: &IrGraph, node_id: NodeId) -> Result<bool> {
    let node = graph.node(node_id)?;
    if node.kind().has_side_effects() {
        return Ok(true);
    }

    for &block in node.blocks() {
        for &inner in graph.block_nodes(block)? {
            if has_side_effects(graph, inner)? {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Pass that runs dead code elimination over the whole graph.
pub struct DeadCodeEliminationPass;

impl DeadCodeEliminationPass {
    /// Create a new dead code elimination pass.
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for DeadCodeEliminationPass {
    fn name(&self) -> &str {
        "dead_code_elimination"
    }

    fn stage(&self) -> Stage {
        Stage::Cleanup
    }

    fn run(&self, graph: &mut IrGraph) -> Result<bool> {
        let root = graph.root();
        let removed = eliminate_dead_code(graph, root)?;
        tracing::debug!(removed, remaining = graph.node_count(), "dead code eliminated");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{DataType, Device, OpKind, ValueType};

    fn f32_tensor(dims: &[usize]) -> ValueType {
        ValueType::tensor(DataType::F32, Device::Cpu, dims)
    }

    #[test]
    fn test_removes_dead_chain_in_one_sweep() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 3])).unwrap();

        let t1 = graph.transpose(x).unwrap();
        let t2 = graph.transpose(t1).unwrap();
        graph.expand(t2, &[2, 3]).unwrap();

        let removed = eliminate_dead_code(&mut graph, root).unwrap();
        assert_eq!(removed, 3);
        assert!(graph.block_nodes(root).unwrap().is_empty());
        assert!(!graph.has_uses(x));
        graph.verify().unwrap();
    }

    #[test]
    fn test_keeps_outputs_and_side_effects() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();

        let returned = graph.transpose(x).unwrap();
        graph.register_output(root, returned).unwrap();
        let printed = graph.transpose(x).unwrap();
        let print = graph.print(printed).unwrap();
        let dead = graph.transpose(x).unwrap();
        let dead_node = graph.definer(dead).unwrap();

        let removed = eliminate_dead_code(&mut graph, root).unwrap();
        assert_eq!(removed, 1);
        assert!(!graph.contains_node(dead_node));
        assert!(graph.contains_node(print));
        assert!(graph.contains_node(graph.definer(returned).unwrap()));
        assert!(graph.contains_node(graph.definer(printed).unwrap()));
    }

    #[test]
    fn test_nested_blocks() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();

        // Owner whose body prints: kept, but the dead transpose inside goes
        let kept = graph
            .create_node(OpKind::Other("loop".to_string()), &[], 0)
            .unwrap();
        graph.append_node(root, kept).unwrap();
        let kept_body = graph.add_block(kept).unwrap();
        {
            let mut guard = graph.append_to(kept_body).unwrap();
            guard.transpose(x).unwrap();
            guard.print(x).unwrap();
        }

        // Owner with a pure body: removed with everything inside it
        let pure = graph
            .create_node(OpKind::Other("loop".to_string()), &[], 0)
            .unwrap();
        graph.append_node(root, pure).unwrap();
        let pure_body = graph.add_block(pure).unwrap();
        {
            let mut guard = graph.append_to(pure_body).unwrap();
            let t = guard.transpose(x).unwrap();
            guard.register_output(pure_body, t).unwrap();
        }

        let removed = eliminate_dead_code(&mut graph, root).unwrap();
        assert_eq!(removed, 2);
        assert!(graph.contains_node(kept));
        assert!(!graph.contains_node(pure));
        assert_eq!(graph.block_nodes(kept_body).unwrap().len(), 1);
        assert_eq!(graph.block_nodes(root).unwrap(), &[kept]);
        graph.verify().unwrap();
    }

    #[test]
    fn test_pass_reports_changes() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();
        graph.transpose(x).unwrap();

        let pass = DeadCodeEliminationPass::new();
        assert_eq!(pass.name(), "dead_code_elimination");
        assert_eq!(pass.stage(), Stage::Cleanup);
        assert!(pass.run(&mut graph).unwrap());
        assert!(!pass.run(&mut graph).unwrap());
    }
}
