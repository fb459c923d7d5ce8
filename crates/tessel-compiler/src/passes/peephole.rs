//! Peephole optimization pass.
//!
//! Forward walk over every block that matches single nodes (and their
//! immediate producers) against a fixed set of local rewrites:
//!
//! - `expand(x, size)` where `x` already has shape `size` becomes `x`
//! - `transpose(transpose(x))` becomes `x`
//! - `type_as(x, y)` where `x` and `y` share dtype and device becomes `x`
//! - `add(x, matmul(a, b))` with unit alpha becomes `addmm(x, a, b)`
//!
//! Rewrites only move uses. Nodes left without consumers are cleaned up by a
//! single dead code elimination sweep at the end.

use crate::config::PeepholeConfig;
use crate::passes::eliminate_dead_code;
use tessel_core::{
    AttributeValue, BlockId, Error, IrGraph, NodeId, OpKind, Pass, Result, Stage,
};

/// Pass that applies the peephole rewrites to the whole graph.
///
/// Each block is walked over a snapshot of its node list, so nodes created by
/// a rewrite are never matched in the same run. A node's nested blocks are
/// optimized before the node itself.
pub struct PeepholePass {
    config: PeepholeConfig,
}

impl PeepholePass {
    /// Create a pass with every rule enabled.
    pub fn new() -> Self {
        Self::with_config(PeepholeConfig::default())
    }

    /// Create a pass with a custom rule selection.
    pub fn with_config(config: PeepholeConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &PeepholeConfig {
        &self.config
    }

    fn optimize_block(&self, graph: &mut IrGraph, block: BlockId) -> Result<bool> {
        let mut changed = false;
        let nodes = graph.block_nodes(block)?.to_vec();

        for node_id in nodes {
            let nested = graph.node(node_id)?.blocks().to_vec();
            for inner in nested {
                changed |= self.optimize_block(graph, inner)?;
            }

            changed |= self.rewrite_node(graph, node_id)?;
        }

        Ok(changed)
    }

    fn rewrite_node(&self, graph: &mut IrGraph, node_id: NodeId) -> Result<bool> {
        let kind = graph.node(node_id)?.kind().clone();
        match kind {
            OpKind::Expand if self.config.eliminate_expand => {
                eliminate_redundant_expand(graph, node_id)
            }
            OpKind::Transpose if self.config.cancel_transposes => {
                cancel_double_transpose(graph, node_id)
            }
            OpKind::TypeAs if self.config.elide_type_as => elide_redundant_type_as(graph, node_id),
            OpKind::Add if self.config.fuse_addmm => fuse_addmm(graph, node_id),
            _ => Ok(false),
        }
    }
}

impl Default for PeepholePass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for PeepholePass {
    fn name(&self) -> &str {
        "peephole"
    }

    fn stage(&self) -> Stage {
        Stage::Optimization
    }

    #[tracing::instrument(skip_all, fields(num_nodes = graph.node_count()))]
    fn run(&self, graph: &mut IrGraph) -> Result<bool> {
        let root = graph.root();
        let mut changed = self.optimize_block(graph, root)?;

        if self.config.run_dce {
            let removed = eliminate_dead_code(graph, root)?;
            tracing::debug!(removed, remaining = graph.node_count(), "dead code eliminated");
            changed |= removed > 0;
        }

        Ok(changed)
    }
}

/// Run the default peephole pass over `graph`.
///
/// Returns `Ok(true)` if any rewrite fired or any node was removed.
pub fn peephole_optimize(graph: &mut IrGraph) -> Result<bool> {
    PeepholePass::new().run(graph)
}

/// `expand(x, size)` is a no-op when `x` is statically shaped to `size`.
fn eliminate_redundant_expand(graph: &mut IrGraph, node_id: NodeId) -> Result<bool> {
    let node = graph.node(node_id)?;
    let (&[input], Some(output)) = (node.inputs(), node.output()) else {
        return Ok(false);
    };
    if !graph.has_uses(output) {
        return Ok(false);
    }

    let Ok(size) = node.attr::<Vec<i64>>("size") else {
        tracing::trace!(node = ?node_id, "expand without integer size");
        return Ok(false);
    };

    let already_sized = graph
        .value_type(input)?
        .as_tensor()
        .and_then(|tensor| tensor.shape.as_static())
        .is_some_and(|dims| same_dims(dims, &size));
    if !already_sized {
        tracing::trace!(node = ?node_id, ?size, "expand changes or may change shape");
        return Ok(false);
    }

    let rewired = graph.replace_all_uses_with(output, input)?;
    tracing::debug!(node = ?node_id, rewired, "removed redundant expand");
    Ok(true)
}

fn same_dims(dims: &[usize], size: &[i64]) -> bool {
    dims.len() == size.len()
        && dims
            .iter()
            .zip(size)
            .all(|(&dim, &requested)| usize::try_from(requested) == Ok(dim))
}

/// `transpose(transpose(x))` is `x`. The inner transpose keeps any other users.
fn cancel_double_transpose(graph: &mut IrGraph, node_id: NodeId) -> Result<bool> {
    let node = graph.node(node_id)?;
    let (&[input], Some(output)) = (node.inputs(), node.output()) else {
        return Ok(false);
    };
    if !graph.has_uses(output) {
        return Ok(false);
    }

    let inner_id = graph.definer(input)?;
    let inner = graph.node(inner_id)?;
    if inner.kind() != &OpKind::Transpose {
        return Ok(false);
    }
    let &[original] = inner.inputs() else {
        return Ok(false);
    };

    let rewired = graph.replace_all_uses_with(output, original)?;
    tracing::debug!(node = ?node_id, inner = ?inner_id, rewired, "cancelled double transpose");
    Ok(true)
}

/// `type_as(x, y)` is `x` when both tensors already agree on dtype and device.
///
/// A `type_as` node always has exactly two inputs; anything else means the
/// graph is corrupt and is reported as an invariant violation.
fn elide_redundant_type_as(graph: &mut IrGraph, node_id: NodeId) -> Result<bool> {
    let node = graph.node(node_id)?;
    let &[input, other] = node.inputs() else {
        return Err(Error::InvariantViolation {
            node: node_id,
            message: format!("type_as expects 2 inputs, found {}", node.inputs().len()),
        });
    };
    let Some(output) = node.output() else {
        return Ok(false);
    };
    if !graph.has_uses(output) {
        return Ok(false);
    }

    let same_type = match (
        graph.value_type(input)?.as_tensor(),
        graph.value_type(other)?.as_tensor(),
    ) {
        (Some(lhs), Some(rhs)) => lhs.dtype == rhs.dtype && lhs.device == rhs.device,
        _ => false,
    };
    if !same_type {
        tracing::trace!(node = ?node_id, "type_as converts");
        return Ok(false);
    }

    let rewired = graph.replace_all_uses_with(output, input)?;
    tracing::debug!(node = ?node_id, rewired, "elided redundant type_as");
    Ok(true)
}

/// `add(x, matmul(a, b), alpha=1)` becomes `addmm(x, a, b)`.
///
/// The fused node is inserted right before the add and takes over the add
/// output's type and name.
fn fuse_addmm(graph: &mut IrGraph, add_id: NodeId) -> Result<bool> {
    let node = graph.node(add_id)?;
    let (&[input, product], Some(output)) = (node.inputs(), node.output()) else {
        return Ok(false);
    };

    let unit_alpha = node
        .get_attribute("alpha")
        .and_then(AttributeValue::as_scalar)
        == Some(1.0);
    if !unit_alpha {
        tracing::trace!(node = ?add_id, alpha = ?node.get_attribute("alpha"), "add is not unit alpha");
        return Ok(false);
    }
    if !graph.has_uses(output) {
        return Ok(false);
    }

    let matmul_id = graph.definer(product)?;
    let matmul = graph.node(matmul_id)?;
    if matmul.kind() != &OpKind::MatMul {
        return Ok(false);
    }
    let &[mat1, mat2] = matmul.inputs() else {
        return Ok(false);
    };

    let fused = {
        let mut builder = graph.with_insert_point(add_id);
        builder.addmm(input, mat1, mat2)?
    };
    graph.copy_metadata(output, fused)?;
    let rewired = graph.replace_all_uses_with(output, fused)?;

    tracing::debug!(node = ?add_id, matmul = ?matmul_id, rewired, "fused add and matmul into addmm");
    Ok(true)
}
