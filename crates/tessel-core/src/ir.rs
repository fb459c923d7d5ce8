//! Intermediate representation for the optimizer.
//!
//! The IR is a block-structured dataflow graph:
//! - **Nodes** (`IrNode`) are operations (e.g., Expand, Transpose, MatMul)
//! - **Values** (`IrValue`) are the results nodes produce; each has exactly one
//!   definer and a use list naming every consuming input slot
//! - **Blocks** (`IrBlock`) are ordered node lists. The root block belongs to
//!   the graph, nested blocks belong to the node that owns them
//!
//! Every block is bracketed by a `Param` node, whose outputs are the block's
//! inputs, and a `Return` node, whose inputs are the block's outputs. Neither
//! appears in the block's node list.
//!
//! Nodes live in a petgraph `StableGraph` so their ids survive removal of
//! other nodes. Its edges mirror data dependencies (definer -> consumer, one
//! per input slot) and exist for ordering checks only; the per-value use
//! lists are the source of truth for rewiring.

use crate::attribute::AttributeValue;
use crate::types::ValueType;
use crate::{Error, Result};
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Type alias for IR node identifiers (backed by petgraph NodeIndex).
pub type NodeId = NodeIndex;

/// Unique identifier for a value in the IR graph.
///
/// This is an index into the graph's value arena. Value ids are never reused,
/// so a handle stays meaningful even after its definer is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub usize);

impl ValueId {
    /// Create a new value ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Unique identifier for a block in the IR graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl BlockId {
    /// Create a new block ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One consuming input slot of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use {
    /// The consuming node.
    pub user: NodeId,

    /// Index into the consumer's inputs.
    pub offset: usize,
}

// ──────────────────────────────── OpKind ─────────────────────────────────

/// Operation kind of a node.
///
/// Operations the optimizer has rules for get their own variant; everything
/// else is carried as `Other` with its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Defines a block's inputs.
    Param,

    /// Consumes a block's outputs.
    Return,

    /// Broadcast a tensor to the shape in the `size` attribute.
    Expand,

    /// Rank-2 transpose.
    Transpose,

    /// Cast the first input to the type of the second.
    TypeAs,

    /// `input + alpha * other`.
    Add,

    /// Matrix product of two rank-2 tensors.
    MatMul,

    /// `beta * input + alpha * (mat1 @ mat2)`.
    AddMm,

    /// Debug output. The only side-effecting kind.
    Print,

    /// Any operation without a dedicated variant.
    Other(String),
}

impl OpKind {
    /// Name of the operation as printed in graph dumps.
    pub fn as_str(&self) -> &str {
        match self {
            OpKind::Param => "param",
            OpKind::Return => "return",
            OpKind::Expand => "expand",
            OpKind::Transpose => "transpose",
            OpKind::TypeAs => "type_as",
            OpKind::Add => "add",
            OpKind::MatMul => "matmul",
            OpKind::AddMm => "addmm",
            OpKind::Print => "print",
            OpKind::Other(name) => name,
        }
    }

    /// Whether executing the node is observable beyond its outputs.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, OpKind::Print)
    }

    /// Whether this kind marks a block boundary.
    pub fn is_block_boundary(&self) -> bool {
        matches!(self, OpKind::Param | OpKind::Return)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────── IrGraph ────────────────────────────────

/// Intermediate representation graph.
///
/// Owns every node, value and block. Inputs and outputs of nodes can only be
/// changed through the graph, which keeps use lists and dependency edges in
/// sync with node inputs.
#[derive(Debug, Clone)]
pub struct IrGraph {
    /// Node arena; edges are data dependencies labelled with the value.
    graph: StableGraph<IrNode, ValueId>,

    /// Value arena.
    values: Vec<IrValue>,

    /// Block arena.
    blocks: Vec<IrBlock>,

    /// The top-level block.
    root: BlockId,

    /// New nodes are inserted immediately before this node, or appended to
    /// the root block when unset.
    pub(crate) insert_point: Option<NodeId>,
}

impl IrGraph {
    /// Create a new graph with an empty root block.
    pub fn new() -> Self {
        let mut graph = Self {
            graph: StableGraph::new(),
            values: Vec::new(),
            blocks: Vec::new(),
            root: BlockId::new(0),
            insert_point: None,
        };
        graph.root = graph.new_block(None);
        graph
    }

    /// The root block.
    pub fn root(&self) -> BlockId {
        self.root
    }

    // ── Node access ──

    /// Get an immutable reference to a node.
    pub fn node(&self, id: NodeId) -> Result<&IrNode> {
        self.graph
            .node_weight(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {:?} not found", id)))
    }

    /// Get a mutable reference to a node.
    ///
    /// Only attributes can be changed this way; inputs and outputs go through
    /// the graph.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut IrNode> {
        self.graph
            .node_weight_mut(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {:?} not found", id)))
    }

    /// Check whether a node is still part of the graph.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.graph.contains_node(id)
    }

    /// Iterate over all nodes in the graph, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &IrNode)> {
        self.graph
            .node_indices()
            .filter_map(|id| self.graph.node_weight(id).map(|node| (id, node)))
    }

    /// Number of operation nodes, excluding block `Param`/`Return` nodes.
    pub fn node_count(&self) -> usize {
        self.nodes()
            .filter(|(_, node)| !node.kind.is_block_boundary())
            .count()
    }

    // ── Value access ──

    /// Get an immutable reference to a value.
    pub fn value(&self, id: ValueId) -> Result<&IrValue> {
        self.values
            .get(id.index())
            .ok_or_else(|| Error::InvalidGraph(format!("Value {:?} not found", id)))
    }

    fn value_mut(&mut self, id: ValueId) -> Result<&mut IrValue> {
        self.values
            .get_mut(id.index())
            .ok_or_else(|| Error::InvalidGraph(format!("Value {:?} not found", id)))
    }

    /// Total number of values ever created.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Get the type of a value.
    pub fn value_type(&self, id: ValueId) -> Result<&ValueType> {
        Ok(&self.value(id)?.ty)
    }

    /// Set the type of a value.
    pub fn set_value_type(&mut self, id: ValueId, ty: ValueType) -> Result<()> {
        self.value_mut(id)?.ty = ty;
        Ok(())
    }

    /// Attach a debug name to a value.
    pub fn set_value_name(&mut self, id: ValueId, name: impl Into<String>) -> Result<()> {
        self.value_mut(id)?.name = Some(name.into());
        Ok(())
    }

    /// Get the node that defines a value.
    pub fn definer(&self, id: ValueId) -> Result<NodeId> {
        Ok(self.value(id)?.definer)
    }

    /// Get every input slot that consumes a value.
    pub fn uses(&self, id: ValueId) -> Result<&[Use]> {
        Ok(&self.value(id)?.uses)
    }

    /// Check whether a value has any consumer. Unknown ids have none.
    pub fn has_uses(&self, id: ValueId) -> bool {
        self.values
            .get(id.index())
            .is_some_and(|value| !value.uses.is_empty())
    }

    // ── Block access ──

    /// Get an immutable reference to a block.
    pub fn block(&self, id: BlockId) -> Result<&IrBlock> {
        self.blocks
            .get(id.index())
            .ok_or_else(|| Error::InvalidGraph(format!("Block {:?} not found", id)))
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut IrBlock> {
        self.blocks
            .get_mut(id.index())
            .ok_or_else(|| Error::InvalidGraph(format!("Block {:?} not found", id)))
    }

    /// The ordered operation nodes of a block.
    pub fn block_nodes(&self, id: BlockId) -> Result<&[NodeId]> {
        Ok(&self.block(id)?.nodes)
    }

    /// The inputs of a block (outputs of its `Param` node).
    pub fn block_inputs(&self, id: BlockId) -> Result<&[ValueId]> {
        let param = self.block(id)?.param_node;
        Ok(self.node(param)?.outputs())
    }

    /// The outputs of a block (inputs of its `Return` node).
    pub fn block_outputs(&self, id: BlockId) -> Result<&[ValueId]> {
        let ret = self.block(id)?.return_node;
        Ok(self.node(ret)?.inputs())
    }

    fn new_block(&mut self, owner: Option<NodeId>) -> BlockId {
        let id = BlockId::new(self.blocks.len());

        let mut param = IrNode::new(OpKind::Param);
        param.owning_block = Some(id);
        let mut ret = IrNode::new(OpKind::Return);
        ret.owning_block = Some(id);

        let param_node = self.graph.add_node(param);
        let return_node = self.graph.add_node(ret);

        self.blocks.push(IrBlock {
            nodes: Vec::new(),
            param_node,
            return_node,
            owner,
        });
        id
    }

    /// Create a nested block owned by `owner`.
    pub fn add_block(&mut self, owner: NodeId) -> Result<BlockId> {
        if self.node(owner)?.kind.is_block_boundary() {
            return Err(Error::InvalidGraph(format!(
                "Block boundary node {:?} cannot own blocks",
                owner
            )));
        }

        let block = self.new_block(Some(owner));
        self.node_mut(owner)?.blocks.push(block);
        Ok(block)
    }

    /// Add an input to a block and return the new value.
    pub fn add_input(&mut self, block: BlockId, ty: ValueType) -> Result<ValueId> {
        let param = self.block(block)?.param_node;
        self.add_output(param, ty)
    }

    /// Mark a value as an output of a block.
    pub fn register_output(&mut self, block: BlockId, value: ValueId) -> Result<()> {
        let ret = self.block(block)?.return_node;
        self.push_input(ret, value)
    }

    // ── Node construction ──

    /// Create a detached node.
    ///
    /// The node consumes `inputs` and gets `num_outputs` fresh values of
    /// unknown type. It is not part of any block until it is placed with
    /// `append_node`, `insert_before` or `insert_node`.
    pub fn create_node(
        &mut self,
        kind: OpKind,
        inputs: &[ValueId],
        num_outputs: usize,
    ) -> Result<NodeId> {
        for &input in inputs {
            self.ensure_live(input)?;
        }

        let id = self.graph.add_node(IrNode::new(kind));
        for &input in inputs {
            self.push_input(id, input)?;
        }
        for _ in 0..num_outputs {
            self.add_output(id, ValueType::Unknown)?;
        }

        Ok(id)
    }

    /// Append a detached node to the end of a block.
    pub fn append_node(&mut self, block: BlockId, node: NodeId) -> Result<()> {
        self.ensure_detached(node)?;
        self.block_mut(block)?.nodes.push(node);
        self.node_mut(node)?.owning_block = Some(block);
        Ok(())
    }

    /// Insert a detached node immediately before `anchor`, in the anchor's block.
    ///
    /// Inserting before a block's `Return` node appends to the block.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.ensure_detached(node)?;

        let anchor_node = self.node(anchor)?;
        let block_id = anchor_node.owning_block.ok_or_else(|| {
            Error::InvalidGraph(format!("Insertion anchor {:?} is not in a block", anchor))
        })?;

        if anchor_node.kind == OpKind::Param {
            return Err(Error::InvalidGraph(format!(
                "Cannot insert before the param node of block {:?}",
                block_id
            )));
        }
        if anchor_node.kind == OpKind::Return {
            return self.append_node(block_id, node);
        }

        let block = self.block_mut(block_id)?;
        let position = block
            .nodes
            .iter()
            .position(|&n| n == anchor)
            .ok_or_else(|| {
                Error::InvalidGraph(format!(
                    "Node {:?} missing from its block {:?}",
                    anchor, block_id
                ))
            })?;
        block.nodes.insert(position, node);

        self.node_mut(node)?.owning_block = Some(block_id);
        Ok(())
    }

    fn ensure_detached(&self, node: NodeId) -> Result<()> {
        if let Some(block) = self.node(node)?.owning_block {
            return Err(Error::InvalidGraph(format!(
                "Node {:?} is already placed in block {:?}",
                node, block
            )));
        }
        Ok(())
    }

    /// Fails unless the value's definer is still in the graph.
    fn ensure_live(&self, value: ValueId) -> Result<()> {
        let definer = self.definer(value)?;
        if !self.graph.contains_node(definer) {
            return Err(Error::InvalidGraph(format!(
                "Value {:?} is defined by destroyed node {:?}",
                value, definer
            )));
        }
        Ok(())
    }

    fn add_output(&mut self, node: NodeId, ty: ValueType) -> Result<ValueId> {
        let id = ValueId::new(self.values.len());
        let outputs = &mut self.node_mut(node)?.outputs;
        let offset = outputs.len();
        outputs.push(id);

        self.values.push(IrValue {
            name: None,
            ty,
            definer: node,
            offset,
            uses: Vec::new(),
        });
        Ok(id)
    }

    fn push_input(&mut self, user: NodeId, value: ValueId) -> Result<()> {
        self.ensure_live(value)?;
        let inputs = &mut self.node_mut(user)?.inputs;
        let offset = inputs.len();
        inputs.push(value);
        self.link(user, offset, value)
    }

    /// Record `user.inputs[offset] == value` in the use list and edge set.
    fn link(&mut self, user: NodeId, offset: usize, value: ValueId) -> Result<()> {
        let definer = self.definer(value)?;
        self.value_mut(value)?.uses.push(Use { user, offset });
        self.graph.add_edge(definer, user, value);
        Ok(())
    }

    fn dependency_edge(&self, definer: NodeId, user: NodeId, value: ValueId) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(user, Direction::Incoming)
            .find(|edge| edge.source() == definer && *edge.weight() == value)
            .map(|edge| edge.id())
    }

    // ── Graph mutation ──

    /// Make input `offset` of `user` read `value` instead.
    pub fn replace_input(&mut self, user: NodeId, offset: usize, value: ValueId) -> Result<()> {
        let old = *self.node(user)?.inputs.get(offset).ok_or_else(|| {
            Error::InvalidGraph(format!("Node {:?} has no input {}", user, offset))
        })?;
        if old == value {
            return Ok(());
        }
        self.ensure_live(value)?;

        let old_definer = self.definer(old)?;
        self.value_mut(old)?
            .uses
            .retain(|u| !(u.user == user && u.offset == offset));
        if let Some(edge) = self.dependency_edge(old_definer, user, old) {
            self.graph.remove_edge(edge);
        }

        self.node_mut(user)?.inputs[offset] = value;
        self.link(user, offset, value)
    }

    /// Rewire every consumer of `old` to read `new` instead.
    ///
    /// All uses move in one step. The definer of `old` is untouched and may
    /// become dead. Returns the number of rewired input slots.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) -> Result<usize> {
        if old == new {
            return Ok(0);
        }
        self.ensure_live(new)?;

        let old_definer = self.definer(old)?;
        let new_definer = self.definer(new)?;
        let uses = std::mem::take(&mut self.value_mut(old)?.uses);

        for u in &uses {
            if let Some(edge) = self.dependency_edge(old_definer, u.user, old) {
                self.graph.remove_edge(edge);
            }
            self.graph.add_edge(new_definer, u.user, new);
            if let Some(user) = self.graph.node_weight_mut(u.user) {
                user.inputs[u.offset] = new;
            }
        }

        let count = uses.len();
        self.value_mut(new)?.uses.extend(uses);
        tracing::trace!(?old, ?new, count, "replaced all uses");
        Ok(count)
    }

    /// Copy type information (and the debug name, if `to` has none) from one
    /// value to another.
    pub fn copy_metadata(&mut self, from: ValueId, to: ValueId) -> Result<()> {
        let source = self.value(from)?;
        let ty = source.ty.clone();
        let name = source.name.clone();

        let target = self.value_mut(to)?;
        target.ty = ty;
        if target.name.is_none() {
            target.name = name;
        }
        Ok(())
    }

    /// Remove a node whose outputs have no remaining uses.
    ///
    /// Nested blocks owned by the node are removed with it. Block `Param` and
    /// `Return` nodes cannot be destroyed directly.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;

        if node.kind.is_block_boundary() {
            return Err(Error::InvalidGraph(format!(
                "Cannot destroy block boundary node {:?}",
                id
            )));
        }

        if let Some(&used) = node.outputs.iter().find(|&&output| self.has_uses(output)) {
            return Err(Error::InvalidGraph(format!(
                "Cannot destroy node {:?} ({}): output {:?} still has uses",
                id, node.kind, used
            )));
        }

        tracing::trace!(node = ?id, kind = %node.kind, "destroying node");
        self.remove_node_unchecked(id);
        Ok(())
    }

    fn remove_node_unchecked(&mut self, id: NodeId) {
        let Some(node) = self.graph.node_weight(id).cloned() else {
            return;
        };

        for &block in node.blocks.iter().rev() {
            self.remove_block_contents(block);
        }

        for &input in &node.inputs {
            if let Some(value) = self.values.get_mut(input.index()) {
                value.uses.retain(|u| u.user != id);
            }
        }

        if let Some(block) = node.owning_block.and_then(|b| self.blocks.get_mut(b.index())) {
            block.nodes.retain(|&n| n != id);
        }

        if self.insert_point == Some(id) {
            self.insert_point = None;
        }

        // Removes the dependency edges as well
        self.graph.remove_node(id);
    }

    fn remove_block_contents(&mut self, block: BlockId) {
        let Some(contents) = self.blocks.get(block.index()).cloned() else {
            return;
        };

        self.remove_node_unchecked(contents.return_node);
        for &node in contents.nodes.iter().rev() {
            self.remove_node_unchecked(node);
        }
        self.remove_node_unchecked(contents.param_node);
    }

    // ── Graph queries ──

    /// Check structural well-formedness.
    ///
    /// Verifies that every input is defined earlier in the same block or in an
    /// enclosing block, that use lists agree with node inputs, that ownership
    /// back-references are consistent, and that dependencies are acyclic.
    /// Passes never call this implicitly.
    pub fn verify(&self) -> Result<()> {
        self.verify_block(self.root, &HashSet::new())?;

        if is_cyclic_directed(&self.graph) {
            return Err(Error::InvalidGraph(
                "Dependency cycle between nodes".to_string(),
            ));
        }

        Ok(())
    }

    fn verify_block(&self, block_id: BlockId, enclosing: &HashSet<ValueId>) -> Result<()> {
        let block = self.block(block_id)?;
        let mut visible = enclosing.clone();

        let param = self.node(block.param_node)?;
        self.verify_outputs(block.param_node, param)?;
        visible.extend(param.outputs.iter().copied());

        for &node_id in &block.nodes {
            let node = self.node(node_id)?;
            if node.owning_block != Some(block_id) {
                return Err(Error::InvalidGraph(format!(
                    "Node {:?} listed in block {:?} but owned by {:?}",
                    node_id, block_id, node.owning_block
                )));
            }

            self.verify_inputs(node_id, node, &visible)?;

            for &nested in &node.blocks {
                if self.block(nested)?.owner != Some(node_id) {
                    return Err(Error::InvalidGraph(format!(
                        "Block {:?} does not point back to its owner {:?}",
                        nested, node_id
                    )));
                }
                self.verify_block(nested, &visible)?;
            }

            self.verify_outputs(node_id, node)?;
            visible.extend(node.outputs.iter().copied());
        }

        let ret = self.node(block.return_node)?;
        self.verify_inputs(block.return_node, ret, &visible)
    }

    fn verify_inputs(
        &self,
        node_id: NodeId,
        node: &IrNode,
        visible: &HashSet<ValueId>,
    ) -> Result<()> {
        for (offset, &input) in node.inputs.iter().enumerate() {
            if !visible.contains(&input) {
                return Err(Error::InvalidGraph(format!(
                    "Node {:?} ({}) uses value {:?} before it is defined",
                    node_id, node.kind, input
                )));
            }

            let expected = Use {
                user: node_id,
                offset,
            };
            if !self.value(input)?.uses.contains(&expected) {
                return Err(Error::InvalidGraph(format!(
                    "Use list of {:?} is missing input {} of node {:?}",
                    input, offset, node_id
                )));
            }
        }
        Ok(())
    }

    fn verify_outputs(&self, node_id: NodeId, node: &IrNode) -> Result<()> {
        for (offset, &output) in node.outputs.iter().enumerate() {
            let value = self.value(output)?;
            if value.definer != node_id || value.offset != offset {
                return Err(Error::InvalidGraph(format!(
                    "Value {:?} claims definer {:?}:{} but is output {} of {:?}",
                    output, value.definer, value.offset, offset, node_id
                )));
            }

            for u in &value.uses {
                let user = self.node(u.user)?;
                if user.inputs.get(u.offset) != Some(&output) {
                    return Err(Error::InvalidGraph(format!(
                        "Stale use of {:?}: input {} of node {:?}",
                        output, u.offset, u.user
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for IrGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────────────────── IrNode ─────────────────────────────────

/// A node in the IR graph: one operation with ordered inputs and outputs.
#[derive(Debug, Clone)]
pub struct IrNode {
    kind: OpKind,

    /// Static attributes (e.g., `size` for expand, `alpha` for add).
    pub attributes: HashMap<String, AttributeValue>,

    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,

    /// Nested blocks owned by this node.
    blocks: Vec<BlockId>,

    /// The block this node is placed in (`None` while detached).
    owning_block: Option<BlockId>,
}

impl IrNode {
    fn new(kind: OpKind) -> Self {
        Self {
            kind,
            attributes: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            blocks: Vec::new(),
            owning_block: None,
        }
    }

    /// Get the operation kind.
    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    /// Get input value IDs.
    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    /// The input at `offset`, if the node has that many inputs.
    pub fn input(&self, offset: usize) -> Option<ValueId> {
        self.inputs.get(offset).copied()
    }

    /// Get output value IDs.
    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// The output of a single-output node.
    pub fn output(&self) -> Option<ValueId> {
        match self.outputs.as_slice() {
            &[output] => Some(output),
            _ => None,
        }
    }

    /// Nested blocks owned by this node.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// The block this node is placed in.
    pub fn owning_block(&self) -> Option<BlockId> {
        self.owning_block
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Get an attribute.
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Check if an attribute exists.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Get an attribute converted to `T`.
    pub fn attr<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<AttributeValue>,
        T::Error: fmt::Display,
    {
        let value = self
            .attributes
            .get(name)
            .ok_or_else(|| Error::Attribute(format!("Missing attribute '{}'", name)))?;

        T::try_from(value.clone()).map_err(|e| {
            Error::Attribute(format!(
                "Attribute '{}' is not a {}: {}",
                name,
                std::any::type_name::<T>(),
                e
            ))
        })
    }
}

// ──────────────────────────────── IrValue ────────────────────────────────

/// A value: one output of one node.
#[derive(Debug, Clone)]
pub struct IrValue {
    /// Optional debug name. Identity is the `ValueId`, never the name.
    pub name: Option<String>,

    /// Type descriptor.
    pub ty: ValueType,

    definer: NodeId,
    offset: usize,
    uses: Vec<Use>,
}

impl IrValue {
    /// The node that produces this value.
    pub fn definer(&self) -> NodeId {
        self.definer
    }

    /// Index into the definer's outputs.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Every input slot that reads this value.
    pub fn uses(&self) -> &[Use] {
        &self.uses
    }
}

// ──────────────────────────────── IrBlock ────────────────────────────────

/// An ordered scope of nodes.
#[derive(Debug, Clone)]
pub struct IrBlock {
    nodes: Vec<NodeId>,
    param_node: NodeId,
    return_node: NodeId,

    /// Owning node; `None` for the root block. Lookup only.
    owner: Option<NodeId>,
}

impl IrBlock {
    /// Operation nodes in execution order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The node defining the block's inputs.
    pub fn param_node(&self) -> NodeId {
        self.param_node
    }

    /// The node consuming the block's outputs.
    pub fn return_node(&self) -> NodeId {
        self.return_node
    }

    /// The node that owns this block, if nested.
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }
}
