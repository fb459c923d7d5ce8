//! Build IR nodes at a scoped insertion point.
//!
//! Every constructor here creates one node, places it at the graph's active
//! insertion point and returns its output. Without an insertion point nodes
//! are appended to the root block. Output types start as `ValueType::Unknown`;
//! the caller records or copies types afterwards.

use crate::attribute::AttributeValue;
use crate::ir::{BlockId, IrGraph, NodeId, OpKind, ValueId};
use crate::{Error, Result};
use std::ops::{Deref, DerefMut};

/// Scoped insertion point.
///
/// Dereferences to the graph. While alive, new nodes are inserted
/// immediately before the anchor node; dropping the guard restores the
/// previous insertion point.
pub struct InsertPointGuard<'a> {
    graph: &'a mut IrGraph,
    previous: Option<NodeId>,
}

impl Deref for InsertPointGuard<'_> {
    type Target = IrGraph;

    fn deref(&self) -> &IrGraph {
        self.graph
    }
}

impl DerefMut for InsertPointGuard<'_> {
    fn deref_mut(&mut self) -> &mut IrGraph {
        self.graph
    }
}

impl Drop for InsertPointGuard<'_> {
    fn drop(&mut self) {
        self.graph.insert_point = self.previous;
    }
}

impl IrGraph {
    /// The node new nodes are currently inserted before, if any.
    pub fn insert_point(&self) -> Option<NodeId> {
        self.insert_point
    }

    /// Insert new nodes immediately before `anchor` until the guard drops.
    pub fn with_insert_point(&mut self, anchor: NodeId) -> InsertPointGuard<'_> {
        let previous = self.insert_point.replace(anchor);
        InsertPointGuard {
            graph: self,
            previous,
        }
    }

    /// Append new nodes to the end of `block` until the guard drops.
    pub fn append_to(&mut self, block: BlockId) -> Result<InsertPointGuard<'_>> {
        let anchor = self.block(block)?.return_node();
        Ok(self.with_insert_point(anchor))
    }

    /// Place a detached node at the active insertion point.
    pub fn insert_node(&mut self, node: NodeId) -> Result<()> {
        match self.insert_point {
            Some(anchor) => self.insert_before(anchor, node),
            None => self.append_node(self.root(), node),
        }
    }

    /// Create a single-output node at the insertion point and return its output.
    pub fn emit(
        &mut self,
        kind: OpKind,
        inputs: &[ValueId],
        attributes: &[(&str, AttributeValue)],
    ) -> Result<ValueId> {
        let node = self.create_node(kind, inputs, 1)?;

        let ir_node = self.node_mut(node)?;
        for (key, value) in attributes {
            ir_node.set_attribute(*key, value.clone());
        }

        self.insert_node(node)?;
        self.node(node)?.output().ok_or_else(|| {
            Error::InvalidGraph(format!("Node {:?} should have one output", node))
        })
    }

    /// `input` broadcast to `size`.
    pub fn expand(&mut self, input: ValueId, size: &[i64]) -> Result<ValueId> {
        self.emit(
            OpKind::Expand,
            &[input],
            &[("size", AttributeValue::Ints(size.to_vec()))],
        )
    }

    /// Rank-2 transpose of `input`.
    pub fn transpose(&mut self, input: ValueId) -> Result<ValueId> {
        self.emit(OpKind::Transpose, &[input], &[])
    }

    /// `input` cast to the element type and device of `other`.
    pub fn type_as(&mut self, input: ValueId, other: ValueId) -> Result<ValueId> {
        self.emit(OpKind::TypeAs, &[input, other], &[])
    }

    /// `input + alpha * other`.
    pub fn add(&mut self, input: ValueId, other: ValueId, alpha: f64) -> Result<ValueId> {
        self.emit(
            OpKind::Add,
            &[input, other],
            &[("alpha", AttributeValue::Float(alpha))],
        )
    }

    /// `lhs @ rhs`.
    pub fn matmul(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.emit(OpKind::MatMul, &[lhs, rhs], &[])
    }

    /// Fused `input + mat1 @ mat2`, with unit `beta` and `alpha`.
    pub fn addmm(&mut self, input: ValueId, mat1: ValueId, mat2: ValueId) -> Result<ValueId> {
        self.emit(
            OpKind::AddMm,
            &[input, mat1, mat2],
            &[
                ("beta", AttributeValue::Float(1.0)),
                ("alpha", AttributeValue::Float(1.0)),
            ],
        )
    }

    /// Side-effecting print of `input`. Has no outputs.
    pub fn print(&mut self, input: ValueId) -> Result<NodeId> {
        let node = self.create_node(OpKind::Print, &[input], 0)?;
        self.insert_node(node)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::AttributeValue;
    use crate::ir::{IrGraph, OpKind};
    use crate::types::{DataType, Device, ValueType};

    fn f32_tensor(dims: &[usize]) -> ValueType {
        ValueType::tensor(DataType::F32, Device::Cpu, dims)
    }

    #[test]
    fn test_builders_append_to_root() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 3])).unwrap();

        let t = graph.transpose(x).unwrap();
        let e = graph.expand(t, &[3, 2]).unwrap();
        let p = graph.print(e).unwrap();

        let nodes = graph.block_nodes(root).unwrap().to_vec();
        assert_eq!(nodes.len(), 3);
        assert_eq!(graph.definer(t).unwrap(), nodes[0]);
        assert_eq!(graph.definer(e).unwrap(), nodes[1]);
        assert_eq!(nodes[2], p);

        let expand = graph.node(nodes[1]).unwrap();
        assert_eq!(expand.kind(), &OpKind::Expand);
        assert_eq!(expand.attr::<Vec<i64>>("size").unwrap(), vec![3, 2]);
        assert!(graph.node(p).unwrap().outputs().is_empty());
        graph.verify().unwrap();
    }

    #[test]
    fn test_insert_point_guard_restores() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let a = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();
        let b = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();

        let product = graph.matmul(a, b).unwrap();
        let sum = graph.add(a, product, 1.0).unwrap();
        let add_node = graph.definer(sum).unwrap();
        assert_eq!(graph.insert_point(), None);

        let fused = {
            let mut guard = graph.with_insert_point(add_node);
            assert_eq!(guard.insert_point(), Some(add_node));
            guard.addmm(a, a, b).unwrap()
        };
        assert_eq!(graph.insert_point(), None);

        let nodes = graph.block_nodes(root).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], graph.definer(fused).unwrap());
        assert_eq!(nodes[2], add_node);

        let addmm = graph.node(graph.definer(fused).unwrap()).unwrap();
        assert_eq!(addmm.inputs(), &[a, a, b]);
        assert_eq!(addmm.get_attribute("alpha"), Some(&AttributeValue::Float(1.0)));
        assert_eq!(addmm.get_attribute("beta"), Some(&AttributeValue::Float(1.0)));
        graph.verify().unwrap();
    }

    #[test]
    fn test_nested_guards() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();
        let t = graph.transpose(x).unwrap();
        let anchor = graph.definer(t).unwrap();

        let mut outer = graph.with_insert_point(anchor);
        {
            let ret = outer.block(root).unwrap().return_node();
            let inner = outer.with_insert_point(ret);
            assert_eq!(inner.insert_point(), Some(ret));
        }
        assert_eq!(outer.insert_point(), Some(anchor));
        drop(outer);
        assert_eq!(graph.insert_point(), None);
    }

    #[test]
    fn test_append_to_nested_block() {
        let mut graph = IrGraph::new();
        let root = graph.root();
        let x = graph.add_input(root, f32_tensor(&[2, 2])).unwrap();

        let owner = graph
            .create_node(OpKind::Other("loop".to_string()), &[], 0)
            .unwrap();
        graph.append_node(root, owner).unwrap();
        let body = graph.add_block(owner).unwrap();

        let inner = {
            let mut guard = graph.append_to(body).unwrap();
            guard.transpose(x).unwrap()
        };

        assert_eq!(graph.block_nodes(root).unwrap(), &[owner]);
        assert_eq!(
            graph.block_nodes(body).unwrap(),
            &[graph.definer(inner).unwrap()]
        );
        graph.verify().unwrap();
    }
}
