//! Textual and Graphviz renderings of an `IrGraph`.
//!
//! The text form lists one node per line in block order:
//!
//! ```text
//! graph(%x : f32[2, 3]@cpu) {
//!   %1 : f32[3, 2]@cpu = transpose(%x)
//!   %2 : ? = expand[size=[3, 2]](%1)
//!   return(%2)
//! }
//! ```

use crate::ir::{BlockId, IrGraph, IrNode, NodeId, ValueId};
use std::fmt::{self, Write};

impl IrGraph {
    /// Printable name of a value: its debug name, or its index.
    pub fn value_label(&self, id: ValueId) -> String {
        match self.value(id).ok().and_then(|v| v.name.as_deref()) {
            Some(name) => format!("%{}", name),
            None => format!("%{}", id.index()),
        }
    }

    fn write_value_list(&self, f: &mut impl Write, values: &[ValueId]) -> fmt::Result {
        let labels: Vec<String> = values.iter().map(|&v| self.value_label(v)).collect();
        f.write_str(&labels.join(", "))
    }

    fn write_typed_values(&self, f: &mut impl Write, values: &[ValueId]) -> fmt::Result {
        for (i, &value) in values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let ty = self.value_type(value).map_err(|_| fmt::Error)?;
            write!(f, "{} : {}", self.value_label(value), ty)?;
        }
        Ok(())
    }

    fn write_node(&self, f: &mut impl Write, node: &IrNode, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        f.write_str(&indent)?;

        if !node.outputs().is_empty() {
            self.write_typed_values(f, node.outputs())?;
            f.write_str(" = ")?;
        }

        f.write_str(node.kind().as_str())?;

        if !node.attributes.is_empty() {
            let mut keys: Vec<&String> = node.attributes.keys().collect();
            keys.sort();
            let attrs: Vec<String> = keys
                .into_iter()
                .map(|key| format!("{}={}", key, node.attributes[key]))
                .collect();
            write!(f, "[{}]", attrs.join(", "))?;
        }

        f.write_char('(')?;
        self.write_value_list(f, node.inputs())?;
        f.write_str(")\n")?;

        for &block in node.blocks() {
            let inputs = self.block_inputs(block).map_err(|_| fmt::Error)?;
            write!(f, "{}  block{}(", indent, block.index())?;
            self.write_typed_values(f, inputs)?;
            f.write_str(") {\n")?;
            self.write_block_body(f, block, depth + 2)?;
            writeln!(f, "{}  }}", indent)?;
        }

        Ok(())
    }

    fn write_block_body(&self, f: &mut impl Write, block: BlockId, depth: usize) -> fmt::Result {
        let nodes = self.block_nodes(block).map_err(|_| fmt::Error)?;
        for &node_id in nodes {
            let node = self.node(node_id).map_err(|_| fmt::Error)?;
            self.write_node(f, node, depth)?;
        }

        let outputs = self.block_outputs(block).map_err(|_| fmt::Error)?;
        write!(f, "{}return(", "  ".repeat(depth))?;
        self.write_value_list(f, outputs)?;
        f.write_str(")\n")
    }

    /// Render the graph as Graphviz DOT.
    ///
    /// Nested blocks become clusters inside the node that owns them. Edges
    /// are labelled with the value they carry.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph ir {\n");
        dot.push_str("    rankdir=TB;\n");
        dot.push_str("    node [shape=box, style=rounded];\n\n");

        // Writing into a String cannot fail
        let _ = self.write_dot_block(&mut dot, self.root(), 1);

        dot.push_str("}\n");
        dot
    }

    fn write_dot_block(&self, dot: &mut String, block_id: BlockId, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        let Ok(block) = self.block(block_id) else {
            return Ok(());
        };

        writeln!(
            dot,
            "{}{} [shape=ellipse, style=filled, fillcolor=lightblue, label=\"block{} inputs\"];",
            indent,
            dot_id(block.param_node()),
            block_id.index()
        )?;

        for &node_id in block.nodes() {
            let Ok(node) = self.node(node_id) else {
                continue;
            };
            writeln!(
                dot,
                "{}{} [label=\"{}\"];",
                indent,
                dot_id(node_id),
                escape_dot_string(node.kind().as_str())
            )?;
            self.write_dot_edges(dot, node_id, node, &indent)?;

            for &nested in node.blocks() {
                writeln!(dot, "{}subgraph cluster_block{} {{", indent, nested.index())?;
                writeln!(dot, "{}    label=\"block{}\";", indent, nested.index())?;
                self.write_dot_block(dot, nested, depth + 1)?;
                writeln!(dot, "{}}}", indent)?;
            }
        }

        if let Ok(ret) = self.node(block.return_node()) {
            writeln!(
                dot,
                "{}{} [shape=ellipse, style=filled, fillcolor=lightgreen, label=\"block{} outputs\"];",
                indent,
                dot_id(block.return_node()),
                block_id.index()
            )?;
            self.write_dot_edges(dot, block.return_node(), ret, &indent)?;
        }

        Ok(())
    }

    fn write_dot_edges(
        &self,
        dot: &mut String,
        node_id: NodeId,
        node: &IrNode,
        indent: &str,
    ) -> fmt::Result {
        for &input in node.inputs() {
            let Ok(definer) = self.definer(input) else {
                continue;
            };
            writeln!(
                dot,
                "{}{} -> {} [label=\"{}\"];",
                indent,
                dot_id(definer),
                dot_id(node_id),
                escape_dot_string(&self.value_label(input))
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for IrGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.root();
        let inputs = self.block_inputs(root).map_err(|_| fmt::Error)?;

        f.write_str("graph(")?;
        self.write_typed_values(f, inputs)?;
        f.write_str(") {\n")?;
        self.write_block_body(f, root, 1)?;
        f.write_str("}\n")
    }
}

fn dot_id(node: NodeId) -> String {
    format!("n{}", node.index())
}

/// Escape special characters for DOT strings.
fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
