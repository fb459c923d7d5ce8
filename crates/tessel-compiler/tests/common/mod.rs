//! Shared helpers for the optimizer integration tests.

use tessel_core::{DataType, Device, IrGraph, ValueId, ValueType};

/// Initialize a debug-level tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_test_writer()
        .try_init();
}

pub fn f32_tensor(dims: &[usize]) -> ValueType {
    ValueType::tensor(DataType::F32, Device::Cpu, dims)
}

/// Empty graph plus one named root input of the given type.
pub fn graph_with_input(name: &str, ty: ValueType) -> anyhow::Result<(IrGraph, ValueId)> {
    let mut graph = IrGraph::new();
    let root = graph.root();
    let x = graph.add_input(root, ty)?;
    graph.set_value_name(x, name)?;
    Ok((graph, x))
}
