//! Type descriptors attached to IR values.
//!
//! Passes only query these types; they never infer them. A value's type is
//! whatever the graph builder recorded, or `ValueType::Unknown` for freshly
//! created outputs until metadata is copied onto them.

use std::fmt;

/// Scalar element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F64,
    F32,
    F16,
    I64,
    I32,
    U32,
    U8,
    Bool,
}

impl DataType {
    /// Short lowercase name used in graph dumps.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::F64 => "f64",
            DataType::F32 => "f32",
            DataType::F16 => "f16",
            DataType::I64 => "i64",
            DataType::I32 => "i32",
            DataType::U32 => "u32",
            DataType::U8 => "u8",
            DataType::Bool => "bool",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a tensor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,

    /// GPU adapter, by ordinal.
    Gpu(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Gpu(ordinal) => write!(f, "gpu:{ordinal}"),
        }
    }
}

/// A single dimension of a partially known shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Known size.
    Static(usize),

    /// Named symbolic size (e.g., "batch").
    Named(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Static(n) => write!(f, "{n}"),
            Dimension::Named(name) => f.write_str(name),
        }
    }
}

/// Tensor shape: fully static, partially symbolic, or unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorShape {
    /// All dimensions are known.
    Static(Vec<usize>),

    /// Rank is known, some dimensions are symbolic.
    Symbolic(Vec<Dimension>),

    /// Neither rank nor dimensions are known.
    Unknown,
}

impl TensorShape {
    /// Check if the shape is fully static.
    pub fn is_static(&self) -> bool {
        matches!(self, TensorShape::Static(_))
    }

    /// Get static dimensions if available.
    pub fn as_static(&self) -> Option<&[usize]> {
        match self {
            TensorShape::Static(dims) => Some(dims),
            _ => None,
        }
    }

    /// Number of dimensions, if known.
    pub fn ndim(&self) -> Option<usize> {
        match self {
            TensorShape::Static(dims) => Some(dims.len()),
            TensorShape::Symbolic(dims) => Some(dims.len()),
            TensorShape::Unknown => None,
        }
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorShape::Static(dims) => {
                let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "[{}]", dims.join(", "))
            }
            TensorShape::Symbolic(dims) => {
                let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "[{}]", dims.join(", "))
            }
            TensorShape::Unknown => f.write_str("[*]"),
        }
    }
}

/// Full description of a tensor-typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorType {
    pub dtype: DataType,
    pub device: Device,
    pub shape: TensorShape,
}

impl TensorType {
    /// Create a tensor type.
    pub fn new(dtype: DataType, device: Device, shape: TensorShape) -> Self {
        Self {
            dtype,
            device,
            shape,
        }
    }

    /// Shorthand for a statically shaped tensor.
    pub fn with_static_shape(dtype: DataType, device: Device, dims: &[usize]) -> Self {
        Self::new(dtype, device, TensorShape::Static(dims.to_vec()))
    }
}

/// The type carried by an IR value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueType {
    /// A tensor with known element type and device.
    Tensor(TensorType),

    /// A scalar (non-tensor) value.
    Scalar(DataType),

    /// Not yet known. Newly built outputs start here.
    #[default]
    Unknown,
}

impl ValueType {
    /// Shorthand for a static-shape tensor type.
    pub fn tensor(dtype: DataType, device: Device, dims: &[usize]) -> Self {
        ValueType::Tensor(TensorType::with_static_shape(dtype, device, dims))
    }

    /// Check if this is a tensor type.
    pub fn is_tensor(&self) -> bool {
        matches!(self, ValueType::Tensor(_))
    }

    /// Get the tensor description, if tensor-typed.
    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self {
            ValueType::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Tensor(t) => write!(f, "{}{}@{}", t.dtype, t.shape, t.device),
            ValueType::Scalar(dtype) => write!(f, "{dtype}"),
            ValueType::Unknown => f.write_str("?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape() {
        let static_shape = TensorShape::Static(vec![1, 2, 3]);
        assert!(static_shape.is_static());
        assert_eq!(static_shape.ndim(), Some(3));
        assert_eq!(static_shape.as_static(), Some(&[1, 2, 3][..]));

        let symbolic = TensorShape::Symbolic(vec![
            Dimension::Named("batch".to_string()),
            Dimension::Static(512),
        ]);
        assert!(!symbolic.is_static());
        assert_eq!(symbolic.ndim(), Some(2));
        assert_eq!(symbolic.as_static(), None);

        assert_eq!(TensorShape::Unknown.ndim(), None);
    }

    #[test]
    fn test_value_type_queries() {
        let ty = ValueType::tensor(DataType::F32, Device::Gpu(0), &[2, 3]);
        assert!(ty.is_tensor());
        let tensor = ty.as_tensor().unwrap();
        assert_eq!(tensor.dtype, DataType::F32);
        assert_eq!(tensor.device, Device::Gpu(0));

        assert!(!ValueType::Scalar(DataType::I64).is_tensor());
        assert!(ValueType::Unknown.as_tensor().is_none());
    }

    #[test]
    fn test_display() {
        let ty = ValueType::tensor(DataType::F32, Device::Cpu, &[2, 3]);
        assert_eq!(ty.to_string(), "f32[2, 3]@cpu");

        let symbolic = ValueType::Tensor(TensorType::new(
            DataType::F16,
            Device::Gpu(1),
            TensorShape::Symbolic(vec![Dimension::Named("n".to_string()), Dimension::Static(4)]),
        ));
        assert_eq!(symbolic.to_string(), "f16[n, 4]@gpu:1");

        assert_eq!(ValueType::Scalar(DataType::I64).to_string(), "i64");
        assert_eq!(ValueType::Unknown.to_string(), "?");
    }
}
