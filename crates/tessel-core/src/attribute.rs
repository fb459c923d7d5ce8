//! Static node attributes.

use std::fmt;

/// Attribute value types.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f64),
    Int(i64),
    String(String),
    Floats(Vec<f64>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

impl AttributeValue {
    /// Interpret a scalar attribute as `f64`.
    ///
    /// Both `Float` and `Int` count as scalars; list and string attributes
    /// return `None`.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Float(v) => write!(f, "{v:?}"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::String(v) => write!(f, "{v:?}"),
            AttributeValue::Floats(v) => write!(f, "{v:?}"),
            AttributeValue::Ints(v) => write!(f, "{v:?}"),
            AttributeValue::Strings(v) => write!(f, "{v:?}"),
        }
    }
}

impl TryFrom<AttributeValue> for f64 {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Float(v) => Ok(v),
            _ => Err("Not a float".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for i64 {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Int(v) => Ok(v),
            _ => Err("Not an int".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for String {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::String(v) => Ok(v),
            _ => Err("Not a string".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for Vec<i64> {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Ints(v) => Ok(v),
            _ => Err("Not an int array".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for Vec<f64> {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Floats(v) => Ok(v),
            _ => Err("Not a float array".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_scalar() {
        assert_eq!(AttributeValue::Float(0.5).as_scalar(), Some(0.5));
        assert_eq!(AttributeValue::Int(1).as_scalar(), Some(1.0));
        assert_eq!(AttributeValue::Ints(vec![1]).as_scalar(), None);
    }

    #[test]
    fn test_try_from() {
        let size: Vec<i64> = AttributeValue::Ints(vec![2, 3]).try_into().unwrap();
        assert_eq!(size, vec![2, 3]);

        let err = i64::try_from(AttributeValue::Float(1.0)).unwrap_err();
        assert_eq!(err, "Not an int");
    }
}
