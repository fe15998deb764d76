use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Value
///
/// A store-level scalar as sent in parameters and read back from result rows.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interpret the value as a non-negative row count.
    #[must_use]
    pub const fn as_row_count(&self) -> Option<u64> {
        match self {
            Self::Int(n) if *n >= 0 => Some(n.unsigned_abs()),
            _ => None,
        }
    }

    /// Short label of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    &str => Text,
    String => Text,
    Vec<u8> => Blob,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_accepts_only_non_negative_ints() {
        assert_eq!(Value::Int(3).as_row_count(), Some(3));
        assert_eq!(Value::Int(0).as_row_count(), Some(0));
        assert_eq!(Value::Int(-1).as_row_count(), None);
        assert_eq!(Value::Text("1".into()).as_row_count(), None);
        assert_eq!(Value::Null.as_row_count(), None);
    }

    #[test]
    fn option_none_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7_i64)), Value::Int(7));
    }
}
