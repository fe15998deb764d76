use crate::value::Value;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// DbType
///
/// Store-neutral parameter type handed to the connection.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum DbType {
    Boolean,
    Int32,
    Int64,
    Double,
    String,
    Binary,
}

///
/// TypeMapping
///
/// How a column value is encoded for the store: the store's own type name
/// plus the neutral parameter type.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TypeMapping {
    pub store_type: String,
    pub db_type: DbType,
}

impl TypeMapping {
    pub fn new(store_type: impl Into<String>, db_type: DbType) -> Self {
        Self {
            store_type: store_type.into(),
            db_type,
        }
    }

    /// Build the store-level parameter for one placeholder.
    #[must_use]
    pub fn create_parameter(&self, name: &str, value: Value, nullable: bool) -> StoreParameter {
        StoreParameter {
            name: name.to_string(),
            value,
            db_type: self.db_type,
            direction: ParameterDirection::Input,
            nullable,
        }
    }
}

///
/// ParameterDirection
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
}

///
/// StoreParameter
///
/// One bound parameter of a store command, ready for the driver.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StoreParameter {
    pub name: String,
    pub value: Value,
    pub db_type: DbType,
    pub direction: ParameterDirection,
    pub nullable: bool,
}
