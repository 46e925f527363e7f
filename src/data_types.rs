use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Storage type tokens accepted in field definitions. Each backend maps them
/// onto its own column types when materializing a collection.
#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataType {
    Integer,
    BigInteger,
    Float,
    Decimal,
    String,
    Text,
    Boolean,
    Date,
    Time,
    Datetime,
    Timestamp,
    Json,
    Uuid,
    Binary,
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInteger)
    }
}

// Wire shapes. Everything is optional here so that the validator, not serde,
// decides what a missing value means. Flags stay raw JSON until validated so a
// "true" string is rejected instead of coerced.

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CollectionInput {
    pub collection: Option<String>,
    pub fields: Option<Vec<FieldInput>>,
    pub note: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldInput {
    pub field: Option<String>,
    pub datatype: Option<String>,
    pub note: Option<String>,
    pub primary_key: Option<Value>,
    pub auto_increment: Option<Value>,
}

/// A collection definition that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub field: String,
    pub datatype: DataType,
    pub note: String,
    pub primary_key: bool,
    pub auto_increment: bool,
}

/// A collection as reconstructed from the physical store and the catalog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub collection: String,
    pub note: Option<String>,
    pub fields: Vec<FieldSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldSummary {
    pub field: String,
    // Catalog token if the catalog knows the field, physical type otherwise
    pub datatype: String,
    pub note: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
}

/// Who issued a mutation and from where. Only ever handed to the activity
/// recorder.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub user: Option<String>,
}

impl ActorContext {
    pub fn anonymous() -> Self {
        Self::default()
    }
}
