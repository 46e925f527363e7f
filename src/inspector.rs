use async_trait::async_trait;

use crate::repository::interface::{ColumnRecord, Error};

/// Read-only view of the physical schema. Implementations query the store on
/// every call: callers rely on the answer being current right before they
/// mutate.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, Error>;

    /// User tables, sorted by name. Catalog and migration bookkeeping tables
    /// (anything starting with an underscore) are not collections.
    async fn list_collections(&self) -> Result<Vec<String>, Error>;

    /// Columns in declaration order. Empty if the table doesn't exist.
    async fn list_columns(&self, name: &str) -> Result<Vec<ColumnRecord>, Error>;
}
