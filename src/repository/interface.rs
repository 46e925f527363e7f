use std::fmt::{self, Debug, Display};

use async_trait::async_trait;

use crate::data_types::CollectionDefinition;
use crate::inspector::SchemaInspector;

/// One physical column, as reported by the store's own introspection
#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct ColumnRecord {
    pub name: String,
    pub column_type: String,
    pub primary_key: bool,
    pub auto_increment: bool,
}

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct CatalogCollectionRecord {
    pub collection: String,
    pub note: Option<String>,
}

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct CatalogFieldRecord {
    pub collection: String,
    pub field: String,
    pub datatype: String,
    pub note: String,
    pub position: i64,
}

/// Wrapper for conversion of database-specific error codes into actual errors
#[derive(Debug)]
pub enum Error {
    UniqueConstraintViolation(sqlx::Error),
    FKConstraintViolation(sqlx::Error),
    // CREATE TABLE on a name that's taken
    DuplicateTable(sqlx::Error),
    // DROP TABLE on a name that isn't there
    UndefinedTable(sqlx::Error),

    // All other errors
    SqlxError(sqlx::Error),
}

impl Error {
    pub fn into_sqlx(self) -> sqlx::Error {
        match self {
            Error::UniqueConstraintViolation(e)
            | Error::FKConstraintViolation(e)
            | Error::DuplicateTable(e)
            | Error::UndefinedTable(e)
            | Error::SqlxError(e) => e,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UniqueConstraintViolation(e) => write!(f, "unique constraint violation: {e}"),
            Error::FKConstraintViolation(e) => write!(f, "foreign key violation: {e}"),
            Error::DuplicateTable(e) => write!(f, "duplicate table: {e}"),
            Error::UndefinedTable(e) => write!(f, "undefined table: {e}"),
            Error::SqlxError(e) => write!(f, "{e}"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Physical store plus the side catalog. Introspection lives on the
/// `SchemaInspector` supertrait.
#[async_trait]
pub trait Repository: SchemaInspector + Send + Sync + Debug {
    async fn setup(&self);

    /// Materialize the collection as a table. Fails with `DuplicateTable` if the
    /// name is already taken at execution time.
    async fn create_table(&self, definition: &CollectionDefinition) -> Result<(), Error>;

    /// Record notes and datatype tokens, all rows in one transaction. Rows
    /// already there for the name are replaced.
    async fn insert_catalog_entries(
        &self,
        definition: &CollectionDefinition,
    ) -> Result<(), Error>;

    async fn get_catalog_collection(
        &self,
        name: &str,
    ) -> Result<Option<CatalogCollectionRecord>, Error>;

    async fn get_catalog_fields(&self, name: &str) -> Result<Vec<CatalogFieldRecord>, Error>;

    async fn list_catalog_collections(&self) -> Result<Vec<CatalogCollectionRecord>, Error>;

    async fn list_catalog_fields(&self) -> Result<Vec<CatalogFieldRecord>, Error>;

    /// Drop the table and its catalog rows in a single transaction. Fails with
    /// `UndefinedTable` if the table is already gone.
    async fn drop_table(&self, name: &str) -> Result<(), Error>;
}
