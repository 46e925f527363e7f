use async_trait::async_trait;

use crate::data_types::{ActorContext, CollectionInput, CollectionSummary};
use crate::query::NormalizedQuery;

pub mod repository;
pub mod validation;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    // Caller errors
    #[error("Invalid collection definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Collection {name:?} already exists")]
    CollectionAlreadyExists { name: String },

    #[error("Collection {name:?} doesn't exist")]
    CollectionNotFound { name: String },

    // Store errors
    #[error("Error changing the schema: {0:?}")]
    SchemaMutationFailed(sqlx::Error),

    /// The table was created but its catalog rows weren't written
    #[error("Collection {name:?} was created but its catalog entries weren't recorded: {reason}")]
    CatalogInconsistent { name: String, reason: String },

    #[error("Internal SQL error: {0:?}")]
    SqlxError(sqlx::Error),
}

pub type CatalogResult<T, E = CatalogError> = Result<T, E>;

#[async_trait]
pub trait CollectionStore: Sync + Send {
    async fn exists(&self, name: &str) -> CatalogResult<bool>;

    async fn create(
        &self,
        input: &CollectionInput,
        actor: &ActorContext,
    ) -> CatalogResult<CollectionSummary>;

    async fn read_all(&self, query: &NormalizedQuery) -> CatalogResult<Vec<CollectionSummary>>;

    /// Pagination and search in `query` don't apply to a single collection
    async fn read_one(
        &self,
        name: &str,
        query: &NormalizedQuery,
    ) -> CatalogResult<CollectionSummary>;

    async fn delete(&self, name: &str, actor: &ActorContext) -> CatalogResult<()>;
}
