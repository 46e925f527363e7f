use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::activity::{ActivityRecorder, ActivitySink, TracingSink};
use crate::catalog::{repository::RepositoryStore, CollectionStore};
use crate::repository::{interface::Repository, sqlite::SqliteRepository};

#[cfg(feature = "catalog-postgres")]
use crate::repository::postgres::PostgresRepository;

use super::schema;

pub struct CatalogdContext {
    pub config: schema::CatalogdConfig,
    pub store: Arc<dyn CollectionStore>,
    /// Background task delivering activity events, finishes once the store
    /// is dropped
    pub activity_task: JoinHandle<()>,
}

pub async fn build_repository(
    config: &schema::CatalogdConfig,
) -> Result<Arc<dyn Repository>, sqlx::Error> {
    let repository: Arc<dyn Repository> = match &config.catalog {
        #[cfg(feature = "catalog-postgres")]
        schema::Catalog::Postgres(schema::Postgres { dsn, schema }) => Arc::new(
            PostgresRepository::try_new(dsn.to_string(), schema.to_string()).await?,
        ),
        schema::Catalog::Sqlite(schema::Sqlite {
            dsn,
            journal_mode,
            read_only: false,
        }) => Arc::new(SqliteRepository::try_new(dsn.to_string(), (*journal_mode).into()).await?),
        schema::Catalog::Sqlite(schema::Sqlite {
            dsn,
            journal_mode,
            read_only: true,
        }) => Arc::new(
            SqliteRepository::try_new_read_only(dsn.to_string(), (*journal_mode).into())
                .await?,
        ),
    };

    Ok(repository)
}

pub async fn build_context_with_sink(
    cfg: schema::CatalogdConfig,
    sink: Arc<dyn ActivitySink>,
) -> Result<CatalogdContext, sqlx::Error> {
    let repository = build_repository(&cfg).await?;
    let (activity, activity_task) =
        ActivityRecorder::spawn(sink, cfg.activity.queue_capacity);

    Ok(CatalogdContext {
        config: cfg,
        store: Arc::new(RepositoryStore::new(repository, activity)),
        activity_task,
    })
}

pub async fn build_context(cfg: schema::CatalogdConfig) -> Result<CatalogdContext, sqlx::Error> {
    build_context_with_sink(cfg, Arc::new(TracingSink::default())).await
}
