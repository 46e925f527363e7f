use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::activity::{ActivityAction, ActivityRecorder};
use crate::catalog::validation::{is_collection_name, validate};
use crate::catalog::{CatalogError, CatalogResult, CollectionStore};
use crate::data_types::{ActorContext, CollectionInput, CollectionSummary, FieldSummary};
use crate::query::NormalizedQuery;
use crate::repository::interface::{
    CatalogCollectionRecord, CatalogFieldRecord, ColumnRecord, Error as RepositoryError,
    Repository,
};

// The native collection manager, on top of a relational repository
pub struct RepositoryStore {
    pub repository: Arc<dyn Repository>,
    pub activity: ActivityRecorder,
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> CatalogError {
        CatalogError::SqlxError(err.into_sqlx())
    }
}

// Physical columns are authoritative for what exists; the catalog only adds
// notes and the datatype token the field was declared with
fn summarize(
    collection: CatalogCollectionRecord,
    columns: Vec<ColumnRecord>,
    fields: &[CatalogFieldRecord],
) -> CollectionSummary {
    let fields: HashMap<&str, &CatalogFieldRecord> =
        fields.iter().map(|f| (f.field.as_str(), f)).collect();

    CollectionSummary {
        collection: collection.collection,
        note: collection.note,
        fields: columns
            .into_iter()
            .map(|column| {
                let catalog = fields.get(column.name.as_str());
                FieldSummary {
                    datatype: catalog
                        .map(|f| f.datatype.clone())
                        .unwrap_or(column.column_type),
                    note: catalog.map(|f| f.note.clone()),
                    field: column.name,
                    primary_key: column.primary_key,
                    auto_increment: column.auto_increment,
                }
            })
            .collect(),
    }
}

impl RepositoryStore {
    pub fn new(repository: Arc<dyn Repository>, activity: ActivityRecorder) -> Self {
        Self {
            repository,
            activity,
        }
    }

    async fn load_summary(&self, name: &str) -> CatalogResult<CollectionSummary> {
        let columns = self.repository.list_columns(name).await?;
        if columns.is_empty() {
            return Err(CatalogError::CollectionNotFound {
                name: name.to_string(),
            });
        }

        let collection = self
            .repository
            .get_catalog_collection(name)
            .await?
            .unwrap_or_else(|| CatalogCollectionRecord {
                collection: name.to_string(),
                note: None,
            });
        let fields = self.repository.get_catalog_fields(name).await?;

        Ok(summarize(collection, columns, &fields))
    }
}

#[async_trait]
impl CollectionStore for RepositoryStore {
    async fn exists(&self, name: &str) -> CatalogResult<bool> {
        // Bookkeeping tables are physically there but aren't collections
        if !is_collection_name(name) {
            return Ok(false);
        }
        Ok(self.repository.exists(name).await?)
    }

    async fn create(
        &self,
        input: &CollectionInput,
        actor: &ActorContext,
    ) -> CatalogResult<CollectionSummary> {
        let definition = validate(input)?;
        let name = definition.name.as_str();

        if self.repository.exists(name).await? {
            return Err(CatalogError::CollectionAlreadyExists {
                name: name.to_string(),
            });
        }

        debug!("Creating collection {name:?} with {} field(s)", definition.fields.len());

        // Someone else might have created it since the check: the DDL itself
        // has the final say
        match self.repository.create_table(&definition).await {
            Ok(()) => {}
            Err(RepositoryError::DuplicateTable(_)) => {
                return Err(CatalogError::CollectionAlreadyExists {
                    name: name.to_string(),
                })
            }
            Err(e) => {
                // A concurrent create can also lose on some other catalog
                // constraint of the store, with the table there afterwards
                if self.repository.exists(name).await.unwrap_or(false) {
                    debug!("Lost the race creating {name:?}: {e}");
                    return Err(CatalogError::CollectionAlreadyExists {
                        name: name.to_string(),
                    });
                }
                return Err(CatalogError::SchemaMutationFailed(e.into_sqlx()));
            }
        }

        if let Err(e) = self.repository.insert_catalog_entries(&definition).await {
            warn!("Collection {name:?} created without its catalog entries: {e}");
            return Err(CatalogError::CatalogInconsistent {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        self.activity.record(ActivityAction::Create, actor, name);

        self.load_summary(name).await
    }

    async fn read_all(&self, query: &NormalizedQuery) -> CatalogResult<Vec<CollectionSummary>> {
        let names = self.repository.list_collections().await?;

        let notes: HashMap<String, Option<String>> = self
            .repository
            .list_catalog_collections()
            .await?
            .into_iter()
            .map(|c| (c.collection, c.note))
            .collect();

        let fields: HashMap<String, Vec<CatalogFieldRecord>> = self
            .repository
            .list_catalog_fields()
            .await?
            .into_iter()
            .into_group_map_by(|f| f.collection.clone());

        let collections = names
            .into_iter()
            .filter(|name| is_collection_name(name))
            .map(|name| CatalogCollectionRecord {
                note: notes.get(&name).cloned().flatten(),
                collection: name,
            })
            .collect();

        let mut summaries = vec![];
        for collection in query.apply(collections) {
            let columns = self.repository.list_columns(&collection.collection).await?;
            // Dropped since we listed it
            if columns.is_empty() {
                continue;
            }

            let collection_fields = fields
                .get(&collection.collection)
                .map(Vec::as_slice)
                .unwrap_or_default();
            summaries.push(summarize(collection, columns, collection_fields));
        }

        Ok(summaries)
    }

    async fn read_one(
        &self,
        name: &str,
        _query: &NormalizedQuery,
    ) -> CatalogResult<CollectionSummary> {
        if !is_collection_name(name) {
            return Err(CatalogError::CollectionNotFound {
                name: name.to_string(),
            });
        }
        self.load_summary(name).await
    }

    async fn delete(&self, name: &str, actor: &ActorContext) -> CatalogResult<()> {
        if !self.exists(name).await? {
            return Err(CatalogError::CollectionNotFound {
                name: name.to_string(),
            });
        }

        debug!("Dropping collection {name:?}");

        self.repository
            .drop_table(name)
            .await
            .map_err(|e| match e {
                RepositoryError::UndefinedTable(_) => CatalogError::CollectionNotFound {
                    name: name.to_string(),
                },
                e => CatalogError::SchemaMutationFailed(e.into_sqlx()),
            })?;

        self.activity.record(ActivityAction::Delete, actor, name);

        Ok(())
    }
}
