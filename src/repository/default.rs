/// Default implementation for a Repository that factors out common
/// query patterns / SQL queries between Postgres and SQLite.
///
/// Usage:
///
/// The struct has to have certain fields and associated items, since this
/// macro relies on them:
///
/// ```ignore
/// pub struct MyRepository {
///     pub executor: sqlx::Pool<sqlx::SqlxDatabaseType>
/// }
///
/// impl MyRepository {
///     pub const MIGRATOR: sqlx::Migrator = sqlx::migrate!("my/migrations");
///     pub const QUERIES: RepositoryQueries = RepositoryQueries {
///         collection_exists: "SELECT COUNT(*) ...",
///         ...
///     };
///     pub fn column_definition(field: &FieldDefinition) -> String {
///         // Render one column of a CREATE TABLE statement in this dialect
///     }
///     pub fn interpret_error(error: sqlx::Error) -> Error {
///         // Interpret the database-specific error code and turn some sqlx errors
///         // into the Error enum values like DuplicateTable/UndefinedTable
///         // ...
///     }
/// }
///
/// implement_repository!(SqliteRepository)
/// ```
///
/// The catalog tables and the DDL statements are written so that they parse on
/// both databases. What doesn't (introspection, column types) goes through
/// `QUERIES` and `column_definition`.
///
/// DDL can't take bind parameters, so table and column names are spliced in
/// through `quote_identifier`. Names reaching this point have already been
/// checked against the identifier pattern by the validator.

/// Queries that are different between SQLite and PG
pub struct RepositoryQueries {
    /// Takes the table name as $1, returns a single `count` column
    pub collection_exists: &'static str,
    pub list_collections: &'static str,
    /// Takes the table name as $1, returns rows shaped like `ColumnRecord`
    pub list_columns: &'static str,
}

pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[macro_export]
macro_rules! implement_repository {
    ($repo: ident) => {
#[async_trait]
impl SchemaInspector for $repo {
    async fn exists(&self, name: &str) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar($repo::QUERIES.collection_exists)
            .bind(name)
            .fetch_one(&self.executor)
            .await.map_err($repo::interpret_error)?;

        Ok(count > 0)
    }

    async fn list_collections(&self) -> Result<Vec<String>, Error> {
        let names: Vec<String> = sqlx::query_scalar($repo::QUERIES.list_collections)
            .fetch(&self.executor)
            .try_collect()
            .await.map_err($repo::interpret_error)?;

        Ok(names)
    }

    async fn list_columns(&self, name: &str) -> Result<Vec<ColumnRecord>, Error> {
        let columns: Vec<ColumnRecord> = sqlx::query_as($repo::QUERIES.list_columns)
            .bind(name)
            .fetch(&self.executor)
            .try_collect()
            .await.map_err($repo::interpret_error)?;

        Ok(columns)
    }
}

#[async_trait]
impl Repository for $repo {
    async fn setup(&self) {
        $repo::MIGRATOR
            .run(&self.executor)
            .await
            .expect("error running migrations");
    }

    async fn create_table(&self, definition: &CollectionDefinition) -> Result<(), Error> {
        let columns = definition
            .fields
            .iter()
            .map($repo::column_definition)
            .collect::<Vec<String>>()
            .join(", ");
        let statement = format!(
            "CREATE TABLE {} ({columns})",
            quote_identifier(&definition.name)
        );

        sqlx::query(&statement)
            .persistent(false)
            .execute(&self.executor)
            .await.map_err($repo::interpret_error)?;

        Ok(())
    }

    async fn insert_catalog_entries(
        &self,
        definition: &CollectionDefinition,
    ) -> Result<(), Error> {
        let mut tx = self.executor.begin().await.map_err($repo::interpret_error)?;

        // The table was just created, so anything already recorded under its
        // name belongs to one dropped behind our back
        sqlx::query("DELETE FROM _catalog_fields WHERE collection = $1")
            .bind(&definition.name)
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        sqlx::query("DELETE FROM _catalog_collections WHERE collection = $1")
            .bind(&definition.name)
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        sqlx::query("INSERT INTO _catalog_collections (collection, note) VALUES ($1, $2)")
            .bind(&definition.name)
            .bind(&definition.note)
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        // TODO this breaks if we have more than (bind limit) / 5 fields
        let mut builder: QueryBuilder<_> = QueryBuilder::new(
            "INSERT INTO _catalog_fields (collection, field, datatype, note, position) ",
        );
        builder.push_values(
            definition.fields.iter().enumerate(),
            |mut b, (position, field)| {
                b.push_bind(definition.name.clone())
                    .push_bind(field.field.clone())
                    .push_bind(field.datatype.to_string())
                    .push_bind(field.note.clone())
                    .push_bind(position as i64);
            },
        );
        builder
            .build()
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        tx.commit().await.map_err($repo::interpret_error)?;

        Ok(())
    }

    async fn get_catalog_collection(
        &self,
        name: &str,
    ) -> Result<Option<CatalogCollectionRecord>, Error> {
        let collection = sqlx::query_as(
            "SELECT collection, note FROM _catalog_collections WHERE collection = $1",
        )
        .bind(name)
        .fetch_optional(&self.executor)
        .await.map_err($repo::interpret_error)?;

        Ok(collection)
    }

    async fn get_catalog_fields(&self, name: &str) -> Result<Vec<CatalogFieldRecord>, Error> {
        let fields: Vec<CatalogFieldRecord> = sqlx::query_as(
            r#"
        SELECT collection, field, datatype, note, position
        FROM _catalog_fields
        WHERE collection = $1
        ORDER BY position
        "#,
        )
        .bind(name)
        .fetch(&self.executor)
        .try_collect()
        .await.map_err($repo::interpret_error)?;

        Ok(fields)
    }

    async fn list_catalog_collections(&self) -> Result<Vec<CatalogCollectionRecord>, Error> {
        let collections: Vec<CatalogCollectionRecord> = sqlx::query_as(
            "SELECT collection, note FROM _catalog_collections ORDER BY collection",
        )
        .fetch(&self.executor)
        .try_collect()
        .await.map_err($repo::interpret_error)?;

        Ok(collections)
    }

    async fn list_catalog_fields(&self) -> Result<Vec<CatalogFieldRecord>, Error> {
        let fields: Vec<CatalogFieldRecord> = sqlx::query_as(
            r#"
        SELECT collection, field, datatype, note, position
        FROM _catalog_fields
        ORDER BY collection, position
        "#,
        )
        .fetch(&self.executor)
        .try_collect()
        .await.map_err($repo::interpret_error)?;

        Ok(fields)
    }

    async fn drop_table(&self, name: &str) -> Result<(), Error> {
        // Nobody sees the table gone while its catalog rows are still there, or
        // the other way around
        let mut tx = self.executor.begin().await.map_err($repo::interpret_error)?;

        let statement = format!("DROP TABLE {}", quote_identifier(name));
        sqlx::query(&statement)
            .persistent(false)
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        sqlx::query("DELETE FROM _catalog_fields WHERE collection = $1")
            .bind(name)
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        sqlx::query("DELETE FROM _catalog_collections WHERE collection = $1")
            .bind(name)
            .execute(&mut *tx)
            .await.map_err($repo::interpret_error)?;

        tx.commit().await.map_err($repo::interpret_error)?;

        Ok(())
    }
}
    };
}
