use std::str::FromStr;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, QueryBuilder, Sqlite,
};

use crate::data_types::{CollectionDefinition, DataType, FieldDefinition};
use crate::implement_repository;
use crate::inspector::SchemaInspector;

use super::{
    default::{quote_identifier, RepositoryQueries},
    interface::{
        CatalogCollectionRecord, CatalogFieldRecord, ColumnRecord, Error, Repository,
        Result,
    },
};

#[derive(Debug)]
pub struct SqliteRepository {
    pub executor: Pool<Sqlite>,
}

impl SqliteRepository {
    pub const MIGRATOR: Migrator = sqlx::migrate!("migrations/sqlite");
    pub const QUERIES: RepositoryQueries = RepositoryQueries {
        collection_exists: r#"
        SELECT COUNT(*) AS count
        FROM sqlite_master
        WHERE type = 'table' AND name = $1
        "#,
        // Hides sqlite_sequence & co. as well as our own underscored tables
        list_collections: r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table'
            AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
            AND name NOT LIKE '\_%' ESCAPE '\'
        ORDER BY name
        "#,
        // AUTOINCREMENT only ever applies to the INTEGER PRIMARY KEY, so it's
        // enough to find it right after a PRIMARY KEY clause in the table's DDL.
        // Field names have no spaces, so they never match.
        list_columns: r#"
        SELECT
            name,
            lower(type) AS column_type,
            pk > 0 AS primary_key,
            (pk > 0 AND (
                SELECT sql FROM sqlite_master WHERE type = 'table' AND name = $1
            ) LIKE '%PRIMARY KEY AUTOINCREMENT%') AS auto_increment
        FROM pragma_table_info($1)
        ORDER BY cid
        "#,
    };

    pub async fn try_new(
        dsn: String,
        journal_mode: SqliteJournalMode,
    ) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&dsn)?
            .create_if_missing(true)
            .journal_mode(journal_mode);

        let pool = Self::pool_options(&dsn).connect_with(options).await?;
        let repo = Self { executor: pool };
        repo.setup().await;
        Ok(repo)
    }

    ///
    /// Create a new `SqliteRepository` in read-only mode: assumes the
    /// database already exists and doesn't run migrations. Intended to be used
    /// in environments such as a pre-baked Docker image / LiteFS replica.
    pub async fn try_new_read_only(
        dsn: String,
        journal_mode: SqliteJournalMode,
    ) -> std::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&dsn)?
            .read_only(true)
            .journal_mode(journal_mode);

        let pool = Self::pool_options(&dsn).connect_with(options).await?;
        let repo = Self { executor: pool };
        Ok(repo)
    }

    // An in-memory database lives exactly as long as its connection: keep a
    // single one open forever. This also serializes DDL, which SQLite's shared
    // cache would otherwise report as SQLITE_LOCKED.
    fn pool_options(dsn: &str) -> SqlitePoolOptions {
        if dsn.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        }
    }

    pub fn column_definition(field: &FieldDefinition) -> String {
        // AUTOINCREMENT is only accepted on a column declared exactly INTEGER
        let column_type = if field.auto_increment {
            "INTEGER"
        } else {
            Self::column_type(field.datatype)
        };

        let mut column = format!("{} {column_type}", quote_identifier(&field.field));
        if field.primary_key {
            column.push_str(" PRIMARY KEY");
            if field.auto_increment {
                column.push_str(" AUTOINCREMENT");
            }
        }
        column
    }

    fn column_type(datatype: DataType) -> &'static str {
        match datatype {
            DataType::Integer => "INTEGER",
            DataType::BigInteger => "BIGINT",
            DataType::Float => "REAL",
            DataType::Decimal => "NUMERIC",
            DataType::String => "VARCHAR(255)",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Datetime => "DATETIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Json => "JSON",
            DataType::Uuid => "CHAR(36)",
            DataType::Binary => "BLOB",
        }
    }

    pub fn interpret_error(error: sqlx::Error) -> Error {
        if let sqlx::Error::Database(ref d) = error {
            // Reference: https://www.sqlite.org/rescode.html
            // DDL failures all come back as a generic SQLITE_ERROR, so we have
            // to look at the message.
            let message = d.message();

            if message.contains("FOREIGN KEY constraint failed") {
                return Error::FKConstraintViolation(error);
            }
            if message.contains("UNIQUE constraint failed") {
                return Error::UniqueConstraintViolation(error);
            }
            if message.starts_with("table") && message.ends_with("already exists") {
                return Error::DuplicateTable(error);
            }
            if message.starts_with("no such table") {
                return Error::UndefinedTable(error);
            }
        }
        Error::SqlxError(error)
    }
}

implement_repository!(SqliteRepository);

#[cfg(test)]
mod tests {
    use crate::data_types::{DataType, FieldDefinition};
    use crate::inspector::SchemaInspector;
    use crate::repository::interface::Repository;
    use sqlx::sqlite::SqliteJournalMode;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    use super::super::interface::tests::run_generic_repository_tests;
    use super::SqliteRepository;

    #[tokio::test]
    async fn test_sqlite_repository() {
        let repository = Arc::new(
            SqliteRepository::try_new(
                "sqlite::memory:".to_string(),
                SqliteJournalMode::Wal,
            )
            .await
            .unwrap(),
        );

        run_generic_repository_tests(repository).await;
    }

    #[test]
    fn test_column_definition() {
        let id = FieldDefinition {
            field: "id".to_string(),
            datatype: DataType::BigInteger,
            note: "pk".to_string(),
            primary_key: true,
            auto_increment: true,
        };
        assert_eq!(
            SqliteRepository::column_definition(&id),
            r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#
        );

        let weird = FieldDefinition {
            field: "so\"meth\"ing".to_string(),
            datatype: DataType::Uuid,
            note: "quoted".to_string(),
            primary_key: false,
            auto_increment: false,
        };
        assert_eq!(
            SqliteRepository::column_definition(&weird),
            r#""so""meth""ing" CHAR(36)"#
        );
    }

    #[tokio::test]
    async fn test_sqlite_repository_read_only() {
        // Make a temporary SQLite file in the RW mode, then try
        // reading from it in RO mode

        let temp_file = NamedTempFile::new().unwrap();

        let rw_repository = SqliteRepository::try_new(
            temp_file.path().to_string_lossy().to_string(),
            SqliteJournalMode::Wal,
        )
        .await
        .unwrap();

        assert!(rw_repository.list_collections().await.unwrap().is_empty());

        let ro_repository = SqliteRepository::try_new_read_only(
            temp_file.path().to_string_lossy().to_string(),
            SqliteJournalMode::Wal,
        )
        .await
        .unwrap();

        assert_eq!(
            ro_repository.list_collections().await.unwrap(),
            Vec::<String>::new()
        );

        let definition = crate::data_types::CollectionDefinition {
            name: "articles".to_string(),
            fields: vec![FieldDefinition {
                field: "id".to_string(),
                datatype: DataType::Integer,
                note: "pk".to_string(),
                primary_key: true,
                auto_increment: false,
            }],
            note: None,
        };
        assert!(ro_repository.create_table(&definition).await.is_err());
    }
}
