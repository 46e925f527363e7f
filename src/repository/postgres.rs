use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    postgres::PgPoolOptions,
    Executor, PgPool, Postgres, QueryBuilder,
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
pub struct PostgresRepository {
    pub executor: PgPool,
    pub schema_name: String,
}

impl PostgresRepository {
    pub const MIGRATOR: Migrator = sqlx::migrate!("migrations/postgres");
    // information_schema columns are domains over `name`/`varchar`, cast them
    // so they decode as plain strings
    pub const QUERIES: RepositoryQueries = RepositoryQueries {
        collection_exists: r#"
        SELECT COUNT(*) AS count
        FROM information_schema.tables
        WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            AND table_name = $1
        "#,
        list_collections: r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            AND table_name NOT LIKE '\_%'
        ORDER BY table_name
        "#,
        list_columns: r#"
        SELECT
            c.column_name::text AS name,
            c.data_type::text AS column_type,
            EXISTS (
                SELECT 1
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage kcu
                    ON tc.constraint_name = kcu.constraint_name
                    AND tc.table_schema = kcu.table_schema
                WHERE tc.constraint_type = 'PRIMARY KEY'
                    AND tc.table_schema = c.table_schema
                    AND tc.table_name = c.table_name
                    AND kcu.column_name = c.column_name
            ) AS primary_key,
            (c.is_identity = 'YES' OR COALESCE(c.column_default, '') LIKE 'nextval(%') AS auto_increment
        FROM information_schema.columns c
        WHERE c.table_schema = current_schema() AND c.table_name = $1
        ORDER BY c.ordinal_position
        "#,
    };

    pub async fn try_new(
        dsn: String,
        schema_name: String,
    ) -> std::result::Result<Self, sqlx::Error> {
        if !Postgres::database_exists(&dsn).await? {
            let _ = Postgres::create_database(&dsn).await;
        }

        let repo = PostgresRepository::connect(dsn, schema_name.clone()).await?;

        repo.executor
            .execute(
                format!("CREATE SCHEMA IF NOT EXISTS {};", quote_identifier(&schema_name))
                    .as_str(),
            )
            .await?;

        // Setup the schema
        repo.setup().await;
        Ok(repo)
    }

    pub async fn connect(
        dsn: String,
        schema_name: String,
    ) -> std::result::Result<Self, sqlx::Error> {
        let schema_name_2 = schema_name.clone();

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(16)
            .idle_timeout(Duration::from_millis(30000))
            .test_before_acquire(true)
            .after_connect(move |c, _m| {
                let schema_name = quote_identifier(&schema_name);
                Box::pin(async move {
                    // Collections live in our schema only, so current_schema()
                    // always resolves to it
                    let query = format!("SET search_path TO {schema_name};");
                    c.execute(sqlx::query(&query)).await?;
                    Ok(())
                })
            })
            .connect(&dsn)
            .await?;

        Ok(Self {
            executor: pool,
            schema_name: schema_name_2,
        })
    }

    pub fn column_definition(field: &FieldDefinition) -> String {
        let mut column = format!(
            "{} {}",
            quote_identifier(&field.field),
            Self::column_type(field.datatype)
        );
        if field.auto_increment {
            column.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        if field.primary_key {
            column.push_str(" PRIMARY KEY");
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
            DataType::Datetime => "TIMESTAMP",
            DataType::Timestamp => "TIMESTAMPTZ",
            DataType::Json => "JSONB",
            DataType::Uuid => "UUID",
            DataType::Binary => "BYTEA",
        }
    }

    pub fn interpret_error(error: sqlx::Error) -> Error {
        if let sqlx::Error::Database(ref d) = error {
            // Reference: https://www.postgresql.org/docs/current/errcodes-appendix.html
            if let Some(code) = d.code() {
                match code.as_ref() {
                    // Two overlapping CREATE TABLEs of one name: the loser
                    // trips over the row type's entry in pg_type
                    "23505" if d.constraint() == Some("pg_type_typname_nsp_index") => {
                        return Error::DuplicateTable(error)
                    }
                    "23505" => return Error::UniqueConstraintViolation(error),
                    "23503" => return Error::FKConstraintViolation(error),
                    "42P07" => return Error::DuplicateTable(error),
                    "42P01" => return Error::UndefinedTable(error),
                    _ => {}
                }
            }
        }
        Error::SqlxError(error)
    }
}

implement_repository!(PostgresRepository);

pub mod testutils {
    use rand::Rng;

    use super::PostgresRepository;

    pub fn get_random_schema() -> String {
        // Generate a random schema (taken from IOx)
        let mut rng = rand::thread_rng();
        (&mut rng)
            .sample_iter(rand::distributions::Alphanumeric)
            .filter(|c| c.is_ascii_alphabetic())
            .take(20)
            .map(char::from)
            .collect::<String>()
            .to_lowercase()
    }

    pub async fn make_repository(dsn: &str) -> PostgresRepository {
        let schema_name = get_random_schema();

        PostgresRepository::try_new(dsn.to_string(), schema_name)
            .await
            .expect("Error setting up the database")
    }
}
