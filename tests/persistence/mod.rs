use catalogd::catalog::{CatalogError, CollectionStore};
use catalogd::data_types::{ActorContext, CollectionInput};
use catalogd::query::NormalizedQuery;
use serde_json::json;
use tempfile::TempDir;

use crate::{sqlite_config, store_from_config};

fn orders() -> CollectionInput {
    serde_json::from_value(json!({
        "collection": "orders",
        "fields": [
            {"field": "id", "datatype": "big_integer", "note": "Order number", "primary_key": true},
            {"field": "placed_at", "datatype": "datetime", "note": "When the order came in"},
            {"field": "payload", "datatype": "json", "note": "Raw order"}
        ],
        "note": "Shop orders"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_collections_survive_restart() {
    let dir = TempDir::new().unwrap();
    let dsn = dir.path().join("catalogd.sqlite");
    let config = sqlite_config(&dsn.to_string_lossy());

    let created = {
        let store = store_from_config(&config).await;
        store
            .create(&orders(), &ActorContext::anonymous())
            .await
            .unwrap()
    };

    // Fresh pool, same file; migrations have already run
    let store = store_from_config(&config).await;
    let read = store
        .read_one("orders", &NormalizedQuery::default())
        .await
        .unwrap();
    assert_eq!(read, created);
    assert_eq!(read.note, Some("Shop orders".to_string()));
    assert_eq!(
        read.fields
            .iter()
            .map(|f| (f.field.as_str(), f.datatype.as_str()))
            .collect::<Vec<_>>(),
        vec![
            ("id", "big_integer"),
            ("placed_at", "datetime"),
            ("payload", "json")
        ]
    );

    store
        .delete("orders", &ActorContext::anonymous())
        .await
        .unwrap();
    drop(store);

    let store = store_from_config(&config).await;
    assert!(store
        .read_all(&NormalizedQuery::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_bookkeeping_tables_survive_delete_attempts() {
    let dir = TempDir::new().unwrap();
    let dsn = dir.path().join("catalogd.sqlite");
    let config = sqlite_config(&dsn.to_string_lossy());

    {
        let store = store_from_config(&config).await;
        for name in ["_sqlx_migrations", "_catalog_collections", "_catalog_fields"] {
            assert!(matches!(
                store.delete(name, &ActorContext::anonymous()).await,
                Err(CatalogError::CollectionNotFound { .. })
            ));
        }
    }

    // Migrations see their own history and the store opens again
    let store = store_from_config(&config).await;
    store
        .create(&orders(), &ActorContext::anonymous())
        .await
        .unwrap();
}
