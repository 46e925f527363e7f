use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use sqlx::sqlite::SqliteJournalMode;

use crate::activity::{ActivityError, ActivityEvent, ActivityRecorder, ActivitySink};
use crate::catalog::repository::RepositoryStore;
use crate::data_types::CollectionInput;
use crate::repository::sqlite::SqliteRepository;

/// Keeps every event it's given, for inspection after the fact
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ActivityEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl ActivitySink for RecordingSink {
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Events are delivered by a background task: give it a chance to run
pub async fn wait_for_events(sink: &RecordingSink, count: usize) {
    for _ in 0..1000 {
        if sink.events().len() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "expected {count} activity event(s), got {}",
        sink.events().len()
    );
}

pub async fn in_memory_store() -> (Arc<RepositoryStore>, Arc<RecordingSink>) {
    let repository = Arc::new(
        SqliteRepository::try_new("sqlite::memory:".to_string(), SqliteJournalMode::Wal)
            .await
            .unwrap(),
    );

    let sink = Arc::new(RecordingSink::default());
    let (activity, _) = ActivityRecorder::spawn(sink.clone(), 16);

    (Arc::new(RepositoryStore::new(repository, activity)), sink)
}

pub fn articles_input() -> CollectionInput {
    serde_json::from_value(json!({
        "collection": "articles",
        "fields": [
            {"field": "id", "datatype": "integer", "note": "pk", "primary_key": true}
        ],
        "note": "Blog posts"
    }))
    .unwrap()
}
