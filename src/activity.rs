//! Activity recording for schema mutations.
//!
//! The manager hands events to an [`ActivityRecorder`], which forwards them
//! over a bounded channel to a background task that owns the actual
//! [`ActivitySink`]. Recording never waits: if the queue is full or the task is
//! gone, the event is dropped with a warning and the mutation proceeds.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use strum_macros::{Display, EnumString};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::data_types::ActorContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub timestamp: SystemTime,
    pub action: ActivityAction,
    pub actor: ActorContext,
    /// Name of the collection the action applied to
    pub target: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("Activity sink unavailable: {reason}")]
    SinkUnavailable { reason: String },
}

#[async_trait]
pub trait ActivitySink: Sync + Send {
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityError>;
}

/// Writes every event to the log under the `catalogd::activity` target
#[derive(Debug, Default)]
pub struct TracingSink {}

#[async_trait]
impl ActivitySink for TracingSink {
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityError> {
        let timestamp = event
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        info!(
            id = %event.id,
            timestamp_ms = timestamp as u64,
            action = %event.action,
            collection = event.target.as_str(),
            ip = ?event.actor.ip,
            user_agent = ?event.actor.user_agent,
            user = ?event.actor.user,
            "Collection {}d",
            event.action,
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ActivityRecorder {
    sender: mpsc::Sender<ActivityEvent>,
}

impl ActivityRecorder {
    /// Start the background task draining events into `sink`. The task exits
    /// once every clone of the recorder has been dropped.
    pub fn spawn(sink: Arc<dyn ActivitySink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<ActivityEvent>(capacity);

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let id = event.id;
                if let Err(e) = sink.record(event).await {
                    warn!("Failed to record activity event {id}: {e}");
                }
            }
        });

        (Self { sender }, handle)
    }

    pub fn record(&self, action: ActivityAction, actor: &ActorContext, target: &str) {
        let event = ActivityEvent {
            id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
            action,
            actor: actor.clone(),
            target: target.to_string(),
        };

        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Activity queue full, dropping {} event for {:?}",
                    event.action, event.target
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    "Activity recorder stopped, dropping {} event for {:?}",
                    event.action, event.target
                );
            }
        }
    }
}
