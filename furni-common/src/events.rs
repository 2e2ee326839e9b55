//! Event types for the FurniCraft event system
//!
//! Provides the design lifecycle events and the EventBus that fans them out
//! to SSE clients and any other in-process listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle status of a design's analysis
///
/// ```text
/// pending --> analyzing --> completed
///                 \-------> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignStatus {
    /// Stored, analysis not started yet
    Pending,
    /// Analysis submitted, result not materialized yet
    Analyzing,
    /// Exactly one analysis result exists
    Completed,
    /// The analysis attempt errored
    Failed,
}

impl DesignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesignStatus::Pending => "pending",
            DesignStatus::Analyzing => "analyzing",
            DesignStatus::Completed => "completed",
            DesignStatus::Failed => "failed",
        }
    }

    /// Completed and failed designs never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, DesignStatus::Completed | DesignStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle
    ///
    /// Re-entering `analyzing` from `analyzing` is allowed so that a deferred
    /// trigger can re-assert the status it was started with.
    pub fn can_transition_to(&self, next: DesignStatus) -> bool {
        use DesignStatus::*;
        matches!(
            (self, next),
            (Pending, Analyzing)
                | (Pending, Failed)
                | (Analyzing, Analyzing)
                | (Analyzing, Completed)
                | (Analyzing, Failed)
        )
    }
}

impl fmt::Display for DesignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesignStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DesignStatus::Pending),
            "analyzing" => Ok(DesignStatus::Analyzing),
            "completed" => Ok(DesignStatus::Completed),
            "failed" => Ok(DesignStatus::Failed),
            other => Err(crate::Error::Corrupt(format!("unknown design status '{}'", other))),
        }
    }
}

/// FurniCraft event types
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FurniEvent {
    /// Image stored and design row created
    DesignUploaded {
        design_id: Uuid,
        title: String,
        image_url: String,
        timestamp: DateTime<Utc>,
    },

    /// Design moved along its lifecycle
    DesignStatusChanged {
        design_id: Uuid,
        old_status: DesignStatus,
        new_status: DesignStatus,
        timestamp: DateTime<Utc>,
    },

    /// Analysis result and materials were persisted
    AnalysisCompleted {
        design_id: Uuid,
        analysis_id: Uuid,
        material_count: usize,
        estimated_cost_min: f64,
        estimated_cost_max: f64,
        timestamp: DateTime<Utc>,
    },

    /// Analysis attempt errored; the design is now failed
    AnalysisFailed {
        design_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl FurniEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            FurniEvent::DesignUploaded { .. } => "DesignUploaded",
            FurniEvent::DesignStatusChanged { .. } => "DesignStatusChanged",
            FurniEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            FurniEvent::AnalysisFailed { .. } => "AnalysisFailed",
        }
    }

    pub fn design_id(&self) -> Uuid {
        match self {
            FurniEvent::DesignUploaded { design_id, .. }
            | FurniEvent::DesignStatusChanged { design_id, .. }
            | FurniEvent::AnalysisCompleted { design_id, .. }
            | FurniEvent::AnalysisFailed { design_id, .. } => *design_id,
        }
    }
}

/// Broadcast bus for FurniEvent
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FurniEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FurniEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: FurniEvent,
    ) -> Result<usize, broadcast::error::SendError<FurniEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FurniEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_edges() {
        use DesignStatus::*;

        assert!(Pending.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Completed));
        assert!(Analyzing.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));

        for terminal in [Completed, Failed] {
            assert!(terminal.is_terminal());
            for next in [Pending, Analyzing, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_status_string_form() {
        for status in [
            DesignStatus::Pending,
            DesignStatus::Analyzing,
            DesignStatus::Completed,
            DesignStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<DesignStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
        assert!("done".parse::<DesignStatus>().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let design_id = Uuid::new_v4();

        bus.emit(FurniEvent::DesignStatusChanged {
            design_id,
            old_status: DesignStatus::Pending,
            new_status: DesignStatus::Analyzing,
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "DesignStatusChanged");
        assert_eq!(event.design_id(), design_id);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        let event = FurniEvent::AnalysisFailed {
            design_id: Uuid::new_v4(),
            error: "boom".to_string(),
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 4);
    }
}
