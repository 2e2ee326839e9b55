//! Design records and their status machine

use chrono::{DateTime, Utc};
use furni_common::events::{DesignStatus, FurniEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-submitted furniture image plus descriptive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Public URL of the stored image
    pub image_url: String,
    pub original_filename: Option<String>,
    pub status: DesignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One edge taken in the design lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub design_id: Uuid,
    pub old_status: DesignStatus,
    pub new_status: DesignStatus,
    pub transitioned_at: DateTime<Utc>,
}

impl StatusTransition {
    pub fn into_event(self) -> FurniEvent {
        FurniEvent::DesignStatusChanged {
            design_id: self.design_id,
            old_status: self.old_status,
            new_status: self.new_status,
            timestamp: self.transitioned_at,
        }
    }
}

impl Design {
    /// New design in `pending`
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        image_url: impl Into<String>,
        original_filename: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.filter(|d| !d.trim().is_empty()),
            image_url: image_url.into(),
            original_filename,
            status: DesignStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, or `None` when the lifecycle has no such edge
    pub fn transition_to(&mut self, next: DesignStatus) -> Option<StatusTransition> {
        if !self.status.can_transition_to(next) {
            return None;
        }

        let transition = StatusTransition {
            design_id: self.id,
            old_status: self.status,
            new_status: next,
            transitioned_at: Utc::now(),
        };
        self.status = next;
        self.updated_at = transition.transitioned_at;
        Some(transition)
    }

    /// Seed for the fallback generator, stable per design
    pub fn fallback_seed(&self) -> u64 {
        let value = self.id.as_u128();
        (value >> 64) as u64 ^ value as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Design {
        Design::new(
            "Oak Dining Table",
            Some("   ".to_string()),
            "http://localhost/storage/a.png",
            Some("a.png".to_string()),
        )
    }

    #[test]
    fn test_new_design_is_pending() {
        let design = sample();
        assert_eq!(design.status, DesignStatus::Pending);
        assert_eq!(design.description, None, "blank description is dropped");
        assert_eq!(design.created_at, design.updated_at);
    }

    #[test]
    fn test_transition_records_edge() {
        let mut design = sample();
        let transition = design.transition_to(DesignStatus::Analyzing).unwrap();
        assert_eq!(transition.old_status, DesignStatus::Pending);
        assert_eq!(transition.new_status, DesignStatus::Analyzing);
        assert_eq!(design.status, DesignStatus::Analyzing);

        match transition.into_event() {
            FurniEvent::DesignStatusChanged { design_id, new_status, .. } => {
                assert_eq!(design_id, design.id);
                assert_eq!(new_status, DesignStatus::Analyzing);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut design = sample();
        design.transition_to(DesignStatus::Analyzing).unwrap();
        design.transition_to(DesignStatus::Failed).unwrap();
        assert!(design.transition_to(DesignStatus::Analyzing).is_none());
        assert!(design.transition_to(DesignStatus::Completed).is_none());
        assert_eq!(design.status, DesignStatus::Failed);
    }

    #[test]
    fn test_fallback_seed_is_stable() {
        let design = sample();
        assert_eq!(design.fallback_seed(), design.clone().fallback_seed());
    }
}
