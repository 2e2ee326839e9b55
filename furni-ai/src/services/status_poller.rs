//! Analysis status poller
//!
//! Waits for the analysis of one design to finish. After an initial delay it
//! checks the repository at a fixed interval until the result appears, the
//! design fails or disappears, the attempt budget runs out, or the caller
//! cancels. Attempts run strictly one after another.

use std::sync::Arc;
use std::time::Duration;

use furni_common::config::PollingConfig;
use furni_common::events::DesignStatus;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::AnalysisPayload;
use crate::types::DesignRepository;

/// Timing of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub initial_delay: Duration,
    pub interval: Duration,
    /// Always at least 1
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollingConfig::default().into()
    }
}

impl From<PollingConfig> for PollSettings {
    fn from(config: PollingConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Why waiting ended without a result
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Design {0} not found")]
    DesignNotFound(Uuid),

    #[error("Analysis of design {0} failed")]
    AnalysisFailed(Uuid),

    #[error("Analysis not ready after {attempts} attempts")]
    TimedOut { attempts: u32 },

    #[error("Polling cancelled")]
    Cancelled,

    #[error("Store error while polling: {0}")]
    Store(#[from] furni_common::Error),
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Ready(AnalysisPayload),
    Pending(DesignStatus),
}

/// Polls the repository for a design's analysis
#[derive(Clone)]
pub struct AnalysisPoller {
    repository: Arc<dyn DesignRepository>,
    settings: PollSettings,
}

impl AnalysisPoller {
    pub fn new(repository: Arc<dyn DesignRepository>, settings: PollSettings) -> Self {
        Self { repository, settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// One attempt: the payload if present, else the current status.
    /// Terminal non-success is returned as an error.
    pub async fn poll_once(&self, design_id: Uuid) -> Result<PollOutcome, PollError> {
        if let Some(analysis) = self.repository.find_analysis(design_id).await? {
            let materials = self.repository.list_materials(analysis.id).await?;
            return Ok(PollOutcome::Ready(AnalysisPayload { analysis, materials }));
        }

        match self.repository.get_design(design_id).await? {
            None => Err(PollError::DesignNotFound(design_id)),
            Some(design) if design.status == DesignStatus::Failed => {
                Err(PollError::AnalysisFailed(design_id))
            }
            Some(design) => Ok(PollOutcome::Pending(design.status)),
        }
    }

    /// Wait until the analysis of `design_id` is available
    pub async fn wait_for_analysis(
        &self,
        design_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<AnalysisPayload, PollError> {
        debug!(
            design_id = %design_id,
            initial_delay_ms = self.settings.initial_delay.as_millis() as u64,
            interval_ms = self.settings.interval.as_millis() as u64,
            max_attempts = self.settings.max_attempts,
            "Waiting for analysis"
        );

        sleep_or_cancel(self.settings.initial_delay, cancel).await?;

        for attempt in 1..=self.settings.max_attempts {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                outcome = self.poll_once(design_id) => outcome?,
            };

            match outcome {
                PollOutcome::Ready(payload) => {
                    info!(
                        design_id = %design_id,
                        attempt,
                        materials = payload.materials.len(),
                        "Analysis ready"
                    );
                    return Ok(payload);
                }
                PollOutcome::Pending(status) => {
                    debug!(design_id = %design_id, attempt, status = %status, "Analysis not ready");
                }
            }

            if attempt < self.settings.max_attempts {
                sleep_or_cancel(self.settings.interval, cancel).await?;
            }
        }

        warn!(
            design_id = %design_id,
            attempts = self.settings.max_attempts,
            "Gave up waiting for analysis"
        );
        Err(PollError::TimedOut {
            attempts: self.settings.max_attempts,
        })
    }
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), PollError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PollError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Design, Difficulty, FurnitureAnalysis, Material};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Reports "analyzing" until `ready_after` lookups, then the payload
    struct ScriptedRepository {
        design: Mutex<Option<Design>>,
        ready_after: u32,
        lookups: AtomicU32,
    }

    impl ScriptedRepository {
        fn new(design: Option<Design>, ready_after: u32) -> Self {
            Self {
                design: Mutex::new(design),
                ready_after,
                lookups: AtomicU32::new(0),
            }
        }

        fn result_for(design_id: Uuid) -> AnalysisResult {
            AnalysisResult {
                id: Uuid::nil(),
                design_id,
                ai_description: "desk".to_string(),
                estimated_cost_min: 10.0,
                estimated_cost_max: 20.0,
                difficulty_level: Difficulty::Beginner,
                estimated_time_hours: 2.0,
                style_category: "modern".to_string(),
                raw_ai_response: serde_json::Value::Null,
                created_at: chrono::Utc::now(),
            }
        }
    }

    #[async_trait::async_trait]
    impl DesignRepository for ScriptedRepository {
        async fn create_design(&self, _design: &Design) -> furni_common::Result<()> {
            Ok(())
        }

        async fn get_design(&self, _id: Uuid) -> furni_common::Result<Option<Design>> {
            Ok(self.design.lock().unwrap().clone())
        }

        async fn list_designs(&self) -> furni_common::Result<Vec<Design>> {
            Ok(self.design.lock().unwrap().iter().cloned().collect())
        }

        async fn update_status(&self, _id: Uuid, status: DesignStatus) -> furni_common::Result<bool> {
            if let Some(design) = self.design.lock().unwrap().as_mut() {
                design.status = status;
            }
            Ok(true)
        }

        async fn complete_analysis(
            &self,
            _design_id: Uuid,
            _analysis: &FurnitureAnalysis,
            _raw: &serde_json::Value,
        ) -> furni_common::Result<AnalysisPayload> {
            unreachable!("poller never writes")
        }

        async fn find_analysis(&self, design_id: Uuid) -> furni_common::Result<Option<AnalysisResult>> {
            let lookups = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((lookups > self.ready_after).then(|| Self::result_for(design_id)))
        }

        async fn list_materials(&self, _analysis_id: Uuid) -> furni_common::Result<Vec<Material>> {
            Ok(Vec::new())
        }
    }

    fn fast() -> PollSettings {
        PollSettings {
            initial_delay: Duration::from_millis(1),
            interval: Duration::from_millis(1),
            max_attempts: 5,
        }
    }

    fn analyzing_design() -> Design {
        let mut design = Design::new("Desk", None, "http://x/desk.png", None);
        design.transition_to(DesignStatus::Analyzing);
        design
    }

    #[test]
    fn test_settings_from_config() {
        let settings = PollSettings::default();
        assert_eq!(settings.initial_delay, Duration::from_millis(3000));
        assert_eq!(settings.interval, Duration::from_millis(2000));
        assert_eq!(settings.max_attempts, 90);

        let zero = PollSettings::from(PollingConfig {
            max_attempts: 0,
            ..PollingConfig::default()
        });
        assert_eq!(zero.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_returns_payload_once_ready() {
        let design = analyzing_design();
        let id = design.id;
        let repo = Arc::new(ScriptedRepository::new(Some(design), 2));
        let poller = AnalysisPoller::new(repo.clone(), fast());

        let payload = poller
            .wait_for_analysis(id, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(payload.analysis.design_id, id);
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_design_stops_polling() {
        let mut design = analyzing_design();
        design.transition_to(DesignStatus::Failed);
        let id = design.id;
        let poller = AnalysisPoller::new(Arc::new(ScriptedRepository::new(Some(design), u32::MAX)), fast());

        let err = poller.wait_for_analysis(id, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PollError::AnalysisFailed(failed) if failed == id));
    }

    #[tokio::test]
    async fn test_missing_design() {
        let id = Uuid::new_v4();
        let poller = AnalysisPoller::new(Arc::new(ScriptedRepository::new(None, u32::MAX)), fast());

        let err = poller.wait_for_analysis(id, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PollError::DesignNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_attempt_budget() {
        let design = analyzing_design();
        let id = design.id;
        let repo = Arc::new(ScriptedRepository::new(Some(design), u32::MAX));
        let poller = AnalysisPoller::new(repo.clone(), fast());

        let err = poller.wait_for_analysis(id, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PollError::TimedOut { attempts: 5 }));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_cancel_during_initial_delay() {
        let design = analyzing_design();
        let id = design.id;
        let repo = Arc::new(ScriptedRepository::new(Some(design), 0));
        let poller = AnalysisPoller::new(
            repo.clone(),
            PollSettings {
                initial_delay: Duration::from_secs(60),
                ..fast()
            },
        );

        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });

        let err = poller.wait_for_analysis(id, &cancel).await.unwrap_err();
        assert!(matches!(err, PollError::Cancelled));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 0, "no attempt after cancel");
    }

    #[tokio::test]
    async fn test_poll_once_reports_status() {
        let design = analyzing_design();
        let id = design.id;
        let poller = AnalysisPoller::new(Arc::new(ScriptedRepository::new(Some(design), u32::MAX)), fast());

        assert_eq!(
            poller.poll_once(id).await.unwrap(),
            PollOutcome::Pending(DesignStatus::Analyzing)
        );
    }
}
