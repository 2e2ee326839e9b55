//! Service modules for the design analysis pipeline

pub mod blob_store;
pub mod fallback_analyzer;
pub mod flowise_client;
pub mod price_comparison;
pub mod result_normalizer;
pub mod status_poller;
pub mod upload_orchestrator;

pub use blob_store::LocalBlobStore;
pub use flowise_client::{FlowiseClient, FlowiseRequest, FlowiseUpload, TraceSummary};
pub use result_normalizer::{AnalysisSource, FallbackInput, NormalizedAnalysis, RawAnalysis};
pub use status_poller::{AnalysisPoller, PollError, PollOutcome, PollSettings};
pub use upload_orchestrator::{SubmittedAnalysis, UploadOrchestrator, UploadRequest};
