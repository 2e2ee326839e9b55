//! HTTP API handlers for furni-ai

pub mod designs;
pub mod flowise_proxy;
pub mod health;
pub mod sse;
pub mod suppliers;

pub use designs::design_routes;
pub use flowise_proxy::flowise_routes;
pub use health::health_routes;
pub use sse::design_event_stream;
pub use suppliers::supplier_routes;
