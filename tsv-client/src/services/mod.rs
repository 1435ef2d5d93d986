//! Services for the validation client
//!
//! - Validation Service HTTP client and transport seam
//! - Response decomposition
//! - Validation cycle orchestration

pub mod decomposer;
pub mod orchestrator;
pub mod service_client;

pub use decomposer::{decompose, decompose_bytes};
pub use orchestrator::ValidationOrchestrator;
pub use service_client::{DownloadedReport, ServiceClient, ValidationTransport};
