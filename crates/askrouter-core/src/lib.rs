pub mod agent;
pub mod answer;
pub mod config;
pub mod gateway;
pub mod http;
pub mod image;
pub mod orchestrator;
pub mod preview;
pub mod state;

// Re-export main types for convenience
pub use agent::{AgentKind, RouterDecision};
pub use answer::{AnswerResult, TokenUsage};
pub use config::{Config, UrlSource};
pub use gateway::{AgentGateway, GatewayError};
pub use http::{HealthStatus, HttpGateway};
pub use image::ImageAttachment;
pub use orchestrator::{Orchestrator, SubmitError, SubmitOutcome, REJECTION_MESSAGE};
pub use preview::{DataUrlPreview, PreviewRenderer};
pub use state::{StateError, SubmissionState, SubmissionStatus, SubmissionStore};
