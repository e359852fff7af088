//! The three remote capabilities the orchestrator depends on.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::agent::RouterDecision;
use crate::answer::AnswerResult;
use crate::image::ImageAttachment;

/// Failure of a single gateway call. Every variant is terminal for the
/// submission; nothing is retried.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Status(StatusCode),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Backend agents reachable from the client. Each call is exactly-once.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Classify the question and redact sensitive content from it.
    async fn classify(
        &self,
        question: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<RouterDecision, GatewayError>;

    async fn answer_with_image(
        &self,
        question: &str,
        image: &ImageAttachment,
    ) -> Result<AnswerResult, GatewayError>;

    async fn answer_text(&self, question: &str) -> Result<AnswerResult, GatewayError>;
}
