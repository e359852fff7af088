use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{RouterDecision, RouterResponse};
use crate::answer::AnswerResult;
use crate::config::Config;
use crate::gateway::{AgentGateway, GatewayError};
use crate::image::ImageAttachment;

#[derive(Serialize)]
struct TextQuestionRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Talks to the agent backend over HTTP
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, GatewayError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl AgentGateway for HttpGateway {
    async fn classify(
        &self,
        question: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<RouterDecision, GatewayError> {
        let url = format!("{}/router/ask", self.base_url);

        let mut form = Form::new().text("question", question.to_string());
        if let Some(image) = image {
            form = form.part("image", image_part(image)?);
        }
        debug!(url = %url, has_image = image.is_some(), "classifying question");

        let response = self.client.post(&url).multipart(form).send().await?;
        let router_response: RouterResponse = decode(response).await?;
        Ok(router_response.into())
    }

    async fn answer_with_image(
        &self,
        question: &str,
        image: &ImageAttachment,
    ) -> Result<AnswerResult, GatewayError> {
        let url = format!("{}/multimodal/ask-with-image", self.base_url);

        let form = Form::new()
            .text("question", question.to_string())
            .part("image", image_part(image)?);
        debug!(url = %url, bytes = image.len(), "asking multimodal agent");

        let response = self.client.post(&url).multipart(form).send().await?;
        decode(response).await
    }

    async fn answer_text(&self, question: &str) -> Result<AnswerResult, GatewayError> {
        let url = format!("{}/chat/ask", self.base_url);
        debug!(url = %url, "asking text agent");

        let response = self
            .client
            .post(&url)
            .json(&TextQuestionRequest { question })
            .send()
            .await?;
        decode(response).await
    }
}

fn image_part(image: &ImageAttachment) -> Result<Part, GatewayError> {
    let part = Part::bytes(image.bytes().to_vec())
        .file_name(image.file_name().to_string())
        .mime_str(image.content_type())?;
    Ok(part)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Status(status));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}
