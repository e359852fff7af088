//! Routed submission: classify and redact first, then ask the chosen agent.
//!
//! Every step awaits the previous one. The router must see the question
//! before any answering agent does, and the answer call uses the router's
//! sanitized query, never the raw input.

use thiserror::Error;
use tracing::{info, instrument};

use crate::agent::AgentKind;
use crate::answer::AnswerResult;
use crate::gateway::{AgentGateway, GatewayError};
use crate::state::{StateError, SubmissionInput, SubmissionState, SubmissionStore};

pub const REJECTION_MESSAGE: &str =
    "Sorry, I cannot assist with that query. Please ask work-related questions.";
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question";
pub const IMAGE_REQUIRED_MESSAGE: &str = "Please select an image and enter a question";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    InFlight,
}

/// How a submission ended. The same outcome is also visible in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered(AnswerResult),
    /// The router classified the query as irrelevant
    Rejected(String),
    /// A gateway call failed
    Failed(String),
    /// Input was rejected locally; nothing was sent
    Invalid(String),
}

impl SubmitOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Answered(_) => None,
            SubmitOutcome::Rejected(message)
            | SubmitOutcome::Failed(message)
            | SubmitOutcome::Invalid(message) => Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Router,
    Multimodal,
    Chat,
}

impl Stage {
    fn error_prefix(&self) -> &'static str {
        match self {
            Stage::Router => "Router error",
            Stage::Multimodal => "Multimodal API error",
            Stage::Chat => "Chat API error",
        }
    }
}

/// Drives a [`SubmissionStore`] through one routed submission at a time
pub struct Orchestrator<G> {
    store: SubmissionStore,
    gateway: G,
    require_image: bool,
}

impl<G: AgentGateway> Orchestrator<G> {
    pub fn new(store: SubmissionStore, gateway: G) -> Self {
        Self {
            store,
            gateway,
            require_image: false,
        }
    }

    /// Refuse submissions without an attached image, as the image-only
    /// front end did. Off by default.
    pub fn with_image_required(mut self, required: bool) -> Self {
        self.require_image = required;
        self
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Run one submission with the store's current question and image.
    ///
    /// Returns [`SubmitError::InFlight`] without touching the store when a
    /// submission is already running. Every other ending is reported through
    /// the store and echoed in the returned [`SubmitOutcome`].
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let input = match self
            .store
            .begin_validated_submission(|state| self.validate(state))
        {
            Ok(input) => input,
            Err(StateError::InvalidInput(message)) => {
                return Ok(SubmitOutcome::Invalid(message.to_string()));
            }
            Err(StateError::SubmissionInFlight) => return Err(SubmitError::InFlight),
        };

        Ok(self.route(input).await)
    }

    fn validate(&self, state: &SubmissionState) -> Option<&'static str> {
        let blank = state.question_text.trim().is_empty();

        if self.require_image && (blank || state.attached_image.is_none()) {
            Some(IMAGE_REQUIRED_MESSAGE)
        } else if blank {
            Some(EMPTY_QUESTION_MESSAGE)
        } else {
            None
        }
    }

    #[instrument(skip_all, fields(has_image = input.image.is_some()))]
    async fn route(&self, input: SubmissionInput) -> SubmitOutcome {
        let decision = match self
            .gateway
            .classify(&input.question, input.image.as_ref())
            .await
        {
            Ok(decision) => decision,
            Err(e) => return self.fail(Stage::Router, e),
        };
        info!(agent = decision.agent.as_str(), "router selected agent");

        let answer = match (decision.agent, input.image.as_ref()) {
            (AgentKind::Irrelevant, _) => {
                self.store.complete_as_rejected(REJECTION_MESSAGE);
                return SubmitOutcome::Rejected(REJECTION_MESSAGE.to_string());
            }
            (AgentKind::Multimodal, Some(image)) => self
                .gateway
                .answer_with_image(&decision.sanitized_query, image)
                .await
                .map_err(|e| (Stage::Multimodal, e)),
            // Includes a multimodal pick with nothing attached
            _ => self
                .gateway
                .answer_text(&decision.sanitized_query)
                .await
                .map_err(|e| (Stage::Chat, e)),
        };

        match answer {
            Ok(answer) => {
                info!(
                    input_tokens = answer.usage.input_tokens,
                    output_tokens = answer.usage.output_tokens,
                    "answer received"
                );
                self.store.complete_with_result(answer.clone());
                SubmitOutcome::Answered(answer)
            }
            Err((stage, e)) => self.fail(stage, e),
        }
    }

    fn fail(&self, stage: Stage, err: GatewayError) -> SubmitOutcome {
        let message = format!("{}: {}", stage.error_prefix(), err);
        self.store.complete_with_error(message.clone());
        SubmitOutcome::Failed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RouterDecision;
    use crate::answer::TokenUsage;
    use crate::image::ImageAttachment;
    use crate::preview::DataUrlPreview;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Classify { question: String, has_image: bool },
        AnswerWithImage { question: String, image: String },
        AnswerText { question: String },
    }

    /// Gateway that replays canned results and records every call
    struct ScriptedGateway {
        decision: Result<RouterDecision, StatusCode>,
        answer: Result<AnswerResult, StatusCode>,
        calls: Mutex<Vec<Call>>,
        hold_classify: Option<Arc<Notify>>,
    }

    impl ScriptedGateway {
        fn routing_to(agent: AgentKind, sanitized: &str) -> Self {
            Self {
                decision: Ok(RouterDecision::new(sanitized, agent)),
                answer: Ok(AnswerResult::new(sanitized, "42", TokenUsage::new(3, 4, 7))),
                calls: Mutex::new(Vec::new()),
                hold_classify: None,
            }
        }

        fn router_failing(status: StatusCode) -> Self {
            Self {
                decision: Err(status),
                ..Self::routing_to(AgentKind::Text, "")
            }
        }

        fn answering(mut self, answer: Result<AnswerResult, StatusCode>) -> Self {
            self.answer = answer;
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AgentGateway for ScriptedGateway {
        async fn classify(
            &self,
            question: &str,
            image: Option<&ImageAttachment>,
        ) -> Result<RouterDecision, GatewayError> {
            self.record(Call::Classify {
                question: question.to_string(),
                has_image: image.is_some(),
            });
            if let Some(gate) = &self.hold_classify {
                gate.notified().await;
            }
            self.decision.clone().map_err(GatewayError::Status)
        }

        async fn answer_with_image(
            &self,
            question: &str,
            image: &ImageAttachment,
        ) -> Result<AnswerResult, GatewayError> {
            self.record(Call::AnswerWithImage {
                question: question.to_string(),
                image: image.file_name().to_string(),
            });
            self.answer.clone().map_err(GatewayError::Status)
        }

        async fn answer_text(&self, question: &str) -> Result<AnswerResult, GatewayError> {
            self.record(Call::AnswerText {
                question: question.to_string(),
            });
            self.answer.clone().map_err(GatewayError::Status)
        }
    }

    fn cat_image() -> ImageAttachment {
        ImageAttachment::new("cat.png", b"meow".to_vec())
    }

    async fn store_with(question: &str, image: Option<ImageAttachment>) -> SubmissionStore {
        let store = SubmissionStore::new();
        store.set_question_text(question);
        store.set_attached_image(image, &DataUrlPreview).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_blank_question_never_reaches_network() {
        for question in ["", "   ", "\n\t "] {
            let store = store_with(question, Some(cat_image())).await;
            let orchestrator =
                Orchestrator::new(store, ScriptedGateway::routing_to(AgentKind::Text, "x"));

            let outcome = orchestrator.submit().await.unwrap();

            assert_eq!(outcome, SubmitOutcome::Invalid(EMPTY_QUESTION_MESSAGE.to_string()));
            assert_eq!(orchestrator.gateway().calls(), vec![]);
            let state = orchestrator.store().snapshot();
            assert_eq!(state.error_message.as_deref(), Some(EMPTY_QUESTION_MESSAGE));
            assert!(!state.is_loading);
            assert_eq!(state.question_text, question);
        }
    }

    #[tokio::test]
    async fn test_blank_resubmit_after_answer_clears_response() {
        let store = store_with("How do I file expenses?", None).await;
        let orchestrator =
            Orchestrator::new(store, ScriptedGateway::routing_to(AgentKind::Text, "q"));
        orchestrator.submit().await.unwrap();
        assert!(orchestrator.store().snapshot().last_response.is_some());

        orchestrator.store().set_question_text("   ");
        let outcome = orchestrator.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Invalid(EMPTY_QUESTION_MESSAGE.to_string()));
        assert_eq!(orchestrator.gateway().calls().len(), 2);
        let state = orchestrator.store().snapshot();
        assert_eq!(state.last_response, None);
        assert_eq!(state.error_message.as_deref(), Some(EMPTY_QUESTION_MESSAGE));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_text_only_question_is_allowed_by_default() {
        let store = store_with("How do I file expenses?", None).await;
        let orchestrator = Orchestrator::new(
            store,
            ScriptedGateway::routing_to(AgentKind::Text, "How do I file expenses?"),
        );

        let outcome = orchestrator.submit().await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        assert_eq!(
            orchestrator.gateway().calls(),
            vec![
                Call::Classify {
                    question: "How do I file expenses?".to_string(),
                    has_image: false
                },
                Call::AnswerText {
                    question: "How do I file expenses?".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_image_required_variant() {
        let store = store_with("What is this?", None).await;
        let orchestrator = Orchestrator::new(store, ScriptedGateway::routing_to(AgentKind::Text, "x"))
            .with_image_required(true);

        let outcome = orchestrator.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Invalid(IMAGE_REQUIRED_MESSAGE.to_string()));
        assert_eq!(orchestrator.gateway().calls(), vec![]);
    }

    #[tokio::test]
    async fn test_multimodal_scenario_clears_form() {
        let answer = AnswerResult::new("What is in this picture?", "A cat.", TokenUsage::new(10, 5, 15));
        let gateway = ScriptedGateway::routing_to(AgentKind::Multimodal, "What is in this picture?")
            .answering(Ok(answer.clone()));
        let store = store_with("What is in this picture?", Some(cat_image())).await;
        let orchestrator = Orchestrator::new(store, gateway);

        let outcome = orchestrator.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Answered(answer.clone()));
        assert_eq!(
            orchestrator.gateway().calls(),
            vec![
                Call::Classify {
                    question: "What is in this picture?".to_string(),
                    has_image: true
                },
                Call::AnswerWithImage {
                    question: "What is in this picture?".to_string(),
                    image: "cat.png".to_string()
                },
            ]
        );

        let state = orchestrator.store().snapshot();
        assert_eq!(state.last_response, Some(answer));
        assert_eq!(state.question_text, "");
        assert_eq!(state.attached_image, None);
        assert_eq!(state.image_preview, None);
        assert_eq!(state.error_message, None);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_answer_uses_sanitized_query() {
        let gateway = ScriptedGateway::routing_to(AgentKind::Text, "Summarize the email from [NAME]");
        let store = store_with("Summarize the email from Manuel Tena", None).await;
        let orchestrator = Orchestrator::new(store, gateway);

        orchestrator.submit().await.unwrap();

        assert_eq!(
            orchestrator.gateway().calls().last(),
            Some(&Call::AnswerText {
                question: "Summarize the email from [NAME]".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_multimodal_without_image_falls_back_to_text() {
        let gateway = ScriptedGateway::routing_to(AgentKind::Multimodal, "Describe the chart");
        let store = store_with("Describe the chart", None).await;
        let orchestrator = Orchestrator::new(store, gateway);

        let outcome = orchestrator.submit().await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        let calls = orchestrator.gateway().calls();
        assert!(calls.iter().all(|call| !matches!(call, Call::AnswerWithImage { .. })));
        assert_eq!(
            calls.last(),
            Some(&Call::AnswerText {
                question: "Describe the chart".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_text_agent_ignores_attached_image() {
        let gateway = ScriptedGateway::routing_to(AgentKind::Text, "Draft a reply");
        let store = store_with("Draft a reply", Some(cat_image())).await;
        let orchestrator = Orchestrator::new(store, gateway);

        orchestrator.submit().await.unwrap();

        assert_eq!(
            orchestrator.gateway().calls().last(),
            Some(&Call::AnswerText {
                question: "Draft a reply".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unrecognized_agent_uses_text_path() {
        let gateway = ScriptedGateway::routing_to(AgentKind::Unrecognized, "q");
        let store = store_with("q", Some(cat_image())).await;
        let orchestrator = Orchestrator::new(store, gateway);

        orchestrator.submit().await.unwrap();

        assert!(matches!(
            orchestrator.gateway().calls().last(),
            Some(Call::AnswerText { .. })
        ));
    }

    #[tokio::test]
    async fn test_irrelevant_query_is_refused_without_answer_call() {
        let gateway = ScriptedGateway::routing_to(AgentKind::Irrelevant, "irrelevant nonsense");
        let store = store_with("irrelevant nonsense", None).await;
        let orchestrator = Orchestrator::new(store, gateway);

        let outcome = orchestrator.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Rejected(REJECTION_MESSAGE.to_string()));
        assert_eq!(orchestrator.gateway().calls().len(), 1);
        let state = orchestrator.store().snapshot();
        assert_eq!(state.error_message.as_deref(), Some(REJECTION_MESSAGE));
        assert_eq!(state.last_response, None);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_router_failure_keeps_input() {
        let gateway = ScriptedGateway::router_failing(StatusCode::INTERNAL_SERVER_ERROR);
        let store = store_with("What is in this picture?", Some(cat_image())).await;
        let orchestrator = Orchestrator::new(store, gateway);

        let outcome = orchestrator.submit().await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Failed("Router error: 500 Internal Server Error".to_string())
        );
        assert_eq!(orchestrator.gateway().calls().len(), 1);

        let state = orchestrator.store().snapshot();
        assert!(state.error_message.as_deref().unwrap().starts_with("Router error:"));
        assert_eq!(state.last_response, None);
        assert!(!state.is_loading);
        assert_eq!(state.question_text, "What is in this picture?");
        assert_eq!(state.attached_image, Some(cat_image()));
    }

    #[tokio::test]
    async fn test_answer_failures_name_the_agent() {
        let cases = [
            (AgentKind::Multimodal, "Multimodal API error: 502 Bad Gateway"),
            (AgentKind::Text, "Chat API error: 502 Bad Gateway"),
        ];

        for (agent, expected) in cases {
            let gateway = ScriptedGateway::routing_to(agent, "q").answering(Err(StatusCode::BAD_GATEWAY));
            let store = store_with("q", Some(cat_image())).await;
            let orchestrator = Orchestrator::new(store, gateway);

            let outcome = orchestrator.submit().await.unwrap();

            assert_eq!(outcome, SubmitOutcome::Failed(expected.to_string()));
            let state = orchestrator.store().snapshot();
            assert_eq!(state.error_message.as_deref(), Some(expected));
            assert_eq!(state.last_response, None);
            assert_eq!(state.question_text, "q");
            assert_eq!(state.attached_image, Some(cat_image()));
        }
    }

    #[tokio::test]
    async fn test_resubmit_after_failure_clears_error() {
        let store = store_with("q", None).await;
        let failing = Orchestrator::new(
            store.clone(),
            ScriptedGateway::router_failing(StatusCode::SERVICE_UNAVAILABLE),
        );
        failing.submit().await.unwrap();
        assert!(store.snapshot().error_message.is_some());

        let working = Orchestrator::new(store.clone(), ScriptedGateway::routing_to(AgentKind::Text, "q"));
        working.submit().await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.error_message, None);
        assert!(state.last_response.is_some());
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let gateway = ScriptedGateway {
            hold_classify: Some(gate.clone()),
            ..ScriptedGateway::routing_to(AgentKind::Text, "q")
        };
        let store = store_with("q", None).await;
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), gateway));

        let mut rx = store.subscribe();
        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.submit().await }
        });
        rx.wait_for(|state| state.is_loading).await.unwrap();

        assert_eq!(orchestrator.submit().await, Err(SubmitError::InFlight));
        assert!(store.is_loading());

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        assert_eq!(orchestrator.gateway().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_loading_visible_while_awaiting_router() {
        let gate = Arc::new(Notify::new());
        let gateway = ScriptedGateway {
            hold_classify: Some(gate.clone()),
            ..ScriptedGateway::routing_to(AgentKind::Text, "q")
        };
        let store = store_with("q", None).await;
        store.complete_with_error("stale");
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), gateway));

        let mut rx = store.subscribe();
        let task = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.submit().await }
        });

        let state = rx.wait_for(|state| state.is_loading).await.unwrap().clone();
        assert_eq!(state.error_message, None);
        assert_eq!(state.last_response, None);

        gate.notify_one();
        task.await.unwrap().unwrap();
    }
}
