//! Submission state shared between a front end and the orchestrator
//!
//! The store owns one [`SubmissionState`] for the life of a session. Front ends
//! mutate it through the setters and observe every transition through
//! [`SubmissionStore::subscribe`]; the orchestrator drives the lifecycle
//! transitions (`begin_submission` / `complete_*`).

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::answer::AnswerResult;
use crate::image::ImageAttachment;
use crate::preview::PreviewRenderer;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("{0}")]
    InvalidInput(&'static str),
}

/// Everything a user has entered plus the outcome of the last submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub question_text: String,
    pub attached_image: Option<ImageAttachment>,
    pub image_preview: Option<String>,
    pub last_response: Option<AnswerResult>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    // Bumped whenever the attached image changes; stale previews are dropped.
    image_revision: u64,
}

/// Coarse lifecycle view over [`SubmissionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    InFlight,
    Answered,
    Failed,
}

impl SubmissionState {
    pub fn status(&self) -> SubmissionStatus {
        if self.is_loading {
            SubmissionStatus::InFlight
        } else if self.error_message.is_some() {
            SubmissionStatus::Failed
        } else if self.last_response.is_some() {
            SubmissionStatus::Answered
        } else {
            SubmissionStatus::Idle
        }
    }

    pub fn attached_file_name(&self) -> Option<&str> {
        self.attached_image.as_ref().map(|image| image.file_name())
    }
}

/// Input captured at the moment a submission starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionInput {
    pub question: String,
    pub image: Option<ImageAttachment>,
}

/// Cloneable handle to a session's [`SubmissionState`]
#[derive(Clone)]
pub struct SubmissionStore {
    tx: Arc<watch::Sender<SubmissionState>>,
}

impl Default for SubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SubmissionState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SubmissionState {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> SubmissionStatus {
        self.tx.borrow().status()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading
    }

    pub fn attached_file_name(&self) -> Option<String> {
        self.tx.borrow().attached_file_name().map(str::to_string)
    }

    pub fn set_question_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.tx.send_modify(|state| state.question_text = text);
    }

    /// Attach an image (or clear it with `None`).
    ///
    /// The image is stored and the error cleared right away; the preview is
    /// filled in once `renderer` finishes. If the image is replaced or cleared
    /// while the preview renders, the late preview is discarded.
    pub async fn set_attached_image(
        &self,
        image: Option<ImageAttachment>,
        renderer: &dyn PreviewRenderer,
    ) -> Result<(), StateError> {
        let Some(image) = image else {
            return self.clear_image();
        };

        let pending = image.clone();
        let revision = self.try_modify(|state| {
            if state.is_loading {
                return Err(StateError::SubmissionInFlight);
            }
            state.image_revision += 1;
            state.attached_image = Some(image);
            state.image_preview = None;
            state.error_message = None;
            Ok(state.image_revision)
        })?;
        debug!(file = pending.file_name(), bytes = pending.len(), "image attached");

        let preview = match renderer.render(&pending).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                warn!(file = pending.file_name(), "failed to render preview: {e}");
                None
            }
        };

        self.tx.send_if_modified(|state| {
            if state.image_revision != revision {
                debug!(file = pending.file_name(), "discarding stale preview");
                return false;
            }
            state.image_preview = preview;
            true
        });
        Ok(())
    }

    /// Clear the attached image and its preview; the question is kept.
    pub fn clear_image(&self) -> Result<(), StateError> {
        self.try_modify(|state| {
            if state.is_loading {
                return Err(StateError::SubmissionInFlight);
            }
            state.image_revision += 1;
            state.attached_image = None;
            state.image_preview = None;
            Ok(())
        })
    }

    /// Enter the in-flight state and capture the input to submit.
    ///
    /// Fails without touching the state if a submission is already running.
    pub fn begin_submission(&self) -> Result<SubmissionInput, StateError> {
        self.begin_validated_submission(|_| None)
    }

    /// Like [`begin_submission`](Self::begin_submission), but first runs
    /// `validate` against the same state it would submit.
    ///
    /// A message from `validate` fails the submission locally: it becomes the
    /// error, the previous response is cleared, the input is kept, and
    /// [`StateError::InvalidInput`] is returned.
    pub fn begin_validated_submission(
        &self,
        validate: impl FnOnce(&SubmissionState) -> Option<&'static str>,
    ) -> Result<SubmissionInput, StateError> {
        let mut outcome = Err(StateError::SubmissionInFlight);
        self.tx.send_if_modified(|state| {
            if state.is_loading {
                return false;
            }
            if let Some(message) = validate(state) {
                warn!("submission rejected locally: {message}");
                state.error_message = Some(message.to_string());
                state.last_response = None;
                outcome = Err(StateError::InvalidInput(message));
                return true;
            }
            state.is_loading = true;
            state.error_message = None;
            state.last_response = None;
            outcome = Ok(SubmissionInput {
                question: state.question_text.clone(),
                image: state.attached_image.clone(),
            });
            true
        });
        outcome
    }

    /// Store the answer and reset the form.
    pub fn complete_with_result(&self, result: AnswerResult) {
        self.tx.send_modify(|state| {
            state.last_response = Some(result);
            state.is_loading = false;
            state.question_text.clear();
            state.image_revision += 1;
            state.attached_image = None;
            state.image_preview = None;
        });
    }

    /// Record a failure. The question and image stay so the user can retry.
    pub fn complete_with_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("submission failed: {message}");
        self.finish_with_message(message);
    }

    /// Record a refusal of the query. Shown to the user like an error.
    pub fn complete_as_rejected(&self, message: impl Into<String>) {
        let message = message.into();
        info!("submission refused: {message}");
        self.finish_with_message(message);
    }

    fn finish_with_message(&self, message: String) {
        self.tx.send_modify(|state| {
            state.error_message = Some(message);
            state.last_response = None;
            state.is_loading = false;
        });
    }

    // Runs `f` against the state, notifying observers only when it succeeds.
    // `f` must leave the state untouched when it returns an error.
    fn try_modify<R>(
        &self,
        f: impl FnOnce(&mut SubmissionState) -> Result<R, StateError>,
    ) -> Result<R, StateError> {
        let mut outcome = Err(StateError::SubmissionInFlight);
        self.tx.send_if_modified(|state| {
            outcome = f(state);
            outcome.is_ok()
        });
        outcome
    }
}
