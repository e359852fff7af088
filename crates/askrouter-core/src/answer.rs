use serde::{Deserialize, Serialize};

/// Token accounting reported by the answering agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(rename = "input")]
    pub input_tokens: u64,
    #[serde(rename = "output")]
    pub output_tokens: u64,
    #[serde(rename = "total")]
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// An answer from either downstream agent. The shape is the same whichever
/// agent produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question: String,
    pub answer: String,
    // The text agent may omit usage entirely
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<u32>,
}

impl AnswerResult {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            usage,
            file_type: None,
            pages_processed: None,
        }
    }
}
