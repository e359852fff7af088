use serde::Deserialize;

/// The downstream agent selected by the router for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Multimodal,
    Text,
    Irrelevant,
    /// Any agent name this client does not know; answered by the text agent.
    Unrecognized,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Multimodal => "multimodal_agent",
            AgentKind::Text => "text_agent",
            AgentKind::Irrelevant => "irrelevant",
            AgentKind::Unrecognized => "unrecognized",
        }
    }

    /// Map the router's agent name onto a kind. `qa_agent` is the name older
    /// routers use for the text agent.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "multimodal_agent" => AgentKind::Multimodal,
            "text_agent" | "qa_agent" => AgentKind::Text,
            "irrelevant" => AgentKind::Irrelevant,
            _ => AgentKind::Unrecognized,
        }
    }
}

/// Output of the classification/redaction step. Consumed immediately by the
/// orchestrator and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterDecision {
    pub sanitized_query: String,
    pub agent: AgentKind,
}

impl RouterDecision {
    pub fn new(sanitized_query: impl Into<String>, agent: AgentKind) -> Self {
        Self {
            sanitized_query: sanitized_query.into(),
            agent,
        }
    }
}

/// Router response body as it arrives over the wire
#[derive(Debug, Deserialize)]
pub(crate) struct RouterResponse {
    #[serde(alias = "query")]
    pub sanitized_query: String,
    pub agent: String,
}

impl From<RouterResponse> for RouterDecision {
    fn from(response: RouterResponse) -> Self {
        Self {
            agent: AgentKind::from_wire(&response.agent),
            sanitized_query: response.sanitized_query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_known_agents() {
        assert_eq!(AgentKind::from_wire("multimodal_agent"), AgentKind::Multimodal);
        assert_eq!(AgentKind::from_wire("text_agent"), AgentKind::Text);
        assert_eq!(AgentKind::from_wire("irrelevant"), AgentKind::Irrelevant);
    }

    #[test]
    fn test_from_wire_legacy_and_unknown() {
        assert_eq!(AgentKind::from_wire("qa_agent"), AgentKind::Text);
        assert_eq!(AgentKind::from_wire(" Irrelevant "), AgentKind::Irrelevant);
        assert_eq!(AgentKind::from_wire("sql_agent"), AgentKind::Unrecognized);
    }

    #[test]
    fn test_router_response_accepts_query_alias() {
        let response: RouterResponse =
            serde_json::from_str(r#"{"agent": "qa_agent", "query": "Email [NAME]"}"#).unwrap();
        let decision = RouterDecision::from(response);
        assert_eq!(decision, RouterDecision::new("Email [NAME]", AgentKind::Text));
    }
}
