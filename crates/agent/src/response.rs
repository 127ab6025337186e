//! Response assembly: turns a loop result into the chat response and
//! commits the exchange.

use edupolicy_core::event::{DomainEvent, EventBus};
use edupolicy_core::session::{SessionStore, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::context::working_memory::Step;
use crate::error::AgentError;
use crate::patterns::ReactResult;

/// What a chat turn returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub session_id: String,
    pub reasoning: Vec<String>,
    pub tool_interactions: Vec<String>,
}

/// `Suy nghĩ: sử dụng {tool} với đầu vào {input}`
pub fn reasoning_line(step: &Step) -> String {
    format!(
        "Suy nghĩ: sử dụng {} với đầu vào {}",
        step.action.tool, step.action.input
    )
}

/// Trim, then cut to `max_chars` characters with a trailing `...`.
pub fn truncate_observation(observation: &str, max_chars: usize) -> String {
    let trimmed = observation.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let kept: String = trimmed.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// `[{tool}] {observation}`
pub fn interaction_line(step: &Step, max_chars: usize) -> String {
    format!(
        "[{}] {}",
        step.action.tool,
        truncate_observation(&step.observation, max_chars)
    )
}

pub struct ResponseAssembler {
    store: Arc<dyn SessionStore>,
    event_bus: Arc<EventBus>,
    observation_max_chars: usize,
}

impl ResponseAssembler {
    pub fn new(store: Arc<dyn SessionStore>, event_bus: Arc<EventBus>, observation_max_chars: usize) -> Self {
        Self { store, event_bus, observation_max_chars }
    }

    /// Build the response and persist the user/assistant pair in one write.
    pub async fn commit(
        &self,
        session_id: &str,
        user_message: &str,
        result: ReactResult,
    ) -> Result<ChatResponse, AgentError> {
        let reasoning = result.steps.iter().map(reasoning_line).collect();
        let tool_interactions = result
            .steps
            .iter()
            .map(|s| interaction_line(s, self.observation_max_chars))
            .collect();

        self.store
            .append_exchange(
                session_id,
                Turn::user(user_message),
                Turn::assistant(result.answer.clone()),
            )
            .await?;

        info!(session_id, tool_calls = result.steps.len(), "Turn committed");
        self.event_bus.publish(DomainEvent::TurnCommitted {
            session_id: session_id.to_string(),
            tool_calls: result.steps.len(),
            hit_iteration_limit: result.hit_iteration_limit,
            timestamp: chrono::Utc::now(),
        });

        Ok(ChatResponse {
            answer: result.answer,
            session_id: session_id.to_string(),
            reasoning,
            tool_interactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::working_memory::Action;
    use edupolicy_core::session::TurnRole;
    use edupolicy_memory::InMemoryStore;

    fn step(tool: &str, input: &str, observation: &str) -> Step {
        Step { action: Action::new(tool, input), observation: observation.into(), cached: false }
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_observation("  ngắn  ", 600), "ngắn");

        let exact: String = "ạ".repeat(600);
        assert_eq!(truncate_observation(&exact, 600), exact);

        let long: String = "ạ".repeat(601);
        let cut = truncate_observation(&long, 600);
        assert_eq!(cut.chars().count(), 600);
        assert!(cut.ends_with("ạ..."));
        assert_eq!(cut.chars().filter(|c| *c == 'ạ').count(), 597);
    }

    #[test]
    fn lines_are_formatted() {
        let s = step("rag_tool", "học bổng", "\nĐiều 12\n");
        assert_eq!(reasoning_line(&s), "Suy nghĩ: sử dụng rag_tool với đầu vào học bổng");
        assert_eq!(interaction_line(&s, 600), "[rag_tool] Điều 12");
    }

    #[tokio::test]
    async fn commit_persists_pair_and_publishes() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let assembler = ResponseAssembler::new(store.clone(), bus, 600);

        let result = ReactResult {
            answer: "Theo Điều 12...".into(),
            steps: vec![step("rag_tool", "học bổng", "Điều 12")],
            iterations: 2,
            hit_iteration_limit: false,
        };
        let response = assembler.commit("s1", "Học bổng?", result).await.unwrap();

        assert_eq!(response.session_id, "s1");
        assert_eq!(response.reasoning.len(), 1);
        assert_eq!(response.tool_interactions, vec!["[rag_tool] Điều 12"]);

        let history = store.history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "Học bổng?");
        assert_eq!(history[1].content, "Theo Điều 12...");

        let event = events.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::TurnCommitted { tool_calls: 1, .. }));
    }
}
