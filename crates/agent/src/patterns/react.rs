//! ReAct pattern — Thought → Action → Observation loop.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Thinking ──► ActionProposed ──► (observe) ──► Thinking
//!    │
//!    └──────► FinalAnswerProposed ──► Done
//! ```
//!
//! Each `Thinking` step sends the assembled context to the model and parses
//! the reply. Bounds:
//!
//! - at most `max_iterations` Thinking steps; after that the turn ends with
//!   [`FALLBACK_ANSWER`]
//! - at most `max_parse_retries` consecutive malformed replies; one more is
//!   [`AgentError::MalformedOutput`]
//!
//! Tool failures, unknown tools and repeated actions all become observations,
//! so only the model backend and the parser can end a turn with an error.

use edupolicy_core::event::{DomainEvent, EventBus};
use edupolicy_core::provider::{Provider, ProviderRequest};
use edupolicy_core::session::Turn;
use edupolicy_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::context::prompt;
use crate::context::working_memory::{Action, Step, WorkingMemory};
use crate::error::AgentError;
use crate::parser::{self, ParsedReply};

/// Answer used when the iteration budget runs out.
pub const FALLBACK_ANSWER: &str = "Xin lỗi, tôi chưa thể hoàn tất câu trả lời trong giới hạn số \
bước suy luận cho phép. Vui lòng thử diễn đạt lại câu hỏi.";

/// Appended to an observation reused for a repeated action.
pub const REPEAT_NOTE: &str = "(Lưu ý: hành động này đã được thực hiện với cùng đầu vào. \
Hãy sử dụng kết quả trên và không lặp lại hành động này.)";

enum LoopState {
    Thinking,
    ActionProposed { reply: String, action: Action },
    FinalAnswerProposed(String),
    Done(String),
}

pub struct ReactAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
    max_iterations: u32,
    max_parse_retries: u32,
}

/// The result of a ReAct execution.
#[derive(Debug, Clone)]
pub struct ReactResult {
    /// The final answer text.
    pub answer: String,
    /// Executed actions with their observations, in order.
    pub steps: Vec<Step>,
    /// Thinking steps used.
    pub iterations: usize,
    /// The answer is [`FALLBACK_ANSWER`].
    pub hit_iteration_limit: bool,
}

impl ReactAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            tools,
            event_bus,
            max_iterations: 6,
            max_parse_retries: 2,
        }
    }

    /// Set max iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set how many consecutive malformed replies are re-prompted.
    pub fn with_max_parse_retries(mut self, retries: u32) -> Self {
        self.max_parse_retries = retries;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Execute the loop for one user message.
    pub async fn run(
        &self,
        session_id: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<ReactResult, AgentError> {
        let system = prompt::system_prompt(&self.tools.descriptors());
        let mut wm = WorkingMemory::new(self.max_iterations as usize);
        let mut malformed = 0u32;
        let mut hit_iteration_limit = false;
        let mut state = LoopState::Thinking;

        info!(session_id, model = %self.model, max_iter = self.max_iterations, "ReAct loop starting");

        let answer = loop {
            state = match state {
                LoopState::Thinking => {
                    if !wm.tick() {
                        warn!(session_id, "ReAct: max iterations reached ({})", self.max_iterations);
                        hit_iteration_limit = true;
                        break FALLBACK_ANSWER.to_string();
                    }
                    debug!(session_id, iteration = wm.iterations, "ReAct iteration");

                    let mut request = ProviderRequest::new(
                        self.model.clone(),
                        prompt::assemble(&system, history, user_message, &wm),
                    );
                    request.temperature = self.temperature;
                    let reply = self.provider.complete(request).await?.content;

                    match parser::parse_reply(&reply) {
                        Ok(ParsedReply::Action(action)) => {
                            malformed = 0;
                            LoopState::ActionProposed { reply, action }
                        }
                        Ok(ParsedReply::FinalAnswer(answer)) => {
                            malformed = 0;
                            LoopState::FinalAnswerProposed(answer)
                        }
                        Err(e) => {
                            malformed += 1;
                            let reason = e.to_string();
                            if malformed > self.max_parse_retries {
                                warn!(session_id, attempts = malformed, reason = %reason, "Giving up on malformed replies");
                                return Err(AgentError::MalformedOutput {
                                    attempts: malformed,
                                    last_reason: reason,
                                });
                            }
                            warn!(session_id, attempt = malformed, reason = %reason, "Malformed reply; re-prompting");
                            self.event_bus.publish(DomainEvent::ParseErrorRecovered {
                                session_id: session_id.to_string(),
                                attempt: malformed,
                                reason: reason.clone(),
                                timestamp: chrono::Utc::now(),
                            });
                            wm.record_correction(&reply, prompt::corrective_feedback(&reason));
                            LoopState::Thinking
                        }
                    }
                }
                LoopState::ActionProposed { reply, action } => {
                    let step = self.observe(session_id, &wm, action).await;
                    let feedback = prompt::observation_feedback(&step.observation);
                    wm.record_step(&reply, step, feedback);
                    LoopState::Thinking
                }
                LoopState::FinalAnswerProposed(answer) => LoopState::Done(answer),
                LoopState::Done(answer) => break answer,
            };
        };

        let iterations = wm.iterations;
        let steps = wm.into_steps();
        info!(session_id, iterations, tool_calls = steps.len(), "ReAct loop completed");

        Ok(ReactResult { answer, steps, iterations, hit_iteration_limit })
    }

    /// Execute one action, or reuse the observation of an identical one.
    async fn observe(&self, session_id: &str, wm: &WorkingMemory, action: Action) -> Step {
        if let Some(previous) = wm.previous_observation(&action) {
            info!(session_id, tool = %action.tool, "Repeated action; reusing observation");
            self.publish_tool_event(session_id, &action.tool, true, true, 0);
            return Step {
                observation: format!("{previous}\n\n{REPEAT_NOTE}"),
                action,
                cached: true,
            };
        }

        let start = Instant::now();
        let (observation, success) = match self.tools.lookup(&action.tool) {
            Err(_) => {
                warn!(session_id, tool = %action.tool, "Model proposed an unknown tool");
                (self.unknown_tool_observation(&action.tool), false)
            }
            Ok(tool) => match tool.invoke(&action.input).await {
                Ok(output) => (output, true),
                Err(e) => {
                    warn!(session_id, tool = %action.tool, error = %e, "Tool failed");
                    (format!("Công cụ {} gặp lỗi: {e}", action.tool), false)
                }
            },
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(session_id, tool = %action.tool, success, duration_ms, "Tool executed");
        self.publish_tool_event(session_id, &action.tool, success, false, duration_ms);

        Step { action, observation, cached: false }
    }

    fn unknown_tool_observation(&self, name: &str) -> String {
        let valid = self
            .tools
            .names()
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Công cụ '{name}' không tồn tại. Các công cụ hợp lệ: {valid}.")
    }

    fn publish_tool_event(&self, session_id: &str, tool: &str, success: bool, cached: bool, duration_ms: u64) {
        self.event_bus.publish(DomainEvent::ToolExecuted {
            session_id: session_id.to_string(),
            tool_name: tool.to_string(),
            success,
            cached,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::*;
    use edupolicy_core::error::ProviderError;
    use edupolicy_core::message::Role;
    use edupolicy_core::tool::ToolName;

    struct Setup {
        agent: ReactAgent,
        provider: Arc<SequentialMockProvider>,
        rag: Arc<CountingTool>,
        bus: Arc<EventBus>,
    }

    fn setup(replies: Vec<Result<String, ProviderError>>) -> Setup {
        let provider = Arc::new(SequentialMockProvider::new(replies));
        let rag = Arc::new(CountingTool::new(ToolName::RagTool, "Điều 12. Học bổng khuyến khích học tập"));
        let mut registry = ToolRegistry::new();
        registry.register(rag.clone());
        registry.register(Arc::new(CountingTool::failing(ToolName::SqlTool, "database locked")));
        let bus = Arc::new(EventBus::default());
        let agent = ReactAgent::new(provider.clone(), "mock-model", 0.1, Arc::new(registry), bus.clone());
        Setup { agent, provider, rag, bus }
    }

    fn ok(texts: &[String]) -> Vec<Result<String, ProviderError>> {
        texts.iter().cloned().map(Ok).collect()
    }

    #[tokio::test]
    async fn direct_final_answer() {
        let s = setup(ok(&[final_reply("Xin chào!")]));
        let result = s.agent.run("s1", &[], "Chào bạn").await.unwrap();
        assert_eq!(result.answer, "Xin chào!");
        assert_eq!(result.iterations, 1);
        assert!(result.steps.is_empty());
        assert!(!result.hit_iteration_limit);
    }

    #[tokio::test]
    async fn thought_action_observation_trace() {
        let s = setup(ok(&[
            action_reply("rag_tool", "học bổng"),
            final_reply("Sinh viên được xét học bổng theo Điều 12."),
        ]));
        let result = s.agent.run("s1", &[], "Quy định về học bổng?").await.unwrap();

        assert_eq!(result.answer, "Sinh viên được xét học bổng theo Điều 12.");
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].action, Action::new("rag_tool", "học bổng"));
        assert!(result.steps[0].observation.contains("Điều 12"));
        assert_eq!(s.rag.calls(), 1);

        // Second Thinking step sees the observation.
        let requests = s.provider.requests();
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.starts_with("Observation: Điều 12"));
    }

    #[tokio::test]
    async fn history_is_sent_before_user_message() {
        let s = setup(ok(&[final_reply("Có.")]));
        let history = vec![Turn::user("Tôi là sinh viên năm 2"), Turn::assistant("Chào bạn")];
        s.agent.run("s1", &history, "Tôi có được học bổng không?").await.unwrap();

        let request = &s.provider.requests()[0];
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "Tôi là sinh viên năm 2");
        assert_eq!(request.messages[3].content, "Tôi có được học bổng không?");
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn max_iterations_yields_fallback() {
        let replies: Vec<String> = (0..6).map(|i| action_reply("rag_tool", &format!("q{i}"))).collect();
        let s = setup(ok(&replies));

        let result = s.agent.run("s1", &[], "Vòng lặp").await.unwrap();
        assert_eq!(result.answer, FALLBACK_ANSWER);
        assert!(result.hit_iteration_limit);
        assert_eq!(result.iterations, 6);
        assert_eq!(result.steps.len(), 6);
        assert_eq!(s.provider.call_count(), 6);
    }

    #[tokio::test]
    async fn custom_iteration_limit() {
        let replies: Vec<String> = (0..2).map(|i| action_reply("rag_tool", &format!("q{i}"))).collect();
        let s = setup(ok(&replies));
        let agent = s.agent.with_max_iterations(2);
        let result = agent.run("s1", &[], "x").await.unwrap();
        assert_eq!(result.answer, FALLBACK_ANSWER);
        assert_eq!(result.iterations, 2);
    }

    #[tokio::test]
    async fn malformed_reply_is_recovered() {
        let s = setup(ok(&["".to_string(), final_reply("Đã rõ.")]));
        let mut events = s.bus.subscribe();

        let result = s.agent.run("s1", &[], "x").await.unwrap();
        assert_eq!(result.answer, "Đã rõ.");

        let event = events.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::ParseErrorRecovered { attempt: 1, .. }));

        // The corrective instruction is part of the second prompt.
        let requests = s.provider.requests();
        assert!(requests[1].messages.last().unwrap().content.contains("could not be used"));
    }

    #[tokio::test]
    async fn too_many_malformed_replies_fail() {
        let s = setup(ok(&[
            "".to_string(),
            r#"{"action": "rag_tool", "action_input": }"#.to_string(),
            "```json\n{\"action_input\": \"x\"}\n```".to_string(),
        ]));
        let err = s.agent.run("s1", &[], "x").await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedOutput { attempts: 3, .. }));
        assert_eq!(s.provider.call_count(), 3);
    }

    #[tokio::test]
    async fn malformed_counter_resets_after_good_reply() {
        let s = setup(ok(&[
            "".to_string(),
            "".to_string(),
            action_reply("rag_tool", "học bổng"),
            "".to_string(),
            "".to_string(),
            final_reply("Xong."),
        ]));
        let result = s.agent.run("s1", &[], "x").await.unwrap();
        assert_eq!(result.answer, "Xong.");
        assert_eq!(result.iterations, 6);
    }

    #[tokio::test]
    async fn unknown_tool_lists_valid_tools() {
        let s = setup(ok(&[action_reply("calculator", "1+1"), final_reply("Không cần tính.")]));
        let result = s.agent.run("s1", &[], "x").await.unwrap();

        assert_eq!(result.steps.len(), 1);
        let obs = &result.steps[0].observation;
        assert!(obs.contains("'calculator' không tồn tại"));
        assert!(obs.contains("rag_tool, sql_tool"));
    }

    #[tokio::test]
    async fn repeated_action_reuses_observation() {
        let s = setup(ok(&[
            action_reply("rag_tool", "học bổng"),
            action_reply("rag_tool", "học bổng"),
            final_reply("Xong."),
        ]));
        let mut events = s.bus.subscribe();
        let result = s.agent.run("s1", &[], "x").await.unwrap();

        assert_eq!(s.rag.calls(), 1);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps[1].cached);
        assert!(result.steps[1].observation.starts_with("Điều 12"));
        assert!(result.steps[1].observation.ends_with(REPEAT_NOTE));

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        assert!(matches!(&*first, DomainEvent::ToolExecuted { cached: false, success: true, .. }));
        assert!(matches!(&*second, DomainEvent::ToolExecuted { cached: true, .. }));
    }

    #[tokio::test]
    async fn tool_error_becomes_observation() {
        let s = setup(ok(&[action_reply("sql_tool", "bao nhiêu sinh viên"), final_reply("Không truy vấn được.")]));
        let result = s.agent.run("s1", &[], "x").await.unwrap();
        assert_eq!(result.answer, "Không truy vấn được.");
        assert!(result.steps[0].observation.starts_with("Công cụ sql_tool gặp lỗi"));
        assert!(result.steps[0].observation.contains("database locked"));
    }

    #[tokio::test]
    async fn backend_failure_is_fatal() {
        let s = setup(vec![
            Ok(action_reply("rag_tool", "học bổng")),
            Err(ProviderError::Timeout("60s".into())),
        ]);
        let err = s.agent.run("s1", &[], "x").await.unwrap_err();
        assert!(matches!(err, AgentError::Backend(ProviderError::Timeout(_))));
    }
}
