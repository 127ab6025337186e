//! Prompt assembly for the reasoning loop.
//!
//! Layers, in order:
//!
//! 1. **System**: identity, tool catalogue, output format, language directive
//! 2. **History**: the session's stored turns
//! 3. **User message**: the question of this turn
//! 4. **Scratchpad**: prior replies of this turn with their observations
//!
//! Assembly is deterministic: identical inputs give identical messages.

use crate::context::working_memory::WorkingMemory;
use edupolicy_core::message::Message;
use edupolicy_core::session::Turn;
use edupolicy_core::tool::ToolDescriptor;

/// Action name the model uses to finish.
pub const FINAL_ANSWER_ACTION: &str = "Final Answer";

const IDENTITY: &str = "You are EduPolicyAgent, an AI assistant that helps users understand and \
query university regulations. You can use the following tools: rag_tool (retrieve internal \
regulations), sql_tool (query student records), web_tool (search reputable sources online) and \
summarizer (compress long information). Always think through whether a tool is required before \
answering. Provide clear reasoning and end with a concise answer in Vietnamese.";

/// The system instruction for the given tool catalogue.
pub fn system_prompt(tools: &[ToolDescriptor]) -> String {
    let catalogue = tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");
    let names = tools
        .iter()
        .map(|t| t.name.as_str())
        .chain(std::iter::once(FINAL_ANSWER_ACTION))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{IDENTITY}\n\n\
         ## Tools\n{catalogue}\n\n\
         ## Output format\n\
         Reply with a single JSON blob inside a ```json block:\n\
         ```json\n{{\"action\": \"<one of: {names}>\", \"action_input\": \"<string>\"}}\n```\n\
         You may write one short line starting with \"Thought:\" before the blob. \
         Use one tool per reply and wait for its observation. \
         When you can answer, use the action \"{FINAL_ANSWER_ACTION}\" and put the complete \
         answer, written in Vietnamese, in action_input."
    )
}

/// Feedback sent after a tool ran.
pub fn observation_feedback(observation: &str) -> String {
    format!(
        "Observation: {observation}\n\n\
         Continue. Reply with the next JSON blob, or use \"{FINAL_ANSWER_ACTION}\" if you can answer now."
    )
}

/// Feedback sent after a reply that could not be parsed.
pub fn corrective_feedback(reason: &str) -> String {
    format!(
        "Your previous reply could not be used ({reason}). Reply again with exactly one JSON blob \
         of the form {{\"action\": \"<tool name or {FINAL_ANSWER_ACTION}>\", \"action_input\": \"<string>\"}}."
    )
}

/// Build the full message list for one Thinking step.
pub fn assemble(
    system: &str,
    history: &[Turn],
    user_message: &str,
    working_memory: &WorkingMemory,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(history.iter().map(Turn::to_message));
    messages.push(Message::user(user_message));
    messages.extend(working_memory.render_messages());
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::working_memory::{Action, Step};
    use edupolicy_core::message::Role;
    use edupolicy_core::tool::ToolName;

    fn descriptors() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor { name: ToolName::RagTool, description: "retrieve regulations".into() },
            ToolDescriptor { name: ToolName::WebTool, description: "search the web".into() },
        ]
    }

    #[test]
    fn system_prompt_lists_tools_and_format() {
        let prompt = system_prompt(&descriptors());
        assert!(prompt.starts_with("You are EduPolicyAgent"));
        assert!(prompt.contains("- rag_tool: retrieve regulations\n- web_tool: search the web"));
        assert!(prompt.contains("<one of: rag_tool, web_tool, Final Answer>"));
        assert!(prompt.contains("Vietnamese"));
    }

    #[test]
    fn assemble_orders_layers() {
        let history = vec![Turn::user("Xin chào"), Turn::assistant("Chào bạn")];
        let mut wm = WorkingMemory::new(6);
        wm.record_step(
            "{\"action\": \"rag_tool\"}",
            Step { action: Action::new("rag_tool", "x"), observation: "obs".into(), cached: false },
            observation_feedback("obs"),
        );

        let messages = assemble("SYS", &history, "Học bổng?", &wm);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[3].content, "Học bổng?");
        assert!(messages[5].content.starts_with("Observation: obs"));
    }

    #[test]
    fn assemble_is_deterministic() {
        let wm = WorkingMemory::new(6);
        let a = assemble("SYS", &[], "q", &wm);
        let b = assemble("SYS", &[], "q", &wm);
        assert_eq!(a, b);
    }
}
