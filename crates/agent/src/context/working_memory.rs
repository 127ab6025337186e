//! Working memory: the scratchpad of a single loop execution.
//!
//! Holds the `(Action, Observation)` trace and the exchange log that is
//! replayed to the model on every Thinking step. Nothing here outlives the
//! turn; only the assembled answer is persisted.

use edupolicy_core::message::Message;
use serde::{Deserialize, Serialize};

/// A tool invocation proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Tool name as proposed (canonical form when it resolved to a tool).
    pub tool: String,
    pub input: String,
}

impl Action {
    pub fn new(tool: impl Into<String>, input: impl Into<String>) -> Self {
        Self { tool: tool.into(), input: input.into() }
    }
}

/// One executed action and what it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub action: Action,
    pub observation: String,
    /// The observation was reused from an identical earlier action.
    pub cached: bool,
}

/// Model reply plus the feedback the loop sent back.
#[derive(Debug, Clone)]
struct Exchange {
    reply: String,
    feedback: String,
}

#[derive(Debug, Clone)]
pub struct WorkingMemory {
    steps: Vec<Step>,
    exchanges: Vec<Exchange>,

    /// Thinking steps taken so far.
    pub iterations: usize,

    pub max_iterations: usize,
}

impl WorkingMemory {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            steps: Vec::new(),
            exchanges: Vec::new(),
            iterations: 0,
            max_iterations,
        }
    }

    /// Start a Thinking step. Returns `false` once the budget is spent.
    pub fn tick(&mut self) -> bool {
        if self.iterations >= self.max_iterations {
            return false;
        }
        self.iterations += 1;
        true
    }

    /// Record an executed action; `feedback` is what the model sees next.
    pub fn record_step(&mut self, reply: &str, step: Step, feedback: String) {
        self.exchanges.push(Exchange { reply: reply.to_string(), feedback });
        self.steps.push(step);
    }

    /// Record a reply that could not be parsed and the corrective instruction.
    pub fn record_correction(&mut self, reply: &str, instruction: String) {
        self.exchanges.push(Exchange { reply: reply.to_string(), feedback: instruction });
    }

    /// The observation of an earlier identical action, if any.
    pub fn previous_observation(&self, action: &Action) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| !s.cached && s.action == *action)
            .map(|s| s.observation.as_str())
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    /// The scratchpad as alternating assistant/user messages.
    pub fn render_messages(&self) -> Vec<Message> {
        self.exchanges
            .iter()
            .flat_map(|e| {
                [
                    Message::assistant(e.reply.clone()),
                    Message::user(e.feedback.clone()),
                ]
            })
            .collect()
    }
}
