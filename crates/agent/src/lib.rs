//! The EduPolicy agent orchestration core.
//!
//! Each chat turn follows a **Think → Act → Observe** cycle:
//!
//! 1. **Load** the session's prior turns
//! 2. **Think**: send system prompt + history + question + scratchpad to the model
//! 3. **Act**: if the reply proposes a tool, run it and feed the observation back
//! 4. **Answer**: when the reply is a final answer, assemble the response
//! 5. **Commit** the user/assistant pair to the session store in one write
//!
//! The loop stops at a final answer, after `max_iterations` Thinking steps
//! (with a fixed fallback answer), or on a backend failure (nothing committed).

pub mod bootstrap;
pub mod context;
pub mod controller;
pub mod error;
pub mod parser;
pub mod patterns;
pub mod response;

pub use bootstrap::{build_controller, build_controller_with_provider};
pub use context::{Action, Step, WorkingMemory};
pub use controller::{AgentController, AgentSettings, Capabilities};
pub use error::AgentError;
pub use parser::{ParseError, ParsedReply, parse_reply};
pub use patterns::{FALLBACK_ANSWER, ReactAgent, ReactResult};
pub use response::{ChatResponse, ResponseAssembler};
