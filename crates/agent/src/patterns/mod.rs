//! Agent patterns — structured reasoning strategies.
//!
//! The agent uses one pattern, **ReAct**: a Thought → Action → Observation
//! loop over the tool registry with a visible trace.

pub mod react;

pub use react::{FALLBACK_ANSWER, ReactAgent, ReactResult};

#[cfg(test)]
pub(crate) mod test_helpers;
