//! Per-turn reasoning context: the prompt layers and the scratchpad.

pub mod prompt;
pub mod working_memory;

pub use working_memory::{Action, Step, WorkingMemory};
