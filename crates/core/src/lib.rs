//! # EduPolicy Core
//!
//! Domain types, traits, and error definitions for the EduPolicy agent.
//! This crate has **no framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the reasoning loop is a trait here: the language
//! model ([`Provider`]), the tool adapters ([`Tool`]), their backends
//! ([`backend`]) and the conversation store ([`SessionStore`]).
//! Implementations live in their respective crates and are wired together
//! by the agent crate's bootstrap.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod session;
pub mod backend;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use tool::{Tool, ToolDescriptor, ToolName, ToolRegistry};
pub use session::{SessionStore, Turn, TurnRole};
pub use backend::{Embedder, KnowledgeIndex, Passage, StructuredBackend, WebResult, WebSearchBackend};
pub use event::{DomainEvent, EventBus};
