//! Storage implementations for EduPolicy.
//!
//! - Conversation stores: JSON file (default), SQLite, in-memory.
//! - The regulations knowledge index (JSONL chunks, cosine search).

pub mod file_backend;
pub mod in_memory;
pub mod knowledge_index;
pub mod sqlite;
pub mod vector;

pub use file_backend::JsonFileStore;
pub use in_memory::InMemoryStore;
pub use knowledge_index::JsonlKnowledgeIndex;
pub use sqlite::SqliteStore;
pub use vector::{Chunk, cosine_similarity, top_k};
