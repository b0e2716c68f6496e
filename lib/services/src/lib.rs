//! # resumatch Services
//!
//! Clients for the external collaborators of the ranking pipeline: a text
//! embedding service and an LLM that structures free text. Each sits behind a
//! trait with one HTTP implementation and one deterministic double.

pub mod embedder;
pub mod prompts;
pub mod structurer;

pub use embedder::{Embedder, HashEmbedder, HttpEmbedder, HttpEmbedderConfig, DEFAULT_DIMENSIONS};
pub use structurer::{
    extract_json_block, parse_reply, ChatStructurer, ChatStructurerConfig, FixedStructurer,
    Structurer,
};
