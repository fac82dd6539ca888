//! # verdant-providers
//!
//! Chat-completion backend, the retrying LLM gateway, and HTTP enrichment
//! sources for Verdant.

pub mod enrichment;
pub mod gateway;
pub mod openai;

pub use enrichment::HttpEnrichmentProvider;
pub use gateway::LlmGateway;
pub use openai::OpenAiBackend;
