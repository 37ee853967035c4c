//! Language-model providers for wellarch.
//!
//! This crate provides:
//! - The [`ModelProvider`](providers::ModelProvider) trait used by the assessment engine
//! - Chat and embedding request/response types
//! - HTTP providers for a local Ollama instance and Azure OpenAI deployments
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        wellarch-core (RateLimitedCaller)      │
//! └──────────────────────────────────────────────┘
//!                       │ chat / embed
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │              dyn ModelProvider                │
//! │  ┌────────────────┐    ┌──────────────────┐  │
//! │  │ OllamaProvider │    │ AzureOpenAi...   │  │
//! │  └────────────────┘    └──────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```

mod error;

pub mod auth;
pub mod providers;

pub use auth::ApiKey;
pub use error::{Error, Result};
