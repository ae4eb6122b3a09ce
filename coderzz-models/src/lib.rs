//! Generation providers for coderzz.
//!
//! This crate provides:
//! - The [`providers::ModelProvider`] trait, the single seam between the
//!   assistant and whatever produces code
//! - An Ollama provider that talks to a locally running model server
//! - A simulated provider that produces placeholder code offline
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ModelProvider                 │
//! │  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │  OllamaProvider  │  │ SimulatedProvider│  │
//! │  │  (NDJSON stream) │  │  (canned chunks) │  │
//! │  └──────────────────┘  └──────────────────┘  │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ChatStream of StreamChunk
//! ```

mod error;
mod types;

pub mod providers;

pub use error::{Error, Result};
pub use types::{Capabilities, ModelId, ModelInfo};
