//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Inference (OpenAI-compatible HTTP client, offline mock)
//! - Storage (in-memory conversation history)
//! - Terminal UI (ratatui)

pub mod adapter;
pub mod tui;

pub use adapter::*;
