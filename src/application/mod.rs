//! # Application Layer
//!
//! Use cases coordinating the chat session with the inference server and
//! conversation storage.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
