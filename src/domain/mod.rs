//! # Domain Layer
//!
//! Chat models, the session state container, and the streamed-completion
//! decoder. This layer is independent of HTTP and terminal frameworks.

mod error;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
