mod connect;
mod conversation_history;
mod list_models;
mod send_message;

pub use connect::*;
pub use conversation_history::*;
pub use list_models::*;
pub use send_message::*;
