mod conversation;
mod endpoint;
mod message;
mod model_info;
mod session;

pub use conversation::*;
pub use endpoint::*;
pub use message::*;
pub use model_info::*;
pub use session::*;
