//! Domain services containing pure protocol logic.

mod stream_decoder;

pub use stream_decoder::*;
