//! Request handlers.

pub mod download;
pub mod health;
pub mod upload;

pub use download::*;
pub use health::*;
pub use upload::*;
