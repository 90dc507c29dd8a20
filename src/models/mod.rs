//! Data models

pub mod request;
pub mod prediction;

pub use request::*;
pub use prediction::*;
