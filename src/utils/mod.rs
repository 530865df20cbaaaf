//! Utility module

mod span;
mod error;
pub mod config;

pub use span::Span;
pub use error::{Error, ErrorCategory, Result};
pub use config::{Backend, Config};
