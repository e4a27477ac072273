//! docqa core library
//!
//! This crate provides the foundational pieces shared by every docqa crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration (`RagConfig` for the store/credential target, `AppConfig`
//!   for runtime settings)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RagConfig};
pub use error::{AppError, AppResult};
