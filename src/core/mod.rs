//! # Core Module
//!
//! Configuration, error surface, execution results and event plumbing shared
//! by every layer of the framework.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add copy-on-write event bus
//! - 1.0.0: Initial creation with config, error and result modules

pub mod config;
pub mod error;
pub mod events;
pub mod result;

// Re-export commonly used items
pub use config::InteractionConfig;
pub use error::{ErrorKind, InteractionError};
pub use events::{EventBus, SubscriptionId};
pub use result::ExecuteResult;
