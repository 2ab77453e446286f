//! Common types for the marketplace order service.
//!
//! Shared data model, events, storage keys and configuration validation used
//! by every other crate in the workspace.

/// API request bodies and the structured error type.
pub mod api;
/// Chat thread messages.
pub mod chat;
/// Events published on the engine's event bus.
pub mod events;
/// Logistics catalog types.
pub mod logistics;
/// Order forms and orders.
pub mod order;
/// Self-registering implementation trait.
pub mod registry;
/// Redacted credentials.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Timestamps and ids.
pub mod utils;
/// Configuration validation for backend tables.
pub mod validation;

pub use api::*;
pub use chat::*;
pub use events::*;
pub use logistics::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{current_timestamp, new_id, truncate_id};
pub use validation::*;

pub use rust_decimal::Decimal;
