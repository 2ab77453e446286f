//! Core engine for the marketplace order service.
//!
//! Implements the order flow: a seller issues an order form from a chat
//! thread, the buyer accepts or rejects it, an accepted form is paid through
//! the configured payment provider which creates an order, and the buyer
//! then picks a logistics company which ships the order.

pub mod builder;
pub mod catalog;
pub mod engine;
pub mod handlers;
pub mod state;

pub use builder::{BuilderError, MarketBuilder, MarketFactories};
pub use catalog::LogisticsCatalog;
pub use engine::{event_bus::EventBus, EngineError, MarketEngine};
pub use handlers::{ChatError, CheckoutError, LogisticsError, OrderFormError};
pub use state::{OrderFormStateError, OrderStateError};
