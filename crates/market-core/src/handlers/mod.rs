//! Handlers for each stage of the order flow.
//!
//! Chat messages and order forms come first, checkout turns an accepted form
//! into a paid order, and logistics selection ships it.

pub mod chat;
pub mod checkout;
pub mod logistics;
pub mod order_form;

pub use chat::{ChatError, ChatHandler};
pub use checkout::{CheckoutError, CheckoutHandler};
pub use logistics::{LogisticsError, LogisticsHandler};
pub use order_form::{OrderFormError, OrderFormHandler};
