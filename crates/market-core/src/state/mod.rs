//! State management for order forms and orders.
//!
//! Each state machine owns the transition table for its record type and
//! serializes its own writes.

pub mod order;
pub mod order_form;

pub use order::{OrderStateError, OrderStateMachine};
pub use order_form::{OrderFormStateError, OrderFormStateMachine};
