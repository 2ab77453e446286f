//! Naming convention for pluggable backends.

/// Pairs a backend's configuration name with its factory.
///
/// The name is the key under `[storage.implementations]` or
/// `[payment.implementations]`; `get_all_implementations()` in each crate
/// collects `(NAME, factory())` pairs for the service registry.
pub trait ImplementationRegistry {
	const NAME: &'static str;

	type Factory;

	fn factory() -> Self::Factory;
}
