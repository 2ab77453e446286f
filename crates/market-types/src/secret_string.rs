//! Credentials for the payment gateway and the remote storage backend.

use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// An API credential that is zeroed on drop and never printed.
///
/// Only [`SecretString::bearer`] and [`SecretString::expose_secret`] give
/// access to the value; `Debug` and `Display` always redact it.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// `Authorization` header value for this credential.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0.as_str())
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self(Zeroizing::new(value.to_owned()))
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_gateway_key_never_formatted() {
		let key = SecretString::from("sk_live_abc");
		assert!(!format!("{:?}", key).contains("sk_live_abc"));
		assert_eq!(key.to_string(), REDACTED);
	}

	#[test]
	fn test_bearer_header() {
		let token = SecretString::from("tok");
		assert_eq!(token.bearer(), "Bearer tok");
		assert_eq!(token.expose_secret(), "tok");
	}
}
