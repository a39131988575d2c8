//! Static `SSWS` and `Bearer` tokens.

// self
use crate::{
	_prelude::*,
	auth::{Authorize, AuthorizeFuture, TokenSecret},
	error::AuthError,
	oauth::header_value,
};

/// Authorization scheme for static tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaticScheme {
	/// Okta API token (`SSWS`).
	Ssws,
	/// Pre-issued OAuth access token (`Bearer`).
	Bearer,
}
impl StaticScheme {
	/// Returns the `Authorization` scheme label.
	pub const fn as_str(self) -> &'static str {
		match self {
			StaticScheme::Ssws => "SSWS",
			StaticScheme::Bearer => "Bearer",
		}
	}
}

/// Attaches a fixed token to every request; no caching and no network calls.
#[derive(Clone, Debug)]
pub struct StaticToken {
	scheme: StaticScheme,
	token: TokenSecret,
}
impl StaticToken {
	/// Creates a static token authorizer.
	pub fn new(scheme: StaticScheme, token: impl Into<String>) -> Self {
		Self { scheme, token: TokenSecret::new(token) }
	}

	/// Sets the `Authorization` header, replacing any existing value.
	pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
		let value = header_value(&format!("{} {}", self.scheme.as_str(), self.token.expose()))?;

		headers.insert(::http::header::AUTHORIZATION, value);

		Ok(())
	}
}
impl Authorize for StaticToken {
	fn authorize<'a>(
		&'a self,
		_: &'a Method,
		_: &'a Url,
		headers: &'a mut HeaderMap,
		_: &'a CancellationToken,
	) -> AuthorizeFuture<'a> {
		Box::pin(async move { Ok(self.apply(headers)?) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn repeated_application_keeps_a_single_header() {
		let auth = StaticToken::new(StaticScheme::Ssws, "00abc");
		let mut headers = HeaderMap::new();

		auth.apply(&mut headers).expect("Token should be a valid header value.");
		auth.apply(&mut headers).expect("Token should be a valid header value.");

		let values: Vec<_> = headers.get_all(::http::header::AUTHORIZATION).iter().collect();

		assert_eq!(values.len(), 1);
		assert_eq!(values[0], "SSWS 00abc");
		assert!(values[0].is_sensitive());
	}

	#[test]
	fn invalid_header_characters_are_rejected() {
		let auth = StaticToken::new(StaticScheme::Bearer, "line\nbreak");

		assert!(matches!(auth.apply(&mut HeaderMap::new()), Err(AuthError::InvalidHeaderValue)));
	}
}
