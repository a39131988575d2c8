//! Access credentials issued by the token endpoint.

// self
use crate::{_prelude::*, error::AuthError};

/// Token type that requires a DPoP proof on every request.
pub const DPOP_TOKEN_TYPE: &str = "DPoP";
/// Longest `expires_in` accepted from the token endpoint, one year.
pub const MAX_CREDENTIAL_LIFETIME_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` if the secret is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access credential returned by a client credentials exchange.
///
/// Credentials are immutable once issued; a refresh replaces the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	/// Token type, `Bearer` or `DPoP`.
	pub token_type: String,
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Lifetime in seconds reported by the server.
	pub expires_in: i64,
	/// Instant the credential was received.
	pub issued_at: OffsetDateTime,
	/// Granted scopes, space delimited.
	pub scope: Option<String>,
}
impl Credential {
	/// Creates a credential issued now.
	pub fn new(
		token_type: impl Into<String>,
		access_token: impl Into<String>,
		expires_in: i64,
	) -> Self {
		Self {
			token_type: token_type.into(),
			access_token: TokenSecret::new(access_token),
			expires_in,
			issued_at: OffsetDateTime::now_utc(),
			scope: None,
		}
	}

	/// Overrides the issue instant.
	pub fn with_issued_at(mut self, issued_at: OffsetDateTime) -> Self {
		self.issued_at = issued_at;

		self
	}

	/// Returns `true` when the credential is bound to a DPoP key.
	pub fn is_dpop(&self) -> bool {
		self.token_type.eq_ignore_ascii_case(DPOP_TOKEN_TYPE)
	}

	/// Server-side expiry instant, saturating at the calendar bounds.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at.saturating_add(Duration::seconds(self.expires_in))
	}

	/// `Authorization` header value in `<type> <token>` form.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token_type", &self.token_type)
			.field("access_token", &self.access_token)
			.field("expires_in", &self.expires_in)
			.field("issued_at", &self.issued_at)
			.field("scope", &self.scope)
			.finish()
	}
}

/// Splits an `Authorization` value into its scheme and token.
pub fn split_authorization(value: &str) -> Result<(&str, &str), AuthError> {
	let mut parts = value.split(' ');

	match (parts.next(), parts.next(), parts.next()) {
		(Some(scheme), Some(token), None) if !scheme.is_empty() && !token.is_empty() =>
			Ok((scheme, token)),
		_ => Err(AuthError::MalformedCachedToken),
	}
}

/// Successful token endpoint payload.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
	#[serde(default = "default_token_type")]
	token_type: String,
	#[serde(default)]
	expires_in: i64,
	#[serde(default)]
	access_token: String,
	#[serde(default)]
	scope: Option<String>,
}
impl TokenResponse {
	pub(crate) fn into_credential(self, issued_at: OffsetDateTime) -> Result<Credential, AuthError> {
		if self.access_token.is_empty() {
			return Err(AuthError::EmptyToken);
		}
		if !(0..=MAX_CREDENTIAL_LIFETIME_SECONDS).contains(&self.expires_in) {
			return Err(AuthError::InvalidExpiry { expires_in: self.expires_in });
		}

		Ok(Credential {
			token_type: self.token_type,
			access_token: TokenSecret::new(self.access_token),
			expires_in: self.expires_in,
			issued_at,
			scope: self.scope,
		})
	}
}

fn default_token_type() -> String {
	"Bearer".into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secrets_and_credentials_redact() {
		let credential = Credential::new("Bearer", "super-secret", 3600);

		assert_eq!(format!("{}", credential.access_token), "<redacted>");
		assert!(!format!("{credential:?}").contains("super-secret"));
		assert_eq!(credential.authorization_value(), "Bearer super-secret");
	}

	#[test]
	fn authorization_values_split_in_two() {
		assert_eq!(split_authorization("DPoP abc").expect("Value should split."), ("DPoP", "abc"));
		assert!(matches!(split_authorization("DPoP a b"), Err(AuthError::MalformedCachedToken)));
		assert!(matches!(split_authorization("DPoP"), Err(AuthError::MalformedCachedToken)));
	}

	#[test]
	fn token_response_requires_access_token() {
		let now = OffsetDateTime::now_utc();
		let empty: TokenResponse = serde_json::from_str(r#"{"token_type":"Bearer","expires_in":3600}"#)
			.expect("Payload should deserialize.");

		assert!(matches!(empty.into_credential(now), Err(AuthError::EmptyToken)));

		let dpop: TokenResponse = serde_json::from_str(
			r#"{"token_type":"DPoP","expires_in":3600,"access_token":"abc","scope":"okta.users.read"}"#,
		)
		.expect("Payload should deserialize.");
		let credential = dpop.into_credential(now).expect("Credential should be issued.");

		assert!(credential.is_dpop());
		assert_eq!(credential.expires_at(), now + Duration::hours(1));
		assert_eq!(credential.scope.as_deref(), Some("okta.users.read"));
	}

	#[test]
	fn token_response_rejects_out_of_range_lifetimes() {
		let now = OffsetDateTime::now_utc();

		for expires_in in [i64::MAX, i64::MIN, -1, MAX_CREDENTIAL_LIFETIME_SECONDS + 1] {
			let payload: TokenResponse = serde_json::from_value(serde_json::json!({
				"token_type": "Bearer",
				"expires_in": expires_in,
				"access_token": "abc",
			}))
			.expect("Payload should deserialize.");

			assert!(matches!(
				payload.into_credential(now),
				Err(AuthError::InvalidExpiry { expires_in: reported }) if reported == expires_in
			));
		}
	}

	#[test]
	fn expiry_saturates_for_hand_built_credentials() {
		let credential = Credential::new("Bearer", "abc", i64::MAX);

		assert!(credential.expires_at() > OffsetDateTime::now_utc());
		assert!(Credential::new("Bearer", "abc", i64::MIN).expires_at() < credential.issued_at);
	}
}
