//! Client assertion JWTs for the `private_key_jwt` client authentication method.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::key::{SigningKey, signing_error},
	error::AuthError,
};

/// Lifetime of a signed client assertion.
pub const ASSERTION_LIFETIME: Duration = Duration::hours(1);

/// Where client assertions come from.
#[derive(Clone, Debug)]
pub enum AssertionSource {
	/// Assertions minted locally and signed with a private key.
	Signed(AssertionSigner),
	/// Caller-supplied assertion reused for every exchange.
	Static(String),
}
impl AssertionSource {
	/// Returns an assertion for the next token request.
	pub fn assertion(&self) -> Result<String, AuthError> {
		self.assertion_at(OffsetDateTime::now_utc())
	}

	/// Same as [`Self::assertion`] with an explicit issue instant.
	pub fn assertion_at(&self, issued_at: OffsetDateTime) -> Result<String, AuthError> {
		match self {
			AssertionSource::Signed(signer) => signer.sign_at(issued_at),
			AssertionSource::Static(assertion) => Ok(assertion.clone()),
		}
	}
}

/// Signs client assertions with the configured key.
#[derive(Clone, Debug)]
pub struct AssertionSigner {
	key: SigningKey,
	kid: Option<String>,
	client_id: String,
	audience: String,
}
impl AssertionSigner {
	/// Creates a signer for `client_id` whose assertions target `audience`.
	pub fn new(key: SigningKey, client_id: impl Into<String>, audience: impl Into<String>) -> Self {
		Self { key, kid: None, client_id: client_id.into(), audience: audience.into() }
	}

	/// Places `kid` in the JWS header.
	pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
		self.kid = Some(kid.into());

		self
	}

	/// Signs a fresh assertion issued at `issued_at` and valid for one hour.
	pub fn sign_at(&self, issued_at: OffsetDateTime) -> Result<String, AuthError> {
		let header = AssertionHeader {
			alg: self.key.algorithm(),
			typ: "JWT",
			kid: self.kid.as_deref(),
		};
		let iat = issued_at.unix_timestamp();
		let claims = AssertionClaims {
			iss: &self.client_id,
			sub: &self.client_id,
			aud: &self.audience,
			iat,
			exp: (issued_at + ASSERTION_LIFETIME).unix_timestamp(),
			jti: random_jti(),
		};

		compact_jws(&header, &claims, |message| self.key.sign(message))
	}
}

#[derive(Serialize)]
struct AssertionHeader<'a> {
	alg: &'static str,
	typ: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	kid: Option<&'a str>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
	iss: &'a str,
	sub: &'a str,
	aud: &'a str,
	iat: i64,
	exp: i64,
	jti: String,
}

/// Builds `base64url(header).base64url(claims).base64url(signature)`.
pub(crate) fn compact_jws<H, C, S>(header: &H, claims: &C, sign: S) -> Result<String, AuthError>
where
	H: Serialize,
	C: Serialize,
	S: FnOnce(&[u8]) -> Result<Vec<u8>, AuthError>,
{
	let header = serde_json::to_vec(header).map_err(signing_error)?;
	let claims = serde_json::to_vec(claims).map_err(signing_error)?;
	let message = format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));
	let signature = sign(message.as_bytes())?;

	Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Random 32 character token identifier.
pub(crate) fn random_jti() -> String {
	rand::rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const RSA_PKCS1: &str = include_str!("../../tests/fixtures/rsa_pkcs1.pem");

	fn decode_segment(segment: &str) -> serde_json::Value {
		let bytes = URL_SAFE_NO_PAD.decode(segment).expect("Segment should be base64url.");

		serde_json::from_slice(&bytes).expect("Segment should be JSON.")
	}

	#[test]
	fn signed_assertion_carries_client_claims() {
		let key = SigningKey::from_pem(RSA_PKCS1).expect("Fixture key should parse.");
		let signer = AssertionSigner::new(key, "0oa1", "https://acme.okta.com/oauth2/v1/token")
			.with_kid("kid-1");
		let issued_at =
			OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Timestamp should convert.");
		let jwt = AssertionSource::Signed(signer)
			.assertion_at(issued_at)
			.expect("Assertion should sign.");
		let parts: Vec<_> = jwt.split('.').collect();

		assert_eq!(parts.len(), 3);

		let header = decode_segment(parts[0]);
		let claims = decode_segment(parts[1]);

		assert_eq!(header["alg"], "RS256");
		assert_eq!(header["kid"], "kid-1");
		assert_eq!(claims["iss"], "0oa1");
		assert_eq!(claims["sub"], "0oa1");
		assert_eq!(claims["aud"], "https://acme.okta.com/oauth2/v1/token");
		assert_eq!(claims["iat"], 1_700_000_000);
		assert_eq!(claims["exp"], 1_700_003_600);
		assert_eq!(claims["jti"].as_str().map(str::len), Some(32));
	}

	#[test]
	fn static_assertions_are_reused_verbatim() {
		let source = AssertionSource::Static("header.claims.sig".into());

		assert_eq!(source.assertion().expect("Static assertion is infallible."), "header.claims.sig");
		assert_eq!(source.assertion().expect("Static assertion is infallible."), "header.claims.sig");
	}

	#[test]
	fn jti_values_are_unique() {
		assert_ne!(random_jti(), random_jti());
	}
}
