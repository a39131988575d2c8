//! Request authorization strategies, key material, and credential models.
//!
//! Every authorization mode maps onto one [`Authorization`] variant. Variants share the
//! [`Authorize`] capability, which stamps `Authorization` (and, for DPoP-bound
//! credentials, `DPoP`) onto an outbound request.

pub mod assertion;
pub mod exchange;
pub mod key;
pub mod scope;
pub mod static_token;
pub mod token;

pub use assertion::*;
pub use exchange::AssertionAuthorizer;
pub use key::SigningKey;
pub use scope::*;
pub use static_token::*;
pub use token::{Credential, TokenSecret};

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	config::{AuthorizationMode, ClientConfig, TOKEN_PATH},
	error::ConfigError,
	http::HttpTransport,
	oauth::CredentialAcquirer,
	store::TokenCache,
};

/// Boxed future returned by [`Authorize::authorize`].
pub type AuthorizeFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Capability shared by all authorization strategies.
pub trait Authorize
where
	Self: Send + Sync,
{
	/// Populates authorization headers for a `method` request to `target`.
	fn authorize<'a>(
		&'a self,
		method: &'a Method,
		target: &'a Url,
		headers: &'a mut HeaderMap,
		cancel: &'a CancellationToken,
	) -> AuthorizeFuture<'a>;
}

/// Closed set of authorization strategies.
#[derive(Debug)]
pub enum Authorization {
	/// `SSWS` or `Bearer` static token.
	StaticToken(StaticToken),
	/// Client assertions signed with a PEM private key.
	PrivateKeyAssertion(AssertionAuthorizer),
	/// Caller-supplied client assertion.
	ExternalAssertion(AssertionAuthorizer),
	/// Client assertions signed with a key converted from a JWK.
	JwkDerived(AssertionAuthorizer),
}
impl Authorization {
	/// Builds the strategy selected by `config.authorization_mode`.
	///
	/// `org_url` must be the validated organization URL. Key material is parsed eagerly so
	/// malformed keys surface when the client is constructed.
	pub fn from_config(
		config: &ClientConfig,
		org_url: &Url,
		transport: Arc<dyn HttpTransport>,
		cache: Arc<TokenCache>,
	) -> Result<Self> {
		let mode = config.authorization_mode;
		let missing = |field| ConfigError::MissingField { field, mode: mode.as_str() };
		let token_url = token_url(org_url)?;
		let signed = |key: SigningKey, kid: Option<String>| -> Result<AssertionSource> {
			let client_id = config.client_id.as_deref().ok_or_else(|| missing("clientId"))?;
			let signer = AssertionSigner::new(key, client_id, token_url.as_str());
			let signer = match kid.filter(|kid| !kid.is_empty()) {
				Some(kid) => signer.with_kid(kid),
				None => signer,
			};

			Ok(AssertionSource::Signed(signer))
		};
		let authorizer = |source: AssertionSource| -> Result<AssertionAuthorizer> {
			let scopes = ScopeSet::new(config.scopes.iter().cloned()).map_err(ConfigError::from)?;
			let acquirer = CredentialAcquirer::new(transport.clone(), token_url.clone(), scopes)
				.with_user_agent(config.user_agent())
				.with_retry(
					config.rate_limit.max_retries,
					StdDuration::from_secs(config.rate_limit.token_retry_delay),
				);

			Ok(AssertionAuthorizer::new(acquirer, source, cache.clone()))
		};

		match mode {
			AuthorizationMode::Ssws | AuthorizationMode::Bearer => {
				let token = config.token.as_deref().ok_or_else(|| missing("token"))?;
				let scheme = if mode == AuthorizationMode::Ssws {
					StaticScheme::Ssws
				} else {
					StaticScheme::Bearer
				};

				Ok(Self::StaticToken(StaticToken::new(scheme, token)))
			},
			AuthorizationMode::PrivateKey => {
				let pem = config.private_key.as_deref().ok_or_else(|| missing("privateKey"))?;
				let key = SigningKey::from_pem(pem)?;
				let source = signed(key, config.private_key_id.clone())?;

				Ok(Self::PrivateKeyAssertion(authorizer(source)?))
			},
			AuthorizationMode::Jwt => {
				let assertion =
					config.client_assertion.as_deref().ok_or_else(|| missing("clientAssertion"))?;

				Ok(Self::ExternalAssertion(authorizer(AssertionSource::Static(assertion.to_owned()))?))
			},
			AuthorizationMode::Jwk => {
				let jwk = config.jwk.as_deref().ok_or_else(|| missing("jwk"))?;
				let encryption_type =
					config.encryption_type.as_deref().ok_or_else(|| missing("encryptionType"))?;
				let (key, jwk_kid) = SigningKey::from_jwk(jwk, encryption_type)?;
				let source = signed(key, config.private_key_id.clone().or(jwk_kid))?;

				Ok(Self::JwkDerived(authorizer(source)?))
			},
		}
	}

	/// Returns the assertion authorizer for OAuth modes.
	pub fn assertion_authorizer(&self) -> Option<&AssertionAuthorizer> {
		match self {
			Authorization::StaticToken(_) => None,
			Authorization::PrivateKeyAssertion(authorizer)
			| Authorization::ExternalAssertion(authorizer)
			| Authorization::JwkDerived(authorizer) => Some(authorizer),
		}
	}
}
impl Authorize for Authorization {
	fn authorize<'a>(
		&'a self,
		method: &'a Method,
		target: &'a Url,
		headers: &'a mut HeaderMap,
		cancel: &'a CancellationToken,
	) -> AuthorizeFuture<'a> {
		match self {
			Authorization::StaticToken(token) => token.authorize(method, target, headers, cancel),
			Authorization::PrivateKeyAssertion(authorizer)
			| Authorization::ExternalAssertion(authorizer)
			| Authorization::JwkDerived(authorizer) =>
				authorizer.authorize(method, target, headers, cancel),
		}
	}
}

/// Returns `{org_url}/oauth2/v1/token`.
pub fn token_url(org_url: &Url) -> Result<Url, ConfigError> {
	let base = org_url.as_str().trim_end_matches('/');

	Url::parse(&format!("{base}{TOKEN_PATH}")).map_err(|source| ConfigError::InvalidOrgUrl { source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{HttpRequest, TransportFuture};

	struct Offline;
	impl HttpTransport for Offline {
		fn send(&self, _: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async { Err(std::io::Error::other("offline").into()) })
		}
	}

	fn build(config: ClientConfig) -> Result<Authorization> {
		let org_url = config.validate()?;

		Authorization::from_config(&config, &org_url, Arc::new(Offline), Arc::new(TokenCache::new()))
	}

	#[test]
	fn token_url_appends_token_path() {
		let org = Url::parse("https://acme.okta.com/").expect("Org URL should parse.");

		assert_eq!(
			token_url(&org).expect("Token URL should build.").as_str(),
			"https://acme.okta.com/oauth2/v1/token"
		);
	}

	#[test]
	fn modes_map_to_variants() {
		let ssws = build(ClientConfig::new("https://acme.okta.com", AuthorizationMode::Ssws).with_token("00a"))
			.expect("SSWS should build.");
		let jwt = build(
			ClientConfig::new("https://acme.okta.com", AuthorizationMode::Jwt)
				.with_client_assertion("a.b.c")
				.with_scopes(["okta.users.read"]),
		)
		.expect("JWT should build.");
		let private_key = build(
			ClientConfig::new("https://acme.okta.com", AuthorizationMode::PrivateKey)
				.with_client_id("0oa1")
				.with_scopes(["okta.users.read"])
				.with_private_key(include_str!("../tests/fixtures/rsa_pkcs8.pem")),
		)
		.expect("PrivateKey should build.");
		let jwk = build(
			ClientConfig::new("https://acme.okta.com", AuthorizationMode::Jwk)
				.with_client_id("0oa1")
				.with_scopes(["okta.users.read"])
				.with_jwk(include_str!("../tests/fixtures/rsa_jwks.json"), "RSA"),
		)
		.expect("JWK should build.");

		assert!(matches!(ssws, Authorization::StaticToken(_)));
		assert!(matches!(jwt, Authorization::ExternalAssertion(_)));
		assert!(matches!(private_key, Authorization::PrivateKeyAssertion(_)));
		assert!(matches!(jwk, Authorization::JwkDerived(_)));
		assert!(ssws.assertion_authorizer().is_none());
		assert!(jwk.assertion_authorizer().is_some());
	}

	#[test]
	fn unsupported_key_material_fails_at_construction() {
		let err = build(
			ClientConfig::new("https://acme.okta.com", AuthorizationMode::Jwk)
				.with_client_id("0oa1")
				.with_scopes(["okta.users.read"])
				.with_jwk(include_str!("../tests/fixtures/ec_jwks.json"), "RSA"),
		)
		.expect_err("EC JWKs are not supported.");

		assert!(matches!(err, Error::Config(ConfigError::UnsupportedKeyType { .. })));
	}
}
