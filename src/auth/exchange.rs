//! Assertion-based authorization with a cached, optionally DPoP-bound credential.

// self
use crate::{
	_prelude::*,
	auth::{AssertionSource, Authorize, AuthorizeFuture, token::split_authorization},
	dpop::{DPOP_HEADER, EXTENDED_USER_AGENT_HEADER, EXTENDED_USER_AGENT_VALUE},
	error::AuthError,
	oauth::{CredentialAcquirer, header_value},
	store::{CachedAuthState, TokenCache},
};

/// Authorizes requests with a credential obtained through a client assertion exchange.
///
/// Concurrent cache misses are funneled through one exchange; callers that waited re-read
/// the cache before starting their own.
#[derive(Debug)]
pub struct AssertionAuthorizer {
	acquirer: CredentialAcquirer,
	source: AssertionSource,
	cache: Arc<TokenCache>,
	flight: AsyncMutex<()>,
}
impl AssertionAuthorizer {
	/// Creates an authorizer sharing `cache`.
	pub fn new(acquirer: CredentialAcquirer, source: AssertionSource, cache: Arc<TokenCache>) -> Self {
		Self { acquirer, source, cache, flight: AsyncMutex::new(()) }
	}

	/// Token cache backing this authorizer.
	pub fn cache(&self) -> &Arc<TokenCache> {
		&self.cache
	}

	/// Returns the live cached state, running an exchange on a miss.
	pub async fn current_state(&self, cancel: &CancellationToken) -> Result<CachedAuthState> {
		if let Some(state) = self.cache.get() {
			return Ok(state);
		}

		let _flight = self.flight.lock().await;

		if let Some(state) = self.cache.get() {
			return Ok(state);
		}

		let issued = self.acquirer.acquire(&self.source, cancel).await?;

		Ok(self.cache.store(issued.credential, issued.dpop))
	}
}
impl Authorize for AssertionAuthorizer {
	fn authorize<'a>(
		&'a self,
		method: &'a Method,
		target: &'a Url,
		headers: &'a mut HeaderMap,
		cancel: &'a CancellationToken,
	) -> AuthorizeFuture<'a> {
		Box::pin(async move {
			let state = self.current_state(cancel).await?;

			Ok(attach(&state, method, target, headers)?)
		})
	}
}

/// Writes `Authorization` and, for DPoP-bound credentials, a fresh proof.
pub fn attach(
	state: &CachedAuthState,
	method: &Method,
	target: &Url,
	headers: &mut HeaderMap,
) -> Result<(), AuthError> {
	let authorization = state.credential.authorization_value();

	headers.insert(::http::header::AUTHORIZATION, header_value(&authorization)?);

	let Some(key) = &state.signing_key else {
		let nonce_without_key = state.nonce.as_deref().is_some_and(|nonce| !nonce.is_empty());

		if nonce_without_key || state.credential.is_dpop() {
			return Err(AuthError::MissingSigningKey);
		}

		return Ok(());
	};
	let (_, access_token) = split_authorization(&authorization)?;
	let proof = key.proof(method, target, state.nonce.as_deref(), Some(access_token))?;

	headers.insert(DPOP_HEADER, header_value(&proof)?);
	headers.insert(EXTENDED_USER_AGENT_HEADER, HeaderValue::from_static(EXTENDED_USER_AGENT_VALUE));

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use super::*;
	use crate::{auth::Credential, dpop::DpopKey, store::DpopContext};

	const RSA_PKCS1: &str = include_str!("../../tests/fixtures/rsa_pkcs1.pem");

	fn dpop_key() -> Arc<DpopKey> {
		let key = <rsa::RsaPrivateKey as rsa::pkcs1::DecodeRsaPrivateKey>::from_pkcs1_pem(RSA_PKCS1)
			.expect("Fixture key should parse.");

		Arc::new(DpopKey::from_rsa(key))
	}

	fn target() -> Url {
		Url::parse("https://acme.okta.com/api/v1/users?limit=1").expect("Fixture URL should parse.")
	}

	#[test]
	fn bearer_state_sets_only_authorization() {
		let state = TokenCache::new().store(Credential::new("Bearer", "abc", 3600), None);
		let mut headers = HeaderMap::new();

		attach(&state, &Method::GET, &target(), &mut headers).expect("Bearer state should attach.");

		assert_eq!(headers.get(::http::header::AUTHORIZATION).map(|v| v.as_bytes()), Some(&b"Bearer abc"[..]));
		assert!(headers.get(DPOP_HEADER).is_none());
	}

	#[test]
	fn dpop_state_attaches_bound_proof() {
		let context = DpopContext { nonce: "n-1".into(), key: dpop_key() };
		let state = TokenCache::new().store(Credential::new("DPoP", "abc", 3600), Some(context));
		let mut headers = HeaderMap::new();

		attach(&state, &Method::DELETE, &target(), &mut headers).expect("DPoP state should attach.");

		let proof = headers.get(DPOP_HEADER).and_then(|v| v.to_str().ok()).expect("Proof should be set.");
		let claims: serde_json::Value = serde_json::from_slice(
			&URL_SAFE_NO_PAD
				.decode(proof.split('.').nth(1).expect("Proof should have claims."))
				.expect("Claims should be base64url."),
		)
		.expect("Claims should be JSON.");

		assert_eq!(claims["htm"], "DELETE");
		assert_eq!(claims["htu"], "https://acme.okta.com/api/v1/users");
		assert_eq!(claims["nonce"], "n-1");
		assert_eq!(claims["ath"], crate::dpop::access_token_hash("abc"));
		assert_eq!(
			headers.get(EXTENDED_USER_AGENT_HEADER),
			Some(&HeaderValue::from_static(EXTENDED_USER_AGENT_VALUE))
		);
	}

	#[test]
	fn dpop_without_key_is_rejected() {
		let state = TokenCache::new().store(Credential::new("DPoP", "abc", 3600), None);

		assert!(matches!(
			attach(&state, &Method::GET, &target(), &mut HeaderMap::new()),
			Err(AuthError::MissingSigningKey)
		));

		let mut orphan_nonce = TokenCache::new().store(Credential::new("Bearer", "abc", 3600), None);

		orphan_nonce.nonce = Some("n-1".into());

		assert!(matches!(
			attach(&orphan_nonce, &Method::GET, &target(), &mut HeaderMap::new()),
			Err(AuthError::MissingSigningKey)
		));
	}

	#[test]
	fn malformed_cached_tokens_are_rejected() {
		let context = DpopContext { nonce: String::new(), key: dpop_key() };
		let state = TokenCache::new().store(Credential::new("DPoP", "two parts", 3600), Some(context));

		assert!(matches!(
			attach(&state, &Method::GET, &target(), &mut HeaderMap::new()),
			Err(AuthError::MalformedCachedToken)
		));
	}
}
