//! Client credentials exchange with JWT client assertions and DPoP nonce negotiation.
//!
//! The exchange runs as a small state machine. It starts without a proof; if the server
//! answers `invalid_dpop_proof` the acquirer generates a DPoP key and resends with a
//! proof, then follows `use_dpop_nonce` challenges until a token is issued or
//! [`MAX_NONCE_CHALLENGES`] is exceeded.

// std
use std::time::Duration as StdDuration;
// crates.io
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{
	_prelude::*,
	auth::{AssertionSource, Credential, ScopeSet, token::TokenResponse},
	dpop::{self, DpopKey},
	error::AuthError,
	http::{HttpRequest, HttpResponse, HttpTransport},
	obs::{self, OperationKind, OperationSpan, Outcome},
	retry::{Attempt, RetrySession},
	store::DpopContext,
};

/// `client_assertion_type` for signed JWT client authentication.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// Nonce challenges tolerated during one exchange.
pub const MAX_NONCE_CHALLENGES: u32 = 3;

const INVALID_DPOP_PROOF: &str = "invalid_dpop_proof";
const USE_DPOP_NONCE: &str = "use_dpop_nonce";

/// Credential issued by the token endpoint along with its DPoP binding, if any.
#[derive(Clone, Debug)]
pub struct IssuedCredential {
	/// Issued credential.
	pub credential: Credential,
	/// Nonce and key the credential is bound to; `None` for plain bearer grants.
	pub dpop: Option<DpopContext>,
}

enum Handshake {
	NoProof,
	AwaitNonce { key: DpopKey, nonce: String, challenges: u32 },
}

/// Exchanges client assertions for access tokens at the org token endpoint.
#[derive(Clone)]
pub struct CredentialAcquirer {
	transport: Arc<dyn HttpTransport>,
	token_url: Url,
	scopes: ScopeSet,
	user_agent: String,
	max_retries: u32,
	retry_delay: StdDuration,
}
impl CredentialAcquirer {
	/// Creates an acquirer posting to `token_url` and requesting `scopes`.
	pub fn new(transport: Arc<dyn HttpTransport>, token_url: Url, scopes: ScopeSet) -> Self {
		Self {
			transport,
			token_url,
			scopes,
			user_agent: crate::config::USER_AGENT.to_owned(),
			max_retries: 0,
			retry_delay: StdDuration::ZERO,
		}
	}

	/// Overrides the `User-Agent` header.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Retries network failures up to `max_retries` times, `delay` apart.
	pub fn with_retry(mut self, max_retries: u32, delay: StdDuration) -> Self {
		self.max_retries = max_retries;
		self.retry_delay = delay;

		self
	}

	/// Token endpoint URL.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Runs the exchange, negotiating DPoP when the server demands it.
	pub async fn acquire(
		&self,
		source: &AssertionSource,
		cancel: &CancellationToken,
	) -> Result<IssuedCredential> {
		let span = OperationSpan::token_exchange(&self.token_url);

		obs::record_outcome(OperationKind::TokenExchange, Outcome::Attempt);

		let result = span.instrument(self.handshake(source, &span, cancel)).await;
		let outcome = if result.is_ok() { Outcome::Success } else { Outcome::Failure };

		obs::record_outcome(OperationKind::TokenExchange, outcome);

		result
	}

	async fn handshake(
		&self,
		source: &AssertionSource,
		span: &OperationSpan,
		cancel: &CancellationToken,
	) -> Result<IssuedCredential> {
		let mut phase = Handshake::NoProof;

		loop {
			let assertion = source.assertion()?;
			let proof = match &phase {
				Handshake::NoProof => None,
				Handshake::AwaitNonce { key, nonce, .. } =>
					Some(key.proof(&Method::POST, &self.token_url, Some(nonce), None)?),
			};
			let response = self.post(&assertion, proof, cancel).await?;

			if response.status.as_u16() < 300 {
				let credential = parse_credential(&response)?;
				let dpop = match phase {
					Handshake::NoProof => {
						span.record_handshake(false, 0);

						None
					},
					Handshake::AwaitNonce { key, nonce, challenges } => {
						span.record_handshake(true, challenges);

						Some(DpopContext { nonce, key: Arc::new(key) })
					},
				};

				return Ok(IssuedCredential { credential, dpop });
			}

			let body = response.text();

			phase = match phase {
				Handshake::NoProof if body.contains(INVALID_DPOP_PROOF) => {
					#[cfg(feature = "tracing")]
					tracing::debug!("Token endpoint requires DPoP; generating a proof key.");

					Handshake::AwaitNonce { key: DpopKey::generate()?, nonce: String::new(), challenges: 0 }
				},
				Handshake::AwaitNonce { key, challenges, .. } if body.contains(USE_DPOP_NONCE) => {
					if challenges >= MAX_NONCE_CHALLENGES {
						return Err(AuthError::DpopNonceLimit { limit: MAX_NONCE_CHALLENGES }.into());
					}

					let nonce = response.header_str(dpop::NONCE_HEADER).unwrap_or_default().to_owned();

					obs::record_nonce_challenge();

					#[cfg(feature = "tracing")]
					tracing::debug!(challenge = challenges + 1, "Answering a DPoP nonce challenge.");

					Handshake::AwaitNonce { key, nonce, challenges: challenges + 1 }
				},
				_ =>
					return Err(AuthError::TokenEndpoint { status: response.status.as_u16(), body }.into()),
			};
		}
	}

	async fn post(
		&self,
		assertion: &str,
		proof: Option<String>,
		cancel: &CancellationToken,
	) -> Result<HttpResponse> {
		let request = self.token_request(assertion, proof)?;

		RetrySession::new(OperationKind::TokenExchange, self.max_retries, self.retry_delay, cancel)
			.run(|_| {
				let request = request.clone();

				async move {
					match self.transport.send(request).await {
						Ok(response) => Attempt::Done(response),
						Err(e) if e.is_network() => Attempt::retry(e),
						Err(e) => Attempt::permanent(e),
					}
				}
			})
			.await
	}

	fn token_request(&self, assertion: &str, proof: Option<String>) -> Result<HttpRequest> {
		let body = FormSerializer::new(String::new())
			.append_pair("grant_type", "client_credentials")
			.append_pair("scope", &self.scopes.normalized())
			.append_pair("client_assertion_type", CLIENT_ASSERTION_TYPE)
			.append_pair("client_assertion", assertion)
			.finish();
		let mut request = HttpRequest::new(Method::POST, self.token_url.clone());
		let headers = &mut request.headers;

		headers.insert(::http::header::ACCEPT, HeaderValue::from_static("application/json"));
		headers.insert(
			::http::header::CONTENT_TYPE,
			HeaderValue::from_static("application/x-www-form-urlencoded"),
		);
		headers.insert(::http::header::USER_AGENT, header_value(&self.user_agent)?);

		if let Some(proof) = proof {
			headers.insert(dpop::DPOP_HEADER, header_value(&proof)?);
		}

		request.body = Some(body.into_bytes());

		Ok(request)
	}
}
impl Debug for CredentialAcquirer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialAcquirer")
			.field("token_url", &self.token_url.as_str())
			.field("scopes", &self.scopes)
			.field("max_retries", &self.max_retries)
			.field("retry_delay", &self.retry_delay)
			.finish_non_exhaustive()
	}
}

fn parse_credential(response: &HttpResponse) -> Result<Credential, AuthError> {
	let payload: TokenResponse = response
		.json()
		.map_err(|source| AuthError::TokenResponseParse { source, status: response.status.as_u16() })?;

	payload.into_credential(OffsetDateTime::now_utc())
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
	let mut value = HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeaderValue)?;

	value.set_sensitive(true);

	Ok(value)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TransportError;

	#[derive(Default)]
	struct Recorder(Mutex<Vec<HttpRequest>>);
	impl HttpTransport for Recorder {
		fn send(&self, request: HttpRequest) -> crate::http::TransportFuture<'_> {
			self.0.lock().push(request);

			Box::pin(async {
				Err(TransportError::request(
					"acme.okta.com",
					std::io::Error::new(std::io::ErrorKind::InvalidInput, "offline"),
				))
			})
		}
	}

	#[tokio::test]
	async fn token_request_is_form_encoded_with_assertion() {
		let recorder = Arc::new(Recorder::default());
		let acquirer = CredentialAcquirer::new(
			recorder.clone(),
			Url::parse("https://acme.okta.com/oauth2/v1/token").expect("Token URL should parse."),
			ScopeSet::new(["okta.users.read", "okta.apps.read"]).expect("Scopes should be valid."),
		)
		.with_retry(3, StdDuration::ZERO);
		let err = acquirer
			.acquire(&AssertionSource::Static("a.b.c".into()), &CancellationToken::new())
			.await
			.expect_err("Permanent transport errors must not be retried.");

		assert!(matches!(err, Error::Transport(TransportError::Request { .. })));

		let requests = recorder.0.lock();

		assert_eq!(requests.len(), 1);

		let request = &requests[0];
		let body = String::from_utf8(request.body.clone().unwrap_or_default())
			.expect("Form body should be UTF-8.");

		assert_eq!(request.method, Method::POST);
		assert_eq!(
			body,
			"grant_type=client_credentials&scope=okta.apps.read+okta.users.read\
			 &client_assertion_type=urn%3Aietf%3Aparams%3Aoauth%3Aclient-assertion-type%3Ajwt-bearer\
			 &client_assertion=a.b.c"
		);
		assert_eq!(
			request.headers.get(::http::header::CONTENT_TYPE),
			Some(&HeaderValue::from_static("application/x-www-form-urlencoded"))
		);
		assert!(request.headers.get(dpop::DPOP_HEADER).is_none());
	}
}
