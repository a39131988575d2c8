//! Client-level error types shared across authorization, transport, and caching layers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal and never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential acquisition or request authorization failed for this call.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS, request construction).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Rate-limit headers were missing or malformed.
	#[error(transparent)]
	RateLimit(#[from] RateLimitError),
	/// Response cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::cache::CacheError,
	),

	/// Retries were exhausted while the server kept answering with HTTP 429.
	#[error("Too many requests; gave up after {attempts} attempts.")]
	TooManyRequests {
		/// Number of attempts that were dispatched.
		attempts: u32,
	},
	/// Request URL could not be built from the organization URL.
	#[error("Request URL is invalid.")]
	InvalidUrl(#[from] url::ParseError),
	/// The caller's cancellation token fired while the client was waiting.
	#[error("Operation was cancelled.")]
	Cancelled,
	/// API responded with a non-success status (see [`HttpResponse::error_for_status`]).
	///
	/// [`HttpResponse::error_for_status`]: crate::http::HttpResponse::error_for_status
	#[error("API responded with HTTP {status}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Response body, lossily decoded.
		body: String,
	},
}
impl Error {
	/// Returns `true` when the error is a network-layer transport failure worth retrying.
	pub fn is_network(&self) -> bool {
		matches!(self, Self::Transport(err) if err.is_network())
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Authorization mode is not one of the supported values.
	#[error("Unknown authorization mode `{mode}`.")]
	UnknownAuthorizationMode {
		/// Mode string supplied by the caller.
		mode: String,
	},
	/// Organization URL cannot be parsed.
	#[error("Organization URL is invalid.")]
	InvalidOrgUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Organization URL does not use HTTPS.
	#[error("Organization URL `{url}` must use HTTPS.")]
	InsecureOrgUrl {
		/// Offending URL.
		url: String,
	},
	/// A field required by the selected authorization mode is absent.
	#[error("Configuration field `{field}` is required for the {mode} authorization mode.")]
	MissingField {
		/// Missing field name.
		field: &'static str,
		/// Authorization mode that requires it.
		mode: &'static str,
	},
	/// Private key is not valid PEM or cannot be decoded.
	#[error("Private key is invalid: {reason}.")]
	InvalidPrivateKey {
		/// Human-readable reason.
		reason: String,
	},
	/// PEM block is neither PKCS#1 nor PKCS#8.
	#[error("Private key `{label}` is not PKCS#1 or PKCS#8 format.")]
	UnsupportedKeyFormat {
		/// PEM label that was found.
		label: String,
	},
	/// Key type cannot be used for signing client assertions.
	#[error("Unsupported key type `{kind}`.")]
	UnsupportedKeyType {
		/// Key type or encryption type that was rejected.
		kind: String,
	},
	/// JSON Web Key material is malformed.
	#[error("JSON Web Key is invalid: {reason}.")]
	InvalidJwk {
		/// Human-readable reason.
		reason: String,
	},
	/// A configured header name or value is not valid HTTP.
	#[error("Header `{name}` is not a valid HTTP header.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Per-call authorization failures. They are never cached; the next call starts over.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered without an access token.
	#[error("Token endpoint returned an empty access token.")]
	EmptyToken,
	/// Cached authorization value does not split into `scheme value`.
	#[error("Cached access token is not in `scheme value` form.")]
	MalformedCachedToken,
	/// DPoP is in use but the paired signing key is absent.
	#[error("DPoP is in use but the signing key was not found.")]
	MissingSigningKey,
	/// JWT or proof signing failed.
	#[error("Signing failed: {reason}.")]
	Signing {
		/// Human-readable reason.
		reason: String,
	},
	/// The server kept issuing DPoP nonce challenges.
	#[error("Token endpoint issued more than {limit} DPoP nonce challenges.")]
	DpopNonceLimit {
		/// Number of challenges tolerated.
		limit: u32,
	},
	/// Token endpoint rejected the exchange.
	#[error("Token endpoint responded with HTTP {status}: {body}.")]
	TokenEndpoint {
		/// HTTP status code.
		status: u16,
		/// Response body, lossily decoded.
		body: String,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint reported a lifetime outside the accepted range.
	#[error("Token endpoint returned an out-of-range expires_in of {expires_in}.")]
	InvalidExpiry {
		/// Lifetime in seconds as reported.
		expires_in: i64,
	},
	/// Token value cannot be carried in an HTTP header.
	#[error("Authorization value is not a valid HTTP header value.")]
	InvalidHeaderValue,
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Network-layer failure such as a reset connection or unexpected EOF; retryable.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Host or URL that was being called.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Non-network transport failure; permanent.
	#[error("Request to {target} could not be performed.")]
	Request {
		/// Host or URL that was being called.
		target: String,
		/// Transport-specific error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport; treated as network-layer.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}

	/// Wraps a permanent transport error.
	pub fn request(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Request { target: target.into(), source: Box::new(src) }
	}

	/// Returns `true` for failures that a retry may fix.
	pub fn is_network(&self) -> bool {
		matches!(self, Self::Network { .. } | Self::Io(_))
	}
}

/// Malformed rate-limit signaling. Permanent: a server or configuration problem.
#[derive(Debug, ThisError)]
pub enum RateLimitError {
	/// `Date` header is absent or not an IMF-fixdate.
	#[error("Date header is missing or invalid.")]
	InvalidDate,
	/// A numeric `X-Rate-Limit-*` header is absent or not an integer.
	#[error("{header} header is missing or invalid.")]
	InvalidHeader {
		/// Header name.
		header: &'static str,
	},
}
