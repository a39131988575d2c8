//! Typed client configuration and validation.
//!
//! [`ClientConfig`] mirrors the camelCase layout management SDK configuration files use, so
//! callers that already loaded such a document can hand the deserialized value straight to
//! [`ApiClient::new`](crate::client::ApiClient::new). Discovery of configuration files and
//! environment variables is left to the caller.

// self
use crate::{_prelude::*, error::ConfigError};

/// Product token sent in the `User-Agent` header.
pub const USER_AGENT: &str = concat!("okta-admin-core/", env!("CARGO_PKG_VERSION"), " rust");
/// Path of the org authorization server token endpoint.
pub const TOKEN_PATH: &str = "/oauth2/v1/token";

/// Supported authorization schemes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AuthorizationMode {
	/// Static API token sent as `Authorization: SSWS <token>`.
	#[default]
	#[serde(rename = "SSWS")]
	Ssws,
	/// Static bearer token sent as `Authorization: Bearer <token>`.
	#[serde(rename = "Bearer")]
	Bearer,
	/// Client credentials grant signed with a PEM private key.
	#[serde(rename = "PrivateKey")]
	PrivateKey,
	/// Client credentials grant with a caller-supplied client assertion.
	#[serde(rename = "JWT")]
	Jwt,
	/// Client credentials grant signed with a JSON Web Key.
	#[serde(rename = "JWK")]
	Jwk,
}
impl AuthorizationMode {
	/// Returns the canonical configuration label.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthorizationMode::Ssws => "SSWS",
			AuthorizationMode::Bearer => "Bearer",
			AuthorizationMode::PrivateKey => "PrivateKey",
			AuthorizationMode::Jwt => "JWT",
			AuthorizationMode::Jwk => "JWK",
		}
	}

	/// Returns `true` for modes that exchange a client assertion for an access token.
	pub const fn uses_assertion(self) -> bool {
		matches!(self, Self::PrivateKey | Self::Jwt | Self::Jwk)
	}
}
impl Display for AuthorizationMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for AuthorizationMode {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"SSWS" => Ok(Self::Ssws),
			"Bearer" => Ok(Self::Bearer),
			"PrivateKey" => Ok(Self::PrivateKey),
			"JWT" => Ok(Self::Jwt),
			"JWK" => Ok(Self::Jwk),
			other => Err(ConfigError::UnknownAuthorizationMode { mode: other.to_owned() }),
		}
	}
}
impl TryFrom<String> for AuthorizationMode {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

/// Outbound proxy settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
	/// Proxy host name. An empty host disables the proxy.
	pub host: String,
	/// Proxy port.
	pub port: u16,
	/// Optional basic-auth user.
	#[serde(default)]
	pub username: Option<String>,
	/// Optional basic-auth password.
	#[serde(default)]
	pub password: Option<String>,
}

/// Rate-limit pacing and retry settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitConfig {
	/// Tracks quota headers and waits for the reset when the quota is exhausted.
	pub enable: bool,
	/// Retries allowed after the first attempt.
	pub max_retries: u32,
	/// Upper bound, in seconds, for a server-dictated 429 delay.
	pub max_backoff: i64,
	/// Constant delay, in seconds, between token endpoint retries.
	pub token_retry_delay: u64,
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self { enable: true, max_retries: 2, max_backoff: 30, token_retry_delay: 1 }
	}
}

/// Response cache settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
	/// Enables the built-in in-memory response cache.
	pub enabled: bool,
	/// Time to live, in seconds, for cached GET responses.
	pub default_ttl: u64,
	/// Interval, in seconds, between sweeps of expired entries.
	pub cleanup_interval: u64,
}
impl Default for CacheConfig {
	fn default() -> Self {
		Self { enabled: false, default_ttl: 300, cleanup_interval: 300 }
	}
}

/// Complete client configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Organization base URL, e.g. `https://acme.okta.com`.
	pub org_url: String,
	/// Selected authorization scheme.
	pub authorization_mode: AuthorizationMode,
	/// Static API or bearer token (`SSWS` and `Bearer` modes).
	pub token: Option<String>,
	/// OAuth client identifier (`PrivateKey` and `JWK` modes).
	pub client_id: Option<String>,
	/// Scopes requested during the client credentials exchange.
	pub scopes: Vec<String>,
	/// PEM private key; literal `\n` sequences are accepted.
	pub private_key: Option<String>,
	/// Optional `kid` placed in signed client assertion headers.
	pub private_key_id: Option<String>,
	/// Caller-supplied client assertion (`JWT` mode).
	pub client_assertion: Option<String>,
	/// JSON Web Key or JSON Web Key Set (`JWK` mode).
	pub jwk: Option<String>,
	/// Declared JWK algorithm family; only `RSA` is supported.
	pub encryption_type: Option<String>,
	/// Extra product tokens appended to the `User-Agent` header.
	pub user_agent_extra: Option<String>,
	/// Headers added to every API request after authorization.
	pub default_headers: HashMap<String, String>,
	/// Whole-request timeout in seconds.
	pub request_timeout: Option<u64>,
	/// Optional outbound proxy.
	pub proxy: Option<ProxyConfig>,
	/// Rate-limit settings.
	pub rate_limit: RateLimitConfig,
	/// Response cache settings.
	pub cache: CacheConfig,
	/// Allows plain-HTTP organization URLs (local testing only).
	pub disable_https_check: bool,
}
impl ClientConfig {
	/// Creates a configuration for `org_url` using `mode`, leaving every other field at its
	/// default.
	pub fn new(org_url: impl Into<String>, mode: AuthorizationMode) -> Self {
		Self { org_url: org_url.into(), authorization_mode: mode, ..Default::default() }
	}

	/// Sets the static token.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Sets the OAuth client identifier.
	pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Replaces the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Sets the PEM private key.
	pub fn with_private_key(mut self, pem: impl Into<String>) -> Self {
		self.private_key = Some(pem.into());

		self
	}

	/// Sets the `kid` used in signed client assertions.
	pub fn with_private_key_id(mut self, kid: impl Into<String>) -> Self {
		self.private_key_id = Some(kid.into());

		self
	}

	/// Sets a caller-supplied client assertion.
	pub fn with_client_assertion(mut self, assertion: impl Into<String>) -> Self {
		self.client_assertion = Some(assertion.into());

		self
	}

	/// Sets the JSON Web Key material and its declared algorithm family.
	pub fn with_jwk(mut self, jwk: impl Into<String>, encryption_type: impl Into<String>) -> Self {
		self.jwk = Some(jwk.into());
		self.encryption_type = Some(encryption_type.into());

		self
	}

	/// Appends product tokens to the `User-Agent` header.
	pub fn with_user_agent_extra(mut self, extra: impl Into<String>) -> Self {
		self.user_agent_extra = Some(extra.into());

		self
	}

	/// Adds a header sent with every API request.
	pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.into(), value.into());

		self
	}

	/// Sets the whole-request timeout in seconds.
	pub fn with_request_timeout(mut self, seconds: u64) -> Self {
		self.request_timeout = Some(seconds);

		self
	}

	/// Routes traffic through `proxy`.
	pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
		self.proxy = Some(proxy);

		self
	}

	/// Overrides the rate-limit settings.
	pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Overrides the response cache settings.
	pub fn with_cache(mut self, cache: CacheConfig) -> Self {
		self.cache = cache;

		self
	}

	/// Allows a plain-HTTP organization URL.
	pub fn with_https_check_disabled(mut self) -> Self {
		self.disable_https_check = true;

		self
	}

	/// Validates the configuration and returns the normalized organization URL.
	///
	/// The org URL must be absolute and use HTTPS unless the check is disabled. Each
	/// authorization mode requires its own fields; default headers must be valid HTTP.
	pub fn validate(&self) -> Result<Url, ConfigError> {
		let org_url = self.org_url()?;
		let mode = self.authorization_mode.as_str();

		match self.authorization_mode {
			AuthorizationMode::Ssws | AuthorizationMode::Bearer => {
				require(&self.token, "token", mode)?;
			},
			AuthorizationMode::PrivateKey => {
				require(&self.client_id, "clientId", mode)?;
				require(&self.private_key, "privateKey", mode)?;
			},
			AuthorizationMode::Jwt => {
				require(&self.client_assertion, "clientAssertion", mode)?;
			},
			AuthorizationMode::Jwk => {
				require(&self.client_id, "clientId", mode)?;
				require(&self.jwk, "jwk", mode)?;
				require(&self.encryption_type, "encryptionType", mode)?;
			},
		}

		if self.authorization_mode.uses_assertion() && self.scopes.is_empty() {
			return Err(ConfigError::MissingField { field: "scopes", mode });
		}

		self.default_header_map()?;

		Ok(org_url)
	}

	/// Returns the `User-Agent` value including any configured extra product tokens.
	pub fn user_agent(&self) -> String {
		match self.user_agent_extra.as_deref().map(str::trim).filter(|extra| !extra.is_empty()) {
			Some(extra) => format!("{USER_AGENT} {extra}"),
			None => USER_AGENT.to_owned(),
		}
	}

	/// Converts [`Self::default_headers`] into a header map.
	pub fn default_header_map(&self) -> Result<HeaderMap, ConfigError> {
		let mut headers = HeaderMap::with_capacity(self.default_headers.len());

		for (name, value) in &self.default_headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
			let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

			headers.insert(header_name, header_value);
		}

		Ok(headers)
	}

	fn org_url(&self) -> Result<Url, ConfigError> {
		let trimmed = self.org_url.trim().trim_end_matches('/');
		let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidOrgUrl { source })?;

		if url.cannot_be_a_base() || url.host_str().is_none() {
			return Err(ConfigError::InvalidOrgUrl { source: url::ParseError::EmptyHost });
		}
		if url.scheme() != "https" && !self.disable_https_check {
			return Err(ConfigError::InsecureOrgUrl { url: trimmed.to_owned() });
		}

		Ok(url)
	}
}

fn require(
	value: &Option<String>,
	field: &'static str,
	mode: &'static str,
) -> Result<(), ConfigError> {
	match value.as_deref() {
		Some(value) if !value.trim().is_empty() => Ok(()),
		_ => Err(ConfigError::MissingField { field, mode }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn deserializes_camel_case_documents() {
		let config: ClientConfig = serde_json::from_value(serde_json::json!({
			"orgUrl": "https://acme.okta.com",
			"authorizationMode": "PrivateKey",
			"clientId": "0oa1",
			"scopes": ["okta.users.read"],
			"privateKey": "pem",
			"rateLimit": { "maxRetries": 4 },
			"cache": { "enabled": true }
		}))
		.expect("Configuration document should deserialize.");

		assert_eq!(config.authorization_mode, AuthorizationMode::PrivateKey);
		assert_eq!(config.rate_limit.max_retries, 4);
		assert_eq!(config.rate_limit.max_backoff, 30);
		assert!(config.rate_limit.enable);
		assert!(config.cache.enabled);
		assert_eq!(config.cache.default_ttl, 300);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn unknown_authorization_mode_is_rejected() {
		let err = "OAuth".parse::<AuthorizationMode>().expect_err("Unknown mode must fail.");

		assert!(matches!(err, ConfigError::UnknownAuthorizationMode { ref mode } if mode == "OAuth"));

		let document = serde_json::json!({ "orgUrl": "https://acme.okta.com", "authorizationMode": "Basic" });

		assert!(serde_json::from_value::<ClientConfig>(document).is_err());
	}

	#[test]
	fn validate_enforces_https_and_required_fields() {
		let insecure = ClientConfig::new("http://acme.okta.com", AuthorizationMode::Ssws)
			.with_token("00abc");

		assert!(matches!(insecure.validate(), Err(ConfigError::InsecureOrgUrl { .. })));
		assert!(insecure.with_https_check_disabled().validate().is_ok());

		let missing = ClientConfig::new("https://acme.okta.com", AuthorizationMode::Jwk)
			.with_client_id("0oa1")
			.with_scopes(["okta.users.read"]);

		assert!(matches!(
			missing.validate(),
			Err(ConfigError::MissingField { field: "jwk", mode: "JWK" })
		));

		let no_scopes = ClientConfig::new("https://acme.okta.com", AuthorizationMode::Jwt)
			.with_client_assertion("a.b.c");

		assert!(matches!(
			no_scopes.validate(),
			Err(ConfigError::MissingField { field: "scopes", .. })
		));
	}

	#[test]
	fn validate_normalizes_org_url_and_headers() {
		let config = ClientConfig::new("https://acme.okta.com/", AuthorizationMode::Bearer)
			.with_token("token")
			.with_default_header("X-Trace", "on");
		let url = config.validate().expect("Configuration should validate.");

		assert_eq!(url.as_str(), "https://acme.okta.com/");
		assert_eq!(
			config.default_header_map().expect("Headers should convert.").get("x-trace"),
			Some(&HeaderValue::from_static("on"))
		);

		let invalid = config.with_default_header("bad header", "x");

		assert!(matches!(invalid.validate(), Err(ConfigError::InvalidHeader { .. })));
	}

	#[test]
	fn user_agent_appends_extra_tokens() {
		let config = ClientConfig::default().with_user_agent_extra("terraform/1.9");

		assert!(config.user_agent().starts_with("okta-admin-core/"));
		assert!(config.user_agent().ends_with(" rust terraform/1.9"));
		assert_eq!(ClientConfig::default().user_agent(), USER_AGENT);
	}
}
