//! Client assertion signing keys loaded from PEM or JSON Web Key material.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::{Signature as EcSignature, SigningKey as EcSigningKey};
use rsa::{BigUint, RsaPrivateKey, pkcs1v15, signature::SignatureEncoding};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError},
};

const PKCS1_LABEL: &str = "RSA PRIVATE KEY";
const PKCS8_LABEL: &str = "PRIVATE KEY";

/// Private key used to sign client assertions.
#[derive(Clone)]
pub enum SigningKey {
	/// RSA key signing with RS256.
	Rs256(pkcs1v15::SigningKey<Sha256>),
	/// P-256 key signing with ES256.
	Es256(EcSigningKey),
}
impl SigningKey {
	/// Parses a PEM encoded private key.
	///
	/// Literal `\n` sequences are unescaped first so keys copied out of single-line
	/// configuration values still parse. `RSA PRIVATE KEY` blocks are PKCS#1;
	/// `PRIVATE KEY` blocks are PKCS#8 and may hold an RSA or a P-256 key.
	pub fn from_pem(pem: &str) -> Result<Self, ConfigError> {
		let pem = pem.replace("\\n", "\n");
		let label = pem_label(&pem).ok_or_else(|| ConfigError::InvalidPrivateKey {
			reason: "no PEM block was found".into(),
		})?;

		match label {
			PKCS1_LABEL => {
				let key = <RsaPrivateKey as rsa::pkcs1::DecodeRsaPrivateKey>::from_pkcs1_pem(&pem)
					.map_err(|e| ConfigError::InvalidPrivateKey { reason: e.to_string() })?;

				Ok(Self::from_rsa(key))
			},
			PKCS8_LABEL => {
				if let Ok(key) = <RsaPrivateKey as rsa::pkcs8::DecodePrivateKey>::from_pkcs8_pem(&pem)
				{
					return Ok(Self::from_rsa(key));
				}
				if let Ok(key) = <EcSigningKey as p256::pkcs8::DecodePrivateKey>::from_pkcs8_pem(&pem)
				{
					return Ok(Self::Es256(key));
				}

				Err(ConfigError::UnsupportedKeyType { kind: "unknown PKCS#8 key".into() })
			},
			other => Err(ConfigError::UnsupportedKeyFormat { label: other.to_owned() }),
		}
	}

	/// Converts a JSON Web Key, or the first key of a JSON Web Key Set, into a signing key.
	///
	/// Only `encryption_type == "RSA"` with an RSA private JWK is supported. The JWK `kid`
	/// is returned alongside the key when present.
	pub fn from_jwk(json: &str, encryption_type: &str) -> Result<(Self, Option<String>), ConfigError> {
		let document: JwkDocument = serde_json::from_str(json)
			.map_err(|e| ConfigError::InvalidJwk { reason: e.to_string() })?;
		let jwk = match document {
			JwkDocument::Set { keys } => keys.into_iter().next().ok_or_else(|| {
				ConfigError::InvalidJwk { reason: "the key set is empty".into() }
			})?,
			JwkDocument::Single(jwk) => jwk,
		};

		if encryption_type != "RSA" {
			return Err(ConfigError::UnsupportedKeyType { kind: encryption_type.to_owned() });
		}
		if jwk.kty != "RSA" {
			return Err(ConfigError::UnsupportedKeyType { kind: jwk.kty });
		}

		let key = jwk.to_rsa()?;

		Ok((Self::from_rsa(key), jwk.kid))
	}

	/// JOSE algorithm name.
	pub fn algorithm(&self) -> &'static str {
		match self {
			SigningKey::Rs256(_) => "RS256",
			SigningKey::Es256(_) => "ES256",
		}
	}

	/// Signs `message`, returning the raw JWS signature bytes.
	pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AuthError> {
		match self {
			SigningKey::Rs256(key) => rsa::signature::Signer::try_sign(key, message)
				.map(|signature: pkcs1v15::Signature| signature.to_vec())
				.map_err(signing_error),
			SigningKey::Es256(key) => {
				let signature: EcSignature =
					p256::ecdsa::signature::Signer::try_sign(key, message).map_err(signing_error)?;

				Ok(signature.to_bytes().to_vec())
			},
		}
	}

	fn from_rsa(key: RsaPrivateKey) -> Self {
		Self::Rs256(pkcs1v15::SigningKey::new(key))
	}
}
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SigningKey").field(&self.algorithm()).field(&"<redacted>").finish()
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JwkDocument {
	Set { keys: Vec<PrivateJwk> },
	Single(PrivateJwk),
}

#[derive(Deserialize)]
struct PrivateJwk {
	kty: String,
	#[serde(default)]
	kid: Option<String>,
	#[serde(default)]
	n: Option<String>,
	#[serde(default)]
	e: Option<String>,
	#[serde(default)]
	d: Option<String>,
	#[serde(default)]
	p: Option<String>,
	#[serde(default)]
	q: Option<String>,
}
impl PrivateJwk {
	fn to_rsa(&self) -> Result<RsaPrivateKey, ConfigError> {
		let n = jwk_integer("n", self.n.as_deref())?;
		let e = jwk_integer("e", self.e.as_deref())?;
		let d = jwk_integer("d", self.d.as_deref())?;
		let primes = match (self.p.as_deref(), self.q.as_deref()) {
			(Some(p), Some(q)) => vec![jwk_integer("p", Some(p))?, jwk_integer("q", Some(q))?],
			_ => Vec::new(),
		};
		let mut key = RsaPrivateKey::from_components(n, e, d, primes)
			.map_err(|e| ConfigError::InvalidJwk { reason: e.to_string() })?;

		key.precompute().map_err(|e| ConfigError::InvalidJwk { reason: e.to_string() })?;

		Ok(key)
	}
}

pub(crate) fn signing_error(e: impl Display) -> AuthError {
	AuthError::Signing { reason: e.to_string() }
}

fn jwk_integer(member: &str, value: Option<&str>) -> Result<BigUint, ConfigError> {
	let value = value.ok_or_else(|| ConfigError::InvalidJwk {
		reason: format!("member `{member}` is missing"),
	})?;
	let bytes = URL_SAFE_NO_PAD.decode(value).map_err(|_| ConfigError::InvalidJwk {
		reason: format!("member `{member}` is not base64url"),
	})?;

	Ok(BigUint::from_bytes_be(&bytes))
}

fn pem_label(pem: &str) -> Option<&str> {
	pem.lines()
		.map(str::trim)
		.find_map(|line| line.strip_prefix("-----BEGIN "))
		.and_then(|rest| rest.strip_suffix("-----"))
}
