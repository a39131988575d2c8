//! DPoP (RFC 9449) proof-of-possession keys and proofs.
//!
//! A [`DpopKey`] is generated once per token exchange and lives exactly as long as the
//! access token it was bound to. Each outbound request gets a fresh proof carrying the
//! request method and URL, the most recent server nonce, and the access-token hash.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{RsaPrivateKey, pkcs1v15, signature::SignatureEncoding, traits::PublicKeyParts};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{
		assertion::{compact_jws, random_jti},
		key::signing_error,
	},
	error::AuthError,
	http::strip_query,
};

/// Request header carrying the proof.
pub const DPOP_HEADER: &str = "dpop";
/// Response header carrying a server-issued nonce.
pub const NONCE_HEADER: &str = "dpop-nonce";
/// Marker header sent alongside DPoP-bound API requests.
pub const EXTENDED_USER_AGENT_HEADER: &str = "x-okta-user-agent-extended";
/// Value of [`EXTENDED_USER_AGENT_HEADER`].
pub const EXTENDED_USER_AGENT_VALUE: &str = "isDPoP:true";
/// Modulus size of generated proof keys.
pub const KEY_BITS: usize = 2048;

/// Public half of a [`DpopKey`] as embedded in proof headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
	/// Key type; always `RSA`.
	pub kty: String,
	/// Base64url modulus.
	pub n: String,
	/// Base64url public exponent.
	pub e: String,
	/// RFC 7638 thumbprint of the key.
	pub kid: String,
}

/// RSA key used to sign DPoP proofs.
#[derive(Clone)]
pub struct DpopKey {
	signer: pkcs1v15::SigningKey<Sha256>,
	jwk: PublicJwk,
}
impl DpopKey {
	/// Generates a fresh RSA-2048 key.
	pub fn generate() -> Result<Self, AuthError> {
		let key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, KEY_BITS).map_err(signing_error)?;

		Ok(Self::from_rsa(key))
	}

	/// Wraps an existing RSA key.
	pub fn from_rsa(key: RsaPrivateKey) -> Self {
		let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
		let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());
		let kid = thumbprint(&n, &e);

		Self { signer: pkcs1v15::SigningKey::new(key), jwk: PublicJwk { kty: "RSA".into(), n, e, kid } }
	}

	/// Public key embedded in every proof.
	pub fn public_jwk(&self) -> &PublicJwk {
		&self.jwk
	}

	/// RFC 7638 thumbprint of the public key.
	pub fn thumbprint(&self) -> &str {
		&self.jwk.kid
	}

	/// Signs a proof for `method` and `target` issued now.
	///
	/// An empty `nonce` is omitted from the claims. `ath` is only present when
	/// `access_token` is given.
	pub fn proof(
		&self,
		method: &Method,
		target: &Url,
		nonce: Option<&str>,
		access_token: Option<&str>,
	) -> Result<String, AuthError> {
		self.proof_at(method, target, nonce, access_token, OffsetDateTime::now_utc())
	}

	/// Same as [`Self::proof`] with an explicit issue instant.
	pub fn proof_at(
		&self,
		method: &Method,
		target: &Url,
		nonce: Option<&str>,
		access_token: Option<&str>,
		issued_at: OffsetDateTime,
	) -> Result<String, AuthError> {
		let header = ProofHeader { typ: "dpop+jwt", alg: "RS256", jwk: &self.jwk };
		let htu = strip_query(target);
		let claims = ProofClaims {
			htm: method.as_str(),
			htu: htu.as_str(),
			iat: issued_at.unix_timestamp(),
			nonce: nonce.filter(|nonce| !nonce.is_empty()),
			jti: random_jti(),
			ath: access_token.map(access_token_hash),
		};

		compact_jws(&header, &claims, |message| {
			rsa::signature::Signer::try_sign(&self.signer, message)
				.map(|signature: pkcs1v15::Signature| signature.to_vec())
				.map_err(signing_error)
		})
	}
}
impl Debug for DpopKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DpopKey").field("kid", &self.jwk.kid).finish_non_exhaustive()
	}
}

#[derive(Serialize)]
struct ProofHeader<'a> {
	typ: &'static str,
	alg: &'static str,
	jwk: &'a PublicJwk,
}

#[derive(Serialize)]
struct ProofClaims<'a> {
	htm: &'a str,
	htu: &'a str,
	iat: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	nonce: Option<&'a str>,
	jti: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	ath: Option<String>,
}

/// Base64url (no padding) SHA-256 of the access token, as carried in the `ath` claim.
pub fn access_token_hash(access_token: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(access_token.as_bytes()))
}

fn thumbprint(n: &str, e: &str) -> String {
	let canonical = format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#);

	URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}
