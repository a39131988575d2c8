//! Short-lived storage for the active credential and its DPoP binding.
//!
//! The access token, the latest DPoP nonce, and the DPoP signing key are stored as a single
//! [`CachedAuthState`] with one expiry, so they are always evicted together.

// self
use crate::{_prelude::*, auth::Credential, dpop::DpopKey};

/// Seconds trimmed from `expires_in` so the local copy expires before the server's.
pub const EXPIRY_SKEW_SECONDS: i64 = 2;

/// Proof-of-possession material bound to one credential.
#[derive(Clone, Debug)]
pub struct DpopContext {
	/// Most recent server nonce; may be empty.
	pub nonce: String,
	/// Key the credential was bound to.
	pub key: Arc<DpopKey>,
}

/// Credential and DPoP binding sharing a single expiry.
#[derive(Clone, Debug)]
pub struct CachedAuthState {
	/// Active credential.
	pub credential: Credential,
	/// Nonce recorded during the exchange, if DPoP was negotiated.
	pub nonce: Option<String>,
	/// DPoP key paired with the credential.
	pub signing_key: Option<Arc<DpopKey>>,
	/// Local expiry instant.
	pub expires_at: OffsetDateTime,
}
impl CachedAuthState {
	/// Returns `true` while `now` is before the local expiry.
	pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}
}

/// Holds at most one live [`CachedAuthState`] per client.
#[derive(Debug, Default)]
pub struct TokenCache(RwLock<Option<CachedAuthState>>);
impl TokenCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the live state, if any.
	pub fn get(&self) -> Option<CachedAuthState> {
		self.get_at(OffsetDateTime::now_utc())
	}

	/// Returns the state live at `now`.
	pub fn get_at(&self, now: OffsetDateTime) -> Option<CachedAuthState> {
		self.0.read().as_ref().filter(|state| state.is_live_at(now)).cloned()
	}

	/// Stores `credential` and its DPoP binding, returning the cached state.
	///
	/// The entry lives `expires_in - 2s`. Credentials with no remaining lifetime, or with a
	/// lifetime past the calendar's range, are returned for immediate use but not cached.
	pub fn store(&self, credential: Credential, dpop: Option<DpopContext>) -> CachedAuthState {
		self.store_at(credential, dpop, OffsetDateTime::now_utc())
	}

	/// Same as [`Self::store`] with an explicit clock reading.
	pub fn store_at(
		&self,
		credential: Credential,
		dpop: Option<DpopContext>,
		now: OffsetDateTime,
	) -> CachedAuthState {
		let ttl = credential.expires_in.saturating_sub(EXPIRY_SKEW_SECONDS);
		let expires_at = now.checked_add(Duration::seconds(ttl));
		let (nonce, signing_key) = match dpop {
			Some(DpopContext { nonce, key }) => (Some(nonce), Some(key)),
			None => (None, None),
		};
		let state = CachedAuthState {
			credential,
			nonce,
			signing_key,
			expires_at: expires_at.unwrap_or(now),
		};

		if ttl > 0 && expires_at.is_some() {
			*self.0.write() = Some(state.clone());
		} else {
			#[cfg(feature = "tracing")]
			tracing::debug!(expires_in = state.credential.expires_in, "Credential lifetime too short to cache.");
		}

		state
	}

	/// Drops the cached state.
	pub fn invalidate(&self) {
		*self.0.write() = None;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn now() -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Timestamp should convert.")
	}

	#[test]
	fn entries_expire_two_seconds_early() {
		let cache = TokenCache::new();
		let state = cache.store_at(Credential::new("Bearer", "abc", 3600), None, now());

		assert_eq!(state.expires_at, now() + Duration::seconds(3598));
		assert!(cache.get_at(now() + Duration::seconds(3597)).is_some());
		assert!(cache.get_at(now() + Duration::seconds(3598)).is_none());
	}

	#[test]
	fn short_lived_credentials_are_not_cached() {
		let cache = TokenCache::new();
		let state = cache.store_at(Credential::new("Bearer", "abc", 2), None, now());

		assert_eq!(state.credential.access_token.expose(), "abc");
		assert!(cache.get_at(now()).is_none());
	}

	#[test]
	fn extreme_lifetimes_are_returned_uncached() {
		let cache = TokenCache::new();
		let unbounded = cache.store_at(Credential::new("Bearer", "abc", i64::MAX), None, now());

		assert_eq!(unbounded.expires_at, now());
		assert!(cache.get_at(now()).is_none());

		let negative = cache.store_at(Credential::new("Bearer", "abc", i64::MIN), None, now());

		assert_eq!(negative.credential.access_token.expose(), "abc");
		assert!(cache.get_at(now()).is_none());
	}

	#[test]
	fn invalidate_clears_credential_and_binding_together() {
		let cache = TokenCache::new();

		cache.store_at(Credential::new("Bearer", "abc", 3600), None, now());

		assert!(cache.get_at(now()).is_some_and(|state| state.nonce.is_none() && state.signing_key.is_none()));

		cache.invalidate();

		assert!(cache.get_at(now()).is_none());
	}
}
