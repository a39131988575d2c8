//! Thread-safe in-memory [`ResponseCache`] with per-entry TTLs.

// std
use std::time::{Duration as StdDuration, Instant};
// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, Fingerprint, ResponseCache},
	http::HttpResponse,
};

type CacheMap = Arc<RwLock<HashMap<Fingerprint, CacheEntry>>>;

#[derive(Clone, Debug)]
struct CacheEntry {
	response: HttpResponse,
	// `None` when the TTL reaches past what `Instant` can represent.
	expires_at: Option<Instant>,
}
impl CacheEntry {
	fn is_live(&self, now: Instant) -> bool {
		self.expires_at.is_none_or(|expires_at| now < expires_at)
	}
}

/// Process-local response cache.
///
/// Expired entries are dropped when they are read and swept in bulk on writes once the
/// cleanup interval has elapsed.
#[derive(Clone, Debug)]
pub struct MemoryResponseCache {
	entries: CacheMap,
	cleanup_interval: StdDuration,
	last_sweep: Arc<Mutex<Instant>>,
}
impl MemoryResponseCache {
	/// Creates an empty cache sweeping expired entries every `cleanup_interval`.
	pub fn new(cleanup_interval: StdDuration) -> Self {
		Self {
			entries: Default::default(),
			cleanup_interval,
			last_sweep: Arc::new(Mutex::new(Instant::now())),
		}
	}

	/// Number of stored entries, including expired ones not yet swept.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Drops every expired entry.
	pub fn purge_expired(&self) {
		let now = Instant::now();

		self.entries.write().retain(|_, entry| entry.is_live(now));

		*self.last_sweep.lock() = now;
	}

	fn get_now(&self, key: &Fingerprint) -> Option<HttpResponse> {
		let now = Instant::now();

		{
			let map = self.entries.read();

			match map.get(key) {
				Some(entry) if entry.is_live(now) => return Some(entry.response.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut map = self.entries.write();

		if map.get(key).is_some_and(|entry| !entry.is_live(now)) {
			map.remove(key);
		}

		None
	}

	fn set_now(&self, key: Fingerprint, response: HttpResponse, ttl: StdDuration) {
		if ttl.is_zero() {
			return;
		}

		let now = Instant::now();

		self.entries.write().insert(key, CacheEntry { response, expires_at: now.checked_add(ttl) });

		let due = now.duration_since(*self.last_sweep.lock()) >= self.cleanup_interval;

		if due {
			self.purge_expired();
		}
	}
}
impl Default for MemoryResponseCache {
	fn default() -> Self {
		Self::new(StdDuration::from_secs(300))
	}
}
impl ResponseCache for MemoryResponseCache {
	fn has<'a>(&'a self, key: &'a Fingerprint) -> CacheFuture<'a, bool> {
		Box::pin(async move { Ok(self.get_now(key).is_some()) })
	}

	fn get<'a>(&'a self, key: &'a Fingerprint) -> CacheFuture<'a, Option<HttpResponse>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn set(
		&self,
		key: Fingerprint,
		response: HttpResponse,
		ttl: StdDuration,
	) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			self.set_now(key, response, ttl);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a Fingerprint) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.entries.write().remove(key);

			Ok(())
		})
	}

	fn clear(&self) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			self.entries.write().clear();

			Ok(())
		})
	}
}
