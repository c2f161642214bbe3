//! A process-wide cache of rendered feed fragments.
//!
//! Entries are keyed by feed mode & page number, populated when a feed page
//! is rendered and dropped again whenever a post is written. Nothing is
//! persisted; a restart simply starts with an empty cache.
use std::collections::VecDeque;

use tokio::sync::Mutex;


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKey {
	pub mode: String,
	pub page: u64,
}

pub struct RenderCache {
	entries: Mutex<LimitedMap<CacheKey, String>>,
}

/// A map that holds at most `limit` entries, dropping the oldest entry when
/// a new one doesn't fit anymore.
struct LimitedMap<K, V> {
	store: VecDeque<(K, V)>,
	limit: usize,
}


impl CacheKey {
	pub fn new(mode: String, page: u64) -> Self { Self { mode, page } }
}

impl RenderCache {
	pub fn new(limit: usize) -> Self {
		Self {
			entries: Mutex::new(LimitedMap::new(limit)),
		}
	}

	pub async fn get(&self, key: &CacheKey) -> Option<String> {
		self.entries.lock().await.get(key).cloned()
	}

	/// Drops all cached fragments. Called on every post write; the next page
	/// view repopulates its own entry.
	pub async fn invalidate(&self) { self.entries.lock().await.clear(); }

	pub async fn put(&self, key: CacheKey, html: String) {
		self.entries.lock().await.insert(key, html);
	}
}

impl<K, V> LimitedMap<K, V>
where
	K: PartialEq,
{
	fn new(limit: usize) -> Self {
		debug_assert!(limit > 0, "Can't use a limit smaller than 1");
		Self {
			store: VecDeque::new(),
			limit,
		}
	}

	fn clear(&mut self) { self.store.clear(); }

	fn get(&self, key: &K) -> Option<&V> {
		self.store
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v)
	}

	fn insert(&mut self, key: K, value: V) {
		if let Some(entry) = self.store.iter_mut().find(|(k, _)| k == &key) {
			entry.1 = value;
			return;
		}
		while self.store.len() >= self.limit {
			self.store.pop_front();
		}
		self.store.push_back((key, value));
	}
}
