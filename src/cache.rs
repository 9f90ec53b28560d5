use crate::tmdb::{DiscoverPage, DiscoverQuery, MovieDetails, TmdbApi};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const MAX_CACHE_ENTRIES: usize = 2_000;

struct Entry<V> {
    stored: Instant,
    seq: u64,
    value: V,
}

struct Entries<K, V> {
    map: HashMap<K, Entry<V>>,
    next_seq: u64,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<Entries<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_CACHE_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.entries.lock().await;
        match guard.map.get(key) {
            Some(entry) if entry.stored.elapsed() < self.ttl => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        guard.map.remove(key);
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut guard = self.entries.lock().await;
        if !guard.map.contains_key(&key) && guard.map.len() >= self.max_entries {
            let ttl = self.ttl;
            guard.map.retain(|_, entry| entry.stored.elapsed() < ttl);
            // Still full: evict the oldest insert.
            while guard.map.len() >= self.max_entries {
                let oldest = guard
                    .map
                    .iter()
                    .min_by_key(|(_, entry)| entry.seq)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        debug!("Cache full; evicting oldest entry");
                        guard.map.remove(&k);
                    }
                    None => break,
                }
            }
        }
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.map.insert(
            key,
            Entry {
                stored: Instant::now(),
                seq,
                value,
            },
        );
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().await.map.remove(key).map(|entry| entry.value)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }
}

pub struct CachedTmdb {
    inner: Arc<dyn TmdbApi>,
    discover: TtlCache<String, DiscoverPage>,
    details: TtlCache<(u64, String), MovieDetails>,
}

impl CachedTmdb {
    pub fn new(inner: Arc<dyn TmdbApi>, ttl: Duration) -> Self {
        Self {
            inner,
            discover: TtlCache::new(ttl),
            details: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl TmdbApi for CachedTmdb {
    async fn discover(&self, query: &DiscoverQuery) -> Result<DiscoverPage> {
        let key = query.cache_key();
        if let Some(page) = self.discover.get(&key).await {
            debug!("discover cache hit: {}", key);
            return Ok(page);
        }
        let page = self.inner.discover(query).await?;
        self.discover.insert(key, page.clone()).await;
        Ok(page)
    }

    async fn movie_details(&self, id: u64, language: &str) -> Result<MovieDetails> {
        let key = (id, language.to_string());
        if let Some(details) = self.details.get(&key).await {
            debug!("details cache hit: {} ({})", id, language);
            return Ok(details);
        }
        let details = self.inner.movie_details(id, language).await?;
        self.details.insert(key, details.clone()).await;
        Ok(details)
    }
}
