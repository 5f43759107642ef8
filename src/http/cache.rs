use crate::http::error::CacheError;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

const CACHE_FILE_NAME: &str = "http_cache.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    stored_at_ms: i64,
    body: Vec<u8>,
}

impl CacheEntry {
    fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        let age_ms = now_ms - self.stored_at_ms;
        age_ms >= 0 && (age_ms as u128) < ttl.as_millis()
    }
}

/// File-backed cache of successful response bodies, keyed by request URL
/// (query string included), with a fixed time-to-live.
///
/// All entries live in one bincode file inside the cache directory. Expired
/// entries are never served and are dropped the next time the file is written.
#[derive(Debug)]
pub struct ResponseCache {
    cache_dir: PathBuf,
    cache_file: PathBuf,
    ttl: Duration,
    write_lock: Mutex<()>,
}

impl ResponseCache {
    pub async fn new(cache_dir: &Path, ttl: Duration) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|e| CacheError::CacheDirCreation(cache_dir.to_path_buf(), e))?;
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            cache_file: cache_dir.join(CACHE_FILE_NAME),
            ttl,
            write_lock: Mutex::new(()),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached body for `key` if it was stored less than `ttl` ago.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.read_entries().await?;
        let now_ms = Utc::now().timestamp_millis();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now_ms, self.ttl) => {
                info!("Cache hit for {}", key);
                Ok(Some(entry.body.clone()))
            }
            Some(_) => {
                info!("Cache entry for {} has expired", key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Stores `body` under `key`, replacing any previous entry and pruning expired ones.
    ///
    /// An undecodable cache file is discarded and replaced.
    pub async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries_for_rewrite().await?;
        let now_ms = Utc::now().timestamp_millis();
        entries.retain(|_, entry| entry.is_fresh(now_ms, self.ttl));
        entries.insert(
            key.to_string(),
            CacheEntry {
                stored_at_ms: now_ms,
                body,
            },
        );
        self.write_entries(entries).await
    }

    /// Drops the entry for `key`, if any.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries_for_rewrite().await?;
        if entries.remove(key).is_some() {
            info!("Evicted cache entry for {}", key);
            self.write_entries(entries).await?;
        }
        Ok(())
    }

    async fn entries_for_rewrite(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        match self.read_entries().await {
            Err(e @ CacheError::CacheDecode(..)) => {
                warn!("Discarding unreadable response cache: {}", e);
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    async fn read_entries(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        let bytes = match tokio::fs::read(&self.cache_file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(CacheError::CacheRead(self.cache_file.clone(), e)),
        };
        let path = self.cache_file.clone();
        tokio::task::spawn_blocking(move || {
            bincode::serde::decode_from_slice::<HashMap<String, CacheEntry>, _>(
                &bytes,
                BINCODE_CONFIG,
            )
            .map(|(entries, _)| entries)
            .map_err(|e| CacheError::CacheDecode(path, Box::new(e)))
        })
        .await?
    }

    async fn write_entries(&self, entries: HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        let cache_dir = self.cache_dir.clone();
        let cache_file = self.cache_file.clone();
        tokio::task::spawn_blocking(move || {
            let bytes = bincode::serde::encode_to_vec(entries, BINCODE_CONFIG)
                .map_err(|e| CacheError::CacheEncode(Box::new(e)))?;

            // Each writer gets its own temp file, renamed over the cache file once complete.
            let mut tmp_file = tempfile::NamedTempFile::new_in(&cache_dir)
                .map_err(|e| CacheError::CacheWrite(cache_dir.clone(), e))?;
            tmp_file
                .write_all(&bytes)
                .and_then(|()| tmp_file.as_file().sync_all())
                .map_err(|e| CacheError::CacheWrite(tmp_file.path().to_path_buf(), e))?;
            tmp_file.persist(&cache_file).map_err(|e| {
                warn!("Failed to move {:?} into place: {}", e.file.path(), e.error);
                CacheError::CacheWrite(cache_file.clone(), e.error)
            })?;
            Ok(())
        })
        .await?
    }
}
