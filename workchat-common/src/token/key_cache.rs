use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use ed25519_dalek as ed25519;
use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub type VerifyingKeyBytes = [u8; ed25519::PUBLIC_KEY_LENGTH];

#[derive(Debug)]
pub enum KeyCacheError {
    SourceUnavailable(String),
    InvalidKey,
}

impl std::error::Error for KeyCacheError {}

impl fmt::Display for KeyCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCacheError::SourceUnavailable(e) => {
                write!(f, "KeyCacheError: Verifying key source unavailable: {e}")
            }
            KeyCacheError::InvalidKey => write!(f, "KeyCacheError: Verifying key is invalid"),
        }
    }
}

pub trait VerifyingKeySource: Send + Sync {
    fn fetch(&self) -> Result<VerifyingKeyBytes, KeyCacheError>;
}

/// Reads a base64-encoded Ed25519 public key from a file.
pub struct FileKeySource {
    path: PathBuf,
}

impl FileKeySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VerifyingKeySource for FileKeySource {
    fn fetch(&self) -> Result<VerifyingKeyBytes, KeyCacheError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| KeyCacheError::SourceUnavailable(format!("{}: {e}", self.path.display())))?;

        decode_key(contents.trim())
    }
}

pub struct StaticKeySource {
    key: VerifyingKeyBytes,
}

impl StaticKeySource {
    pub fn new(key: VerifyingKeyBytes) -> Self {
        Self { key }
    }
}

impl VerifyingKeySource for StaticKeySource {
    fn fetch(&self) -> Result<VerifyingKeyBytes, KeyCacheError> {
        Ok(self.key)
    }
}

pub fn decode_key(key_b64: &str) -> Result<VerifyingKeyBytes, KeyCacheError> {
    let bytes = b64.decode(key_b64).map_err(|_| KeyCacheError::InvalidKey)?;
    let key = VerifyingKeyBytes::try_from(bytes.as_slice()).map_err(|_| KeyCacheError::InvalidKey)?;

    // Rejects byte strings that are not a point on the curve
    ed25519::VerifyingKey::from_bytes(&key).map_err(|_| KeyCacheError::InvalidKey)?;

    Ok(key)
}

struct CachedKey {
    key: VerifyingKeyBytes,
    fetched_at: Instant,
}

/// Holds the current token verifying key, refetching it from its source once the
/// cached copy is older than `ttl`.
pub struct VerifyingKeyCache {
    source: Box<dyn VerifyingKeySource>,
    ttl: Duration,
    cached: RwLock<Option<CachedKey>>,
}

impl VerifyingKeyCache {
    pub fn new(source: Box<dyn VerifyingKeySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Result<VerifyingKeyBytes, KeyCacheError> {
        if let Ok(cached) = self.cached.read() {
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.key);
                }
            }
        }

        let key = self.source.fetch()?;

        match self.cached.write() {
            Ok(mut cached) => {
                *cached = Some(CachedKey {
                    key,
                    fetched_at: Instant::now(),
                })
            }
            Err(_) => log::warn!("Verifying key cache lock is poisoned; key was not cached"),
        }

        Ok(key)
    }

    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.write() {
            *cached = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        key: VerifyingKeyBytes,
        fetches: Arc<AtomicUsize>,
    }

    impl VerifyingKeySource for CountingSource {
        fn fetch(&self) -> Result<VerifyingKeyBytes, KeyCacheError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.key)
        }
    }

    fn test_key() -> VerifyingKeyBytes {
        ed25519::SigningKey::generate(&mut crate::threadrand::SecureRng)
            .verifying_key()
            .to_bytes()
    }

    #[test]
    fn test_key_is_cached_until_expiry() {
        let key = test_key();
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = VerifyingKeyCache::new(
            Box::new(CountingSource {
                key,
                fetches: Arc::clone(&fetches),
            }),
            Duration::from_secs(600),
        );

        assert_eq!(cache.get().unwrap(), key);
        assert_eq!(cache.get().unwrap(), key);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        cache.invalidate();
        assert_eq!(cache.get().unwrap(), key);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expired_key_is_refetched() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = VerifyingKeyCache::new(
            Box::new(CountingSource {
                key: test_key(),
                fetches: Arc::clone(&fetches),
            }),
            Duration::ZERO,
        );

        cache.get().unwrap();
        cache.get().unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_file_source() {
        let key = test_key();
        let path = std::env::temp_dir().join(format!(
            "workchat-verifying-key-{}.b64",
            crate::threadrand::SecureRng::next_u128()
        ));

        std::fs::write(&path, format!("{}\n", b64.encode(key))).unwrap();
        assert_eq!(FileKeySource::new(&path).fetch().unwrap(), key);

        std::fs::write(&path, "bm90IGEga2V5").unwrap();
        assert!(matches!(
            FileKeySource::new(&path).fetch(),
            Err(KeyCacheError::InvalidKey)
        ));

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            FileKeySource::new(&path).fetch(),
            Err(KeyCacheError::SourceUnavailable(_))
        ));
    }
}
