//! Encryption key acquisition.
//!
//! The key is 32 bytes supplied as hex, normally through an environment
//! variable. A parsed key is cached next to the raw value it came from and the
//! cache is revalidated on every acquisition, so rotating or unsetting the
//! variable takes effect on the next call.

use super::CodecError;
use secrecy::{ExposeSecret, SecretBox, SecretString, zeroize::Zeroize};
use std::sync::{Arc, RwLock};

pub const DEFAULT_KEY_ENV: &str = "TALEEM_ENCRYPTION_KEY";
pub const KEY_LEN: usize = 32;

pub type Key = SecretBox<[u8; KEY_LEN]>;

#[derive(Debug, Clone)]
pub enum KeySource {
    /// Hex key read from the named environment variable on every acquisition.
    Env(String),
    /// Hex key held in memory.
    Fixed(SecretString),
}

impl KeySource {
    fn raw(&self) -> Result<SecretString, CodecError> {
        match self {
            Self::Env(name) => std::env::var(name)
                .map(SecretString::from)
                .map_err(|_| CodecError::Configuration(format!("{name} is not set"))),
            Self::Fixed(value) => Ok(value.clone()),
        }
    }

    /// Name of the configuration value, for log lines.
    #[must_use]
    pub fn describe(&self) -> &str {
        match self {
            Self::Env(name) => name,
            Self::Fixed(_) => "fixed key",
        }
    }
}

impl Default for KeySource {
    fn default() -> Self {
        Self::Env(DEFAULT_KEY_ENV.to_string())
    }
}

#[derive(Debug)]
struct CachedKey {
    raw: SecretString,
    key: Arc<Key>,
}

#[derive(Debug)]
pub struct KeyProvider {
    source: KeySource,
    cache: RwLock<Option<CachedKey>>,
}

impl KeyProvider {
    #[must_use]
    pub fn new(source: KeySource) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// Acquire the current key.
    ///
    /// # Errors
    /// Returns `CodecError::Configuration` if the value is absent, not hex, or
    /// does not decode to exactly 32 bytes.
    pub fn acquire(&self) -> Result<Arc<Key>, CodecError> {
        let raw = self.source.raw()?;

        // A poisoned lock only costs a re-parse.
        if let Ok(guard) = self.cache.read() {
            if let Some(cached) = guard.as_ref() {
                if cached.raw.expose_secret() == raw.expose_secret() {
                    return Ok(Arc::clone(&cached.key));
                }
            }
        }

        let key = Arc::new(parse_key(raw.expose_secret())?);
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(CachedKey {
                raw,
                key: Arc::clone(&key),
            });
        }

        Ok(key)
    }
}

fn parse_key(raw: &str) -> Result<Key, CodecError> {
    let mut bytes = hex::decode(raw.trim()).map_err(|_| {
        CodecError::Configuration("encryption key is not valid hex".to_string())
    })?;

    if bytes.len() != KEY_LEN {
        let len = bytes.len();
        bytes.zeroize();
        return Err(CodecError::Configuration(format!(
            "encryption key must be {KEY_LEN} bytes, got {len}"
        )));
    }

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes);
    bytes.zeroize();
    let boxed = SecretBox::new(Box::new(key));
    key.zeroize();

    Ok(boxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn parse_key_accepts_32_bytes() {
        let key = parse_key(KEY_HEX).expect("valid key");
        assert_eq!(key.expose_secret()[31], 0x1f);
    }

    #[test]
    fn parse_key_rejects_wrong_length() {
        let err = parse_key("00112233").unwrap_err();
        assert!(matches!(err, CodecError::Configuration(msg) if msg.contains("got 4")));
    }

    #[test]
    fn parse_key_rejects_non_hex() {
        let err = parse_key(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, CodecError::Configuration(_)));
    }

    #[test]
    fn env_source_missing_is_configuration_error() {
        temp_env::with_var("TALEEM_TEST_KEY_MISSING", None::<&str>, || {
            let provider = KeyProvider::new(KeySource::Env("TALEEM_TEST_KEY_MISSING".into()));
            let err = provider.acquire().unwrap_err();
            assert!(matches!(err, CodecError::Configuration(msg) if msg.contains("is not set")));
        });
    }

    #[test]
    fn env_source_picks_up_rotation() {
        let provider = KeyProvider::new(KeySource::Env("TALEEM_TEST_KEY_ROTATE".into()));

        let first = temp_env::with_var("TALEEM_TEST_KEY_ROTATE", Some(KEY_HEX), || {
            provider.acquire().expect("first key")
        });

        let rotated = "ff".repeat(KEY_LEN);
        let second = temp_env::with_var("TALEEM_TEST_KEY_ROTATE", Some(rotated.as_str()), || {
            provider.acquire().expect("rotated key")
        });

        assert_ne!(first.expose_secret(), second.expose_secret());
        assert_eq!(second.expose_secret(), &[0xff; KEY_LEN]);

        temp_env::with_var("TALEEM_TEST_KEY_ROTATE", None::<&str>, || {
            assert!(provider.acquire().is_err());
        });
    }

    #[test]
    fn cached_key_is_reused_for_same_value() {
        let provider = KeyProvider::new(KeySource::Fixed(SecretString::from(KEY_HEX.to_string())));
        let first = provider.acquire().expect("key");
        let second = provider.acquire().expect("key");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
