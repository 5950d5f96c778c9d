//! Encrypted-secret-at-rest for user API keys.
//!
//! Flow Overview:
//! 1) Acquire the 256-bit key from configuration (revalidated on every call).
//! 2) Seal the secret with AES-256-GCM under a fresh random 16-byte IV.
//! 3) Persist `iv:authTag:ciphertext` as lowercase hex.
//!
//! Decryption verifies the tag before returning anything, so tampering,
//! truncation and a rotated key all surface as `CodecError::Decryption`
//! instead of garbage plaintext.

pub mod key;

pub use key::{DEFAULT_KEY_ENV, KEY_LEN, KeyProvider, KeySource};

use aes_gcm::{
    AesGcm,
    aead::{AeadInPlace, KeyInit, consts::U16, generic_array::GenericArray},
    aes::Aes256,
};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString, zeroize::Zeroize};

/// AES-256-GCM with a 16-byte IV.
type Cipher = AesGcm<Aes256, U16>;

pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 16;
/// Longest secret, in bytes, accepted by `encrypt`.
pub const MAX_SECRET_LEN: usize = 1024;

const SEPARATOR: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Key material is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("encryption error: {0}")]
    Encryption(String),
    /// The encoded value is malformed or failed authentication.
    #[error("decryption error: {0}")]
    Decryption(String),
}

#[derive(Debug)]
pub struct SecretCodec {
    keys: KeyProvider,
}

impl SecretCodec {
    #[must_use]
    pub fn new(source: KeySource) -> Self {
        Self {
            keys: KeyProvider::new(source),
        }
    }

    /// Codec reading its key from the named environment variable.
    #[must_use]
    pub fn from_env(var: impl Into<String>) -> Self {
        Self::new(KeySource::Env(var.into()))
    }

    #[must_use]
    pub fn key_source(&self) -> &KeySource {
        self.keys.source()
    }

    /// Check that key material is currently usable.
    ///
    /// # Errors
    /// Returns `CodecError::Configuration` if the key cannot be acquired.
    pub fn probe(&self) -> Result<(), CodecError> {
        self.keys.acquire().map(|_| ())
    }

    /// Encrypt a secret into `iv:authTag:ciphertext`.
    ///
    /// # Errors
    /// Returns `CodecError::Configuration` if the key cannot be acquired and
    /// `CodecError::Encryption` if the secret is too long or the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        let key = self.keys.acquire()?;

        if plaintext.len() > MAX_SECRET_LEN {
            return Err(CodecError::Encryption(format!(
                "secret exceeds {MAX_SECRET_LEN} bytes"
            )));
        }

        let cipher = Cipher::new_from_slice(&key.expose_secret()[..])
            .map_err(|e| CodecError::Encryption(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
            .map_err(|e| CodecError::Encryption(e.to_string()))?;

        Ok(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(&buffer)
        ))
    }

    /// Decrypt an `iv:authTag:ciphertext` value.
    ///
    /// # Errors
    /// Returns `CodecError::Decryption` if the value is malformed, fails
    /// authentication or is not UTF-8, and `CodecError::Configuration` if the
    /// key cannot be acquired.
    pub fn decrypt(&self, encoded: &str) -> Result<SecretString, CodecError> {
        let parts: Vec<&str> = encoded.split(SEPARATOR).collect();
        let [iv_hex, tag_hex, ciphertext_hex] = parts.as_slice() else {
            return Err(CodecError::Decryption("invalid format".to_string()));
        };

        let iv = decode_field("iv", iv_hex, Some(IV_LEN))?;
        let tag = decode_field("auth tag", tag_hex, Some(TAG_LEN))?;
        let mut buffer = decode_field("ciphertext", ciphertext_hex, None)?;

        let key = self.keys.acquire()?;
        let cipher = Cipher::new_from_slice(&key.expose_secret()[..])
            .map_err(|e| CodecError::Decryption(e.to_string()))?;

        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&iv),
                b"",
                &mut buffer,
                GenericArray::from_slice(&tag),
            )
            .map_err(|_| CodecError::Decryption("authentication failed".to_string()))?;

        let plaintext = String::from_utf8(buffer).map_err(|err| {
            let mut bytes = err.into_bytes();
            bytes.zeroize();
            CodecError::Decryption("plaintext is not valid UTF-8".to_string())
        })?;

        Ok(SecretString::from(plaintext))
    }
}

fn decode_field(name: &str, value: &str, expected_len: Option<usize>) -> Result<Vec<u8>, CodecError> {
    let bytes = hex::decode(value)
        .map_err(|_| CodecError::Decryption(format!("{name} is not valid hex")))?;

    match expected_len {
        Some(len) if bytes.len() != len => Err(CodecError::Decryption(format!(
            "{name} must be {len} bytes, got {}",
            bytes.len()
        ))),
        _ => Ok(bytes),
    }
}

/// Mask a secret for display, keeping only its last four characters.
#[must_use]
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "***".to_string();
    }
    let suffix: String = secret.chars().skip(count - 4).collect();
    format!("***{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn codec() -> SecretCodec {
        SecretCodec::new(KeySource::Fixed(SecretString::from(KEY_HEX.to_string())))
    }

    fn flip_hex(c: char) -> char {
        if c == '0' { '1' } else { '0' }
    }

    #[test]
    fn roundtrip_preserves_plaintext() {
        let codec = codec();
        let long = "k".repeat(MAX_SECRET_LEN);
        for plaintext in ["", "AIzaSyD-example-key", "کلید خفیہ 🔑", long.as_str()] {
            let encoded = codec.encrypt(plaintext).expect("encrypt");
            let decoded = codec.decrypt(&encoded).expect("decrypt");
            assert_eq!(decoded.expose_secret(), plaintext);
        }
    }

    #[test]
    fn encoding_has_three_lowercase_hex_fields() {
        let encoded = codec().encrypt("sk-test-1234").expect("encrypt");
        let parts: Vec<&str> = encoded.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), IV_LEN * 2);
        assert_eq!(parts[1].len(), TAG_LEN * 2);
        assert_eq!(parts[2].len(), "sk-test-1234".len() * 2);
        for part in parts {
            assert!(part.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn encrypt_is_not_deterministic() {
        let codec = codec();
        let first = codec.encrypt("same secret").expect("encrypt");
        let second = codec.encrypt("same secret").expect("encrypt");
        assert_ne!(first, second);
        assert_eq!(codec.decrypt(&first).expect("decrypt").expose_secret(), "same secret");
        assert_eq!(codec.decrypt(&second).expect("decrypt").expose_secret(), "same secret");
    }

    #[test]
    fn encrypt_rejects_oversized_secret() {
        let err = codec().encrypt(&"k".repeat(MAX_SECRET_LEN + 1)).unwrap_err();
        assert!(matches!(err, CodecError::Encryption(_)));
    }

    #[test]
    fn any_flipped_tag_or_ciphertext_char_is_detected() {
        let codec = codec();
        let encoded = codec.encrypt("sk-test-1234").expect("encrypt");
        let tag_start = IV_LEN * 2 + 1;

        for (index, c) in encoded.char_indices().skip(tag_start) {
            if c == ':' {
                continue;
            }
            let mut tampered: Vec<char> = encoded.chars().collect();
            tampered[index] = flip_hex(c);
            let tampered: String = tampered.into_iter().collect();

            let err = codec.decrypt(&tampered).unwrap_err();
            assert!(
                matches!(err, CodecError::Decryption(_)),
                "position {index} was not detected"
            );
        }
    }

    #[test]
    fn flipped_iv_is_detected() {
        let codec = codec();
        let encoded = codec.encrypt("sk-test-1234").expect("encrypt");
        let mut chars: Vec<char> = encoded.chars().collect();
        chars[0] = flip_hex(chars[0]);
        let tampered: String = chars.into_iter().collect();
        assert!(matches!(codec.decrypt(&tampered), Err(CodecError::Decryption(_))));
    }

    #[test]
    fn malformed_input_is_decryption_error() {
        let codec = codec();
        for input in ["not-three-parts", "a:b", "a:b:c:d", "zz:yy:xx", ""] {
            assert!(
                matches!(codec.decrypt(input), Err(CodecError::Decryption(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn truncated_iv_is_decryption_error() {
        let codec = codec();
        let encoded = codec.encrypt("sk-test-1234").expect("encrypt");
        let truncated = &encoded[2..];
        assert!(matches!(codec.decrypt(truncated), Err(CodecError::Decryption(_))));
    }

    #[test]
    fn wrong_key_is_decryption_error() {
        let encoded = codec().encrypt("sk-test-1234").expect("encrypt");
        let other = SecretCodec::new(KeySource::Fixed(SecretString::from("ab".repeat(KEY_LEN))));
        assert!(matches!(other.decrypt(&encoded), Err(CodecError::Decryption(_))));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let encoded = codec().encrypt("sk-test-1234").expect("encrypt");
        temp_env::with_var("TALEEM_TEST_CODEC_KEY", None::<&str>, || {
            let codec = SecretCodec::from_env("TALEEM_TEST_CODEC_KEY");
            assert!(matches!(codec.probe(), Err(CodecError::Configuration(_))));
            assert!(matches!(codec.encrypt("secret"), Err(CodecError::Configuration(_))));
            assert!(matches!(codec.decrypt(&encoded), Err(CodecError::Configuration(_))));
        });
    }

    #[test]
    fn short_key_is_configuration_error() {
        temp_env::with_var("TALEEM_TEST_CODEC_SHORT_KEY", Some("0011"), || {
            let codec = SecretCodec::from_env("TALEEM_TEST_CODEC_SHORT_KEY");
            assert!(matches!(codec.encrypt("secret"), Err(CodecError::Configuration(_))));
        });
    }

    #[test]
    fn env_key_roundtrip() {
        temp_env::with_var("TALEEM_TEST_CODEC_ENV_KEY", Some(KEY_HEX), || {
            let codec = SecretCodec::from_env("TALEEM_TEST_CODEC_ENV_KEY");
            let encoded = codec.encrypt("from env").expect("encrypt");
            assert_eq!(codec.decrypt(&encoded).expect("decrypt").expose_secret(), "from env");
        });
    }

    #[test]
    fn redact_keeps_last_four() {
        assert_eq!(redact("AIzaSyD-example-key"), "***-key");
        assert_eq!(redact("abcdefgh"), "***efgh");
        assert_eq!(redact("abcd"), "***");
        assert_eq!(redact(""), "***");
    }
}
