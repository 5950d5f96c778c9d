//! # Taleem (quiz and Urdu translation practice)
//!
//! This crate holds the parts of Taleem that carry real invariants: the
//! encrypted-at-rest store for each user's third-party AI API key and the
//! per-user hourly quota on AI calls. Everything else in the product is CRUD
//! and lives elsewhere.
//!
//! ## Secret Codec
//!
//! API keys are sealed with AES-256-GCM under a process-wide key read from the
//! environment (`TALEEM_ENCRYPTION_KEY`, 64 hex characters). The stored form is
//! `iv:tag:ciphertext` in lowercase hex. A fresh random IV is drawn for every
//! call, so sealing the same key twice never yields the same text. Any
//! tampering, truncation or key rotation surfaces as a decryption error, never
//! as wrong plaintext.
//!
//! ## Rate Limiter
//!
//! Fixed one-hour windows per identity, held in memory and lost on restart.
//! Every check counts, including refused ones. A background sweeper drops
//! expired windows every five minutes.
//!
//! ## Identity
//!
//! Authentication is delegated to the gateway in front of the service; it
//! forwards the user id in `x-authenticated-user` and roles in
//! `x-authenticated-role`.

pub mod ai;
pub mod api;
pub mod cli;
pub mod codec;
pub mod rate_limit;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// First seven characters of a commit hash, or the whole hash if shorter.
pub(crate) fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
