//! Shared handler state.
//!
//! Built once at startup and handed to every handler through an `Extension`.
//! Tests build their own instances so nothing leaks between them.

use crate::{ai::AiClient, codec::SecretCodec, rate_limit::RateLimiter, store::CredentialStore};
use std::sync::Arc;

pub struct AppState {
    codec: SecretCodec,
    limiter: Arc<RateLimiter>,
    store: Arc<dyn CredentialStore>,
    ai: AiClient,
    ai_hourly_limit: u32,
}

impl AppState {
    #[must_use]
    pub fn new(
        codec: SecretCodec,
        limiter: Arc<RateLimiter>,
        store: Arc<dyn CredentialStore>,
        ai: AiClient,
        ai_hourly_limit: u32,
    ) -> Self {
        Self {
            codec,
            limiter,
            store,
            ai,
            ai_hourly_limit,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &SecretCodec {
        &self.codec
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        self.limiter.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn ai(&self) -> &AiClient {
        &self.ai
    }

    #[must_use]
    pub fn ai_hourly_limit(&self) -> u32 {
        self.ai_hourly_limit
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("codec", &self.codec)
            .field("tracked_identities", &self.limiter.len())
            .field("store", &self.store.kind())
            .field("ai_model", &self.ai.model())
            .field("ai_hourly_limit", &self.ai_hourly_limit)
            .finish()
    }
}
