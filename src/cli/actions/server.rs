use crate::{
    ai::AiClient,
    api::{self, AppState},
    codec::SecretCodec,
    rate_limit::RateLimiter,
    store::{CredentialStore, MemoryCredentialStore, PgCredentialStore},
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub encryption_key_env: String,
    pub ai_base_url: String,
    pub ai_model: String,
    pub ai_hourly_limit: u32,
    pub rate_limit_sweep: Duration,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the AI base URL is invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let codec = SecretCodec::from_env(args.encryption_key_env.clone());
    // Keys are validated lazily; a bad key only fails the requests that need it.
    if let Err(err) = codec.probe() {
        warn!(
            "Encryption key from {} is unusable, API key endpoints will fail until it is fixed: {err}",
            args.encryption_key_env
        );
    }

    let limiter = Arc::new(RateLimiter::new());
    let _sweeper = limiter.spawn_sweeper(args.rate_limit_sweep);

    let store: Arc<dyn CredentialStore> = if let Some(dsn) = &args.dsn {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Arc::new(PgCredentialStore::new(pool))
    } else {
        warn!("No DSN configured, API keys are kept in memory only");
        Arc::new(MemoryCredentialStore::new())
    };

    let ai = AiClient::new(&args.ai_base_url, &args.ai_model)?;

    let state = Arc::new(AppState::new(
        codec,
        limiter,
        store,
        ai,
        args.ai_hourly_limit,
    ));

    api::serve(args.port, state).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn
                .as_deref()
                .map_or_else(|| "none (memory store)".to_string(), redact_dsn),
        ),
        ("encryption_key_env", args.encryption_key_env.clone()),
        ("ai_base_url", args.ai_base_url.clone()),
        ("ai_model", args.ai_model.clone()),
        ("ai_hourly_limit", args.ai_hourly_limit.to_string()),
        (
            "rate_limit_sweep",
            format!("{}s", args.rate_limit_sweep.as_secs()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "taleem {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        crate::short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}
