//! Map validated CLI matches to an action.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{
    ARG_AI_BASE_URL, ARG_AI_HOURLY_LIMIT, ARG_AI_MODEL, ARG_DSN, ARG_ENCRYPTION_KEY_ENV, ARG_PORT,
    ARG_SWEEP_SECONDS,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if a defaulted argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>(ARG_DSN).cloned();

    let encryption_key_env = matches
        .get_one::<String>(ARG_ENCRYPTION_KEY_ENV)
        .cloned()
        .context("missing required argument: --encryption-key-env")?;
    let ai_base_url = matches
        .get_one::<String>(ARG_AI_BASE_URL)
        .cloned()
        .context("missing required argument: --ai-base-url")?;
    let ai_model = matches
        .get_one::<String>(ARG_AI_MODEL)
        .cloned()
        .context("missing required argument: --ai-model")?;
    let ai_hourly_limit = matches
        .get_one::<u32>(ARG_AI_HOURLY_LIMIT)
        .copied()
        .context("missing required argument: --ai-hourly-limit")?;
    let sweep_seconds = matches
        .get_one::<u64>(ARG_SWEEP_SECONDS)
        .copied()
        .context("missing required argument: --rate-limit-sweep-seconds")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        encryption_key_env,
        ai_base_url,
        ai_model,
        ai_hourly_limit,
        rate_limit_sweep: Duration::from_secs(sweep_seconds),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_action_from_flags() {
        temp_env::with_vars(
            [
                ("TALEEM_DSN", None::<&str>),
                ("TALEEM_AI_HOURLY_LIMIT", None),
                ("TALEEM_RATE_LIMIT_SWEEP_SECONDS", None),
                ("TALEEM_ENCRYPTION_KEY_ENV", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec![
                    "taleem",
                    "--dsn",
                    "postgres://taleem@localhost:5432/taleem",
                    "--ai-hourly-limit",
                    "10",
                    "--rate-limit-sweep-seconds",
                    "60",
                ]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected server action");
                };
                assert_eq!(
                    args.dsn.as_deref(),
                    Some("postgres://taleem@localhost:5432/taleem")
                );
                assert_eq!(args.ai_hourly_limit, 10);
                assert_eq!(args.rate_limit_sweep, Duration::from_secs(60));
                assert_eq!(args.encryption_key_env, crate::codec::DEFAULT_KEY_ENV);
            },
        );
    }
}
