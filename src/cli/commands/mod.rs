pub mod logging;

use crate::{ai, codec::DEFAULT_KEY_ENV};
use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_ENCRYPTION_KEY_ENV: &str = "encryption-key-env";
pub const ARG_AI_BASE_URL: &str = "ai-base-url";
pub const ARG_AI_MODEL: &str = "ai-model";
pub const ARG_AI_HOURLY_LIMIT: &str = "ai-hourly-limit";
pub const ARG_SWEEP_SECONDS: &str = "rate-limit-sweep-seconds";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("taleem")
        .about("Quiz and Urdu translation practice: API key vault and AI relay")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TALEEM_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "Postgres connection string. When omitted, API keys are kept in memory and lost on restart.",
                )
                .env("TALEEM_DSN"),
        )
        .arg(
            Arg::new(ARG_ENCRYPTION_KEY_ENV)
                .long("encryption-key-env")
                .help("Name of the environment variable holding the 64 hex char encryption key")
                .default_value(DEFAULT_KEY_ENV)
                .env("TALEEM_ENCRYPTION_KEY_ENV"),
        )
        .arg(
            Arg::new(ARG_AI_BASE_URL)
                .long("ai-base-url")
                .help("Base URL of the generative-language API")
                .default_value(ai::DEFAULT_BASE_URL)
                .env("TALEEM_AI_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_AI_MODEL)
                .long("ai-model")
                .help("Model used for generation")
                .default_value(ai::DEFAULT_MODEL)
                .env("TALEEM_AI_MODEL"),
        )
        .arg(
            Arg::new(ARG_AI_HOURLY_LIMIT)
                .long("ai-hourly-limit")
                .help("AI requests allowed per user per hour")
                .default_value("30")
                .env("TALEEM_AI_HOURLY_LIMIT")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_SWEEP_SECONDS)
                .long("rate-limit-sweep-seconds")
                .help("Seconds between sweeps of expired rate-limit windows")
                .default_value("300")
                .env("TALEEM_RATE_LIMIT_SWEEP_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    logging::with_args(command)
}
