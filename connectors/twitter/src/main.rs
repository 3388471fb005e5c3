//! twitwi - filtered-stream reply bot
//!
//! Follows one account and replies to each of its tweets, either with a fixed
//! text or with the video URL of the tweet it references.

#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use twitwi::{Bot, BotConfig, DEFAULT_ECHO_TEXT, ReplyMode, TwitterConfig, TwitterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Reply with a fixed text
    Echo,
    /// Reply with the first video variant of the referenced tweet
    MediaRelay,
}

#[derive(Debug, Parser)]
#[command(name = "twitwi", version, about = "Reply bot for the Twitter/X filtered stream")]
struct Cli {
    /// Account to follow
    #[arg(long)]
    account: String,

    /// Reply strategy
    #[arg(long, value_enum, default_value_t = Mode::Echo)]
    mode: Mode,

    /// Reply text in echo mode
    #[arg(long, default_value = DEFAULT_ECHO_TEXT)]
    echo_text: String,

    /// Id of the bot account; looked up when omitted
    #[arg(long)]
    self_user_id: Option<String>,

    /// Ceiling on concurrently running reply tasks
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Extra stream query parameter, `key=value`; repeatable
    #[arg(long = "stream-param", value_parser = parse_key_val)]
    stream_params: Vec<(String, String)>,

    /// API base URL
    #[arg(long, default_value = "https://api.twitter.com")]
    api_url: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[arg(long, env = "TWITWI_BEARER", hide_env_values = true)]
    bearer_token: String,

    #[arg(long, env = "TWITWI_CONSUMER_KEY", hide_env_values = true)]
    consumer_key: String,

    #[arg(long, env = "TWITWI_CONSUMER_SECRET", hide_env_values = true)]
    consumer_secret: String,

    #[arg(long, env = "TWITWI_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    #[arg(long, env = "TWITWI_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    access_token_secret: String,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    fn twitter_config(&self) -> TwitterConfig {
        let mut stream_params = twitwi::default_stream_params();
        for (key, value) in &self.stream_params {
            match stream_params.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1.clone_from(value),
                None => stream_params.push((key.clone(), value.clone())),
            }
        }

        TwitterConfig {
            consumer_key: self.consumer_key.clone(),
            consumer_secret: self.consumer_secret.clone(),
            access_token: self.access_token.clone(),
            access_token_secret: self.access_token_secret.clone(),
            bearer_token: self.bearer_token.clone(),
            api_url: self.api_url.clone(),
            stream_params,
            max_in_flight: self.max_in_flight,
            ..TwitterConfig::default()
        }
    }

    fn bot_config(&self) -> twitwi::TwitterResult<BotConfig> {
        let mode = match self.mode {
            Mode::Echo => ReplyMode::Echo {
                text: self.echo_text.clone(),
            },
            Mode::MediaRelay => ReplyMode::MediaRelay,
        };

        let config = BotConfig::new(&self.account, mode)?;
        Ok(match &self.self_user_id {
            Some(id) => config.with_self_user_id(id.clone()),
            None => config,
        })
    }
}

/// Label a fatal error with the stage it ended the run in.
fn describe_failure(e: TwitterError) -> anyhow::Error {
    let stage = if e.is_stream_failure() {
        "stream terminated"
    } else {
        "startup failed"
    };
    match e.status() {
        Some(status) => anyhow::Error::new(e).context(format!("{stage} (HTTP {status})")),
        None => anyhow::Error::new(e).context(stage),
    }
}

fn init_tracing(json: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "twitwi stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let bot = Bot::new(cli.twitter_config(), cli.bot_config()?)
        .context("invalid configuration")?;

    tracing::info!(account = %cli.account, mode = ?cli.mode, "twitwi starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let summary = runtime.block_on(bot.run()).map_err(describe_failure)?;
    tracing::info!(?summary, "twitwi finished");
    Ok(())
}
