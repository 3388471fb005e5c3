//! Bot configuration.
//!
//! Credentials and tuning knobs are carried as plain values and handed to the
//! constructors that need them. Nothing in the library reads the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TwitterError, TwitterResult};
use crate::types::StreamRule;

/// Literal reply text used by the echo mode when none is configured.
pub const DEFAULT_ECHO_TEXT: &str = "masterclass";

/// Credentials and HTTP settings for the Twitter API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// OAuth 1.0a Consumer Key (API Key)
    pub consumer_key: String,

    /// OAuth 1.0a Consumer Secret (API Secret)
    pub consumer_secret: String,

    /// OAuth 1.0a Access Token
    pub access_token: String,

    /// OAuth 1.0a Access Token Secret
    pub access_token_secret: String,

    /// OAuth 2.0 Bearer Token, used for rule sync and the stream
    pub bearer_token: String,

    /// Base URL for the Twitter API (default: https://api.twitter.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout for one-shot requests. The stream connection has none.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Deadline for a single Reactor invocation
    #[serde(default = "default_react_timeout", with = "duration_secs")]
    pub react_timeout: Duration,

    /// Query parameters sent when opening the filtered stream
    #[serde(default = "default_stream_params")]
    pub stream_params: Vec<(String, String)>,

    /// Largest single stream line accepted before the stream is failed
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Optional ceiling on concurrently running reply tasks
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_react_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_max_line_bytes() -> usize {
    1024 * 1024
}

/// Expansions needed to resolve the referenced tweet inline.
pub fn default_stream_params() -> Vec<(String, String)> {
    vec![
        ("expansions".into(), "referenced_tweets.id,author_id".into()),
        (
            "tweet.fields".into(),
            "author_id,in_reply_to_user_id,referenced_tweets".into(),
        ),
        ("user.fields".into(), "username".into()),
    ]
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: String::new(),
            access_token_secret: String::new(),
            bearer_token: String::new(),
            api_url: default_api_url(),
            timeout: default_timeout(),
            react_timeout: default_react_timeout(),
            stream_params: default_stream_params(),
            max_line_bytes: default_max_line_bytes(),
            max_in_flight: None,
        }
    }
}

impl TwitterConfig {
    /// Check that every credential is present.
    pub fn validate(&self) -> TwitterResult<()> {
        let required = [
            ("bearer_token", &self.bearer_token),
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(TwitterError::Config(format!("{name} is required")));
            }
        }

        if self.max_in_flight == Some(0) {
            return Err(TwitterError::Config(
                "max_in_flight must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// How the Reactor answers a dispatched tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReplyMode {
    /// Reply to every tweet with a fixed text, no lookups.
    Echo { text: String },

    /// Reply with the first video variant URL of the single referenced tweet.
    MediaRelay,
}

impl Default for ReplyMode {
    fn default() -> Self {
        Self::Echo {
            text: DEFAULT_ECHO_TEXT.into(),
        }
    }
}

/// What the bot follows and how it reacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Account whose tweets are streamed (without the leading `@`)
    pub target_account: String,

    /// Id of the authenticated account. Resolved via `users/me` when absent.
    #[serde(default)]
    pub self_user_id: Option<String>,

    /// Reactor strategy
    #[serde(default)]
    pub mode: ReplyMode,
}

impl BotConfig {
    /// Build a config for `account`, rejecting an empty name.
    pub fn new(account: &str, mode: ReplyMode) -> TwitterResult<Self> {
        let account = account.trim().trim_start_matches('@');
        if account.is_empty() {
            return Err(TwitterError::Config("a target account is required".into()));
        }

        if let ReplyMode::Echo { text } = &mode {
            if text.trim().is_empty() {
                return Err(TwitterError::Config("echo text must not be empty".into()));
            }
        }

        Ok(Self {
            target_account: account.to_string(),
            self_user_id: None,
            mode,
        })
    }

    /// Set the authenticated account id up front.
    #[must_use]
    pub fn with_self_user_id(mut self, id: impl Into<String>) -> Self {
        self.self_user_id = Some(id.into());
        self
    }

    /// Rule set installed before streaming starts.
    #[must_use]
    pub fn desired_rules(&self) -> Vec<StreamRule> {
        vec![StreamRule::new(
            format!("from:{}", self.target_account),
            Some(format!("from {}", self.target_account)),
        )]
    }
}
