//! twitwi: a reply bot for the Twitter/X filtered stream.
//!
//! The bot follows one account. At startup it replaces the filtered stream's
//! rule set with a single `from:<account>` rule, then consumes the stream and
//! answers each matching tweet with one of two strategies:
//!
//! - `Echo`: reply with a fixed text
//! - `MediaRelay`: reply with the first video variant URL of the tweet it
//!   references
//!
//! ## Pipeline
//!
//! - [`RuleManager`] - list, delete and install stream rules (bearer auth)
//! - [`FilteredStream`] - incremental line decoder over the stream response
//! - [`classify`] - drop self-authored and ambiguous events
//! - [`Reactor`] - build the reply, with a bounded lookup for media relay
//! - [`ReplyPublisher`] - post the reply (OAuth 1.0a)
//! - [`Bot`] - wires the above together, one task per dispatched event

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod bot;
mod classify;
mod client;
mod config;
mod error;
mod event;
mod oauth;
mod publish;
mod reactor;
mod rules;
mod stream;
mod types;

pub use bot::{Bot, RunSummary};
pub use classify::{Action, IgnoreReason, classify};
pub use client::TwitterApiClient;
pub use config::{BotConfig, DEFAULT_ECHO_TEXT, ReplyMode, TwitterConfig, default_stream_params};
pub use error::{TwitterError, TwitterResult};
pub use event::{IncludedTweet, StreamEvent};
pub use oauth::OAuthSigner;
pub use publish::{PublishOutcome, ReplyPublisher};
pub use reactor::{Reactor, ReplyRequest, select_video_url};
pub use rules::RuleManager;
pub use stream::{EventStream, FilteredStream};
pub use types::{
    CreateTweetRequest, CreatedTweet, MatchingRule, MediaEntity, StreamRule, StreamRulesResponse,
    TweetDetail, User, VideoVariant,
};
