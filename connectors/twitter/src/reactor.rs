//! Builds the reply for a dispatched event.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    client::TwitterApiClient,
    config::ReplyMode,
    error::{TwitterError, TwitterResult},
    event::StreamEvent,
    types::{CreateTweetRequest, TweetDetail},
};

/// A reply ready to be posted. Never carries an empty body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRequest {
    in_reply_to_tweet_id: String,
    text: String,
}

impl ReplyRequest {
    /// `None` when either the target or the text is blank.
    #[must_use]
    pub fn new(in_reply_to_tweet_id: impl Into<String>, text: impl Into<String>) -> Option<Self> {
        let in_reply_to_tweet_id = in_reply_to_tweet_id.into();
        let text = text.into();
        if in_reply_to_tweet_id.trim().is_empty() || text.trim().is_empty() {
            return None;
        }
        Some(Self {
            in_reply_to_tweet_id,
            text,
        })
    }

    #[must_use]
    pub fn in_reply_to_tweet_id(&self) -> &str {
        &self.in_reply_to_tweet_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Payload for the create-tweet endpoint.
    #[must_use]
    pub fn to_create_request(&self) -> CreateTweetRequest {
        CreateTweetRequest::new()
            .text(self.text.clone())
            .in_reply_to(self.in_reply_to_tweet_id.clone())
    }
}

/// First variant of the first media entry. No quality selection.
#[must_use]
pub fn select_video_url(detail: &TweetDetail) -> Option<&str> {
    detail
        .media()
        .first()?
        .variants()
        .first()
        .map(|v| v.url.as_str())
}

/// Reply strategy applied to each dispatched event.
#[derive(Debug, Clone)]
pub struct Reactor {
    client: Arc<TwitterApiClient>,
    mode: ReplyMode,
    timeout: Duration,
}

impl Reactor {
    #[must_use]
    pub const fn new(client: Arc<TwitterApiClient>, mode: ReplyMode, timeout: Duration) -> Self {
        Self {
            client,
            mode,
            timeout,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> &ReplyMode {
        &self.mode
    }

    /// Compose the reply for `event`, or `None` when there is nothing to say.
    ///
    /// Lookups are bounded by the reactor timeout; a lookup that fails or
    /// times out is returned as an error for the caller to log.
    #[instrument(skip(self, event), fields(tweet_id = %event.tweet_id))]
    pub async fn react(&self, event: &StreamEvent) -> TwitterResult<Option<ReplyRequest>> {
        match &self.mode {
            ReplyMode::Echo { text } => Ok(ReplyRequest::new(&event.tweet_id, text)),
            ReplyMode::MediaRelay => self.relay_media(event).await,
        }
    }

    async fn relay_media(&self, event: &StreamEvent) -> TwitterResult<Option<ReplyRequest>> {
        let Some(included) = event.single_included_tweet() else {
            debug!("No single referenced tweet to look up");
            return Ok(None);
        };

        let detail = tokio::time::timeout(self.timeout, self.client.get_tweet_detail(&included.id))
            .await
            .map_err(|_| TwitterError::Timeout(self.timeout))??;

        if detail.media().is_empty() {
            debug!(referenced = %included.id, "Referenced tweet has no media");
            return Ok(None);
        }

        let Some(url) = select_video_url(&detail) else {
            debug!(referenced = %included.id, "First media entry has no video variants");
            return Ok(None);
        };

        Ok(ReplyRequest::new(&event.tweet_id, url))
    }
}
