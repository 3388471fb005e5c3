//! Posts replies.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    client::TwitterApiClient,
    error::{TwitterError, TwitterResult},
    reactor::ReplyRequest,
};

/// Result of one publish attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The reply was created.
    Posted { tweet_id: String },
    /// The server answered with a non-success status. Not retried.
    Rejected { status: u16, body: String },
}

/// Sends replies through the shared API client.
#[derive(Debug, Clone)]
pub struct ReplyPublisher {
    client: Arc<TwitterApiClient>,
}

impl ReplyPublisher {
    #[must_use]
    pub const fn new(client: Arc<TwitterApiClient>) -> Self {
        Self { client }
    }

    /// Post `reply` once.
    ///
    /// A non-success status is reported as [`PublishOutcome::Rejected`];
    /// transport and decode failures are returned as errors.
    #[instrument(skip(self, reply), fields(in_reply_to = %reply.in_reply_to_tweet_id()))]
    pub async fn publish(&self, reply: &ReplyRequest) -> TwitterResult<PublishOutcome> {
        match self.client.create_tweet(&reply.to_create_request()).await {
            Ok(created) => {
                info!(tweet_id = %created.id, "Reply posted");
                Ok(PublishOutcome::Posted {
                    tweet_id: created.id,
                })
            }
            Err(TwitterError::Api { status, message }) => {
                warn!(status, body = %message, "Reply rejected");
                Ok(PublishOutcome::Rejected {
                    status,
                    body: message,
                })
            }
            Err(e) => Err(e),
        }
    }
}
