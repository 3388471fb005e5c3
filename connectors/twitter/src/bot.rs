//! Bot orchestration.
//!
//! Startup is strictly sequential (resolve self id, sync rules, open the
//! stream). After that the stream is consumed in wire order and every
//! dispatched event is handed to its own task, so a slow reply never delays
//! reading the next event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    classify::{Action, classify},
    client::TwitterApiClient,
    config::{BotConfig, TwitterConfig},
    error::TwitterResult,
    event::StreamEvent,
    publish::{PublishOutcome, ReplyPublisher},
    reactor::Reactor,
    rules::RuleManager,
    stream::FilteredStream,
};

/// Event counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Events decoded from the stream
    pub received: u64,
    /// Events dropped by the classifier
    pub ignored: u64,
    /// Events handed to a reply task
    pub dispatched: u64,
    /// Replies created
    pub posted: u64,
    /// Replies refused by the server
    pub rejected: u64,
    /// Reply tasks that failed on a lookup, transport error or panic
    pub failed: u64,
    /// Reply tasks that found nothing to reply with
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    ignored: AtomicU64,
    dispatched: AtomicU64,
    posted: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RunSummary {
        RunSummary {
            received: self.received.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            posted: self.posted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Filtered-stream reply bot.
#[derive(Debug)]
pub struct Bot {
    config: TwitterConfig,
    bot: BotConfig,
    client: Arc<TwitterApiClient>,
    counters: Arc<Counters>,
}

impl Bot {
    /// Validate configuration and build the shared client. No network calls.
    pub fn new(config: TwitterConfig, bot: BotConfig) -> TwitterResult<Self> {
        config.validate()?;
        let client = Arc::new(TwitterApiClient::new(&config)?);

        Ok(Self {
            config,
            bot,
            client,
            counters: Arc::new(Counters::default()),
        })
    }

    async fn resolve_self_id(&self) -> TwitterResult<String> {
        if let Some(id) = &self.bot.self_user_id {
            return Ok(id.clone());
        }

        let me = self.client.get_me().await?;
        info!(user_id = %me.id, username = %me.username, "Resolved authenticated account");
        Ok(me.id)
    }

    /// Run until the stream closes or fails.
    ///
    /// Startup failures and stream failures are returned as errors. Reply
    /// tasks still running when the stream ends are awaited first.
    #[instrument(skip(self), fields(account = %self.bot.target_account))]
    pub async fn run(self) -> TwitterResult<RunSummary> {
        let self_id = self.resolve_self_id().await?;

        let installed = RuleManager::new(Arc::clone(&self.client))
            .sync(&self.bot.desired_rules())
            .await?;
        info!(rules = installed.len(), "Stream rules in place");

        let mut events = FilteredStream::new(Arc::clone(&self.client), self.config.max_line_bytes)
            .open(&self.config.stream_params)
            .await?;

        let reactor = Arc::new(Reactor::new(
            Arc::clone(&self.client),
            self.bot.mode.clone(),
            self.config.react_timeout,
        ));
        let publisher = Arc::new(ReplyPublisher::new(Arc::clone(&self.client)));
        let limiter = self.config.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();

        let outcome = loop {
            let event = match events.next().await {
                Some(Ok(event)) => event,
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            };
            Counters::bump(&self.counters.received);

            match classify(&event, &self_id, reactor.mode()) {
                Action::Ignore(reason) => {
                    Counters::bump(&self.counters.ignored);
                    debug!(tweet_id = %event.tweet_id, %reason, "Ignoring event");
                }
                Action::Dispatch => {
                    Counters::bump(&self.counters.dispatched);
                    debug!(
                        tweet_id = %event.tweet_id,
                        rules = ?event.rule_tags().collect::<Vec<_>>(),
                        "Dispatching event"
                    );
                    let permit = match &limiter {
                        Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
                        None => None,
                    };
                    tasks.spawn(handle_event(
                        event,
                        Arc::clone(&reactor),
                        Arc::clone(&publisher),
                        Arc::clone(&self.counters),
                        permit,
                    ));
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                self.reap(joined);
            }
        };

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for reply tasks");
        }
        while let Some(joined) = tasks.join_next().await {
            self.reap(joined);
        }

        let summary = self.counters.snapshot();
        match outcome {
            Ok(()) => {
                info!(?summary, "Stream closed");
                Ok(summary)
            }
            Err(e) => {
                info!(?summary, "Reply tasks drained after stream failure");
                Err(e)
            }
        }
    }

    fn reap(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            Counters::bump(&self.counters.failed);
            error!(error = %e, "Reply task aborted");
        }
    }
}

/// One Reactor + Publisher unit. Every failure stays local to this event.
async fn handle_event(
    event: StreamEvent,
    reactor: Arc<Reactor>,
    publisher: Arc<ReplyPublisher>,
    counters: Arc<Counters>,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let reply = match reactor.react(&event).await {
        Ok(Some(reply)) => reply,
        Ok(None) => {
            Counters::bump(&counters.skipped);
            debug!(tweet_id = %event.tweet_id, "Nothing to reply with");
            return;
        }
        Err(e) => {
            Counters::bump(&counters.failed);
            warn!(tweet_id = %event.tweet_id, error = %e, "Reactor failed");
            return;
        }
    };

    match publisher.publish(&reply).await {
        Ok(PublishOutcome::Posted { .. }) => Counters::bump(&counters.posted),
        Ok(PublishOutcome::Rejected { .. }) => Counters::bump(&counters.rejected),
        Err(e) => {
            Counters::bump(&counters.failed);
            warn!(tweet_id = %event.tweet_id, error = %e, "Publishing reply failed");
        }
    }
}
