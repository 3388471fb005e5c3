//! Decides which stream events get a reply.

use std::fmt;

use crate::config::ReplyMode;
use crate::event::StreamEvent;

/// Why an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Written by the bot account itself; replying would loop.
    SelfAuthored,
    /// Media relay needs exactly one included tweet to look up.
    AmbiguousReference,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfAuthored => f.write_str("self-authored"),
            Self::AmbiguousReference => f.write_str("ambiguous or missing referenced tweet"),
        }
    }
}

/// Outcome of classifying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ignore(IgnoreReason),
    Dispatch,
}

/// Classify `event` for a bot whose own account id is `self_author_id`.
///
/// The self-authored check always wins. Echo mode replies to everything else;
/// media relay also requires a single included tweet.
#[must_use]
pub fn classify(event: &StreamEvent, self_author_id: &str, mode: &ReplyMode) -> Action {
    if event.author_id.as_deref() == Some(self_author_id) {
        return Action::Ignore(IgnoreReason::SelfAuthored);
    }

    if matches!(mode, ReplyMode::MediaRelay) && event.single_included_tweet().is_none() {
        return Action::Ignore(IgnoreReason::AmbiguousReference);
    }

    Action::Dispatch
}
