//! Decoded stream events.

use serde::{Deserialize, Serialize};

use crate::types::{MatchingRule, ReferencedTweet, StreamTweet, User};

/// A tweet pulled in through the `referenced_tweets.id` expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedTweet {
    pub id: String,
    pub author_id: Option<String>,
    pub text: String,
}

/// One matching tweet and its expansions, as delivered on the stream.
///
/// Each event is an owned value. Reply tasks get their own copy and never
/// share state with the decode loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub tweet_id: String,
    pub text: String,
    pub author_id: Option<String>,
    pub in_reply_to_user_id: Option<String>,
    pub referenced_tweets: Vec<ReferencedTweet>,
    pub included_tweets: Vec<IncludedTweet>,
    pub included_users: Vec<User>,
    pub matching_rules: Vec<MatchingRule>,
}

impl StreamEvent {
    /// The included tweet, when there is exactly one.
    #[must_use]
    pub fn single_included_tweet(&self) -> Option<&IncludedTweet> {
        match self.included_tweets.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Tags of the rules that matched this tweet.
    pub fn rule_tags(&self) -> impl Iterator<Item = &str> {
        self.matching_rules.iter().filter_map(|r| r.tag.as_deref())
    }
}

impl From<StreamTweet> for StreamEvent {
    fn from(wire: StreamTweet) -> Self {
        let includes = wire.includes.unwrap_or_default();

        Self {
            tweet_id: wire.data.id,
            text: wire.data.text,
            author_id: wire.data.author_id,
            in_reply_to_user_id: wire.data.in_reply_to_user_id,
            referenced_tweets: wire.data.referenced_tweets.unwrap_or_default(),
            included_tweets: includes
                .tweets
                .into_iter()
                .map(|t| IncludedTweet {
                    id: t.id,
                    author_id: t.author_id,
                    text: t.text,
                })
                .collect(),
            included_users: includes.users,
            matching_rules: wire.matching_rules.unwrap_or_default(),
        }
    }
}
