//! Twitter API wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Common
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter API error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterApiError {
    /// Error title
    #[serde(default)]
    pub title: Option<String>,

    /// Error detail
    #[serde(default)]
    pub detail: Option<String>,

    /// Error type
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,

    /// Offending value (rule value for rule sync errors)
    #[serde(default)]
    pub value: Option<String>,
}

impl TwitterApiError {
    /// Best human-readable message for this error.
    #[must_use]
    pub fn message(&self) -> &str {
        self.detail
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("Unknown error")
    }
}

/// Single-object response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tweet Types
// ─────────────────────────────────────────────────────────────────────────────

/// Tweet object as delivered on the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    /// Tweet ID
    pub id: String,

    /// Tweet text content
    #[serde(default)]
    pub text: String,

    /// Author user ID
    #[serde(default)]
    pub author_id: Option<String>,

    /// User the tweet replies to
    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,

    /// Referenced tweets (replies, quotes, retweets)
    #[serde(default)]
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
}

/// Referenced tweet (retweet, quote, reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedTweet {
    /// Reference type: "retweeted", "quoted", "replied_to"
    #[serde(rename = "type")]
    pub ref_type: String,

    /// Referenced tweet ID
    pub id: String,
}

/// Twitter user object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Username (handle without @)
    #[serde(default)]
    pub username: String,
}

/// Included expansions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    /// Expanded user objects
    #[serde(default)]
    pub users: Vec<User>,

    /// Expanded tweet objects
    #[serde(default)]
    pub tweets: Vec<Tweet>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tweet Detail (v1.1 extended record)
// ─────────────────────────────────────────────────────────────────────────────

/// Extended record for one tweet, fetched on demand for its media.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TweetDetail {
    #[serde(default)]
    pub id_str: Option<String>,

    #[serde(default)]
    pub extended_entities: Option<ExtendedEntities>,
}

impl TweetDetail {
    /// Media attached to the tweet, empty when there is none.
    #[must_use]
    pub fn media(&self) -> &[MediaEntity] {
        self.extended_entities
            .as_ref()
            .map(|entities| entities.media.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

/// One media attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntity {
    /// "photo", "video" or "animated_gif"
    #[serde(rename = "type")]
    pub media_type: String,

    #[serde(default)]
    pub video_info: Option<VideoInfo>,
}

impl MediaEntity {
    /// Encoded renditions, empty for photos.
    #[must_use]
    pub fn variants(&self) -> &[VideoVariant] {
        self.video_info
            .as_ref()
            .map(|info| info.variants.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub variants: Vec<VideoVariant>,
}

/// One encoded rendition of a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoVariant {
    pub url: String,

    #[serde(default)]
    pub bitrate: Option<u64>,

    #[serde(default)]
    pub content_type: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

/// Create tweet request. Only the fields that are set are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    /// Tweet text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Reply target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<TweetReply>,
}

impl CreateTweetRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Mark this tweet as a reply to `tweet_id`.
    #[must_use]
    pub fn in_reply_to(mut self, tweet_id: impl Into<String>) -> Self {
        let reply = self.reply.get_or_insert_with(|| TweetReply {
            in_reply_to_tweet_id: String::new(),
            exclude_reply_user_ids: None,
        });
        reply.in_reply_to_tweet_id = tweet_id.into();
        self
    }
}

/// Tweet reply settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetReply {
    /// ID of tweet being replied to
    pub in_reply_to_tweet_id: String,

    /// User IDs to exclude from reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_reply_user_ids: Option<Vec<String>>,
}

/// Created tweet data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTweet {
    pub id: String,

    #[serde(default)]
    pub text: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream Types
// ─────────────────────────────────────────────────────────────────────────────

/// Filtered stream rule. The id is assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRule {
    /// Rule ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rule value (query)
    pub value: String,

    /// Rule tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl StreamRule {
    /// A rule that has not been sent to the server yet.
    #[must_use]
    pub fn new(value: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            tag,
        }
    }
}

/// Stream rules response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamRulesResponse {
    #[serde(default)]
    pub data: Option<Vec<StreamRule>>,

    #[serde(default)]
    pub meta: Option<StreamRulesMeta>,

    #[serde(default)]
    pub errors: Option<Vec<TwitterApiError>>,
}

/// Stream rules metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRulesMeta {
    /// Server timestamp
    #[serde(default)]
    pub sent: Option<DateTime<Utc>>,

    #[serde(default)]
    pub result_count: Option<u32>,

    /// Summary of changes (write calls only)
    #[serde(default)]
    pub summary: Option<RulesSummary>,
}

/// Rules change summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSummary {
    #[serde(default)]
    pub created: Option<u32>,

    #[serde(default)]
    pub not_created: Option<u32>,

    #[serde(default)]
    pub deleted: Option<u32>,

    #[serde(default)]
    pub not_deleted: Option<u32>,
}

/// One object on the filtered stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTweet {
    /// Tweet data
    pub data: Tweet,

    /// Included expansions
    #[serde(default)]
    pub includes: Option<Includes>,

    /// Matching rules
    #[serde(default)]
    pub matching_rules: Option<Vec<MatchingRule>>,
}

/// Matching rule for stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: String,

    #[serde(default)]
    pub tag: Option<String>,
}
