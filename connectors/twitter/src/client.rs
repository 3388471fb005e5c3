//! Twitter REST API client.
//!
//! One client is shared by the rule manager, the stream reader and every reply
//! task. `reqwest::Client` pools connections internally and is safe to use
//! from many tasks at once.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    config::TwitterConfig,
    error::{TwitterError, TwitterResult},
    oauth::{OAuthSigner, encode_query},
    types::{
        CreateTweetRequest, CreatedTweet, DataResponse, StreamRule, StreamRulesResponse,
        TweetDetail, User,
    },
};

const RULES_ENDPOINT: &str = "/2/tweets/search/stream/rules";
const STREAM_ENDPOINT: &str = "/2/tweets/search/stream";

/// Twitter REST API client.
#[derive(Debug)]
pub struct TwitterApiClient {
    client: Client,
    base_url: String,
    oauth_signer: OAuthSigner,
    bearer_token: String,
    timeout: Duration,
}

impl TwitterApiClient {
    /// Create a new API client from configuration.
    pub fn new(config: &TwitterConfig) -> TwitterResult<Self> {
        // No client-wide timeout: it would also cut the long-lived stream.
        let client = Client::builder()
            .user_agent(format!("twitwi/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            oauth_signer: OAuthSigner::new(config),
            bearer_token: config.bearer_token.clone(),
            timeout: config.timeout,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn bearer(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(endpoint))
            .bearer_auth(&self.bearer_token)
    }

    fn oauth(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
    ) -> TwitterResult<RequestBuilder> {
        let url = self.url(endpoint);
        let auth_header = self.oauth_signer.sign(method.as_str(), &url, params)?;

        let full_url = if params.is_empty() {
            url
        } else {
            format!("{url}?{}", encode_query(params))
        };

        Ok(self
            .client
            .request(method, full_url)
            .header("Authorization", auth_header))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> TwitterResult<T> {
        let response = request.timeout(self.timeout).send().await?;
        handle_response(response).await
    }

    async fn send_json_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> TwitterResult<T> {
        self.send_json(request.json(body)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the authenticated user.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> TwitterResult<User> {
        let request = self.oauth(Method::GET, "/2/users/me", &[])?;
        let response: DataResponse<User> = self.send_json(request).await?;
        Ok(response.data)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tweet endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the extended record of a tweet, including video variants.
    #[instrument(skip(self))]
    pub async fn get_tweet_detail(&self, tweet_id: &str) -> TwitterResult<TweetDetail> {
        let params = vec![
            ("id".to_string(), tweet_id.to_string()),
            ("include_entities".to_string(), "true".to_string()),
            ("tweet_mode".to_string(), "extended".to_string()),
        ];
        let request = self.oauth(Method::GET, "/1.1/statuses/show.json", &params)?;
        self.send_json(request).await
    }

    /// Create a new tweet.
    #[instrument(skip(self, request))]
    pub async fn create_tweet(&self, request: &CreateTweetRequest) -> TwitterResult<CreatedTweet> {
        let builder = self.oauth(Method::POST, "/2/tweets", &[])?;
        let response: DataResponse<CreatedTweet> = self.send_json_body(builder, request).await?;
        Ok(response.data)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stream rules endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get current stream rules.
    #[instrument(skip(self))]
    pub async fn get_stream_rules(&self) -> TwitterResult<StreamRulesResponse> {
        self.send_json(self.bearer(Method::GET, RULES_ENDPOINT)).await
    }

    /// Add stream rules.
    #[instrument(skip(self, rules), fields(count = rules.len()))]
    pub async fn add_stream_rules(
        &self,
        rules: &[StreamRule],
    ) -> TwitterResult<StreamRulesResponse> {
        #[derive(Serialize)]
        struct AddRulesRequest<'a> {
            add: &'a [StreamRule],
        }

        self.send_json_body(
            self.bearer(Method::POST, RULES_ENDPOINT),
            &AddRulesRequest { add: rules },
        )
        .await
    }

    /// Delete stream rules by ID.
    #[instrument(skip(self, rule_ids), fields(count = rule_ids.len()))]
    pub async fn delete_stream_rules(
        &self,
        rule_ids: &[String],
    ) -> TwitterResult<StreamRulesResponse> {
        #[derive(Serialize)]
        struct DeleteRulesRequest<'a> {
            delete: DeleteIds<'a>,
        }

        #[derive(Serialize)]
        struct DeleteIds<'a> {
            ids: &'a [String],
        }

        self.send_json_body(
            self.bearer(Method::POST, RULES_ENDPOINT),
            &DeleteRulesRequest {
                delete: DeleteIds { ids: rule_ids },
            },
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filtered stream
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the filtered stream connection. The response body is unbounded.
    #[instrument(skip(self, params))]
    pub async fn connect_stream(&self, params: &[(String, String)]) -> TwitterResult<Response> {
        debug!(?params, "Opening filtered stream");

        let response = self
            .bearer(Method::GET, STREAM_ENDPOINT)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TwitterError::Stream(format!(
                "unexpected status {}: {body}",
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

/// Decode a success body, or turn any other status into `Api { status, body }`.
async fn handle_response<T: DeserializeOwned>(response: Response) -> TwitterResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        serde_json::from_slice(&bytes).map_err(TwitterError::from)
    } else {
        Err(TwitterError::Api {
            status: status.as_u16(),
            message: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
