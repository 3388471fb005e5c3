//! OAuth 1.0a request signing for user-context calls.
//!
//! Replies, tweet detail lookups and `users/me` act on behalf of the bot
//! account and must carry an HMAC-SHA1 `Authorization: OAuth ...` header.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngCore;
use sha1::Sha1;

use crate::config::TwitterConfig;
use crate::error::{TwitterError, TwitterResult};

/// Everything except the RFC 3986 unreserved set: ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// OAuth 1.0a signer holding the bot account's credentials.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl OAuthSigner {
    #[must_use]
    pub fn new(config: &TwitterConfig) -> Self {
        Self {
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            access_token: config.access_token.clone(),
            access_token_secret: config.access_token_secret.clone(),
        }
    }

    /// Build the `Authorization` header for a request.
    ///
    /// `url` must not carry a query string; query parameters go in `params`
    /// so they are part of the signature base. JSON bodies are not signed.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> TwitterResult<String> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| TwitterError::OAuth(format!("Failed to get timestamp: {e}")))?
            .as_secs();

        self.sign_with(method, url, params, &generate_nonce(), timestamp)
    }

    /// Sign with a caller-chosen nonce and timestamp.
    pub fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: u64,
    ) -> TwitterResult<String> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let base = signature_base_string(method, url, oauth_params.iter().chain(params));
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.access_token_secret)
        );
        oauth_params.push(("oauth_signature".to_string(), hmac_sha1(&signing_key, &base)?));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {header}"))
    }
}

/// `METHOD&url&params`, with parameters encoded then sorted by key and value.
fn signature_base_string<'a>(
    method: &str,
    url: &str,
    params: impl Iterator<Item = &'a (String, String)>,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// Percent-encode a string according to RFC 3986.
pub(crate) fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Encode query parameters the same way they are signed.
pub(crate) fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac_sha1(key: &str, data: &str) -> TwitterResult<String> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| TwitterError::OAuth(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
