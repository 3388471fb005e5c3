//! Filter rule synchronization.
//!
//! The server-side rule set is replaced wholesale before the stream opens:
//! list, delete everything listed, then add the desired rules.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::{
    client::TwitterApiClient,
    error::{TwitterError, TwitterResult},
    types::{StreamRule, StreamRulesResponse},
};

/// Reads and replaces the filtered stream's rule set.
#[derive(Debug, Clone)]
pub struct RuleManager {
    client: Arc<TwitterApiClient>,
}

impl RuleManager {
    #[must_use]
    pub const fn new(client: Arc<TwitterApiClient>) -> Self {
        Self { client }
    }

    /// Rules currently installed on the server.
    pub async fn list_rules(&self) -> TwitterResult<Vec<StreamRule>> {
        let response = self.client.get_stream_rules().await?;
        Ok(response.data.unwrap_or_default())
    }

    /// Delete rules by id. An empty set makes no network call.
    pub async fn delete_rules(&self, ids: &[String]) -> TwitterResult<()> {
        if ids.is_empty() {
            debug!("No stream rules to delete");
            return Ok(());
        }

        let response = self.client.delete_stream_rules(ids).await?;
        check_rule_errors(&response)?;

        let deleted = response
            .meta
            .as_ref()
            .and_then(|m| m.summary.as_ref())
            .and_then(|s| s.deleted);
        info!(requested = ids.len(), ?deleted, "Deleted stream rules");
        Ok(())
    }

    /// Install `rules` and return them with their server-assigned ids.
    pub async fn set_rules(&self, rules: &[StreamRule]) -> TwitterResult<Vec<StreamRule>> {
        if let Some(rule) = rules.iter().find(|r| r.value.trim().is_empty()) {
            return Err(TwitterError::Config(format!(
                "stream rule value must not be empty (tag: {:?})",
                rule.tag
            )));
        }

        let outgoing: Vec<StreamRule> = rules
            .iter()
            .map(|r| StreamRule::new(r.value.clone(), r.tag.clone()))
            .collect();

        let response = self.client.add_stream_rules(&outgoing).await?;
        check_rule_errors(&response)?;

        let created = response.data.unwrap_or_default();
        info!(count = created.len(), "Installed stream rules");
        Ok(created)
    }

    /// Replace the whole remote rule set with `desired`.
    ///
    /// Any failing step aborts the sync; nothing is retried.
    #[instrument(skip(self, desired), fields(desired = desired.len()))]
    pub async fn sync(&self, desired: &[StreamRule]) -> TwitterResult<Vec<StreamRule>> {
        let existing = self.list_rules().await?;
        debug!(count = existing.len(), "Listed existing stream rules");

        let ids: Vec<String> = existing.into_iter().filter_map(|r| r.id).collect();
        self.delete_rules(&ids).await?;

        self.set_rules(desired).await
    }
}

/// Rule writes answer 200 even when individual rules were refused.
fn check_rule_errors(response: &StreamRulesResponse) -> TwitterResult<()> {
    match response.errors.as_deref() {
        Some([first, ..]) => Err(TwitterError::RuleRejected(match &first.value {
            Some(value) => format!("{} ({value})", first.message()),
            None => first.message().to_string(),
        })),
        _ => Ok(()),
    }
}
