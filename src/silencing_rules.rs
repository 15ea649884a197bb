use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::{encode_body, MonitorClient};
use crate::errors::Result;

const SILENCING_RULES_PATH: &str = "/api/v1/silencingRules";

/// A time-bounded suppression of alert notifications
///
/// List, get and create use the bare rule document, without an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilencingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// Start of the silence in epoch milliseconds
    #[serde(default)]
    pub start_ts: i64,
    #[serde(default)]
    pub duration_in_sec: u64,
    /// Opaque scope expression; empty means everything
    #[serde(default)]
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_channel_ids: Option<Vec<u64>>,
}

impl SilencingRule {
    /// Create an enabled rule silencing `scope` for `duration` from `starts_at`
    pub fn new(name: &str, starts_at: DateTime<Utc>, duration: Duration, scope: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            start_ts: starts_at.timestamp_millis(),
            duration_in_sec: duration.as_secs(),
            scope: scope.to_string(),
            ..Default::default()
        }
    }

    /// Only silence notifications sent to these channels
    pub fn with_notification_channels(mut self, ids: Vec<u64>) -> Self {
        self.notification_channel_ids = Some(ids);
        self
    }

    /// Restrict the rule to one team
    pub fn with_team(mut self, team_id: u64) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Start of the silenced window
    ///
    /// `None` if `startTs` is outside the range chrono can represent.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_ts)
    }

    /// End of the silenced window, exclusive
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        let duration = TimeDelta::try_seconds(i64::try_from(self.duration_in_sec).ok()?)?;
        self.starts_at()?.checked_add_signed(duration)
    }

    /// Whether `at` falls inside the silenced window
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        match (self.starts_at(), self.ends_at()) {
            (Some(start), Some(end)) => self.enabled && start <= at && at < end,
            _ => false,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkDeleteRequest<'a> {
    silencing_rules: RuleIds<'a>,
}

#[derive(Serialize)]
struct RuleIds<'a> {
    ids: &'a [u64],
}

impl MonitorClient {
    /// List all silencing rules
    #[instrument(name = "MonitorClient::list_silencing_rules", skip_all)]
    pub async fn list_silencing_rules(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SilencingRule>> {
        let rules: Vec<SilencingRule> = self
            .fetch(Method::GET, SILENCING_RULES_PATH, None, cancel)
            .await?;
        debug!(rule_count = rules.len(), "Listed silencing rules");
        Ok(rules)
    }

    /// Get one silencing rule by id
    #[instrument(name = "MonitorClient::get_silencing_rule", skip_all, fields(rule_id = id))]
    pub async fn get_silencing_rule(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<SilencingRule> {
        let path = format!("{SILENCING_RULES_PATH}/{id}");
        self.fetch(Method::GET, &path, None, cancel).await
    }

    /// Create one silencing rule
    #[instrument(name = "MonitorClient::create_silencing_rule", skip_all)]
    pub async fn create_silencing_rule(
        &self,
        rule: &SilencingRule,
        cancel: &CancellationToken,
    ) -> Result<SilencingRule> {
        let body = encode_body(rule)?;
        let created: SilencingRule = self
            .fetch(Method::POST, SILENCING_RULES_PATH, Some(body), cancel)
            .await?;
        debug!(rule_id = created.id, "Silencing rule created");
        Ok(created)
    }

    /// Delete one silencing rule by id
    #[instrument(name = "MonitorClient::delete_silencing_rule", skip_all, fields(rule_id = id))]
    pub async fn delete_silencing_rule(&self, id: u64, cancel: &CancellationToken) -> Result<()> {
        let path = format!("{SILENCING_RULES_PATH}/{id}");
        self.send::<serde_json::Value>(Method::DELETE, &path, None, cancel)
            .await?;
        debug!("Silencing rule deleted");
        Ok(())
    }

    /// Delete many silencing rules with a single request
    ///
    /// Uses the dedicated bulk endpoint rather than one request per id.
    #[instrument(
        name = "MonitorClient::delete_silencing_rules",
        skip_all,
        fields(rule_count = ids.len())
    )]
    pub async fn delete_silencing_rules(
        &self,
        ids: &[u64],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if ids.is_empty() {
            debug!("No silencing rules to delete");
            return Ok(());
        }

        let path = format!("{SILENCING_RULES_PATH}/delete");
        let body = encode_body(&BulkDeleteRequest {
            silencing_rules: RuleIds { ids },
        })?;

        self.send_discarding(Method::POST, &path, Some(body), cancel)
            .await?;
        debug!("Silencing rules deleted");
        Ok(())
    }
}
