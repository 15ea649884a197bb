use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::{encode_body, MonitorClient};
use crate::errors::{MonitorError, Result};
use crate::payload::RawPayload;

const ALERTS_PATH: &str = "/api/alerts";
const ALERTS_V2_PATH: &str = "/api/v2/alerts";

/// Kind of alert, deciding the shape of [`Alert::config`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    /// Metric threshold alert
    #[serde(rename = "MANUAL")]
    Manual,
    /// PromQL query alert
    #[serde(rename = "PROMETHEUS")]
    Prometheus,
    /// Any other kind reported by the API, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// Severity label used by newer API versions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLabel {
    Low,
    Medium,
    High,
    #[serde(untagged)]
    Other(String),
}

impl Display for SeverityLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityLabel::Low => write!(f, "low"),
            SeverityLabel::Medium => write!(f, "medium"),
            SeverityLabel::High => write!(f, "high"),
            SeverityLabel::Other(label) => write!(f, "{label}"),
        }
    }
}

/// Alert severity in either of its wire encodings
///
/// Older API versions use a numeric `severity`, newer ones a `severityLabel`.
/// Pick the one the configured endpoint understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    /// Sent as `severityLabel`
    Label(SeverityLabel),
    /// Sent as the numeric `severity`, 0 being the most severe
    Code(u32),
}

/// How segments are combined when evaluating a segmented alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentMatch {
    Any,
    All,
    #[serde(untagged)]
    Other(String),
}

/// When a segmented alert fires
///
/// The API attaches a default one (`{"type": "ANY"}`) even to alerts that
/// are not segmented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCondition {
    /// Whether any or all segments must match, sent as `type`
    #[serde(rename = "type")]
    pub kind: SegmentMatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl SegmentCondition {
    /// Create a condition without a value
    pub fn new(kind: SegmentMatch) -> Self {
        Self { kind, value: None }
    }
}

/// Custom notification template attached to an alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepend_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_text: Option<String>,
    /// Render with the newer template engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_new_template: Option<bool>,
}

/// Capture taken when the alert fires
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SysdigCapture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<serde_json::Value>,
}

/// Config payload of a [`AlertType::Prometheus`] alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusAlertConfig {
    /// PromQL expression
    pub query: String,
}

/// Config payload of a [`AlertType::Manual`] alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAlertConfig {
    /// Metric the threshold applies to
    pub metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_aggregation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_aggregation: Option<String>,
    /// Comparison operator, e.g. `>`
    pub condition_operator: String,
    pub threshold: f64,
    /// Label keys the metric is segmented by
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_condition: Option<SegmentCondition>,
}

impl ManualAlertConfig {
    /// Create a threshold config with no aggregation or segmentation
    pub fn new(metric: &str, condition_operator: &str, threshold: f64) -> Self {
        Self {
            metric: metric.to_string(),
            time_aggregation: None,
            group_aggregation: None,
            condition_operator: condition_operator.to_string(),
            threshold,
            segment_by: None,
            segment_condition: None,
        }
    }
}

/// An alert rule
///
/// Every field is optional: absent fields are omitted from request bodies
/// and stay absent after decoding a response.
///
/// # Example
///
/// ```rust
/// use sysdig_monitor_api::{Alert, PrometheusAlertConfig, SeverityLabel, Severity};
///
/// let alert = Alert::prometheus(
///     "KubeWorkloadDown",
///     &PrometheusAlertConfig { query: "kube_workload_status_running == 0".to_string() },
/// )
/// .unwrap()
/// .with_condition("kube_workload_status_running == 0")
/// .with_severity(Severity::Label(SeverityLabel::High))
/// .with_notification_channels(vec![1721]);
///
/// assert!(alert.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,
    /// Epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AlertType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_channel_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_label: Option<SeverityLabel>,
    /// Evaluation window in microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timespan: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_notification: Option<CustomNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysdig_capture: Option<SysdigCapture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_of_change: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_notify_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_notify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_metrics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_template_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_condition: Option<SegmentCondition>,
    /// Opaque condition in the vendor query language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check_time_in_ms: Option<i64>,
    /// Kind-specific configuration, shape decided by `type`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RawPayload>,
}

impl Alert {
    /// Create an enabled alert with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            enabled: Some(true),
            ..Default::default()
        }
    }

    /// Create an enabled Prometheus alert carrying `config` as its payload
    pub fn prometheus(name: &str, config: &PrometheusAlertConfig) -> Result<Self> {
        Self::with_kind(name, AlertType::Prometheus, config)
    }

    /// Create an enabled metric threshold alert carrying `config` as its payload
    pub fn manual(name: &str, config: &ManualAlertConfig) -> Result<Self> {
        Self::with_kind(name, AlertType::Manual, config)
    }

    fn with_kind<C: Serialize>(name: &str, kind: AlertType, config: &C) -> Result<Self> {
        let mut alert = Self::new(name);
        alert.kind = Some(kind);
        alert.config = Some(RawPayload::encode(config)?);
        Ok(alert)
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the condition expression, e.g. `avg(cpu) > 90`
    ///
    /// The text is sent as given; the API is the only judge of its syntax.
    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    /// Restrict the alert to a scope expression
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    /// Set the evaluation window in microseconds
    pub fn with_timespan(mut self, timespan: u64) -> Self {
        self.timespan = Some(timespan);
        self
    }

    /// Notify the given channel ids when the alert fires
    pub fn with_notification_channels(mut self, ids: Vec<u64>) -> Self {
        self.notification_channel_ids = Some(ids);
        self
    }

    /// Assign the alert to a team
    pub fn with_team(mut self, team_id: u64) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Override the notification title and text
    pub fn with_custom_notification(mut self, notification: CustomNotification) -> Self {
        self.custom_notification = Some(notification);
        self
    }

    /// Group evaluation by label keys
    ///
    /// Both segmentation fields are set together.
    pub fn with_segmentation(mut self, segment_by: Vec<String>, condition: SegmentCondition) -> Self {
        self.segment_by = Some(segment_by);
        self.segment_condition = Some(condition);
        self
    }

    /// Set the severity, clearing the other encoding
    pub fn with_severity(mut self, severity: Severity) -> Self {
        match severity {
            Severity::Label(label) => {
                self.severity_label = Some(label);
                self.severity = None;
            }
            Severity::Code(code) => {
                self.severity = Some(code);
                self.severity_label = None;
            }
        }
        self
    }

    /// Severity in whichever encoding is present, preferring the label
    pub fn severity(&self) -> Option<Severity> {
        match (&self.severity_label, self.severity) {
            (Some(label), _) => Some(Severity::Label(label.clone())),
            (None, Some(code)) => Some(Severity::Code(code)),
            (None, None) => None,
        }
    }

    /// Creation time, if the API reported one
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_on.and_then(DateTime::from_timestamp_millis)
    }

    /// Last modification time
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_on.and_then(DateTime::from_timestamp_millis)
    }

    /// Check the alert before sending it
    ///
    /// The condition text is not interpreted, only checked for presence.
    /// Segmentation fields are left to the API: unsegmented alerts come back
    /// with `segmentBy: []` and a default `segmentCondition`.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert is enabled but its condition is absent
    /// or empty.
    pub fn validate(&self) -> Result<()> {
        let has_condition = self.condition.as_deref().is_some_and(|c| !c.is_empty());
        if self.enabled == Some(true) && !has_condition {
            return Err(MonitorError::InvalidResource(format!(
                "enabled alert {} has no condition",
                self.display_name()
            )));
        }

        Ok(())
    }

    fn display_name(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => format!("'{name}'"),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

/// Collection of alerts
///
/// `alertsCount` is only returned by some API versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertList {
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// Total reported by the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts_count: Option<u64>,
}

impl AlertList {
    pub fn new(alerts: Vec<Alert>) -> Self {
        Self {
            alerts,
            alerts_count: None,
        }
    }
}

#[derive(Serialize)]
struct AlertRequest<'a> {
    alert: &'a Alert,
}

#[derive(Deserialize)]
struct AlertResponse {
    alert: Alert,
}

#[derive(Serialize)]
struct AlertsRequest<'a> {
    alerts: &'a [Alert],
}

impl MonitorClient {
    /// List all alerts
    #[instrument(name = "MonitorClient::list_alerts", skip_all)]
    pub async fn list_alerts(&self, cancel: &CancellationToken) -> Result<AlertList> {
        let list: AlertList = self.fetch(Method::GET, ALERTS_PATH, None, cancel).await?;
        debug!(alert_count = list.alerts.len(), "Listed alerts");
        Ok(list)
    }

    /// Get one alert by id
    #[instrument(name = "MonitorClient::get_alert", skip_all, fields(alert_id = id))]
    pub async fn get_alert(&self, id: u64, cancel: &CancellationToken) -> Result<Alert> {
        let path = format!("{ALERTS_PATH}/{id}");
        let response: AlertResponse = self.fetch(Method::GET, &path, None, cancel).await?;
        Ok(response.alert)
    }

    /// Create one alert
    ///
    /// # Errors
    ///
    /// Returns an error if the alert fails [`Alert::validate`], the request
    /// fails, or the API rejects it.
    #[instrument(name = "MonitorClient::create_alert", skip_all)]
    pub async fn create_alert(&self, alert: &Alert, cancel: &CancellationToken) -> Result<Alert> {
        alert.validate()?;
        let body = encode_body(&AlertRequest { alert })?;
        let response: AlertResponse = self
            .fetch(Method::POST, ALERTS_PATH, Some(body), cancel)
            .await?;
        debug!(alert_id = response.alert.id, "Alert created");
        Ok(response.alert)
    }

    /// Replace one alert; the id is taken from the alert itself
    #[instrument(name = "MonitorClient::update_alert", skip_all, fields(alert_id = alert.id))]
    pub async fn update_alert(&self, alert: &Alert, cancel: &CancellationToken) -> Result<Alert> {
        let id = alert.id.ok_or_else(|| {
            MonitorError::InvalidResource("alert update requires an id".to_string())
        })?;
        alert.validate()?;

        let path = format!("{ALERTS_PATH}/{id}");
        let body = encode_body(&AlertRequest { alert })?;
        let response: AlertResponse = self.fetch(Method::PUT, &path, Some(body), cancel).await?;
        Ok(response.alert)
    }

    /// Create many alerts in one call, returning the created set
    #[instrument(
        name = "MonitorClient::create_alerts",
        skip_all,
        fields(alert_count = alerts.len())
    )]
    pub async fn create_alerts(
        &self,
        alerts: &[Alert],
        cancel: &CancellationToken,
    ) -> Result<AlertList> {
        self.send_alerts(Method::POST, alerts, cancel).await
    }

    /// Replace many alerts in one call
    #[instrument(
        name = "MonitorClient::update_alerts",
        skip_all,
        fields(alert_count = alerts.len())
    )]
    pub async fn update_alerts(
        &self,
        alerts: &[Alert],
        cancel: &CancellationToken,
    ) -> Result<AlertList> {
        if let Some(alert) = alerts.iter().find(|alert| alert.id.is_none()) {
            return Err(MonitorError::InvalidResource(format!(
                "alert update requires an id, missing on {}",
                alert.display_name()
            )));
        }
        self.send_alerts(Method::PUT, alerts, cancel).await
    }

    async fn send_alerts(
        &self,
        method: Method,
        alerts: &[Alert],
        cancel: &CancellationToken,
    ) -> Result<AlertList> {
        for alert in alerts {
            alert.validate()?;
        }

        let body = encode_body(&AlertsRequest { alerts })?;
        let list: AlertList = self
            .fetch(method, ALERTS_V2_PATH, Some(body), cancel)
            .await?;
        debug!(alert_count = list.alerts.len(), "Alerts sent");
        Ok(list)
    }
}
