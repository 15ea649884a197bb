use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::{encode_body, MonitorClient};
use crate::errors::Result;
use crate::payload::RawPayload;

const CHANNELS_PATH: &str = "/api/notificationChannels";

/// Destination kind of a notification channel
///
/// The vendor's set of channel kinds is open-ended; unknown kinds are kept
/// verbatim in [`ChannelType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    Email,
    PagerDuty,
    Slack,
    Webhook,
    #[serde(untagged)]
    Other(String),
}

impl Display for ChannelType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Email => write!(f, "EMAIL"),
            ChannelType::PagerDuty => write!(f, "PAGER_DUTY"),
            ChannelType::Slack => write!(f, "SLACK"),
            ChannelType::Webhook => write!(f, "WEBHOOK"),
            ChannelType::Other(kind) => write!(f, "{kind}"),
        }
    }
}

impl From<&str> for ChannelType {
    fn from(kind: &str) -> Self {
        match kind {
            "EMAIL" => ChannelType::Email,
            "PAGER_DUTY" => ChannelType::PagerDuty,
            "SLACK" => ChannelType::Slack,
            "WEBHOOK" => ChannelType::Webhook,
            other => ChannelType::Other(other.to_string()),
        }
    }
}

/// Options of an email channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailChannelOptions {
    pub email_recipients: Vec<String>,
    pub notify_on_resolve: bool,
    pub notify_on_ok: bool,
}

/// Options of a PagerDuty channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagerDutyChannelOptions {
    pub account: String,
    pub service_key: String,
    pub service_name: String,
    pub notify_on_resolve: bool,
    pub notify_on_ok: bool,
}

/// Options of a Slack channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackChannelOptions {
    pub channel: String,
    pub url: String,
    pub notify_on_resolve: bool,
    pub notify_on_ok: bool,
}

/// A notification channel
///
/// `options` is an opaque payload whose shape must match `type`; the client
/// does not check that it does.
///
/// # Example
///
/// ```rust
/// use sysdig_monitor_api::{ChannelType, NotificationChannel, SlackChannelOptions};
///
/// let channel = NotificationChannel::new(
///     "ops-slack",
///     ChannelType::Slack,
///     &SlackChannelOptions {
///         channel: "#ops".to_string(),
///         url: "https://hooks.slack.com/services/T000/B000/XXX".to_string(),
///         ..Default::default()
///     },
/// )
/// .unwrap();
///
/// assert_eq!(channel.enabled, Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChannelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_test_notification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<RawPayload>,
}

impl NotificationChannel {
    /// Build a channel, encoding `options` as its payload
    ///
    /// The channel is enabled and does not send a test notification.
    pub fn new<O: Serialize + ?Sized>(name: &str, kind: ChannelType, options: &O) -> Result<Self> {
        Ok(Self {
            name: Some(name.to_string()),
            kind: Some(kind),
            enabled: Some(true),
            send_test_notification: Some(false),
            options: Some(RawPayload::encode(options)?),
            ..Default::default()
        })
    }

    /// Assign the channel to a team
    pub fn with_team(mut self, team_id: u64) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Creation time, if the API reported one
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_on.and_then(DateTime::from_timestamp_millis)
    }

    /// Last modification time
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_on.and_then(DateTime::from_timestamp_millis)
    }
}

/// Collection of notification channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannelList {
    #[serde(default)]
    pub notification_channels: Vec<NotificationChannel>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelRequest<'a> {
    notification_channel: &'a NotificationChannel,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResponse {
    notification_channel: NotificationChannel,
}

impl MonitorClient {
    /// List all notification channels
    #[instrument(name = "MonitorClient::list_notification_channels", skip_all)]
    pub async fn list_notification_channels(
        &self,
        cancel: &CancellationToken,
    ) -> Result<NotificationChannelList> {
        let list: NotificationChannelList =
            self.fetch(Method::GET, CHANNELS_PATH, None, cancel).await?;
        debug!(
            channel_count = list.notification_channels.len(),
            "Listed notification channels"
        );
        Ok(list)
    }

    /// Get one notification channel by id
    #[instrument(
        name = "MonitorClient::get_notification_channel",
        skip_all,
        fields(channel_id = id)
    )]
    pub async fn get_notification_channel(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<NotificationChannel> {
        let path = format!("{CHANNELS_PATH}/{id}");
        let response: ChannelResponse = self.fetch(Method::GET, &path, None, cancel).await?;
        Ok(response.notification_channel)
    }

    /// Create one notification channel
    #[instrument(
        name = "MonitorClient::create_notification_channel",
        skip_all,
        fields(channel_type = ?channel.kind)
    )]
    pub async fn create_notification_channel(
        &self,
        channel: &NotificationChannel,
        cancel: &CancellationToken,
    ) -> Result<NotificationChannel> {
        let body = encode_body(&ChannelRequest {
            notification_channel: channel,
        })?;
        let response: ChannelResponse = self
            .fetch(Method::POST, CHANNELS_PATH, Some(body), cancel)
            .await?;
        debug!(
            channel_id = response.notification_channel.id,
            "Notification channel created"
        );
        Ok(response.notification_channel)
    }

    /// Delete one notification channel by id
    #[instrument(
        name = "MonitorClient::delete_notification_channel",
        skip_all,
        fields(channel_id = id)
    )]
    pub async fn delete_notification_channel(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = format!("{CHANNELS_PATH}/{id}");
        self.send::<serde_json::Value>(Method::DELETE, &path, None, cancel)
            .await?;
        debug!("Notification channel deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::client_for;
    use crate::errors::MonitorError;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_slack_options_embedded_in_payload() {
        let channel = NotificationChannel::new(
            "ops-slack",
            ChannelType::Slack,
            &SlackChannelOptions {
                channel: "#ops".to_string(),
                url: "https://hooks.example.com/x".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let value = serde_json::to_value(&channel).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "SLACK",
                "enabled": true,
                "sendTestNotification": false,
                "name": "ops-slack",
                "options": {
                    "channel": "#ops",
                    "url": "https://hooks.example.com/x",
                    "notifyOnResolve": false,
                    "notifyOnOk": false
                }
            })
        );
    }

    #[test]
    fn test_custom_options_shape_is_passed_through() {
        let options = json!({"topic": "arn:aws:sns:eu-west-1:1:alerts", "extra": [1, 2]});
        let channel = NotificationChannel::new("sns", ChannelType::from("SNS"), &options).unwrap();

        assert_eq!(channel.kind, Some(ChannelType::Other("SNS".to_string())));
        let decoded: Value = channel.options.as_ref().unwrap().decode().unwrap();
        assert_eq!(decoded, options);
    }

    #[test]
    fn test_full_channel_roundtrip() {
        let channel = NotificationChannel {
            id: Some(1721),
            version: Some(2),
            created_on: Some(1_700_000_000_000),
            modified_on: Some(1_700_000_000_500),
            team_id: Some(3),
            settings_id: Some(11),
            ..NotificationChannel::new(
                "oncall",
                ChannelType::PagerDuty,
                &PagerDutyChannelOptions {
                    account: "acme".to_string(),
                    service_key: "key".to_string(),
                    service_name: "svc".to_string(),
                    notify_on_resolve: true,
                    notify_on_ok: false,
                },
            )
            .unwrap()
        };

        let json = serde_json::to_string(&channel).unwrap();
        let decoded: NotificationChannel = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, channel);
        assert_eq!(decoded.created_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_minimal_channel_stays_minimal() {
        let decoded: NotificationChannel = serde_json::from_str(r#"{"name":"bare"}"#).unwrap();
        assert!(decoded.enabled.is_none());
        assert!(decoded.options.is_none());
        assert_eq!(serde_json::to_string(&decoded).unwrap(), r#"{"name":"bare"}"#);
    }

    #[test]
    fn test_channel_type_display_matches_wire() {
        for kind in [
            ChannelType::Email,
            ChannelType::PagerDuty,
            ChannelType::Slack,
            ChannelType::Webhook,
        ] {
            assert_eq!(
                serde_json::to_value(&kind).unwrap(),
                Value::String(kind.to_string())
            );
            assert_eq!(ChannelType::from(kind.to_string().as_str()), kind);
        }
    }

    #[tokio::test]
    async fn test_list_notification_channels() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/notificationChannels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notificationChannels": [
                    {"id": 1, "type": "EMAIL", "options": {"emailRecipients": ["a@example.com"]}},
                    {"id": 2, "type": "MS_TEAMS"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let list = client
            .list_notification_channels(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(list.notification_channels.len(), 2);
        let email: EmailChannelOptions = list.notification_channels[0]
            .options
            .as_ref()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(email.email_recipients, vec!["a@example.com".to_string()]);
        assert!(!email.notify_on_resolve);
        assert_eq!(
            list.notification_channels[1].kind,
            Some(ChannelType::Other("MS_TEAMS".to_string()))
        );
    }

    #[tokio::test]
    async fn test_get_notification_channel() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/notificationChannels/1721"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notificationChannel": {"id": 1721, "name": "mail", "type": "EMAIL"}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let channel = client
            .get_notification_channel(1721, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(channel.id, Some(1721));
        assert_eq!(channel.kind, Some(ChannelType::Email));
    }

    #[tokio::test]
    async fn test_create_notification_channel() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/notificationChannels"))
            .and(body_json(json!({
                "notificationChannel": {
                    "type": "EMAIL",
                    "enabled": true,
                    "sendTestNotification": false,
                    "name": "mail",
                    "options": {
                        "emailRecipients": ["ops@example.com"],
                        "notifyOnResolve": true,
                        "notifyOnOk": false
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "notificationChannel": {"id": 5, "version": 0, "name": "mail", "type": "EMAIL"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let channel = NotificationChannel::new(
            "mail",
            ChannelType::Email,
            &EmailChannelOptions {
                email_recipients: vec!["ops@example.com".to_string()],
                notify_on_resolve: true,
                notify_on_ok: false,
            },
        )
        .unwrap();

        let created = client
            .create_notification_channel(&channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(created.id, Some(5));
        assert_eq!(created.version, Some(0));
    }

    #[tokio::test]
    async fn test_delete_notification_channel() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/notificationChannels/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client
            .delete_notification_channel(5, &CancellationToken::new())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_channel() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/notificationChannels/5"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client
            .delete_notification_channel(5, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(MonitorError::Api { status: 404 })));
    }
}
