use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::{encode_body, MonitorClient};
use crate::errors::Result;

const TEAMS_PATH: &str = "/api/teams";

const DEFAULT_SHOW: &str = "host";
const DEFAULT_THEME: &str = "#7BB0B2";

/// Namespace filters restricting what a team can observe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prometheus_remote_write: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibm_platform_metrics: Option<String>,
}

/// Default landing page of the team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Role of the requesting user within the team
///
/// Only present on teams returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    /// Role name, e.g. `ROLE_TEAM_EDIT`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_warning: Option<String>,
}

/// A team
///
/// Capability flags and `users` are always sent, so an empty member list
/// is distinguishable from an unset one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Default data scope of the UI, e.g. `host` or `container`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    /// Scope filter of the team, sent as `filterId`
    #[serde(rename = "filterId", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_filters: Option<NamespaceFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_team_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<EntryPoint>,
    #[serde(default)]
    pub can_use_sysdig_capture: bool,
    #[serde(default)]
    pub can_use_agent_cli: bool,
    #[serde(default)]
    pub can_use_custom_events: bool,
    #[serde(default)]
    pub can_use_aws_metrics: bool,
    #[serde(default)]
    pub can_use_beacon_metrics: bool,
    #[serde(default)]
    pub can_use_rapid_response: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_role: Option<UserRole>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl Team {
    /// Create a team with the usual capability defaults
    ///
    /// Captures, agent CLI and custom events are allowed; AWS metrics,
    /// beacon metrics and rapid response are not. The member list is empty.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            show: Some(DEFAULT_SHOW.to_string()),
            theme: Some(DEFAULT_THEME.to_string()),
            can_use_sysdig_capture: true,
            can_use_agent_cli: true,
            can_use_custom_events: true,
            can_use_aws_metrics: false,
            can_use_beacon_metrics: false,
            can_use_rapid_response: false,
            users: Vec::new(),
            ..Default::default()
        }
    }

    /// Replace the member list with these user names
    pub fn with_users(mut self, users: Vec<String>) -> Self {
        self.users = users;
        self
    }

    /// Role given to members without an explicit one, e.g. `ROLE_TEAM_READ`
    pub fn with_default_role(mut self, role: &str) -> Self {
        self.default_team_role = Some(role.to_string());
        self
    }

    /// Limit what the team sees of Prometheus and platform metrics
    pub fn with_namespace_filters(mut self, filters: NamespaceFilters) -> Self {
        self.namespace_filters = Some(filters);
        self
    }

    /// Creation time, if the API reported one
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.date_created.and_then(DateTime::from_timestamp_millis)
    }

    /// Last update time
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated.and_then(DateTime::from_timestamp_millis)
    }
}

/// Collection of teams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamList {
    #[serde(default)]
    pub teams: Vec<Team>,
}

#[derive(Deserialize)]
struct TeamResponse {
    team: Team,
}

impl MonitorClient {
    /// List all teams
    #[instrument(name = "MonitorClient::list_teams", skip_all)]
    pub async fn list_teams(&self, cancel: &CancellationToken) -> Result<TeamList> {
        let list: TeamList = self.fetch(Method::GET, TEAMS_PATH, None, cancel).await?;
        debug!(team_count = list.teams.len(), "Listed teams");
        Ok(list)
    }

    /// Get one team by id
    #[instrument(name = "MonitorClient::get_team", skip_all, fields(team_id = id))]
    pub async fn get_team(&self, id: u64, cancel: &CancellationToken) -> Result<Team> {
        let path = format!("{TEAMS_PATH}/{id}");
        let response: TeamResponse = self.fetch(Method::GET, &path, None, cancel).await?;
        Ok(response.team)
    }

    /// Create one team
    ///
    /// The team document is posted as is; the API answers with a
    /// `{"team": ...}` envelope.
    #[instrument(name = "MonitorClient::create_team", skip_all)]
    pub async fn create_team(&self, team: &Team, cancel: &CancellationToken) -> Result<Team> {
        let body = encode_body(team)?;
        let response: TeamResponse = self
            .fetch(Method::POST, TEAMS_PATH, Some(body), cancel)
            .await?;
        debug!(team_id = response.team.id, "Team created");
        Ok(response.team)
    }

    /// Delete one team by id
    #[instrument(name = "MonitorClient::delete_team", skip_all, fields(team_id = id))]
    pub async fn delete_team(&self, id: u64, cancel: &CancellationToken) -> Result<()> {
        let path = format!("{TEAMS_PATH}/{id}");
        self.send::<serde_json::Value>(Method::DELETE, &path, None, cancel)
            .await?;
        debug!("Team deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::client_for;
    use crate::errors::MonitorError;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_new_team_defaults() {
        let team = Team::new("platform", "Platform engineering");

        assert!(team.users.is_empty());
        assert!(team.can_use_sysdig_capture);
        assert!(team.can_use_agent_cli);
        assert!(team.can_use_custom_events);
        assert!(!team.can_use_aws_metrics);
        assert!(!team.can_use_beacon_metrics);
        assert!(!team.can_use_rapid_response);
        assert_eq!(team.show.as_deref(), Some("host"));
        assert_eq!(team.theme.as_deref(), Some("#7BB0B2"));
    }

    #[test]
    fn test_empty_users_serialized_explicitly() {
        let value = serde_json::to_value(Team::new("platform", "")).unwrap();
        assert_eq!(value["users"], json!([]));
        assert_eq!(value["canUseAwsMetrics"], json!(false));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_full_team_roundtrip() {
        let team = Team {
            id: Some(4),
            version: Some(7),
            customer_id: Some(1),
            origin: Some("SYSDIG".to_string()),
            products: Some(vec!["SDC".to_string()]),
            immutable: Some(false),
            default: Some(false),
            date_created: Some(1_700_000_000_000),
            last_updated: Some(1_700_000_000_999),
            filter: Some("kubernetes.namespace.name = \"ops\"".to_string()),
            entry_point: Some(EntryPoint {
                module: Some("Explore".to_string()),
            }),
            user_count: Some(2),
            users_role: Some(UserRole {
                user_id: Some(8),
                role: Some("ROLE_TEAM_EDIT".to_string()),
                admin: Some(false),
                ..Default::default()
            }),
            ..Team::new("ops", "Operations")
                .with_users(vec!["a@example.com".to_string(), "b@example.com".to_string()])
                .with_default_role("ROLE_TEAM_READ")
                .with_namespace_filters(NamespaceFilters {
                    prometheus_remote_write: Some("ns = \"ops\"".to_string()),
                    ibm_platform_metrics: None,
                })
        };

        let json = serde_json::to_string(&team).unwrap();
        assert_eq!(serde_json::from_str::<Team>(&json).unwrap(), team);
        assert_eq!(team.created_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_filter_uses_filter_id_key() {
        let decoded: Team = serde_json::from_value(json!({
            "name": "ops",
            "filterId": "kubernetes.namespace.name = \"ops\"",
            "users": []
        }))
        .unwrap();

        assert_eq!(
            decoded.filter.as_deref(),
            Some("kubernetes.namespace.name = \"ops\"")
        );

        let value = serde_json::to_value(&decoded).unwrap();
        assert_eq!(
            value["filterId"],
            json!("kubernetes.namespace.name = \"ops\"")
        );
        assert!(value.get("filter").is_none());
    }

    #[test]
    fn test_minimal_team_stays_minimal() {
        let decoded: Team = serde_json::from_value(json!({"name": "bare", "users": []})).unwrap();
        assert!(decoded.theme.is_none());
        assert!(decoded.namespace_filters.is_none());

        let value = serde_json::to_value(&decoded).unwrap();
        assert!(value.get("theme").is_none());
        assert!(value.get("entryPoint").is_none());
    }

    #[tokio::test]
    async fn test_list_teams() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/teams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "teams": [{"id": 1, "name": "Monitor Operations", "default": true, "users": []}]
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let list = client.list_teams(&CancellationToken::new()).await.unwrap();

        assert_eq!(list.teams.len(), 1);
        assert_eq!(list.teams[0].default, Some(true));
    }

    #[tokio::test]
    async fn test_get_team() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/teams/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "team": {"id": 4, "name": "ops", "canUseAgentCli": true}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let team = client.get_team(4, &CancellationToken::new()).await.unwrap();

        assert_eq!(team.id, Some(4));
        assert!(team.can_use_agent_cli);
        assert!(team.users.is_empty());
    }

    #[tokio::test]
    async fn test_create_team_posts_bare_document() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/teams"))
            .and(body_json(json!({
                "name": "ops",
                "description": "Operations",
                "theme": "#7BB0B2",
                "show": "host",
                "canUseSysdigCapture": true,
                "canUseAgentCli": true,
                "canUseCustomEvents": true,
                "canUseAwsMetrics": false,
                "canUseBeaconMetrics": false,
                "canUseRapidResponse": false,
                "users": []
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "team": {"id": 9, "version": 0, "name": "ops", "users": []}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let created = client
            .create_team(&Team::new("ops", "Operations"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(created.id, Some(9));
    }

    #[tokio::test]
    async fn test_delete_team() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/teams/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        assert!(client
            .delete_team(9, &CancellationToken::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_create_team_conflict() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/teams"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"errors": []})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client
            .create_team(&Team::new("ops", ""), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::Api { status: 409 }));
        assert!(!err.is_retryable());
    }
}
