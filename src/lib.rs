//! # Sysdig Monitor API
//!
//! A typed Rust client for the Sysdig / IBM Cloud Monitoring REST API.
//!
//! ## Features
//!
//! - Alerts, notification channels, silencing rules and teams
//! - Optional fields stay absent through decode/encode round trips
//! - Vendor-specific payloads (alert `config`, channel `options`) kept as raw JSON
//! - Registry of regional endpoints
//! - Cancellation of any in-flight request through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! ## Example
//!
//! ```rust,no_run
//! use sysdig_monitor_api::{
//!     Alert, ClientConfig, ManualAlertConfig, MonitorClient, Region, SegmentCondition,
//!     SegmentMatch, Severity, SeverityLabel,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MonitorClient::new(ClientConfig::for_region(Region::EuDe, "my-api-key"))?;
//!     let cancel = CancellationToken::new();
//!
//!     let alert = Alert::manual(
//!         "InodesAlmostFull",
//!         &ManualAlertConfig::new("sysdig_host_fs_inodes_used_percent", ">", 90.0),
//!     )?
//!     .with_condition("avg(avg(sysdig_host_fs_inodes_used_percent)) > 90.0")
//!     .with_severity(Severity::Label(SeverityLabel::Low))
//!     .with_segmentation(
//!         vec!["host.hostName".to_string()],
//!         SegmentCondition::new(SegmentMatch::Any),
//!     )
//!     .with_notification_channels(vec![1721]);
//!
//!     let created = client.create_alert(&alert, &cancel).await?;
//!     println!("created alert {:?}", created.id);
//!     Ok(())
//! }
//! ```

mod alerts;
mod client;
mod errors;
mod notification_channels;
mod payload;
mod regions;
mod silencing_rules;
mod teams;

pub use alerts::{
    Alert, AlertList, AlertType, CustomNotification, ManualAlertConfig, PrometheusAlertConfig,
    SegmentCondition, SegmentMatch, Severity, SeverityLabel, SysdigCapture,
};
pub use client::{ClientConfig, MonitorClient, DEFAULT_TIMEOUT};
pub use errors::{MonitorError, Result};
pub use notification_channels::{
    ChannelType, EmailChannelOptions, NotificationChannel, NotificationChannelList,
    PagerDutyChannelOptions, SlackChannelOptions,
};
pub use payload::RawPayload;
pub use regions::{Region, UnknownRegion};
pub use silencing_rules::SilencingRule;
pub use teams::{EntryPoint, NamespaceFilters, Team, TeamList, UserRole};
