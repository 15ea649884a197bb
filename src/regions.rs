use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

/// Known regional endpoints of the monitoring service
///
/// The registry is a convenience; any endpoint can be configured directly
/// through [`ClientConfig::new`](crate::ClientConfig::new).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    EuDe,
    EuGb,
    UsSouth,
    UsEast,
    CaTor,
    AuSyd,
    JpOsa,
    JpTok,
    BrSao,
}

impl Region {
    /// Every region in the registry
    pub const ALL: [Region; 9] = [
        Region::EuDe,
        Region::EuGb,
        Region::UsSouth,
        Region::UsEast,
        Region::CaTor,
        Region::AuSyd,
        Region::JpOsa,
        Region::JpTok,
        Region::BrSao,
    ];

    /// Short region name, e.g. `eu-de`
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::EuDe => "eu-de",
            Region::EuGb => "eu-gb",
            Region::UsSouth => "us-south",
            Region::UsEast => "us-east",
            Region::CaTor => "ca-tor",
            Region::AuSyd => "au-syd",
            Region::JpOsa => "jp-osa",
            Region::JpTok => "jp-tok",
            Region::BrSao => "br-sao",
        }
    }

    /// Base URL of the region's API
    pub fn url(&self) -> Url {
        Url::parse(&format!("https://{}.monitoring.cloud.ibm.com", self.as_str()))
            .expect("Valid region URL")
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown region name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}
