use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    domain::{KilnState, Profile, ProfileKey, TempUnit, TimeScale, TraceSample},
    error::ProtocolError,
};

/// Bare token sent on the config channel to ask for the current settings.
pub const CONFIG_REFRESH_TOKEN: &str = "GET";

/// Marker carried in the `type` field of a telemetry backlog replay.
pub const BACKLOG_MARKER: &str = "backlog";

/// The four logical channels between the dashboard and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Telemetry,
    Control,
    Config,
    Storage,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Telemetry,
        Channel::Control,
        Channel::Config,
        Channel::Storage,
    ];

    /// Endpoint path relative to the controller's base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Telemetry => "/status",
            Self::Control => "/control",
            Self::Config => "/config",
            Self::Storage => "/storage",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Control => "control",
            Self::Config => "config",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The telemetry stream names the active profile either as a bare string
/// (live ticks) or as an object (backlog replays).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileRef {
    Named { name: String },
    Bare(String),
}

impl ProfileRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Named { name } | Self::Bare(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidStats {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub out: f64,
}

/// One frame from the telemetry channel: either a live tick or a backlog
/// replay (`type == "backlog"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<TraceSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<KilnState>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub runtime: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub totaltime: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub target: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub heat_rate: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub heat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pidstats: Option<PidStats>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub cool: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub air: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub kwh_rate: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub cost: f64,
    /// Everything else the controller publishes, `ext_*` plugin values included.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TelemetryMessage {
    pub fn is_backlog(&self) -> bool {
        self.kind.as_deref() == Some(BACKLOG_MARKER)
    }

    /// Plugin-provided values, keyed without their `ext_` prefix.
    pub fn ext_values(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.extra
            .iter()
            .filter_map(|(key, value)| key.strip_prefix("ext_").map(|name| (name, value)))
    }

    /// Energy the controller has billed so far, recovered from its cost and
    /// the rate it priced that cost at.
    pub fn accumulated_kwh(&self) -> Option<f64> {
        (self.kwh_rate > 0.0).then(|| self.cost / self.kwh_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "UPPERCASE")]
pub enum ControlCommand {
    Run { profile: Profile },
    Simulate { profile: Profile },
    Stop,
}

impl ControlCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "RUN",
            Self::Simulate { .. } => "SIMULATE",
            Self::Stop => "STOP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMessage {
    pub temp_scale: TempUnit,
    pub time_scale_slope: TimeScale,
    pub time_scale_profile: TimeScale,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub kwh_rate: f64,
    #[serde(default)]
    pub currency_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "UPPERCASE")]
pub enum StorageRequest {
    /// Catalog request. Older controllers answer on the storage channel only
    /// when the frame is the bare `GET` token, which is what the config
    /// channel refresh sends.
    Get,
    Put {
        profile: Profile,
        #[serde(default, skip_serializing_if = "is_false")]
        force: bool,
    },
    Delete {
        profile: ProfileKey,
        #[serde(default, skip_serializing_if = "is_false")]
        force: bool,
    },
}

impl StorageRequest {
    pub fn put(profile: Profile) -> Self {
        Self::Put {
            profile,
            force: false,
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::Delete {
            profile: ProfileKey::new(name),
            force: false,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }

    pub fn is_forced(&self) -> bool {
        match self {
            Self::Get => false,
            Self::Put { force, .. } | Self::Delete { force, .. } => *force,
        }
    }

    /// The same request with the overwrite flag raised.
    pub fn forced(self) -> Self {
        match self {
            Self::Get => Self::Get,
            Self::Put { profile, .. } => Self::Put {
                profile,
                force: true,
            },
            Self::Delete { profile, .. } => Self::Delete {
                profile,
                force: true,
            },
        }
    }

    pub fn profile_name(&self) -> Option<&str> {
        match self {
            Self::Get => None,
            Self::Put { profile, .. } => Some(&profile.name),
            Self::Delete { profile, .. } => Some(&profile.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Ok,
    Fail,
}

/// Write acknowledgement. The controller echoes the request fields next to
/// `resp`; only the status is needed here. A failed delete is echoed
/// without any `resp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp: Option<AckStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StorageResponse {
    Catalog(Vec<Profile>),
    Ack(StorageAck),
}

/// A decoded inbound frame, tagged by the channel it arrived on.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Telemetry(TelemetryMessage),
    /// Samples pushed on the control channel while simulating.
    Simulation(TraceSample),
    Config(ConfigMessage),
    Storage(StorageResponse),
}

impl Inbound {
    pub fn decode(channel: Channel, text: &str) -> Result<Self, ProtocolError> {
        let malformed = |source| ProtocolError::Malformed { channel, source };
        let inbound = match channel {
            Channel::Telemetry => Self::Telemetry(serde_json::from_str(text).map_err(malformed)?),
            Channel::Control => Self::Simulation(serde_json::from_str(text).map_err(malformed)?),
            Channel::Config => Self::Config(serde_json::from_str(text).map_err(malformed)?),
            Channel::Storage => Self::Storage(serde_json::from_str(text).map_err(malformed)?),
        };
        Ok(inbound)
    }
}

/// A frame the dashboard sends to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Control(ControlCommand),
    ConfigRefresh,
    Storage(StorageRequest),
}

impl Outbound {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Control(_) => Channel::Control,
            Self::ConfigRefresh => Channel::Config,
            Self::Storage(_) => Channel::Storage,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        let channel = self.channel();
        let encoded = match self {
            Self::Control(cmd) => serde_json::to_string(cmd),
            Self::ConfigRefresh => return Ok(CONFIG_REFRESH_TOKEN.to_string()),
            Self::Storage(request) => serde_json::to_string(request),
        };
        encoded.map_err(|source| ProtocolError::Encode { channel, source })
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
