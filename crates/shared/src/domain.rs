use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds in one hour, the canonical rate denominator.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// One `(time offset, temperature)` point of a firing profile.
///
/// On the wire a checkpoint is the two-element array `[seconds, temperature]`.
/// Fractional or negative offsets from hand-edited records are rounded or
/// rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(u64, f64)")]
pub struct Checkpoint {
    pub time_offset: u64,
    pub temperature: f64,
}

impl Checkpoint {
    pub fn new(time_offset: u64, temperature: f64) -> Self {
        Self {
            time_offset,
            temperature,
        }
    }
}

impl TryFrom<(f64, f64)> for Checkpoint {
    type Error = String;

    fn try_from((time_offset, temperature): (f64, f64)) -> Result<Self, Self::Error> {
        if !time_offset.is_finite() || time_offset < 0.0 {
            return Err(format!("invalid checkpoint time offset {time_offset}"));
        }
        Ok(Self::new(time_offset.round() as u64, temperature))
    }
}

impl From<Checkpoint> for (u64, f64) {
    fn from(value: Checkpoint) -> Self {
        (value.time_offset, value.temperature)
    }
}

/// One `(rate, target temperature, hold)` unit of a rate-based schedule.
///
/// `rate` is degrees per hour; its sign gives the direction and zero marks a
/// flat (hold-only) transition. On the wire a segment is `[rate, target, hold]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64, f64)", into = "(i64, f64, u64)")]
pub struct Segment {
    pub rate: i64,
    pub target_temperature: f64,
    pub hold: u64,
}

impl Segment {
    pub fn new(rate: i64, target_temperature: f64, hold: u64) -> Self {
        Self {
            rate,
            target_temperature,
            hold,
        }
    }

    pub fn slope(&self) -> Slope {
        Slope::of(self.rate as f64)
    }
}

impl TryFrom<(f64, f64, f64)> for Segment {
    type Error = String;

    fn try_from((rate, target_temperature, hold): (f64, f64, f64)) -> Result<Self, Self::Error> {
        if !rate.is_finite() {
            return Err(format!("invalid segment rate {rate}"));
        }
        if !hold.is_finite() || hold < 0.0 {
            return Err(format!("invalid segment hold {hold}"));
        }
        Ok(Self::new(
            rate.round() as i64,
            target_temperature,
            hold.round() as u64,
        ))
    }
}

impl From<Segment> for (i64, f64, u64) {
    fn from(value: Segment) -> Self {
        (value.rate, value.target_temperature, value.hold)
    }
}

/// Direction of a ramp, used to pick the trend marker next to a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    Up,
    Down,
    Flat,
}

impl Slope {
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Up
        } else if value < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TempUnit {
    #[serde(rename = "C", alias = "c")]
    Celsius,
    #[serde(rename = "F", alias = "f")]
    Fahrenheit,
}

impl TempUnit {
    /// Unit assumed for stored records that predate the `temp_units` tag.
    pub fn legacy_default() -> Self {
        Self::Fahrenheit
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}

impl Default for TempUnit {
    fn default() -> Self {
        Self::Celsius
    }
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Time unit used to present slopes and profile times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeScale {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl TimeScale {
    pub fn seconds(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => SECONDS_PER_HOUR,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            Self::Seconds => "Seconds",
            Self::Minutes => "Minutes",
            Self::Hours => "Hours",
        }
    }
}

/// Lifecycle state of the firing session.
///
/// The controller may report states this client has no special handling
/// for; those are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KilnState {
    #[default]
    Idle,
    Edit,
    Running,
    Paused,
    Other(String),
}

impl KilnState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "IDLE",
            Self::Edit => "EDIT",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_firing(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl From<String> for KilnState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "IDLE" => Self::Idle,
            "EDIT" => Self::Edit,
            "RUNNING" => Self::Running,
            "PAUSED" => Self::Paused,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for KilnState {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<KilnState> for String {
    fn from(value: KilnState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for KilnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordKind {
    #[default]
    #[serde(rename = "profile")]
    Profile,
}

/// A named firing profile as exchanged with the storage channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    pub name: String,
    #[serde(default)]
    pub data: Vec<Checkpoint>,
    /// Derived segment-form cache. Older controllers publish it as `rates`.
    #[serde(default, alias = "rates", skip_serializing_if = "Option::is_none")]
    pub rate: Option<Vec<Segment>>,
    #[serde(default = "TempUnit::legacy_default")]
    pub temp_units: TempUnit,
}

impl Profile {
    pub fn new(name: impl Into<String>, temp_units: TempUnit) -> Self {
        Self {
            kind: RecordKind::Profile,
            name: name.into(),
            data: Vec::new(),
            rate: None,
            temp_units,
        }
    }

    pub fn with_data(mut self, data: Vec<Checkpoint>) -> Self {
        self.data = data;
        self
    }

    /// Offset of the last checkpoint, i.e. the nominal length of a firing.
    pub fn duration_secs(&self) -> u64 {
        self.data.last().map(|point| point.time_offset).unwrap_or(0)
    }
}

/// Identity-only profile reference used by delete requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileKey {
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    pub name: String,
}

impl ProfileKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Profile,
            name: name.into(),
        }
    }
}

/// One point of the live trace, as logged by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub runtime: f64,
    pub temperature: f64,
}

impl TraceSample {
    pub fn new(runtime: f64, temperature: f64) -> Self {
        Self {
            runtime,
            temperature,
        }
    }
}
