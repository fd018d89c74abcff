//! Values derived for the view. Nothing here feeds back into stored data.

use chrono::NaiveTime;
use shared::{
    domain::{Checkpoint, KilnState, Profile, Segment, Slope, TempUnit, TimeScale, SECONDS_PER_HOUR},
    protocol::TelemetryMessage,
};

use crate::{cone, schedule::round_to_int, settings::DisplaySettings};

/// Heat rates beyond this magnitude are shown pinned to it.
pub const HEAT_RATE_DISPLAY_LIMIT: i64 = 9999;

const SECONDS_PER_DAY: i64 = 86_400;

/// `HH:MM:SS` clock rendering of a second count, wrapping every 24 hours.
pub fn format_hms(seconds: i64) -> String {
    let wrapped = seconds.rem_euclid(SECONDS_PER_DAY) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(wrapped, 0)
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn clamp_heat_rate(heat_rate: f64) -> i64 {
    (heat_rate.trunc() as i64).clamp(-HEAT_RATE_DISPLAY_LIMIT, HEAT_RATE_DISPLAY_LIMIT)
}

/// Per-hour rate expressed per `scale`, for display.
pub fn rate_to_display(rate_per_hour: i64, scale: TimeScale) -> i64 {
    round_to_int(rate_per_hour as f64 * scale.seconds() / SECONDS_PER_HOUR)
}

/// A rate entered per `scale`, back to the canonical per-hour value.
pub fn rate_from_display(value: f64, scale: TimeScale) -> i64 {
    round_to_int(value * SECONDS_PER_HOUR / scale.seconds())
}

/// Per-second slope expressed per `scale`.
pub fn slope_to_display(per_second: f64, scale: TimeScale) -> i64 {
    round_to_int(per_second * scale.seconds())
}

pub fn time_to_display(seconds: u64, scale: TimeScale) -> i64 {
    round_to_int(seconds as f64 / scale.seconds())
}

pub fn time_from_display(value: f64, scale: TimeScale) -> u64 {
    round_to_int(value * scale.seconds()).max(0) as u64
}

fn to_celsius(temperature: f64, unit: TempUnit) -> f64 {
    match unit {
        TempUnit::Celsius => temperature,
        TempUnit::Fahrenheit => (temperature - 32.0) * 5.0 / 9.0,
    }
}

fn rate_to_celsius(rate: f64, unit: TempUnit) -> f64 {
    match unit {
        TempUnit::Celsius => rate,
        TempUnit::Fahrenheit => rate * 5.0 / 9.0,
    }
}

/// Cone equivalent for a temperature and per-hour rate in `unit`.
pub fn cone_for(temperature: f64, rate_per_hour: f64, unit: TempUnit) -> String {
    cone::classify(
        to_celsius(temperature, unit),
        rate_to_celsius(rate_per_hour, unit),
    )
}

/// Headline numbers for the selected profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub name: String,
    pub duration_secs: u64,
    pub duration: String,
    pub kwh: f64,
    pub cost: f64,
    pub currency: String,
}

impl ProfileSummary {
    pub fn new(profile: &Profile, settings: &DisplaySettings, element_watts: f64) -> Self {
        let duration_secs = profile.duration_secs();
        let kwh = element_watts * duration_secs as f64 / SECONDS_PER_HOUR / 1000.0;
        Self {
            name: profile.name.clone(),
            duration_secs,
            duration: format_hms(duration_secs as i64),
            kwh,
            cost: kwh * settings.kwh_rate,
            currency: settings.currency_type.clone(),
        }
    }
}

/// One row of the rate-form schedule table.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    pub number: usize,
    pub rate: i64,
    pub slope: Slope,
    pub target: f64,
    pub cone: String,
    pub hold: i64,
}

pub fn segment_rows(
    segments: &[Segment],
    unit: TempUnit,
    settings: &DisplaySettings,
) -> Vec<SegmentRow> {
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| SegmentRow {
            number: index + 1,
            rate: rate_to_display(segment.rate, settings.time_scale_slope),
            slope: segment.slope(),
            target: segment.target_temperature,
            cone: cone_for(segment.target_temperature, segment.rate as f64, unit),
            hold: time_to_display(segment.hold, settings.time_scale_profile),
        })
        .collect()
}

/// One row of the checkpoint-form table. `slope` is the magnitude of the
/// ramp arriving at this checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRow {
    pub number: usize,
    pub time: i64,
    pub temperature: f64,
    pub slope: i64,
    pub direction: Slope,
}

pub fn checkpoint_rows(points: &[Checkpoint], settings: &DisplaySettings) -> Vec<CheckpointRow> {
    let mut per_second = 0.0;
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            if index > 0 {
                let previous = &points[index - 1];
                let since = point.time_offset as f64 - previous.time_offset as f64;
                per_second = (point.temperature - previous.temperature) / since;
            }
            CheckpointRow {
                number: index + 1,
                time: time_to_display(point.time_offset, settings.time_scale_profile),
                temperature: point.temperature,
                slope: slope_to_display(per_second.abs(), settings.time_scale_slope),
                direction: Slope::of(per_second),
            }
        })
        .collect()
}

/// Everything the status panel shows for one telemetry tick.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveReadout {
    pub state: KilnState,
    pub temperature: i64,
    /// Only present while a run is in progress.
    pub target: Option<i64>,
    pub heat_rate: i64,
    pub cone: String,
    pub progress_percent: f64,
    pub remaining_secs: Option<i64>,
    pub eta: Option<String>,
    pub cost: f64,
    pub reported_cost: f64,
    pub currency: String,
    pub heat_output_percent: Option<f64>,
    pub cooling: bool,
    pub air: bool,
    pub door_open: bool,
    pub hazard: bool,
    pub ext: Vec<(String, String)>,
}

impl LiveReadout {
    /// Derives display values from a tick using whatever settings are current.
    pub fn from_tick(tick: &TelemetryMessage, state: &KilnState, settings: &DisplaySettings) -> Self {
        let running = *state == KilnState::Running;
        let remaining = (tick.totaltime - tick.runtime).trunc() as i64;
        let progress_percent = if running && tick.totaltime > 0.0 {
            (tick.runtime / tick.totaltime * 100.0).min(100.0)
        } else {
            0.0
        };
        let cost = tick
            .accumulated_kwh()
            .map(|kwh| kwh * settings.kwh_rate)
            .unwrap_or(tick.cost);

        Self {
            state: state.clone(),
            temperature: tick.temperature.trunc() as i64,
            target: running.then(|| tick.target.trunc() as i64),
            heat_rate: clamp_heat_rate(tick.heat_rate),
            cone: cone_for(tick.temperature, tick.heat_rate, settings.temp_scale),
            progress_percent,
            remaining_secs: running.then_some(remaining),
            eta: running.then(|| format_hms(remaining)),
            cost,
            reported_cost: tick.cost,
            currency: tick
                .currency_type
                .clone()
                .unwrap_or_else(|| settings.currency_type.clone()),
            heat_output_percent: tick.pidstats.map(|stats| stats.out * 70.0),
            cooling: tick.cool > 0.5,
            air: tick.air > 0.5,
            door_open: matches!(tick.door.as_deref(), Some("OPEN") | Some("UNKNOWN")),
            hazard: tick.temperature > settings.hazard_temperature(),
            ext: tick
                .ext_values()
                .map(|(name, value)| {
                    let rendered = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    (name.to_string(), rendered)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
