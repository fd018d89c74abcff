//! Conversion between the two equivalent forms of a firing schedule.
//!
//! A profile is a list of `(seconds, temperature)` checkpoints; a schedule is
//! a list of `(rate per hour, target, hold seconds)` segments. Ramp durations
//! coming back from a schedule are quantized to whole minutes, which is what
//! stored schedules were written against, so the two forms agree only up to
//! that quantization.

use shared::domain::{Checkpoint, Segment, SECONDS_PER_HOUR};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("checkpoint {index} at {time}s does not come after the previous one at {previous}s")]
    NotIncreasing { index: usize, time: u64, previous: u64 },
    #[error("segment {index} ramps at {rate}/h but its target {target} lies the other way from {from}")]
    RateDirectionMismatch {
        index: usize,
        rate: i64,
        from: f64,
        target: f64,
    },
}

/// Nearest integer, ties away from zero so heating and cooling ramps round
/// alike.
pub(crate) fn round_to_int(value: f64) -> i64 {
    value.round() as i64
}

/// Checks that time offsets strictly increase.
pub fn validate_checkpoints(points: &[Checkpoint]) -> Result<(), ScheduleError> {
    for (index, pair) in points.windows(2).enumerate() {
        if pair[1].time_offset <= pair[0].time_offset {
            return Err(ScheduleError::NotIncreasing {
                index: index + 1,
                time: pair[1].time_offset,
                previous: pair[0].time_offset,
            });
        }
    }
    Ok(())
}

/// Rate in degrees per hour between two checkpoints.
pub fn rate_between(from: &Checkpoint, to: &Checkpoint) -> i64 {
    let since = to.time_offset as f64 - from.time_offset as f64;
    round_to_int(SECONDS_PER_HOUR * (to.temperature - from.temperature) / since)
}

/// Derives the segment form of a profile.
///
/// A pair whose rate rounds to zero (a flat pair, or a ramp slower than half
/// a degree per hour) becomes a zero-rate segment carrying the pair's duration
/// as its hold. Otherwise a flat pair directly after a ramp becomes that
/// ramp's hold. Callers are expected to have run [`validate_checkpoints`].
pub fn profile_to_schedule(points: &[Checkpoint]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(points.len().saturating_sub(1));
    let mut i = 1;
    while i < points.len() {
        let previous = &points[i - 1];
        let current = &points[i];

        let rate = rate_between(previous, current);
        if rate == 0 {
            let since = current.time_offset.saturating_sub(previous.time_offset);
            segments.push(Segment::new(0, current.temperature, since));
            i += 1;
            continue;
        }

        match points.get(i + 1) {
            Some(next) if next.temperature == current.temperature => {
                let hold = next.time_offset.saturating_sub(current.time_offset);
                segments.push(Segment::new(rate, current.temperature, hold));
                i += 2;
            }
            _ => {
                segments.push(Segment::new(rate, current.temperature, 0));
                i += 1;
            }
        }
    }
    segments
}

/// Ramp length in seconds, rounded to whole minutes. Zero for a zero rate.
pub fn ramp_seconds(from: f64, to: f64, rate: i64) -> i64 {
    if rate == 0 {
        return 0;
    }
    round_to_int(60.0 * (to - from) / rate as f64) * 60
}

/// Rebuilds checkpoints from a schedule, starting at `(0, start_temperature)`.
///
/// A zero-rate segment spends its hold moving to its target, so it yields a
/// single checkpoint. Without a hold its change of temperature is instant.
pub fn schedule_to_profile(
    segments: &[Segment],
    start_temperature: f64,
) -> Result<Vec<Checkpoint>, ScheduleError> {
    let mut points = Vec::with_capacity(segments.len() * 2 + 1);
    points.push(Checkpoint::new(0, start_temperature));

    let mut time = 0u64;
    let mut last_temperature = start_temperature;
    for (index, segment) in segments.iter().enumerate() {
        let target = segment.target_temperature;
        let elapsed = ramp_seconds(last_temperature, target, segment.rate);
        if elapsed < 0 {
            return Err(ScheduleError::RateDirectionMismatch {
                index,
                rate: segment.rate,
                from: last_temperature,
                target,
            });
        }

        time += elapsed as u64;
        if segment.rate == 0 {
            time += segment.hold;
            if segment.hold > 0 || target != last_temperature {
                points.push(Checkpoint::new(time, target));
            }
        } else {
            if target != last_temperature {
                points.push(Checkpoint::new(time, target));
            }
            if segment.hold > 0 {
                time += segment.hold;
                points.push(Checkpoint::new(time, target));
            }
        }
        last_temperature = target;
    }
    Ok(points)
}

#[cfg(test)]
#[path = "tests/schedule_tests.rs"]
mod tests;
