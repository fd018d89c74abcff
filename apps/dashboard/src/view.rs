//! Plain-text rendering of the reconciler for the console.

use std::fmt::Write;

use dashboard_core::{
    display::{checkpoint_rows, segment_rows, LiveReadout},
    ChannelReconciler, Notice, SessionError, Uplink,
};
use shared::domain::Slope;

fn arrow(slope: Slope) -> &'static str {
    match slope {
        Slope::Up => "↑",
        Slope::Down => "↓",
        Slope::Flat => "→",
    }
}

pub fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::RunCompleted => "Run completed".into(),
        Notice::TelemetryLost => {
            "Status websocket not available; reloading once the controller is back".into()
        }
        Notice::OverwriteRequested { name } => {
            format!("Profile '{name}' already exists. Overwrite? (confirm / decline)")
        }
        Notice::WriteRejected { name } => format!("Controller refused to write '{name}'"),
        Notice::WriteAcknowledged { name } => format!("Saved '{name}'"),
        Notice::MalformedFrame { channel, reason } => {
            format!("Ignored a malformed {channel} message: {reason}")
        }
    }
}

pub fn error_text(err: &SessionError) -> String {
    format!("Error: {err}")
}

pub fn status_line(readout: &LiveReadout, unit: &str) -> String {
    let mut line = format!(
        "[{}] {}°{unit}",
        readout.state, readout.temperature
    );
    if let Some(target) = readout.target {
        let _ = write!(line, " → {target}°{unit}");
    }
    let _ = write!(line, "  {:+}°{unit}/h", readout.heat_rate);
    if !readout.cone.is_empty() {
        let _ = write!(line, "  cone {}", readout.cone);
    }
    if let Some(eta) = &readout.eta {
        let _ = write!(line, "  {:.0}%  eta {eta}", readout.progress_percent);
    }
    let _ = write!(line, "  {:.2} {}", readout.cost, readout.currency);
    if let Some(heat) = readout.heat_output_percent {
        let _ = write!(line, "  heat {heat:.0}%");
    }
    for (flag, label) in [
        (readout.cooling, "COOL"),
        (readout.air, "AIR"),
        (readout.door_open, "DOOR"),
        (readout.hazard, "HAZARD"),
    ] {
        if flag {
            let _ = write!(line, "  {label}");
        }
    }
    for (name, value) in &readout.ext {
        let _ = write!(line, "  {name}={value}");
    }
    line
}

/// Full screen: selection, summary, schedule tables and live status.
pub fn render<U: Uplink>(reconciler: &ChannelReconciler<U>) -> String {
    let session = reconciler.session();
    let settings = reconciler.settings();
    let unit = settings.temp_scale.symbol();
    let slope_unit = settings.time_scale_slope.short_name();
    let time_unit = settings.time_scale_profile.short_name();
    let mut out = String::new();

    if reconciler.is_degraded() {
        let _ = writeln!(out, "!! telemetry offline, waiting for the controller");
    }

    let names: Vec<&str> = session.catalog().iter().map(|p| p.name.as_str()).collect();
    let _ = writeln!(
        out,
        "state {}  profiles: {}",
        session.state(),
        if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        }
    );

    if let Some(profile) = session.active_profile() {
        let title = if session.is_editing() {
            format!("editing '{}'", profile.name)
        } else {
            format!("selected '{}'", profile.name)
        };
        let _ = write!(out, "{title}");
        if let Some(summary) = reconciler.profile_summary() {
            let _ = write!(
                out,
                "  {}  {:.1} kWh  {:.2} {}",
                summary.duration, summary.kwh, summary.cost, summary.currency
            );
        }
        let _ = writeln!(out);

        for row in checkpoint_rows(&profile.data, settings) {
            let _ = writeln!(
                out,
                "  #{:<3} {:>6}{time_unit}  {:>7.1}°{unit}  {} {}°{unit}/{slope_unit}",
                row.number,
                row.time,
                row.temperature,
                arrow(row.direction),
                row.slope
            );
        }
        if let Some(segments) = session.active_schedule() {
            for row in segment_rows(&segments, profile.temp_units, settings) {
                let _ = writeln!(
                    out,
                    "  seg {:<3} {} {:>6}°{unit}/{slope_unit}  to {:>7.1}°{unit}  hold {}{time_unit}  {}",
                    row.number,
                    arrow(row.slope),
                    row.rate,
                    row.target,
                    row.hold,
                    row.cone
                );
            }
        }
    }

    if let Some(readout) = reconciler.readout() {
        let _ = writeln!(out, "{}", status_line(readout, unit));
    }
    let _ = writeln!(out, "trace: {} samples", session.live_trace().len());
    out
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
