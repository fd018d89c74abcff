use super::*;
use serde_json::json;
use shared::domain::{Profile, Segment, TempUnit, TimeScale};

const CATALOG: &str = r#"[
    {"type": "profile", "name": "glaze", "data": [[0, 20], [3600, 1000]], "temp_units": "c"},
    {"type": "profile", "name": "bisque", "data": [[0, 20], [3600, 100], [7200, 100], [10800, 50]], "temp_units": "C"}
]"#;

fn reconciler() -> ChannelReconciler<Vec<Outbound>> {
    ChannelReconciler::new(Vec::new(), ReconcilerOptions::default())
}

fn with_catalog() -> ChannelReconciler<Vec<Outbound>> {
    let mut reconciler = reconciler();
    reconciler.handle_frame(Channel::Storage, CATALOG);
    reconciler
}

fn drain(reconciler: &mut ChannelReconciler<Vec<Outbound>>) -> Vec<Outbound> {
    std::mem::take(reconciler.uplink_mut())
}

fn tick(state: &str, runtime: f64, temperature: f64) -> String {
    json!({
        "state": state,
        "profile": "bisque",
        "runtime": runtime,
        "totaltime": 10800,
        "target": temperature + 5.0,
        "temperature": temperature,
        "heat_rate": 40
    })
    .to_string()
}

fn put_force(outbound: &Outbound) -> Option<bool> {
    match outbound {
        Outbound::Storage(StorageRequest::Put { force, .. }) => Some(*force),
        _ => None,
    }
}

/// Brings the reconciler to the point where storage refused a save.
fn refused_save() -> ChannelReconciler<Vec<Outbound>> {
    let mut reconciler = with_catalog();
    reconciler.edit_selected().expect("edit");
    reconciler.save("bisque").expect("save");
    drain(&mut reconciler);

    let reaction = reconciler.handle_frame(
        Channel::Storage,
        r#"{"cmd": "PUT", "profile": {"name": "bisque"}, "resp": "FAIL"}"#,
    );
    assert_eq!(
        reaction.notices,
        vec![Notice::OverwriteRequested {
            name: "bisque".into()
        }]
    );
    reconciler
}

#[test]
fn connecting_requests_initial_state() {
    let mut reconciler = reconciler();
    reconciler.on_connected(Channel::Telemetry);
    reconciler.on_connected(Channel::Control);
    assert!(reconciler.uplink().is_empty());

    reconciler.on_connected(Channel::Config);
    reconciler.on_connected(Channel::Storage);
    assert_eq!(
        drain(&mut reconciler),
        vec![Outbound::ConfigRefresh, Outbound::Storage(StorageRequest::Get)]
    );
}

#[test]
fn catalog_selects_first_profile_by_name() {
    let reconciler = with_catalog();
    assert_eq!(reconciler.session().selected_name(), Some("bisque"));

    let summary = reconciler.profile_summary().expect("summary");
    assert_eq!(summary.name, "bisque");
    assert_eq!(summary.duration, "03:00:00");
}

#[test]
fn overwrite_is_forced_exactly_once() {
    let mut reconciler = refused_save();
    assert_eq!(reconciler.write_phase(), Some(WritePhase::AwaitingConfirmation));
    assert!(reconciler.uplink().is_empty());

    reconciler.confirm_overwrite().expect("confirm");
    let sent = drain(&mut reconciler);
    assert_eq!(sent.len(), 1);
    assert_eq!(put_force(&sent[0]), Some(true));
    assert_eq!(reconciler.write_phase(), Some(WritePhase::ForcedSent));

    let reaction = reconciler.handle_frame(
        Channel::Storage,
        r#"{"cmd": "PUT", "force": true, "resp": "FAIL"}"#,
    );
    assert_eq!(
        reaction.notices,
        vec![Notice::WriteRejected {
            name: "bisque".into()
        }]
    );
    assert!(reconciler.uplink().is_empty());
    assert_eq!(reconciler.write_phase(), None);
    assert_eq!(
        reconciler.confirm_overwrite(),
        Err(SessionError::NothingToConfirm)
    );
}

#[test]
fn declining_drops_the_write() {
    let mut reconciler = refused_save();
    reconciler.decline_overwrite().expect("decline");
    assert_eq!(reconciler.write_phase(), None);
    assert!(reconciler.uplink().is_empty());
    assert_eq!(
        reconciler.decline_overwrite(),
        Err(SessionError::NothingToConfirm)
    );
}

#[test]
fn confirmation_needs_a_refusal_first() {
    let mut reconciler = with_catalog();
    reconciler.edit_selected().expect("edit");
    reconciler.save("bisque").expect("save");

    assert_eq!(
        reconciler.confirm_overwrite(),
        Err(SessionError::NothingToConfirm)
    );
    assert_eq!(reconciler.write_phase(), Some(WritePhase::Sent));
}

#[test]
fn accepted_save_is_acknowledged_and_refreshed() {
    let mut reconciler = with_catalog();
    reconciler.edit_selected().expect("edit");
    reconciler.save("bisque copy").expect("save");

    let sent = drain(&mut reconciler);
    assert_eq!(sent.len(), 2);
    assert_eq!(put_force(&sent[0]), Some(false));
    assert_eq!(sent[1], Outbound::Storage(StorageRequest::Get));

    let reaction = reconciler.handle_frame(Channel::Storage, r#"{"cmd": "PUT", "resp": "OK"}"#);
    assert_eq!(
        reaction.notices,
        vec![Notice::WriteAcknowledged {
            name: "bisque copy".into()
        }]
    );
    assert_eq!(reconciler.write_phase(), None);

    let stray = reconciler.handle_frame(Channel::Storage, r#"{"resp": "OK"}"#);
    assert_eq!(stray, Reaction::default());
}

#[test]
fn invalid_draft_is_not_sent() {
    let mut reconciler = with_catalog();
    reconciler.edit_selected().expect("edit");
    reconciler.set_point(2, 1.0, 100.0).expect("set point");

    let err = reconciler.save("bisque").expect_err("time travel");
    assert!(matches!(err, SessionError::Schedule(_)));
    assert!(reconciler.uplink().is_empty());
    assert!(reconciler.session().is_editing());
}

#[test]
fn delete_uses_the_same_conflict_protocol() {
    let mut reconciler = with_catalog();
    reconciler.delete_selected().expect("delete");
    let sent = drain(&mut reconciler);
    assert_eq!(sent[0], Outbound::Storage(StorageRequest::delete("bisque")));
    assert_eq!(sent[1], Outbound::Storage(StorageRequest::Get));

    reconciler.handle_frame(Channel::Storage, r#"{"cmd": "DELETE", "resp": "FAIL"}"#);
    reconciler.confirm_overwrite().expect("confirm");
    assert_eq!(
        drain(&mut reconciler),
        vec![Outbound::Storage(StorageRequest::delete("bisque").forced())]
    );
}

#[test]
fn delete_echo_without_status_is_a_rejection() {
    let mut reconciler = with_catalog();
    reconciler.delete_selected().expect("delete");
    drain(&mut reconciler);

    let reaction = reconciler.handle_frame(
        Channel::Storage,
        r#"{"cmd": "DELETE", "profile": {"type": "profile", "name": "bisque"}}"#,
    );
    assert_eq!(
        reaction.notices,
        vec![Notice::WriteRejected {
            name: "bisque".into()
        }]
    );
    assert_eq!(reconciler.write_phase(), None);
}

#[test]
fn malformed_frames_are_reported_not_applied() {
    let mut reconciler = with_catalog();
    let reaction = reconciler.handle_frame(Channel::Config, "{not json");

    assert!(!reaction.changed);
    assert!(matches!(
        reaction.notices.as_slice(),
        [Notice::MalformedFrame {
            channel: Channel::Config,
            ..
        }]
    ));
    assert_eq!(reconciler.settings(), &DisplaySettings::default());
}

#[test]
fn config_frame_updates_presentation() {
    let mut reconciler = reconciler();
    reconciler.handle_frame(
        Channel::Config,
        r#"{"temp_scale": "f", "time_scale_slope": "h", "time_scale_profile": "m", "kwh_rate": 0.1, "currency_type": "USD"}"#,
    );

    let settings = reconciler.settings();
    assert_eq!(settings.temp_scale, TempUnit::Fahrenheit);
    assert_eq!(settings.time_scale_slope, TimeScale::Hours);
    assert_eq!(settings.time_scale_profile, TimeScale::Minutes);
    assert_eq!(settings.currency_type, "USD");
}

#[test]
fn telemetry_tick_feeds_readout_and_trace() {
    let mut reconciler = with_catalog();
    let reaction = reconciler.handle_frame(
        Channel::Telemetry,
        &json!({"state": "RUNNING", "runtime": 60, "totaltime": 120, "temperature": 30, "heat_rate": 15000}).to_string(),
    );

    assert!(reaction.changed);
    let readout = reconciler.readout().expect("readout");
    assert_eq!(readout.heat_rate, 9999);
    assert_eq!(readout.progress_percent, 50.0);
    assert_eq!(
        reconciler.session().live_trace(),
        &[TraceSample::new(60.0, 30.0)]
    );

    reconciler.handle_frame(
        Channel::Telemetry,
        &json!({"state": "RUNNING", "heat_rate": -20000}).to_string(),
    );
    assert_eq!(reconciler.readout().map(|r| r.heat_rate), Some(-9999));
}

#[test]
fn completed_run_is_announced_once() {
    let mut reconciler = with_catalog();
    reconciler.handle_frame(Channel::Telemetry, &tick("RUNNING", 100.0, 500.0));
    let done = reconciler.handle_frame(Channel::Telemetry, &tick("IDLE", 10800.0, 50.0));
    let after = reconciler.handle_frame(Channel::Telemetry, &tick("IDLE", 10800.0, 49.0));

    assert_eq!(done.notices, vec![Notice::RunCompleted]);
    assert!(after.notices.is_empty());
    assert_eq!(reconciler.session().live_trace().len(), 1);
}

#[test]
fn ticks_do_not_disturb_an_open_draft() {
    let mut reconciler = with_catalog();
    reconciler.start_new().expect("new");
    let reaction = reconciler.handle_frame(Channel::Telemetry, &tick("RUNNING", 100.0, 500.0));

    assert_eq!(reaction, Reaction::default());
    assert!(reconciler.session().is_editing());
    assert!(reconciler.session().live_trace().is_empty());
    assert!(reconciler.readout().is_none());
}

#[test]
fn backlog_replaces_trace_and_selects_profile() {
    let mut reconciler = reconciler();
    reconciler.on_simulation_sample(TraceSample::new(1.0, 1.0));
    reconciler.handle_frame(
        Channel::Telemetry,
        &json!({
            "type": "backlog",
            "profile": {"name": "glaze"},
            "log": [
                {"runtime": 0, "temperature": 20},
                {"runtime": 30, "temperature": 22.5}
            ]
        })
        .to_string(),
    );

    assert_eq!(
        reconciler.session().live_trace(),
        &[TraceSample::new(0.0, 20.0), TraceSample::new(30.0, 22.5)]
    );
    assert_eq!(reconciler.session().state_last(), None);

    reconciler.handle_frame(Channel::Storage, CATALOG);
    assert_eq!(reconciler.session().selected_name(), Some("glaze"));
}

#[test]
fn losing_telemetry_degrades_the_view() {
    let mut reconciler = reconciler();
    assert_eq!(reconciler.on_disconnected(Channel::Storage), Reaction::default());
    assert!(!reconciler.is_degraded());

    let reaction = reconciler.on_disconnected(Channel::Telemetry);
    assert_eq!(reaction.notices, vec![Notice::TelemetryLost]);
    assert!(reconciler.is_degraded());
}

#[test]
fn starting_a_run_clears_the_trace() {
    let mut reconciler = with_catalog();
    reconciler.on_simulation_sample(TraceSample::new(5.0, 25.0));

    reconciler.start_run(RunMode::Simulate).expect("simulate");
    assert!(reconciler.session().live_trace().is_empty());
    let sent = drain(&mut reconciler);
    assert!(matches!(
        sent.as_slice(),
        [Outbound::Control(ControlCommand::Simulate { profile })] if profile.name == "bisque"
    ));

    reconciler.handle_frame(Channel::Control, r#"{"runtime": 30, "temperature": 21}"#);
    assert_eq!(
        reconciler.session().live_trace(),
        &[TraceSample::new(30.0, 21.0)]
    );

    reconciler.stop_run();
    assert_eq!(
        drain(&mut reconciler),
        vec![Outbound::Control(ControlCommand::Stop)]
    );
}

#[test]
fn runs_need_a_profile_and_no_draft() {
    let mut empty = reconciler();
    assert_eq!(
        empty.start_run(RunMode::Run),
        Err(SessionError::NoProfileSelected)
    );

    let mut editing = with_catalog();
    editing.edit_selected().expect("edit");
    assert!(matches!(
        editing.start_run(RunMode::Run),
        Err(SessionError::InvalidTransition { .. })
    ));
    assert!(editing.delete_selected().is_err());
    assert!(editing.uplink().is_empty());
}

#[test]
fn leaving_edit_refreshes_catalog() {
    let mut reconciler = with_catalog();
    reconciler.edit_selected().expect("edit");
    reconciler.remove_point().expect("remove");
    reconciler.leave_edit().expect("leave");

    assert_eq!(
        drain(&mut reconciler),
        vec![Outbound::Storage(StorageRequest::Get)]
    );
    assert_eq!(
        reconciler.session().active_profile().map(|p| p.data.len()),
        Some(4)
    );
}

#[test]
fn draft_edits_use_display_units() {
    let mut reconciler = with_catalog();
    reconciler.handle_frame(
        Channel::Config,
        r#"{"temp_scale": "C", "time_scale_slope": "m", "time_scale_profile": "m", "kwh_rate": 0.2, "currency_type": "EUR"}"#,
    );
    reconciler.start_new().expect("new");
    reconciler.add_point().expect("add");
    reconciler.add_point().expect("add");
    reconciler.set_point(1, 60.0, 120.0).expect("set");

    assert_eq!(
        reconciler.session().active_profile().map(|p| p.data.clone()),
        Some(vec![Checkpoint::new(0, 20.0), Checkpoint::new(3600, 120.0)])
    );

    // 2 degrees per minute is 120 per hour.
    reconciler.set_segment_rate(0, 2.0).expect("rate");
    reconciler.set_segment_hold(0, 10.0).expect("hold");
    reconciler.set_segment_target(0, 140.0).expect("target");
    assert_eq!(
        reconciler.session().active_profile().map(|p| p.data.clone()),
        Some(vec![
            Checkpoint::new(0, 20.0),
            Checkpoint::new(3600, 140.0),
            Checkpoint::new(4200, 140.0),
        ])
    );

    let saved = reconciler.save("ramp").map(|_| drain(&mut reconciler));
    let sent = saved.expect("save");
    match &sent[0] {
        Outbound::Storage(StorageRequest::Put { profile, force }) => {
            assert!(!force);
            assert_eq!(profile, &expected_ramp());
        }
        other => panic!("unexpected {other:?}"),
    }
}

fn expected_ramp() -> Profile {
    let mut profile = Profile::new("ramp", TempUnit::Celsius).with_data(vec![
        Checkpoint::new(0, 20.0),
        Checkpoint::new(3600, 140.0),
        Checkpoint::new(4200, 140.0),
    ]);
    profile.rate = Some(vec![Segment::new(120, 140.0, 600)]);
    profile
}
