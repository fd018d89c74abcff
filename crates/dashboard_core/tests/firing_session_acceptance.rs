use dashboard_core::{ChannelReconciler, Notice, ReconcilerOptions, RunMode, WritePhase};
use serde_json::json;
use shared::{
    domain::KilnState,
    protocol::{Channel, ControlCommand, Outbound, StorageRequest},
};

fn catalog(names: &[&str]) -> String {
    let profiles: Vec<_> = names
        .iter()
        .map(|name| {
            json!({
                "type": "profile",
                "name": name,
                "data": [[0, 20], [3600, 100], [7200, 100], [10800, 50]],
                "temp_units": "C"
            })
        })
        .collect();
    serde_json::Value::Array(profiles).to_string()
}

#[test]
fn run_edit_and_overwrite_acceptance() {
    let mut dashboard = ChannelReconciler::new(Vec::<Outbound>::new(), ReconcilerOptions::default());

    for channel in Channel::ALL {
        dashboard.on_connected(channel);
    }
    dashboard.handle_frame(
        Channel::Config,
        &json!({
            "temp_scale": "C",
            "time_scale_slope": "h",
            "time_scale_profile": "h",
            "kwh_rate": 0.3,
            "currency_type": "EUR"
        })
        .to_string(),
    );
    dashboard.handle_frame(Channel::Storage, &catalog(&["slow", "fast"]));
    dashboard.handle_frame(
        Channel::Telemetry,
        &json!({"type": "backlog", "profile": {"name": "slow"}, "log": []}).to_string(),
    );
    assert_eq!(dashboard.session().selected_name(), Some("slow"));

    dashboard.start_run(RunMode::Run).expect("run");
    for (runtime, temperature) in [(0.0, 20.0), (1800.0, 60.0), (3600.0, 100.0)] {
        let reaction = dashboard.handle_frame(
            Channel::Telemetry,
            &json!({
                "state": "RUNNING",
                "profile": "slow",
                "runtime": runtime,
                "totaltime": 10800,
                "temperature": temperature,
                "target": temperature,
                "heat_rate": 80,
                "kwh_rate": 0.3,
                "cost": runtime / 3600.0 * 0.3
            })
            .to_string(),
        );
        assert!(reaction.notices.is_empty());
    }
    assert_eq!(dashboard.session().live_trace().len(), 3);
    let readout = dashboard.readout().expect("readout").clone();
    assert_eq!(readout.eta.as_deref(), Some("02:00:00"));
    assert!((readout.cost - 0.3).abs() < 1e-9);

    let done = dashboard.handle_frame(
        Channel::Telemetry,
        &json!({"state": "IDLE", "runtime": 0, "temperature": 50}).to_string(),
    );
    assert_eq!(done.notices, vec![Notice::RunCompleted]);
    assert_eq!(dashboard.session().state(), &KilnState::Idle);

    dashboard.edit_selected().expect("edit");
    dashboard.set_segment_hold(0, 2.0).expect("longer hold");
    dashboard.save("fast").expect("save over an existing name");

    dashboard.handle_frame(Channel::Storage, r#"{"cmd": "PUT", "resp": "FAIL"}"#);
    assert_eq!(dashboard.write_phase(), Some(WritePhase::AwaitingConfirmation));
    dashboard.confirm_overwrite().expect("confirm");
    let ack = dashboard.handle_frame(Channel::Storage, r#"{"cmd": "PUT", "force": true, "resp": "OK"}"#);
    assert_eq!(ack.notices, vec![Notice::WriteAcknowledged { name: "fast".into() }]);

    let sent = dashboard.uplink();
    let kinds: Vec<String> = sent
        .iter()
        .map(|outbound| match outbound {
            Outbound::ConfigRefresh => "config:GET".to_string(),
            Outbound::Control(command) => format!("control:{}", command.name()),
            Outbound::Storage(StorageRequest::Get) => "storage:GET".to_string(),
            Outbound::Storage(request) => format!(
                "storage:{}{}",
                request.profile_name().unwrap_or_default(),
                if request.is_forced() { "!" } else { "" }
            ),
        })
        .collect();
    assert_eq!(
        kinds,
        [
            "config:GET",
            "storage:GET",
            "control:RUN",
            "storage:fast",
            "storage:GET",
            "storage:fast!",
        ]
    );

    match &sent[5] {
        Outbound::Storage(StorageRequest::Put { profile, .. }) => {
            assert_eq!(profile.duration_secs(), 14400);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        &sent[2],
        Outbound::Control(ControlCommand::Run { profile }) if profile.name == "slow"
    ));
}
