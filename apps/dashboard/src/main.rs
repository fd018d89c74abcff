mod commands;
mod config;
mod liveness;
mod uplink;
mod view;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dashboard_core::{ChannelReconciler, Reaction};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::UserCommand,
    config::{load_settings, DashboardSettings},
    liveness::{HttpLivenessProbe, LivenessProbe},
    uplink::{ChannelUplink, TransportEvent},
};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "dashboard.toml")]
    config: PathBuf,
    /// Overrides the controller URL from the config file and environment.
    #[arg(long)]
    server_url: Option<String>,
}

enum Exit {
    Reload,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    info!(server_url = %settings.server_url, "starting kiln dashboard");

    let (input_tx, mut input) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    let probe = HttpLivenessProbe::new(settings.server_url.clone());
    loop {
        match run_session(&settings, &probe, &mut input).await? {
            Exit::Reload => info!("reloading dashboard"),
            Exit::Quit => break,
        }
    }
    Ok(())
}

/// One dashboard lifetime: fresh channels, fresh session. Ends on quit, or
/// with a reload once the controller is reachable after telemetry loss.
async fn run_session(
    settings: &DashboardSettings,
    probe: &dyn LivenessProbe,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<Exit> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let uplink = ChannelUplink::open(&settings.server_url, events_tx)?;
    let mut reconciler = ChannelReconciler::new(uplink, settings.reconciler_options());
    let recovery = liveness::wait_until_alive(probe, settings.liveness_interval());
    tokio::pin!(recovery);

    loop {
        let reaction = tokio::select! {
            Some(event) = events.recv() => match event {
                TransportEvent::Connected(channel) => reconciler.on_connected(channel),
                TransportEvent::Frame(channel, text) => reconciler.handle_frame(channel, &text),
                TransportEvent::Closed(channel) => reconciler.on_disconnected(channel),
            },
            line = input.recv() => {
                let Some(line) = line else {
                    info!("input closed");
                    return Ok(Exit::Quit);
                };
                match UserCommand::parse(&line) {
                    Ok(UserCommand::Quit) => return Ok(Exit::Quit),
                    Ok(UserCommand::Help) => {
                        println!("{}", commands::HELP);
                        Reaction::default()
                    }
                    Ok(command) => match command.apply(&mut reconciler) {
                        Ok(reaction) => reaction,
                        Err(err) => {
                            warn!(?command, error = %err, "command refused");
                            println!("{}", view::error_text(&err));
                            Reaction::default()
                        }
                    },
                    Err(err) => {
                        println!("{err}");
                        Reaction::default()
                    }
                }
            },
            _ = &mut recovery, if reconciler.is_degraded() => return Ok(Exit::Reload),
        };

        for notice in &reaction.notices {
            println!("{}", view::notice_text(notice));
        }
        if reaction.changed {
            print!("{}", view::render(&reconciler));
        }
    }
}
