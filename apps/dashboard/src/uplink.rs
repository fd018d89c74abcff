//! One websocket per controller channel.
//!
//! Transport tasks never touch the session. Inbound frames and connection
//! changes are forwarded to the task owning the reconciler; outbound frames
//! are queued per channel and written by the channel's task once connected.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use dashboard_core::Uplink;
use futures::{SinkExt, StreamExt};
use shared::protocol::{Channel, Outbound};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(Channel),
    Frame(Channel, String),
    Closed(Channel),
}

/// Websocket endpoint of `channel` on the controller at `server_url`.
pub fn channel_url(server_url: &str, channel: Channel) -> Result<Url> {
    let mut url =
        Url::parse(server_url).with_context(|| format!("invalid server url: {server_url}"))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(anyhow!("server url must use http(s) or ws(s), got {other}")),
    };
    url.set_scheme(scheme)
        .map_err(|()| anyhow!("cannot switch {server_url} to {scheme}"))?;
    url.set_path(channel.path());
    Ok(url)
}

pub struct ChannelUplink {
    senders: HashMap<Channel, mpsc::UnboundedSender<String>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChannelUplink {
    /// Starts one transport task per channel. Connection failures surface as
    /// [`TransportEvent::Closed`], not as an error here.
    pub fn open(server_url: &str, events: mpsc::UnboundedSender<TransportEvent>) -> Result<Self> {
        let mut senders = HashMap::new();
        let mut tasks = Vec::with_capacity(Channel::ALL.len());
        for channel in Channel::ALL {
            let url = channel_url(server_url, channel)?;
            let (tx, rx) = mpsc::unbounded_channel();
            tasks.push(tokio::spawn(run_channel(channel, url, rx, events.clone())));
            senders.insert(channel, tx);
        }
        Ok(Self { senders, tasks })
    }
}

impl Uplink for ChannelUplink {
    fn send(&mut self, message: Outbound) {
        let channel = message.channel();
        let text = match message.encode() {
            Ok(text) => text,
            Err(err) => {
                warn!(%channel, error = %err, "failed to encode outbound frame");
                return;
            }
        };
        match self.senders.get(&channel) {
            Some(tx) if tx.send(text).is_ok() => debug!(%channel, "outbound frame queued"),
            _ => warn!(%channel, "channel closed; dropping outbound frame"),
        }
    }
}

impl Drop for ChannelUplink {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn run_channel(
    channel: Channel,
    url: Url,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let (ws_stream, _) = match connect_async(url.as_str()).await {
        Ok(connected) => connected,
        Err(err) => {
            warn!(%channel, %url, error = %err, "failed to connect websocket");
            let _ = events.send(TransportEvent::Closed(channel));
            return;
        }
    };
    info!(%channel, %url, "websocket connected");
    let (mut ws_writer, mut ws_reader) = ws_stream.split();
    let _ = events.send(TransportEvent::Connected(channel));

    let writer = tokio::spawn(async move {
        while let Some(text) = outgoing.recv().await {
            if let Err(err) = ws_writer.send(Message::Text(text)).await {
                warn!(%channel, error = %err, "websocket send failed");
                break;
            }
        }
    });

    while let Some(msg) = ws_reader.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if events.send(TransportEvent::Frame(channel, text)).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(%channel, error = %err, "websocket receive failed");
                break;
            }
        }
    }

    writer.abort();
    let _ = events.send(TransportEvent::Closed(channel));
}

#[cfg(test)]
#[path = "tests/uplink_tests.rs"]
mod tests;
