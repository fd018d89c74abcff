//! Merges the four controller channels into one session.
//!
//! Every inbound frame and every user action runs to completion against the
//! reconciler before the next one is handled, and produces one [`Reaction`]
//! telling the view whether anything changed and which one-shot notices to
//! show.

use shared::{
    domain::{Checkpoint, KilnState, TraceSample},
    protocol::{
        AckStatus, Channel, ConfigMessage, ControlCommand, Inbound, Outbound, StorageAck,
        StorageRequest, StorageResponse, TelemetryMessage,
    },
};
use tracing::{debug, info, warn};

use crate::{
    display::{self, LiveReadout, ProfileSummary},
    session::{SegmentField, Session, SessionError, StateUpdate},
    settings::{DisplaySettings, ReconcilerOptions},
};

/// Outbound side of the channels. Sends are fire-and-forget.
pub trait Uplink {
    fn send(&mut self, message: Outbound);
}

impl Uplink for Vec<Outbound> {
    fn send(&mut self, message: Outbound) {
        self.push(message);
    }
}

/// One-shot notifications for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    RunCompleted,
    /// The telemetry channel dropped; the view should stay degraded until a
    /// reload.
    TelemetryLost,
    /// Storage refused a write because the name is taken. Answer with
    /// [`ChannelReconciler::confirm_overwrite`] or
    /// [`ChannelReconciler::decline_overwrite`].
    OverwriteRequested { name: String },
    /// A forced write failed as well. Not retried.
    WriteRejected { name: String },
    WriteAcknowledged { name: String },
    MalformedFrame { channel: Channel, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    pub changed: bool,
    pub notices: Vec<Notice>,
}

impl Reaction {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            changed: true,
            notices: Vec::new(),
        }
    }

    fn notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

/// Where an outstanding storage write stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    Sent,
    AwaitingConfirmation,
    ForcedSent,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    request: StorageRequest,
    phase: WritePhase,
}

impl PendingWrite {
    fn name(&self) -> String {
        self.request.profile_name().unwrap_or_default().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    Simulate,
}

pub struct ChannelReconciler<U: Uplink> {
    uplink: U,
    session: Session,
    settings: DisplaySettings,
    options: ReconcilerOptions,
    readout: Option<LiveReadout>,
    pending_write: Option<PendingWrite>,
    degraded: bool,
}

impl<U: Uplink> ChannelReconciler<U> {
    pub fn new(uplink: U, options: ReconcilerOptions) -> Self {
        Self {
            uplink,
            session: Session::new(),
            settings: DisplaySettings::default(),
            options,
            readout: None,
            pending_write: None,
            degraded: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    pub fn readout(&self) -> Option<&LiveReadout> {
        self.readout.as_ref()
    }

    pub fn uplink(&self) -> &U {
        &self.uplink
    }

    pub fn uplink_mut(&mut self) -> &mut U {
        &mut self.uplink
    }

    /// True once telemetry was lost; only a full reload clears it.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn write_phase(&self) -> Option<WritePhase> {
        self.pending_write.as_ref().map(|pending| pending.phase)
    }

    pub fn profile_summary(&self) -> Option<ProfileSummary> {
        self.session
            .active_profile()
            .map(|profile| ProfileSummary::new(profile, &self.settings, self.options.element_watts))
    }

    pub fn on_connected(&mut self, channel: Channel) -> Reaction {
        debug!(%channel, "channel connected");
        match channel {
            Channel::Telemetry | Channel::Control => {}
            Channel::Config => self.uplink.send(Outbound::ConfigRefresh),
            Channel::Storage => self.uplink.send(Outbound::Storage(StorageRequest::Get)),
        }
        Reaction::unchanged()
    }

    pub fn on_disconnected(&mut self, channel: Channel) -> Reaction {
        if channel != Channel::Telemetry {
            warn!(%channel, "channel closed");
            return Reaction::unchanged();
        }
        warn!("telemetry channel unavailable; waiting for the controller to come back");
        self.degraded = true;
        Reaction::changed().notice(Notice::TelemetryLost)
    }

    /// Decodes and applies one text frame. Malformed frames are reported,
    /// never fatal.
    pub fn handle_frame(&mut self, channel: Channel, text: &str) -> Reaction {
        match Inbound::decode(channel, text) {
            Ok(inbound) => self.dispatch(inbound),
            Err(err) => {
                warn!(%channel, error = %err, "dropping malformed frame");
                Reaction::unchanged().notice(Notice::MalformedFrame {
                    channel,
                    reason: err.to_string(),
                })
            }
        }
    }

    pub fn dispatch(&mut self, inbound: Inbound) -> Reaction {
        match inbound {
            Inbound::Telemetry(message) => self.on_telemetry(message),
            Inbound::Simulation(sample) => self.on_simulation_sample(sample),
            Inbound::Config(message) => self.on_config(message),
            Inbound::Storage(response) => self.on_storage(response),
        }
    }

    pub fn on_telemetry(&mut self, message: TelemetryMessage) -> Reaction {
        if message.is_backlog() {
            return self.replay_backlog(message);
        }
        self.live_tick(message)
    }

    fn replay_backlog(&mut self, message: TelemetryMessage) -> Reaction {
        info!(entries = message.log.len(), "replaying telemetry backlog");
        if let Some(profile) = &message.profile {
            self.session.remember_selection(profile.name());
        }
        self.session.reset_trace();
        for sample in message.log {
            self.session.append_trace(sample);
        }
        Reaction::changed()
    }

    fn live_tick(&mut self, message: TelemetryMessage) -> Reaction {
        let mut reaction = Reaction::changed();
        if let Some(reported) = message.state.clone() {
            match self.session.apply_external_state(reported) {
                StateUpdate::SuppressedWhileEditing => {
                    debug!("ignoring telemetry tick while a draft is open");
                    return Reaction::unchanged();
                }
                StateUpdate::Changed {
                    run_completed: true,
                    ..
                } => reaction.notices.push(Notice::RunCompleted),
                StateUpdate::Changed { .. } | StateUpdate::Unchanged => {}
            }
        } else if self.session.is_editing() {
            return Reaction::unchanged();
        }

        let state = self.session.state().clone();
        if state == KilnState::Running {
            self.session
                .append_trace(TraceSample::new(message.runtime, message.temperature));
        }
        self.readout = Some(LiveReadout::from_tick(&message, &state, &self.settings));
        self.session.record_telemetry(message);
        reaction
    }

    pub fn on_simulation_sample(&mut self, sample: TraceSample) -> Reaction {
        self.session.append_trace(sample);
        Reaction::changed()
    }

    pub fn on_config(&mut self, message: ConfigMessage) -> Reaction {
        debug!(
            temp_scale = %message.temp_scale,
            slope = message.time_scale_slope.short_name(),
            profile = message.time_scale_profile.short_name(),
            "presentation settings updated"
        );
        self.settings.apply(message);
        Reaction::changed()
    }

    pub fn on_storage(&mut self, response: StorageResponse) -> Reaction {
        match response {
            StorageResponse::Catalog(profiles) => {
                info!(profiles = profiles.len(), "profile catalog refreshed");
                self.session.replace_catalog(profiles);
                Reaction::changed()
            }
            StorageResponse::Ack(ack) => self.on_storage_ack(ack),
        }
    }

    fn on_storage_ack(&mut self, ack: StorageAck) -> Reaction {
        let Some(pending) = self.pending_write.take() else {
            debug!(resp = ?ack.resp, "storage ack without a pending write");
            return Reaction::unchanged();
        };
        let name = pending.name();

        let Some(resp) = ack.resp else {
            if matches!(pending.request, StorageRequest::Delete { .. }) {
                warn!(profile = %name, "storage delete failed");
                return Reaction::changed().notice(Notice::WriteRejected { name });
            }
            debug!(profile = %name, "storage echo without a status");
            self.pending_write = Some(pending);
            return Reaction::unchanged();
        };

        match (resp, pending.phase) {
            (AckStatus::Ok, _) => {
                info!(profile = %name, forced = pending.request.is_forced(), "storage write acknowledged");
                Reaction::changed().notice(Notice::WriteAcknowledged { name })
            }
            (AckStatus::Fail, WritePhase::Sent) => {
                info!(profile = %name, "storage write refused; asking before overwriting");
                self.pending_write = Some(PendingWrite {
                    phase: WritePhase::AwaitingConfirmation,
                    ..pending
                });
                Reaction::changed().notice(Notice::OverwriteRequested { name })
            }
            (AckStatus::Fail, WritePhase::ForcedSent) => {
                warn!(profile = %name, "forced storage write failed");
                Reaction::changed().notice(Notice::WriteRejected { name })
            }
            (AckStatus::Fail, WritePhase::AwaitingConfirmation) => {
                debug!(profile = %name, "repeated refusal while awaiting confirmation");
                self.pending_write = Some(pending);
                Reaction::unchanged()
            }
        }
    }

    fn send_write(&mut self, request: StorageRequest, phase: WritePhase) {
        if let Some(previous) = self.pending_write.take() {
            warn!(profile = %previous.name(), "superseding an unanswered storage write");
        }
        self.uplink.send(Outbound::Storage(request.clone()));
        self.pending_write = Some(PendingWrite { request, phase });
    }

    /// Resends the refused write once, with `force` set.
    pub fn confirm_overwrite(&mut self) -> Result<Reaction, SessionError> {
        match self.pending_write.take() {
            Some(pending) if pending.phase == WritePhase::AwaitingConfirmation => {
                info!(profile = %pending.name(), "overwrite confirmed");
                self.send_write(pending.request.forced(), WritePhase::ForcedSent);
                Ok(Reaction::changed())
            }
            other => {
                self.pending_write = other;
                Err(SessionError::NothingToConfirm)
            }
        }
    }

    pub fn decline_overwrite(&mut self) -> Result<Reaction, SessionError> {
        match self.pending_write.take() {
            Some(pending) if pending.phase == WritePhase::AwaitingConfirmation => {
                info!(profile = %pending.name(), "overwrite declined");
                Ok(Reaction::changed())
            }
            other => {
                self.pending_write = other;
                Err(SessionError::NothingToConfirm)
            }
        }
    }

    pub fn select_profile(&mut self, name: &str) -> Result<Reaction, SessionError> {
        self.session.select(name)?;
        Ok(Reaction::changed())
    }

    /// Starts a run (or a simulation) of the selected profile.
    pub fn start_run(&mut self, mode: RunMode) -> Result<Reaction, SessionError> {
        if self.session.is_editing() {
            return Err(SessionError::InvalidTransition {
                action: "start a run",
                state: KilnState::Edit,
            });
        }
        let profile = self
            .session
            .active_profile()
            .cloned()
            .ok_or(SessionError::NoProfileSelected)?;
        let command = match mode {
            RunMode::Run => ControlCommand::Run { profile },
            RunMode::Simulate => ControlCommand::Simulate { profile },
        };
        info!(command = command.name(), "sending run command");
        self.session.reset_trace();
        self.uplink.send(Outbound::Control(command));
        Ok(Reaction::changed())
    }

    pub fn stop_run(&mut self) -> Reaction {
        info!("sending stop command");
        self.uplink.send(Outbound::Control(ControlCommand::Stop));
        Reaction::unchanged()
    }

    pub fn start_new(&mut self) -> Result<Reaction, SessionError> {
        self.session.begin_new(self.settings.temp_scale)?;
        Ok(Reaction::changed())
    }

    pub fn edit_selected(&mut self) -> Result<Reaction, SessionError> {
        self.session.begin_edit()?;
        Ok(Reaction::changed())
    }

    /// Leaves the draft without saving and refreshes the catalog.
    pub fn leave_edit(&mut self) -> Result<Reaction, SessionError> {
        self.session.cancel_edit()?;
        self.uplink.send(Outbound::Storage(StorageRequest::Get));
        Ok(Reaction::changed())
    }

    /// Validates the draft, writes it to storage and refreshes the catalog.
    /// An invalid draft stays open and nothing is sent.
    pub fn save(&mut self, name: &str) -> Result<Reaction, SessionError> {
        let profile = self.session.finish_edit(name, self.settings.temp_scale)?;
        info!(profile = %profile.name, points = profile.data.len(), "saving profile");
        self.send_write(StorageRequest::put(profile), WritePhase::Sent);
        self.uplink.send(Outbound::Storage(StorageRequest::Get));
        Ok(Reaction::changed())
    }

    pub fn delete_selected(&mut self) -> Result<Reaction, SessionError> {
        if self.session.is_editing() {
            return Err(SessionError::InvalidTransition {
                action: "delete a profile",
                state: KilnState::Edit,
            });
        }
        let name = self
            .session
            .selected_name()
            .ok_or(SessionError::NoProfileSelected)?
            .to_string();
        info!(profile = %name, "deleting profile");
        self.send_write(StorageRequest::delete(name), WritePhase::Sent);
        self.uplink.send(Outbound::Storage(StorageRequest::Get));
        Ok(Reaction::changed())
    }

    pub fn add_point(&mut self) -> Result<Reaction, SessionError> {
        self.session.push_checkpoint(&self.options.seeds)?;
        Ok(Reaction::changed())
    }

    pub fn remove_point(&mut self) -> Result<Reaction, SessionError> {
        self.session.pop_checkpoint()?;
        Ok(Reaction::changed())
    }

    /// Sets a draft checkpoint; `time` is entered in the profile time unit.
    pub fn set_point(
        &mut self,
        index: usize,
        time: f64,
        temperature: f64,
    ) -> Result<Reaction, SessionError> {
        let seconds = display::time_from_display(time, self.settings.time_scale_profile);
        self.session
            .set_checkpoint(index, Checkpoint::new(seconds, temperature))?;
        Ok(Reaction::changed())
    }

    pub fn set_segment_rate(&mut self, index: usize, rate: f64) -> Result<Reaction, SessionError> {
        let per_hour = display::rate_from_display(rate, self.settings.time_scale_slope);
        self.edit_segment(index, SegmentField::Rate(per_hour))
    }

    pub fn set_segment_target(
        &mut self,
        index: usize,
        target: f64,
    ) -> Result<Reaction, SessionError> {
        self.edit_segment(index, SegmentField::Target(target))
    }

    /// `hold` is entered in the profile time unit.
    pub fn set_segment_hold(&mut self, index: usize, hold: f64) -> Result<Reaction, SessionError> {
        let seconds = display::time_from_display(hold, self.settings.time_scale_profile);
        self.edit_segment(index, SegmentField::Hold(seconds))
    }

    fn edit_segment(&mut self, index: usize, field: SegmentField) -> Result<Reaction, SessionError> {
        self.session.set_segment(index, field, &self.options.seeds)?;
        Ok(Reaction::changed())
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
