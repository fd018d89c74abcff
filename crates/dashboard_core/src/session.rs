//! Firing session lifecycle and the data it owns.

use shared::{
    domain::{Checkpoint, KilnState, Profile, Segment, TempUnit, TraceSample},
    protocol::TelemetryMessage,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    schedule::{self, ScheduleError},
    settings::SeedTemperatures,
};

/// Spacing of a checkpoint appended to a draft.
const NEW_POINT_SPACING_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: KilnState,
    },
    #[error("no profile is being edited")]
    NotEditing,
    #[error("no profile selected")]
    NoProfileSelected,
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),
    #[error("profile name must not be empty")]
    EmptyName,
    #[error("checkpoint {index} does not exist ({len} checkpoints)")]
    CheckpointOutOfRange { index: usize, len: usize },
    #[error("segment {index} does not exist ({len} segments)")]
    SegmentOutOfRange { index: usize, len: usize },
    #[error("no overwrite is awaiting confirmation")]
    NothingToConfirm,
    #[error("an oven is not a time machine: {0}")]
    Schedule(#[from] ScheduleError),
}

/// What an externally reported state did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// A draft is open; the push was not applied.
    SuppressedWhileEditing,
    Unchanged,
    Changed {
        from: Option<KilnState>,
        to: KilnState,
        /// The previous report was `RUNNING` and the new one is neither
        /// `RUNNING` nor `PAUSED`.
        run_completed: bool,
    },
}

/// Progress of the current run, cleared whenever the kiln is not running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunProgress {
    pub runtime: f64,
    pub totaltime: f64,
    pub target: f64,
}

/// Field of a segment edited through the rate table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentField {
    Rate(i64),
    Target(f64),
    Hold(u64),
}

#[derive(Debug, Default)]
pub struct Session {
    state: KilnState,
    state_last: Option<KilnState>,
    active: Option<Profile>,
    selected_name: Option<String>,
    live_trace: Vec<TraceSample>,
    catalog: Vec<Profile>,
    telemetry: Option<TelemetryMessage>,
    progress: Option<RunProgress>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &KilnState {
        &self.state
    }

    pub fn state_last(&self) -> Option<&KilnState> {
        self.state_last.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.state == KilnState::Edit
    }

    /// The selected profile, or the draft while editing.
    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.as_ref()
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected_name.as_deref()
    }

    pub fn live_trace(&self) -> &[TraceSample] {
        &self.live_trace
    }

    pub fn catalog(&self) -> &[Profile] {
        &self.catalog
    }

    pub fn last_telemetry(&self) -> Option<&TelemetryMessage> {
        self.telemetry.as_ref()
    }

    pub fn progress(&self) -> Option<&RunProgress> {
        self.progress.as_ref()
    }

    fn catalog_entry(&self, name: &str) -> Option<&Profile> {
        self.catalog.iter().find(|profile| profile.name == name)
    }

    /// Selects a catalog profile by name. Outside a draft the active profile
    /// follows the selection.
    pub fn select(&mut self, name: &str) -> Result<(), SessionError> {
        let profile = self
            .catalog_entry(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownProfile(name.to_string()))?;
        self.selected_name = Some(name.to_string());
        if !self.is_editing() {
            self.active = Some(profile);
        }
        Ok(())
    }

    /// Records the profile the controller says is loaded. The name is kept
    /// even when the catalog has not arrived yet so the next refresh picks it.
    pub fn remember_selection(&mut self, name: &str) {
        if self.select(name).is_err() {
            debug!(profile = name, "selected profile not in catalog yet");
            self.selected_name = Some(name.to_string());
        }
    }

    /// Replaces the catalog wholesale, sorted by name.
    ///
    /// A selection missing from the new catalog falls back to the first entry.
    pub fn replace_catalog(&mut self, mut profiles: Vec<Profile>) {
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        self.catalog = profiles;

        let keeps_selection = self
            .selected_name
            .as_deref()
            .is_some_and(|name| self.catalog_entry(name).is_some());
        if !keeps_selection {
            self.selected_name = self.catalog.first().map(|profile| profile.name.clone());
        }

        if !self.is_editing() {
            self.active = self
                .selected_name
                .as_deref()
                .and_then(|name| self.catalog_entry(name))
                .cloned();
        }
    }

    /// Applies a state reported by the controller.
    pub fn apply_external_state(&mut self, reported: KilnState) -> StateUpdate {
        if self.is_editing() {
            return StateUpdate::SuppressedWhileEditing;
        }

        self.state = reported.clone();
        let previous = self.state_last.replace(reported.clone());
        if previous.as_ref() == Some(&reported) {
            return StateUpdate::Unchanged;
        }

        let run_completed =
            previous == Some(KilnState::Running) && !reported.is_firing();
        if run_completed {
            info!(state = %reported, "run completed");
            self.progress = None;
        }
        StateUpdate::Changed {
            from: previous,
            to: reported,
            run_completed,
        }
    }

    pub fn record_telemetry(&mut self, tick: TelemetryMessage) {
        self.progress = (self.state == KilnState::Running).then_some(RunProgress {
            runtime: tick.runtime,
            totaltime: tick.totaltime,
            target: tick.target,
        });
        self.telemetry = Some(tick);
    }

    pub fn reset_trace(&mut self) {
        self.live_trace.clear();
    }

    pub fn append_trace(&mut self, sample: TraceSample) {
        self.live_trace.push(sample);
    }

    fn ensure_not_editing(&self, action: &'static str) -> Result<(), SessionError> {
        if self.is_editing() {
            return Err(SessionError::InvalidTransition {
                action,
                state: self.state.clone(),
            });
        }
        Ok(())
    }

    fn ensure_idle(&self, action: &'static str) -> Result<(), SessionError> {
        self.ensure_not_editing(action)?;
        if self.state.is_firing() {
            return Err(SessionError::InvalidTransition {
                action,
                state: self.state.clone(),
            });
        }
        Ok(())
    }

    /// `IDLE -> EDIT` with an empty draft.
    pub fn begin_new(&mut self, unit: TempUnit) -> Result<(), SessionError> {
        self.ensure_idle("start a new profile")?;
        self.active = Some(Profile::new(String::new(), unit));
        self.state = KilnState::Edit;
        Ok(())
    }

    /// `IDLE -> EDIT` on a snapshot of the selected profile.
    pub fn begin_edit(&mut self) -> Result<(), SessionError> {
        self.ensure_idle("edit a profile")?;
        let snapshot = self
            .active
            .clone()
            .ok_or(SessionError::NoProfileSelected)?;
        self.active = Some(snapshot);
        self.state = KilnState::Edit;
        Ok(())
    }

    /// `EDIT -> IDLE`, dropping the draft.
    pub fn cancel_edit(&mut self) -> Result<(), SessionError> {
        if !self.is_editing() {
            return Err(SessionError::NotEditing);
        }
        self.leave_edit();
        Ok(())
    }

    fn leave_edit(&mut self) {
        self.state = KilnState::Idle;
        self.active = self
            .selected_name
            .as_deref()
            .and_then(|name| self.catalog_entry(name))
            .cloned();
    }

    /// `EDIT -> IDLE` keeping the draft as `name`.
    ///
    /// Checkpoints must strictly increase in time; on failure the draft stays
    /// open. The returned profile carries the derived segment cache and is
    /// what should be written to storage.
    pub fn finish_edit(&mut self, name: &str, unit: TempUnit) -> Result<Profile, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        let draft = self.draft()?;
        schedule::validate_checkpoints(&draft.data)?;

        let mut saved = Profile::new(name, unit).with_data(draft.data.clone());
        saved.rate = Some(schedule::profile_to_schedule(&saved.data));

        self.state = KilnState::Idle;
        self.selected_name = Some(saved.name.clone());
        self.active = Some(saved.clone());
        Ok(saved)
    }

    fn draft(&self) -> Result<&Profile, SessionError> {
        match (&self.state, &self.active) {
            (KilnState::Edit, Some(draft)) => Ok(draft),
            _ => Err(SessionError::NotEditing),
        }
    }

    fn draft_mut(&mut self) -> Result<&mut Profile, SessionError> {
        match (&self.state, &mut self.active) {
            (KilnState::Edit, Some(draft)) => Ok(draft),
            _ => Err(SessionError::NotEditing),
        }
    }

    /// Appends a checkpoint shortly after the last one at the same
    /// temperature, or the seed point for an empty draft.
    pub fn push_checkpoint(&mut self, seeds: &SeedTemperatures) -> Result<(), SessionError> {
        let draft = self.draft_mut()?;
        let point = match draft.data.last() {
            Some(last) => Checkpoint::new(last.time_offset + NEW_POINT_SPACING_SECS, last.temperature),
            None => Checkpoint::new(0, seeds.for_unit(draft.temp_units)),
        };
        draft.data.push(point);
        Ok(())
    }

    pub fn pop_checkpoint(&mut self) -> Result<Option<Checkpoint>, SessionError> {
        Ok(self.draft_mut()?.data.pop())
    }

    pub fn set_checkpoint(&mut self, index: usize, point: Checkpoint) -> Result<(), SessionError> {
        let draft = self.draft_mut()?;
        let len = draft.data.len();
        let slot = draft
            .data
            .get_mut(index)
            .ok_or(SessionError::CheckpointOutOfRange { index, len })?;
        *slot = point;
        Ok(())
    }

    /// Edits one segment of the draft's schedule form and regenerates the
    /// checkpoints from the edited schedule, starting at the seed temperature
    /// for the draft's unit.
    pub fn set_segment(
        &mut self,
        index: usize,
        field: SegmentField,
        seeds: &SeedTemperatures,
    ) -> Result<(), SessionError> {
        let draft = self.draft_mut()?;
        let mut segments = schedule::profile_to_schedule(&draft.data);
        let len = segments.len();
        let segment = segments
            .get_mut(index)
            .ok_or(SessionError::SegmentOutOfRange { index, len })?;
        match field {
            SegmentField::Rate(rate) => segment.rate = rate,
            SegmentField::Target(target) => segment.target_temperature = target,
            SegmentField::Hold(hold) => segment.hold = hold,
        }

        let start = seeds.for_unit(draft.temp_units);
        draft.data = schedule::schedule_to_profile(&segments, start)?;
        Ok(())
    }

    /// Schedule form of the active profile, preferring a stored cache.
    pub fn active_schedule(&self) -> Option<Vec<Segment>> {
        let profile = self.active.as_ref()?;
        if !self.is_editing() {
            if let Some(cached) = &profile.rate {
                return Some(cached.clone());
            }
        }
        Some(schedule::profile_to_schedule(&profile.data))
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
