//! Client-side core of the kiln dashboard: schedule conversion, cone
//! classification, the firing session and the channel reconciler.

pub mod cone;
pub mod display;
pub mod reconciler;
pub mod schedule;
pub mod session;
pub mod settings;

pub use cone::classify;
pub use reconciler::{ChannelReconciler, Notice, Reaction, RunMode, Uplink, WritePhase};
pub use schedule::{profile_to_schedule, schedule_to_profile, ScheduleError};
pub use session::{Session, SessionError, StateUpdate};
pub use settings::{DisplaySettings, ReconcilerOptions, SeedTemperatures};
