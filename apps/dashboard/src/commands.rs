//! Line commands typed at the console.

use anyhow::{anyhow, bail, Context, Result};
use dashboard_core::{ChannelReconciler, Reaction, RunMode, SessionError, Uplink};

pub const HELP: &str = "\
commands:
  select <name>           choose a stored profile
  run | simulate | stop   control the kiln
  new | edit              open a draft (empty, or a copy of the selection)
  add | remove            append / drop the last checkpoint
  point <n> <time> <temp> set checkpoint n (time in the profile unit)
  rate <n> <value>        set segment n's rate (slope unit)
  target <n> <value>      set segment n's target
  hold <n> <value>        set segment n's hold (profile unit)
  save <name> | cancel    leave the draft
  delete                  delete the selected profile
  confirm | decline       answer an overwrite prompt
  show | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Select(String),
    Run,
    Simulate,
    Stop,
    New,
    Edit,
    AddPoint,
    RemovePoint,
    SetPoint { index: usize, time: f64, temperature: f64 },
    SetRate { index: usize, value: f64 },
    SetTarget { index: usize, value: f64 },
    SetHold { index: usize, value: f64 },
    Save(String),
    Cancel,
    Delete,
    Confirm,
    Decline,
    Show,
    Help,
    Quit,
}

impl UserCommand {
    /// Parses one input line. Row numbers are 1-based as displayed.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));
        let args: Vec<&str> = rest.split_whitespace().collect();

        let keyword = word.to_ascii_lowercase();
        let command = match keyword.as_str() {
            "select" => Self::Select(required_name(rest)?),
            "run" => Self::Run,
            "simulate" | "sim" => Self::Simulate,
            "stop" => Self::Stop,
            "new" => Self::New,
            "edit" => Self::Edit,
            "add" => Self::AddPoint,
            "remove" => Self::RemovePoint,
            "point" => {
                let [index, time, temperature] = exact_args::<3>(&args, "point <n> <time> <temp>")?;
                Self::SetPoint {
                    index: row(index)?,
                    time: number(time)?,
                    temperature: number(temperature)?,
                }
            }
            "rate" | "target" | "hold" => {
                let [index, value] = exact_args::<2>(&args, "<field> <n> <value>")?;
                let (index, value) = (row(index)?, number(value)?);
                match keyword.as_str() {
                    "rate" => Self::SetRate { index, value },
                    "target" => Self::SetTarget { index, value },
                    _ => Self::SetHold { index, value },
                }
            }
            "save" => Self::Save(required_name(rest)?),
            "cancel" => Self::Cancel,
            "delete" => Self::Delete,
            "confirm" | "yes" => Self::Confirm,
            "decline" | "no" => Self::Decline,
            "show" | "" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{other}' (try 'help')"),
        };
        Ok(command)
    }

    /// Runs the command against the reconciler. `Help` and `Quit` are the
    /// caller's business and leave everything untouched.
    pub fn apply<U: Uplink>(
        &self,
        reconciler: &mut ChannelReconciler<U>,
    ) -> Result<Reaction, SessionError> {
        match self {
            Self::Select(name) => reconciler.select_profile(name),
            Self::Run => reconciler.start_run(RunMode::Run),
            Self::Simulate => reconciler.start_run(RunMode::Simulate),
            Self::Stop => Ok(reconciler.stop_run()),
            Self::New => reconciler.start_new(),
            Self::Edit => reconciler.edit_selected(),
            Self::AddPoint => reconciler.add_point(),
            Self::RemovePoint => reconciler.remove_point(),
            Self::SetPoint {
                index,
                time,
                temperature,
            } => reconciler.set_point(*index, *time, *temperature),
            Self::SetRate { index, value } => reconciler.set_segment_rate(*index, *value),
            Self::SetTarget { index, value } => reconciler.set_segment_target(*index, *value),
            Self::SetHold { index, value } => reconciler.set_segment_hold(*index, *value),
            Self::Save(name) => reconciler.save(name),
            Self::Cancel => reconciler.leave_edit(),
            Self::Delete => reconciler.delete_selected(),
            Self::Confirm => reconciler.confirm_overwrite(),
            Self::Decline => reconciler.decline_overwrite(),
            Self::Show => Ok(Reaction {
                changed: true,
                notices: Vec::new(),
            }),
            Self::Help | Self::Quit => Ok(Reaction::default()),
        }
    }
}

fn required_name(rest: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("a profile name is required");
    }
    Ok(rest.to_string())
}

fn exact_args<'a, const N: usize>(args: &[&'a str], usage: &str) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| anyhow!("usage: {usage}"))
}

fn row(raw: &str) -> Result<usize> {
    let number: usize = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a row number"))?;
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("rows are numbered from 1"))
}

fn number(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a number"))?;
    if !value.is_finite() {
        bail!("'{raw}' is not a finite number");
    }
    Ok(value)
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
