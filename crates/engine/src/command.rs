//! Line-oriented commands accepted by the worker on stdin.

use std::str::FromStr;

use chrono::Weekday;
use reveille_core::{AlarmId, InstanceId, Weekdays};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("'{command}' needs {what}")]
    MissingArgument { command: String, what: &'static str },

    #[error("invalid {what} '{value}'")]
    Invalid { what: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    Add {
        hour: u32,
        minute: u32,
        days: Weekdays,
        label: String,
    },
    Delete(AlarmId),
    Enable(AlarmId),
    Disable(AlarmId),
    Snooze(InstanceId),
    Dismiss(InstanceId),
    Hide(InstanceId),
    List,
    Help,
}

pub const USAGE: &str = "\
commands:
  add HH:MM [once|daily|mon,tue,...] [label]
  delete <alarm>      enable <alarm>      disable <alarm>
  snooze <instance>   dismiss <instance>  hide <instance>
  list                help";

impl FromStr for WorkerCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandError::Empty)?.to_lowercase();

        match command.as_str() {
            "add" => {
                let time = words.next().ok_or_else(|| CommandError::MissingArgument {
                    command: command.clone(),
                    what: "a time",
                })?;
                let (hour, minute) = parse_time(time)?;
                let days = match words.next() {
                    Some(arg) => parse_days(arg)?,
                    None => Weekdays::NONE,
                };
                let label = words.collect::<Vec<_>>().join(" ");
                Ok(WorkerCommand::Add {
                    hour,
                    minute,
                    days,
                    label,
                })
            }
            "delete" => Ok(WorkerCommand::Delete(AlarmId(next_id(&mut words, &command, "an alarm id")?))),
            "enable" => Ok(WorkerCommand::Enable(AlarmId(next_id(&mut words, &command, "an alarm id")?))),
            "disable" => Ok(WorkerCommand::Disable(AlarmId(next_id(&mut words, &command, "an alarm id")?))),
            "snooze" => Ok(WorkerCommand::Snooze(InstanceId(next_id(&mut words, &command, "an instance id")?))),
            "dismiss" => Ok(WorkerCommand::Dismiss(InstanceId(next_id(&mut words, &command, "an instance id")?))),
            "hide" => Ok(WorkerCommand::Hide(InstanceId(next_id(&mut words, &command, "an instance id")?))),
            "list" | "ls" => Ok(WorkerCommand::List),
            "help" | "?" => Ok(WorkerCommand::Help),
            _ => Err(CommandError::Unknown(command.clone())),
        }
    }
}

fn next_id<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &str,
    what: &'static str,
) -> Result<i64, CommandError> {
    let raw = words.next().ok_or_else(|| CommandError::MissingArgument {
        command: command.to_string(),
        what,
    })?;
    raw.parse().map_err(|_| CommandError::Invalid {
        what,
        value: raw.to_string(),
    })
}

fn parse_time(raw: &str) -> Result<(u32, u32), CommandError> {
    let invalid = || CommandError::Invalid {
        what: "time",
        value: raw.to_string(),
    };
    let (h, m) = raw.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

fn parse_days(raw: &str) -> Result<Weekdays, CommandError> {
    match raw.to_lowercase().as_str() {
        "once" => Ok(Weekdays::NONE),
        "daily" => Ok(Weekdays::ALL),
        list => {
            let mut days = Vec::new();
            for name in list.split(',') {
                let day = Weekday::from_str(name).map_err(|_| CommandError::Invalid {
                    what: "weekday",
                    value: name.to_string(),
                })?;
                days.push(day);
            }
            Ok(Weekdays::from_days(&days))
        }
    }
}
