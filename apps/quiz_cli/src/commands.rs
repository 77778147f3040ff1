//! Line commands typed into the quiz terminal.

use std::time::Duration;

use shared::domain::FieldId;
use thiserror::Error;

use crate::config::parse_flag;

pub const HELP: &str = "\
commands:
  type <field> <text...>   replace the answer text of a field
  clear <field>            empty the answer of a field
  offline | online         simulate losing or regaining connectivity
  latency on|off           toggle simulated save latency
  wait <ms>                pause before reading the next command
  status                   print every field's current state
  help                     show this message
  quit                     unbind all fields and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand {
    Type { field_id: FieldId, text: String },
    Clear { field_id: FieldId },
    Offline,
    Online,
    Latency(bool),
    Wait(Duration),
    Status,
    Help,
    Quit,
}

impl QuizCommand {
    pub fn name(&self) -> &'static str {
        match self {
            QuizCommand::Type { .. } => "type",
            QuizCommand::Clear { .. } => "clear",
            QuizCommand::Offline => "offline",
            QuizCommand::Online => "online",
            QuizCommand::Latency(_) => "latency",
            QuizCommand::Wait(_) => "wait",
            QuizCommand::Status => "status",
            QuizCommand::Help => "help",
            QuizCommand::Quit => "quit",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("'{command}' cannot use '{value}'")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

pub fn parse_command(line: &str) -> Result<QuizCommand, CommandParseError> {
    let line = line.trim_start();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line.trim_end(), ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Err(CommandParseError::Empty),
        "type" => {
            let (field, text) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandParseError::MissingArgument {
                    command: "type",
                    argument: "a field and some text",
                })?;
            Ok(QuizCommand::Type {
                field_id: FieldId::from(field),
                text: text.trim_start().to_string(),
            })
        }
        "clear" => match rest.trim() {
            "" => Err(CommandParseError::MissingArgument {
                command: "clear",
                argument: "a field",
            }),
            field => Ok(QuizCommand::Clear {
                field_id: FieldId::from(field),
            }),
        },
        "offline" => Ok(QuizCommand::Offline),
        "online" => Ok(QuizCommand::Online),
        "latency" => match rest.trim() {
            "" => Err(CommandParseError::MissingArgument {
                command: "latency",
                argument: "on or off",
            }),
            value => parse_flag(value)
                .map(QuizCommand::Latency)
                .ok_or_else(|| CommandParseError::InvalidArgument {
                    command: "latency",
                    value: value.to_string(),
                }),
        },
        "wait" => rest
            .trim()
            .parse::<u64>()
            .map(|ms| QuizCommand::Wait(Duration::from_millis(ms)))
            .map_err(|_| CommandParseError::InvalidArgument {
                command: "wait",
                value: rest.trim().to_string(),
            }),
        "status" => Ok(QuizCommand::Status),
        "help" | "?" => Ok(QuizCommand::Help),
        "quit" | "exit" => Ok(QuizCommand::Quit),
        other => Err(CommandParseError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
