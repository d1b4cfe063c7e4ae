//! Console command parsing and replies.
//!
//! Lines are split on whitespace; the first word selects the command. Commands
//! are executed by [`App::execute`](crate::app::App::execute).

use core::fmt;

use embassy_time::Duration;
use heapless::String;
use thiserror_no_std::Error;

use crate::config::CONSOLE_MAX_LINE;
use crate::env::{EnvError, EnvValue, Environment};
use crate::render_guard::GuardError;

/// Command names as typed, for help output and error messages
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "List commands"),
    ("set_timezone <tz>", "Set and persist the POSIX timezone (alias: tz)"),
    ("set_ntp_server <server>", "Set and persist the NTP server (alias: ntp)"),
    ("backlight [on|off|toggle]", "Show or change the display backlight"),
    ("env", "Print the stored environment"),
    ("uptime", "Time since start"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklightAction {
    Query,
    On,
    Off,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    SetTimezone(EnvValue),
    SetNtpServer(EnvValue),
    Backlight(BacklightAction),
    Env,
    Uptime,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command '{0}', try 'help'")]
    UnknownCommand(String<32>),
    #[error("Missing argument {0}")]
    MissingArgument(&'static str),
    #[error("Invalid argument for {0}")]
    InvalidArgument(&'static str),
    #[error("Too many arguments")]
    TooManyArguments,
    #[error("Line longer than {0} bytes")]
    LineTooLong(usize),
    #[error("Environment: {0}")]
    Env(EnvError),
    #[error("Display busy: {0}")]
    Display(GuardError),
}

impl From<EnvError> for ConsoleError {
    fn from(e: EnvError) -> Self {
        Self::Env(e)
    }
}

impl From<GuardError> for ConsoleError {
    fn from(e: GuardError) -> Self {
        Self::Display(e)
    }
}

/// Truncate to at most `N` bytes on a char boundary.
fn truncated<const N: usize>(word: &str) -> String<N> {
    let mut out = String::new();
    for c in word.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Command {
    /// Parse one console line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        if line.len() > CONSOLE_MAX_LINE {
            return Err(ConsoleError::LineTooLong(CONSOLE_MAX_LINE));
        }

        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        let command = match name {
            "help" => Self::Help,
            "set_timezone" | "tz" => Self::SetTimezone(value(words.next(), "<tz>")?),
            "set_ntp_server" | "ntp" => Self::SetNtpServer(value(words.next(), "<server>")?),
            "backlight" => Self::Backlight(match words.next() {
                None => BacklightAction::Query,
                Some("on") => BacklightAction::On,
                Some("off") => BacklightAction::Off,
                Some("toggle") => BacklightAction::Toggle,
                Some(_) => return Err(ConsoleError::InvalidArgument("backlight")),
            }),
            "env" => Self::Env,
            "uptime" => Self::Uptime,
            other => return Err(ConsoleError::UnknownCommand(truncated(other))),
        };

        if words.next().is_some() {
            return Err(ConsoleError::TooManyArguments);
        }
        Ok(Some(command))
    }
}

fn value(word: Option<&str>, name: &'static str) -> Result<EnvValue, ConsoleError> {
    let word = word.ok_or(ConsoleError::MissingArgument(name))?;
    EnvValue::try_from(word).map_err(|_| ConsoleError::InvalidArgument(name))
}

/// Result of a successfully executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Help,
    Done,
    Backlight(bool),
    Environment(Environment),
    Uptime(Duration),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => {
                for (usage, help) in COMMANDS {
                    writeln!(f, "  {:<26} {}", usage, help)?;
                }
                Ok(())
            }
            Self::Done => writeln!(f, "OK"),
            Self::Backlight(on) => writeln!(f, "backlight {}", if *on { "on" } else { "off" }),
            Self::Environment(env) => {
                writeln!(
                    f,
                    "  timezone: {}",
                    env.timezone.as_deref().unwrap_or("(default)")
                )?;
                writeln!(f, "       ntp: {}", env.ntp_server)
            }
            Self::Uptime(uptime) => {
                let secs = uptime.as_secs();
                writeln!(
                    f,
                    "up {}:{:02}:{:02}.{:03}",
                    secs / 3600,
                    secs / 60 % 60,
                    secs % 60,
                    uptime.as_millis() % 1000
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Command>, ConsoleError> {
        Command::parse(line)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("help"), Ok(Some(Command::Help)));
        assert_eq!(parse("  env  "), Ok(Some(Command::Env)));
        assert_eq!(parse("uptime"), Ok(Some(Command::Uptime)));
        assert_eq!(
            parse("tz CET-1CEST"),
            Ok(Some(Command::SetTimezone(EnvValue::try_from("CET-1CEST").unwrap())))
        );
        assert_eq!(
            parse("set_ntp_server time.example.org"),
            Ok(Some(Command::SetNtpServer(
                EnvValue::try_from("time.example.org").unwrap()
            )))
        );
    }

    #[test]
    fn test_parse_backlight_actions() {
        let cases = [
            ("backlight", BacklightAction::Query),
            ("backlight on", BacklightAction::On),
            ("backlight off", BacklightAction::Off),
            ("backlight toggle", BacklightAction::Toggle),
        ];
        for (line, action) in cases {
            assert_eq!(parse(line), Ok(Some(Command::Backlight(action))), "{line}");
        }
        assert_eq!(
            parse("backlight dim"),
            Err(ConsoleError::InvalidArgument("backlight"))
        );
    }

    #[test]
    fn test_blank_line_is_not_a_command() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse(" \t "), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse("reboot"),
            Err(ConsoleError::UnknownCommand(String::try_from("reboot").unwrap()))
        );
        assert_eq!(parse("tz"), Err(ConsoleError::MissingArgument("<tz>")));
        assert_eq!(parse("env now"), Err(ConsoleError::TooManyArguments));

        let long_value = "z".repeat(100);
        assert_eq!(
            parse(&std::format!("ntp {long_value}")),
            Err(ConsoleError::InvalidArgument("<server>"))
        );
        assert_eq!(
            parse(&"a".repeat(CONSOLE_MAX_LINE + 1)),
            Err(ConsoleError::LineTooLong(CONSOLE_MAX_LINE))
        );
    }

    #[test]
    fn test_unknown_command_name_is_truncated() {
        let name = "q".repeat(40);
        match parse(&name) {
            Err(ConsoleError::UnknownCommand(shown)) => assert_eq!(shown.len(), 32),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_reply_formatting() {
        assert_eq!(std::format!("{}", Reply::Backlight(false)), "backlight off\n");
        assert_eq!(
            std::format!("{}", Reply::Uptime(Duration::from_millis(3_723_045))),
            "up 1:02:03.045\n"
        );

        let text = std::format!("{}", Reply::Environment(Environment::default()));
        assert!(text.contains("timezone: (default)"));
        assert!(text.contains("ntp: pool.ntp.org"));
    }
}
