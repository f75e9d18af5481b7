//! `-v` count or a level name from `SHIPSMIND_LOG_LEVEL`.

use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    if let Ok(count) = level.parse::<u8>() {
        return if count <= 5 {
            Ok(count)
        } else {
            Err(format!("verbosity must be between 0 and 5, got {count}"))
        };
    }

    LEVEL_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(level))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level: {level}"))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("SHIPSMIND_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
