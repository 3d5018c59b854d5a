#![forbid(unsafe_code)]

//! Command-line argument parsing for the playground.
//!
//! Parses args manually to keep the binary lean. Supports environment
//! variable overrides via the `STATEWIRE_*` prefix; explicit flags win.
//! A malformed override is rejected the same way as a malformed flag.

use std::env;
use std::fmt;
use std::process;

use statewire_core::env::{EnvParseError, lookup_flag, lookup_parsed, process_env};
use statewire_core::logging::{FILTER_ENV_KEYS, LogConfig, LogFormat};

use crate::app::Counter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
statewire playground: observable state with four counters

USAGE:
    statewire-playground [OPTIONS]

OPTIONS:
    --press=LIST         Comma-separated counters to press in order
                         (state, vm, struct, class; default: all four)
    --repeat=N           Run the press list N times (default: 1)
    --log=FILTER         Log filter directives (default: warn)
    --log-format=FMT     Log format: 'pretty' or 'json' (default: pretty)
    --json               Print the final state snapshot as JSON
    --help, -h           Show this help message
    --version, -V        Show version

COUNTERS:
    state   @State                         view-local counter
    vm      @StateObject ViewModel + Type  view model field
    struct  @StateObject VM + Struct       value-type record field
    class   @StateObject VM + Class        embedded child container field

ENVIRONMENT VARIABLES:
    STATEWIRE_PRESS        Override --press
    STATEWIRE_REPEAT       Override --repeat
    STATEWIRE_LOG          Override --log (falls back to RUST_LOG)
    STATEWIRE_LOG_FORMAT   Override --log-format
    STATEWIRE_JSON         Override --json (1/true to enable)";

pub const ENV_PRESS: &str = "STATEWIRE_PRESS";
pub const ENV_REPEAT: &str = "STATEWIRE_REPEAT";
pub const ENV_LOG_FORMAT: &str = "STATEWIRE_LOG_FORMAT";
pub const ENV_JSON: &str = "STATEWIRE_JSON";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// Counters to press, in order.
    pub presses: Vec<Counter>,
    /// How many times to run `presses`.
    pub repeat: u32,
    /// Logging setup.
    pub log: LogConfig,
    /// Dump the final snapshot as JSON.
    pub json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            presses: Counter::ALL.to_vec(),
            repeat: 1,
            log: LogConfig::default(),
            json: false,
        }
    }
}

/// Outcome of parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
}

/// Argument errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    UnknownArgument(String),
    InvalidValue {
        flag: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownArgument(arg) => write!(f, "unknown argument '{arg}'"),
            Self::InvalidValue {
                flag,
                value,
                reason,
            } => write!(f, "invalid value '{value}' for {flag}: {reason}"),
        }
    }
}

impl std::error::Error for CliError {}

fn parse_presses(flag: &'static str, value: &str) -> Result<Vec<Counter>, CliError> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<Counter>().map_err(|reason| CliError::InvalidValue {
                flag,
                value: value.to_string(),
                reason,
            })
        })
        .collect()
}

fn parse_repeat(flag: &'static str, value: &str) -> Result<u32, CliError> {
    value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| CliError::InvalidValue {
            flag,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn from_env_error(e: EnvParseError, flag: &'static str) -> CliError {
    CliError::InvalidValue {
        flag,
        value: e.value,
        reason: e.reason,
    }
}

fn parse_log_format(flag: &'static str, value: &str) -> Result<LogFormat, CliError> {
    value.parse::<LogFormat>().map_err(|reason| CliError::InvalidValue {
        flag,
        value: value.to_string(),
        reason,
    })
}

impl Opts {
    /// Parse the process arguments and environment. Prints help or version
    /// and exits when asked; prints the error and exits with code 2 on bad
    /// input.
    #[must_use]
    pub fn parse() -> Self {
        match Self::parse_from(env::args().skip(1), process_env) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("statewire-playground {VERSION}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("error: {e}");
                eprintln!("Run with --help for usage.");
                process::exit(2);
            }
        }
    }

    /// Parse `args` (without the program name) with `get_env` supplying
    /// environment overrides.
    pub fn parse_from<I, S, F>(args: I, get_env: F) -> Result<Parsed, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self {
            log: LogConfig::from_env_with(&get_env),
            ..Self::default()
        };

        if let Some(value) = get_env(ENV_PRESS) {
            opts.presses = parse_presses(ENV_PRESS, &value)?;
        }
        if let Some(repeat) = lookup_parsed::<u32, _>(&get_env, ENV_REPEAT)
            .map_err(|e| from_env_error(e, ENV_REPEAT))?
        {
            opts.repeat = repeat;
        }
        if let Some(format) = lookup_parsed::<LogFormat, _>(&get_env, ENV_LOG_FORMAT)
            .map_err(|e| from_env_error(e, ENV_LOG_FORMAT))?
        {
            opts.log.format = format;
        }
        if let Some(json) = lookup_flag(&get_env, ENV_JSON) {
            opts.json = json;
        }

        for arg in args {
            let arg = arg.as_ref();
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg, None),
            };
            match (name, value) {
                ("--help" | "-h", None) => return Ok(Parsed::Help),
                ("--version" | "-V", None) => return Ok(Parsed::Version),
                ("--json", None) => opts.json = true,
                ("--press", Some(v)) => opts.presses = parse_presses("--press", v)?,
                ("--repeat", Some(v)) => opts.repeat = parse_repeat("--repeat", v)?,
                ("--log", Some(v)) => opts.log.filter = v.to_string(),
                ("--log-format", Some(v)) => {
                    opts.log.format = parse_log_format("--log-format", v)?;
                }
                _ => return Err(CliError::UnknownArgument(arg.to_string())),
            }
        }

        Ok(Parsed::Run(opts))
    }
}

/// Environment variables the playground reads, for diagnostics.
#[must_use]
pub fn env_keys() -> Vec<&'static str> {
    let mut keys = vec![ENV_PRESS, ENV_REPEAT, ENV_LOG_FORMAT, ENV_JSON];
    keys.extend_from_slice(FILTER_ENV_KEYS);
    keys
}
