//! Command-line interface for the `crossroads` binary.
//!
//! ```text
//! crossroads [--config PATH] [--duration-ms N] [--discipline NAME] [--strict] [--json]
//! crossroads --help | --version
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::config::SimulationConfig;
use crate::lane::LockDiscipline;

/// Usage text printed by `--help`.
pub const USAGE: &str = "\
Usage: crossroads [OPTIONS]

Simulate four lanes sharing a four-quadrant intersection.

Options:
  -c, --config <PATH>        YAML or JSON config file
  -d, --duration-ms <N>      Simulation window in milliseconds (default 3000)
      --discipline <NAME>    ordered | as_requested | unlocked (default ordered)
      --strict               Exit with failure if any collision is detected
      --json                 Print the final report as JSON
  -h, --help                 Print this help
  -V, --version              Print the version";

/// Errors from parsing the command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("unknown argument `{0}`")]
    UnknownArgument(String),

    #[error("`{0}` requires a value")]
    MissingValue(&'static str),

    #[error("invalid value `{value}` for `{flag}`: {reason}")]
    InvalidValue {
        flag: &'static str,
        value: String,
        reason: String,
    },
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Run(RunOptions),
    Help,
    Version,
}

/// Options for a simulation run. Unset fields leave the config untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub duration_ms: Option<u64>,
    pub discipline: Option<LockDiscipline>,
    pub strict: bool,
    pub json: bool,
}

impl RunOptions {
    /// Layer these options over `config`.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(duration_ms) = self.duration_ms {
            config.duration_ms = duration_ms;
        }
        if let Some(discipline) = self.discipline {
            config.discipline = discipline;
        }
        if self.strict {
            config.strict = true;
        }
    }
}

/// Parse arguments (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<CliCommand, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut options = RunOptions::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "-V" | "--version" => return Ok(CliCommand::Version),
            "-c" | "--config" => {
                let path = args.next().ok_or(CliError::MissingValue("--config"))?;
                options.config_path = Some(PathBuf::from(path));
            }
            "-d" | "--duration-ms" => {
                let value = args.next().ok_or(CliError::MissingValue("--duration-ms"))?;
                let parsed = value.parse().map_err(|e: std::num::ParseIntError| {
                    CliError::InvalidValue {
                        flag: "--duration-ms",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
                options.duration_ms = Some(parsed);
            }
            "--discipline" => {
                let value = args.next().ok_or(CliError::MissingValue("--discipline"))?;
                let parsed = value.parse().map_err(|e: crate::errors::ConfigError| {
                    CliError::InvalidValue {
                        flag: "--discipline",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
                options.discipline = Some(parsed);
            }
            "--strict" => options.strict = true,
            "--json" => options.json = true,
            _ => return Err(CliError::UnknownArgument(arg)),
        }
    }

    Ok(CliCommand::Run(options))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_runs_with_defaults() {
        assert_eq!(
            parse_args(Vec::<String>::new()).unwrap(),
            CliCommand::Run(RunOptions::default())
        );
    }

    #[test]
    fn test_full_run_options() {
        let cmd = parse_args([
            "--config",
            "sim.yaml",
            "-d",
            "500",
            "--discipline",
            "unlocked",
            "--strict",
            "--json",
        ])
        .unwrap();

        let CliCommand::Run(options) = cmd else {
            panic!("expected run command");
        };
        assert_eq!(options.config_path, Some(PathBuf::from("sim.yaml")));
        assert_eq!(options.duration_ms, Some(500));
        assert_eq!(options.discipline, Some(LockDiscipline::Unlocked));
        assert!(options.strict);
        assert!(options.json);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(["--json", "-h"]).unwrap(), CliCommand::Help);
        assert_eq!(parse_args(["--version"]).unwrap(), CliCommand::Version);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_args(["--bogus"]).unwrap_err(),
            CliError::UnknownArgument("--bogus".into())
        );
        assert_eq!(
            parse_args(["--config"]).unwrap_err(),
            CliError::MissingValue("--config")
        );
        assert!(matches!(
            parse_args(["--duration-ms", "soon"]).unwrap_err(),
            CliError::InvalidValue { flag: "--duration-ms", .. }
        ));
        assert!(matches!(
            parse_args(["--discipline", "yolo"]).unwrap_err(),
            CliError::InvalidValue { flag: "--discipline", .. }
        ));
    }

    #[test]
    fn test_apply_overrides_config() {
        let options = RunOptions {
            duration_ms: Some(42),
            discipline: Some(LockDiscipline::AsRequested),
            strict: true,
            ..Default::default()
        };
        let mut config = SimulationConfig::default();
        options.apply(&mut config);
        assert_eq!(config.duration_ms, 42);
        assert_eq!(config.discipline, LockDiscipline::AsRequested);
        assert!(config.strict);
        assert_eq!(config.crossing_us, 1000);
    }
}
