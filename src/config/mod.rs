//! Simulation configuration.
//!
//! Values come from, lowest precedence first: built-in defaults, an optional
//! YAML or JSON file, `CROSSROADS_*` environment variables, and finally
//! command-line flags (see [`crate::cli`]).
//!
//! # Environment Variables
//!
//! - `CROSSROADS_DURATION_MS`: simulation window (default: 3000)
//! - `CROSSROADS_MAX_IDLE_US`: upper bound of the per-cycle idle (default: 1000)
//! - `CROSSROADS_CROSSING_US`: time spent in the intersection (default: 1000)
//! - `CROSSROADS_JOIN_TIMEOUT_MS`: bound on waiting for lanes after stop (default: 2000)
//! - `CROSSROADS_DISCIPLINE`: `ordered`, `as_requested` or `unlocked` (default: ordered)
//! - `CROSSROADS_STRICT`: `true`/`1` to fail the run on any collision

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::intersection::Topology;
use crate::lane::{LaneTiming, LockDiscipline};

pub const ENV_DURATION_MS: &str = "CROSSROADS_DURATION_MS";
pub const ENV_MAX_IDLE_US: &str = "CROSSROADS_MAX_IDLE_US";
pub const ENV_CROSSING_US: &str = "CROSSROADS_CROSSING_US";
pub const ENV_JOIN_TIMEOUT_MS: &str = "CROSSROADS_JOIN_TIMEOUT_MS";
pub const ENV_DISCIPLINE: &str = "CROSSROADS_DISCIPLINE";
pub const ENV_STRICT: &str = "CROSSROADS_STRICT";

/// Everything a [`Simulation`](crate::simulation::Simulation) needs to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// How long lanes run before the stop signal is raised.
    pub duration_ms: u64,
    /// Exclusive upper bound of the random idle before each request.
    pub max_idle_us: u64,
    /// Time a car spends holding both quadrants.
    pub crossing_us: u64,
    /// How long the controller waits for lanes after raising stop.
    pub join_timeout_ms: u64,
    /// Number of quadrants.
    pub resource_count: usize,
    /// Explicit lane table; `None` means the cyclic default over
    /// `resource_count` quadrants.
    pub lanes: Option<Vec<[usize; 2]>>,
    pub discipline: LockDiscipline,
    /// Treat any detected collision as a failed run.
    pub strict: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 3000,
            max_idle_us: 1000,
            crossing_us: 1000,
            join_timeout_ms: 2000,
            resource_count: 4,
            lanes: None,
            discipline: LockDiscipline::Ordered,
            strict: false,
        }
    }
}

impl SimulationConfig {
    /// Load a config file. The format is picked from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed: Result<Self, String> = match ext.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&contents).map_err(|e| e.to_string())
            }
            Some("json") => serde_json::from_str(&contents).map_err(|e| e.to_string()),
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_DURATION_MS) {
            self.duration_ms = parse_number(ENV_DURATION_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_IDLE_US) {
            self.max_idle_us = parse_number(ENV_MAX_IDLE_US, &v)?;
        }
        if let Some(v) = lookup(ENV_CROSSING_US) {
            self.crossing_us = parse_number(ENV_CROSSING_US, &v)?;
        }
        if let Some(v) = lookup(ENV_JOIN_TIMEOUT_MS) {
            self.join_timeout_ms = parse_number(ENV_JOIN_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_DISCIPLINE) {
            self.discipline = v.parse()?;
        }
        if let Some(v) = lookup(ENV_STRICT) {
            self.strict = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "duration_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.join_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "join_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.resource_count < 2 {
            return Err(ConfigError::InvalidValue {
                field: "resource_count",
                reason: format!("need at least 2 quadrants, got {}", self.resource_count),
            });
        }
        self.topology().map(|_| ())
    }

    /// Build the lane table this config describes.
    pub fn topology(&self) -> Result<Topology, ConfigError> {
        match &self.lanes {
            Some(pairs) => Topology::from_pairs(self.resource_count, pairs),
            None if self.resource_count >= 2 => Ok(Topology::cyclic(self.resource_count)),
            None => Err(ConfigError::InvalidTopology(format!(
                "cannot build a cycle over {} quadrant(s)",
                self.resource_count
            ))),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Per-cycle timing handed to every lane.
    pub fn lane_timing(&self) -> LaneTiming {
        LaneTiming {
            max_idle: Duration::from_micros(self.max_idle_us),
            crossing: Duration::from_micros(self.crossing_us),
        }
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: format!("`{raw}`: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_four_way_intersection() {
        let config = SimulationConfig::default();
        assert_eq!(config.duration(), Duration::from_secs(3));
        assert_eq!(config.lane_timing(), LaneTiming::default());
        assert_eq!(config.topology().unwrap(), Topology::four_way());
        assert_eq!(config.discipline, LockDiscipline::Ordered);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "duration_ms: 250\ncrossing_us: 50\ndiscipline: unlocked\nlanes:\n  - [0, 1]\n  - [1, 0]"
        )
        .unwrap();

        let config = SimulationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.duration_ms, 250);
        assert_eq!(config.crossing_us, 50);
        assert_eq!(config.max_idle_us, 1000);
        assert_eq!(config.discipline, LockDiscipline::Unlocked);
        assert_eq!(config.topology().unwrap().len(), 2);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"duration_ms": 10, "strict": true}}"#).unwrap();

        let config = SimulationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.duration_ms, 10);
        assert!(config.strict);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"duration": 10}}"#).unwrap();

        let err = SimulationConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = SimulationConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SimulationConfig::from_file("/nonexistent/crossroads.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DURATION_MS, "500"),
            (ENV_CROSSING_US, " 20 "),
            (ENV_DISCIPLINE, "as_requested"),
            (ENV_STRICT, "1"),
        ]
        .into_iter()
        .collect();

        let mut config = SimulationConfig::default();
        config
            .apply_env_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.duration_ms, 500);
        assert_eq!(config.crossing_us, 20);
        assert_eq!(config.max_idle_us, 1000);
        assert_eq!(config.discipline, LockDiscipline::AsRequested);
        assert!(config.strict);
    }

    #[test]
    fn test_env_bad_number() {
        let mut config = SimulationConfig::default();
        let err = config
            .apply_env_from(|key| (key == ENV_DURATION_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_DURATION_MS));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SimulationConfig {
            duration_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            resource_count: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            lanes: Some(vec![[0, 7]]),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTopology(_))
        ));
    }
}
