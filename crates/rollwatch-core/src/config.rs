//! rollwatch.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::{format_duration, serde_str};
use crate::error::{ConfigError, ConfigResult};

/// Minimum time a restarted process must stay up before it counts.
pub const DEFAULT_STABILIZATION: Duration = Duration::from_secs(10);
/// Delay between two restart polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// How long to keep polling after the mutation completed.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollwatchConfig {
    pub fleet: FleetConfig,
    #[serde(default)]
    pub restart: RestartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Label selector matching the fleet, e.g. `component=kube-scheduler`.
    pub selector: String,
    /// Namespace to query. All namespaces when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// kubectl binary used by the kubectl fleet adapter.
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
    /// kube context passed as `--context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Restart tracking knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Capture a baseline and wait for the fleet to restart around the mutation.
    #[serde(default = "default_wait")]
    pub wait: bool,
    #[serde(default = "default_stabilization", with = "serde_str")]
    pub stabilization: Duration,
    #[serde(default = "default_poll_interval", with = "serde_str")]
    pub poll_interval: Duration,
    #[serde(default = "default_deadline", with = "serde_str")]
    pub deadline: Duration,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            wait: default_wait(),
            stabilization: DEFAULT_STABILIZATION,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl RestartConfig {
    /// Same timings with restart tracking switched off.
    pub fn without_wait(self) -> Self {
        Self {
            wait: false,
            ..self
        }
    }

    /// A deadline shorter than one poll interval is allowed: the wait still
    /// performs a single poll.
    ///
    /// Durations must be whole milliseconds, the finest unit the file format
    /// can hold.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, d) in [
            ("restart.stabilization", self.stabilization),
            ("restart.poll_interval", self.poll_interval),
            ("restart.deadline", self.deadline),
        ] {
            if d.subsec_nanos() % 1_000_000 != 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{d:?} is not a whole number of milliseconds"),
                });
            }
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "restart.poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_wait() -> bool {
    true
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_stabilization() -> Duration {
    DEFAULT_STABILIZATION
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_deadline() -> Duration {
    DEFAULT_DEADLINE
}

impl RollwatchConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: RollwatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fleet.selector.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "fleet.selector",
                reason: "must not be empty".to_string(),
            });
        }
        self.restart.validate()
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        self.restart.validate()?;
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Scaffold a config with reference timings for the given selector.
    pub fn scaffold(selector: &str) -> Self {
        RollwatchConfig {
            fleet: FleetConfig {
                selector: selector.to_string(),
                namespace: None,
                kubectl: default_kubectl(),
                context: None,
            },
            restart: RestartConfig::default(),
        }
    }

    /// One-line summary of the restart timings, for logs.
    pub fn timing_summary(&self) -> String {
        format!(
            "stabilization={} poll_interval={} deadline={}",
            format_duration(self.restart.stabilization),
            format_duration(self.restart.poll_interval),
            format_duration(self.restart.deadline),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = RollwatchConfig::scaffold("component=kube-scheduler");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("component=kube-scheduler"));
        assert!(toml_str.contains("stabilization = \"10s\""));
        assert!(toml_str.contains("deadline = \"2m\""));
        assert!(!toml_str.contains("namespace"));
    }

    #[test]
    fn test_parse_minimal_uses_reference_timings() {
        let toml_str = r#"
[fleet]
selector = "component=kube-scheduler"
"#;
        let config = RollwatchConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.fleet.kubectl, "kubectl");
        assert!(config.restart.wait);
        assert_eq!(config.restart.stabilization, Duration::from_secs(10));
        assert_eq!(config.restart.poll_interval, Duration::from_secs(5));
        assert_eq!(config.restart.deadline, Duration::from_secs(120));
    }

    #[test]
    fn test_parse_overrides() {
        let toml_str = r#"
[fleet]
selector = "app=patcher"
namespace = "kube-system"
context = "kind-e2e"

[restart]
wait = false
stabilization = "500ms"
poll_interval = 1
deadline = "3m"
"#;
        let config = RollwatchConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.fleet.namespace.as_deref(), Some("kube-system"));
        assert_eq!(config.fleet.context.as_deref(), Some("kind-e2e"));
        assert!(!config.restart.wait);
        assert_eq!(config.restart.stabilization, Duration::from_millis(500));
        assert_eq!(config.restart.poll_interval, Duration::from_secs(1));
        assert_eq!(config.restart.deadline, Duration::from_secs(180));
    }

    #[test]
    fn test_bad_duration_is_parse_error() {
        let toml_str = r#"
[fleet]
selector = "app=x"

[restart]
deadline = "forever"
"#;
        let err = RollwatchConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("forever"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let toml_str = r#"
[fleet]
selector = "app=x"

[restart]
poll_interval = "0s"
"#;
        let err = RollwatchConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "restart.poll_interval",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_selector_rejected() {
        let err = RollwatchConfig::from_toml_str("[fleet]\nselector = \"  \"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "fleet.selector",
                ..
            }
        ));
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollwatch.toml");
        let mut config = RollwatchConfig::scaffold("app=patcher");
        config.restart.poll_interval = Duration::from_millis(250);
        config.write_to(&path).unwrap();

        let loaded = RollwatchConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_sub_millisecond_duration_rejected() {
        let mut config = RollwatchConfig::scaffold("app=x");
        config.restart.stabilization = Duration::from_micros(1500);

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "restart.stabilization",
                ..
            }
        ));
        // Writing it out would lose the 500us, so that is refused too.
        assert!(config.to_toml_string().is_err());

        config.restart.stabilization = Duration::from_millis(1500);
        assert!(config.to_toml_string().unwrap().contains("stabilization = \"1500ms\""));
    }

    #[test]
    fn test_missing_file() {
        let err = RollwatchConfig::from_file(Path::new("/nonexistent/rollwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
