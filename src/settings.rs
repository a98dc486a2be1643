//! Simulation settings: the raw serde record, validation, and TOML load/save.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SimError};

pub const DEFAULT_TIMER_PERIOD_MS: u64 = 1000;
pub const DEFAULT_MIN_WORKERS: u32 = 10;
pub const DEFAULT_MAX_WORKERS: u32 = 20;
pub const DEFAULT_MIN_TASKS: u32 = 10;
pub const DEFAULT_MAX_TASKS: u32 = 200;
pub const DEFAULT_MIN_PRODUCTIVITY: u32 = 20;
pub const DEFAULT_MAX_PRODUCTIVITY: u32 = 80;
pub const DEFAULT_MIN_COMPLEXITY: u32 = 100;
pub const DEFAULT_MAX_COMPLEXITY: u32 = 1000;

/// Unvalidated settings as stored on disk; missing keys take defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Milliseconds between timer-driven cycles.
    pub timer_period_ms: u64,
    pub min_workers: u32,
    pub max_workers: u32,
    pub min_tasks: u32,
    pub max_tasks: u32,
    pub min_productivity: u32,
    pub max_productivity: u32,
    pub min_complexity: u32,
    pub max_complexity: u32,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            timer_period_ms: DEFAULT_TIMER_PERIOD_MS,
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            min_tasks: DEFAULT_MIN_TASKS,
            max_tasks: DEFAULT_MAX_TASKS,
            min_productivity: DEFAULT_MIN_PRODUCTIVITY,
            max_productivity: DEFAULT_MAX_PRODUCTIVITY,
            min_complexity: DEFAULT_MIN_COMPLEXITY,
            max_complexity: DEFAULT_MAX_COMPLEXITY,
        }
    }
}

/// Inclusive `[min, max]` bound with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    min: u32,
    max: u32,
}

impl Bounds {
    pub fn new(field: &'static str, min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(SimError::InvalidRange {
                field,
                min: u64::from(min),
                max: u64::from(max),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Validated, immutable settings for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    timer_period: Duration,
    workers: Bounds,
    tasks: Bounds,
    productivity: Bounds,
    complexity: Bounds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timer_period: Duration::from_millis(DEFAULT_TIMER_PERIOD_MS),
            workers: Bounds {
                min: DEFAULT_MIN_WORKERS,
                max: DEFAULT_MAX_WORKERS,
            },
            tasks: Bounds {
                min: DEFAULT_MIN_TASKS,
                max: DEFAULT_MAX_TASKS,
            },
            productivity: Bounds {
                min: DEFAULT_MIN_PRODUCTIVITY,
                max: DEFAULT_MAX_PRODUCTIVITY,
            },
            complexity: Bounds {
                min: DEFAULT_MIN_COMPLEXITY,
                max: DEFAULT_MAX_COMPLEXITY,
            },
        }
    }
}

impl Settings {
    /// Validate a raw record. Every range must satisfy `min <= max`,
    /// productivity must be positive and the timer period non-zero.
    pub fn new(config: SettingsConfig) -> Result<Self> {
        if config.timer_period_ms == 0 {
            return Err(SimError::InvalidSetting {
                field: "timer_period_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if config.min_productivity == 0 {
            return Err(SimError::InvalidSetting {
                field: "min_productivity",
                reason: "workers must remove at least 1 unit per cycle".to_string(),
            });
        }
        Ok(Self {
            timer_period: Duration::from_millis(config.timer_period_ms),
            workers: Bounds::new("workers", config.min_workers, config.max_workers)?,
            tasks: Bounds::new("tasks", config.min_tasks, config.max_tasks)?,
            productivity: Bounds::new(
                "productivity",
                config.min_productivity,
                config.max_productivity,
            )?,
            complexity: Bounds::new("complexity", config.min_complexity, config.max_complexity)?,
        })
    }

    pub fn timer_period(&self) -> Duration {
        self.timer_period
    }

    pub fn workers(&self) -> Bounds {
        self.workers
    }

    pub fn tasks(&self) -> Bounds {
        self.tasks
    }

    pub fn productivity(&self) -> Bounds {
        self.productivity
    }

    pub fn complexity(&self) -> Bounds {
        self.complexity
    }

    /// Raw record for serialization or further editing.
    pub fn to_config(&self) -> SettingsConfig {
        SettingsConfig {
            timer_period_ms: self.timer_period.as_millis() as u64,
            min_workers: self.workers.min,
            max_workers: self.workers.max,
            min_tasks: self.tasks.min,
            max_tasks: self.tasks.max,
            min_productivity: self.productivity.min,
            max_productivity: self.productivity.max,
            min_complexity: self.complexity.min,
            max_complexity: self.complexity.max,
        }
    }

    // ── TOML persistence ────────────────────────────────────────────

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SettingsConfig = toml::from_str(content)?;
        Self::new(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load saved settings, or defaults when no file exists yet.
    /// A file that exists but fails validation is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("[CONFIG] no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let settings = Self::from_file(path)?;
        info!("[CONFIG] loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.to_config())?)
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        info!("[CONFIG] saved settings to {}", path.display());
        Ok(())
    }
}

impl TryFrom<SettingsConfig> for Settings {
    type Error = SimError;

    fn try_from(config: SettingsConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_default_config() {
        let settings = Settings::default();
        assert_eq!(settings.to_config(), SettingsConfig::default());
        assert_eq!(Settings::new(SettingsConfig::default()).unwrap(), settings);
    }

    #[test]
    fn inverted_worker_range_is_rejected() {
        let config = SettingsConfig {
            min_workers: 5,
            max_workers: 1,
            ..SettingsConfig::default()
        };
        let err = Settings::new(config).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidRange {
                field: "workers",
                min: 5,
                max: 1
            }
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn every_range_is_checked() {
        let cases = [
            SettingsConfig {
                min_tasks: 9,
                max_tasks: 3,
                ..SettingsConfig::default()
            },
            SettingsConfig {
                min_productivity: 90,
                max_productivity: 10,
                ..SettingsConfig::default()
            },
            SettingsConfig {
                min_complexity: 2,
                max_complexity: 1,
                ..SettingsConfig::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                Settings::new(config),
                Err(SimError::InvalidRange { .. })
            ));
        }
    }

    #[test]
    fn zero_productivity_and_period_are_rejected() {
        let zero_productivity = SettingsConfig {
            min_productivity: 0,
            ..SettingsConfig::default()
        };
        assert!(matches!(
            Settings::new(zero_productivity),
            Err(SimError::InvalidSetting {
                field: "min_productivity",
                ..
            })
        ));
        let zero_period = SettingsConfig {
            timer_period_ms: 0,
            ..SettingsConfig::default()
        };
        assert!(Settings::new(zero_period).is_err());
    }

    #[test]
    fn zero_workers_is_a_valid_range() {
        // Rejected later, at assignment time.
        let config = SettingsConfig {
            min_workers: 0,
            max_workers: 0,
            ..SettingsConfig::default()
        };
        assert_eq!(Settings::new(config).unwrap().workers().max(), 0);
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let toml = r#"
timer_period_ms = 250
min_workers = 2
max_workers = 3
"#;
        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.timer_period(), Duration::from_millis(250));
        assert_eq!(settings.workers(), Bounds::new("workers", 2, 3).unwrap());
        assert_eq!(settings.tasks().max(), DEFAULT_MAX_TASKS);
    }

    #[test]
    fn invalid_toml_range_is_rejected() {
        let toml = "min_complexity = 10\nmax_complexity = 5\n";
        assert!(matches!(
            Settings::from_toml(toml),
            Err(SimError::InvalidRange {
                field: "complexity",
                ..
            })
        ));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let config = SettingsConfig {
            timer_period_ms: 10,
            min_workers: 1,
            max_workers: 4,
            ..SettingsConfig::default()
        };
        let settings = Settings::new(config).unwrap();
        settings.save(&path).unwrap();
        assert_eq!(Settings::from_file(&path).unwrap(), settings);
    }

    #[test]
    fn load_or_default_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
    }

    #[test]
    fn load_or_default_surfaces_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "min_workers = 5\nmax_workers = 1\n").unwrap();
        assert!(Settings::load_or_default(&path).is_err());
    }
}
