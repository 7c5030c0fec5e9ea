use std::path::Path;

use chrono::Duration;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    core::{
        Result,
        ZhquizError,
    },
    lexicon::query::DEFAULT_LIMIT,
    persistence,
};

pub const SETTINGS_FILE: &str = "settings.json";

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Upper bound for any interval or delay; keeps `now + interval` inside `DateTime`.
pub const MAX_INTERVAL_SECS: u64 = 100 * 365 * DAY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub remote_url: String,
    pub remote_timeout_secs: u64,
    pub default_limit: usize,
    pub snapshot_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            remote_url: "http://localhost:8080/api/lexicon".to_string(),
            remote_timeout_secs: 30,
            default_limit: DEFAULT_LIMIT,
            snapshot_dir: "cache".to_string(),
        }
    }
}

/// Review scheduling policy. Intervals are indexed by srs level, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrsConfig {
    pub intervals_secs: Vec<u64>,
    pub repeat_delay_secs: u64,
    pub leech_threshold: u32,
    pub graduate_level: u32,
}

impl Default for SrsConfig {
    fn default() -> Self {
        Self {
            intervals_secs: vec![
                4 * HOUR,
                8 * HOUR,
                DAY,
                3 * DAY,
                WEEK,
                2 * WEEK,
                4 * WEEK,
                16 * WEEK,
            ],
            repeat_delay_secs: 10 * 60,
            leech_threshold: 3,
            graduate_level: 3,
        }
    }
}

impl SrsConfig {
    pub fn with_intervals(intervals: &[Duration], repeat_delay: Duration) -> Self {
        Self {
            intervals_secs: intervals.iter().map(|d| d.num_seconds().max(0) as u64).collect(),
            repeat_delay_secs: repeat_delay.num_seconds().max(0) as u64,
            ..Default::default()
        }
    }

    /// Highest reachable srs level.
    pub fn max_level(&self) -> u32 {
        self.intervals_secs.len().saturating_sub(1) as u32
    }

    pub fn interval(&self, level: u32) -> Duration {
        let index = (level as usize).min(self.intervals_secs.len().saturating_sub(1));
        let secs = self.intervals_secs.get(index).copied().unwrap_or(self.repeat_delay_secs);
        bounded_seconds(secs)
    }

    pub fn repeat_delay(&self) -> Duration {
        bounded_seconds(self.repeat_delay_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.intervals_secs.is_empty() {
            return Err(ZhquizError::InvalidConfig("srs interval table is empty".to_string()));
        }
        if self.intervals_secs.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ZhquizError::InvalidConfig(
                "srs intervals must be strictly increasing".to_string(),
            ));
        }
        if self.intervals_secs.iter().any(|secs| *secs > MAX_INTERVAL_SECS) {
            return Err(ZhquizError::InvalidConfig(format!(
                "srs interval exceeds {} seconds",
                MAX_INTERVAL_SECS
            )));
        }
        // Non-empty was checked above, so the first interval is the shortest.
        if self.repeat_delay_secs >= self.intervals_secs[0] {
            return Err(ZhquizError::InvalidConfig(
                "srs repeat delay must be shorter than the first interval".to_string(),
            ));
        }
        Ok(())
    }
}

fn bounded_seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_INTERVAL_SECS) as i64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheConfig,
    pub srs: SrsConfig,
}

impl Settings {
    /// Loads from the app data directory, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let settings: Settings = persistence::load_json(SETTINGS_FILE)?;
        settings.srs.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`], but a broken file is logged and replaced by defaults.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load {}: {}. Using defaults.", SETTINGS_FILE, e);
                Settings::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings: Settings = persistence::load_json_from(path)?;
        settings.srs.validate()?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.srs.validate()?;
        persistence::save_json(self, SETTINGS_FILE)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.srs.validate()?;
        persistence::save_json_to(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("zhquiz-settings-{}", uuid::Uuid::new_v4())).join(name)
    }

    #[test]
    fn test_default_srs_table_is_valid() {
        let config = SrsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_level(), 7);
        assert_eq!(config.interval(0), Duration::hours(4));
        assert_eq!(config.interval(99), Duration::weeks(16));
        assert_eq!(config.repeat_delay(), Duration::minutes(10));
    }

    #[test]
    fn test_rejects_bad_tables() {
        let empty = SrsConfig { intervals_secs: Vec::new(), ..Default::default() };
        assert!(matches!(empty.validate(), Err(ZhquizError::InvalidConfig(_))));

        let unordered = SrsConfig { intervals_secs: vec![60, 60, 120], ..Default::default() };
        assert!(unordered.validate().is_err());

        let huge_interval = SrsConfig {
            intervals_secs: vec![3600, 1_000_000_000_000_000],
            ..Default::default()
        };
        assert!(matches!(huge_interval.validate(), Err(ZhquizError::InvalidConfig(_))));

        let at_bound = SrsConfig { intervals_secs: vec![3600, MAX_INTERVAL_SECS], ..Default::default() };
        assert!(at_bound.validate().is_ok());

        let huge_delay =
            SrsConfig { repeat_delay_secs: 10_000_000_000_000_000, ..Default::default() };
        assert!(matches!(huge_delay.validate(), Err(ZhquizError::InvalidConfig(_))));

        let slow_repeat = SrsConfig { intervals_secs: vec![60, 3600], ..Default::default() };
        assert!(slow_repeat.validate().is_err());
    }

    #[test]
    fn test_out_of_range_values_are_clamped_not_wrapped() {
        let config = SrsConfig {
            intervals_secs: vec![u64::MAX],
            repeat_delay_secs: u64::MAX,
            ..Default::default()
        };
        let bound = Duration::seconds(MAX_INTERVAL_SECS as i64);
        assert_eq!(config.interval(0), bound);
        assert_eq!(config.repeat_delay(), bound);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = Settings::load_from(&temp_path("missing.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("settings.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "srs": { "intervals_secs": [900, 3600] } }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.srs.intervals_secs, vec![900, 3600]);
        assert_eq!(settings.srs.leech_threshold, 3);
        assert_eq!(settings.cache, CacheConfig::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("settings.json");
        let mut settings = Settings::default();
        settings.cache.default_limit = 25;
        settings.srs = SrsConfig::with_intervals(
            &[Duration::hours(1), Duration::days(1), Duration::weeks(1)],
            Duration::minutes(5),
        );
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
