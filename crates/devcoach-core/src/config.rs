use crate::error::Result;
use crate::paths;
use crate::queue::DEFAULT_RECOMMENDATIONS;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,
}

fn default_recommendation_count() -> usize {
    DEFAULT_RECOMMENDATIONS
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            recommendation_count: default_recommendation_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// HygieneConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HygieneConfig {
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: u32,
    /// Count draft PRs in "PRs without issues".
    #[serde(default)]
    pub include_draft_prs: bool,
}

fn default_stale_after_hours() -> u32 {
    168
}

impl Default for HygieneConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_after_hours(),
            include_draft_prs: false,
        }
    }
}

// ---------------------------------------------------------------------------
// CoachingThresholds
// ---------------------------------------------------------------------------

/// All four must hold for the high-autonomy coaching mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingThresholds {
    #[serde(default = "default_prs_merged")]
    pub prs_merged_per_week: u32,
    #[serde(default = "default_prs_reviewed")]
    pub prs_reviewed_per_week: u32,
    #[serde(default = "default_annotation_rate")]
    pub annotation_rate: f64,
    /// Exclusive upper bound.
    #[serde(default = "default_max_latency")]
    pub max_review_latency_hours: f64,
}

fn default_prs_merged() -> u32 {
    3
}

fn default_prs_reviewed() -> u32 {
    5
}

fn default_annotation_rate() -> f64 {
    0.8
}

fn default_max_latency() -> f64 {
    24.0
}

impl Default for CoachingThresholds {
    fn default() -> Self {
        Self {
            prs_merged_per_week: default_prs_merged(),
            prs_reviewed_per_week: default_prs_reviewed(),
            annotation_rate: default_annotation_rate(),
            max_review_latency_hours: default_max_latency(),
        }
    }
}

// ---------------------------------------------------------------------------
// TriggerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_peter_idle")]
    pub peter_idle_minutes: u32,
    #[serde(default = "default_ransom_idle")]
    pub ransom_idle_minutes: u32,
    #[serde(default = "default_pomodoro")]
    pub pomodoro_minutes: u32,
}

fn default_peter_idle() -> u32 {
    15
}

fn default_ransom_idle() -> u32 {
    10
}

fn default_pomodoro() -> u32 {
    25
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            peter_idle_minutes: default_peter_idle(),
            ransom_idle_minutes: default_ransom_idle(),
            pomodoro_minutes: default_pomodoro(),
        }
    }
}

impl TriggerConfig {
    pub fn pomodoro(&self) -> Duration {
        Duration::minutes(i64::from(self.pomodoro_minutes))
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub hygiene: HygieneConfig,
    #[serde(default)]
    pub coaching: CoachingThresholds,
    #[serde(default)]
    pub triggers: TriggerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            queue: QueueConfig::default(),
            hygiene: HygieneConfig::default(),
            coaching: CoachingThresholds::default(),
            triggers: TriggerConfig::default(),
        }
    }
}

impl Config {
    /// Load `.devcoach/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.queue.recommendation_count == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "queue.recommendation_count is 0; no items would ever be recommended"
                    .to_string(),
            });
        }

        if self.hygiene.stale_after_hours == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "hygiene.stale_after_hours is 0; every open issue will be reported stale"
                    .to_string(),
            });
        }

        let rate = self.coaching.annotation_rate;
        if !(0.0..=1.0).contains(&rate) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("coaching.annotation_rate must be within 0..=1, got {rate}"),
            });
        }

        if self.coaching.max_review_latency_hours <= 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "coaching.max_review_latency_hours must be positive, got {}",
                    self.coaching.max_review_latency_hours
                ),
            });
        }

        let t = &self.triggers;
        if t.peter_idle_minutes < t.ransom_idle_minutes {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "triggers.peter_idle_minutes ({}) is shorter than ransom_idle_minutes ({}); \
                     peter mode would be nudged sooner than ransom",
                    t.peter_idle_minutes, t.ransom_idle_minutes
                ),
            });
        }

        if t.pomodoro_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "triggers.pomodoro_minutes must be positive".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.queue.recommendation_count, 3);
        assert_eq!(parsed.hygiene.stale_after_hours, 168);
        assert_eq!(parsed.coaching, CoachingThresholds::default());
        assert_eq!(parsed.triggers, TriggerConfig::default());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "triggers:\n  ransom_idle_minutes: 8\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.triggers.ransom_idle_minutes, 8);
        assert_eq!(cfg.triggers.peter_idle_minutes, 15);
        assert_eq!(cfg.coaching.prs_reviewed_per_week, 5);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.triggers.pomodoro_minutes, 25);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.hygiene.include_draft_prs = true;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert!(loaded.hygiene.include_draft_prs);
    }

    #[test]
    fn defaults_validate_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.queue.recommendation_count = 0;
        cfg.coaching.annotation_rate = 1.5;
        cfg.triggers.peter_idle_minutes = 5;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            2
        );
    }
}
