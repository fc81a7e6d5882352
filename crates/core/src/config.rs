use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_i64(profile: &str, key: &str, default: i64) -> i64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub alarm: AlarmConfig,
    pub storage: StorageConfig,
    pub clock: ClockWatchConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `REVEILLE_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("REVEILLE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            alarm: AlarmConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            clock: ClockWatchConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  alarm:    snooze={}m, auto_silence={}, fire_buffer={}s",
            self.alarm.snooze_minutes,
            self.alarm
                .timeout_minutes()
                .map(|m| format!("{}m", m))
                .unwrap_or_else(|| "never".to_string()),
            self.alarm.fire_buffer_secs
        );
        tracing::info!("  storage:  data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  clock:    check_interval={}s, jump_threshold={}s",
            self.clock.check_interval_secs,
            self.clock.jump_threshold_secs
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            alarm: AlarmConfig::default(),
            storage: StorageConfig::default(),
            clock: ClockWatchConfig::default(),
        }
    }
}

// ── Alarm behaviour ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Snooze length in minutes.
    pub snooze_minutes: u32,
    /// Minutes a fired alarm rings before it is marked missed. Negative disables.
    pub auto_silence_minutes: i64,
    /// Grace period after the scheduled time during which reconciliation
    /// still fires the alarm instead of marking it missed.
    pub fire_buffer_secs: u32,
}

impl AlarmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            snooze_minutes: profiled_env_u32(p, "ALARM_SNOOZE_MINUTES", 10),
            auto_silence_minutes: profiled_env_i64(p, "ALARM_AUTO_SILENCE_MINUTES", 10),
            fire_buffer_secs: profiled_env_u32(p, "ALARM_FIRE_BUFFER_SECS", 15),
        }
    }

    /// Timeout in minutes, `None` when auto-silence is disabled.
    pub fn timeout_minutes(&self) -> Option<u32> {
        u32::try_from(self.auto_silence_minutes).ok()
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            snooze_minutes: 10,
            auto_silence_minutes: 10,
            fire_buffer_secs: 15,
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }

    /// JSON file holding records and instances.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("alarms.json")
    }

    /// File holding the persisted generation counter.
    pub fn generation_path(&self) -> PathBuf {
        self.data_dir.join("generation")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

// ── Clock discontinuity detection ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockWatchConfig {
    pub check_interval_secs: u64,
    /// Wall-clock drift relative to monotonic time that counts as a time change.
    pub jump_threshold_secs: u64,
}

impl ClockWatchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            check_interval_secs: profiled_env_u64(p, "TIME_CHECK_INTERVAL_SECS", 30),
            jump_threshold_secs: profiled_env_u64(p, "TIME_JUMP_THRESHOLD_SECS", 60),
        }
    }
}

impl Default for ClockWatchConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            jump_threshold_secs: 60,
        }
    }
}
