//! Configuration loading and root folder resolution
//!
//! Engine settings are layered: compiled defaults, then the optional TOML
//! file's `[engine]` table, then environment variables. Command-line flags
//! are handled by the binary and override everything.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// How an accepted sighting turns into a Present/Late verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Track for a minimum dwell before committing a verdict
    Dwell,
    /// Classify on the first accepted sighting
    Immediate,
}

impl FromStr for ConfirmationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dwell" => Ok(ConfirmationMode::Dwell),
            "immediate" => Ok(ConfirmationMode::Immediate),
            other => Err(Error::Config(format!(
                "confirmation_mode must be 'dwell' or 'immediate', got '{}'",
                other
            ))),
        }
    }
}

/// Which free staff member is picked as an assigned cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSelection {
    First,
    Random,
    LeastRecent,
}

impl FromStr for CoverSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(CoverSelection::First),
            "random" => Ok(CoverSelection::Random),
            "least_recent" | "least-recent" => Ok(CoverSelection::LeastRecent),
            other => Err(Error::Config(format!(
                "cover_selection must be 'first', 'random' or 'least_recent', got '{}'",
                other
            ))),
        }
    }
}

/// Tunables of the reconciliation engine and watchdog
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum signal strength (dBm) for a sighting to be admitted
    pub rssi_threshold: i32,
    /// Minutes after scheduled start still counted as on time
    pub grace_minutes: i64,
    /// Minimum dwell before a tracking session is confirmed
    pub dwell_minutes: i64,
    pub confirmation_mode: ConfirmationMode,
    /// Lead time of the pre-arrival reminder
    pub reminder_lead_minutes: i64,
    /// Delay after slot start before an absence is raised
    pub absence_delay_minutes: i64,
    pub sweep_interval_secs: u64,
    /// A session not seen for this long is reported as "Left"
    pub stale_signal_minutes: i64,
    pub cover_selection: CoverSelection,
    pub cover_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rssi_threshold: -75,
            grace_minutes: 15,
            dwell_minutes: 30,
            confirmation_mode: ConfirmationMode::Dwell,
            reminder_lead_minutes: 5,
            absence_delay_minutes: 15,
            sweep_interval_secs: 60,
            stale_signal_minutes: 5,
            cover_selection: CoverSelection::Random,
            cover_seed: None,
        }
    }
}

/// On-disk TOML layout
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    root_folder: Option<String>,
    #[serde(default)]
    engine: EngineSection,
}

#[derive(Debug, Default, Deserialize)]
struct EngineSection {
    rssi_threshold: Option<i32>,
    grace_minutes: Option<i64>,
    dwell_minutes: Option<i64>,
    confirmation_mode: Option<String>,
    reminder_lead_minutes: Option<i64>,
    absence_delay_minutes: Option<i64>,
    sweep_interval_secs: Option<u64>,
    stale_signal_minutes: Option<i64>,
    cover_selection: Option<String>,
    cover_seed: Option<u64>,
}

impl EngineConfig {
    /// Load defaults, overlay the TOML file (if given), then the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            let text = std::fs::read_to_string(path)?;
            config.apply_toml(&text)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a TOML document's `[engine]` table
    pub fn apply_toml(&mut self, text: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| Error::Config(format!("invalid config file: {}", e)))?;
        let e = file.engine;

        if let Some(v) = e.rssi_threshold {
            self.rssi_threshold = v;
        }
        if let Some(v) = e.grace_minutes {
            self.grace_minutes = v;
        }
        if let Some(v) = e.dwell_minutes {
            self.dwell_minutes = v;
        }
        if let Some(v) = e.confirmation_mode {
            self.confirmation_mode = v.parse()?;
        }
        if let Some(v) = e.reminder_lead_minutes {
            self.reminder_lead_minutes = v;
        }
        if let Some(v) = e.absence_delay_minutes {
            self.absence_delay_minutes = v;
        }
        if let Some(v) = e.sweep_interval_secs {
            self.sweep_interval_secs = v;
        }
        if let Some(v) = e.stale_signal_minutes {
            self.stale_signal_minutes = v;
        }
        if let Some(v) = e.cover_selection {
            self.cover_selection = v.parse()?;
        }
        if e.cover_seed.is_some() {
            self.cover_seed = e.cover_seed;
        }
        Ok(())
    }

    /// Overlay environment-style variables looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RSSI_THRESHOLD") {
            self.rssi_threshold = parse_var("RSSI_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("TIME_WINDOW_MINUTES") {
            self.grace_minutes = parse_var("TIME_WINDOW_MINUTES", &v)?;
        }
        if let Some(v) = lookup("DWELL_MINUTES") {
            self.dwell_minutes = parse_var("DWELL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("CONFIRMATION_MODE") {
            self.confirmation_mode = v.parse()?;
        }
        if let Some(v) = lookup("REMINDER_LEAD_MINUTES") {
            self.reminder_lead_minutes = parse_var("REMINDER_LEAD_MINUTES", &v)?;
        }
        if let Some(v) = lookup("ABSENCE_DELAY_MINUTES") {
            self.absence_delay_minutes = parse_var("ABSENCE_DELAY_MINUTES", &v)?;
        }
        if let Some(v) = lookup("SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = parse_var("SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("STALE_SIGNAL_MINUTES") {
            self.stale_signal_minutes = parse_var("STALE_SIGNAL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("COVER_SELECTION") {
            self.cover_selection = v.parse()?;
        }
        if let Some(v) = lookup("COVER_SEED") {
            self.cover_seed = Some(parse_var("COVER_SEED", &v)?);
        }
        Ok(())
    }

    /// Reject combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.grace_minutes < 0 {
            return Err(Error::Config("grace_minutes must not be negative".to_string()));
        }
        if self.dwell_minutes < 0 {
            return Err(Error::Config("dwell_minutes must not be negative".to_string()));
        }
        if self.reminder_lead_minutes < 0 {
            return Err(Error::Config("reminder_lead_minutes must not be negative".to_string()));
        }
        if self.absence_delay_minutes < 0 {
            return Err(Error::Config("absence_delay_minutes must not be negative".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config("sweep_interval_secs must be at least 1".to_string()));
        }
        if self.stale_signal_minutes <= 0 {
            return Err(Error::Config("stale_signal_minutes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, value)))
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file `root_folder`
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(config_path) = config_file {
        if let Ok(text) = std::fs::read_to_string(config_path) {
            match toml::from_str::<ConfigFile>(&text) {
                Ok(ConfigFile {
                    root_folder: Some(root),
                    ..
                }) => return PathBuf::from(root),
                Ok(_) => {}
                Err(e) => debug!("Ignoring unparsable config file {}: {}", config_path.display(), e),
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/spv (or /var/lib/spv for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("spv"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/spv"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("spv"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/spv"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("spv"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\spv"))
    } else {
        PathBuf::from("./spv_data")
    }
}

/// Database file inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("spv.db")
}
