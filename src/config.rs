use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::clock::TimeAuthority;
use crate::limits::*;
use crate::model::{BusinessHours, DayIndex};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, error: std::io::Error },
    Parse(serde_json::Error),
    InvalidDay(DayIndex),
    InvalidHours { day: DayIndex, open_hour: u32, close_hour: u32 },
    InvalidValue { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(f, "cannot read config {}: {error}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
            ConfigError::InvalidDay(d) => {
                write!(f, "business day index {d} out of range (0 = Monday .. 5 = Saturday)")
            }
            ConfigError::InvalidHours { day, open_hour, close_hour } => write!(
                f,
                "business day {day} hours {open_hour}..{close_hour} exceed the 24-hour day"
            ),
            ConfigError::InvalidValue { key, value } => write!(f, "invalid {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

/// Calendar connection, in the site config's `google_calendar_config` shape.
/// Browser-only keys (`clientId`, `scope`, `discoveryDocs`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSettings {
    pub calendar_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// The part of the site configuration the scheduler reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub business_hours: BusinessHours,
    #[serde(default)]
    pub google_calendar_config: Option<CalendarSettings>,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject days past Saturday and hours past 24; degenerate days are only
    /// logged since they simply produce no slots.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((day, _)) = self.business_hours.iter().find(|(d, _)| *d > 5) {
            return Err(ConfigError::InvalidDay(day));
        }
        if let Some((day, h)) = self
            .business_hours
            .iter()
            .find(|(_, h)| h.open_hour > 24 || h.close_hour > 24)
        {
            return Err(ConfigError::InvalidHours {
                day,
                open_hour: h.open_hour,
                close_hour: h.close_hour,
            });
        }
        for day in self.business_hours.degenerate_days() {
            warn!(day, "business day opens at or after closing; it will have no slots");
        }
        if self.business_hours.is_empty() {
            warn!("no business days configured");
        }
        Ok(())
    }
}

/// Everything the binary needs, from the config file plus environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteConfig,
    pub authority: TimeAuthority,
    pub refresh: Duration,
    pub metrics_port: Option<u16>,
    pub week_offset: i32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut site = match lookup("SLOTWISE_CONFIG") {
            Some(path) => SiteConfig::load(Path::new(&path))?,
            None => SiteConfig::default(),
        };

        if let Some(calendar_id) = lookup("SLOTWISE_CALENDAR_ID") {
            let existing = site.google_calendar_config.take();
            site.google_calendar_config = Some(CalendarSettings {
                calendar_id,
                ..existing.unwrap_or(CalendarSettings {
                    calendar_id: String::new(),
                    api_key: None,
                    base_url: None,
                    timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
                })
            });
        }
        if let Some(calendar) = site.google_calendar_config.as_mut() {
            if let Some(key) = lookup("SLOTWISE_API_KEY") {
                calendar.api_key = Some(key);
            }
            if let Some(url) = lookup("SLOTWISE_CALENDAR_URL") {
                calendar.base_url = Some(url);
            }
        }

        let authority = match lookup("SLOTWISE_UTC_OFFSET_MINUTES") {
            Some(raw) => raw
                .parse::<i32>()
                .ok()
                .and_then(TimeAuthority::from_offset_minutes)
                .ok_or(ConfigError::InvalidValue {
                    key: "SLOTWISE_UTC_OFFSET_MINUTES",
                    value: raw,
                })?,
            None => TimeAuthority::Local,
        };

        let refresh_secs: u64 = lookup("SLOTWISE_REFRESH_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_SECS)
            .max(MIN_REFRESH_SECS);
        let metrics_port: Option<u16> = lookup("SLOTWISE_METRICS_PORT").and_then(|s| s.parse().ok());
        let week_offset: i32 = lookup("SLOTWISE_WEEK_OFFSET")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
            .clamp(-MAX_WEEK_OFFSET, MAX_WEEK_OFFSET);

        Ok(Self {
            site,
            authority,
            refresh: Duration::from_secs(refresh_secs),
            metrics_port,
            week_offset,
        })
    }
}
