//! Report runtime configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. JSON settings file (`POWERFLOW_SETTINGS`, default `appsettings.json`, optional)
//! 2. Environment variables (`.env` is loaded by the binary)
//! 3. Command line flags (`--outputPath`, `--interval`, `--timezone`, ...)
//!
//! | Setting               | Env var                  | Flag           | Default         |
//! |-----------------------|--------------------------|----------------|-----------------|
//! | `OutputFolderPath`    | `OUTPUT_FOLDER_PATH`     | `--outputPath` | required        |
//! | `IntervalMinutes`     | `INTERVAL_MINUTES`       | `--interval`   | required        |
//! | `MaxRetries`          | `MAX_RETRIES`            | `--maxRetries` | 0 (single try)  |
//! | `TraderTimezone`      | `TRADER_TIMEZONE`        | `--timezone`   | Europe/London   |
//! | `TradingDateMode`     | `TRADING_DATE_MODE`      | `--mode`       | relative        |
//! | `ReportDate`          | `REPORT_DATE`            | `--reportDate` | fixed mode only |
//! | `TradingDayOffset`    | `TRADING_DAY_OFFSET`     |                | 1 (day after)   |
//! | `RetryDelaySeconds`   | `RETRY_DELAY_SECONDS`    |                | 5               |
//! | `FetchTimeoutSeconds` | `FETCH_TIMEOUT_SECONDS`  |                | none            |
//! | `CsvDelimiter`        | `CSV_DELIMITER`          |                | `;`             |
//! | `TradeProvider`       | `TRADE_PROVIDER`         |                | simulated       |
//! | `TradeProviderUrl`    | `TRADE_PROVIDER_URL`     |                | http mode only  |
//! | `SimulatedFailureRate`| `SIMULATED_FAILURE_RATE` |                | 0.1             |

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_VAR: &str = "POWERFLOW_SETTINGS";
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";
pub const DEFAULT_TIMEZONE: &str = "Europe/London";
/// Largest `TradingDayOffset` accepted in either direction
pub const MAX_TRADING_DAY_OFFSET: i64 = 366;

/// (setting, env var)
const SETTING_KEYS: [(&str, &str); 13] = [
    ("OutputFolderPath", "OUTPUT_FOLDER_PATH"),
    ("IntervalMinutes", "INTERVAL_MINUTES"),
    ("MaxRetries", "MAX_RETRIES"),
    ("TraderTimezone", "TRADER_TIMEZONE"),
    ("TradingDateMode", "TRADING_DATE_MODE"),
    ("ReportDate", "REPORT_DATE"),
    ("TradingDayOffset", "TRADING_DAY_OFFSET"),
    ("RetryDelaySeconds", "RETRY_DELAY_SECONDS"),
    ("FetchTimeoutSeconds", "FETCH_TIMEOUT_SECONDS"),
    ("CsvDelimiter", "CSV_DELIMITER"),
    ("TradeProvider", "TRADE_PROVIDER"),
    ("TradeProviderUrl", "TRADE_PROVIDER_URL"),
    ("SimulatedFailureRate", "SIMULATED_FAILURE_RATE"),
];

/// (flag, setting)
const FLAG_KEYS: [(&str, &str); 6] = [
    ("--outputPath", "OutputFolderPath"),
    ("--interval", "IntervalMinutes"),
    ("--timezone", "TraderTimezone"),
    ("--maxRetries", "MaxRetries"),
    ("--reportDate", "ReportDate"),
    ("--mode", "TradingDateMode"),
];

/// Windows zone names accepted for compatibility with older settings files
const WINDOWS_ZONES: [(&str, &str); 7] = [
    ("GMT Standard Time", "Europe/London"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Pacific Standard Time", "America/Los_Angeles"),
];

#[derive(Debug)]
pub enum ConfigError {
    MissingValue(String),
    InvalidValue(String),
    SettingsFile(String),
    OutputFolder { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingValue(key) => write!(f, "Missing configuration value: {}", key),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::SettingsFile(msg) => write!(f, "Settings file error: {}", msg),
            ConfigError::OutputFolder { path, source } => write!(
                f,
                "Failed to create output folder '{}': {}",
                path.display(),
                source
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Raw string settings keyed by setting name
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = if key == "TraderLocation" { "TraderTimezone" } else { key };
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Merge a flat JSON object. Numbers and booleans are kept as their text.
    pub fn merge_json(&mut self, json: &str) -> Result<(), ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConfigError::SettingsFile(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| ConfigError::SettingsFile("expected a JSON object".to_string()))?;

        for (key, value) in object {
            match value {
                serde_json::Value::String(s) => self.set(key, s.clone()),
                serde_json::Value::Null => {}
                other => self.set(key, other.to_string()),
            }
        }
        Ok(())
    }

    /// Merge a settings file if it exists. Returns whether it was read.
    pub fn merge_file(&mut self, path: &Path) -> Result<bool, ConfigError> {
        if !path.exists() {
            return Ok(false);
        }
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::SettingsFile(format!("{}: {}", path.display(), e)))?;
        self.merge_json(&json)?;
        Ok(true)
    }

    pub fn merge_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, var) in SETTING_KEYS {
            if let Some(value) = lookup(var) {
                self.set(key, value);
            }
        }
    }

    /// Merge `--flag value` / `--flag=value` pairs. `args` excludes the program name.
    pub fn merge_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (arg.as_str(), None),
            };

            let key = FLAG_KEYS
                .iter()
                .find(|(f, _)| *f == flag)
                .map(|(_, key)| *key)
                .ok_or_else(|| ConfigError::InvalidValue(format!("unknown argument '{}'", arg)))?;

            let value = match inline {
                Some(value) => value,
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingValue(format!("value for {}", flag)))?,
            };
            self.set(key, value);
        }

        Ok(())
    }
}

/// How each tick picks the trading day it reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingDateMode {
    /// Run date in the trader timezone plus `n` days (1 = day-ahead)
    RunDayOffset(i64),
    /// Configured report date plus `offset_days`, the same for every tick
    Fixed { report_date: NaiveDate, offset_days: i64 },
}

fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    ChronoDuration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

impl TradingDateMode {
    /// Trading date for a tick running at `now`. `None` if the shift leaves
    /// the representable calendar.
    pub fn resolve(&self, now: DateTime<Utc>, tz: Tz) -> Option<NaiveDate> {
        match self {
            TradingDateMode::RunDayOffset(days) => shift_days(now.with_timezone(&tz).date_naive(), *days),
            TradingDateMode::Fixed { report_date, offset_days } => shift_days(*report_date, *offset_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderKind {
    Simulated { failure_rate: f64 },
    Http { base_url: String },
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_folder: PathBuf,
    pub interval: Duration,
    pub max_retries: u32,
    pub trader_timezone: Tz,
    pub trading_date_mode: TradingDateMode,
    pub retry_delay: Duration,
    pub fetch_timeout: Option<Duration>,
    pub delimiter: u8,
    pub provider: ProviderKind,
}

fn parse_number<T: std::str::FromStr>(settings: &Settings, key: &str) -> Result<Option<T>, ConfigError> {
    match settings.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("{} must be a whole number, got '{}'", key, raw))),
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    let iana = WINDOWS_ZONES
        .iter()
        .find(|(windows, _)| windows.eq_ignore_ascii_case(name))
        .map(|(_, iana)| *iana)
        .unwrap_or(name);

    iana.parse::<Tz>()
        .map_err(|_| ConfigError::InvalidValue(format!("unknown timezone '{}'", name)))
}

fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        _ if raw.len() == 1 && raw.is_ascii() => Ok(raw.as_bytes()[0]),
        _ => Err(ConfigError::InvalidValue(format!(
            "CsvDelimiter must be a single ASCII character, got '{}'",
            raw
        ))),
    }
}

impl ReportConfig {
    /// Load settings file, environment and `args` (program name excluded)
    pub fn load(args: &[String]) -> Result<Self, ConfigError> {
        let mut settings = Settings::new();

        let file = env::var(SETTINGS_FILE_VAR).unwrap_or_else(|_| DEFAULT_SETTINGS_FILE.to_string());
        if settings.merge_file(Path::new(&file))? {
            log::info!("📄 Loaded settings from {}", file);
        }
        settings.merge_env(|var| env::var(var).ok());
        settings.merge_args(args)?;

        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let output_folder = settings
            .get("OutputFolderPath")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingValue("OutputFolderPath".to_string()))?;

        let interval_minutes: u64 = parse_number(settings, "IntervalMinutes")?
            .ok_or_else(|| ConfigError::MissingValue("IntervalMinutes".to_string()))?;
        if interval_minutes < 1 {
            return Err(ConfigError::InvalidValue(
                "IntervalMinutes must be an integer of 1 or higher".to_string(),
            ));
        }
        let interval_secs = interval_minutes.checked_mul(60).ok_or_else(|| {
            ConfigError::InvalidValue(format!("IntervalMinutes {} is too large", interval_minutes))
        })?;

        let offset_days: i64 = parse_number(settings, "TradingDayOffset")?.unwrap_or(1);
        if offset_days.abs() > MAX_TRADING_DAY_OFFSET {
            return Err(ConfigError::InvalidValue(format!(
                "TradingDayOffset must be within ±{} days, got {}",
                MAX_TRADING_DAY_OFFSET, offset_days
            )));
        }

        let max_retries: u32 = parse_number(settings, "MaxRetries")?.unwrap_or(0);

        let trader_timezone = parse_timezone(settings.get("TraderTimezone").unwrap_or(DEFAULT_TIMEZONE))?;

        let trading_date_mode = match settings.get("TradingDateMode").unwrap_or("relative") {
            mode if mode.eq_ignore_ascii_case("relative") => {
                TradingDateMode::RunDayOffset(offset_days)
            }
            mode if mode.eq_ignore_ascii_case("fixed") => {
                let raw = settings
                    .get("ReportDate")
                    .ok_or_else(|| ConfigError::MissingValue("ReportDate (required in fixed mode)".to_string()))?;
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "ReportDate must be in ISO 8601 format (YYYY-MM-DD), got '{}'",
                        raw
                    ))
                })?;
                if shift_days(date, offset_days).is_none() {
                    return Err(ConfigError::InvalidValue(format!(
                        "ReportDate {} shifted by {} days is out of range",
                        date, offset_days
                    )));
                }
                TradingDateMode::Fixed {
                    report_date: date,
                    offset_days,
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "TradingDateMode must be 'relative' or 'fixed', got '{}'",
                    other
                )))
            }
        };

        let retry_delay = Duration::from_secs(parse_number(settings, "RetryDelaySeconds")?.unwrap_or(5));

        let fetch_timeout = parse_number::<u64>(settings, "FetchTimeoutSeconds")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let delimiter = parse_delimiter(settings.get("CsvDelimiter").unwrap_or(";"))?;

        let provider = match settings.get("TradeProvider").unwrap_or("simulated") {
            kind if kind.eq_ignore_ascii_case("simulated") => {
                let failure_rate = match settings.get("SimulatedFailureRate") {
                    None => 0.1,
                    Some(raw) => raw
                        .parse::<f64>()
                        .ok()
                        .filter(|r| (0.0..=1.0).contains(r))
                        .ok_or_else(|| {
                            ConfigError::InvalidValue(format!(
                                "SimulatedFailureRate must be between 0 and 1, got '{}'",
                                raw
                            ))
                        })?,
                };
                ProviderKind::Simulated { failure_rate }
            }
            kind if kind.eq_ignore_ascii_case("http") => {
                let base_url = settings
                    .get("TradeProviderUrl")
                    .ok_or_else(|| ConfigError::MissingValue("TradeProviderUrl".to_string()))?;
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(ConfigError::InvalidValue(
                        "TradeProviderUrl must start with http:// or https://".to_string(),
                    ));
                }
                ProviderKind::Http {
                    base_url: base_url.to_string(),
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "TradeProvider must be 'simulated' or 'http', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            output_folder,
            interval: Duration::from_secs(interval_secs),
            max_retries,
            trader_timezone,
            trading_date_mode,
            retry_delay,
            fetch_timeout,
            delimiter,
            provider,
        })
    }

    /// Create the output folder if it does not exist yet
    pub fn ensure_output_folder(&self) -> Result<(), ConfigError> {
        if self.output_folder.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.output_folder).map_err(|source| ConfigError::OutputFolder {
            path: self.output_folder.clone(),
            source,
        })?;
        log::info!("📁 Created output folder {}", self.output_folder.display());
        Ok(())
    }
}
