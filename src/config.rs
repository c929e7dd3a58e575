use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".PomoStats";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_API_PORT: u16 = 7891;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub intervals: u32,
    pub db_path: PathBuf,
    pub report_dir: PathBuf,
    pub export_dir: PathBuf,
    pub api_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            intervals: 4,
            db_path: root.join("db").join("sessions.db"),
            report_dir: default_documents_dir().join("reports"),
            export_dir: default_documents_dir().join("exports"),
            api_port: DEFAULT_API_PORT,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        [&self.report_dir, &self.export_dir]
            .into_iter()
            .try_for_each(|dir| {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))
            })
    }

    pub fn work_ms(&self) -> i64 {
        i64::from(self.work_minutes.max(1)) * 60_000
    }

    pub fn short_break_ms(&self) -> i64 {
        i64::from(self.short_break_minutes.max(1)) * 60_000
    }

    pub fn long_break_ms(&self) -> i64 {
        i64::from(self.long_break_minutes.max(1)) * 60_000
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "work_minutes" => self.work_minutes = parse_minutes("work_minutes", value)?,
            "short_break_minutes" => {
                self.short_break_minutes = parse_minutes("short_break_minutes", value)?
            }
            "long_break_minutes" => {
                self.long_break_minutes = parse_minutes("long_break_minutes", value)?
            }
            "intervals" => {
                let parsed = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow!("intervals must be a number"))?;
                if parsed == 0 {
                    bail!("intervals must be at least 1");
                }
                self.intervals = parsed;
            }
            "db_path" => self.db_path = expand_home(value.trim()),
            "report_dir" => self.report_dir = expand_home(value.trim()),
            "export_dir" => self.export_dir = expand_home(value.trim()),
            "api_port" => {
                self.api_port = value
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: work_minutes|timer.work, short_break_minutes|timer.short_break, long_break_minutes|timer.long_break, intervals|timer.intervals, db_path|db.path, report_dir|report.dir, export_dir|export.dir, api_port|api.port"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "work_minutes" => Some(self.work_minutes.to_string()),
            "short_break_minutes" => Some(self.short_break_minutes.to_string()),
            "long_break_minutes" => Some(self.long_break_minutes.to_string()),
            "intervals" => Some(self.intervals.to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "report_dir" => Some(self.report_dir.display().to_string()),
            "export_dir" => Some(self.export_dir.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "work_minutes" | "timer.work" => "work_minutes",
        "short_break_minutes" | "timer.short_break" => "short_break_minutes",
        "long_break_minutes" | "timer.long_break" => "long_break_minutes",
        "intervals" | "timer.intervals" => "intervals",
        "db_path" | "db.path" => "db_path",
        "report_dir" | "report.dir" => "report_dir",
        "export_dir" | "export.dir" => "export_dir",
        "api_port" | "api.port" => "api_port",
        _ => key,
    }
}

fn parse_minutes(key: &str, value: &str) -> Result<u32> {
    let parsed = value
        .trim()
        .parse::<u32>()
        .map_err(|_| anyhow!("{key} must be a number of minutes"))?;
    if parsed == 0 {
        bail!("{key} must be at least 1 minute");
    }

    Ok(parsed)
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_documents_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("PomoStats")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
