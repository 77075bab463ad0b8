//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, DiffArgs, GlobalOverrides, TreeArgs, VersionArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const ENV_PREFIX: &str = "FOLIO";
const DEFAULT_PAGE_TTL_SECS: u64 = 300;
const DEFAULT_VERSION_TTL_SECS: u64 = 3600;
const DEFAULT_MAX_DIFFS: usize = 50;
const DEFAULT_MAX_INPUT_BYTES: u64 = 1024 * 1024;
const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";
const DEFAULT_PACKAGE: &str = "folio";
const DEFAULT_VERSION_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub diffs: DiffSettings,
    pub version: VersionSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub page_ttl_secs: u64,
    pub version_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSettings {
    pub max_diffs: NonZeroUsize,
    pub max_input_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct VersionSettings {
    pub registry_url: Url,
    pub package: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    match &cli.command {
        Command::Diff(args) => raw.apply_diff_overrides(args),
        Command::Version(args) => raw.apply_version_overrides(args),
        Command::Tree(_) => {}
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    diffs: RawDiffSettings,
    version: RawVersionSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }

    fn apply_diff_overrides(&mut self, args: &DiffArgs) {
        if let Some(bytes) = args.max_input_bytes {
            self.diffs.max_input_bytes = Some(bytes);
        }
    }

    fn apply_version_overrides(&mut self, args: &VersionArgs) {
        if let Some(package) = args.package.as_ref() {
            self.version.package = Some(package.clone());
        }
        if let Some(url) = args.registry_url.as_ref() {
            self.version.registry_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            cache: build_cache_settings(raw.cache),
            diffs: build_diff_settings(raw.diffs)?,
            version: build_version_settings(raw.version)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        page_ttl_secs: cache.page_ttl_seconds.unwrap_or(DEFAULT_PAGE_TTL_SECS),
        version_ttl_secs: cache.version_ttl_seconds.unwrap_or(DEFAULT_VERSION_TTL_SECS),
    }
}

fn build_diff_settings(diffs: RawDiffSettings) -> Result<DiffSettings, LoadError> {
    let max_diffs = diffs.max_diffs.unwrap_or(DEFAULT_MAX_DIFFS);
    let max_diffs = NonZeroUsize::new(max_diffs)
        .ok_or_else(|| LoadError::invalid("diffs.max_diffs", "must be greater than zero"))?;

    let max_input_bytes = diffs.max_input_bytes.unwrap_or(DEFAULT_MAX_INPUT_BYTES);
    if max_input_bytes == 0 {
        return Err(LoadError::invalid(
            "diffs.max_input_bytes",
            "must be greater than zero",
        ));
    }
    let max_input_bytes = usize::try_from(max_input_bytes)
        .map_err(|_| LoadError::invalid("diffs.max_input_bytes", "value is too large"))?;

    Ok(DiffSettings {
        max_diffs,
        max_input_bytes,
    })
}

fn build_version_settings(version: RawVersionSettings) -> Result<VersionSettings, LoadError> {
    let registry = version
        .registry_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_REGISTRY_URL);
    let registry_url = Url::parse(registry)
        .map_err(|err| LoadError::invalid("version.registry_url", err.to_string()))?;
    if !matches!(registry_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "version.registry_url",
            format!("unsupported scheme `{}`", registry_url.scheme()),
        ));
    }

    let package = version
        .package
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_PACKAGE.to_string());
    if package.is_empty() {
        return Err(LoadError::invalid("version.package", "must not be empty"));
    }

    let timeout_secs = version
        .timeout_seconds
        .unwrap_or(DEFAULT_VERSION_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "version.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(VersionSettings {
        registry_url,
        package,
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    page_ttl_seconds: Option<u64>,
    version_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDiffSettings {
    max_diffs: Option<usize>,
    max_input_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawVersionSettings {
    registry_url: Option<String>,
    package: Option<String>,
    timeout_seconds: Option<u64>,
}
