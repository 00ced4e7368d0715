use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_ALTMETRIC_URL: &str = "https://api.altmetric.com";
pub const DEFAULT_MENDELEY_URL: &str = "https://api.mendeley.com";
pub const DEFAULT_OADOI_URL: &str = "https://api.oadoi.org";
pub const DEFAULT_CROSSREF_URL: &str = "https://doi.crossref.org";

/// The attention provider allows 3600 calls an hour.
pub const DEFAULT_ALTMETRIC_PER_SECOND: u32 = 1;
pub const DEFAULT_HARD_STOP_COOLDOWN_SECS: u64 = 15 * 60;

/// Settings for every external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub altmetric_key: Option<String>,
    pub altmetric_url: String,
    pub altmetric_per_second: u32,
    pub hard_stop_cooldown_secs: u64,
    pub mendeley_client_id: Option<String>,
    pub mendeley_client_secret: Option<String>,
    pub mendeley_url: String,
    pub oadoi_url: String,
    pub crossref_url: String,
    /// Sent to the open-access and DOI lookup services that ask callers to
    /// identify themselves.
    pub contact_email: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            altmetric_key: None,
            altmetric_url: DEFAULT_ALTMETRIC_URL.to_string(),
            altmetric_per_second: DEFAULT_ALTMETRIC_PER_SECOND,
            hard_stop_cooldown_secs: DEFAULT_HARD_STOP_COOLDOWN_SECS,
            mendeley_client_id: None,
            mendeley_client_secret: None,
            mendeley_url: DEFAULT_MENDELEY_URL.to_string(),
            oadoi_url: DEFAULT_OADOI_URL.to_string(),
            crossref_url: DEFAULT_CROSSREF_URL.to_string(),
            contact_email: None,
        }
    }
}

/// Where a setting's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the config file.
    ConfigFile,
    /// Hard-coded default value.
    Default,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// One resolved setting, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: &'static str,
    /// Display value; secrets are masked.
    pub value: Option<String>,
    pub source: ConfigSource,
}

/// TOML config file format. Every key is optional.
#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    altmetric_key: Option<String>,
    altmetric_url: Option<String>,
    altmetric_per_second: Option<u32>,
    hard_stop_cooldown_secs: Option<u64>,
    mendeley_client_id: Option<String>,
    mendeley_client_secret: Option<String>,
    mendeley_url: Option<String>,
    oadoi_url: Option<String>,
    crossref_url: Option<String>,
    contact_email: Option<String>,
}

impl ProviderConfig {
    /// Load settings from environment variables, the config file, or defaults.
    ///
    /// Priority: env vars > config file > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources().map(|(config, _)| config)
    }

    /// Like [`ProviderConfig::load`], also reporting where each value came from.
    pub fn load_with_sources() -> Result<(Self, Vec<ConfigEntry>), ConfigError> {
        let path = config_path();
        load_layered(path.as_deref(), &|var| std::env::var(var).ok())
    }

    /// Whether the readership provider has client credentials.
    pub fn has_mendeley_credentials(&self) -> bool {
        self.mendeley_client_id.is_some() && self.mendeley_client_secret.is_some()
    }
}

/// Return the path to the config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pulse").join("config.toml"))
}

/// Resolve every setting from `env`, the file at `path` (if any), and defaults.
pub fn load_layered(
    path: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<(ProviderConfig, Vec<ConfigEntry>), ConfigError> {
    let file = match path {
        Some(path) => read_config_file(path)?,
        None => ConfigFile::default(),
    };
    let defaults = ProviderConfig::default();
    let mut layers = Layers {
        env,
        entries: Vec::new(),
    };

    let config = ProviderConfig {
        altmetric_key: layers.secret("altmetric_key", "ALTMETRIC_KEY", file.altmetric_key),
        altmetric_url: layers.string(
            "altmetric_url",
            "PULSE_ALTMETRIC_URL",
            file.altmetric_url,
            defaults.altmetric_url,
        ),
        altmetric_per_second: layers.number(
            "altmetric_per_second",
            "PULSE_ALTMETRIC_PER_SECOND",
            file.altmetric_per_second,
            defaults.altmetric_per_second,
        )?,
        hard_stop_cooldown_secs: layers.number(
            "hard_stop_cooldown_secs",
            "PULSE_HARD_STOP_COOLDOWN_SECS",
            file.hard_stop_cooldown_secs,
            defaults.hard_stop_cooldown_secs,
        )?,
        mendeley_client_id: layers.optional(
            "mendeley_client_id",
            "MENDELEY_CLIENT_ID",
            file.mendeley_client_id,
        ),
        mendeley_client_secret: layers.secret(
            "mendeley_client_secret",
            "MENDELEY_CLIENT_SECRET",
            file.mendeley_client_secret,
        ),
        mendeley_url: layers.string(
            "mendeley_url",
            "PULSE_MENDELEY_URL",
            file.mendeley_url,
            defaults.mendeley_url,
        ),
        oadoi_url: layers.string("oadoi_url", "PULSE_OADOI_URL", file.oadoi_url, defaults.oadoi_url),
        crossref_url: layers.string(
            "crossref_url",
            "PULSE_CROSSREF_URL",
            file.crossref_url,
            defaults.crossref_url,
        ),
        contact_email: layers.optional("contact_email", "PULSE_CONTACT_EMAIL", file.contact_email),
    };

    if config.altmetric_per_second == 0 {
        return Err(ConfigError::InvalidValue {
            key: "altmetric_per_second",
            message: "must be at least 1".to_string(),
        });
    }

    Ok((config, layers.entries))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

struct Layers<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
    entries: Vec<ConfigEntry>,
}

impl Layers<'_> {
    fn lookup(
        &self,
        env_var: &'static str,
        file_value: Option<String>,
    ) -> (Option<String>, ConfigSource) {
        if let Some(value) = (self.env)(env_var).filter(|v| !v.is_empty()) {
            (Some(value), ConfigSource::EnvVar(env_var))
        } else if let Some(value) = file_value {
            (Some(value), ConfigSource::ConfigFile)
        } else {
            (None, ConfigSource::Missing)
        }
    }

    fn optional(
        &mut self,
        key: &'static str,
        env_var: &'static str,
        file_value: Option<String>,
    ) -> Option<String> {
        let (value, source) = self.lookup(env_var, file_value);
        self.entries.push(ConfigEntry {
            key,
            value: value.clone(),
            source,
        });
        value
    }

    fn secret(
        &mut self,
        key: &'static str,
        env_var: &'static str,
        file_value: Option<String>,
    ) -> Option<String> {
        let (value, source) = self.lookup(env_var, file_value);
        self.entries.push(ConfigEntry {
            key,
            value: value.as_deref().map(mask),
            source,
        });
        value
    }

    fn string(
        &mut self,
        key: &'static str,
        env_var: &'static str,
        file_value: Option<String>,
        default: String,
    ) -> String {
        let (value, source) = match self.lookup(env_var, file_value) {
            (Some(value), source) => (value, source),
            (None, _) => (default, ConfigSource::Default),
        };
        self.entries.push(ConfigEntry {
            key,
            value: Some(value.clone()),
            source,
        });
        value
    }

    fn number<T>(
        &mut self,
        key: &'static str,
        env_var: &'static str,
        file_value: Option<T>,
        default: T,
    ) -> Result<T, ConfigError>
    where
        T: std::str::FromStr + std::fmt::Display + Copy,
        T::Err: std::fmt::Display,
    {
        let (value, source) = if let Some(raw) = (self.env)(env_var).filter(|v| !v.is_empty()) {
            let parsed = raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key,
                message: format!("${env_var}={raw}: {e}"),
            })?;
            (parsed, ConfigSource::EnvVar(env_var))
        } else if let Some(value) = file_value {
            (value, ConfigSource::ConfigFile)
        } else {
            (default, ConfigSource::Default)
        };
        self.entries.push(ConfigEntry {
            key,
            value: Some(value.to_string()),
            source,
        });
        Ok(value)
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}
