use std::path::{Path, PathBuf};
use std::time::Duration;

use empath_affect::{DEFAULT_MODEL_ASSET_ROOT, EmotionLabel, SamplerConfig};
use empath_backend::{BackendConfig, DEFAULT_BACKEND_URL};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "empath";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "EMPATH_";
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1_000;

/// Where emotion frames and scores come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerSource {
    /// No camera or model runtime on this host; the sampler reports the failure.
    #[default]
    Unavailable,
    /// Synthetic frames classified as `fixed_emotion`.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_model_asset_root")]
    pub model_asset_root: String,
    #[serde(default)]
    pub source: SamplerSource,
    #[serde(default)]
    pub fixed_emotion: Option<EmotionLabel>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            model_asset_root: default_model_asset_root(),
            source: SamplerSource::default(),
            fixed_emotion: None,
        }
    }
}

impl SamplerSettings {
    pub fn normalized(mut self) -> Self {
        if self.interval_ms == 0 {
            self.interval_ms = default_interval_ms();
        }
        self.model_asset_root = self.model_asset_root.trim().to_string();
        if self.model_asset_root.is_empty() {
            self.model_asset_root = default_model_asset_root();
        }
        self
    }

    pub fn to_sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(self.interval_ms),
            model_asset_root: self.model_asset_root.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub sampler: SamplerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            sampler: SamplerSettings::default(),
        }
    }
}

impl Settings {
    pub fn normalized(mut self) -> Self {
        self.backend_url = self.backend_url.trim().trim_end_matches('/').to_string();
        if self.backend_url.is_empty() {
            self.backend_url = default_backend_url();
        }
        self.sampler = self.sampler.normalized();
        self
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        BackendConfig::new(&self.backend_url)
    }
}

pub struct SettingsStore {
    settings: Settings,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".empath"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Loads from `config_path`, falling back to defaults when extraction fails.
    pub fn new(config_path: PathBuf) -> Self {
        let settings = match Self::extract(&config_path) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("{error}. using defaults");
                Settings::default()
            }
        };

        Self {
            settings,
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Layers defaults, the JSON file (if present), then `EMPATH_*` variables.
    pub fn extract(path: &Path) -> Result<Settings, SettingsError> {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults and environment", path);
        }

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Settings>()
            .map(Settings::normalized)
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        source: figment::Error,
    },
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

fn default_model_asset_root() -> String {
    DEFAULT_MODEL_ASSET_ROOT.to_string()
}
