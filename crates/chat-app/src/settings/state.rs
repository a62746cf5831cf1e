use std::path::{Path, PathBuf};
use std::sync::Arc;

use agix_llm::{
    DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, ProviderConfig, RIG_GEMINI_PROVIDER_ID,
};
use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "agix";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Prefix for environment overrides, e.g. `AGIX_MODEL`.
pub const ENV_PREFIX: &str = "AGIX_";
/// Unprefixed variable the credential is also read from.
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            model: default_model(),
        }
    }
}

impl AppSettings {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self.normalized()
    }

    /// Returns the credential, or `None` when it is blank.
    pub fn api_key(&self) -> Option<&str> {
        let api_key = self.api_key.trim();
        (!api_key.is_empty()).then_some(api_key)
    }

    pub fn is_valid(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn to_provider_config(&self) -> Option<ProviderConfig> {
        let api_key = self.api_key()?;

        Some(ProviderConfig::new(&self.provider_id, api_key, &self.endpoint))
    }

    pub fn normalized(mut self) -> Self {
        self.provider_id = if self.provider_id.trim().is_empty() {
            default_provider_id()
        } else {
            self.provider_id.trim().to_string()
        };
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = if self.endpoint.trim().is_empty() {
            default_endpoint()
        } else {
            self.endpoint.trim().to_string()
        };
        self.model = if self.model.trim().is_empty() {
            default_model()
        } else {
            self.model.trim().to_string()
        };

        self
    }
}

/// Process-scoped settings holder. Reads are lock-free; `update` swaps the
/// whole value so readers never observe a partially written credential.
pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: Option<PathBuf>,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".agix"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::resolve(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path: Some(config_path),
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    /// Store that never touches the filesystem or the environment.
    pub fn in_memory(settings: AppSettings) -> Self {
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings.normalized())),
            config_path: None,
        }
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        if let Some(config_path) = &self.config_path {
            Self::persist(config_path, &normalized_settings)?;
        }
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Json::file(path))
            .merge(Self::env_providers())
    }

    /// Defaults plus environment only, used when the settings file is unusable.
    fn env_figment() -> Figment {
        Figment::from(Serialized::defaults(AppSettings::default())).merge(Self::env_providers())
    }

    fn env_providers() -> Figment {
        Figment::new()
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Env::raw().only(&[API_KEY_ENV]))
    }

    fn resolve(path: &Path) -> AppSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        match Self::figment(path).extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults and environment",
                    path,
                    error
                );
                Self::env_figment()
                    .extract::<AppSettings>()
                    .map(AppSettings::normalized)
                    .unwrap_or_else(|error| {
                        tracing::warn!("failed to read settings from environment: {}", error);
                        AppSettings::default()
                    })
            }
        }
    }

    fn persist(config_path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: config_path.to_path_buf(),
        })?;

        tracing::info!("saved settings to {:?}", config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_provider_id() -> String {
    RIG_GEMINI_PROVIDER_ID.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}
