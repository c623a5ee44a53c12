use fetch::{ArrayEncoding, Dependency, DependencyPolicy, FetcherOptions, Resolution};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fs, io};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG: &str = "storefront.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Relative request paths are resolved against it.
    pub base_url: String,
    pub timeout_ms: Option<u64>,
    pub headers: IndexMap<String, String>,
    pub page_size: u32,
    pub dependencies: Vec<Dependency>,
    pub resolution: Resolution,
    pub arrays: ArrayEncoding,
    /// Json file backing the key-value store.
    pub store: PathBuf,
    pub recent_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: String::from("http://localhost:5000/api/"),
            timeout_ms: Some(10_000),
            headers: IndexMap::new(),
            page_size: 12,
            dependencies: DependencyPolicy::path_and_query().dependencies().to_vec(),
            resolution: Resolution::default(),
            arrays: ArrayEncoding::default(),
            store: PathBuf::from(".storefront/store.json"),
            recent_capacity: util::recent::DEFAULT_CAPACITY,
        }
    }
}

impl Settings {
    /// Reads `path` (or `storefront.toml` if present), then applies the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => Self::from_file(Path::new(DEFAULT_CONFIG))?,
            None => {
                debug!("no {DEFAULT_CONFIG} found, using defaults");
                Settings::default()
            }
        };

        settings.apply_env(|key| env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loading settings from {}", path.display());
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overrides from `STOREFRONT_*` variables, looked up through `var`.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) -> Result<(), ConfigError> {
        if let Some(base_url) = var("STOREFRONT_BASE_URL") {
            info!("STOREFRONT_BASE_URL set, using {base_url}");
            self.base_url = base_url;
        }
        if let Some(timeout) = try_load::<u64, _>(&var, "STOREFRONT_TIMEOUT_MS")? {
            self.timeout_ms = if timeout == 0 { None } else { Some(timeout) };
        }
        if let Some(page_size) = try_load::<u32, _>(&var, "STOREFRONT_PAGE_SIZE")? {
            self.page_size = page_size;
        }
        if let Some(store) = var("STOREFRONT_STORE") {
            self.store = PathBuf::from(store);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn fetcher_options(&self) -> FetcherOptions {
        if self.dependencies.is_empty() {
            warn!("no fetch dependencies configured, lists will only be fetched once");
        }
        FetcherOptions {
            dependencies: DependencyPolicy::new(self.dependencies.clone()),
            resolution: self.resolution,
            arrays: self.arrays,
        }
    }
}

fn try_load<T: FromStr, F: Fn(&str) -> Option<String>>(
    var: &F,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match var(key) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            warn!("Invalid {key} value: {value}");
            ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }
        }),
    }
}
