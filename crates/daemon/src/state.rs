use std::{fs, path::PathBuf};

use common::crypto::{Codec, KeyStrategy, SignaturePolicy};
use common::key_store::{FileBackend, FileLocalStorage, KeyStore, LocalStorageBackend};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "bookwire";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEYS_FILE_NAME: &str = "keys.json";
pub const LOCAL_STORAGE_FILE_NAME: &str = "local_storage.json";

pub type ServerKeyStore = KeyStore<FileBackend>;
pub type ClientKeyStore = KeyStore<LocalStorageBackend<FileLocalStorage>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// How new server key pairs are generated
    #[serde(default)]
    pub key_strategy: KeyStrategy,
    /// Whether a bad envelope signature is fatal
    #[serde(default)]
    pub signature_policy: SignaturePolicy,
    /// Directory for log files (stdout only if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_api_port() -> u16 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            key_strategy: KeyStrategy::default(),
            signature_policy: SignaturePolicy::default(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the bookwire directory (~/.bookwire)
    pub bookwire_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Path to the server key pair
    pub keys_path: PathBuf,
    /// Path to the client local storage document
    pub local_storage_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the bookwire directory path (custom or default ~/.bookwire)
    pub fn bookwire_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    fn from_dir(bookwire_dir: PathBuf, config: AppConfig) -> Self {
        Self {
            config_path: bookwire_dir.join(CONFIG_FILE_NAME),
            keys_path: bookwire_dir.join(KEYS_FILE_NAME),
            local_storage_path: bookwire_dir.join(LOCAL_STORAGE_FILE_NAME),
            bookwire_dir,
            config,
        }
    }

    /// Initialize a new bookwire state directory.
    ///
    /// Writes the config and generates the server key pair so it can be
    /// inspected before the daemon first runs.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let bookwire_dir = Self::bookwire_dir(custom_path)?;

        if bookwire_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&bookwire_dir)?;

        let state = Self::from_dir(bookwire_dir, config.unwrap_or_default());
        let config_toml = toml::to_string_pretty(&state.config)?;
        fs::write(&state.config_path, config_toml)?;

        state.server_key_store().get_or_create();

        Ok(state)
    }

    /// Load existing state from the bookwire directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let bookwire_dir = Self::bookwire_dir(custom_path)?;

        if !bookwire_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = bookwire_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self::from_dir(bookwire_dir, config))
    }

    /// Key store over `keys.json`, using the configured strategy
    pub fn server_key_store(&self) -> ServerKeyStore {
        KeyStore::new(FileBackend::new(&self.keys_path), self.config.key_strategy)
    }

    /// Key store over the `client_keys` entry of the local storage document.
    ///
    /// Client pairs are always derived-hash: the public half travels in an
    /// HTTP header, which cannot hold a multi-line PEM.
    pub fn client_key_store(&self) -> ClientKeyStore {
        let storage = FileLocalStorage::new(&self.local_storage_path);
        KeyStore::new(LocalStorageBackend::new(storage), KeyStrategy::DerivedHash)
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.config.signature_policy)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("bookwire directory not initialized. Run 'bookwire init' first")]
    NotInitialized,

    #[error("bookwire directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}
