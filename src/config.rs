use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

pub static GOOGLE_AUTH_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://accounts.google.com/o/oauth2/v2/auth").expect("static URL")
});

pub static GOOGLE_TOKEN_URI: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://oauth2.googleapis.com/token").expect("static URL"));

pub static SHEETS_API_BASE: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://sheets.googleapis.com/v4/spreadsheets").expect("static URL")
});

pub static DRIVE_API_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://www.googleapis.com/drive/v3/files").expect("static URL"));

/// Runtime configuration, populated from `SHEETBRIDGE_*` environment
/// variables over the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub listen: String,
    pub loglevel: String,
    /// API key required on every admin endpoint. Must be set in production.
    pub api_key: String,
    /// Exact name of the Drive folder that holds backup spreadsheets.
    pub backup_folder_name: String,
    pub proxy: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:sheetbridge.db".to_string(),
            listen: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            api_key: String::new(),
            backup_folder_name: "Dataset Sheet Backups".to_string(),
            proxy: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("SHEETBRIDGE_"))
            .extract()
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::from_env().expect("FATAL: invalid SHEETBRIDGE_* configuration"));
