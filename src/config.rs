use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ClaConfigSnapshot;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    /// Maximum database connections in pool
    pub database_max_connections: u32,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory for scope lock files
    pub lock_dir: PathBuf,
    /// Root directory for CLA document files
    pub file_dir: PathBuf,
    /// Base URL of the signing page; the CLA id is appended per link
    pub sign_url: String,
    /// FAQ link shown when checking by commit author
    pub faq_of_checking_by_author: String,
    /// FAQ link shown when checking by committer
    pub faq_of_checking_by_committer: String,
    /// Path to the per-repo CLA configuration file
    pub repo_config_path: PathBuf,
    /// Languages CLA documents may be written in
    pub supported_languages: HashSet<String>,
    /// API token for the code-hosting platform
    pub platform_token: String,
    /// Override for the platform API base URL (tests, GitHub Enterprise)
    pub platform_api_base: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let lock_dir = env::var("CLA_LOCK_DIR")
            .unwrap_or_else(|_| "./data/locks".to_string())
            .into();

        let file_dir = env::var("CLA_FILE_DIR")
            .unwrap_or_else(|_| "./data/cla".to_string())
            .into();

        let sign_url =
            env::var("CLA_SIGN_URL").map_err(|_| ConfigError::MissingEnvVar("CLA_SIGN_URL"))?;

        let faq_of_checking_by_author = env::var("CLA_FAQ_OF_CHECKING_BY_AUTHOR")
            .map_err(|_| ConfigError::MissingEnvVar("CLA_FAQ_OF_CHECKING_BY_AUTHOR"))?;

        let faq_of_checking_by_committer = env::var("CLA_FAQ_OF_CHECKING_BY_COMMITTER")
            .map_err(|_| ConfigError::MissingEnvVar("CLA_FAQ_OF_CHECKING_BY_COMMITTER"))?;

        let repo_config_path = env::var("CLA_REPO_CONFIG")
            .map_err(|_| ConfigError::MissingEnvVar("CLA_REPO_CONFIG"))?
            .into();

        let supported_languages = env::var("CLA_LANGUAGES")
            .unwrap_or_else(|_| "english,chinese".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let platform_token =
            env::var("PLATFORM_TOKEN").map_err(|_| ConfigError::MissingEnvVar("PLATFORM_TOKEN"))?;

        let platform_api_base = env::var("PLATFORM_API_BASE").ok();

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            lock_dir,
            file_dir,
            sign_url,
            faq_of_checking_by_author,
            faq_of_checking_by_committer,
            repo_config_path,
            supported_languages,
            platform_token,
            platform_api_base,
        })
    }

    /// Load the per-repo CLA configuration snapshot from disk.
    pub fn load_repo_config(path: &Path) -> Result<ClaConfigSnapshot, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| ConfigError::RepoConfig(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|err| ConfigError::RepoConfig(format!("{}: {err}", path.display())))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
    #[error("Invalid repo config file: {0}")]
    RepoConfig(String),
}
