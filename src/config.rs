//! File and environment configuration.

use crate::dashboard::DashboardOptions;
use anyhow::{Context, Error};
use directories_next::BaseDirs;
use sekret::Secret;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;
use url::Url;

const APP_DIR: &str = "mdash";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "mdash.sqlite3";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Contents of `config.toml`. Every key is optional.
#[derive(Deserialize, Serialize, PartialEq, Clone, Default, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub username: Option<String>,
    pub token: Option<String>,
    /// GitHub API root, for GitHub Enterprise.
    pub api_url: Option<String>,
    /// Where shared profiles are served.
    pub frontend_url: Option<String>,
    pub database: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub repository_limit: Option<usize>,
}

impl ConfigFile {
    /// Reads the file, an absent file reads as empty.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = match fs::read_to_string(path) {
            Ok(x) => x,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no config file");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::new(err)
                    .context(format!("Failed to read config file `{}`.", path.display())))
            }
        };
        Self::parse(&text).with_context(|| format!("Invalid config file `{}`.", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let x = toml::from_str(text)?;
        Ok(x)
    }

    /// `<config dir>/mdash/config.toml`
    pub fn default_path() -> Result<PathBuf, Error> {
        let dirs = base_dirs()?;
        Ok(dirs.config_dir().join(APP_DIR).join(CONFIG_FILE))
    }
}

/// Values taking precedence over the config file, usually from the environment.
#[derive(PartialEq, Clone, Default, Debug)]
pub struct ConfigOverrides {
    pub username: Option<String>,
    pub token: Option<String>,
}

/// Resolved configuration.
#[derive(PartialEq, Clone, Debug)]
pub struct AppConfig {
    pub username: Option<String>,
    /// Unset when the token has to come from the database.
    pub token: Option<Secret<String>>,
    pub api_url: Option<Url>,
    pub frontend_url: String,
    pub database: PathBuf,
    pub options: DashboardOptions,
}

impl AppConfig {
    pub fn new(file: ConfigFile, overrides: ConfigOverrides) -> Result<Self, Error> {
        let api_url = file
            .api_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .context("Invalid `api_url`.")?;
        let database = match file.database {
            Some(x) => x,
            None => base_dirs()?.data_dir().join(APP_DIR).join(DATABASE_FILE),
        };

        let defaults = DashboardOptions::default();
        let options = DashboardOptions {
            concurrency: file.concurrency.unwrap_or(defaults.concurrency),
            repository_limit: file.repository_limit.unwrap_or(defaults.repository_limit),
            ..defaults
        };

        let non_empty = |x: Option<String>| x.filter(|x| !x.trim().is_empty());
        let token = non_empty(overrides.token).or_else(|| non_empty(file.token));
        Ok(Self {
            username: non_empty(overrides.username).or_else(|| non_empty(file.username)),
            token: token.map(Secret),
            api_url,
            frontend_url: file
                .frontend_url
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_owned()),
            database,
            options,
        })
    }
}

fn base_dirs() -> Result<BaseDirs, Error> {
    BaseDirs::new().context("Failed to locate home directory.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_file() {
        let text = r#"
            username = "octocat"
            token = "ghp_file"
            api_url = "https://github.example.com/api/v3/"
            database = "/tmp/mdash.sqlite3"
            concurrency = 8
        "#;
        let file = ConfigFile::parse(text).unwrap();
        assert_eq!(file.username.as_deref(), Some("octocat"));
        assert_eq!(file.concurrency, Some(8));
        assert_eq!(file.repository_limit, None);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(ConfigFile::parse("user = \"octocat\"").is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "concurrency = \"many\"").unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config file"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let file = ConfigFile {
            username: Some("from-file".to_owned()),
            token: Some("ghp_file".to_owned()),
            database: Some("/tmp/mdash.sqlite3".into()),
            repository_limit: Some(3),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            username: None,
            token: Some("ghp_env".to_owned()),
        };
        let config = AppConfig::new(file, overrides).unwrap();
        assert_eq!(config.username.as_deref(), Some("from-file"));
        assert_eq!(config.token.map(|x| x.into_inner()).as_deref(), Some("ghp_env"));
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(config.options.repository_limit, 3);
        assert_eq!(config.options.concurrency, 4);
    }

    #[test]
    fn test_blank_token_falls_through() {
        let file = ConfigFile {
            database: Some("/tmp/mdash.sqlite3".into()),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            username: None,
            token: Some("  ".to_owned()),
        };
        let config = AppConfig::new(file, overrides).unwrap();
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_invalid_api_url() {
        let file = ConfigFile {
            api_url: Some("not a url".to_owned()),
            database: Some("/tmp/mdash.sqlite3".into()),
            ..Default::default()
        };
        let err = AppConfig::new(file, ConfigOverrides::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid `api_url`.");
    }
}
