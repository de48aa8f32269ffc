use std::{env, fs, path::Path};

use log::debug;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.track.toggl.com/api/v9";

/// Toggl APIとの通信設定。
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// 未設定の場合はクライアント生成時にエラーとなる。
    pub api_token: Option<String>,
    pub api_url: String,
}

/// 設定ファイルの内容。
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_token: Option<String>,
    api_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Config {
    /// 環境変数と設定ファイルから設定を読み込む。
    ///
    /// 環境変数(`TOGGL_API_TOKEN`, `TOGGL_API_URL`)を優先し、
    /// 次に`<config dir>/hourreport/config.toml`の値を利用する。
    pub fn load() -> Result<Self, ConfigError> {
        let file = match dirs::config_dir() {
            Some(dir) => read_config_file(&dir.join("hourreport").join("config.toml"))?,
            None => ConfigFile::default(),
        };

        Ok(merge(file, env::var("TOGGL_API_TOKEN").ok(), env::var("TOGGL_API_URL").ok()))
    }
}

/// 設定ファイルを読み込む。ファイルが存在しない場合は空の設定とする。
fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        debug!("Config file not found: {}", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// 設定ファイルの値を環境変数の値で上書きする。空文字列は未設定として扱う。
fn merge(file: ConfigFile, env_token: Option<String>, env_url: Option<String>) -> Config {
    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    Config {
        api_token: non_blank(env_token).or_else(|| non_blank(file.api_token)),
        api_url: non_blank(env_url)
            .or_else(|| non_blank(file.api_url))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
    }
}
