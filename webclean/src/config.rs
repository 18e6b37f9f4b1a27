//! Configuration management
//!
//! JSON設定ファイルの探索・読み込みと、環境変数による上書きを提供する。
//! 環境変数は旧名へのフォールバック（非推奨警告付き）に対応する。

use crate::common::error::{CommonError, CommonResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 設定ファイルの最大サイズ（100 MiB）
pub const MAX_CONFIG_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use webclean::config::get_env_with_fallback;
///
/// let url = get_env_with_fallback("WEBCLEAN_DATABASE_URL", "DATABASE_URL");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 本番モード
    pub production: bool,
    /// ロガー設定
    pub logger: LoggerConfig,
    /// HTTPサーバー設定
    pub web: WebConfig,
    /// データベース設定
    pub database: DatabaseConfig,
    /// エラーレポート設定
    pub errors: ErrorsConfig,
}

/// ロガー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// ログレベル（`RUST_LOG`未設定時に使用）
    pub level: String,
    /// ログファイル（未指定なら標準出力のみ）
    pub file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// HTTPサーバー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// バインドするホスト
    pub host: String,
    /// 待ち受けポート
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// データベース設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite接続URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:webclean.db".to_string(),
        }
    }
}

/// エラーレポート設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// DBへ保存できなかったエラーレポートの書き出し先
    pub fallback_dir: PathBuf,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            fallback_dir: PathBuf::from("./errors"),
        }
    }
}

/// 設定ファイルの探索候補
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSearch {
    /// 探索するディレクトリ
    pub paths: Vec<PathBuf>,
    /// 探索するファイル名
    pub files: Vec<String>,
}

impl Default for ConfigSearch {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("."), PathBuf::from("./config")],
            files: vec!["config.json".to_string(), "app.json".to_string()],
        }
    }
}

impl ConfigSearch {
    /// 探索候補を生成する（空白のみの要素は無視）
    pub fn candidates(&self) -> CommonResult<Vec<PathBuf>> {
        let paths: Vec<&PathBuf> = self
            .paths
            .iter()
            .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
            .collect();
        let files: Vec<&str> = self
            .files
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();

        if paths.is_empty() || files.is_empty() {
            return Err(CommonError::Config(
                "config search paths or file names are empty".to_string(),
            ));
        }

        Ok(paths
            .iter()
            .flat_map(|dir| files.iter().map(move |file| dir.join(file)))
            .collect())
    }
}

impl AppConfig {
    /// 探索候補から設定を読み込む
    ///
    /// 最初に読み込めたファイルを採用する。候補が存在したが全て失敗した場合は
    /// 最後のエラーを返し、候補が1つも存在しない場合はデフォルト値を返す。
    pub fn load(search: &ConfigSearch) -> CommonResult<Self> {
        let mut last_error = None;
        for candidate in search.candidates()? {
            if !candidate.is_file() {
                continue;
            }
            match Self::load_file(&candidate) {
                Ok(config) => {
                    tracing::info!(path = %candidate.display(), "Loaded configuration file");
                    return Ok(config);
                }
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Failed to load configuration file");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// 指定ファイルから設定を読み込む
    pub fn load_file(path: &Path) -> CommonResult<Self> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CommonError::Config(format!(
                "config file {} exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 環境変数による上書きを適用する
    ///
    /// `WEBCLEAN_PORT`が数値として解釈できない場合はエラーを返す。
    pub fn apply_env_overrides(&mut self) -> CommonResult<()> {
        if let Some(host) = env_var("WEBCLEAN_HOST") {
            self.web.host = host;
        }
        if let Some(port) = env_var("WEBCLEAN_PORT") {
            self.web.port = port.trim().parse().map_err(|e| {
                CommonError::Config(format!("Invalid WEBCLEAN_PORT '{}': {}", port, e))
            })?;
        }
        if let Some(level) = env_var("WEBCLEAN_LOG_LEVEL") {
            self.logger.level = level;
        }
        if let Some(file) = env_var("WEBCLEAN_LOG_FILE") {
            self.logger.file = Some(PathBuf::from(file));
        }
        if let Some(url) = get_env_with_fallback("WEBCLEAN_DATABASE_URL", "DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(dir) = env_var("WEBCLEAN_ERROR_FALLBACK_DIR") {
            self.errors.fallback_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}
