//! ロギング初期化と構造化ロガー
//!
//! `tracing` をバックエンドとするレベル付き・キー付きロガー（`StructuredLog`）と、
//! プロセス起動時のsubscriber初期化を提供する。

use crate::common::error::{CommonError, CommonResult};
use crate::config::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// デバッグ
    Debug,
    /// 通常情報
    Info,
    /// 警告
    Warn,
    /// エラー
    Error,
    /// 開発時のみ致命的なエラー
    #[serde(rename = "DPANIC")]
    DPanic,
    /// 致命的なエラー（panic相当）
    Panic,
    /// 致命的なエラー（プロセス終了相当）
    Fatal,
}

impl LogLevel {
    /// LogLevelを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::DPanic => "DPANIC",
            Self::Panic => "PANIC",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// キー付きログのフィールド値
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSONへシリアライズできた値
    Json(serde_json::Value),
    /// シリアライズに失敗した値（失敗理由とDebug表現を保持）
    Unserializable {
        /// シリアライズエラー
        error: String,
        /// 値のDebug表現
        raw: String,
    },
}

/// キー付きログの1フィールド
#[derive(Debug, Clone, PartialEq)]
pub struct Field<'a> {
    /// キー
    pub key: &'a str,
    /// 値
    pub value: FieldValue,
}

/// フィールドを生成する
///
/// 値はこの時点でJSONへ変換される。変換に失敗した場合も呼び出し側へエラーは返さず、
/// 失敗内容を`FieldValue::Unserializable`として保持する。
pub fn field<'a, T>(key: &'a str, value: &T) -> Field<'a>
where
    T: Serialize + fmt::Debug + ?Sized,
{
    let value = match serde_json::to_value(value) {
        Ok(json) => FieldValue::Json(json),
        Err(e) => FieldValue::Unserializable {
            error: e.to_string(),
            raw: format!("{:?}", value),
        },
    };
    Field { key, value }
}

/// メッセージとフィールドを1行の文字列に整形する
///
/// - フィールドなし: メッセージそのまま
/// - フィールドあり: `<message> {"key":value,...}`
/// - シリアライズ不能なフィールドを含む: `serialization error: ...` で始まる生の表現
pub fn render_message(message: &str, fields: &[Field<'_>]) -> String {
    if fields.is_empty() {
        return message.to_string();
    }

    let mut object = serde_json::Map::with_capacity(fields.len());
    let mut failures = Vec::new();
    for f in fields {
        match &f.value {
            FieldValue::Json(json) => {
                object.insert(f.key.to_string(), json.clone());
            }
            FieldValue::Unserializable { error, .. } => failures.push(error.as_str()),
        }
    }

    if failures.is_empty() {
        return format!("{} {}", message, serde_json::Value::Object(object));
    }

    let raw = fields
        .iter()
        .map(|f| match &f.value {
            FieldValue::Json(json) => format!("{}={}", f.key, json),
            FieldValue::Unserializable { raw, .. } => format!("{}={}", f.key, raw),
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "serialization error: {}, raw arguments: {} {}",
        failures.join("; "),
        message,
        raw
    )
}

/// レベル付き・キー付きの構造化ロガー
///
/// 実装が必須なのは`log`のみ。レベル別ヘルパーと書式付き出力はデフォルト実装で`log`に委譲される。
pub trait StructuredLog: Send + Sync {
    /// 1件のログを出力する
    fn log(&self, level: LogLevel, message: &str, fields: &[Field<'_>]);

    /// 書式文字列形式でログを出力する（`format_args!`を渡す）
    fn log_fmt(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.log(level, &args.to_string(), &[]);
    }

    /// DEBUGレベル
    fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Debug, message, fields);
    }

    /// INFOレベル
    fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Info, message, fields);
    }

    /// WARNレベル
    fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Warn, message, fields);
    }

    /// ERRORレベル
    fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Error, message, fields);
    }

    /// DPANICレベル
    fn dpanic(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::DPanic, message, fields);
    }

    /// PANICレベル
    fn panic(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Panic, message, fields);
    }

    /// FATALレベル
    fn fatal(&self, message: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Fatal, message, fields);
    }
}

/// `tracing`へ出力する基底ロガー
///
/// DPANIC/PANIC/FATALは`error`レベルで出力し、`severity`フィールドで区別する。
/// プロセスのpanicや終了は行わない。
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl StructuredLog for TracingLog {
    fn log(&self, level: LogLevel, message: &str, fields: &[Field<'_>]) {
        let rendered = render_message(message, fields);
        match level {
            LogLevel::Debug => tracing::debug!(target: "webclean::request", "{}", rendered),
            LogLevel::Info => tracing::info!(target: "webclean::request", "{}", rendered),
            LogLevel::Warn => tracing::warn!(target: "webclean::request", "{}", rendered),
            LogLevel::Error => tracing::error!(target: "webclean::request", "{}", rendered),
            LogLevel::DPanic | LogLevel::Panic | LogLevel::Fatal => tracing::error!(
                target: "webclean::request",
                severity = %level,
                "{}",
                rendered
            ),
        }
    }
}

/// ロギングを初期化する
///
/// `RUST_LOG`が設定されていればそれを優先し、なければ設定ファイルのレベルを使う。
/// ファイル出力が設定されている場合は日次ローテーションのファイルへも書き出し、
/// そのバックグラウンドライターのガードを返す（プロセス終了まで保持すること）。
pub fn init(config: &LoggerConfig) -> CommonResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CommonError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let stdout_layer = tracing_fmt::layer().with_target(true);

    match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| CommonError::Config(format!("Invalid log file: {}", path.display())))?;
            std::fs::create_dir_all(directory)?;

            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| CommonError::Config(format!("Failed to init logging: {}", e)))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .try_init()
                .map_err(|e| CommonError::Config(format!("Failed to init logging: {}", e)))?;
            Ok(None)
        }
    }
}
