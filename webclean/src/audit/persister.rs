//! リクエスト終了時の永続化
//!
//! どちらの永続化も呼び出し元へ失敗を返さない。
//! ログバッファはストア失敗時にログ出力のみ行い、エラーレポートは
//! ストア失敗時にフォールバックディレクトリへJSONファイルとして書き出す。

use crate::audit::types::{ErrorReport, RequestLogBuffer};
use crate::common::error::CommonResult;
use crate::db::traits::{ErrorReportRepository, RequestLogRepository};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

/// ログバッファの永続化
#[async_trait]
pub trait LogPersister: Send + Sync {
    /// バッファを保存する（失敗しても返さない）
    async fn persist(&self, buffer: RequestLogBuffer);
}

/// エラーレポートの永続化
#[async_trait]
pub trait ErrorStackPersister: Send + Sync {
    /// レポートを保存する（失敗しても返さない）
    async fn persist(&self, report: ErrorReport);
}

/// ストアへログバッファを書き込むLogPersister
pub struct StoreLogPersister<R> {
    repository: R,
}

impl<R: RequestLogRepository> StoreLogPersister<R> {
    /// 新しいStoreLogPersisterを作成
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: RequestLogRepository> LogPersister for StoreLogPersister<R> {
    async fn persist(&self, buffer: RequestLogBuffer) {
        if let Err(e) = self.repository.insert_request_log(&buffer).await {
            let records = serde_json::to_string(&buffer).unwrap_or_else(|_| format!("{:?}", buffer));
            error!(error = %e, records = %records, "Failed to persist request log");
        }
    }
}

/// ストアへエラーレポートを書き込み、失敗時はファイルへ退避するErrorStackPersister
pub struct StoreErrorPersister<R> {
    repository: R,
    fallback_dir: PathBuf,
}

impl<R: ErrorReportRepository> StoreErrorPersister<R> {
    /// 新しいStoreErrorPersisterを作成
    pub fn new(repository: R, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            fallback_dir: fallback_dir.into(),
        }
    }
}

#[async_trait]
impl<R: ErrorReportRepository> ErrorStackPersister for StoreErrorPersister<R> {
    async fn persist(&self, report: ErrorReport) {
        let store_error = match self.repository.insert_error_report(&report).await {
            Ok(()) => return,
            Err(e) => e,
        };
        warn!(
            error = %store_error,
            request_id = %report.request_id,
            "Failed to store error report, writing fallback file"
        );

        match write_fallback_file(&self.fallback_dir, &report).await {
            Ok(path) => {
                warn!(path = %path.display(), "Error report written to fallback file");
            }
            Err(file_error) => {
                error!(
                    store_error = %store_error,
                    file_error = %file_error,
                    stack = %report.stack,
                    request_id = %report.request_id,
                    "Failed to persist error report, report lost"
                );
            }
        }
    }
}

/// フォールバックファイル名を生成する
///
/// `error_<requestID>_<YYYYMMDDTHHMMSS.mmm>.json`。リクエストIDのうち
/// ASCII英数字・`-`・`_` 以外の文字は `_` に置き換える。
pub fn fallback_file_name(request_id: &str, at: DateTime<Local>) -> String {
    let sanitized: String = request_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("error_{}_{}.json", sanitized, at.format("%Y%m%dT%H%M%S%.3f"))
}

/// レポートを整形済みJSONとしてフォールバックディレクトリへ書き出す
pub async fn write_fallback_file(dir: &Path, report: &ErrorReport) -> CommonResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(fallback_file_name(&report.request_id, Local::now()));
    let payload = serde_json::to_vec_pretty(report)?;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(&payload).await?;
    file.flush().await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::LogRecord;
    use crate::common::error::{WebError, WebResult};
    use crate::logging::LogLevel;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct MockStore {
        fail: bool,
        logs: Arc<Mutex<Vec<RequestLogBuffer>>>,
        reports: Arc<Mutex<Vec<ErrorReport>>>,
    }

    #[async_trait]
    impl RequestLogRepository for MockStore {
        async fn insert_request_log(&self, records: &[LogRecord]) -> WebResult<()> {
            if self.fail {
                return Err(WebError::Database("store unavailable".to_string()));
            }
            self.logs.lock().unwrap().push(records.to_vec());
            Ok(())
        }
    }

    #[async_trait]
    impl ErrorReportRepository for MockStore {
        async fn insert_error_report(&self, report: &ErrorReport) -> WebResult<()> {
            if self.fail {
                return Err(WebError::Database("store unavailable".to_string()));
            }
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn sample_report(request_id: &str) -> ErrorReport {
        ErrorReport {
            stack: "Error #01: a custom error\n".to_string(),
            method: "POST".to_string(),
            url: "/api/v1/users".to_string(),
            path: "/api/v1/users".to_string(),
            ip: "10.0.0.1".to_string(),
            request_id: request_id.to_string(),
        }
    }

    fn json_files(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().path())
                .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_fallback_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            fallback_file_name("abc-123", at),
            "error_abc-123_20240309T140507.000.json"
        );
    }

    #[test]
    fn test_fallback_file_name_sanitizes_request_id() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            fallback_file_name("../etc/pass wd", at),
            "error____etc_pass_wd_20240309T140507.000.json"
        );
    }

    #[tokio::test]
    async fn test_error_report_goes_to_store() {
        let dir = tempdir().unwrap();
        let store = MockStore::default();
        let persister = StoreErrorPersister::new(store.clone(), dir.path());

        persister.persist(sample_report("req-1")).await;

        assert_eq!(store.reports.lock().unwrap().len(), 1);
        assert!(json_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_writes_fallback_file() {
        let dir = tempdir().unwrap();
        let fallback = dir.path().join("errors");
        let store = MockStore {
            fail: true,
            ..Default::default()
        };
        let persister = StoreErrorPersister::new(store, &fallback);
        let report = sample_report("req-2");

        persister.persist(report.clone()).await;

        let files = json_files(&fallback);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("error_req-2_"));

        let content = std::fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains('\n'));
        let written: ErrorReport = serde_json::from_str(&content).unwrap();
        assert_eq!(written, report);
    }

    #[tokio::test]
    async fn test_store_and_file_failure_is_swallowed() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = MockStore {
            fail: true,
            ..Default::default()
        };
        let persister = StoreErrorPersister::new(store, blocker.join("errors"));

        persister.persist(sample_report("req-3")).await;
    }

    #[tokio::test]
    async fn test_log_buffer_goes_to_store() {
        let store = MockStore::default();
        let persister = StoreLogPersister::new(store.clone());

        persister
            .persist(vec![
                LogRecord::new(LogLevel::Info, "start"),
                LogRecord::new(LogLevel::Error, "failed"),
            ])
            .await;

        let logs = store.logs.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].len(), 2);
    }

    #[tokio::test]
    async fn test_log_store_failure_is_swallowed() {
        let store = MockStore {
            fail: true,
            ..Default::default()
        };
        let persister = StoreLogPersister::new(store.clone());

        persister
            .persist(vec![LogRecord::new(LogLevel::Info, "start")])
            .await;

        assert!(store.logs.lock().unwrap().is_empty());
    }
}
