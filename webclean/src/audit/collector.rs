//! リクエスト単位のログ収集

use crate::audit::types::{LogRecord, RequestLogBuffer};
use crate::logging::{render_message, Field, LogLevel, StructuredLog};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// 基底ロガーへ転送しつつ、出力内容をリクエストのバッファへ蓄積するロガー
///
/// Cloneしたインスタンスは同じバッファを共有する。
#[derive(Clone)]
pub struct RequestLogger {
    inner: Arc<dyn StructuredLog>,
    buffer: Arc<Mutex<RequestLogBuffer>>,
}

impl RequestLogger {
    /// 基底ロガーを包んだ空のコレクタを作成
    pub fn new(inner: Arc<dyn StructuredLog>) -> Self {
        Self {
            inner,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn guard(&self) -> MutexGuard<'_, RequestLogBuffer> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, level: LogLevel, message: String) {
        self.guard().push(LogRecord { level, message });
    }

    /// 蓄積済みレコードのコピー
    pub fn records(&self) -> RequestLogBuffer {
        self.guard().clone()
    }

    /// バッファを取り出す（以降は空になる）
    pub fn take(&self) -> RequestLogBuffer {
        std::mem::take(&mut *self.guard())
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("records", &self.guard().len())
            .finish()
    }
}

impl StructuredLog for RequestLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &[Field<'_>]) {
        self.inner.log(level, message, fields);
        self.push(level, render_message(message, fields));
    }

    fn log_fmt(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.inner.log_fmt(level, args);
        self.push(level, args.to_string());
    }
}
