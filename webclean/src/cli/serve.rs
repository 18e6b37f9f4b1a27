//! serve サブコマンド
//!
//! HTTPサーバーを起動します。指定した値は設定ファイルと環境変数より優先されます。

use crate::config::AppConfig;
use clap::Args;
use std::path::PathBuf;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Bind address
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Configuration file (searches ./config.json, ./app.json and ./config/ if omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ServeArgs {
    /// コマンドライン指定で設定を上書きする
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.web.host = host.clone();
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
    }
}
