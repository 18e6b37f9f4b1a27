//! webclean Server Entry Point

use clap::Parser;
use webclean::cli::serve::ServeArgs;
use webclean::cli::{Cli, Commands};
use webclean::config::{AppConfig, ConfigSearch};
use webclean::{bootstrap, logging, server};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // サブコマンド省略時はデフォルト設定でserve
    let args = match cli.command {
        Some(Commands::Serve(args)) => args,
        None => ServeArgs::default(),
    };

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_file(path)?,
        None => AppConfig::load(&ConfigSearch::default())?,
    };
    config.apply_env_overrides()?;
    args.apply(&mut config);

    // ファイル出力のガードはプロセス終了まで保持する
    let _log_guard = logging::init(&config.logger)?;

    let state = bootstrap::build_state(&config).await?;
    let bind_addr = format!("{}:{}", config.web.host, config.web.port);
    server::run(state, &bind_addr).await?;
    Ok(())
}
