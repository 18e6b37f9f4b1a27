//! CLI module for webclean
//!
//! Provides command-line interface for the user service.

pub mod serve;

use clap::{Parser, Subcommand};

/// webclean - User CRUD service with per-request log and error auditing
#[derive(Parser, Debug)]
#[command(name = "webclean")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    WEBCLEAN_HOST                Bind address (default: 0.0.0.0)
    WEBCLEAN_PORT                Listen port (default: 8080)
    WEBCLEAN_LOG_LEVEL           Log level (default: info)
    WEBCLEAN_LOG_FILE            Log file (daily rotation, stdout only if unset)
    WEBCLEAN_DATABASE_URL        Database URL (fallback: DATABASE_URL)
    WEBCLEAN_ERROR_FALLBACK_DIR  Directory for error reports the database rejected
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(serve::ServeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["webclean"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "webclean",
            "serve",
            "--port",
            "9090",
            "-H",
            "127.0.0.1",
            "--config",
            "conf/app.json",
        ])
        .unwrap();
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.port, Some(9090));
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(args.config, Some(std::path::PathBuf::from("conf/app.json")));
    }
}
