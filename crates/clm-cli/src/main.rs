//! CLM operator console: authenticate, list DocLauncher configurations,
//! launch generation tasks and inspect documents from the terminal.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use clm_sdk::{AccountId, ConfigOverrides, Console, ConsoleConfig, ConsoleError, ErrorKind};

/// Default merge data used when no payload is given.
const DEFAULT_XML_PAYLOAD: &str = "<Params><Source>CLM API Example</Source></Params>";

#[derive(Parser, Debug)]
#[command(name = "clm-cli")]
#[command(author, version, about = "CLM document-generation operator console", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags overriding `CLM_*` environment variables.
#[derive(Args, Debug, Default)]
pub struct Settings {
    /// OAuth authorization server host or base URL
    #[arg(long, global = true)]
    pub auth_server: Option<String>,

    /// REST API base URL
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// OAuth client id (integration key)
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, global = true)]
    pub client_secret: Option<String>,

    /// Account the REST calls are scoped to
    #[arg(long, global = true)]
    pub account_id: Option<AccountId>,

    /// Redirect URI registered for the integration
    #[arg(long, global = true)]
    pub redirect_uri: Option<String>,

    /// Token file location
    #[arg(long, global = true)]
    pub token_path: Option<PathBuf>,

    /// Total attempts per remote call
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
}

impl From<Settings> for ConfigOverrides {
    fn from(s: Settings) -> Self {
        Self {
            auth_server: s.auth_server,
            api_base_url: s.api_base_url,
            client_id: s.client_id,
            client_secret: s.client_secret,
            account_id: s.account_id,
            redirect_uri: s.redirect_uri,
            token_path: s.token_path,
            max_retries: s.max_retries,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the consent URL, or finish login with the returned code
    Login {
        /// Authorization code, or the full URL the browser was redirected to
        #[arg(long)]
        code: Option<String>,
    },
    /// Show the authentication state and token details
    Status,
    /// List DocLauncher configurations
    Configs {
        /// Only show configurations whose label contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Launch a DocLauncher task
    Launch {
        /// Configuration id, label or href
        #[arg(long)]
        config: String,

        /// Inline XML payload
        #[arg(long, conflicts_with = "xml_file")]
        xml: Option<String>,

        /// File containing the XML payload
        #[arg(long)]
        xml_file: Option<PathBuf>,
    },
    /// Show a document with its attribute groups
    Document {
        /// Document id
        id: String,
    },
    /// Forget the session and delete the stored token
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let console = Console::new(ConsoleConfig::from_env(cli.settings.into()));

    match commands::run(&console, cli.command, cli.json).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(error: &anyhow::Error) {
    eprintln!("error: {error:#}");
    let hint = match error.downcast_ref::<ConsoleError>().map(ConsoleError::kind) {
        Some(ErrorKind::Auth) => Some("run `clm-cli login` to authenticate again"),
        Some(ErrorKind::Configuration) => Some("see `clm-cli --help` for the available settings"),
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_settings_after_subcommand() {
        let cli = Cli::parse_from([
            "clm-cli",
            "configs",
            "--account-id",
            "acc",
            "--search",
            "offer",
            "--json",
        ]);
        assert!(cli.json);
        assert_eq!(cli.settings.account_id, Some(AccountId::new("acc")));
        assert!(matches!(cli.command, Commands::Configs { search: Some(ref s) } if s == "offer"));
    }

    #[test]
    fn account_id_must_be_a_path_segment() {
        let res = Cli::try_parse_from(["clm-cli", "status", "--account-id", "acc/other"]);
        assert!(res.is_err());
    }

    #[test]
    fn xml_and_xml_file_conflict() {
        let res = Cli::try_parse_from([
            "clm-cli", "launch", "--config", "1", "--xml", "<a/>", "--xml-file", "p.xml",
        ]);
        assert!(res.is_err());
    }
}
