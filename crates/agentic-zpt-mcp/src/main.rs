//! AgenticZPT server entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agentic_zpt_mcp::config::ZptConfig;
use agentic_zpt_mcp::protocol::ProtocolHandler;
use agentic_zpt_mcp::response::sanitize_data;
use agentic_zpt_mcp::service::ZptService;
use agentic_zpt_mcp::transport::StdioTransport;
use agentic_zpt_mcp::verbs::VerbRegistry;

#[derive(Parser)]
#[command(
    name = "agentic-zpt-mcp",
    about = "Zoom/pan/tilt navigation server over MCP stdio and HTTP",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC over stdio (default).
    Serve,

    /// Serve the REST routes and JSON-RPC over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port). Overrides the config file.
        #[arg(long)]
        addr: Option<String>,

        /// Bearer token for authentication.
        /// Also reads from AGENTIC_TOKEN env var.
        #[arg(long)]
        token: Option<String>,
    },

    /// Print server capabilities and the effective configuration as JSON.
    Info,

    /// List supported verbs with their descriptions.
    Verbs,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agentic-zpt-mcp completions bash > ~/.local/share/bash-completion/completions/agentic-zpt-mcp
    ///   agentic-zpt-mcp completions zsh > ~/.zfunc/_agentic-zpt-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = ZptConfig::load(cli.config.as_deref())?;
            let service = Arc::new(ZptService::new(config));
            let transport = StdioTransport::new(ProtocolHandler::new(service));
            transport.run().await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp { addr, token } => {
            use agentic_zpt_mcp::transport::HttpTransport;

            let mut config = ZptConfig::load(cli.config.as_deref())?;
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            // CLI flag > env var > config file
            if token.is_some() {
                config.server.token = token;
            }

            let addr = config.server.addr.clone();
            let token = config.server.token.clone();
            if token.is_some() {
                tracing::info!("Auth: bearer token required");
            }

            tracing::info!("AgenticZPT server");
            let service = Arc::new(ZptService::new(config));
            HttpTransport::new(service, token).run(&addr).await?;
        }

        Commands::Info => {
            let config = ZptConfig::load(cli.config.as_deref())?;
            let capabilities = agentic_zpt_mcp::types::InitializeResult::default_result();
            let verbs = VerbRegistry::list_verbs();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "verbs": verbs.iter().map(|v| &v.name).collect::<Vec<_>>(),
                "verb_count": verbs.len(),
                "config": sanitize_data(&serde_json::to_value(&config)?),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Verbs => {
            for verb in VerbRegistry::list_verbs() {
                println!(
                    "{:<16} {}",
                    verb.name,
                    verb.description.as_deref().unwrap_or("")
                );
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "agentic-zpt-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}
