//! recwire-cli - Command-line interface for recwire
//!
//! Local commands (digest, decode) need no server. The rest open one
//! connection, run one request and exit.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use recwire_client::{Client, ClientConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recwire-cli")]
#[command(about = "Command-line interface for the recwire record protocol")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "RECWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Namespace (overrides config)
    #[arg(short, long)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the digest of a record key
    Digest {
        /// Set name (may be empty)
        set: String,

        /// User key
        key: String,

        /// Treat the key as a 64-bit integer
        #[arg(short, long)]
        int: bool,
    },

    /// Decode a hex encoded message body (or whole frame) to JSON
    Decode {
        /// Hex bytes (or @file to read them from a file)
        hex: String,

        /// Input starts with the 8-byte frame header
        #[arg(short, long)]
        frame: bool,
    },

    /// Run info commands
    Info {
        /// Commands to run (none asks for the default set)
        commands: Vec<String>,
    },

    /// Read a record
    Get {
        /// Set name
        set: String,

        /// User key
        key: String,

        /// Treat the key as a 64-bit integer
        #[arg(short, long)]
        int: bool,

        /// Bins to read (all when omitted)
        bins: Vec<String>,
    },

    /// Write bins as name=value pairs; values are parsed as JSON when possible
    Put {
        /// Set name
        set: String,

        /// User key
        key: String,

        /// Treat the key as a 64-bit integer
        #[arg(short, long)]
        int: bool,

        /// Record time to live in seconds
        #[arg(long)]
        ttl: Option<u32>,

        /// Bins as name=value
        #[arg(required = true)]
        bins: Vec<String>,
    },

    /// Delete a record
    Delete {
        /// Set name
        set: String,

        /// User key
        key: String,

        /// Treat the key as a 64-bit integer
        #[arg(short, long)]
        int: bool,
    },
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(namespace) = &cli.namespace {
        config.namespace = namespace.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let result = match cli.command {
        // Local commands (no server connection needed)
        cmd @ (Commands::Digest { .. } | Commands::Decode { .. }) => {
            commands::execute_local(&config, cmd)
        }
        cmd => {
            let client = Client::connect(config).await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;
            let result = commands::execute(&client, cmd).await;
            client.close().await?;
            result
        }
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
