//! Vbook CLI - Main Entry Point
//!
//! Command-line interface for installing and testing Vbook extensions
//! against a running Vbook app.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vbook_cli::commands::{address, build, install, test, validate};
use vbook_cli::config::CliConfig;
use vbook_cli::output::{self, print_error};

/// Vbook CLI - extension developer tools
#[derive(Parser)]
#[command(name = "vbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "VBOOK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "plain", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an extension script on the Vbook app
    Test(test::TestArgs),

    /// Install an extension on the Vbook app
    Install(install::InstallArgs),

    /// Check the layout of an extension project
    Validate(validate::ValidateArgs),

    /// Package an extension project into plugin.zip
    Build(build::BuildArgs),

    /// Print the normalized form of an app address
    Normalize(address::NormalizeArgs),

    /// Print the local address the app would fetch files from
    LocalIp(address::LocalIpArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        print_error(&describe(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Test(args) => test::execute(args, config, cli.format).await?,
        Commands::Install(args) => install::execute(args, config).await?,
        Commands::Validate(args) => validate::execute(args)?,
        Commands::Build(args) => build::execute(args)?,
        Commands::Normalize(args) => address::normalize(args)?,
        Commands::LocalIp(args) => address::local_ip(args, &config)?,
        Commands::Version => {
            println!("Vbook CLI v{}", vbook_common::VERSION);
        }
    }

    Ok(())
}

/// Outermost context followed by the friendly text of the underlying error
fn describe(err: &anyhow::Error) -> String {
    let root = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<vbook_common::Error>());
    match root {
        Some(inner) if err.downcast_ref::<vbook_common::Error>().is_none() => {
            format!("{}: {}", err, inner.user_message())
        }
        Some(inner) => inner.user_message(),
        None => format!("{:#}", err),
    }
}
