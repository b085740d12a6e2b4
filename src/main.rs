//! VPN namespace runner - Entry Point
//!
//! Command-line front-end over the provisioning library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use nix::unistd::Uid;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use vpn_netns::{
    DirectExecutor, InflateOptions, NamespaceManager, PrivilegedExecutor, SudoExecutor, system,
};

/// Run commands inside an isolated network namespace confined to a
/// WireGuard tunnel.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Skip system requirements checks before provisioning
    #[arg(long, global = true, default_value = "false")]
    skip_checks: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision a tunnel namespace and launch a command inside it.
    ///
    /// Prints the namespace name and leaves the namespace up; the command's
    /// output is streamed to the log at debug level. Tear down later with
    /// `down`.
    Run {
        /// wg-quick configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Interface address override (defaults to the config's Address)
        #[arg(long)]
        address: Option<String>,

        /// Resolver override (captured, currently unused)
        #[arg(long)]
        dns: Option<String>,

        /// User the command runs as (defaults to the invoking user)
        #[arg(short, long)]
        user: Option<String>,

        /// Command line to execute inside the namespace
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Delete a previously provisioned namespace.
    Down {
        /// Namespace name as printed by `run`
        namespace: String,
    },

    /// Check that this host can run tunnel namespaces.
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the namespace name.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Commands::Check = cli.command {
        let reqs = system::check_all()?;
        info!(
            "System requirements satisfied: ip at {}, wg at {}, escalation via {}",
            reqs.ip_path.display(),
            reqs.wg_path.display(),
            reqs.escalation
        );
        return Ok(());
    }

    if cli.skip_checks {
        warn!("Skipping system requirements checks (--skip-checks)");
    } else {
        system::check_all()?;
    }

    // Already-root processes need no sudo in front of every command.
    if Uid::effective().is_root() {
        dispatch(NamespaceManager::new(DirectExecutor::new()), cli.command)
    } else {
        dispatch(NamespaceManager::new(SudoExecutor::new()), cli.command)
    }
}

fn dispatch<E: PrivilegedExecutor>(
    manager: NamespaceManager<E>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Run {
            config,
            address,
            dns,
            user,
            command,
        } => {
            let mut options = InflateOptions::new();
            options.address = address;
            options.dns = dns;

            let command = command.join(" ");
            let namespace = manager.execute(&config, &command, &options, user.as_deref())?;

            info!(
                "Namespace {} is up; tear it down with `vpn-netns down {}`",
                namespace.name(),
                namespace.name()
            );
            println!("{}", namespace.name());
            Ok(())
        }
        Commands::Down { namespace } => {
            manager.deflate_named(&namespace)?;
            info!("Namespace {namespace} destroyed");
            Ok(())
        }
        Commands::Check => unreachable!("handled before dispatch"),
    }
}
