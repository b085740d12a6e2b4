//! Error types for the VPN namespace runner.
//!
//! Uses thiserror for deriving std::error::Error and miette for rich diagnostics.

use std::path::PathBuf;
use std::process::ExitStatus;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the application.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// System requirements not met
    #[error("System requirements check failed")]
    #[diagnostic(code(vpnns::system::requirements))]
    SystemRequirements(#[from] SystemRequirementsError),

    /// Configuration translation error
    #[error("Configuration error")]
    #[diagnostic(code(vpnns::config))]
    Config(#[from] ConfigError),

    /// Privileged command execution error
    #[error("Privileged command error")]
    #[diagnostic(code(vpnns::exec))]
    Exec(#[from] ExecError),

    /// Namespace lifecycle error
    #[error("Namespace lifecycle error")]
    #[diagnostic(code(vpnns::netns))]
    Namespace(#[from] NamespaceError),

    /// I/O error
    #[error("I/O error: {0}")]
    #[diagnostic(code(vpnns::io))]
    Io(#[from] std::io::Error),
}

/// Errors from reading and translating a wg-quick configuration.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Source config file missing or unreadable
    #[error("Failed to read config file: {path}")]
    #[diagnostic(
        code(vpnns::config::read),
        help("Check that the path exists and is readable by the current user")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write the sanitized temp file
    #[error("Failed to write sanitized config: {context}")]
    #[diagnostic(code(vpnns::config::write))]
    Write {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from running privileged commands.
///
/// Only the synchronous, exit-code-checked mode produces these. Streamed
/// commands are fire-and-forget: their failures are visible in the log
/// channel and nowhere else.
#[derive(Error, Debug, Diagnostic)]
pub enum ExecError {
    /// The subprocess could not be started at all
    #[error("Failed to spawn `{command}`")]
    #[diagnostic(code(vpnns::exec::spawn))]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A synchronous privileged command exited nonzero
    #[error("Privileged command failed ({status}): `{command}`")]
    #[diagnostic(
        code(vpnns::exec::command_failed),
        help("Provisioning steps that already ran are left in place; nothing is rolled back")
    )]
    CommandFailed { command: String, status: ExitStatus },
}

/// Errors from namespace provisioning and teardown.
#[derive(Error, Debug, Diagnostic)]
pub enum NamespaceError {
    /// Configuration could not be translated
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// A provisioning or teardown command failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Exec(#[from] ExecError),

    /// Neither the config nor the caller supplied an interface address
    #[error("No interface address: the config has no Address directive and no override was given")]
    #[diagnostic(
        code(vpnns::netns::missing_address),
        help("Add `Address = <cidr>` to the config or pass an explicit address override")
    )]
    MissingAddress,
}

/// Errors related to system requirements validation.
#[derive(Error, Debug, Diagnostic)]
pub enum SystemRequirementsError {
    /// A required external tool is missing
    #[error("Required tool `{tool}` was not found")]
    #[diagnostic(
        code(vpnns::system::missing_tool),
        help("Install {package} and make sure the binary is in a standard system directory")
    )]
    MissingTool {
        tool: &'static str,
        package: &'static str,
    },

    /// The kernel has no network namespace support
    #[error("Network namespaces are not supported by this kernel")]
    #[diagnostic(
        code(vpnns::system::netns),
        help("A kernel built with CONFIG_NET_NS=y is required")
    )]
    NamespacesUnavailable,

    /// No way to run commands as root without prompting
    #[error("Cannot escalate privileges non-interactively")]
    #[diagnostic(
        code(vpnns::system::escalation),
        help("Run as root, or configure passwordless sudo for this user")
    )]
    EscalationUnavailable,

    /// Failed to read system information
    #[error("Failed to read system information: {context}")]
    #[diagnostic(code(vpnns::system::read_failed))]
    ReadFailed {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
