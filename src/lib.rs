//! Run commands inside an isolated network namespace confined to a
//! WireGuard tunnel.
//!
//! This crate provisions a dedicated network namespace whose only route is
//! a WireGuard interface configured from a wg-quick-style file, then runs
//! arbitrary commands in it: their traffic goes through the tunnel or
//! nowhere, and the host's default routing is never touched.
//!
//! # Platform Requirements
//!
//! - Linux with network namespace support (`CONFIG_NET_NS=y`)
//! - `ip` (iproute2) and `wg` (wireguard-tools) in a standard location
//! - A non-interactive path to root: run as root, or passwordless sudo
//!
//! # Example
//!
//! ```no_run
//! use vpn_netns::{InflateOptions, NamespaceManager, SudoExecutor, system};
//!
//! fn main() -> vpn_netns::Result<()> {
//!     // Validate the host before touching kernel state
//!     system::check_all()?;
//!
//!     let manager = NamespaceManager::new(SudoExecutor::new());
//!     let options = InflateOptions::new();
//!
//!     // Provision the tunnel namespace and run a command inside it
//!     let namespace = manager.execute("wg0.conf", "curl -s https://example.org", &options, None)?;
//!     println!("namespace: {}", namespace.name());
//!
//!     // Tear down when the tunnel is no longer needed
//!     manager.deflate_named(namespace.name())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod netns;
pub mod system;

// Re-export commonly used types
pub use config::{SanitizedConfig, VpnConfig};
pub use error::{Error, Result};
pub use exec::{
    CommandRunner, DirectExecutor, PrivilegedCommand, PrivilegedExecutor, SudoExecutor,
};
pub use netns::{InflateOptions, LogChannel, Namespace, NamespaceManager, NamespaceState};
