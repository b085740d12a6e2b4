//! Network namespace provisioning and teardown.
//!
//! A tunnel namespace is an isolated network stack whose only route to the
//! world is a WireGuard interface. [`NamespaceManager`] sequences the
//! privileged commands that bring one up (inflate) or tear it down
//! (deflate); [`Namespace`] is the handle those operations hand back and
//! consume.

mod lifecycle;
mod logchan;

pub use lifecycle::{InflateOptions, NamespaceManager};
pub use logchan::{LogChannel, LogRegistry};

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Lifecycle state of a namespace.
///
/// The only valid transitions are `Provisioning → Active` (inflate) and
/// `Active → Destroyed` (deflate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceState {
    /// Provisioning commands are still running.
    Provisioning,
    /// Fully provisioned and usable.
    Active,
    /// Torn down.
    Destroyed,
}

impl fmt::Display for NamespaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisioning => write!(f, "provisioning"),
            Self::Active => write!(f, "active"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// A provisioned network namespace and its tunnel interface.
///
/// Only [`NamespaceManager::inflate`] produces values in the `Active`
/// state. Running commands against a name that never came out of a
/// successful inflate is undefined.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub(crate) name: String,
    pub(crate) interface: String,
    pub(crate) state: NamespaceState,
    pub(crate) channel: Arc<LogChannel>,
}

impl Namespace {
    /// Namespace name as known to the kernel.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the WireGuard interface inside the namespace.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    #[must_use]
    pub fn state(&self) -> NamespaceState {
        self.state
    }

    /// Output channel for commands run inside this namespace.
    #[must_use]
    pub fn channel(&self) -> &Arc<LogChannel> {
        &self.channel
    }

    /// Generates a namespace/interface name pair from one random token.
    ///
    /// Interface names must fit the kernel's 15-character limit, so only
    /// the leading section of a UUID is used. Uniqueness of the token is
    /// what keeps concurrent provisioning sequences off each other's
    /// resources; no lock is taken anywhere.
    pub(crate) fn generate_names() -> (String, String) {
        let token = Uuid::new_v4().simple().to_string();
        let token = &token[..8];
        (format!("vpnns-{token}"), format!("wg-{token}"))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_interface_name_fits_ifnamsiz() {
        let (_, interface) = Namespace::generate_names();
        assert!(interface.len() <= 15, "too long: {interface}");
        assert!(interface.starts_with("wg-"));
    }

    #[test]
    fn test_generated_names_share_a_token() {
        let (name, interface) = Namespace::generate_names();
        let ns_token = name.strip_prefix("vpnns-").expect("namespace prefix");
        let if_token = interface.strip_prefix("wg-").expect("interface prefix");
        assert_eq!(ns_token, if_token);
    }

    #[test]
    fn test_generated_names_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let (name, interface) = Namespace::generate_names();
            assert!(seen.insert(name), "namespace name collision");
            assert!(seen.insert(interface), "interface name collision");
        }
    }
}
