//! Namespace lifecycle sequencing.
//!
//! Provisioning is an ordered chain of privileged commands, each depending
//! on kernel state created by the one before it: the namespace must exist
//! before an interface can be moved into it, the interface must carry an
//! address before the tunnel config is applied, and so on. The chain runs
//! through the executor's synchronous checked mode: the first nonzero exit
//! aborts the whole sequence, and nothing that already ran is undone.
//!
//! # Teardown discipline
//!
//! [`NamespaceManager::inflate`] hands back a live namespace and makes its
//! teardown the caller's problem. [`NamespaceManager::with_namespace`] is
//! the safer scoped form: it deflates on every exit path, including an
//! error from the work in between. Prefer it unless the namespace really
//! must outlive the call.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::VpnConfig;
use crate::error::{ExecError, NamespaceError};
use crate::exec::{CommandRunner, PrivilegedCommand, PrivilegedExecutor};
use crate::netns::{LogRegistry, Namespace, NamespaceState};

/// Overrides applied on top of the parsed configuration.
///
/// # Example
///
/// ```
/// use vpn_netns::InflateOptions;
///
/// let options = InflateOptions::new()
///     .with_address("10.0.0.2/32")
///     .with_dns("1.1.1.1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InflateOptions {
    /// Interface address; takes precedence over the config's `Address`.
    pub address: Option<String>,
    /// Resolver address; takes precedence over the config's `DNS`.
    /// Carried but not yet applied; no resolver file is generated inside
    /// the namespace.
    pub dns: Option<String>,
}

impl InflateOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interface address override.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the resolver override.
    #[must_use]
    pub fn with_dns(mut self, dns: impl Into<String>) -> Self {
        self.dns = Some(dns.into());
        self
    }
}

/// Provisions and destroys tunnel namespaces.
///
/// Generic over the escalation transport so the same sequencing code runs
/// against sudo, an already-root process, or a recording double in tests.
///
/// # Example
///
/// ```no_run
/// use vpn_netns::{InflateOptions, NamespaceManager, SudoExecutor};
///
/// fn main() -> vpn_netns::Result<()> {
///     let manager = NamespaceManager::new(SudoExecutor::new());
///     let options = InflateOptions::new();
///
///     let namespace = manager.execute("wg0.conf", "curl -s https://example.org", &options, None)?;
///     println!("{}", namespace.name());
///
///     // Later, when the tunnel is no longer needed:
///     manager.deflate_named(namespace.name())?;
///     Ok(())
/// }
/// ```
pub struct NamespaceManager<E> {
    executor: Arc<E>,
    channels: LogRegistry,
}

impl<E: PrivilegedExecutor> NamespaceManager<E> {
    #[must_use]
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            channels: LogRegistry::default(),
        }
    }

    /// The escalation transport this manager drives.
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// A runner that executes commands inside namespaces via this
    /// manager's transport.
    #[must_use]
    pub fn runner(&self) -> CommandRunner<E> {
        CommandRunner::new(Arc::clone(&self.executor))
    }

    /// Provisions a tunnel namespace from the config at `config_path`.
    ///
    /// Runs, in strict order: namespace creation, WireGuard interface
    /// creation, interface move, address assignment, live config apply
    /// (`wg setconf`), link up, default route. Each step is synchronous and
    /// exit-code-checked; the first failure aborts the sequence with the
    /// failing command in the error, leaving already-applied kernel state
    /// in place. The sanitized temp file is gone by the time this returns,
    /// on success and failure alike.
    ///
    /// # Errors
    ///
    /// `NamespaceError::Config` if the config cannot be read,
    /// `NamespaceError::MissingAddress` if neither the config nor `options`
    /// carries an address (detected before any privileged command runs),
    /// `NamespaceError::Exec` if a provisioning step fails.
    #[instrument(skip_all)]
    pub fn inflate(
        &self,
        config_path: impl AsRef<Path>,
        options: &InflateOptions,
    ) -> Result<Namespace, NamespaceError> {
        let config_path = config_path.as_ref();
        debug!(config = %config_path.display(), "Inflating tunnel namespace");

        let config = VpnConfig::parse(config_path)?;

        let address = options
            .address
            .clone()
            .or_else(|| config.address.clone())
            .ok_or(NamespaceError::MissingAddress)?;

        if let Some(dns) = options.dns.as_ref().or(config.dns.as_ref()) {
            // Captured so the directive never reaches `wg setconf`; writing
            // a resolver file inside the namespace is not implemented.
            warn!(%dns, "DNS setting is currently ignored");
        }

        let (name, interface) = Namespace::generate_names();
        let channel = self.channels.channel(&name);
        let mut namespace = Namespace {
            name,
            interface,
            state: NamespaceState::Provisioning,
            channel,
        };

        debug!(
            name = %namespace.name(),
            interface = %namespace.interface(),
            %address,
            "Provisioning namespace"
        );

        let sanitized = config.sanitized()?;
        self.provision(&namespace, &address, sanitized.path())?;
        sanitized.delete()?;

        namespace.state = NamespaceState::Active;
        debug!(name = %namespace.name(), "Namespace active");
        Ok(namespace)
    }

    /// The seven provisioning steps, in dependency order.
    fn provision(
        &self,
        namespace: &Namespace,
        address: &str,
        config: &Path,
    ) -> Result<(), ExecError> {
        let ns = namespace.name();
        let dev = namespace.interface();
        let config = config.to_string_lossy();
        let config = config.as_ref();

        let steps = [
            vec!["ip", "netns", "add", ns],
            vec!["ip", "link", "add", dev, "type", "wireguard"],
            vec!["ip", "link", "set", dev, "netns", ns],
            vec!["ip", "-n", ns, "address", "add", address, "dev", dev],
            vec!["ip", "netns", "exec", ns, "wg", "setconf", dev, config],
            vec!["ip", "-n", ns, "link", "set", dev, "up"],
            vec!["ip", "-n", ns, "route", "add", "default", "dev", dev],
        ];

        for step in steps {
            self.executor.run_checked(&PrivilegedCommand::checked(step))?;
        }
        Ok(())
    }

    /// Destroys a provisioned namespace and releases its log channel.
    #[instrument(skip_all, fields(name = %namespace.name()))]
    pub fn deflate(&self, namespace: &mut Namespace) -> Result<(), NamespaceError> {
        self.deflate_named(&namespace.name)?;
        namespace.state = NamespaceState::Destroyed;
        Ok(())
    }

    /// Tears down a namespace by name alone.
    ///
    /// Meant for names previously returned by a successful
    /// [`inflate`](Self::inflate), whether in this process or an earlier
    /// one. Behavior for any other name is undefined: the delete command is
    /// issued as-is and whatever the kernel says comes back. The namespace
    /// is not checked to be active first.
    ///
    /// # Errors
    ///
    /// `NamespaceError::Exec` if the delete command fails; the log channel
    /// is then left registered.
    pub fn deflate_named(&self, name: &str) -> Result<(), NamespaceError> {
        debug!(%name, "Destroying namespace");
        self.executor
            .run_checked(&PrivilegedCommand::checked(["ip", "netns", "delete", name]))?;
        let _ = self.channels.release(name);
        Ok(())
    }

    /// Inflates a namespace, hands it to `work`, and deflates on every exit
    /// path, including an error from `work` itself.
    ///
    /// When both the work and the teardown fail, the work's error wins and
    /// the teardown failure is logged.
    ///
    /// # Errors
    ///
    /// Whatever `inflate`, `work`, or the teardown produced, in that order
    /// of precedence.
    #[instrument(skip_all)]
    pub fn with_namespace<T, F>(
        &self,
        config_path: impl AsRef<Path>,
        options: &InflateOptions,
        work: F,
    ) -> Result<T, NamespaceError>
    where
        F: FnOnce(&Namespace) -> Result<T, NamespaceError>,
    {
        let mut namespace = self.inflate(config_path, options)?;
        let result = work(&namespace);

        match self.deflate(&mut namespace) {
            Ok(()) => result,
            Err(teardown) => match result {
                Ok(_) => Err(teardown),
                Err(e) => {
                    warn!(error = %teardown, "Teardown also failed after work error");
                    Err(e)
                }
            },
        }
    }

    /// Entry point: provisions a namespace from `config_path` and launches
    /// `command` inside it, de-escalated to `user` (the invoking user when
    /// `None`).
    ///
    /// Returns the live namespace. Teardown is deliberately not part of
    /// this call; pass the namespace to [`deflate`](Self::deflate) when
    /// done, or reach for [`with_namespace`](Self::with_namespace) instead.
    /// The command itself is fire-and-forget: its output lands in the
    /// namespace's log channel and no success or failure signal comes back.
    ///
    /// # Errors
    ///
    /// Same as [`inflate`](Self::inflate); the command launch itself cannot
    /// fail the call.
    #[instrument(skip_all, fields(command = %command))]
    pub fn execute(
        &self,
        config_path: impl AsRef<Path>,
        command: &str,
        options: &InflateOptions,
        user: Option<&str>,
    ) -> Result<Namespace, NamespaceError> {
        let namespace = self.inflate(config_path, options)?;
        self.runner().run(command, &namespace, user);
        Ok(namespace)
    }
}
