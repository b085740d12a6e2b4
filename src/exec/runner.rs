//! Command execution inside a provisioned namespace.

use std::sync::Arc;

use nix::unistd::{User, getuid};
use tracing::{debug, instrument, warn};

use crate::exec::{PrivilegedCommand, PrivilegedExecutor};
use crate::netns::Namespace;

/// Runs caller-supplied commands inside an already-provisioned namespace,
/// de-escalated to an ordinary user.
///
/// The composed invocation is `ip netns exec <ns> runuser -u <user> -- sh
/// -c <command>`: enter the namespace's network context, drop from root to
/// the target user, execute through a shell. The caller's command string is
/// the only shell-interpreted piece; every privileged wrapper around it is
/// a typed argument vector.
pub struct CommandRunner<E> {
    executor: Arc<E>,
}

impl<E: PrivilegedExecutor> CommandRunner<E> {
    #[must_use]
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// Launches `command` inside `namespace` as `user` (the invoking user
    /// when `None`).
    ///
    /// Fire and forget: output streams to the namespace's log channel as it
    /// arrives, and no success or failure signal comes back: a command
    /// that dies is only visible in the streamed lines.
    #[instrument(skip_all, fields(namespace = %namespace.name()))]
    pub fn run(&self, command: &str, namespace: &Namespace, user: Option<&str>) {
        let user = user.map_or_else(invoking_user, str::to_owned);
        debug!(%user, %command, "Launching command in namespace");

        let cmd = PrivilegedCommand::streamed([
            "ip",
            "netns",
            "exec",
            namespace.name(),
            "runuser",
            "-u",
            user.as_str(),
            "--",
            "sh",
            "-c",
            command,
        ]);

        self.executor
            .spawn_streaming(&cmd, Arc::clone(namespace.channel()));
    }
}

/// Best-effort name of the user who invoked the process, before any
/// escalation: `SUDO_USER` when running under sudo, otherwise the real uid.
fn invoking_user() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return user;
        }
    }

    match User::from_uid(getuid()) {
        Ok(Some(user)) => user.name,
        _ => {
            warn!("Could not resolve the invoking user, falling back to nobody");
            String::from("nobody")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoking_user_is_nonempty() {
        // Exact value depends on the environment; it must at least resolve.
        assert!(!invoking_user().is_empty());
    }
}
