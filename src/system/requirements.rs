//! System requirements checking implementation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::unistd::Uid;
use tracing::debug;

use crate::error::{Result, SystemRequirementsError};

/// Directories searched for the external tools.
///
/// A fixed list rather than `$PATH`: the elevated context may have a
/// different or empty search path, so only canonical system locations
/// count.
const TOOL_DIRS: &[&str] = &[
    "/usr/sbin",
    "/usr/bin",
    "/sbin",
    "/bin",
    "/usr/local/sbin",
    "/usr/local/bin",
];

/// How privileged commands will be escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Already running as root.
    Root,
    /// Passwordless sudo is available.
    Sudo,
}

impl std::fmt::Display for Escalation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Sudo => write!(f, "sudo"),
        }
    }
}

/// Results of all system requirements checks.
#[derive(Debug, Clone)]
pub struct SystemRequirements {
    /// Resolved path of the `ip` tool (iproute2).
    pub ip_path: PathBuf,
    /// Resolved path of the `wg` tool (wireguard-tools).
    pub wg_path: PathBuf,
    /// Whether the kernel supports network namespaces.
    pub netns: bool,
    /// How privileged commands will run.
    pub escalation: Escalation,
}

impl SystemRequirements {
    /// Check if all requirements are met.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.netns && self.ip_path.exists() && self.wg_path.exists()
    }
}

/// Check all system requirements and return detailed results.
///
/// Returns `Ok(SystemRequirements)` with all check results, or `Err` with
/// the first failing requirement.
pub fn check_all() -> Result<SystemRequirements> {
    let ip_path = check_tool("ip", "iproute2")?;
    let wg_path = check_tool("wg", "wireguard-tools")?;
    let netns = check_netns()?;
    let escalation = check_escalation()?;

    Ok(SystemRequirements {
        ip_path,
        wg_path,
        netns,
        escalation,
    })
}

/// Locate `tool` in the fixed system directories.
///
/// # Errors
///
/// Returns `SystemRequirementsError::MissingTool` naming the package to
/// install if the tool is nowhere to be found.
pub fn check_tool(tool: &'static str, package: &'static str) -> Result<PathBuf> {
    for dir in TOOL_DIRS {
        let candidate = Path::new(dir).join(tool);
        if candidate.exists() {
            debug!(%tool, path = %candidate.display(), "Found tool");
            return Ok(candidate);
        }
    }

    Err(SystemRequirementsError::MissingTool { tool, package }.into())
}

/// Check the kernel supports network namespaces.
///
/// `/proc/self/ns/net` exists on any kernel built with `CONFIG_NET_NS=y`.
///
/// # Errors
///
/// Returns `SystemRequirementsError::NamespacesUnavailable` otherwise.
pub fn check_netns() -> Result<bool> {
    if Path::new("/proc/self/ns/net").exists() {
        Ok(true)
    } else {
        Err(SystemRequirementsError::NamespacesUnavailable.into())
    }
}

/// Check a non-interactive path to root exists.
///
/// Root processes pass trivially; otherwise `sudo -n true` probes whether
/// sudo works without a prompt; a provisioning sequence must never stall
/// waiting for a password.
///
/// # Errors
///
/// Returns `SystemRequirementsError::EscalationUnavailable` if neither
/// path works.
pub fn check_escalation() -> Result<Escalation> {
    if Uid::effective().is_root() {
        return Ok(Escalation::Root);
    }

    let probe = Command::new("sudo")
        .args(["-n", "true"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match probe {
        Ok(status) if status.success() => Ok(Escalation::Sudo),
        _ => Err(SystemRequirementsError::EscalationUnavailable.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_check_tool_finds_sh() {
        // /bin/sh is guaranteed on any POSIX host.
        let path = check_tool("sh", "a POSIX shell").expect("sh should exist");
        assert!(path.exists());
    }

    #[test]
    fn test_check_tool_missing_names_tool_and_package() {
        let result = check_tool("definitely-not-a-real-tool-xyz", "some-package");
        match result {
            Err(Error::SystemRequirements(SystemRequirementsError::MissingTool {
                tool,
                package,
            })) => {
                assert_eq!(tool, "definitely-not-a-real-tool-xyz");
                assert_eq!(package, "some-package");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_check_netns_on_linux() {
        assert!(check_netns().expect("netns should be supported"));
    }
}
