//! wg-quick configuration translation.
//!
//! A wg-quick file mixes tunnel directives (keys, peers, endpoints) with
//! host-side directives that `wg setconf` rejects: `Address` assigns the
//! interface IP and `DNS` names the resolver, and both belong to the
//! provisioning layer, not the tunnel daemon. This module parses a config,
//! captures those two values, and writes every remaining line verbatim to a
//! temporary file suitable for a live `wg setconf` apply.
//!
//! Translation is a pure function of the file contents: no network access,
//! no privileged calls.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::error::ConfigError;

/// A parsed wg-quick configuration.
///
/// Immutable once parsed: holds the pass-through directive lines in their
/// original order plus whatever host-side values were present.
#[derive(Debug, Clone)]
pub struct VpnConfig {
    /// Path the config was read from.
    pub path: PathBuf,
    /// Directive lines with `Address` and `DNS` removed, original order.
    pub directives: Vec<String>,
    /// Captured `Address = ...` value, if present.
    pub address: Option<String>,
    /// Captured `DNS = ...` value, if present. Captured so it never reaches
    /// `wg setconf`; resolver file generation inside the namespace is not
    /// implemented, so the value is otherwise unused.
    pub dns: Option<String>,
}

impl VpnConfig {
    /// Parses the wg-quick config at `path`.
    ///
    /// Lines matching `Address = <value>` or `DNS = <value>` are captured
    /// and dropped. Everything else, section headers and comments and
    /// blank lines included, passes through untouched and in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file is missing or unreadable.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut directives = Vec::new();
        let mut address = None;
        let mut dns = None;

        for line in content.lines() {
            match split_directive(line) {
                Some(("Address", value)) => {
                    trace!(%value, "Captured Address directive");
                    address = Some(value.to_string());
                }
                Some(("DNS", value)) => {
                    trace!(%value, "Captured DNS directive");
                    dns = Some(value.to_string());
                }
                _ => directives.push(line.to_string()),
            }
        }

        debug!(
            path = %path.display(),
            directives = directives.len(),
            has_address = address.is_some(),
            has_dns = dns.is_some(),
            "Parsed wg-quick config"
        );

        Ok(Self {
            path: path.to_path_buf(),
            directives,
            address,
            dns,
        })
    }

    /// Writes the pass-through directives to a fresh temporary file.
    ///
    /// The returned handle owns the file. Keys are inside, so the file is
    /// created with owner-only permissions (tempfile's default).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` if the temp file cannot be created or
    /// written.
    pub fn sanitized(&self) -> Result<SanitizedConfig, ConfigError> {
        let mut file = tempfile::Builder::new()
            .prefix("wg-setconf-")
            .suffix(".conf")
            .tempfile()
            .map_err(|e| ConfigError::Write {
                context: "failed to create temp file".to_string(),
                source: e,
            })?;

        for line in &self.directives {
            writeln!(file, "{line}").map_err(|e| ConfigError::Write {
                context: format!("failed to write to {}", file.path().display()),
                source: e,
            })?;
        }

        file.flush().map_err(|e| ConfigError::Write {
            context: format!("failed to flush {}", file.path().display()),
            source: e,
        })?;

        trace!(path = %file.path().display(), "Wrote sanitized config");
        Ok(SanitizedConfig { file })
    }
}

/// Splits a `Key = Value` directive, tolerating whitespace around `=`.
///
/// Lines without `=` (section headers, blanks) return `None`.
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Ephemeral `setconf`-compatible file produced by [`VpnConfig::sanitized`].
///
/// Owned by exactly one provisioning attempt. The backing file is removed
/// when the handle is dropped, whatever happened to the apply step that
/// consumed it.
pub struct SanitizedConfig {
    file: NamedTempFile,
}

impl SanitizedConfig {
    /// Path of the backing temp file, for handing to `wg setconf`.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the backing file.
    ///
    /// Dropping the handle deletes it too; this form surfaces the error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` if removal fails.
    pub fn delete(self) -> Result<(), ConfigError> {
        let path = self.file.path().to_path_buf();
        trace!(path = %path.display(), "Deleting sanitized config");
        self.file.close().map_err(|e| ConfigError::Write {
            context: format!("failed to remove {}", path.display()),
            source: e,
        })
    }
}

impl fmt::Debug for SanitizedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanitizedConfig")
            .field("path", &self.file.path())
            .finish()
    }
}
