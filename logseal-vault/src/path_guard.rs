//! Path validation gate for cryptographic operations.
//!
//! Every encrypt/decrypt touches the filesystem only through paths this
//! guard has approved: canonically contained in the configured log root
//! and named according to the artifact role. Validation fails closed and
//! performs no writes; anything it cannot resolve is a rejection, never
//! a warning.

use crate::error::{VaultError, VaultResult};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Plaintext recording extensions (transcript and timing file).
pub const PLAINTEXT_SUFFIXES: [&str; 2] = [".log", ".timing"];

/// Ciphertext extensions, derived from the plaintext ones.
pub const CIPHERTEXT_SUFFIXES: [&str; 2] = [".log.enc", ".timing.enc"];

/// Wrapped-key suffixes appended to a ciphertext name, in probe order.
/// `.key.enc` is a migration shim for pre-rotation corpora and goes away
/// once those are re-encrypted.
pub const WRAPPED_KEY_SUFFIXES: [&str; 2] = [".aes.enc", ".key.enc"];

/// What a candidate path is expected to hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactRole {
    Plaintext,
    Ciphertext,
    WrappedKey,
}

impl ArtifactRole {
    /// Whether `name` matches this role's naming convention.
    fn matches(self, name: &str) -> bool {
        match self {
            ArtifactRole::Plaintext => suffix_match(name, &PLAINTEXT_SUFFIXES),
            ArtifactRole::Ciphertext => suffix_match(name, &CIPHERTEXT_SUFFIXES),
            ArtifactRole::WrappedKey => CIPHERTEXT_SUFFIXES.iter().any(|ct| {
                WRAPPED_KEY_SUFFIXES
                    .iter()
                    .any(|wk| suffix_match(name, &[&format!("{ct}{wk}")]))
            }),
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactRole::Plaintext => "plaintext",
            ArtifactRole::Ciphertext => "ciphertext",
            ArtifactRole::WrappedKey => "wrapped key",
        })
    }
}

fn suffix_match(name: &str, suffixes: &[impl AsRef<str>]) -> bool {
    suffixes.iter().any(|s| {
        let s = s.as_ref();
        name.len() > s.len() && name.ends_with(s)
    })
}

/// Validates candidate paths against the configured log root.
#[derive(Clone, Debug)]
pub struct PathGuard {
    log_root: PathBuf,
}

impl PathGuard {
    /// Creates a guard rooted at `log_root`, which must exist.
    pub fn new(log_root: impl AsRef<Path>) -> VaultResult<Self> {
        let log_root = log_root.as_ref();
        let canonical = log_root.canonicalize().map_err(|e| {
            VaultError::PathViolation(format!("log root {}: {e}", log_root.display()))
        })?;
        if !canonical.is_dir() {
            return Err(VaultError::PathViolation(format!(
                "log root {} is not a directory",
                canonical.display()
            )));
        }
        Ok(Self { log_root: canonical })
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    /// Validates `candidate` for `role`, returning its canonical path.
    ///
    /// Naming and traversal checks run before any filesystem access, so a
    /// probe like `../../etc/passwd` is rejected without a single stat.
    /// Output paths (not yet on disk) are resolved via their parent
    /// directory, which must already exist inside the root.
    pub fn validate(&self, candidate: &Path, role: ArtifactRole) -> VaultResult<PathBuf> {
        let name = candidate
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                VaultError::PathViolation(format!(
                    "{} has no usable file name",
                    candidate.display()
                ))
            })?;

        if !role.matches(name) {
            return Err(VaultError::PathViolation(format!(
                "{} does not match the {role} naming convention",
                candidate.display()
            )));
        }

        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(VaultError::PathViolation(format!(
                "{} contains parent-directory components",
                candidate.display()
            )));
        }

        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.log_root.join(candidate)
        };

        // Lexical containment first; only contained paths reach the fs.
        if !absolute.starts_with(&self.log_root) {
            return Err(VaultError::PathViolation(format!(
                "{} is outside the log root {}",
                candidate.display(),
                self.log_root.display()
            )));
        }

        let canonical = if absolute.exists() {
            absolute.canonicalize().map_err(|e| {
                VaultError::PathViolation(format!("{}: {e}", absolute.display()))
            })?
        } else {
            let parent = absolute.parent().ok_or_else(|| {
                VaultError::PathViolation(format!("{} has no parent", absolute.display()))
            })?;
            let parent = parent.canonicalize().map_err(|_| {
                VaultError::PathViolation(format!(
                    "parent directory of {} does not exist",
                    absolute.display()
                ))
            })?;
            parent.join(name)
        };

        // Re-check after symlink resolution.
        if !canonical.starts_with(&self.log_root) {
            return Err(VaultError::PathViolation(format!(
                "{} resolves outside the log root",
                candidate.display()
            )));
        }

        Ok(canonical)
    }
}
