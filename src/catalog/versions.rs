//! Payload versions discovered on local storage.

use crate::InstallerError;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the library folder inside a payload version directory.
pub const LIB_DIR: &str = "lib";

/// Name of the permission descriptor folder inside a payload version directory.
pub const PERMISSIONS_DIR: &str = "permissions";

/// An opaque payload version identifier.
///
/// A version is valid only if a directory with its name exists under the
/// payload root. Ordering is for display only: runs of digits compare
/// numerically, so `2.9.2` sorts before `2.10.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PayloadVersion(String);

impl PayloadVersion {
    pub(crate) fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The version string as it appears on disk.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<payload_root>/<version>/lib`
    pub fn lib_dir(&self, payload_root: &Path) -> PathBuf {
        payload_root.join(&self.0).join(LIB_DIR)
    }

    /// `<payload_root>/<version>/permissions`
    pub fn permissions_dir(&self, payload_root: &Path) -> PathBuf {
        payload_root.join(&self.0).join(PERMISSIONS_DIR)
    }
}

impl fmt::Display for PayloadVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for PayloadVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for PayloadVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare strings with embedded digit runs compared by value.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = if is_digit_run(l) && is_digit_run(r) {
                    cmp_digit_runs(l, r)
                } else {
                    l.cmp(r)
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn is_digit_run(s: &str) -> bool {
    s.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// Compare two digit runs by numeric value without parsing, so runs of
/// any length order correctly.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Split into alternating digit and non-digit runs.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// Lists payload versions under a payload root.
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    payload_root: PathBuf,
}

impl VersionCatalog {
    /// Create a catalog over the given payload root.
    pub fn new(payload_root: impl Into<PathBuf>) -> Self {
        Self {
            payload_root: payload_root.into(),
        }
    }

    /// Every subdirectory of the payload root, as a version.
    pub fn list_versions(&self) -> Result<BTreeSet<PayloadVersion>, InstallerError> {
        let context = || format!("listing payload versions in {}", self.payload_root.display());
        let entries = std::fs::read_dir(&self.payload_root)
            .map_err(|e| InstallerError::io(context(), e))?;

        let mut versions = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| InstallerError::io(context(), e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| InstallerError::io(context(), e))?
                .is_dir();
            if is_dir {
                versions.insert(PayloadVersion::new(
                    entry.file_name().to_string_lossy().into_owned(),
                ));
            }
        }
        Ok(versions)
    }
}

/// Non-directory entries of `dir`, sorted by file name.
///
/// Directory iteration order is platform-dependent; sorting gives every
/// caller the same enumeration order.
pub fn list_payload_files(dir: &Path) -> Result<Vec<PathBuf>, InstallerError> {
    let context = || format!("listing {}", dir.display());
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| InstallerError::io(context(), e))? {
        let entry = entry.map_err(|e| InstallerError::io(context(), e))?;
        let path = entry.path();
        if !path.is_dir() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
