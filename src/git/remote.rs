//! Remote URL classification
//!
//! Turns the user-supplied remote location into a [`RemoteUrl`]. Relative
//! local paths are resolved against the working directory; whether a local
//! path exists or holds a repository is decided later by the configuration
//! flow.

use crate::error::{Result, SyncError};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

const FILE_PROTOCOL_PREFIX: &str = "file://";
const FILE_SCHEME_PREFIX: &str = "file:";
const METADATA_DIR_SUFFIX: &str = "/.git";
const SSH_PREFIXES: [&str; 4] = ["ssh://", "git+ssh://", "ssh+git://", "git@"];

lazy_static! {
    static ref URI_SCHEME: Regex = Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://").unwrap();
}

/// Transport family of a remote location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoteScheme {
    LocalFile,
    Http,
    Https,
    /// ssh, git@host:path and friends; never accepted by [`classify`]
    Ssh,
    /// Any other explicit URI scheme, treated as a network remote
    Other(String),
}

impl RemoteScheme {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http | Self::Https | Self::Other(_))
    }
}

impl fmt::Display for RemoteScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFile => f.write_str("file"),
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
            Self::Ssh => f.write_str("ssh"),
            Self::Other(scheme) => f.write_str(scheme),
        }
    }
}

/// A classified remote location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    raw: String,
    scheme: RemoteScheme,
    location: String,
}

impl RemoteUrl {
    /// The string as the user typed it (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &RemoteScheme {
        &self.scheme
    }

    /// The value stored in the repository's remote configuration.
    ///
    /// For local remotes this is the absolute directory path with the
    /// `file://` prefix and any trailing `/.git` removed.
    pub fn as_str(&self) -> &str {
        &self.location
    }

    pub fn is_local(&self) -> bool {
        self.scheme == RemoteScheme::LocalFile
    }

    /// Directory of a local remote, `None` for network remotes
    pub fn local_path(&self) -> Option<&Path> {
        self.is_local().then(|| Path::new(&self.location))
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Determine the transport family of `raw` without validating it
pub fn scheme_of(raw: &str) -> RemoteScheme {
    let raw = raw.trim();
    if raw.starts_with(FILE_SCHEME_PREFIX) {
        return RemoteScheme::LocalFile;
    }
    if SSH_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return RemoteScheme::Ssh;
    }

    match URI_SCHEME.captures(raw).and_then(|c| c.get(1)) {
        Some(scheme) => match scheme.as_str().to_ascii_lowercase().as_str() {
            "http" => RemoteScheme::Http,
            "https" => RemoteScheme::Https,
            "ssh" => RemoteScheme::Ssh,
            other => RemoteScheme::Other(other.to_string()),
        },
        None => RemoteScheme::LocalFile,
    }
}

/// Classify a remote location.
///
/// Returns `Ok(None)` for a blank string, which means "no remote
/// configured" (local-only mode). A `file:` prefix with no path after it is
/// rejected.
pub fn classify(raw: &str) -> Result<Option<RemoteUrl>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let scheme = scheme_of(raw);
    let location = match &scheme {
        RemoteScheme::Ssh => {
            tracing::debug!(url = raw, "rejecting ssh remote");
            return Err(SyncError::unsupported_scheme("ssh"));
        }
        RemoteScheme::LocalFile => local_location(raw)?,
        _ => raw.to_string(),
    };

    tracing::trace!(url = raw, scheme = %scheme, location = %location, "classified remote url");

    Ok(Some(RemoteUrl {
        raw: raw.to_string(),
        scheme,
        location,
    }))
}

fn strip_file_prefix(raw: &str) -> &str {
    raw.strip_prefix(FILE_PROTOCOL_PREFIX)
        .or_else(|| raw.strip_prefix(FILE_SCHEME_PREFIX))
        .unwrap_or(raw)
}

fn local_location(raw: &str) -> Result<String> {
    let location = normalize_local_path(strip_file_prefix(raw));
    if location.is_empty() {
        return Err(SyncError::EmptyLocalPath {
            url: raw.to_string(),
        });
    }
    let absolute = std::path::absolute(&location).map_err(|e| {
        tracing::debug!(path = %location, error = %e, "cannot resolve local remote");
        SyncError::InvalidPath {
            path: PathBuf::from(&location),
        }
    })?;
    Ok(absolute.to_string_lossy().into_owned())
}

/// Pointing at the metadata directory is the same as pointing at its parent
fn normalize_local_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    let trimmed = trimmed
        .strip_suffix(METADATA_DIR_SUFFIX)
        .or_else(|| trimmed.strip_suffix("\\.git"))
        .unwrap_or(trimmed);

    if trimmed.is_empty() {
        // "/" or "/.git" collapse to the filesystem root
        return path.chars().next().map(String::from).unwrap_or_default();
    }
    trimmed.to_string()
}
