//! Collaborator identity set and its file-backed repository.
//!
//! # Responsibility
//! - Model the set of remote collaborator identities known locally.
//! - Persist the set as a JSON array of strings in one fixed-name file.
//!
//! # Invariants
//! - A missing file loads as the empty set.
//! - Identities are trimmed and never empty.
//! - File writes are atomic (temp file + rename) and sorted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Default file name inside the application-support directory.
pub const COLLABORATORS_FILE_NAME: &str = "collaborators.json";

pub type RepoResult<T> = Result<T, RepoError>;

/// Collaborator persistence errors.
#[derive(Debug)]
pub enum RepoError {
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidIdentity(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "collaborator file I/O failed: {err}"),
            Self::Json(err) => write!(f, "collaborator file is not valid JSON: {err}"),
            Self::InvalidIdentity(value) => {
                write!(f, "collaborator identity is invalid: `{value}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::InvalidIdentity(_) => None,
        }
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Set of collaborator owner identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollaboratorSet {
    identities: BTreeSet<String>,
}

impl CollaboratorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one identity. Returns `true` when it was not present yet.
    pub fn insert(&mut self, identity: &str) -> RepoResult<bool> {
        let normalized = normalize_identity(identity)?;
        Ok(self.identities.insert(normalized))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity.trim())
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Identities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.identities.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for CollaboratorSet {
    /// Collects identities, skipping blank values.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for identity in iter {
            let _ = set.insert(identity.as_ref());
        }
        set
    }
}

/// Returns the trimmed identity, or an error when it is blank.
pub fn normalize_identity(identity: &str) -> RepoResult<String> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidIdentity(identity.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Encodes a set into its persisted JSON form.
pub fn encode_collaborators(set: &CollaboratorSet) -> RepoResult<Vec<u8>> {
    Ok(serde_json::to_vec(set)?)
}

/// Decodes the persisted JSON form.
///
/// Duplicates collapse and blank entries are dropped.
pub fn decode_collaborators(bytes: &[u8]) -> RepoResult<CollaboratorSet> {
    let raw: Vec<String> = serde_json::from_slice(bytes)?;
    Ok(raw.into_iter().collect())
}

/// Persistence contract for the collaborator set.
pub trait CollaboratorRepository: Send + Sync {
    /// Loads the persisted set. Absent storage is the empty set.
    fn load(&self) -> RepoResult<CollaboratorSet>;

    /// Replaces the persisted set.
    fn save(&self, set: &CollaboratorSet) -> RepoResult<()>;
}

/// JSON file repository rooted in the application-support directory.
#[derive(Debug, Clone)]
pub struct FileCollaboratorRepository {
    path: PathBuf,
}

impl FileCollaboratorRepository {
    /// Uses `<app_support_dir>/collaborators.json`.
    pub fn in_dir(app_support_dir: impl AsRef<Path>) -> Self {
        Self::at_path(app_support_dir.as_ref().join(COLLABORATORS_FILE_NAME))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CollaboratorRepository for FileCollaboratorRepository {
    fn load(&self) -> RepoResult<CollaboratorSet> {
        match std::fs::read(&self.path) {
            Ok(bytes) => decode_collaborators(&bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(CollaboratorSet::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, set: &CollaboratorSet) -> RepoResult<()> {
        let bytes = encode_collaborators(set)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
