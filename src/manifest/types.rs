use crate::hash::HashDescriptor;
use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::path;
use crate::manifest::MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// How a fetched file is merged into an existing local copy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum UpdatePolicy {
    /// Existing files are replaced
    #[default]
    Overwrite,
    /// Treated as `Overwrite`: files are always re-fetched whole
    Append,
    /// Only fetched while no local copy exists
    NewOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Forward-slash path relative to the group directory
    pub path: String,
    pub size: u64,
    pub update_policy: UpdatePolicy,
    pub hash: HashDescriptor,
}

impl FileEntry {
    pub fn new(
        path: impl Into<String>,
        size: u64,
        update_policy: UpdatePolicy,
        hash: HashDescriptor,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            update_policy,
            hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    /// Local directory, relative to the directory holding the manifest
    pub path: String,
    /// Base URI the file paths are resolved against
    pub remote: String,
    pub files: Vec<FileEntry>,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        remote: impl Into<String>,
        files: Vec<FileEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            remote: remote.into(),
            files,
        }
    }

    pub fn file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Directory of this group under `root`.
    pub fn local_dir(&self, root: &Path) -> PathBuf {
        path::resolve(root, &self.path)
    }

    /// Local location of one of this group's files under `root`.
    pub fn local_file(&self, root: &Path, file: &FileEntry) -> PathBuf {
        path::resolve(&self.local_dir(root), &file.path)
    }

    /// Whether the group lives in the manifest directory itself.
    fn is_root(&self) -> bool {
        self.path.is_empty() || self.path == "."
    }

    fn validate(&self) -> ManifestResult<()> {
        path::validate_group_path(&self.path)?;

        let mut seen = HashSet::with_capacity(self.files.len());
        for file in &self.files {
            path::validate_file_path(&file.path)?;
            if self.is_root() && file.path == MANIFEST_FILE_NAME {
                return Err(ManifestError::invalid_path(
                    &file.path,
                    "entry would overwrite the tracked manifest",
                ));
            }

            if !seen.insert(file.path.as_str()) {
                return Err(ManifestError::DuplicateFile {
                    group: self.name.clone(),
                    path: file.path.clone(),
                });
            }

            if !file.hash.is_well_formed() {
                return Err(ManifestError::DigestLength {
                    path: file.path.clone(),
                    algorithm: file.hash.algorithm.to_string(),
                    expected: file.hash.algorithm.digest_len(),
                    actual: file.hash.digest.len(),
                });
            }
        }
        Ok(())
    }
}

/// Versioned description of a bundle: the unit of distribution and of
/// installed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: semver::Version,
    /// Free-form display label, e.g. "2.1.0 (beta)"
    pub version_label: String,
    pub groups: Vec<Group>,
}

impl Manifest {
    pub fn new(
        name: impl Into<String>,
        version: semver::Version,
        version_label: impl Into<String>,
        groups: Vec<Group>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            version_label: version_label.into(),
            groups,
        }
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    /// Structural checks run on every manifest before it is acted on.
    pub fn validate(&self) -> ManifestResult<()> {
        let mut names = HashSet::with_capacity(self.groups.len());
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(ManifestError::DuplicateGroup(group.name.clone()));
            }
            group.validate()?;
        }
        Ok(())
    }
}
