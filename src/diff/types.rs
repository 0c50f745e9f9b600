use crate::manifest::{FileEntry, Group};

/// The same path as described by two manifest versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub previous: FileEntry,
    pub current: FileEntry,
}

impl FileDiff {
    pub fn new(previous: FileEntry, current: FileEntry) -> Self {
        Self { previous, current }
    }

    pub fn path(&self) -> &str {
        &self.current.path
    }

    /// Size and hash are independent signals; any disagreement means the
    /// file must be fetched again.
    pub fn needs_update(&self) -> bool {
        self.previous.size != self.current.size
            || self.previous.hash.algorithm != self.current.hash.algorithm
            || self.previous.hash.digest != self.current.hash.digest
    }
}

/// Per-file delta between two versions of a group, correlated by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDiff {
    pub previous: Group,
    pub current: Group,
    pub added_files: Vec<FileEntry>,
    pub removed_files: Vec<FileEntry>,
    pub updated_files: Vec<FileDiff>,
}

impl GroupDiff {
    pub fn name(&self) -> &str {
        &self.current.name
    }

    /// Matched files whose recorded size or hash changed.
    pub fn changed_files(&self) -> impl Iterator<Item = &FileDiff> {
        self.updated_files.iter().filter(|d| d.needs_update())
    }

    pub fn is_unchanged(&self) -> bool {
        self.added_files.is_empty()
            && self.removed_files.is_empty()
            && self.changed_files().next().is_none()
    }
}

/// Delta between two manifests, groups correlated by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestDiff {
    pub added_groups: Vec<Group>,
    pub removed_groups: Vec<Group>,
    pub matched: Vec<GroupDiff>,
}

impl ManifestDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added_groups.is_empty()
            && self.removed_groups.is_empty()
            && self.matched.iter().all(GroupDiff::is_unchanged)
    }
}
