use crate::diff::types::{FileDiff, GroupDiff, ManifestDiff};
use crate::manifest::{FileEntry, Group, Manifest};
use std::collections::BTreeMap;

/// Computes structural deltas between manifest versions.
///
/// Files correlate by path and groups by name, never by position or content,
/// and every output list is sorted by that key. Diffing the same inputs in any
/// order therefore gives identical results.
pub struct DiffEngine;

impl DiffEngine {
    pub fn diff_groups(previous: &Group, current: &Group) -> GroupDiff {
        let before = by_path(&previous.files);
        let after = by_path(&current.files);

        let added_files = after
            .iter()
            .filter(|(path, _)| !before.contains_key(*path))
            .map(|(_, file)| (*file).clone())
            .collect();

        let removed_files = before
            .iter()
            .filter(|(path, _)| !after.contains_key(*path))
            .map(|(_, file)| (*file).clone())
            .collect();

        let updated_files = before
            .iter()
            .filter_map(|(path, old)| {
                after
                    .get(path)
                    .map(|new| FileDiff::new((*old).clone(), (*new).clone()))
            })
            .collect();

        GroupDiff {
            previous: previous.clone(),
            current: current.clone(),
            added_files,
            removed_files,
            updated_files,
        }
    }

    pub fn diff_manifests(previous: &Manifest, current: &Manifest) -> ManifestDiff {
        let before = by_name(&previous.groups);
        let after = by_name(&current.groups);

        let added_groups = after
            .iter()
            .filter(|(name, _)| !before.contains_key(*name))
            .map(|(_, group)| (*group).clone())
            .collect();

        let removed_groups = before
            .iter()
            .filter(|(name, _)| !after.contains_key(*name))
            .map(|(_, group)| (*group).clone())
            .collect();

        let matched = before
            .iter()
            .filter_map(|(name, old)| after.get(name).map(|new| Self::diff_groups(old, new)))
            .collect();

        ManifestDiff {
            added_groups,
            removed_groups,
            matched,
        }
    }
}

fn by_path(files: &[FileEntry]) -> BTreeMap<&str, &FileEntry> {
    files.iter().map(|f| (f.path.as_str(), f)).collect()
}

fn by_name(groups: &[Group]) -> BTreeMap<&str, &Group> {
    groups.iter().map(|g| (g.name.as_str(), g)).collect()
}
