//! Relative path rules for manifest entries.
//!
//! Manifest paths are always forward-slash separated and must stay inside the
//! directory they are resolved against: no absolute paths, no drive prefixes,
//! no `.`/`..` segments.

use crate::manifest::error::{ManifestError, ManifestResult};
use std::path::{Component, Path, PathBuf};

/// Check a file path as it appears in a manifest.
pub fn validate_file_path(path: &str) -> ManifestResult<()> {
    if path.is_empty() {
        return Err(ManifestError::invalid_path(path, "empty path"));
    }
    validate_segments(path)
}

/// Check a group's local path. `"."` and `""` name the manifest directory itself.
pub fn validate_group_path(path: &str) -> ManifestResult<()> {
    if path.is_empty() || path == "." {
        return Ok(());
    }
    validate_segments(path)
}

fn validate_segments(path: &str) -> ManifestResult<()> {
    if path.contains('\\') {
        return Err(ManifestError::invalid_path(path, "backslash separators are not allowed"));
    }
    if path.starts_with('/') {
        return Err(ManifestError::invalid_path(path, "absolute paths are not allowed"));
    }
    for segment in path.split('/') {
        match segment {
            "" => return Err(ManifestError::invalid_path(path, "empty segment")),
            "." | ".." => {
                return Err(ManifestError::invalid_path(path, "parent traversal not allowed"))
            }
            s if s.contains(':') => {
                return Err(ManifestError::invalid_path(path, "drive prefixes are not allowed"))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Join a validated manifest path onto `root`.
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    if path.is_empty() || path == "." {
        return root.to_path_buf();
    }
    path.split('/').fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Convert a path relative to a scanned directory into manifest form.
pub fn to_manifest_path(relative: &Path) -> ManifestResult<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| {
                    ManifestError::invalid_path(relative.display().to_string(), "not valid UTF-8")
                })?;
                segments.push(segment);
            }
            Component::CurDir => {}
            _ => {
                return Err(ManifestError::invalid_path(
                    relative.display().to_string(),
                    "path is not relative to the scanned directory",
                ))
            }
        }
    }

    let joined = segments.join("/");
    validate_file_path(&joined)?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_nested_paths() {
        assert!(validate_file_path("a.txt").is_ok());
        assert!(validate_file_path("bin/lib/x.so").is_ok());
        assert!(validate_file_path("with space/ü.txt").is_ok());
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        for bad in ["", "/etc/passwd", "../up", "a/../b", "./a", "a//b", "a\\b", "C:/x", "a/"] {
            assert!(validate_file_path(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_group_path_allows_current_dir() {
        assert!(validate_group_path(".").is_ok());
        assert!(validate_group_path("").is_ok());
        assert!(validate_group_path("assets").is_ok());
        assert!(validate_group_path("../assets").is_err());
    }

    #[test]
    fn test_resolve() {
        let root = Path::new("/tmp/root");
        assert_eq!(resolve(root, "a/b.txt"), root.join("a").join("b.txt"));
        assert_eq!(resolve(root, "."), root.to_path_buf());
    }

    #[test]
    fn test_to_manifest_path() {
        let relative = Path::new("dir").join("file.bin");
        assert_eq!(to_manifest_path(&relative).unwrap(), "dir/file.bin");
        assert!(to_manifest_path(Path::new("../x")).is_err());
    }
}
