use crate::hash::{HashAlgorithm, HashService};
use crate::manifest::codec::MANIFEST_FILE_NAME;
use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::path;
use crate::manifest::types::{FileEntry, Group, Manifest, UpdatePolicy};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Settings for describing a directory as a single-group manifest.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub name: String,
    pub version: semver::Version,
    pub version_label: String,
    pub group_name: String,
    /// Local path of the group relative to the installed manifest
    pub group_path: String,
    pub remote: String,
    pub update_policy: UpdatePolicy,
    pub algorithm: HashAlgorithm,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: semver::Version::new(0, 1, 0),
            version_label: "0.1.0".into(),
            group_name: "default".into(),
            group_path: ".".into(),
            remote: String::new(),
            update_policy: UpdatePolicy::Overwrite,
            algorithm: HashAlgorithm::Sha256,
        }
    }
}

pub struct ManifestGenerator;

impl ManifestGenerator {
    /// Describe every regular file under `dir` as one group.
    pub async fn generate(dir: &Path, options: &GenerateOptions) -> ManifestResult<Manifest> {
        let group = Self::describe_group(dir, options).await?;
        let manifest = Manifest::new(
            options.name.clone(),
            options.version.clone(),
            options.version_label.clone(),
            vec![group],
        );
        manifest.validate()?;
        Ok(manifest)
    }

    /// Hash all files under `dir` concurrently and assemble the group.
    pub async fn describe_group(dir: &Path, options: &GenerateOptions) -> ManifestResult<Group> {
        path::validate_group_path(&options.group_path)?;

        let root = dir.to_path_buf();
        let relative_paths = tokio::task::spawn_blocking(move || list_files(&root))
            .await
            .map_err(|e| ManifestError::IoError(std::io::Error::other(e)))??;

        info!(
            "Hashing {} files in {} with {}",
            relative_paths.len(),
            dir.display(),
            options.algorithm
        );

        let algorithm = options.algorithm;
        let policy = options.update_policy;
        let mut files: Vec<FileEntry> = stream::iter(relative_paths)
            .map(|(relative, manifest_path)| {
                let full = dir.join(&relative);
                async move {
                    let (size, hash) = HashService::describe_file(algorithm, &full).await?;
                    debug!("Described '{}' ({} bytes)", manifest_path, size);
                    Ok::<_, ManifestError>(FileEntry::new(manifest_path, size, policy, hash))
                }
            })
            .buffer_unordered(num_cpus::get())
            .try_collect()
            .await?;

        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Group::new(
            options.group_name.clone(),
            options.group_path.clone(),
            options.remote.clone(),
            files,
        ))
    }
}

/// Regular files under `root` as (relative path, manifest path) pairs.
/// A manifest file at the top level is not part of the bundle.
fn list_files(root: &Path) -> ManifestResult<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| ManifestError::IoError(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ManifestError::invalid_path(entry.path().display().to_string(), e.to_string()))?
            .to_path_buf();
        if relative.as_os_str() == MANIFEST_FILE_NAME {
            continue;
        }
        let manifest_path = path::to_manifest_path(&relative)?;
        files.push((relative, manifest_path));
    }
    Ok(files)
}
