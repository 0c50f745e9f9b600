use crate::fs;
use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::types::Manifest;
use std::path::Path;

/// Well-known name of the manifest inside a tracked directory.
pub const MANIFEST_FILE_NAME: &str = "bundle-manifest.json";

impl Manifest {
    /// Parse and validate a JSON manifest.
    pub fn from_json(bytes: &[u8]) -> ManifestResult<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_json(&self) -> ManifestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a manifest file.
    pub async fn load(path: &Path) -> ManifestResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ManifestError::NotFound(path.display().to_string())
            } else {
                ManifestError::IoError(e)
            }
        })?;
        Self::from_json(&bytes)
    }

    /// Load the manifest tracked in `dir`, if there is one.
    pub async fn load_from_dir(dir: &Path) -> ManifestResult<Option<Self>> {
        match Self::load(&dir.join(MANIFEST_FILE_NAME)).await {
            Ok(manifest) => Ok(Some(manifest)),
            Err(ManifestError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the manifest to `path`, replacing any previous copy wholesale.
    pub async fn save(&self, path: &Path) -> ManifestResult<()> {
        let json = self.to_json()?;
        fs::write_atomic(path, json.as_bytes()).await?;
        Ok(())
    }

    pub async fn save_to_dir(&self, dir: &Path) -> ManifestResult<()> {
        self.save(&dir.join(MANIFEST_FILE_NAME)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashAlgorithm, HashDescriptor, HashService};
    use crate::manifest::{FileEntry, Group, UpdatePolicy};
    use tempfile::TempDir;

    fn sample() -> Manifest {
        let digest = HashService::digest_bytes(HashAlgorithm::Sha256, b"hello");
        Manifest::new(
            "demo",
            semver::Version::parse("2.1.0-beta.1").unwrap(),
            "2.1 beta",
            vec![Group::new(
                "assets",
                "assets",
                "http://localhost/files/",
                vec![
                    FileEntry::new(
                        "a.txt",
                        5,
                        UpdatePolicy::NewOnly,
                        HashDescriptor::new(HashAlgorithm::Sha256, digest),
                    ),
                    FileEntry::new("empty", 0, UpdatePolicy::Append, HashDescriptor::none()),
                ],
            )],
        )
    }

    #[test]
    fn test_json_round_trip() {
        let manifest = sample();
        let json = manifest.to_json().unwrap();
        let parsed = Manifest::from_json(json.as_bytes()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], "2.1.0-beta.1");
        assert_eq!(value["versionLabel"], "2.1 beta");
        let file = &value["groups"][0]["files"][0];
        assert_eq!(file["updatePolicy"], "newOnly");
        assert_eq!(file["hash"]["algorithm"], "sha256");
        assert_eq!(
            file["hash"]["digest"],
            "2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824"
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Manifest::from_json(b"{ not json"), Err(ManifestError::Json(_))));
        assert!(matches!(
            Manifest::from_json(br#"{"name":"x","version":"one","versionLabel":"","groups":[]}"#),
            Err(ManifestError::Json(_))
        ));
    }

    #[test]
    fn test_parse_validates() {
        let mut manifest = sample();
        manifest.groups[0].files[0].path = "../../etc/passwd".into();
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(matches!(
            Manifest::from_json(json.as_bytes()),
            Err(ManifestError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_and_load_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Manifest::load_from_dir(temp_dir.path()).await.unwrap().is_none());

        let manifest = sample();
        manifest.save_to_dir(temp_dir.path()).await.unwrap();

        let loaded = Manifest::load_from_dir(temp_dir.path()).await.unwrap();
        assert_eq!(loaded, Some(manifest));
    }
}
