use crate::hash::error::{HashError, HashResult};
use crate::hash::types::{HashAlgorithm, HashDescriptor};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Running digest state, one variant per supported algorithm.
enum DigestState {
    None,
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::None => DigestState::None,
            HashAlgorithm::Sha256 => DigestState::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::None => {}
            DigestState::Sha256(hasher) => hasher.update(data),
            DigestState::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            DigestState::None => Vec::new(),
            DigestState::Sha256(hasher) => hasher.finalize().to_vec(),
            DigestState::Blake3(hasher) => hasher.finalize().as_bytes().to_vec(),
        }
    }
}

pub struct HashService;

impl HashService {
    /// Digest of an in-memory buffer
    pub fn digest_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        let mut state = DigestState::new(algorithm);
        state.update(data);
        state.finalize()
    }

    /// Digest of a stream, read to exhaustion. `None` skips reading entirely.
    pub async fn digest_reader<R>(algorithm: HashAlgorithm, reader: &mut R) -> HashResult<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        if algorithm == HashAlgorithm::None {
            return Ok(Vec::new());
        }

        let mut state = DigestState::new(algorithm);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            state.update(&buffer[..n]);
        }

        Ok(state.finalize())
    }

    /// Digest of a file on disk (streaming)
    pub async fn digest_file(algorithm: HashAlgorithm, path: &Path) -> HashResult<Vec<u8>> {
        let mut file = Self::open(path).await?;
        Self::digest_reader(algorithm, &mut file).await
    }

    /// Hash a file and report its size, for building manifest entries.
    pub async fn describe_file(
        algorithm: HashAlgorithm,
        path: &Path,
    ) -> HashResult<(u64, HashDescriptor)> {
        let mut file = Self::open(path).await?;
        let size = file.metadata().await?.len();
        let digest = Self::digest_reader(algorithm, &mut file).await?;
        Ok((size, HashDescriptor::new(algorithm, digest)))
    }

    /// Recompute a file's digest and compare it with `expected`.
    /// Returns the actual digest on mismatch.
    pub async fn verify_file(expected: &HashDescriptor, path: &Path) -> HashResult<Option<Vec<u8>>> {
        let actual = Self::digest_file(expected.algorithm, path).await?;
        if expected.matches(&actual) {
            Ok(None)
        } else {
            Ok(Some(actual))
        }
    }

    async fn open(path: &Path) -> HashResult<tokio::fs::File> {
        tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HashError::FileNotFound(path.display().to_string())
            } else {
                HashError::IoError(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824";

    #[test]
    fn test_none_is_empty() {
        assert!(HashService::digest_bytes(HashAlgorithm::None, b"anything").is_empty());
    }

    #[test]
    fn test_sha256_known_value() {
        let digest = HashService::digest_bytes(HashAlgorithm::Sha256, b"hello");
        assert_eq!(hex::encode_upper(digest), HELLO_SHA256);
    }

    #[test]
    fn test_blake3_matches_crate() {
        let digest = HashService::digest_bytes(HashAlgorithm::Blake3, b"hello");
        assert_eq!(digest, blake3::hash(b"hello").as_bytes().to_vec());
    }

    #[tokio::test]
    async fn test_reader_consumes_whole_stream() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader = data.as_slice();

        let streamed = HashService::digest_reader(HashAlgorithm::Sha256, &mut reader)
            .await
            .unwrap();

        assert_eq!(streamed, HashService::digest_bytes(HashAlgorithm::Sha256, &data));
    }

    #[tokio::test]
    async fn test_describe_and_verify_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let (size, descriptor) = HashService::describe_file(HashAlgorithm::Sha256, &path)
            .await
            .unwrap();
        assert_eq!(size, 5);
        assert_eq!(descriptor.digest_hex(), HELLO_SHA256);
        assert!(HashService::verify_file(&descriptor, &path).await.unwrap().is_none());

        tokio::fs::write(&path, b"jello").await.unwrap();
        let mismatch = HashService::verify_file(&descriptor, &path).await.unwrap();
        assert!(mismatch.is_some());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = HashService::digest_file(HashAlgorithm::Sha256, &temp_dir.path().join("nope")).await;
        assert!(matches!(result, Err(HashError::FileNotFound(_))));
    }
}
