//! Write-then-rename helpers so readers never observe a half-written file.

use std::path::{Path, PathBuf};

/// Longest file name most filesystems accept, in bytes.
const MAX_NAME_LEN: usize = 255;

/// Bytes `temp_sibling` adds around the name: two dots, 32 hex digits, `.part`.
const TEMP_AFFIX_LEN: usize = 39;

/// Hidden temporary path next to `target`, unique per call.
///
/// Long names are cut so the temporary name stays within `MAX_NAME_LEN`.
pub fn temp_sibling(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let budget = MAX_NAME_LEN - TEMP_AFFIX_LEN;
    if name.len() > budget {
        let mut cut = budget;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }

    target.with_file_name(format!(".{}.{}.part", name, uuid::Uuid::new_v4().simple()))
}

/// Create the parent directory of `target` if it is missing.
pub async fn ensure_parent(target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Replace `target` with `contents` via a temporary sibling and a rename.
pub async fn write_atomic(target: &Path, contents: &[u8]) -> std::io::Result<()> {
    ensure_parent(target).await?;
    let temp = temp_sibling(target);
    if let Err(e) = tokio::fs::write(&temp, contents).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    commit(&temp, target).await
}

/// Move a fully written temporary file over `target`.
pub async fn commit(temp: &Path, target: &Path) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::rename(temp, target).await {
        let _ = tokio::fs::remove_file(temp).await;
        return Err(e);
    }
    Ok(())
}
