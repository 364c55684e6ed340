//! Text artifacts on disk.
//!
//! Artifacts are grouped by the folder their source came from:
//! `{output_dir}/{folder}/{stem}.txt`. Within one batch run no two sources
//! are given the same file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::folder_label;

/// `{output_dir}/{enclosing folder}/{source stem}.txt`
pub fn artifact_path(output_dir: &Path, source: &Path) -> PathBuf {
    let dir = match folder_label(source) {
        Some(label) => output_dir.join(label),
        None => output_dir.to_path_buf(),
    };
    dir.join(format!("{}.txt", source_stem(source)))
}

fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Artifact paths handed out during one batch run.
#[derive(Debug, Default)]
pub struct ArtifactNames {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl ArtifactNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the artifact path for `source`.
    ///
    /// A path already claimed in this run gets `_2`, `_3`, ... appended to
    /// the stem. Files left by earlier runs are overwritten.
    pub fn claim(&self, output_dir: &Path, source: &Path) -> PathBuf {
        let base = artifact_path(output_dir, source);
        let mut claimed = match self.claimed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if claimed.insert(base.clone()) {
            return base;
        }

        let stem = source_stem(source);
        let mut n = 2u32;
        loop {
            let candidate = base.with_file_name(format!("{}_{}.txt", stem, n));
            if claimed.insert(candidate.clone()) {
                tracing::debug!(
                    "{} collides with another artifact, using {}",
                    base.display(),
                    candidate.display()
                );
                return candidate;
            }
            n += 1;
        }
    }
}

/// Write extracted text under a freshly claimed artifact path.
///
/// Returns `None` without touching the disk or claiming a name when the
/// text is blank.
pub async fn save_text_artifact(
    names: &ArtifactNames,
    output_dir: &Path,
    source: &Path,
    text: &str,
) -> std::io::Result<Option<PathBuf>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let path = names.claim(output_dir, source);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, text.as_bytes()).await?;
    Ok(Some(path))
}
