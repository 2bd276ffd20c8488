//! Canonical paths for factcheck data.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! | Path | Purpose |
//! |------|---------|
//! | `<home>/index/index.bin` | Vector index snapshot |
//! | `<home>/index/facts_meta.json` | Fact list parallel to the index |
//! | `facts` (config) | Fact corpus CSV |

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::SnapshotPaths;

use super::ResolvedConfig;

/// Subdirectory of home holding the snapshot
pub const INDEX_DIR: &str = "index";

/// Get the factcheck home directory (~/.factcheck)
pub fn factcheck_home() -> Result<PathBuf> {
    Ok(super::config()?.home.clone())
}

/// Get the fact corpus path
pub fn facts_csv() -> Result<PathBuf> {
    Ok(super::config()?.facts.clone())
}

/// Get the snapshot directory (<home>/index)
pub fn snapshot_dir() -> Result<PathBuf> {
    Ok(snapshot_dir_in(&factcheck_home()?))
}

/// Get the snapshot file paths
pub fn snapshot_paths() -> Result<SnapshotPaths> {
    Ok(SnapshotPaths::in_dir(snapshot_dir()?))
}

/// Snapshot directory under an explicit home
pub fn snapshot_dir_in(home: &Path) -> PathBuf {
    home.join(INDEX_DIR)
}

impl ResolvedConfig {
    /// Snapshot file paths for this configuration
    pub fn snapshot_paths(&self) -> SnapshotPaths {
        SnapshotPaths::in_dir(snapshot_dir_in(&self.home))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::{INDEX_FILE, METADATA_FILE};

    #[test]
    fn test_snapshot_lives_under_home() {
        let dir = snapshot_dir_in(Path::new("/data/.factcheck"));
        assert_eq!(dir, PathBuf::from("/data/.factcheck/index"));

        let paths = SnapshotPaths::in_dir(&dir);
        assert_eq!(paths.index, dir.join(INDEX_FILE));
        assert_eq!(paths.metadata, dir.join(METADATA_FILE));
    }
}
