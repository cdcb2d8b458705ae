//! Media store for event images
//!
//! Deleting media is best-effort: a missing or locked file is logged and
//! forgotten, never fatal to the lifecycle cascade that triggered it.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::warn;

use crate::error::{Error, Result};

/// Releases stored media by opaque path reference
pub trait MediaStore: Send + Sync {
    /// Delete the file behind `path`, best-effort
    fn delete(&self, path: &str);
}

/// Filesystem-backed media store rooted at a base directory
pub struct FsMediaStore {
    base_path: PathBuf,
}

impl FsMediaStore {
    /// Create a media store under the default data directory
    pub fn new() -> Result<Self> {
        let base_path = Self::default_base_path()?;
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Create with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn default_base_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "banquet", "banquet").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().join("media"))
    }

    /// Get the base path for display
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl MediaStore for FsMediaStore {
    fn delete(&self, path: &str) {
        let full = self.base_path.join(path);
        if let Err(e) = fs::remove_file(&full) {
            warn!(path = %full.display(), error = %e, "Failed to delete media file");
        }
    }
}

/// Media store that discards delete requests.
///
/// For tests and deployments without uploaded media.
#[derive(Debug, Default)]
pub struct NullMediaStore;

impl MediaStore for NullMediaStore {
    fn delete(&self, _path: &str) {}
}
