//! Transient exchange directory shared with one engine run.
//!
//! Each run gets its own uniquely named directory holding only the request and result
//! files. The directory is removed when the `Workspace` is released or dropped, so every
//! exit path (success, error, panic unwinding, cancellation) leaves nothing behind.

use crate::error::{Result, TsneError};
use crate::protocol::ExchangeFiles;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every exchange directory name.
pub const WORKSPACE_PREFIX: &str = "bhtsne-";

/// Exclusively owned exchange directory.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    files: ExchangeFiles,
}

impl Workspace {
    /// Create a fresh directory under `root`, or under the system temp dir.
    pub fn acquire(root: Option<&Path>, files: &ExchangeFiles) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => builder
                .tempdir_in(root)
                .map_err(|e| TsneError::workspace(root, e))?,
            None => builder
                .tempdir()
                .map_err(|e| TsneError::workspace(std::env::temp_dir(), e))?,
        };

        debug!("Acquired workspace {}", dir.path().display());

        Ok(Self {
            dir,
            files: files.clone(),
        })
    }

    /// Directory the engine runs in.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files(&self) -> &ExchangeFiles {
        &self.files
    }

    pub fn request_path(&self) -> PathBuf {
        self.path().join(&self.files.request)
    }

    pub fn result_path(&self) -> PathBuf {
        self.path().join(&self.files.result)
    }

    /// Remove the directory, reporting failures instead of swallowing them.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| TsneError::workspace(&path, e))?;
        debug!("Removed workspace {}", path.display());
        Ok(())
    }

    /// Remove the directory after a computation finished with `outcome`.
    ///
    /// A failed computation keeps its own error; a cleanup failure on top of it is only
    /// logged. A cleanup failure after a successful computation is returned.
    pub fn release<T>(self, outcome: Result<T>) -> Result<T> {
        match (outcome, self.close()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                warn!("Workspace cleanup failed after error ({}): {}", e, cleanup);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_acquire_and_close() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path()), &ExchangeFiles::default()).unwrap();
        let path = ws.path().to_path_buf();

        assert!(path.is_dir());
        assert!(path.starts_with(root.path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));
        assert_eq!(ws.request_path(), path.join("data.dat"));
        assert_eq!(ws.result_path(), path.join("result.dat"));

        fs::write(ws.request_path(), b"request").unwrap();
        fs::write(ws.result_path(), b"result").unwrap();
        ws.close().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire(Some(root.path()), &ExchangeFiles::default()).unwrap();
            fs::write(ws.request_path(), b"request").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_paths_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(Some(root.path()), &ExchangeFiles::default()).unwrap();
        let b = Workspace::acquire(Some(root.path()), &ExchangeFiles::default()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_custom_file_names() {
        let files = ExchangeFiles {
            request: "in.bin".to_string(),
            result: "out.bin".to_string(),
        };
        let ws = Workspace::acquire(None, &files).unwrap();
        assert!(ws.request_path().ends_with("in.bin"));
        assert!(ws.result_path().ends_with("out.bin"));
    }

    #[test]
    fn test_missing_root_is_workspace_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does/not/exist");
        let err = Workspace::acquire(Some(&missing), &ExchangeFiles::default()).unwrap_err();
        assert!(matches!(err, TsneError::Workspace { .. }));
    }

    #[test]
    fn test_release_keeps_computation_error() {
        let ws = Workspace::acquire(None, &ExchangeFiles::default()).unwrap();
        // Make the final removal fail
        fs::remove_dir_all(ws.path()).unwrap();

        let outcome: Result<()> = Err(TsneError::EngineExecution("boom".to_string()));
        let err = ws.release(outcome).unwrap_err();
        assert!(matches!(err, TsneError::EngineExecution(_)));
    }

    #[test]
    fn test_release_reports_cleanup_failure_after_success() {
        let ws = Workspace::acquire(None, &ExchangeFiles::default()).unwrap();
        fs::remove_dir_all(ws.path()).unwrap();

        let err = ws.release(Ok(42)).unwrap_err();
        assert!(matches!(err, TsneError::Workspace { .. }));
    }

    #[test]
    fn test_release_success() {
        let ws = Workspace::acquire(None, &ExchangeFiles::default()).unwrap();
        let path = ws.path().to_path_buf();
        assert_eq!(ws.release(Ok(42)).unwrap(), 42);
        assert!(!path.exists());
    }
}
