//! Module loading - turns files into validated values
//!
//! Every failure here degrades to "this module is absent"; nothing is
//! propagated to the caller.

use std::ffi::OsStr;
use std::fs::FileType;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::application::errors::ModuleError;
use crate::domain::entities::Value;

/// Backend that knows how to turn one file into a module export
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Extension (without the dot) of files this loader can import
    fn extension(&self) -> &str;

    /// Load the module at an absolute path and return its primary export
    async fn import(&self, path: &Path) -> Result<Value, ModuleError>;
}

/// Resolve `path` to an absolute location that exists on disk
pub async fn resolve(path: &Path) -> Result<PathBuf, ModuleError> {
    let absolute = std::path::absolute(path).map_err(|source| ModuleError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::metadata(&absolute)
        .await
        .map_err(|source| ModuleError::Resolve {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(absolute)
}

/// Load one module, logging and returning `None` on any failure
pub async fn load_module(loader: &dyn ModuleLoader, path: &Path) -> Option<Value> {
    let result = match resolve(path).await {
        Ok(absolute) => loader.import(&absolute).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to load module");
            None
        }
    }
}

/// Load every eligible file in `directory` and keep the values `accept` approves.
///
/// Only regular files carrying the loader's extension are considered, in
/// lexical order. A directory that cannot be listed yields nothing.
pub async fn load_modules_from_directory<F>(
    loader: &dyn ModuleLoader,
    directory: &Path,
    accept: F,
) -> Vec<Value>
where
    F: Fn(&Value) -> bool,
{
    let mut modules = Vec::new();

    let entries = match read_dir_sorted(directory).await {
        Ok(entries) => entries,
        Err(e) => {
            error!(dir = %directory.display(), error = %e, "Failed to load modules from directory");
            return modules;
        }
    };

    let extension = OsStr::new(loader.extension());
    for (path, file_type) in entries {
        if !file_type.is_file() || path.extension() != Some(extension) {
            continue;
        }

        let Some(value) = load_module(loader, &path).await else {
            continue;
        };

        if accept(&value) {
            modules.push(value);
        } else {
            debug!(path = %path.display(), "Module export has the wrong shape, skipping");
        }
    }

    modules
}

/// Direct entries of `dir` sorted by file name
pub(crate) async fn read_dir_sorted(dir: &Path) -> io::Result<Vec<(PathBuf, FileType)>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        if let Some(listed) = keep_entry(entry.path(), entry.file_type().await) {
            entries.push(listed);
        }
    }

    entries.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// An entry whose type cannot be read is skipped; its siblings still load
fn keep_entry(path: PathBuf, file_type: io::Result<FileType>) -> Option<(PathBuf, FileType)> {
    match file_type {
        Ok(file_type) => Some((path, file_type)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable directory entry, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(keep_entry(PathBuf::from("plugins/locked"), Err(err)).is_none());
    }

    #[tokio::test]
    async fn test_read_dir_sorted_lists_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mod", "a.mod", "c"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<_> = read_dir_sorted(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mod", "b.mod", "c"]);
    }
}
