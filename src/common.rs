/*!
# Common Utilities

Shared filesystem helpers used by the batch driver.
*/

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Helper functions for common file and path operations.
pub mod utils {
    use super::*;

    /// Collect all files from a path (file or directory).
    /// If path is a file, returns just that file.
    /// If path is a directory, returns all files in it (and subdirectories if recursive=true).
    pub fn collect_files<P: AsRef<Path>>(path: P, recursive: bool) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let path = path.as_ref();

        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                let entry_path = entry.path();

                if entry_path.is_file() {
                    files.push(entry_path);
                } else if entry_path.is_dir() && recursive {
                    files.extend(collect_files(&entry_path, recursive)?);
                }
            }
        }

        Ok(files)
    }

    /// Create all parent directories for a file path if they don't exist.
    pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use std::fs;

    #[test]
    fn collect_files_finds_files_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let files = collect_files(dir.path(), false).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn collect_files_on_a_single_file_returns_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("only.txt");
        fs::write(&path, b"x").unwrap();

        let files = collect_files(&path, false).unwrap();
        assert_eq!(files, vec![path]);
    }

    #[test]
    fn ensure_dir_exists_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c/file.txt");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.parent().unwrap().is_dir());
    }
}
