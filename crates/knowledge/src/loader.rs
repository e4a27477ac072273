//! Directory document loader.

use crate::types::{Document, SOURCE_KEY};
use docqa_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Loads every file with a given extension directly inside a directory.
///
/// Subdirectories are not descended into. Files are returned in file-name
/// order; blank files are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
    extension: String,
}

impl DirectoryLoader {
    /// `extension` is matched case-insensitively, with or without a leading dot.
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> AppResult<Vec<Document>> {
        if !self.dir.is_dir() {
            return Err(AppError::Config(format!(
                "Data directory does not exist: {:?}",
                self.dir
            )));
        }

        let mut documents = Vec::new();

        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                AppError::Io(std::io::Error::other(format!(
                    "Failed to list {:?}: {}",
                    self.dir, e
                )))
            })?;

            let path = entry.path();
            if !entry.file_type().is_file() || !self.matches(path) {
                continue;
            }

            let text = std::fs::read_to_string(path)?;
            if text.trim().is_empty() {
                tracing::warn!("Skipping empty document {:?}", path);
                continue;
            }

            tracing::debug!("Loaded {:?} ({} bytes)", path, text.len());

            let mut document =
                Document::new(text).with_metadata(SOURCE_KEY, path.to_string_lossy());
            if let Some(name) = path.file_name() {
                document = document.with_metadata("file_name", name.to_string_lossy());
            }
            documents.push(document);
        }

        tracing::info!(
            "Loaded {} documents from {:?} (*.{})",
            documents.len(),
            self.dir,
            self.extension
        );

        Ok(documents)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_loads_matching_files_only() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "Second").unwrap();
        fs::write(temp.path().join("a.txt"), "First").unwrap();
        fs::write(temp.path().join("notes.md"), "# ignored").unwrap();

        let docs = DirectoryLoader::new(temp.path(), "txt").load().unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "First");
        assert_eq!(docs[1].text, "Second");
        assert!(docs[0].source().unwrap().ends_with("a.txt"));
        assert_eq!(docs[0].metadata.get("file_name").map(String::as_str), Some("a.txt"));
    }

    #[test]
    fn test_is_not_recursive() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("deep.txt"), "Deep").unwrap();
        fs::write(temp.path().join("top.txt"), "Top").unwrap();

        let docs = DirectoryLoader::new(temp.path(), ".TXT").load().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Top");
    }

    #[test]
    fn test_skips_blank_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("blank.txt"), "  \n").unwrap();

        let docs = DirectoryLoader::new(temp.path(), "txt").load().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let result = DirectoryLoader::new(temp.path().join("missing"), "txt").load();
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
