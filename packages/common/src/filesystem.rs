use crate::error::{CommonError, CommonResult};
use blockform_model::TemplateDocument;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File system abstraction for loading and saving documents
pub trait FileSystem {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> CommonResult<String>;

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()>;
}

/// Load and version-check a persisted document
pub fn read_document(fs: &dyn FileSystem, path: &Path) -> CommonResult<TemplateDocument> {
    let source = fs.read_to_string(path)?;
    Ok(TemplateDocument::from_json(&source)?)
}

pub fn write_document(fs: &dyn FileSystem, path: &Path, doc: &TemplateDocument) -> CommonResult<()> {
    fs.write(path, &doc.to_json_pretty()?)
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(std::fs::write(path, contents)?)
    }
}

/// In-memory file system for testing
#[derive(Default)]
pub struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.into());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        let files = self
            .files
            .lock()
            .map_err(|_| CommonError::Generic("mock file system lock poisoned".to_string()))?;
        files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
            .into()
        })
    }

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()> {
        self.add_file(path, contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_file_system_round_trip() {
        let fs = MockFileSystem::new();
        let path = Path::new("templates/invoice.json");

        assert!(!fs.exists(path));
        assert!(fs.read_to_string(path).is_err());

        fs.write(path, "{}").unwrap();
        assert!(fs.exists(path));
        assert_eq!(fs.read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_document_round_trip_through_file_system() {
        let fs = MockFileSystem::new();
        let path = Path::new("invoice.json");
        let doc = TemplateDocument::with_root("root", "root-body");

        write_document(&fs, path, &doc).unwrap();
        assert_eq!(read_document(&fs, path).unwrap(), doc);
    }

    #[test]
    fn test_read_document_reports_bad_version() {
        let fs = MockFileSystem::new();
        fs.add_file("old.json", r#"{ "modelVersion": 0, "root": "r", "nodes": {}, "slots": {} }"#);

        let err = read_document(&fs, Path::new("old.json")).unwrap_err();
        assert!(matches!(err, crate::CommonError::Model(_)));
    }
}
