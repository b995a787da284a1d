pub mod apply;
pub mod check;
pub mod init;
pub mod inspect;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};

use anyhow::{Context, Result};
use blockform_common::{read_document, RealFileSystem};
use blockform_model::TemplateDocument;
use std::path::{Path, PathBuf};

/// Resolve `path` against the working directory
pub(crate) fn resolve(cwd: &str, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(cwd).join(path)
    }
}

pub(crate) fn load_document(path: &Path) -> Result<TemplateDocument> {
    read_document(&RealFileSystem, path).with_context(|| format!("loading {}", path.display()))
}
