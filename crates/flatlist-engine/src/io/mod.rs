use std::fs;
use std::path::{Path, PathBuf};

use crate::editing::Document;
use crate::models::IdGenerator;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is not valid UTF-8: {0}")]
    InvalidUtf8(PathBuf),
}

/// How a document is written back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupLayout {
    /// Everything on one line
    Compact,
    /// One element per line, indented by this many spaces per level
    Pretty(usize),
}

/// Read a markup file and return its content
pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| IoError::InvalidUtf8(path.to_path_buf()))
}

/// Write content to a markup file, creating parent directories
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).map_err(IoError::Io)
}

/// Load a markup file as a document.
pub fn load_document(path: &Path, ids: IdGenerator) -> Result<Document, IoError> {
    let markup = read_file(path)?;
    log::debug!("loading {}", path.display());
    Ok(Document::from_markup(&markup, ids))
}

/// Write a document as markup.
pub fn save_document(path: &Path, doc: &Document, layout: MarkupLayout) -> Result<(), IoError> {
    let markup = match layout {
        MarkupLayout::Compact => doc.to_markup_string(),
        MarkupLayout::Pretty(indent_width) => doc.to_markup_pretty(indent_width),
    };
    write_file(path, &markup)
}
