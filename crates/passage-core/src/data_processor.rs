use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::chunker::normalize_text;
use crate::error::{Error, Result};
use crate::types::SourceDocument;

/// Local document source: every `.txt` file below a root directory.
pub struct TextDirectory {
    root: PathBuf,
}

impl TextDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads and normalizes every document. A missing root is an `Io` error of kind `NotFound`.
    pub fn read_documents(&self) -> Result<Vec<SourceDocument>> {
        self.read_documents_limited(usize::MAX)
    }

    pub fn read_documents_limited(&self, limit: usize) -> Result<Vec<SourceDocument>> {
        if !self.root.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("text directory {} does not exist", self.root.display()),
            )));
        }
        let mut files = self.list_txt_files();
        if files.is_empty() {
            tracing::warn!(root = %self.root.display(), "no .txt files found");
            return Ok(vec![]);
        }
        if files.len() > limit {
            files.truncate(limit);
            tracing::info!(limit, "limited to first files");
        }

        let mut docs = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(file = %file_path.display(), "reading {}/{}", file_index + 1, files.len());
            let text = normalize_text(&self.read_file_content(file_path)?);
            if text.is_empty() {
                tracing::warn!(file = %file_path.display(), "skipping document with no usable text");
                continue;
            }
            docs.push(SourceDocument::new(self.source_id(file_path), text));
        }
        tracing::info!(files = files.len(), documents = docs.len(), "read text directory");
        Ok(docs)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).into_owned()),
        }
    }

    /// Path relative to the root, with `/` separators.
    fn source_id(&self, file_path: &Path) -> String {
        let relative = file_path.strip_prefix(&self.root).unwrap_or(file_path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn list_txt_files(&self) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .map(walkdir::DirEntry::into_path)
            .collect();
        txt_files.sort();
        txt_files
    }
}
