//! File-backed document for the fix host.
//!
//! Every accepted line replacement is written through to disk before it is
//! reported as applied; a failed write rolls the buffer back so the file and
//! the buffer never disagree.

use anyhow::{Context, Result};
use linefix_core::{AnalysisError, DocumentEditor, MemoryDocument, Selection};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    buffer: MemoryDocument,
}

impl FileDocument {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let buffer = read_buffer(&path)?;
        Ok(Self { path, buffer })
    }

    pub fn lines(&self) -> &[String] {
        self.buffer.lines()
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn is_read_only(&self) -> bool {
        self.buffer.is_read_only()
    }

    /// Re-read the file so edits target what is on disk now.
    pub fn reload(&mut self) -> Result<()> {
        self.buffer = read_buffer(&self.path)?;
        debug!(path = %self.path.display(), lines = self.buffer.lines().len(), "document reloaded");
        Ok(())
    }

    /// Selection for 1-based inclusive `start..=end`; `None` selects the whole file.
    pub fn select(&self, range: Option<(usize, usize)>) -> Result<Selection, AnalysisError> {
        let lines = self.buffer.lines();
        match range {
            Some((start, end)) => Selection::from_lines(
                lines,
                start.saturating_sub(1),
                end.saturating_sub(1),
            ),
            None if lines.is_empty() => Err(AnalysisError::EmptySelection),
            None => Selection::from_lines(lines, 0, lines.len() - 1),
        }
    }

    fn persist(&self) -> std::io::Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let tmp_path = self.path.with_file_name(format!(".{}.linefix.tmp", file_name));

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(self.buffer.text().as_bytes())?;
        file.sync_all()?;
        drop(file);

        if let Ok(meta) = fs::metadata(&self.path) {
            let _ = fs::set_permissions(&tmp_path, meta.permissions());
        }
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        Ok(())
    }
}

fn read_buffer(path: &Path) -> Result<MemoryDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let read_only = fs::metadata(path)
        .map(|m| m.permissions().readonly())
        .unwrap_or(false);
    Ok(MemoryDocument::from_text(&text).read_only(read_only))
}

impl DocumentEditor for FileDocument {
    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    fn line(&self, index: usize) -> Option<String> {
        self.buffer.line(index)
    }

    fn replace_line(&mut self, index: usize, text: &str) -> Result<(), String> {
        let previous = self
            .buffer
            .line(index)
            .ok_or_else(|| format!("line {} does not exist", index + 1))?;
        self.buffer.replace_line(index, text)?;
        if let Err(err) = self.persist() {
            let _ = self.buffer.replace_line(index, &previous);
            return Err(format!("could not write {}: {}", self.path.display(), err));
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), String> {
        self.reload().map_err(|e| format!("{:#}", e))
    }
}
