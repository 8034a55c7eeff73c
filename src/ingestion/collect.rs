//! Directory scan for raw event documents.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawDocument;

/// Options controlling which files are collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// File name suffix (without the dot) a file must end with. Matching is case-sensitive.
    pub extension: String,
    /// How deep to descend: `1` scans only the directory itself.
    pub max_depth: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            extension: "xml".to_string(),
            max_depth: 1,
        }
    }
}

/// Read every file under `dir` whose name ends with `.{extension}`.
///
/// Files are returned sorted by path so repeated runs see the same order.
///
/// # Errors
///
/// - [`PipelineError::Io`] if the directory cannot be listed
/// - [`PipelineError::Read`] if a matching file cannot be read as UTF-8 text
/// - [`PipelineError::NoInput`] if no file matches
pub fn collect_documents(dir: impl AsRef<Path>, options: &CollectOptions) -> PipelineResult<Vec<RawDocument>> {
    let dir = dir.as_ref();
    let suffix = format!(".{}", options.extension);

    tracing::info!(dir = %dir.display(), extension = %options.extension, "looking for input files");

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(options.max_depth.max(1))
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => PipelineError::Io(io),
            None => PipelineError::Io(std::io::Error::other("filesystem loop while scanning input directory")),
        })?;
        // Symlinks count when they point at a regular file.
        if !entry.path().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&suffix));
        if matches {
            paths.push(entry.into_path());
        }
    }

    tracing::info!(count = paths.len(), "found input files");

    if paths.is_empty() {
        return Err(PipelineError::NoInput {
            dir: dir.to_path_buf(),
            extension: options.extension.clone(),
        });
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|source| PipelineError::Read {
            path: path.clone(),
            source,
        })?;
        documents.push(RawDocument::from_file(path, text));
    }
    Ok(documents)
}
