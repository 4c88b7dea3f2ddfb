//! Source loading and the concatenated-text line index.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::MetaEdProject;
use crate::state::FileMap;

pub const METAED_FILE_EXTENSION: &str = "metaed";

#[derive(Debug, Error)]
pub enum FileError {
    #[error("no valid input directories among {0} configured project paths")]
    NoInputDirectories(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEdFile {
    pub full_path: PathBuf,
    pub contents: String,
}

/// The `.metaed` files of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    pub namespace_name: String,
    pub project_name: String,
    pub files: Vec<MetaEdFile>,
}

/// A file that was found but could not be read.
#[derive(Debug)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub error: std::io::Error,
}

#[derive(Debug, Default)]
pub struct LoadedFiles {
    pub file_sets: Vec<FileSet>,
    pub unreadable: Vec<UnreadableFile>,
}

fn is_metaed_file(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e == METAED_FILE_EXTENSION)
}

/// Reads every `.metaed` file under each project directory, in configured project order and
/// sorted path order within a project. Missing directories are skipped with a warning.
pub fn load_file_sets<'a>(
    inputs: impl IntoIterator<Item = (&'a MetaEdProject, &'a PathBuf)>,
    exclusions: &BTreeSet<PathBuf>,
) -> Result<LoadedFiles, FileError> {
    let mut loaded = LoadedFiles::default();
    let mut configured = 0usize;

    for (project, dir) in inputs {
        configured += 1;
        if !dir.is_dir() {
            tracing::warn!(
                project = %project.project_name,
                path = %dir.display(),
                "project path is not a directory, skipping"
            );
            continue;
        }

        let mut file_set = FileSet {
            namespace_name: project.namespace_name.clone(),
            project_name: project.project_name.clone(),
            files: vec![],
        };
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_metaed_file(path) {
                continue;
            }
            if exclusions.contains(path) {
                tracing::debug!(path = %path.display(), "excluded");
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(contents) => file_set.files.push(MetaEdFile {
                    full_path: path.to_path_buf(),
                    contents,
                }),
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "failed to read .metaed file");
                    loaded.unreadable.push(UnreadableFile {
                        path: path.to_path_buf(),
                        error,
                    });
                }
            }
        }
        tracing::info!(
            project = %file_set.project_name,
            files = file_set.files.len(),
            "loaded project files"
        );
        loaded.file_sets.push(file_set);
    }

    if loaded.file_sets.is_empty() {
        return Err(FileError::NoInputDirectories(configured));
    }
    Ok(loaded)
}

// ============================================================================
// File index
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexEntry {
    /// First line of the file in the concatenated text (1-based).
    start_line: usize,
    line_count: usize,
    full_path: PathBuf,
}

/// Maps lines of the concatenated source back to `(file, line)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    entries: Vec<IndexEntry>,
    text: String,
}

impl FileIndex {
    pub fn build(file_sets: &[FileSet]) -> Self {
        let mut index = FileIndex::default();
        let mut next_line = 1usize;
        for file in file_sets.iter().flat_map(|set| set.files.iter()) {
            let line_count = file.contents.lines().count();
            index.entries.push(IndexEntry {
                start_line: next_line,
                line_count,
                full_path: file.full_path.clone(),
            });
            index.text.push_str(&file.contents);
            if !file.contents.is_empty() && !file.contents.ends_with('\n') {
                index.text.push('\n');
            }
            next_line += line_count;
        }
        index
    }

    /// The concatenation of all loaded files.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lookup(&self, concatenated_line: usize) -> Option<FileMap> {
        self.entries
            .iter()
            .find(|e| {
                concatenated_line >= e.start_line
                    && concatenated_line < e.start_line + e.line_count
            })
            .map(|e| FileMap {
                full_path: e.full_path.clone(),
                line_number: concatenated_line - e.start_line + 1,
            })
    }
}
