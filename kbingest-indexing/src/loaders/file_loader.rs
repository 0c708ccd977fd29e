//! Load files from a directory
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use kbingest_core::{
    Loader,
    indexing::{IndexingStream, Node},
};

/// Loads the files directly inside a directory, filtered by extension, as one node per file.
///
/// Subdirectories are not descended into. Hidden files are included and files are emitted sorted
/// by name. A file is only read when the pipeline pulls it, so an unreadable file (including
/// invalid UTF-8) surfaces as an error for that file alone.
///
/// # Example
///
/// ```no_run
/// # use kbingest_indexing::{Pipeline, loaders::FileLoader};
/// Pipeline::from_loader(FileLoader::new("knowledge_source").with_extensions(&["txt"]));
/// ```
#[derive(Clone, Debug)]
pub struct FileLoader {
    pub(crate) path: PathBuf,
    pub(crate) extensions: Option<Vec<String>>,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extensions: None,
        }
    }

    /// Adds extensions to the loader, without the leading dot.
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[impl AsRef<str>]) -> Self {
        self.extensions = Some(
            self.extensions
                .unwrap_or_default()
                .into_iter()
                .chain(extensions.iter().map(|ext| ext.as_ref().to_string()))
                .collect(),
        );
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists the files that will be loaded, in the order they will be loaded.
    ///
    /// A missing or unreadable directory yields no files.
    pub fn list_files(&self) -> Vec<PathBuf> {
        ignore::WalkBuilder::new(&self.path)
            .max_depth(Some(1))
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .filter_map(|entry| {
                entry
                    .inspect_err(|err| tracing::debug!(error = %err, "Skipping entry"))
                    .ok()
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|entry| self.file_has_extension(entry.path()))
            .map(ignore::DirEntry::into_path)
            .collect()
    }

    // Without configured extensions every file matches; a file without an extension never does
    // once they are configured.
    fn file_has_extension(&self, path: &Path) -> bool {
        self.extensions.as_ref().is_none_or(|exts| {
            let Some(ext) = path.extension() else {
                return false;
            };
            exts.iter().any(|e| e == ext.to_string_lossy().as_ref())
        })
    }
}

fn load_file(path: PathBuf) -> Result<Node> {
    tracing::debug!(path = ?path, "Reading file");
    let content = fs_err::read_to_string(&path).context("Failed to read file")?;
    let original_size = content.len();

    Node::builder()
        .path(path)
        .chunk(content)
        .original_size(original_size)
        .build()
}

impl Loader for FileLoader {
    fn into_stream(self) -> IndexingStream {
        IndexingStream::iter(self.list_files().into_iter().map(load_file))
    }
}
