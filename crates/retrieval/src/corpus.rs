//! Corpus discovery and validation.
//!
//! Scans a directory for `.jpg`, `.jpeg` and `.png` files, checks that each
//! one carries a decodable image header, and returns them in a stable
//! (file-name sorted) order. Invalid files are logged and skipped; only a
//! directory with no valid image at all is an error.

use snapseek_core::BuildError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::{CorpusItem, SkippedFile};

/// Extensions accepted as image candidates (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Result of scanning a corpus directory.
#[derive(Debug, Clone, Default)]
pub struct CorpusScan {
    /// Valid items in load order
    pub items: Vec<CorpusItem>,

    /// Candidates rejected during validation
    pub skipped: Vec<SkippedFile>,

    /// Files with an image extension that were examined
    pub candidates: usize,
}

#[derive(Debug, Clone)]
pub struct CorpusLoader {
    root: PathBuf,
    max_items: Option<usize>,
    recursive: bool,
}

impl CorpusLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_items: None,
            recursive: false,
        }
    }

    /// Stop accepting items once `max_items` valid images were found.
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the directory and validate every candidate.
    ///
    /// Fails with `DirectoryNotFound` if the root is missing and with
    /// `EmptyCorpus` if no valid image was found.
    pub fn load(&self) -> Result<CorpusScan, BuildError> {
        if !self.root.is_dir() {
            return Err(BuildError::DirectoryNotFound(self.root.clone()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut scan = CorpusScan::default();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
        {
            if self.limit_reached(scan.items.len()) {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable corpus entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !has_image_extension(path) {
                continue;
            }

            scan.candidates += 1;

            match validate_image(path) {
                Ok(()) => scan.items.push(CorpusItem {
                    identifier: self.identifier_for(path),
                    path: path.to_path_buf(),
                }),
                Err(reason) => {
                    tracing::warn!("Skipping invalid image {:?}: {}", path, reason);
                    scan.skipped.push(SkippedFile {
                        path: path.to_path_buf(),
                        reason,
                    });
                }
            }
        }

        if scan.items.is_empty() {
            return Err(BuildError::EmptyCorpus(self.root.clone()));
        }

        tracing::info!(
            "Loaded {} valid images from {:?} ({} skipped)",
            scan.items.len(),
            self.root,
            scan.skipped.len()
        );

        Ok(scan)
    }

    fn limit_reached(&self, accepted: usize) -> bool {
        self.max_items.is_some_and(|max| accepted >= max)
    }

    /// Corpus-relative path joined with `/`, independent of platform.
    fn identifier_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Read just enough of the file to confirm it is an image with a non-empty
/// canvas. Full decoding happens later in the preprocessor.
fn validate_image(path: &Path) -> Result<(), String> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| e.to_string())?
        .with_guessed_format()
        .map_err(|e| e.to_string())?;

    if reader.format().is_none() {
        return Err("unrecognized image format".to_string());
    }

    let (width, height) = reader.into_dimensions().map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err(format!("empty image ({}x{})", width, height));
    }

    Ok(())
}
