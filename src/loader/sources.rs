//! Byte sources for image references.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::error::LoadError;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Size of each read when streaming a file.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Check if a filename has a supported image extension.
pub fn is_image_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List the image files directly inside `folder`, sorted by path.
pub fn list_images(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(is_image_filename)
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Resolves an image reference to its encoded bytes.
///
/// `progress` receives `(bytes_loaded, total_bytes)`; the total is `None`
/// when the source cannot tell in advance.
pub trait ImageSource {
    /// Fetch the bytes behind `reference`.
    fn fetch<'a>(
        &'a self,
        reference: &'a str,
        progress: &'a mut dyn FnMut(u64, Option<u64>),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

/// Reads references as filesystem paths.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    /// Directory relative references are resolved against
    base_dir: Option<PathBuf>,
}

impl FileSource {
    /// Source resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source resolving relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read(&self, reference: &str, progress: &mut dyn FnMut(u64, Option<u64>)) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(reference);
        let mut file = std::fs::File::open(&path).map_err(|e| LoadError::fetch(reference, e))?;
        let total = file.metadata().ok().map(|m| m.len());

        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = file
                .read(&mut chunk)
                .map_err(|e| LoadError::fetch(reference, e))?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
            progress(bytes.len() as u64, total);
        }

        log::trace!("FileSource: read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }
}

impl ImageSource for FileSource {
    fn fetch<'a>(
        &'a self,
        reference: &'a str,
        progress: &'a mut dyn FnMut(u64, Option<u64>),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>> {
        async move { self.read(reference, progress) }.boxed_local()
    }
}

/// Serves bytes registered in memory under a reference, for embedded data
/// and uploads that never touched the filesystem.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: RefCell<HashMap<String, Arc<[u8]>>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `reference`, replacing any previous entry.
    pub fn insert(&self, reference: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.entries.borrow_mut().insert(reference.into(), bytes.into());
    }

    /// Forget a reference. Returns whether it was registered.
    pub fn remove(&self, reference: &str) -> bool {
        self.entries.borrow_mut().remove(reference).is_some()
    }

    /// Check if a reference is registered.
    pub fn contains(&self, reference: &str) -> bool {
        self.entries.borrow().contains_key(reference)
    }
}

impl ImageSource for MemorySource {
    fn fetch<'a>(
        &'a self,
        reference: &'a str,
        progress: &'a mut dyn FnMut(u64, Option<u64>),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>> {
        async move {
            let bytes = self
                .entries
                .borrow()
                .get(reference)
                .cloned()
                .ok_or_else(|| LoadError::fetch(reference, "no data registered"))?;
            let len = bytes.len() as u64;
            progress(len, Some(len));
            Ok(bytes.to_vec())
        }
        .boxed_local()
    }
}
