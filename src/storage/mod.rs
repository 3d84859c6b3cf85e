//! Storage backend abstraction for alignment files and their indexes.
//!
//! Files are addressed by id: `<id>.bam` with its index next to it, either
//! appended (`<id>.bam.bai`) or replacing the extension (`<id>.bai`).
//!
//! # Implementations
//!
//! - [`LocalStorage`] - Local filesystem storage
//!
//! # Example
//!
//! ```no_run
//! use baindex::storage::{IndexStore, LocalStorage};
//! use std::path::PathBuf;
//!
//! # async fn run() -> baindex::Result<()> {
//! let storage = LocalStorage::new(PathBuf::from("./data"));
//! let index = storage.load_index("sample").await?;
//! println!("{} references", index.reference_count());
//! # Ok(())
//! # }
//! ```

mod local;

pub use local::LocalStorage;

use crate::Result;
use crate::index::BamIndex;
use async_trait::async_trait;
use std::path::PathBuf;

/// Metadata about a stored alignment file
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub id: String,
    pub size: u64,
    pub has_index: bool,
}

/// Storage backend for alignment files and their indexes
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Check if the alignment file exists
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Get file metadata
    async fn file_info(&self, id: &str) -> Result<FileInfo>;

    /// Path of the alignment file
    fn bam_path(&self, id: &str) -> PathBuf;

    /// Get index file path if available
    async fn index_path(&self, id: &str) -> Result<Option<PathBuf>>;

    /// Load and decode the index of `id`
    async fn load_index(&self, id: &str) -> Result<BamIndex>;

    /// Persist `index` for `id`, returning where it was written
    async fn save_index(&self, id: &str, index: &BamIndex) -> Result<PathBuf>;
}
