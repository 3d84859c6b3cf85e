use super::{FileInfo, IndexStore};
use crate::index::BamIndex;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

const BAM_EXTENSION: &str = "bam";
const INDEX_EXTENSION: &str = "bai";

pub struct LocalStorage {
    data_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn make_file_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", id, BAM_EXTENSION))
    }

    /// Appended convention, `<id>.bam.bai`; used when writing.
    fn appended_index_path(&self, id: &str) -> PathBuf {
        let path = self.make_file_path(id);
        PathBuf::from(format!("{}.{}", path.display(), INDEX_EXTENSION))
    }
}

#[async_trait]
impl IndexStore for LocalStorage {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(fs::try_exists(self.make_file_path(id)).await?)
    }

    async fn file_info(&self, id: &str) -> Result<FileInfo> {
        let path = self.make_file_path(id);
        let metadata = fs::metadata(&path)
            .await
            .map_err(|_| Error::NotFound(id.to_string()))?;

        Ok(FileInfo {
            id: id.to_string(),
            size: metadata.len(),
            has_index: self.index_path(id).await?.is_some(),
        })
    }

    fn bam_path(&self, id: &str) -> PathBuf {
        self.make_file_path(id)
    }

    async fn index_path(&self, id: &str) -> Result<Option<PathBuf>> {
        // Try appended index first (e.g., file.bam.bai)
        let appended_idx = self.appended_index_path(id);
        if fs::try_exists(&appended_idx).await? {
            return Ok(Some(appended_idx));
        }

        // Try replaced extension (e.g., file.bai)
        let replaced_idx = self.make_file_path(id).with_extension(INDEX_EXTENSION);
        if fs::try_exists(&replaced_idx).await? {
            return Ok(Some(replaced_idx));
        }

        Ok(None)
    }

    async fn load_index(&self, id: &str) -> Result<BamIndex> {
        let path = self
            .index_path(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no index for {}", id)))?;

        let data = fs::read(&path).await?;
        let index = BamIndex::deserialize(&data)?;

        tracing::info!(
            path = %path.display(),
            references = index.reference_count(),
            "loaded index"
        );
        Ok(index)
    }

    async fn save_index(&self, id: &str, index: &BamIndex) -> Result<PathBuf> {
        let path = self.appended_index_path(id);
        let data = index.serialize();

        // write beside the target and rename so readers never see a partial index
        let tmp = path.with_extension("bai.tmp");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &path).await?;

        tracing::info!(path = %path.display(), bytes = data.len(), "saved index");
        Ok(path)
    }
}
