use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;
use crate::types::SheetError;

/// Disk cache of rendered sheets, content-addressed by blake3 key
pub struct SheetCache {
    cache_dir: PathBuf,
    max_cache_size: u64, // Bytes
}

impl SheetCache {
    pub fn new(cache_dir: PathBuf, max_cache_size: u64) -> Self {
        Self {
            cache_dir,
            max_cache_size,
        }
    }

    pub async fn initialize(&self) -> Result<(), SheetError> {
        fs::create_dir_all(&self.cache_dir).await?;
        Ok(())
    }

    /// Key over everything that affects the pixels: layout settings and
    /// the payloads in slot order
    pub fn cache_key(layout: &[u8], payloads: &[&str]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(layout.len() as u64).to_le_bytes());
        hasher.update(layout);
        for payload in payloads {
            hasher.update(&(payload.len() as u64).to_le_bytes());
            hasher.update(payload.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Sharded by the first two hex chars
    pub fn entry_path(&self, key: &str, format: &str) -> PathBuf {
        let shard = &key[..2.min(key.len())];
        self.cache_dir.join(shard).join(format!("{}.{}", key, format))
    }

    /// Cached sheet path, if present and non-empty
    pub async fn get(&self, key: &str, format: &str) -> Option<PathBuf> {
        let path = self.entry_path(key, format);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Store a rendered sheet; the final path only ever holds complete data
    pub async fn put(&self, key: &str, format: &str, data: &[u8]) -> Result<PathBuf, SheetError> {
        let path = self.entry_path(key, format);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension(format!("{}.tmp", format));
        fs::write(&temp_path, data).await?;
        fs::rename(&temp_path, &path).await?;

        self.enforce_cache_limit().await?;
        Ok(path)
    }

    /// Every cached file with its metadata (one shard level deep)
    async fn entries(&self) -> Result<Vec<(PathBuf, Metadata)>, SheetError> {
        let mut files = Vec::new();
        let mut pending = vec![(self.cache_dir.clone(), 0u8)];

        while let Some((dir, depth)) = pending.pop() {
            let mut reader = match fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = reader.next_entry().await? {
                let Ok(metadata) = entry.metadata().await else {
                    continue;
                };
                if metadata.is_dir() && depth == 0 {
                    pending.push((entry.path(), depth + 1));
                } else if metadata.is_file() {
                    files.push((entry.path(), metadata));
                }
            }
        }

        Ok(files)
    }

    async fn enforce_cache_limit(&self) -> Result<(), SheetError> {
        let entries = self.entries().await?;
        let total: u64 = entries.iter().map(|(_, m)| m.len()).sum();
        if total > self.max_cache_size {
            self.evict_oldest(entries, total).await;
        }
        Ok(())
    }

    /// Drop least recently modified sheets until under 80% of the limit
    async fn evict_oldest(&self, mut entries: Vec<(PathBuf, Metadata)>, mut total: u64) {
        let target = self.max_cache_size / 10 * 8;
        entries.sort_by_key(|(_, metadata)| metadata.modified().ok());

        let mut evicted = 0usize;
        for (path, metadata) in entries {
            if total <= target {
                break;
            }
            if fs::remove_file(&path).await.is_ok() {
                total = total.saturating_sub(metadata.len());
                evicted += 1;
            }
        }
        tracing::info!(evicted, remaining_bytes = total, "sheet cache trimmed");
    }

    pub async fn clear_all(&self) -> Result<(), SheetError> {
        if fs::metadata(&self.cache_dir).await.is_ok() {
            fs::remove_dir_all(&self.cache_dir).await?;
        }
        fs::create_dir_all(&self.cache_dir).await?;
        Ok(())
    }

    /// (file count, total bytes)
    pub async fn stats(&self) -> Result<(i32, i64), SheetError> {
        let entries = self.entries().await?;
        let size: u64 = entries.iter().map(|(_, m)| m.len()).sum();
        Ok((entries.len() as i32, size as i64))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
