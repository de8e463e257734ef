//! 旧分析清理
//!
//! 按产物目录的修改时间排序，只保留最近的 `max_retained_analyses` 次分析，
//! 上传目录与产物目录一并删除。

use crate::artifacts::ArtifactStore;
use hepa_core::utils::is_valid_analysis_id;
use hepa_core::Result;
use std::time::SystemTime;
use tracing::{info, warn};

impl ArtifactStore {
    /// 列出已有分析，最新的在前
    pub async fn list_analyses(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.analyses_root()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut analyses: Vec<(SystemTime, String)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_valid_analysis_id(&name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_dir() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            analyses.push((modified, name));
        }

        analyses.sort_by(|a, b| b.cmp(a));
        Ok(analyses.into_iter().map(|(_, name)| name).collect())
    }

    /// 删除超出保留数量的旧分析，返回删除的数量
    pub async fn prune(&self) -> Result<usize> {
        let analyses = self.list_analyses().await?;
        let mut removed = 0;

        for analysis_id in analyses.iter().skip(self.max_retained) {
            if let Err(e) = self.remove_analysis(analysis_id).await {
                warn!("Failed to remove analysis {}: {}", analysis_id, e);
                continue;
            }
            removed += 1;
        }

        if removed > 0 {
            info!("Pruned {} old analyses, {} retained", removed, self.max_retained);
        }
        Ok(removed)
    }

    /// 删除一次分析的全部文件
    pub async fn remove_analysis(&self, analysis_id: &str) -> Result<()> {
        let artifacts = self.analysis_dir(analysis_id)?;
        remove_dir_if_exists(&artifacts).await?;
        remove_dir_if_exists(&self.uploads_root().join(analysis_id)).await?;
        Ok(())
    }
}

async fn remove_dir_if_exists(path: &std::path::Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
