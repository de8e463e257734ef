//! 分析产物存储
//!
//! 目录布局：
//! - `uploads/<analysis_id>/<文件名>`：原始上传影像
//! - `static/analyses/<analysis_id>/`：可视化图、关系图、report.json 与 PDF

use hepa_core::config::StorageConfig;
use hepa_core::utils::{is_valid_analysis_id, sanitize_filename};
use hepa_core::{HepaError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// static 目录下存放分析产物的子目录
pub const ANALYSES_DIR: &str = "analyses";
pub const VISUALIZATION_FILE: &str = "visualization.png";
pub const REPORT_FILE: &str = "report.json";
pub const PDF_FILE: &str = "liver_report.pdf";
/// 对外访问生成产物的 URL 前缀
pub const STATIC_URL_PREFIX: &str = "/static";

pub fn diagram_file(index: usize) -> String {
    format!("diagram_{}.png", index)
}

/// 产物存储管理器
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    uploads_dir: PathBuf,
    static_dir: PathBuf,
    pub(crate) max_retained: usize,
}

impl ArtifactStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            uploads_dir: config.uploads_dir.clone(),
            static_dir: config.static_dir.clone(),
            max_retained: config.max_retained_analyses,
        }
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// 创建根目录
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::create_dir_all(self.static_dir.join(ANALYSES_DIR)).await?;
        Ok(())
    }

    fn check_id(analysis_id: &str) -> Result<()> {
        if is_valid_analysis_id(analysis_id) {
            Ok(())
        } else {
            Err(HepaError::Validation(format!("Invalid analysis id: {}", analysis_id)))
        }
    }

    pub(crate) fn analyses_root(&self) -> PathBuf {
        self.static_dir.join(ANALYSES_DIR)
    }

    pub(crate) fn uploads_root(&self) -> &Path {
        &self.uploads_dir
    }

    /// 某次分析的产物目录
    pub fn analysis_dir(&self, analysis_id: &str) -> Result<PathBuf> {
        Self::check_id(analysis_id)?;
        Ok(self.analyses_root().join(analysis_id))
    }

    /// 产物的访问 URL
    pub fn artifact_url(&self, analysis_id: &str, file_name: &str) -> String {
        format!("{}/{}/{}/{}", STATIC_URL_PREFIX, ANALYSES_DIR, analysis_id, file_name)
    }

    /// 保存上传影像，文件名只保留最后一段
    pub async fn save_upload(&self, analysis_id: &str, filename: &str, data: &[u8]) -> Result<PathBuf> {
        Self::check_id(analysis_id)?;
        let name = sanitize_filename(filename)
            .ok_or_else(|| HepaError::Validation(format!("Invalid upload filename: {:?}", filename)))?;

        let path = self.uploads_dir.join(analysis_id).join(name);
        write_file(&path, data).await?;
        debug!("Stored upload {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    /// 写入产物文件，返回访问 URL
    pub async fn write_artifact(&self, analysis_id: &str, file_name: &str, data: &[u8]) -> Result<String> {
        let dir = self.analysis_dir(analysis_id)?;
        write_file(&dir.join(file_name), data).await?;
        Ok(self.artifact_url(analysis_id, file_name))
    }

    pub async fn write_visualization(&self, analysis_id: &str, png: &[u8]) -> Result<String> {
        self.write_artifact(analysis_id, VISUALIZATION_FILE, png).await
    }

    pub async fn write_diagram(&self, analysis_id: &str, index: usize, png: &[u8]) -> Result<String> {
        self.write_artifact(analysis_id, &diagram_file(index), png).await
    }

    pub async fn write_pdf(&self, analysis_id: &str, pdf: &[u8]) -> Result<String> {
        self.write_artifact(analysis_id, PDF_FILE, pdf).await
    }

    pub async fn read_artifact(&self, analysis_id: &str, file_name: &str) -> Result<Vec<u8>> {
        let path = self.analysis_dir(analysis_id)?.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(HepaError::NotFound(format!(
                "{} for analysis {}",
                file_name, analysis_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// 以 JSON 保存结构化报告
    pub async fn save_report<T: Serialize>(&self, analysis_id: &str, report: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)?;
        self.write_artifact(analysis_id, REPORT_FILE, &json).await?;
        Ok(())
    }

    pub async fn load_report<T: DeserializeOwned>(&self, analysis_id: &str) -> Result<T> {
        let data = self.read_artifact(analysis_id, REPORT_FILE).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// 解析客户端回传的产物引用（URL 或 static 下的相对路径），
    /// 结果必须位于 static 目录内
    pub async fn resolve_static_path(&self, reference: &str) -> Result<PathBuf> {
        let trimmed = reference.trim();
        let relative = trimmed
            .strip_prefix(STATIC_URL_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(trimmed);

        let relative_path = Path::new(relative);
        if relative.is_empty()
            || relative_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(HepaError::Validation(format!(
                "Artifact path must stay inside the static directory: {}",
                reference
            )));
        }

        let candidate = self.static_dir.join(relative_path);
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| HepaError::NotFound(format!("Artifact not found: {}", reference)))?;
        let root = tokio::fs::canonicalize(&self.static_dir).await?;

        if !resolved.starts_with(&root) {
            return Err(HepaError::Validation(format!(
                "Artifact path must stay inside the static directory: {}",
                reference
            )));
        }
        Ok(resolved)
    }
}

/// 写入文件，必要时创建父目录
async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HepaError::Storage(format!("创建目录 {} 失败: {}", parent.display(), e)))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| HepaError::Storage(format!("写入 {} 失败: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hepa_core::utils::generate_analysis_id;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        value: f64,
    }

    fn store(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(&StorageConfig {
            uploads_dir: dir.path().join("uploads"),
            static_dir: dir.path().join("static"),
            max_retained_analyses: 4,
        })
    }

    #[tokio::test]
    async fn test_upload_filename_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = generate_analysis_id();

        let path = store.save_upload(&id, "../../etc/scan.png", b"data").await.unwrap();
        assert_eq!(path, dir.path().join("uploads").join(&id).join("scan.png"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"data");

        assert!(store.save_upload(&id, "..", b"data").await.is_err());
    }

    #[tokio::test]
    async fn test_artifacts_are_scoped_per_analysis() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let first = generate_analysis_id();
        let second = generate_analysis_id();

        let url = store.write_visualization(&first, b"one").await.unwrap();
        store.write_visualization(&second, b"two").await.unwrap();

        assert_eq!(url, format!("/static/analyses/{}/visualization.png", first));
        assert_eq!(store.read_artifact(&first, VISUALIZATION_FILE).await.unwrap(), b"one");
        assert_eq!(store.read_artifact(&second, VISUALIZATION_FILE).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_rejects_malformed_analysis_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let err = store.write_pdf("../escape", b"%PDF").await.unwrap_err();
        assert!(matches!(err, HepaError::Validation(_)));
    }

    #[tokio::test]
    async fn test_write_failure_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = generate_analysis_id();
        // 产物目录位置被普通文件占用
        tokio::fs::create_dir_all(dir.path().join("static").join(ANALYSES_DIR))
            .await
            .unwrap();
        tokio::fs::write(store.analysis_dir(&id).unwrap(), b"occupied")
            .await
            .unwrap();

        let err = store.write_visualization(&id, b"png").await.unwrap_err();
        assert!(matches!(err, HepaError::Storage(_)));
    }

    #[tokio::test]
    async fn test_report_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = generate_analysis_id();
        let sample = Sample {
            name: "scan".to_string(),
            value: 2.5,
        };

        store.save_report(&id, &sample).await.unwrap();
        let loaded: Sample = store.load_report(&id).await.unwrap();
        assert_eq!(loaded, sample);

        let missing = store.load_report::<Sample>(&generate_analysis_id()).await.unwrap_err();
        assert!(matches!(missing, HepaError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_static_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        let id = generate_analysis_id();
        let url = store.write_visualization(&id, b"png").await.unwrap();

        let resolved = store.resolve_static_path(&url).await.unwrap();
        assert!(resolved.ends_with(VISUALIZATION_FILE));

        let relative = format!("analyses/{}/{}", id, VISUALIZATION_FILE);
        assert_eq!(store.resolve_static_path(&relative).await.unwrap(), resolved);

        let outside = store.resolve_static_path("/static/../uploads/x.png").await.unwrap_err();
        assert!(matches!(outside, HepaError::Validation(_)));

        let absolute = store.resolve_static_path("/etc/passwd").await.unwrap_err();
        assert!(matches!(absolute, HepaError::Validation(_)));

        let missing = store.resolve_static_path("/static/analyses/none.png").await.unwrap_err();
        assert!(matches!(missing, HepaError::NotFound(_)));
    }
}
