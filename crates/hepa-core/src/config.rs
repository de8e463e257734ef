//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值 → TOML 配置文件 → `HEPA__` 前缀环境变量。

use crate::error::{HepaError, Result};
use crate::models::VoxelSpacing;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HepaConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 分割模型配置
    pub model: ModelConfig,
    /// 影像处理配置
    pub imaging: ImagingConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 上传请求体上限（字节）
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 原始上传文件目录
    pub uploads_dir: PathBuf,
    /// 生成产物目录（通过 /static 对外提供）
    pub static_dir: PathBuf,
    /// 保留的最近分析数量
    pub max_retained_analyses: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
            max_retained_analyses: 16,
        }
    }
}

/// 分割模型配置（TensorFlow Serving REST 接口）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 服务地址，例如 http://127.0.0.1:8501
    pub endpoint: String,
    /// 模型名称
    pub name: String,
    /// 推理请求超时（秒）
    pub timeout_secs: u64,
    /// 模型输入边长（像素）
    pub input_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8501".to_string(),
            name: "liver_tumor_segmentation".to_string(),
            timeout_secs: 60,
            input_size: 256,
        }
    }
}

/// 影像处理配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagingConfig {
    pub voxel_spacing: VoxelSpacing,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter 语法，例如 "info,hepa_web=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl HepaConfig {
    /// 加载配置
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&HepaConfig::default())?);

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("HEPA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: HepaConfig = settings.try_deserialize()?;
        config.validate()?;

        match config_path {
            Some(path) => info!("Configuration loaded from {}", path.display()),
            None => info!("Configuration loaded from defaults and environment"),
        }

        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.model.input_size == 0 {
            return Err(HepaError::Config("model.input_size must be positive".to_string()));
        }
        if self.model.timeout_secs == 0 {
            return Err(HepaError::Config("model.timeout_secs must be positive".to_string()));
        }
        if self.model.endpoint.trim().is_empty() {
            return Err(HepaError::Config("model.endpoint is required".to_string()));
        }
        if self.imaging.voxel_spacing.voxel_volume() <= 0.0 {
            return Err(HepaError::Config(
                "imaging.voxel_spacing must be positive on every axis".to_string(),
            ));
        }
        if self.storage.max_retained_analyses == 0 {
            return Err(HepaError::Config(
                "storage.max_retained_analyses must be at least 1".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(HepaError::Config("server.max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }
}
