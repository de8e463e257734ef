//! 错误定义模块

use thiserror::Error;

/// 系统统一错误类型
#[derive(Error, Debug)]
pub enum HepaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("{0}")]
    MissingUpload(String),

    #[error("缺少表单字段: {0}")]
    MissingField(String),

    #[error("无法解码影像: {0}")]
    InvalidImage(String),

    #[error("分割掩码尺寸不匹配: 期望 {expected} 个像素, 实际 {actual} 个")]
    MaskShape { expected: usize, actual: usize },

    #[error("分割模型错误: {0}")]
    Model(String),

    #[error("影像编码错误: {0}")]
    Encoding(String),

    #[error("图表渲染错误: {0}")]
    Chart(String),

    #[error("报告格式错误: {0}")]
    ReportFormat(String),

    #[error("PDF生成错误: {0}")]
    Pdf(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for HepaError {
    fn from(err: config::ConfigError) -> Self {
        HepaError::Config(err.to_string())
    }
}

/// 系统统一结果类型
pub type Result<T> = std::result::Result<T, HepaError>;
