//! 错误定义模块

use thiserror::Error;

/// MedScan系统统一错误类型
#[derive(Error, Debug)]
pub enum MedScanError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("同步错误: {0}")]
    Sync(String),

    #[error("元数据错误: {0}")]
    Metadata(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// MedScan系统统一结果类型
pub type Result<T> = std::result::Result<T, MedScanError>;
