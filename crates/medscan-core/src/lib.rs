//! # MedScan Core
//!
//! MedScan系统的核心模块，提供基础数据结构、错误定义、仓储接口和通用工具。

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::{MedScanError, Result};
pub use models::*;
pub use repository::SyncRepository;
