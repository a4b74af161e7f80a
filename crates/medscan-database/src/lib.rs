//! # MedScan数据库模块
//!
//! 负责扫描工作流元数据的存储和管理，提供PostgreSQL数据库连接池、
//! 表结构初始化和同步流程所需的全部查询。

pub mod connection;
pub mod models;
pub mod queries;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use models::*;
pub use queries::DatabaseQueries;
