//! 扫描器配置

use config::{Config, Environment, File};
use serde::Deserialize;

/// 扫描器运行配置
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperSettings {
    /// 数据库连接串
    pub database_url: String,
    /// 最大数据库连接数
    pub max_connections: u32,
    /// 对象存储桶名称
    pub bucket: String,
    /// 训练数据集根命名空间
    pub dataset_root: String,
    /// 平台暂存根命名空间
    pub staging_root: String,
    /// 单张影像复制超时 (秒)
    pub copy_timeout_secs: u64,
}

impl SweeperSettings {
    /// 从可选配置文件和MEDSCAN_*环境变量加载配置
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .set_default("database_url", "postgresql://localhost:5432/medscan")?
            .set_default("max_connections", 5_i64)?
            .set_default("bucket", "medscan-pipeline")?
            .set_default("dataset_root", "vision")?
            .set_default("staging_root", "platform")?
            .set_default("copy_timeout_secs", 30_i64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("MEDSCAN"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
