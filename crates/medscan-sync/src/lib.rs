//! # MedScan同步模块
//!
//! 已诊断检查到训练数据湖的同步流水线，包括：
//! - 诊断分类器：把诊断标签映射为类目文件夹并判定可训练性
//! - 划分分配器：按检查ID确定性分配训练/测试集
//! - 同步编排器：协调复制、持久化与元数据生成的核心控制流
//! - 元数据生成器：为已同步影像生成数据集分区的CSV工件
//! - 重试扫描器：周期性补偿实时同步的静默失败

pub mod classifier;
pub mod metadata;
pub mod orchestrator;
pub mod split;
pub mod sweeper;

#[cfg(test)]
mod testing;

// 重新导出主要类型
pub use metadata::MetadataEmitter;
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncResult};
pub use split::assign_split;
pub use sweeper::{RetrySweeper, SweepStats};
