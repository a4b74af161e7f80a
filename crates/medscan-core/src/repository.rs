//! 同步子系统的仓储接口
//!
//! 同步流程对关系型存储的全部依赖，由medscan-database提供生产实现，
//! 测试中以内存实现替代。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DiagnosisRecord, PatientProfile, Scan, ScanImage};

#[async_trait]
pub trait SyncRepository: Send + Sync {
    /// 按ID加载检查
    async fn get_scan(&self, scan_id: Uuid) -> Result<Option<Scan>>;

    /// 按ID加载患者档案
    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<PatientProfile>>;

    /// 加载检查的最新诊断记录 (存在多条时以最新一条为准)
    async fn latest_diagnosis(&self, scan_id: Uuid) -> Result<Option<DiagnosisRecord>>;

    /// 加载检查的全部影像，按image_order排序
    async fn get_scan_images(&self, scan_id: Uuid) -> Result<Vec<ScanImage>>;

    /// 加载检查中已同步 (dataset_path非空) 的影像
    async fn synced_scan_images(&self, scan_id: Uuid) -> Result<Vec<ScanImage>>;

    /// 查询已完成复核但尚未同步、且复核完成时间晚于cutoff的检查
    async fn unsynced_completed_scans(&self, cutoff: DateTime<Utc>) -> Result<Vec<Scan>>;

    /// 在单个事务中持久化同步结果
    ///
    /// 同时写入检查的synced标记、同步时间、目标路径列表，以及每张
    /// 影像的目标路径。部分写入是同步流程首要规避的故障模式。
    async fn mark_scan_synced(
        &self,
        scan_id: Uuid,
        paths: &[String],
        image_paths: &[(Uuid, String)],
    ) -> Result<()>;
}
