//! 同步编排器
//!
//! 协调分类器、划分分配器、影像复制和元数据生成，完成单个已诊断
//! 检查到训练数据集的同步。所有步骤均幂等：实时触发路径和重试扫描
//! 器可以并发驱动同一检查而不需要加锁。

use std::sync::Arc;

use medscan_core::{DatasetType, MedScanError, Result, Split, SyncRepository};
use medscan_storage::DatasetCopier;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::classifier;
use crate::metadata::MetadataEmitter;
use crate::split::assign_split;

/// 同步结果类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 影像已放置并持久化
    Synced,
    /// 检查不参与训练，正常跳过
    Skipped,
}

/// 单次同步的结果
///
/// 临时值对象，不单独持久化；其副作用落在检查和影像记录上。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub outcome: SyncOutcome,
    pub message: String,
    pub paths: Vec<String>,
    pub dataset_type: Option<DatasetType>,
    pub class_folder: Option<String>,
    pub split: Option<Split>,
}

impl SyncResult {
    fn skipped(message: String) -> Self {
        Self {
            outcome: SyncOutcome::Skipped,
            message,
            paths: Vec::new(),
            dataset_type: None,
            class_folder: None,
            split: None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.outcome == SyncOutcome::Synced
    }
}

/// 同步编排器
pub struct SyncOrchestrator {
    repository: Arc<dyn SyncRepository>,
    copier: DatasetCopier,
    emitter: MetadataEmitter,
}

impl SyncOrchestrator {
    pub fn new(
        repository: Arc<dyn SyncRepository>,
        copier: DatasetCopier,
        emitter: MetadataEmitter,
    ) -> Self {
        Self {
            repository,
            copier,
            emitter,
        }
    }

    /// 同步单个已诊断检查到训练数据集
    ///
    /// 不可训练或无法派生数据集类别的检查返回Skipped，这是预期路径
    /// 而非失败。步骤1-9的任何错误都不落数据库状态；已完成的对象
    /// 复制保留原样，重试时按确定性路径无害地覆盖。
    pub async fn sync_scan(&self, scan_id: Uuid) -> Result<SyncResult> {
        // 1. 加载检查
        let scan = self
            .repository
            .get_scan(scan_id)
            .await?
            .ok_or_else(|| MedScanError::NotFound(format!("scan not found: {scan_id}")))?;

        // 2. 派生数据集类别
        let Some(dataset_type) =
            DatasetType::from_exam(&scan.examination_type, &scan.body_region)
        else {
            info!(
                "Skipping sync for {}: {}/{} maps to no dataset",
                scan.scan_number, scan.examination_type, scan.body_region
            );
            return Ok(SyncResult::skipped(format!(
                "scan {} is not dataset-eligible",
                scan.scan_number
            )));
        };

        // 3. 加载最新诊断并检查可训练性
        let diagnosis = self
            .repository
            .latest_diagnosis(scan_id)
            .await?
            .ok_or_else(|| {
                MedScanError::NotFound(format!("no diagnosis for scan {}", scan.scan_number))
            })?;

        if !classifier::is_trainable(&diagnosis.radiologist_diagnosis, dataset_type) {
            info!(
                "Skipping sync for {}: diagnosis={} (not training data)",
                scan.scan_number, diagnosis.radiologist_diagnosis
            );
            return Ok(SyncResult::skipped(format!(
                "diagnosis \"{}\" not training data",
                diagnosis.radiologist_diagnosis
            )));
        }

        // 4. 加载患者
        let patient = self
            .repository
            .get_patient(scan.patient_id)
            .await?
            .ok_or_else(|| {
                MedScanError::NotFound(format!("patient not found for scan {}", scan.scan_number))
            })?;

        // 5. 解析类目文件夹；可训练性检查通过后两条路径不得分歧
        let class_folder = classifier::classify(
            &diagnosis.radiologist_diagnosis,
            dataset_type,
            diagnosis.ai_diagnosis.as_deref(),
        )
        .ok_or_else(|| {
            MedScanError::Internal(format!(
                "trainable diagnosis \"{}\" resolved no class folder",
                diagnosis.radiologist_diagnosis
            ))
        })?;

        // 6. 加载影像
        let images = self.repository.get_scan_images(scan_id).await?;
        if images.is_empty() {
            return Err(MedScanError::NotFound(format!(
                "no images for scan {}",
                scan.scan_number
            )));
        }

        // 7. 整个检查只计算一次划分，同一检查的影像不得跨训练/测试集
        let split = assign_split(scan_id);

        // 8. 逐张复制；已同步的影像复用原路径，单张失败不中断其余影像
        let mut paths = Vec::new();
        let mut copied = Vec::new();
        for image in &images {
            if let Some(existing) = &image.dataset_path {
                debug!("Image already synced: {}", image.id);
                paths.push(existing.clone());
                continue;
            }

            match self
                .copier
                .copy_image(
                    &image.image_url,
                    dataset_type,
                    &class_folder,
                    &patient.patient_id,
                    split,
                )
                .await
            {
                Ok(dest_url) => {
                    copied.push((image.id, dest_url.clone()));
                    paths.push(dest_url);
                }
                Err(e) => {
                    error!("Failed to copy image {}: {}", image.id, e);
                    continue;
                }
            }
        }

        // 9. 零成功视为同步失败，检查的synced标记保持不变
        if paths.is_empty() {
            return Err(MedScanError::Sync(format!(
                "failed to copy any image for scan {}",
                scan.scan_number
            )));
        }

        // 10. 单事务持久化检查标记和影像路径
        self.repository
            .mark_scan_synced(scan_id, &paths, &copied)
            .await?;

        info!(
            "✓ Synced {} ({}): {} images to {}",
            scan.scan_number,
            dataset_type.as_str(),
            paths.len(),
            class_folder
        );

        // 11. 元数据生成失败不回滚影像放置，缺失的元数据可以重新生成
        match self
            .emitter
            .emit(std::slice::from_ref(&scan), dataset_type, &class_folder)
            .await
        {
            Ok(Some(url)) => info!("✓ Metadata uploaded: {}", url),
            Ok(None) => debug!("No metadata rows for scan {}", scan.scan_number),
            Err(e) => error!("Metadata generation failed (non-critical): {}", e),
        }

        Ok(SyncResult {
            outcome: SyncOutcome::Synced,
            message: format!("synced {} images to {}", paths.len(), class_folder),
            paths,
            dataset_type: Some(dataset_type),
            class_folder: Some(class_folder),
            split: Some(split),
        })
    }
}
