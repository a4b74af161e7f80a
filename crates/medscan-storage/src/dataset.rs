//! 训练数据集目录布局与影像复制
//!
//! 数据集命名空间 (默认vision/) 与平台暂存命名空间 (默认platform/)
//! 相互独立：复制只向数据集命名空间追加对象，从不改动暂存区。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use medscan_core::utils::filename_from_key;
use medscan_core::{DatasetType, MedScanError, Result, Split};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::ObjectStorage;

/// 默认的单次复制超时
const DEFAULT_COPY_TIMEOUT: Duration = Duration::from_secs(30);

/// 数据集目录布局
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetLayout {
    /// 训练数据集根命名空间
    pub dataset_root: String,
    /// 平台暂存根命名空间
    pub staging_root: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            dataset_root: "vision".to_string(),
            staging_root: "platform".to_string(),
        }
    }
}

impl DatasetLayout {
    pub fn new(dataset_root: &str, staging_root: &str) -> Self {
        Self {
            dataset_root: dataset_root.to_string(),
            staging_root: staging_root.to_string(),
        }
    }

    /// 影像在数据集中的目标键
    ///
    /// 格式: `<root>/<dataset_type>/<split>/<class_folder>/<YYYYMMDD>_<patient_id>_<filename>`
    pub fn destination_key(
        &self,
        dataset_type: DatasetType,
        split: Split,
        class_folder: &str,
        patient_id: &str,
        filename: &str,
        date: DateTime<Utc>,
    ) -> String {
        format!(
            "{}/{}/{}/{}/{}_{}_{}",
            self.dataset_root,
            dataset_type.as_str(),
            split.as_str(),
            class_folder,
            date.format("%Y%m%d"),
            patient_id,
            filename
        )
    }

    /// 元数据工件的目标键
    ///
    /// 格式: `<root>/metadata/<dataset_type>/<YYYY>/<MM>/<DD>/<dataset_type>_patients_<YYYYMMDD_HHMMSS>.csv`
    /// 文件名带时间戳，同一天多次同步互不覆盖。
    pub fn metadata_key(&self, dataset_type: DatasetType, timestamp: DateTime<Utc>) -> String {
        format!(
            "{}/metadata/{}/{}/{}_patients_{}.csv",
            self.dataset_root,
            dataset_type.as_str(),
            timestamp.format("%Y/%m/%d"),
            dataset_type.as_str(),
            timestamp.format("%Y%m%d_%H%M%S")
        )
    }

    /// 影像在暂存区中的键
    pub fn staging_key(&self, patient_id: &str, scan_id: &str, filename: &str) -> String {
        format!(
            "{}/raw_scans/patients/{}/{}/{}",
            self.staging_root, patient_id, scan_id, filename
        )
    }
}

/// 影像复制服务
///
/// 把单张影像从暂存区服务端复制到数据集的类目/划分目录下。
pub struct DatasetCopier {
    storage: Arc<ObjectStorage>,
    layout: DatasetLayout,
    copy_timeout: Duration,
}

impl DatasetCopier {
    pub fn new(storage: Arc<ObjectStorage>, layout: DatasetLayout) -> Self {
        Self {
            storage,
            layout,
            copy_timeout: DEFAULT_COPY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.copy_timeout = timeout;
        self
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// 复制一张影像到训练数据集，返回目标URL
    ///
    /// 前置条件：源对象存在，否则返回NotFound。超时按单张影像失败
    /// 处理，由调用方决定是否继续其余影像。
    pub async fn copy_image(
        &self,
        source_url: &str,
        dataset_type: DatasetType,
        class_folder: &str,
        patient_id: &str,
        split: Split,
    ) -> Result<String> {
        let source_key = self.storage.object_key(source_url);

        if !self.storage.exists(source_key).await? {
            return Err(MedScanError::NotFound(format!(
                "source image missing: {source_url}"
            )));
        }

        let filename = filename_from_key(source_key);
        if filename.is_empty() {
            return Err(MedScanError::Validation(format!(
                "source url has no filename: {source_url}"
            )));
        }

        let dest_key = self.layout.destination_key(
            dataset_type,
            split,
            class_folder,
            patient_id,
            filename,
            Utc::now(),
        );

        match tokio::time::timeout(self.copy_timeout, self.storage.copy(source_key, &dest_key))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(MedScanError::Storage(format!(
                    "copy timed out after {}s: {source_url}",
                    self.copy_timeout.as_secs()
                )))
            }
        }

        let dest_url = self.storage.object_url(&dest_key);
        info!("Copied image to dataset: {}", dest_url);
        Ok(dest_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_destination_key_format() {
        let layout = DatasetLayout::default();
        let key = layout.destination_key(
            DatasetType::Tb,
            Split::Train,
            "Tuberculosis",
            "PT-0007",
            "original.jpg",
            fixed_time(),
        );
        assert_eq!(key, "vision/tb/train/Tuberculosis/20260314_PT-0007_original.jpg");
    }

    #[test]
    fn test_metadata_key_format() {
        let layout = DatasetLayout::default();
        let key = layout.metadata_key(DatasetType::LungCancer, fixed_time());
        assert_eq!(
            key,
            "vision/metadata/lung_cancer/2026/03/14/lung_cancer_patients_20260314_092653.csv"
        );
    }

    #[test]
    fn test_staging_key_format() {
        let layout = DatasetLayout::default();
        let key = layout.staging_key("PT-0007", "scan-1", "original.jpg");
        assert_eq!(key, "platform/raw_scans/patients/PT-0007/scan-1/original.jpg");
    }

    #[tokio::test]
    async fn test_copy_image_places_object() {
        let storage = Arc::new(ObjectStorage::in_memory("medscan-data"));
        let layout = DatasetLayout::default();
        let copier = DatasetCopier::new(storage.clone(), layout.clone());

        let staging = layout.staging_key("PT-0001", "scan-1", "original.jpg");
        storage.write(&staging, b"img".to_vec()).await.unwrap();

        let dest_url = copier
            .copy_image(
                &storage.object_url(&staging),
                DatasetType::Tb,
                "Tuberculosis",
                "PT-0001",
                Split::Train,
            )
            .await
            .unwrap();

        assert!(dest_url.starts_with("gs://medscan-data/vision/tb/train/Tuberculosis/"));
        assert!(dest_url.ends_with("_PT-0001_original.jpg"));
        assert!(storage.exists(storage.object_key(&dest_url)).await.unwrap());
        // 暂存区源对象不受影响
        assert!(storage.exists(&staging).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_image_missing_source() {
        let storage = Arc::new(ObjectStorage::in_memory("medscan-data"));
        let copier = DatasetCopier::new(storage.clone(), DatasetLayout::default());

        let result = copier
            .copy_image(
                "gs://medscan-data/platform/raw_scans/patients/PT-0001/scan-1/missing.jpg",
                DatasetType::Tb,
                "Normal",
                "PT-0001",
                Split::Test,
            )
            .await;
        assert!(matches!(result, Err(MedScanError::NotFound(_))));
    }
}
