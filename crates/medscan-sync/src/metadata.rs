//! 元数据生成器
//!
//! 为已同步影像生成训练流水线约定格式的CSV工件。与编排器的数据库
//! 状态无事务关系：影像放置正确性是更高优先级的保证，缺失的元数据
//! 可以重新生成。

use std::sync::Arc;

use chrono::Utc;
use medscan_core::{DatasetType, Result, Scan, SyncRepository};
use medscan_storage::{DatasetLayout, ObjectStorage};
use tracing::{info, warn};

/// CSV列顺序，与下游训练流水线的既有格式保持一致
pub const METADATA_COLUMNS: [&str; 14] = [
    "Patient_Full_Name",
    "Patient_ID",
    "Presenting_Symptoms",
    "Current_Medications",
    "Previous_Relevant_Surgeries",
    "Age_Years",
    "Weight_KG",
    "Height_CM",
    "Gender",
    "Examination_Type",
    "Body_Region",
    "Urgency_Level",
    "Image_Path",
    "Diagnosis_Class",
];

/// 元数据生成器
pub struct MetadataEmitter {
    repository: Arc<dyn SyncRepository>,
    storage: Arc<ObjectStorage>,
    layout: DatasetLayout,
}

impl MetadataEmitter {
    pub fn new(
        repository: Arc<dyn SyncRepository>,
        storage: Arc<ObjectStorage>,
        layout: DatasetLayout,
    ) -> Self {
        Self {
            repository,
            storage,
            layout,
        }
    }

    /// 为一批检查生成并上传元数据CSV，返回工件URL
    ///
    /// 每张已同步影像产出一行；没有已同步影像的检查被跳过。零行时
    /// 不写任何对象并返回None。
    pub async fn emit(
        &self,
        scans: &[Scan],
        dataset_type: DatasetType,
        class_folder: &str,
    ) -> Result<Option<String>> {
        let mut rows = Vec::new();

        for scan in scans {
            let Some(patient) = self.repository.get_patient(scan.patient_id).await? else {
                warn!(
                    "Patient missing for scan {}, skipping metadata rows",
                    scan.scan_number
                );
                continue;
            };

            for image in self.repository.synced_scan_images(scan.id).await? {
                // 防御：查询只应返回已同步影像
                let Some(dataset_path) = image.dataset_path else {
                    continue;
                };

                // Image_Path列使用桶内相对路径
                let image_path = self.storage.object_key(&dataset_path).to_string();

                rows.push([
                    patient.full_name(),
                    patient.patient_id.clone(),
                    scan.presenting_symptoms.join(", "),
                    scan.current_medications.join(", "),
                    scan.previous_surgeries.join(", "),
                    patient.age_years.map(|v| v.to_string()).unwrap_or_default(),
                    patient.weight_kg.map(|v| v.to_string()).unwrap_or_default(),
                    patient.height_cm.map(|v| v.to_string()).unwrap_or_default(),
                    patient.gender.clone().unwrap_or_default(),
                    scan.display_examination_type(),
                    scan.display_body_region(),
                    scan.display_urgency(),
                    image_path,
                    class_folder.to_string(),
                ]);
            }
        }

        if rows.is_empty() {
            return Ok(None);
        }

        let csv = render_csv(&rows);
        let key = self.layout.metadata_key(dataset_type, Utc::now());
        self.storage.write(&key, csv.into_bytes()).await?;

        let url = self.storage.object_url(&key);
        info!("Generated metadata CSV: {} rows -> {}", rows.len(), url);
        Ok(Some(url))
    }
}

fn render_csv(rows: &[[String; METADATA_COLUMNS.len()]]) -> String {
    let mut out = METADATA_COLUMNS.join(",");
    out.push('\n');
    for row in rows {
        let escaped: Vec<String> = row.iter().map(|field| escape_field(field)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

/// 含分隔符、引号或换行的字段加引号转义
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("cough, fever"), "\"cough, fever\"");
        assert_eq!(escape_field("said \"ouch\""), "\"said \"\"ouch\"\"\"");
    }

    #[tokio::test]
    async fn test_emit_one_row_per_synced_image() {
        let fixture = SyncFixture::new();
        let first = fixture
            .add_scan("xray", "chest", "tuberculosis", None, 2)
            .await;
        let second = fixture
            .add_scan("xray", "chest", "tuberculosis", None, 1)
            .await;
        fixture.orchestrator.sync_scan(first).await.unwrap();
        fixture.orchestrator.sync_scan(second).await.unwrap();

        let scans = vec![
            fixture.repository.get_scan(first).await.unwrap().unwrap(),
            fixture.repository.get_scan(second).await.unwrap().unwrap(),
        ];

        let url = fixture
            .emitter()
            .emit(&scans, DatasetType::Tb, "Tuberculosis")
            .await
            .unwrap()
            .expect("artifact should be written");

        let key = fixture.storage.object_key(&url).to_string();
        let content = String::from_utf8(fixture.storage.read(&key).await.unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        // 表头 + 三行影像元数据
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], METADATA_COLUMNS.join(","));
        for line in &lines[1..] {
            assert!(line.ends_with(",Tuberculosis"));
            // Image_Path列为桶内相对路径
            assert!(line.contains(",vision/tb/"));
        }
    }

    #[tokio::test]
    async fn test_emit_without_synced_images_returns_none() {
        let fixture = SyncFixture::new();
        let scan_id = fixture
            .add_scan("xray", "chest", "tuberculosis", None, 1)
            .await;
        // 未经同步，影像没有目标路径
        let scan = fixture.repository.get_scan(scan_id).await.unwrap().unwrap();

        let result = fixture
            .emitter()
            .emit(&[scan], DatasetType::Tb, "Tuberculosis")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_emit_quotes_list_fields() {
        let fixture = SyncFixture::new();
        let scan_id = fixture
            .add_scan_with_symptoms(
                "xray",
                "chest",
                "tuberculosis",
                vec!["cough".to_string(), "night sweats".to_string()],
            )
            .await;
        fixture.orchestrator.sync_scan(scan_id).await.unwrap();
        let scan = fixture.repository.get_scan(scan_id).await.unwrap().unwrap();

        let url = fixture
            .emitter()
            .emit(&[scan], DatasetType::Tb, "Tuberculosis")
            .await
            .unwrap()
            .unwrap();

        let key = fixture.storage.object_key(&url).to_string();
        let content = String::from_utf8(fixture.storage.read(&key).await.unwrap()).unwrap();
        // 多值症状列表以", "连接后必须整体加引号
        assert!(content.contains("\"cough, night sweats\""));
    }
}
