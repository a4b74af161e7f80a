//! 测试夹具
//!
//! 内存仓储实现和同步流水线的组装助手，仅在测试中使用。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medscan_core::utils::generate_scan_number;
use medscan_core::{
    DatasetType, DiagnosisRecord, PatientProfile, Result, Scan, ScanImage, ScanStatus,
    SyncRepository,
};
use medscan_storage::{DatasetCopier, DatasetLayout, ObjectStorage};
use uuid::Uuid;

use crate::metadata::MetadataEmitter;
use crate::orchestrator::SyncOrchestrator;

/// 内存仓储
#[derive(Default)]
pub struct MemoryRepository {
    scans: Mutex<HashMap<Uuid, Scan>>,
    images: Mutex<HashMap<Uuid, Vec<ScanImage>>>,
    patients: Mutex<HashMap<Uuid, PatientProfile>>,
    diagnoses: Mutex<HashMap<Uuid, DiagnosisRecord>>,
}

impl MemoryRepository {
    pub fn insert_scan(&self, scan: Scan) {
        self.scans.lock().unwrap().insert(scan.id, scan);
    }

    pub fn insert_patient(&self, patient: PatientProfile) {
        self.patients.lock().unwrap().insert(patient.id, patient);
    }

    pub fn insert_diagnosis(&self, diagnosis: DiagnosisRecord) {
        self.diagnoses
            .lock()
            .unwrap()
            .insert(diagnosis.scan_id, diagnosis);
    }

    pub fn insert_image(&self, image: ScanImage) {
        self.images
            .lock()
            .unwrap()
            .entry(image.scan_id)
            .or_default()
            .push(image);
    }
}

#[async_trait]
impl SyncRepository for MemoryRepository {
    async fn get_scan(&self, scan_id: Uuid) -> Result<Option<Scan>> {
        Ok(self.scans.lock().unwrap().get(&scan_id).cloned())
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<PatientProfile>> {
        Ok(self.patients.lock().unwrap().get(&patient_id).cloned())
    }

    async fn latest_diagnosis(&self, scan_id: Uuid) -> Result<Option<DiagnosisRecord>> {
        Ok(self.diagnoses.lock().unwrap().get(&scan_id).cloned())
    }

    async fn get_scan_images(&self, scan_id: Uuid) -> Result<Vec<ScanImage>> {
        Ok(self
            .images
            .lock()
            .unwrap()
            .get(&scan_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn synced_scan_images(&self, scan_id: Uuid) -> Result<Vec<ScanImage>> {
        let images = self.get_scan_images(scan_id).await?;
        Ok(images
            .into_iter()
            .filter(|image| image.dataset_path.is_some())
            .collect())
    }

    async fn unsynced_completed_scans(&self, cutoff: DateTime<Utc>) -> Result<Vec<Scan>> {
        let diagnoses = self.diagnoses.lock().unwrap();
        Ok(self
            .scans
            .lock()
            .unwrap()
            .values()
            .filter(|scan| {
                scan.status == ScanStatus::Completed
                    && !scan.synced_to_dataset
                    && scan
                        .radiologist_review_completed_at
                        .map(|at| at >= cutoff)
                        .unwrap_or(false)
                    && diagnoses.contains_key(&scan.id)
            })
            .cloned()
            .collect())
    }

    async fn mark_scan_synced(
        &self,
        scan_id: Uuid,
        paths: &[String],
        image_paths: &[(Uuid, String)],
    ) -> Result<()> {
        let mut scans = self.scans.lock().unwrap();
        let mut images = self.images.lock().unwrap();

        if let Some(scan) = scans.get_mut(&scan_id) {
            scan.synced_to_dataset = true;
            scan.dataset_sync_date = Some(Utc::now());
            scan.dataset_paths = Some(paths.to_vec());
            scan.updated_at = Utc::now();
        }

        if let Some(scan_images) = images.get_mut(&scan_id) {
            for (image_id, path) in image_paths {
                for image in scan_images.iter_mut() {
                    if image.id == *image_id && image.dataset_path.is_none() {
                        image.dataset_path = Some(path.clone());
                    }
                }
            }
        }

        Ok(())
    }
}

/// 同步流水线测试夹具
pub struct SyncFixture {
    pub repository: Arc<MemoryRepository>,
    pub storage: Arc<ObjectStorage>,
    pub orchestrator: SyncOrchestrator,
    layout: DatasetLayout,
}

impl SyncFixture {
    pub fn new() -> Self {
        let repository = Arc::new(MemoryRepository::default());
        let storage = Arc::new(ObjectStorage::in_memory("medscan-data"));
        let layout = DatasetLayout::default();

        let copier = DatasetCopier::new(storage.clone(), layout.clone());
        let emitter = MetadataEmitter::new(repository.clone(), storage.clone(), layout.clone());
        let orchestrator = SyncOrchestrator::new(repository.clone(), copier, emitter);

        Self {
            repository,
            storage,
            orchestrator,
            layout,
        }
    }

    pub fn emitter(&self) -> MetadataEmitter {
        MetadataEmitter::new(
            self.repository.clone(),
            self.storage.clone(),
            self.layout.clone(),
        )
    }

    /// 创建一个已完成复核的检查及其患者、诊断和暂存区影像
    pub async fn add_scan(
        &self,
        examination_type: &str,
        body_region: &str,
        diagnosis: &str,
        ai_subtype: Option<&str>,
        image_count: usize,
    ) -> Uuid {
        self.add_scan_inner(
            examination_type,
            body_region,
            diagnosis,
            ai_subtype,
            image_count,
            vec!["cough".to_string()],
        )
        .await
    }

    pub async fn add_scan_with_symptoms(
        &self,
        examination_type: &str,
        body_region: &str,
        diagnosis: &str,
        symptoms: Vec<String>,
    ) -> Uuid {
        self.add_scan_inner(examination_type, body_region, diagnosis, None, 1, symptoms)
            .await
    }

    async fn add_scan_inner(
        &self,
        examination_type: &str,
        body_region: &str,
        diagnosis: &str,
        ai_subtype: Option<&str>,
        image_count: usize,
        symptoms: Vec<String>,
    ) -> Uuid {
        let now = Utc::now();
        let scan_id = Uuid::new_v4();
        let patient_uuid = Uuid::new_v4();
        let patient_code = format!("PT-{}", &patient_uuid.simple().to_string()[..8]);

        self.repository.insert_patient(PatientProfile {
            id: patient_uuid,
            patient_id: patient_code.clone(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            age_years: Some(44),
            weight_kg: Some(61.5),
            height_cm: Some(168.0),
            gender: Some("female".to_string()),
        });

        self.repository.insert_scan(Scan {
            id: scan_id,
            patient_id: patient_uuid,
            scan_number: generate_scan_number(),
            examination_type: examination_type.to_string(),
            body_region: body_region.to_string(),
            urgency_level: "routine".to_string(),
            presenting_symptoms: symptoms,
            current_medications: Vec::new(),
            previous_surgeries: Vec::new(),
            status: ScanStatus::Completed,
            synced_to_dataset: false,
            dataset_sync_date: None,
            dataset_paths: None,
            radiologist_review_completed_at: Some(now),
            created_at: now,
            updated_at: now,
        });

        self.repository.insert_diagnosis(DiagnosisRecord {
            id: Uuid::new_v4(),
            scan_id,
            radiologist_diagnosis: diagnosis.to_string(),
            ai_diagnosis: ai_subtype.map(|s| s.to_string()),
            created_at: now,
        });

        for order in 0..image_count {
            let filename = format!("image_{order}.jpg");
            let staging_key =
                self.layout
                    .staging_key(&patient_code, &scan_id.to_string(), &filename);
            self.storage
                .write(&staging_key, b"pixels".to_vec())
                .await
                .unwrap();

            self.repository.insert_image(ScanImage {
                id: Uuid::new_v4(),
                scan_id,
                image_url: self.storage.object_url(&staging_key),
                display_url: None,
                dataset_path: None,
                image_order: order as i32 + 1,
                file_size_bytes: Some(6),
                image_format: Some("jpg".to_string()),
                created_at: now,
            });
        }

        scan_id
    }

    /// 读取最近生成的元数据工件内容
    pub async fn latest_metadata_artifact(&self, dataset_type: DatasetType) -> Option<String> {
        let now = Utc::now();
        let mut keys = Vec::new();
        // 跨午夜运行时工件可能落在前一天的分区
        for day in [now, now - chrono::Duration::days(1)] {
            let prefix = format!(
                "{}/metadata/{}/{}",
                self.layout.dataset_root,
                dataset_type.as_str(),
                day.format("%Y/%m/%d")
            );
            if let Ok(mut found) = self.storage.list_keys(&prefix).await {
                keys.append(&mut found);
            }
        }

        keys.sort();
        let key = keys.pop()?;
        let data = self.storage.read(&key).await.ok()?;
        String::from_utf8(data).ok()
    }
}
