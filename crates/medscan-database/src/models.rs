//! 数据库模型

use chrono::{DateTime, Utc};
use medscan_core::models::*;
use sqlx::FromRow;
use uuid::Uuid;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库检查表
#[derive(Debug, FromRow)]
pub struct DbScan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub scan_number: String,
    pub examination_type: String,
    pub body_region: String,
    pub urgency_level: String,
    pub presenting_symptoms: Option<Vec<String>>,
    pub current_medications: Option<Vec<String>>,
    pub previous_surgeries: Option<Vec<String>>,
    pub status: String, // 存储为字符串，转换为ScanStatus枚举
    pub synced_to_dataset: bool,
    pub dataset_sync_date: Option<DateTime<Utc>>,
    pub dataset_paths: Option<Vec<String>>,
    pub radiologist_review_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbScan> for Scan {
    fn from(db_scan: DbScan) -> Self {
        Scan {
            id: db_scan.id,
            patient_id: db_scan.patient_id,
            scan_number: db_scan.scan_number,
            examination_type: db_scan.examination_type,
            body_region: db_scan.body_region,
            urgency_level: db_scan.urgency_level,
            presenting_symptoms: db_scan.presenting_symptoms.unwrap_or_default(),
            current_medications: db_scan.current_medications.unwrap_or_default(),
            previous_surgeries: db_scan.previous_surgeries.unwrap_or_default(),
            status: ScanStatus::parse(&db_scan.status).unwrap_or(ScanStatus::Pending),
            synced_to_dataset: db_scan.synced_to_dataset,
            dataset_sync_date: db_scan.dataset_sync_date,
            dataset_paths: db_scan.dataset_paths,
            radiologist_review_completed_at: db_scan.radiologist_review_completed_at,
            created_at: db_scan.created_at,
            updated_at: db_scan.updated_at,
        }
    }
}

/// 数据库影像表
#[derive(Debug, FromRow)]
pub struct DbScanImage {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub image_url: String,
    pub display_url: Option<String>,
    pub dataset_path: Option<String>,
    pub image_order: i32,
    pub file_size_bytes: Option<i64>,
    pub image_format: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbScanImage> for ScanImage {
    fn from(db_image: DbScanImage) -> Self {
        ScanImage {
            id: db_image.id,
            scan_id: db_image.scan_id,
            image_url: db_image.image_url,
            display_url: db_image.display_url,
            dataset_path: db_image.dataset_path,
            image_order: db_image.image_order,
            file_size_bytes: db_image.file_size_bytes,
            image_format: db_image.image_format,
            created_at: db_image.created_at,
        }
    }
}

/// 数据库患者档案 (患者表与用户表连接查询的结果)
#[derive(Debug, FromRow)]
pub struct DbPatientProfile {
    pub id: Uuid,
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub age_years: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub gender: Option<String>,
}

impl From<DbPatientProfile> for PatientProfile {
    fn from(db_patient: DbPatientProfile) -> Self {
        PatientProfile {
            id: db_patient.id,
            patient_id: db_patient.patient_id,
            first_name: db_patient.first_name,
            last_name: db_patient.last_name,
            age_years: db_patient.age_years,
            weight_kg: db_patient.weight_kg,
            height_cm: db_patient.height_cm,
            gender: db_patient.gender,
        }
    }
}

/// 数据库诊断记录表
#[derive(Debug, FromRow)]
pub struct DbDiagnosisRecord {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub radiologist_diagnosis: String,
    pub ai_diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbDiagnosisRecord> for DiagnosisRecord {
    fn from(db_record: DbDiagnosisRecord) -> Self {
        DiagnosisRecord {
            id: db_record.id,
            scan_id: db_record.scan_id,
            radiologist_diagnosis: db_record.radiologist_diagnosis,
            ai_diagnosis: db_record.ai_diagnosis,
            created_at: db_record.created_at,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新检查插入模型
#[derive(Debug)]
pub struct NewScan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub scan_number: String,
    pub examination_type: String,
    pub body_region: String,
    pub urgency_level: String,
    pub presenting_symptoms: Vec<String>,
    pub current_medications: Vec<String>,
    pub previous_surgeries: Vec<String>,
    pub status: ScanStatus,
}

/// 新影像插入模型
#[derive(Debug)]
pub struct NewScanImage {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub image_url: String,
    pub display_url: Option<String>,
    pub image_order: i32,
    pub file_size_bytes: Option<i64>,
    pub image_format: Option<String>,
}

/// 新诊断记录插入模型
#[derive(Debug)]
pub struct NewDiagnosisRecord {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub radiologist_diagnosis: String,
    pub ai_diagnosis: Option<String>,
}
