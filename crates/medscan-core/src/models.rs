//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 影像检查记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub scan_number: String, // 对外检查编号 (如 SCAN-2026-0001)
    pub examination_type: String, // 检查设备类型 (xray, ct, mri, pet, ultrasound)
    pub body_region: String,      // 检查部位 (chest, head, abdomen等)
    pub urgency_level: String,    // 紧急程度 (routine, urgent, emergent)
    pub presenting_symptoms: Vec<String>,  // 主诉症状
    pub current_medications: Vec<String>,  // 当前用药
    pub previous_surgeries: Vec<String>,   // 既往手术史
    pub status: ScanStatus,
    pub synced_to_dataset: bool,                    // 是否已同步到训练数据集
    pub dataset_sync_date: Option<DateTime<Utc>>,   // 同步完成时间
    pub dataset_paths: Option<Vec<String>>,         // 同步后的目标路径列表
    pub radiologist_review_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scan {
    /// 检查类型的显示名称
    pub fn display_examination_type(&self) -> String {
        match self.examination_type.to_lowercase().as_str() {
            "xray" => "X-ray".to_string(),
            "ct" => "CT".to_string(),
            "mri" => "MRI".to_string(),
            "pet" => "PET".to_string(),
            "ultrasound" => "Ultrasound".to_string(),
            other => capitalize(other),
        }
    }

    /// 检查部位的显示名称
    pub fn display_body_region(&self) -> String {
        capitalize(&self.body_region)
    }

    /// 紧急程度的显示名称
    pub fn display_urgency(&self) -> String {
        capitalize(&self.urgency_level)
    }
}

fn capitalize(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// 检查工作流状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScanStatus {
    Pending,              // 待处理
    InProgress,           // 处理中
    AiAnalyzed,           // AI分析完成
    RadiologistReviewed,  // 放射科医生已复核
    Completed,            // 已完成
    Cancelled,            // 已取消
}

impl ScanStatus {
    /// 数据库存储的小写字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::InProgress => "in_progress",
            ScanStatus::AiAnalyzed => "ai_analyzed",
            ScanStatus::RadiologistReviewed => "radiologist_reviewed",
            ScanStatus::Completed => "completed",
            ScanStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<ScanStatus> {
        match value.to_lowercase().as_str() {
            "pending" => Some(ScanStatus::Pending),
            "in_progress" => Some(ScanStatus::InProgress),
            "ai_analyzed" => Some(ScanStatus::AiAnalyzed),
            "radiologist_reviewed" => Some(ScanStatus::RadiologistReviewed),
            "completed" => Some(ScanStatus::Completed),
            "cancelled" => Some(ScanStatus::Cancelled),
            _ => None,
        }
    }
}

/// 单张扫描影像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanImage {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub image_url: String,             // 暂存区对象URL (gs://bucket/platform/...)，权威来源
    pub display_url: Option<String>,   // 可选的展示用URL
    pub dataset_path: Option<String>,  // 训练数据集目标路径，同步前为空，写入后不再改写
    pub image_order: i32,
    pub file_size_bytes: Option<i64>,
    pub image_format: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 患者档案 (含关联用户的姓名信息)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub patient_id: String, // 对外患者编号 (如 PT-0001)
    pub first_name: String,
    pub last_name: String,
    pub age_years: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub gender: Option<String>,
}

impl PatientProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 放射科医生的最终诊断记录
///
/// `radiologist_diagnosis` 是训练标签的权威来源；`ai_diagnosis` 保留
/// AI推理阶段预测的亚型，仅在泛称肺癌标签下用于细分类目录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub radiologist_diagnosis: String,
    pub ai_diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 训练数据集类别
///
/// 由检查类型和检查部位派生，决定影像归入哪个训练语料库。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DatasetType {
    Tb,
    LungCancer,
}

impl DatasetType {
    /// 数据集在存储路径中的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Tb => "tb",
            DatasetType::LungCancer => "lung_cancer",
        }
    }

    /// 从检查类型和检查部位派生数据集类别
    ///
    /// 上游代码路径写入的枚举值大小写不一致，匹配前统一转小写。
    /// 无法派生时返回None，该检查跳过同步。
    pub fn from_exam(examination_type: &str, body_region: &str) -> Option<DatasetType> {
        let exam = examination_type.trim().to_lowercase();
        let region = body_region.trim().to_lowercase();

        if region != "chest" {
            return None;
        }

        match exam.as_str() {
            "xray" | "x-ray" | "radiograph" => Some(DatasetType::Tb),
            "ct" => Some(DatasetType::LungCancer),
            _ => None,
        }
    }
}

/// 训练/测试划分
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_type_from_exam() {
        assert_eq!(DatasetType::from_exam("xray", "chest"), Some(DatasetType::Tb));
        assert_eq!(DatasetType::from_exam("ct", "chest"), Some(DatasetType::LungCancer));
        assert_eq!(DatasetType::from_exam("mri", "chest"), None);
        assert_eq!(DatasetType::from_exam("ct", "head"), None);
    }

    #[test]
    fn test_dataset_type_from_exam_mixed_case() {
        // 上游存在大小写不一致的枚举值
        assert_eq!(DatasetType::from_exam("XRAY", "Chest"), Some(DatasetType::Tb));
        assert_eq!(DatasetType::from_exam("CT", "CHEST"), Some(DatasetType::LungCancer));
        assert_eq!(DatasetType::from_exam("Radiograph", "chest"), Some(DatasetType::Tb));
    }

    #[test]
    fn test_scan_status_round_trip() {
        for status in [
            ScanStatus::Pending,
            ScanStatus::InProgress,
            ScanStatus::AiAnalyzed,
            ScanStatus::RadiologistReviewed,
            ScanStatus::Completed,
            ScanStatus::Cancelled,
        ] {
            assert_eq!(ScanStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ScanStatus::parse("unknown_status"), None);
    }
}
