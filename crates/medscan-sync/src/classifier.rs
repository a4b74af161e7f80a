//! 诊断分类器
//!
//! 把放射科医生的诊断标签映射为训练数据集的类目文件夹名，并判定
//! 标签是否可用于训练。纯函数，相同输入必须产生相同输出。
//!
//! 上游各代码路径写入的诊断和数据集类别字符串大小写不一致，所有
//! 匹配必须先统一转小写，这是正确性要求而非风格偏好。

use medscan_core::DatasetType;
use tracing::warn;

/// 任何数据集下都不可训练的诊断标签
const EXCLUDED_DIAGNOSES: [&str; 3] = ["inconclusive", "other_abnormality", "unknown"];

/// 肺癌数据集的已知具体亚型
const LUNG_CANCER_SUBTYPES: [&str; 6] = [
    "adenocarcinoma",
    "squamous_cell_carcinoma",
    "large_cell_carcinoma",
    "benign",
    "malignant",
    "normal",
];

/// 泛称肺癌标签
const GENERIC_LUNG_CANCER: &str = "lung_cancer";

/// 泛称标签下无可用亚型时的回退类目
const LUNG_CANCER_FALLBACK_FOLDER: &str = "malignant";

/// 解析诊断对应的类目文件夹
///
/// 医生给出泛称`lung_cancer`标签时，AI预测的亚型仅用于细分类目
/// (医生提供"是癌"的真值，AI亚型决定归入哪个癌种文件夹)；医生给出
/// 任何具体标签时，AI输出不参与决策。不可训练的标签返回None。
pub fn classify(
    diagnosis: &str,
    dataset_type: DatasetType,
    ai_subtype: Option<&str>,
) -> Option<String> {
    let diagnosis = diagnosis.trim().to_lowercase();

    if EXCLUDED_DIAGNOSES.contains(&diagnosis.as_str()) {
        return None;
    }

    match dataset_type {
        DatasetType::Tb => match diagnosis.as_str() {
            "normal" => Some("Normal".to_string()),
            "tuberculosis" => Some("Tuberculosis".to_string()),
            _ => None,
        },
        DatasetType::LungCancer => {
            if LUNG_CANCER_SUBTYPES.contains(&diagnosis.as_str()) {
                return Some(diagnosis);
            }

            if diagnosis == GENERIC_LUNG_CANCER {
                if let Some(subtype) = ai_subtype {
                    let subtype = subtype.trim().to_lowercase();
                    if LUNG_CANCER_SUBTYPES.contains(&subtype.as_str()) {
                        return Some(subtype);
                    }
                }
                // 回退是可观测事件，不是错误
                warn!(
                    "No usable AI subtype for generic lung_cancer diagnosis, using fallback folder '{}'",
                    LUNG_CANCER_FALLBACK_FOLDER
                );
                return Some(LUNG_CANCER_FALLBACK_FOLDER.to_string());
            }

            None
        }
    }
}

/// 判定诊断标签在给定数据集下是否可训练
pub fn is_trainable(diagnosis: &str, dataset_type: DatasetType) -> bool {
    let diagnosis = diagnosis.trim().to_lowercase();

    if EXCLUDED_DIAGNOSES.contains(&diagnosis.as_str()) {
        return false;
    }

    match dataset_type {
        DatasetType::Tb => matches!(diagnosis.as_str(), "normal" | "tuberculosis"),
        DatasetType::LungCancer => {
            LUNG_CANCER_SUBTYPES.contains(&diagnosis.as_str()) || diagnosis == GENERIC_LUNG_CANCER
        }
    }
}
