//! 通用工具函数

/// 从对象键中提取文件名
pub fn filename_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// 生成唯一的检查编号
pub fn generate_scan_number() -> String {
    format!(
        "SCAN-{}-{}",
        chrono::Utc::now().format("%Y%m%d"),
        uuid::Uuid::new_v4().simple()
    )
}
