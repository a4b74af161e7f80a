//! 数据库查询操作

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medscan_core::{
    DiagnosisRecord, MedScanError, PatientProfile, Result, Scan, ScanImage, SyncRepository,
};
use sqlx::Row;
use uuid::Uuid;

use crate::connection::DatabasePool;
use crate::models::*;

/// 数据库查询操作接口
#[derive(Clone)]
pub struct DatabaseQueries {
    pool: DatabasePool,
}

impl DatabaseQueries {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建用户表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(255) UNIQUE NOT NULL,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'patient',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MedScanError::Database(e.to_string()))?;

        // 创建患者档案表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patient_profiles (
                id UUID PRIMARY KEY,
                user_id UUID UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                patient_id VARCHAR(50) UNIQUE NOT NULL,
                age_years INTEGER,
                weight_kg DOUBLE PRECISION,
                height_cm DOUBLE PRECISION,
                gender VARCHAR(50),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MedScanError::Database(e.to_string()))?;

        // 创建检查表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS scans (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL REFERENCES patient_profiles(id) ON DELETE CASCADE,
                scan_number VARCHAR(50) UNIQUE NOT NULL,
                examination_type VARCHAR(20) NOT NULL,
                body_region VARCHAR(20) NOT NULL,
                urgency_level VARCHAR(20) NOT NULL DEFAULT 'routine',
                presenting_symptoms TEXT[],
                current_medications TEXT[],
                previous_surgeries TEXT[],
                status VARCHAR(30) NOT NULL DEFAULT 'pending',
                synced_to_dataset BOOLEAN NOT NULL DEFAULT FALSE,
                dataset_sync_date TIMESTAMP WITH TIME ZONE,
                dataset_paths TEXT[],
                radiologist_review_completed_at TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MedScanError::Database(e.to_string()))?;

        // 创建影像表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS scan_images (
                id UUID PRIMARY KEY,
                scan_id UUID NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
                image_url TEXT NOT NULL,
                display_url TEXT,
                dataset_path TEXT,
                image_order INTEGER NOT NULL DEFAULT 1,
                file_size_bytes BIGINT,
                image_format VARCHAR(10),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MedScanError::Database(e.to_string()))?;

        // 创建诊断记录表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS diagnosis_records (
                id UUID PRIMARY KEY,
                scan_id UUID NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
                radiologist_diagnosis VARCHAR(50) NOT NULL,
                ai_diagnosis VARCHAR(50),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MedScanError::Database(e.to_string()))?;

        // 创建索引以优化查询性能
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_patient_profiles_patient_id ON patient_profiles(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_scans_patient_id ON scans(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_scans_status ON scans(status)",
            "CREATE INDEX IF NOT EXISTS idx_scans_synced ON scans(synced_to_dataset)",
            "CREATE INDEX IF NOT EXISTS idx_scans_review_completed ON scans(radiologist_review_completed_at)",
            "CREATE INDEX IF NOT EXISTS idx_scan_images_scan_id ON scan_images(scan_id)",
            "CREATE INDEX IF NOT EXISTS idx_diagnosis_records_scan_id ON diagnosis_records(scan_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| MedScanError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 检查相关操作 ==========

    /// 创建新检查
    pub async fn create_scan(&self, scan: &NewScan) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO scans (id, patient_id, scan_number, examination_type, body_region,
                               urgency_level, presenting_symptoms, current_medications,
                               previous_surgeries, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
        "#)
        .bind(scan.id)
        .bind(scan.patient_id)
        .bind(&scan.scan_number)
        .bind(&scan.examination_type)
        .bind(&scan.body_region)
        .bind(&scan.urgency_level)
        .bind(&scan.presenting_symptoms)
        .bind(&scan.current_medications)
        .bind(&scan.previous_surgeries)
        .bind(scan.status.as_str())
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| MedScanError::Database(e.to_string()))
    }

    /// 根据ID查找检查
    pub async fn get_scan_by_id(&self, id: &Uuid) -> Result<Option<Scan>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbScan>(
            "SELECT * FROM scans WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(result.map(Scan::from))
    }

    /// 更新检查的工作流状态
    pub async fn update_scan_status(&self, id: &Uuid, status: &str) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(
            "UPDATE scans SET status = $1, updated_at = NOW() WHERE id = $2"
        )
        .bind(status)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(())
    }

    /// 查询已完成复核但尚未同步的检查
    ///
    /// 仅返回已有诊断记录、且复核完成时间晚于cutoff的检查，供重试
    /// 扫描器驱动补偿同步。
    pub async fn get_unsynced_completed_scans(&self, cutoff: DateTime<Utc>) -> Result<Vec<Scan>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbScan>(r#"
            SELECT s.* FROM scans s
            WHERE s.status = 'completed'
              AND s.synced_to_dataset = FALSE
              AND s.radiologist_review_completed_at >= $1
              AND EXISTS (SELECT 1 FROM diagnosis_records d WHERE d.scan_id = s.id)
            ORDER BY s.radiologist_review_completed_at
        "#)
        .bind(cutoff)
        .fetch_all(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Scan::from).collect())
    }

    /// 在单个事务中持久化同步结果
    ///
    /// 影像目标路径只在原值为空时写入，已同步影像的路径不被覆盖。
    pub async fn persist_sync_result(
        &self,
        scan_id: &Uuid,
        paths: &[String],
        image_paths: &[(Uuid, String)],
    ) -> Result<()> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| MedScanError::Database(e.to_string()))?;

        for (image_id, dataset_path) in image_paths {
            sqlx::query(
                "UPDATE scan_images SET dataset_path = $1 WHERE id = $2 AND dataset_path IS NULL"
            )
            .bind(dataset_path)
            .bind(image_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| MedScanError::Database(e.to_string()))?;
        }

        sqlx::query(r#"
            UPDATE scans
            SET synced_to_dataset = TRUE,
                dataset_sync_date = NOW(),
                dataset_paths = $1,
                updated_at = NOW()
            WHERE id = $2
        "#)
        .bind(paths.to_vec())
        .bind(scan_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 影像相关操作 ==========

    /// 创建新影像
    pub async fn create_scan_image(&self, image: &NewScanImage) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO scan_images (id, scan_id, image_url, display_url, image_order,
                                     file_size_bytes, image_format)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#)
        .bind(image.id)
        .bind(image.scan_id)
        .bind(&image.image_url)
        .bind(&image.display_url)
        .bind(image.image_order)
        .bind(image.file_size_bytes)
        .bind(&image.image_format)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| MedScanError::Database(e.to_string()))
    }

    /// 根据检查ID获取所有影像
    pub async fn get_images_by_scan_id(&self, scan_id: &Uuid) -> Result<Vec<ScanImage>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbScanImage>(
            "SELECT * FROM scan_images WHERE scan_id = $1 ORDER BY image_order"
        )
        .bind(scan_id)
        .fetch_all(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(results.into_iter().map(ScanImage::from).collect())
    }

    /// 根据检查ID获取已同步的影像
    pub async fn get_synced_images_by_scan_id(&self, scan_id: &Uuid) -> Result<Vec<ScanImage>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbScanImage>(
            "SELECT * FROM scan_images WHERE scan_id = $1 AND dataset_path IS NOT NULL ORDER BY image_order"
        )
        .bind(scan_id)
        .fetch_all(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(results.into_iter().map(ScanImage::from).collect())
    }

    // ========== 患者相关操作 ==========

    /// 根据ID查找患者档案 (连接用户表取姓名)
    pub async fn get_patient_by_id(&self, id: &Uuid) -> Result<Option<PatientProfile>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatientProfile>(r#"
            SELECT pp.id, pp.patient_id, u.first_name, u.last_name,
                   pp.age_years, pp.weight_kg, pp.height_cm, pp.gender
            FROM patient_profiles pp
            JOIN users u ON pp.user_id = u.id
            WHERE pp.id = $1
        "#)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(result.map(PatientProfile::from))
    }

    // ========== 诊断相关操作 ==========

    /// 创建新诊断记录
    pub async fn create_diagnosis_record(&self, record: &NewDiagnosisRecord) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO diagnosis_records (id, scan_id, radiologist_diagnosis, ai_diagnosis)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        "#)
        .bind(record.id)
        .bind(record.scan_id)
        .bind(&record.radiologist_diagnosis)
        .bind(&record.ai_diagnosis)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| MedScanError::Database(e.to_string()))
    }

    /// 获取检查的最新诊断记录
    pub async fn get_latest_diagnosis(&self, scan_id: &Uuid) -> Result<Option<DiagnosisRecord>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbDiagnosisRecord>(
            "SELECT * FROM diagnosis_records WHERE scan_id = $1 ORDER BY created_at DESC LIMIT 1"
        )
        .bind(scan_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MedScanError::Database(e.to_string()))?;

        Ok(result.map(DiagnosisRecord::from))
    }
}

// 同步子系统仓储接口的生产实现
#[async_trait]
impl SyncRepository for DatabaseQueries {
    async fn get_scan(&self, scan_id: Uuid) -> Result<Option<Scan>> {
        self.get_scan_by_id(&scan_id).await
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<PatientProfile>> {
        self.get_patient_by_id(&patient_id).await
    }

    async fn latest_diagnosis(&self, scan_id: Uuid) -> Result<Option<DiagnosisRecord>> {
        self.get_latest_diagnosis(&scan_id).await
    }

    async fn get_scan_images(&self, scan_id: Uuid) -> Result<Vec<ScanImage>> {
        self.get_images_by_scan_id(&scan_id).await
    }

    async fn synced_scan_images(&self, scan_id: Uuid) -> Result<Vec<ScanImage>> {
        self.get_synced_images_by_scan_id(&scan_id).await
    }

    async fn unsynced_completed_scans(&self, cutoff: DateTime<Utc>) -> Result<Vec<Scan>> {
        self.get_unsynced_completed_scans(cutoff).await
    }

    async fn mark_scan_synced(
        &self,
        scan_id: Uuid,
        paths: &[String],
        image_paths: &[(Uuid, String)],
    ) -> Result<()> {
        self.persist_sync_result(&scan_id, paths, image_paths).await
    }
}
