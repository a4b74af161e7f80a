//! 对象存储访问
//!
//! 封装object_store，生产环境对接GCS存储桶，测试中使用内存实现。
//! 对象以 `gs://bucket/key` 形式寻址。

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use medscan_core::{MedScanError, Result};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::ObjectStore;
use tracing::info;

/// 对象存储管理器
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
}

impl ObjectStorage {
    /// 连接GCS存储桶
    ///
    /// 凭据通过环境变量加载 (GOOGLE_SERVICE_ACCOUNT等)。
    pub fn gcs(bucket: &str) -> Result<Self> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| MedScanError::Storage(e.to_string()))?;
        let store = Arc::new(store);

        info!("Object storage initialized: gs://{}", bucket);

        Ok(Self {
            store: store.clone(),
            signer: Some(store),
            bucket: bucket.to_string(),
        })
    }

    /// 创建内存存储，仅用于测试
    pub fn in_memory(bucket: &str) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            signer: None,
            bucket: bucket.to_string(),
        }
    }

    /// 存储桶名称
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// 对象键对应的完整URL
    pub fn object_url(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }

    /// 从URL中提取对象键；非URL输入原样返回
    pub fn object_key<'a>(&self, url: &'a str) -> &'a str {
        match url.strip_prefix("gs://") {
            Some(rest) => rest
                .strip_prefix(self.bucket.as_str())
                .and_then(|r| r.strip_prefix('/'))
                .unwrap_or(rest),
            None => url,
        }
    }

    /// 检查对象是否存在
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(MedScanError::Storage(e.to_string())),
        }
    }

    /// 服务端复制对象，不经过本地的字节往返
    ///
    /// 目标已存在时直接覆盖；确定性路径下重复复制产生相同结果。
    pub async fn copy(&self, source_key: &str, dest_key: &str) -> Result<()> {
        self.store
            .copy(&ObjectPath::from(source_key), &ObjectPath::from(dest_key))
            .await
            .map_err(map_storage_error)
    }

    /// 写入对象
    pub async fn write(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.store
            .put(&ObjectPath::from(key), Bytes::from(data).into())
            .await
            .map_err(|e| MedScanError::Storage(e.to_string()))?;
        Ok(())
    }

    /// 读取对象内容
    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let result = self
            .store
            .get(&ObjectPath::from(key))
            .await
            .map_err(map_storage_error)?;
        let data = result
            .bytes()
            .await
            .map_err(|e| MedScanError::Storage(e.to_string()))?;
        Ok(data.to_vec())
    }

    /// 删除对象
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .delete(&ObjectPath::from(key))
            .await
            .map_err(map_storage_error)
    }

    /// 列出前缀下的直接子对象键
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let result = self
            .store
            .list_with_delimiter(Some(&ObjectPath::from(prefix)))
            .await
            .map_err(|e| MedScanError::Storage(e.to_string()))?;
        Ok(result
            .objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect())
    }

    /// 生成限时访问的签名URL
    pub async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| MedScanError::Storage("当前存储后端不支持签名URL".to_string()))?;
        let url = signer
            .signed_url(Method::GET, &ObjectPath::from(key), ttl)
            .await
            .map_err(|e| MedScanError::Storage(e.to_string()))?;
        Ok(url.to_string())
    }
}

fn map_storage_error(e: object_store::Error) -> MedScanError {
    match e {
        object_store::Error::NotFound { path, .. } => MedScanError::NotFound(path),
        other => MedScanError::Storage(other.to_string()),
    }
}
