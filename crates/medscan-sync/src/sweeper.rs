//! 重试扫描器
//!
//! 实时同步以后台任务方式尽力而为地运行，失败对调用方不可见。
//! 扫描器按计划重新驱动所有"已诊断未同步"的检查，是持久性的兜底。
//! 与实时路径并发运行依赖编排器的幂等性，不做扫描器侧加锁。

use std::sync::Arc;

use chrono::{Duration, Utc};
use medscan_core::{Result, Scan, SyncRepository};
use tracing::{error, info};

use crate::orchestrator::SyncOrchestrator;

/// 单轮扫描的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 重试扫描器
pub struct RetrySweeper {
    repository: Arc<dyn SyncRepository>,
    orchestrator: SyncOrchestrator,
}

impl RetrySweeper {
    pub fn new(repository: Arc<dyn SyncRepository>, orchestrator: SyncOrchestrator) -> Self {
        Self {
            repository,
            orchestrator,
        }
    }

    /// 查询回溯窗口内待补偿同步的检查
    pub async fn pending(&self, lookback: Duration) -> Result<Vec<Scan>> {
        let cutoff = Utc::now() - lookback;
        self.repository.unsynced_completed_scans(cutoff).await
    }

    /// 重新驱动回溯窗口内所有未同步的已诊断检查
    pub async fn sweep(&self, lookback: Duration) -> Result<SweepStats> {
        let scans = self.pending(lookback).await?;

        if scans.is_empty() {
            info!("✓ All scans synced - nothing to retry");
            return Ok(SweepStats::default());
        }

        info!("Found {} unsynced diagnosed scans", scans.len());
        let mut stats = SweepStats::default();

        for scan in scans {
            stats.attempted += 1;

            match self.orchestrator.sync_scan(scan.id).await {
                Ok(result) if result.is_synced() => {
                    stats.succeeded += 1;
                }
                Ok(result) => {
                    info!("Skipped {}: {}", scan.scan_number, result.message);
                    stats.skipped += 1;
                }
                Err(e) => {
                    error!("Retry failed for {}: {}", scan.scan_number, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "✓ Sweep complete: {} synced, {} skipped, {} failed",
            stats.succeeded, stats.skipped, stats.failed
        );
        Ok(stats)
    }
}
