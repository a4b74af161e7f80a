//! MLOps同步补偿扫描器主程序
//!
//! 由计划任务周期性调用，重新驱动回溯窗口内所有"已诊断未同步"的
//! 检查。实时同步路径是尽力而为的后台任务，此程序是持久性兜底。

mod config;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use medscan_database::{DatabasePool, DatabaseQueries};
use medscan_storage::{DatasetCopier, DatasetLayout, ObjectStorage};
use medscan_sync::{MetadataEmitter, RetrySweeper, SyncOrchestrator};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::SweeperSettings;

/// 扫描器命令行参数
#[derive(Parser, Debug)]
#[command(name = "medscan-sweeper")]
#[command(about = "重新同步已诊断但未进入训练数据集的检查")]
struct Args {
    /// 回溯最近N天的未同步检查
    #[arg(short, long, default_value = "7")]
    days: i64,

    /// 只列出将要补偿的检查，不执行同步
    #[arg(long)]
    dry_run: bool,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .init();

    let settings =
        SweeperSettings::load(args.config.as_deref()).context("加载扫描器配置失败")?;

    info!("启动MLOps同步扫描器...");
    info!("  存储桶: gs://{}", settings.bucket);
    info!("  数据集命名空间: {}/", settings.dataset_root);
    info!("  回溯窗口: {}天", args.days);

    let pool = DatabasePool::connect(&settings.database_url, settings.max_connections)
        .await
        .context("数据库连接失败")?;
    let repository = Arc::new(DatabaseQueries::new(pool));

    let storage = Arc::new(ObjectStorage::gcs(&settings.bucket).context("对象存储初始化失败")?);
    let layout = DatasetLayout::new(&settings.dataset_root, &settings.staging_root);
    let copier = DatasetCopier::new(storage.clone(), layout.clone())
        .with_timeout(StdDuration::from_secs(settings.copy_timeout_secs));
    let emitter = MetadataEmitter::new(repository.clone(), storage, layout);
    let orchestrator = SyncOrchestrator::new(repository.clone(), copier, emitter);
    let sweeper = RetrySweeper::new(repository, orchestrator);

    let lookback = Duration::days(args.days);

    if args.dry_run {
        let pending = sweeper.pending(lookback).await?;
        println!("DRY RUN - {} scan(s) would be retried", pending.len());
        for scan in pending {
            println!(
                "  {} ({}/{})",
                scan.scan_number, scan.examination_type, scan.body_region
            );
        }
        return Ok(());
    }

    let stats = sweeper.sweep(lookback).await?;

    // 打印汇总
    println!();
    println!("{}", "=".repeat(60));
    println!("SYNC SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Scans attempted: {}", stats.attempted);
    println!("Synced:          {}", stats.succeeded);
    println!("Skipped:         {}", stats.skipped);
    println!("Failed:          {}", stats.failed);
    println!("{}", "=".repeat(60));

    // 有失败时以非零状态退出，便于接入监控告警
    if stats.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
