//! 训练/测试划分分配
//!
//! 划分只依赖检查ID，不依赖时钟或调用顺序：重复同步同一检查不得
//! 在划分之间移动，否则模型可能同时见到同一患者的训练和测试影像。

use medscan_core::Split;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// 训练集占比
pub const TRAIN_RATIO: f64 = 0.8;

/// 按检查ID确定性分配训练/测试划分
///
/// 对ID做SHA-256，取摘要前8字节映射到[0, 1)后与占比阈值比较。
pub fn assign_split(scan_id: Uuid) -> Split {
    let digest = Sha256::digest(scan_id.as_bytes());
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    let ratio = u64::from_be_bytes(buf) as f64 / u64::MAX as f64;

    if ratio < TRAIN_RATIO {
        Split::Train
    } else {
        Split::Test
    }
}
