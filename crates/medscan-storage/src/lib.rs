//! # MedScan存储模块
//!
//! 负责影像对象的存储访问与训练数据集目录布局管理。

pub mod dataset;
pub mod storage;

pub use dataset::{DatasetCopier, DatasetLayout};
pub use storage::ObjectStorage;
