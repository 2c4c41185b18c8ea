use std::path::PathBuf;
use thiserror::Error;

/// # Summary
/// K 线持久化错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 创建输出目录失败
    #[error("Failed to create folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 写入输出文件失败
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 空集合不允许落盘
    #[error("Bar set {0} is empty")]
    Empty(String),
}
