use crate::bar::BarSet;
use crate::job::Job;
use crate::store::error::StoreError;
use std::path::PathBuf;

/// # Summary
/// K 线集合持久化契约。
///
/// # Invariants
/// - 同一任务的输出路径由 [`Job::full_path`] 唯一确定，重复保存会覆盖旧文件。
pub trait BarSetStore: Send + Sync {
    /// # Summary
    /// 判断任务的全部输出文件是否已经存在。
    ///
    /// # Logic
    /// 1. 对任务请求的每一种输出格式推导路径。
    /// 2. 仅当每个文件都存在且非空时返回 true。
    fn is_complete(&self, job: &Job) -> bool;

    /// # Summary
    /// 将 K 线集合按任务请求的每种格式写盘。
    ///
    /// # Returns
    /// 成功返回写入的文件路径，顺序与任务的输出格式顺序一致。
    fn save(&self, bar_set: &BarSet) -> Result<Vec<PathBuf>, StoreError>;
}
