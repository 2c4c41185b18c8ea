use barfetch_core::bar::BarSet;
use barfetch_core::job::Job;
use barfetch_core::store::error::StoreError;
use barfetch_core::store::port::BarSetStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// # Summary
/// 将 K 线集合写为文本文件，每种输出格式一个文件。
///
/// # Invariants
/// - 文件路径由 [`Job::full_path`] 决定，`in_folders` 控制是否按格式/尺寸/品种/年份分目录。
/// - 先写入同目录下的临时文件再改名，中断的写入不会留下看似完整的输出。
#[derive(Debug, Clone)]
pub struct FileBarStore {
    save_to: PathBuf,
    in_folders: bool,
}

impl FileBarStore {
    pub fn new(save_to: impl Into<PathBuf>, in_folders: bool) -> Self {
        Self {
            save_to: save_to.into(),
            in_folders,
        }
    }

    pub fn save_to(&self) -> &Path {
        &self.save_to
    }

    fn write(path: &Path, content: &str) -> Result<(), StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateFolder {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let staging = path.with_extension("csv.partial");
        fs::write(&staging, content)
            .and_then(|_| fs::rename(&staging, path))
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl BarSetStore for FileBarStore {
    /// 每种输出格式的文件都存在且非空才算完成，空文件视为缺失
    fn is_complete(&self, job: &Job) -> bool {
        job.kinds().iter().all(|kind| {
            let path = job.full_path(&self.save_to, self.in_folders, *kind);
            match fs::metadata(&path) {
                Ok(meta) => meta.is_file() && meta.len() > 0,
                Err(_) => false,
            }
        })
    }

    /// # Summary
    /// 按任务请求的每种格式写出文件。
    ///
    /// # Logic
    /// 1. 拒绝空集合，空回放不应产生文件。
    /// 2. 对每种格式推导路径，按需创建父目录后写入。
    fn save(&self, bar_set: &BarSet) -> Result<Vec<PathBuf>, StoreError> {
        if bar_set.is_empty() {
            return Err(StoreError::Empty(bar_set.to_string()));
        }

        let job = bar_set.job();
        let mut paths = Vec::with_capacity(job.kinds().len());
        for kind in job.kinds() {
            let path = job.full_path(&self.save_to, self.in_folders, *kind);
            debug!("Writing {}", path.display());
            Self::write(&path, &bar_set.render(*kind))?;
            info!("BarSetSaved: {} ({} bars)", job.file_name(*kind), bar_set.len());
            paths.push(path);
        }
        Ok(paths)
    }
}
