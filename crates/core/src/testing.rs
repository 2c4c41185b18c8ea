//! 测试替身：记录调用的远程引擎与内存 K 线存储。

use crate::bar::BarSet;
use crate::job::Job;
use crate::session::entity::{Credentials, ReplayRequest};
use crate::session::error::EngineError;
use crate::session::port::{ReplayEngine, SessionCallbacks};
use crate::store::error::StoreError;
use crate::store::port::BarSetStore;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 引擎收到的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Login { user_name: String },
    Replay(ReplayRequest),
    Logout,
    Shutdown,
}

/// # Summary
/// 只记录调用、从不主动回调的引擎。
///
/// # Invariants
/// - 登录时保存回调对象，测试通过 [`RecordingEngine::callbacks`] 取出后同步驱动事件。
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    callbacks: Mutex<Option<Arc<dyn SessionCallbacks>>>,
    fail_login: Mutex<Option<EngineError>>,
    fail_replay: Mutex<Option<EngineError>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 下一次 login 直接返回该错误
    pub fn fail_login_with(&self, error: EngineError) {
        *lock(&self.fail_login) = Some(error);
    }

    /// 下一次 replay_bars 直接返回该错误
    pub fn fail_replay_with(&self, error: EngineError) {
        *lock(&self.fail_replay) = Some(error);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    pub fn replays(&self) -> Vec<ReplayRequest> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                EngineCall::Replay(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn callbacks(&self) -> Option<Arc<dyn SessionCallbacks>> {
        lock(&self.callbacks).clone()
    }
}

impl ReplayEngine for RecordingEngine {
    fn login(
        &self,
        credentials: &Credentials,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<(), EngineError> {
        lock(&self.calls).push(EngineCall::Login {
            user_name: credentials.user_name.clone(),
        });
        if let Some(error) = lock(&self.fail_login).take() {
            return Err(error);
        }
        *lock(&self.callbacks) = Some(callbacks);
        Ok(())
    }

    fn replay_bars(&self, request: ReplayRequest) -> Result<(), EngineError> {
        lock(&self.calls).push(EngineCall::Replay(request));
        match lock(&self.fail_replay).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn logout(&self) -> Result<(), EngineError> {
        lock(&self.calls).push(EngineCall::Logout);
        Ok(())
    }

    fn shutdown(&self) -> Result<(), EngineError> {
        lock(&self.calls).push(EngineCall::Shutdown);
        lock(&self.callbacks).take();
        Ok(())
    }
}

/// # Summary
/// 内存 K 线存储，记录保存过的集合。
#[derive(Default)]
pub struct MemBarStore {
    saved: Mutex<Vec<BarSet>>,
    // 视为已完整落盘的任务，键为任务文本形式
    complete: Mutex<HashSet<String>>,
}

impl MemBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 将任务标记为已完成，入队时会被跳过
    pub fn mark_complete(&self, job: &Job) {
        lock(&self.complete).insert(job.to_string());
    }

    pub fn saved(&self) -> Vec<BarSet> {
        lock(&self.saved).clone()
    }
}

impl BarSetStore for MemBarStore {
    fn is_complete(&self, job: &Job) -> bool {
        lock(&self.complete).contains(&job.to_string())
    }

    fn save(&self, bar_set: &BarSet) -> Result<Vec<PathBuf>, StoreError> {
        if bar_set.is_empty() {
            return Err(StoreError::Empty(bar_set.to_string()));
        }

        let paths = bar_set
            .job()
            .kinds()
            .iter()
            .map(|kind| PathBuf::from(bar_set.job().file_name(*kind)))
            .collect();

        lock(&self.complete).insert(bar_set.job().to_string());
        lock(&self.saved).push(bar_set.clone());
        Ok(paths)
    }
}
