use crate::bar::BarSet;
use crate::bar::error::BarSetError;
use crate::job::Job;
use crate::session::entity::{AlertInfo, BarInfo, BarReplayInfo, Credentials, ReplayRequest};
use crate::session::error::EngineError;
use std::sync::Arc;

/// # Summary
/// 远程历史行情引擎契约。
///
/// # Invariants
/// - 所有方法只负责发出请求并立即返回，结果通过 [`SessionCallbacks`] 异步回调。
/// - 回调可能发生在任意线程上，实现者不得在持有调用方锁的情况下同步回调。
pub trait ReplayEngine: Send + Sync {
    /// # Summary
    /// 打开会话并登录行情与历史两个子连接。
    ///
    /// # Arguments
    /// * `credentials`: 登录凭据。
    /// * `callbacks`: 会话回调，登录结果与回放数据均经由它送达。
    fn login(
        &self,
        credentials: &Credentials,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<(), EngineError>;

    /// # Summary
    /// 发起一次 K 线回放。
    ///
    /// # Logic
    /// 1. 逐根推送 `[start, end]` 内的 K 线。
    /// 2. 推送完毕后发出一次完成通知。
    fn replay_bars(&self, request: ReplayRequest) -> Result<(), EngineError>;

    fn logout(&self) -> Result<(), EngineError>;

    fn shutdown(&self) -> Result<(), EngineError>;
}

/// # Summary
/// 会话回调契约：登录告警、单根 K 线、回放完成。
pub trait SessionCallbacks: Send + Sync {
    fn alert(&self, info: AlertInfo);

    fn bar(&self, info: BarInfo);

    fn bar_replay(&self, info: BarReplayInfo);
}

/// 引擎级（非会话）告警回调
pub trait AdminCallbacks: Send + Sync {
    fn alert(&self, info: AlertInfo);
}

/// # Summary
/// 回调适配器向编排器上报的事件。
///
/// # Invariants
/// - `login_succeeded` 每次会话至多触发一次。
/// - 每个已派发的任务恰好对应一次 `save_bar_set` 或 `empty_job`，除非中途出现故障。
pub trait EventSink: Send + Sync {
    fn login_succeeded(&self);

    fn login_failed(&self, reason: String);

    fn save_bar_set(&self, bar_set: BarSet);

    fn empty_job(&self, job: Job);

    fn bar_set_faulted(&self, error: BarSetError);
}
