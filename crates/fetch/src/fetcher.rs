use crate::error::FetchError;
use crate::session::SessionAdapter;
use barfetch_core::bar::BarSet;
use barfetch_core::bar::error::BarSetError;
use barfetch_core::calendar::TradingCalendar;
use barfetch_core::common::{BarKind, BarSize};
use barfetch_core::contract::ContractIndex;
use barfetch_core::instrument::entity::Instrument;
use barfetch_core::job::Job;
use barfetch_core::job::error::JobError;
use barfetch_core::session::entity::Credentials;
use barfetch_core::session::port::{EventSink, ReplayEngine, SessionCallbacks};
use barfetch_core::store::port::BarSetStore;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// 编排器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    LoggingIn,
    AwaitingNextJob,
    ReplayingBars,
    ShuttingDown,
    Terminated,
}

/// 一次运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub enqueued: usize,
    pub skipped: usize,
    pub saved: usize,
    pub empty: usize,
}

/// # Summary
/// 一次性关闭闸门：回调线程打开一次，主流程等待一次。
///
/// # Invariants
/// - 先打开后等待也能立即返回（Notify 会保存许可）。
/// - 重复打开无副作用。
#[derive(Debug, Default)]
pub struct ShutdownGate {
    notify: Notify,
    opened: AtomicBool,
}

impl ShutdownGate {
    pub fn open(&self) {
        if !self.opened.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// # Summary
/// 按 品种 × 交易日 × K 线尺寸 的顺序生成抓取任务。
///
/// # Logic
/// 1. 品种为最外层，其次交易日，最内层为尺寸。
/// 2. 任务 id 从 1 开始连续编号，用作回放关联上下文。
pub fn plan_jobs(
    assets: &[Arc<Instrument>],
    dates: &[NaiveDate],
    sizes: &[BarSize],
    kinds: &[BarKind],
) -> Result<Vec<Job>, JobError> {
    let mut jobs = Vec::with_capacity(assets.len() * dates.len() * sizes.len());
    let mut id = 0;
    for instrument in assets {
        for date in dates {
            for size in sizes {
                id += 1;
                jobs.push(Job::new(id, instrument.clone(), *date, *size, kinds)?);
            }
        }
    }
    Ok(jobs)
}

#[derive(Debug)]
struct Machine {
    state: FetchState,
    jobs: VecDeque<Job>,
    // 在途任务 id
    in_flight: Option<u64>,
    // 首个致命故障
    fault: Option<FetchError>,
    summary: FetchSummary,
}

enum Next {
    Dispatch(Job),
    Finished,
    Halted,
}

/// # Summary
/// 抓取编排器：单会话、串行地执行任务队列。
///
/// # Invariants
/// - 整次运行只使用一个远程会话，任一时刻至多一个任务在途。
/// - 下一个任务只在上一个任务完成（保存或判空）后派发。
/// - 调用引擎或存储时不持有状态锁，回调可以在任意线程重入。
/// - 任何故障都会终止整次运行，不重试。
pub struct Fetcher {
    engine: Arc<dyn ReplayEngine>,
    store: Arc<dyn BarSetStore>,
    contracts: Arc<ContractIndex>,
    calendar: Arc<TradingCalendar>,
    credentials: Credentials,
    adapter: Arc<SessionAdapter>,
    machine: Mutex<Machine>,
    gate: ShutdownGate,
}

/// 编排器依赖的外部协作者
pub struct FetchDeps {
    pub engine: Arc<dyn ReplayEngine>,
    pub store: Arc<dyn BarSetStore>,
    pub contracts: Arc<ContractIndex>,
    pub calendar: Arc<TradingCalendar>,
}

impl Fetcher {
    /// # Summary
    /// 构建编排器并把任务入队。
    ///
    /// # Logic
    /// 1. 按给定顺序遍历任务，全部输出文件都已存在的任务直接跳过。
    /// 2. 其余任务按 FIFO 顺序入队。
    /// 3. 回调适配器以弱引用指回编排器。
    pub fn new(deps: FetchDeps, credentials: Credentials, jobs: Vec<Job>) -> Arc<Self> {
        let mut queue = VecDeque::with_capacity(jobs.len());
        let mut skipped = 0;
        for job in jobs {
            if deps.store.is_complete(&job) {
                debug!("Skipping {}: already saved", job);
                skipped += 1;
            } else {
                queue.push_back(job);
            }
        }

        if queue.is_empty() {
            warn!("{} jobs enqueued, {} skipped", queue.len(), skipped);
        } else {
            info!("{} jobs enqueued, {} skipped", queue.len(), skipped);
        }

        let summary = FetchSummary {
            enqueued: queue.len(),
            skipped,
            ..FetchSummary::default()
        };

        Arc::new_cyclic(|weak: &Weak<Fetcher>| {
            let sink: Weak<dyn EventSink> = weak.clone();
            Self {
                engine: deps.engine,
                store: deps.store,
                contracts: deps.contracts,
                calendar: deps.calendar,
                credentials,
                adapter: SessionAdapter::new(sink),
                machine: Mutex::new(Machine {
                    state: FetchState::Idle,
                    jobs: queue,
                    in_flight: None,
                    fault: None,
                    summary,
                }),
                gate: ShutdownGate::default(),
            }
        })
    }

    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> FetchState {
        self.machine().state
    }

    pub fn pending(&self) -> usize {
        self.machine().jobs.len()
    }

    pub fn summary(&self) -> FetchSummary {
        self.machine().summary
    }

    /// # Summary
    /// 执行整次抓取。
    ///
    /// # Logic
    /// 1. 队列为空时直接成功返回，不打开会话。
    /// 2. 否则登录并等待关闭闸门，之后登出并关闭引擎。
    ///
    /// # Returns
    /// 成功返回运行统计；记录过故障时返回首个故障。
    pub async fn run(&self) -> Result<FetchSummary, FetchError> {
        if !self.start() {
            return Ok(self.summary());
        }
        self.wait().await
    }

    /// # Summary
    /// 发起登录，后续流程全部由回调驱动。
    ///
    /// # Returns
    /// 队列为空时返回 false 且状态直接进入 Terminated。
    pub fn start(&self) -> bool {
        {
            let mut machine = self.machine();
            if machine.state != FetchState::Idle {
                return machine.state != FetchState::Terminated;
            }
            if machine.jobs.is_empty() {
                machine.state = FetchState::Terminated;
                return false;
            }
            machine.state = FetchState::LoggingIn;
        }

        debug!("Logging in as {}", self.credentials.user_name);
        let callbacks: Arc<dyn SessionCallbacks> = self.adapter.clone();
        if let Err(e) = self.engine.login(&self.credentials, callbacks) {
            self.abort(e.into());
        }
        true
    }

    /// # Summary
    /// 等待关闭闸门，然后有序关闭会话。
    pub async fn wait(&self) -> Result<FetchSummary, FetchError> {
        self.gate.wait().await;

        debug!("ShutdownInitiated");
        if let Err(e) = self.engine.logout() {
            warn!("Logout failed: {}", e);
        }
        if let Err(e) = self.engine.shutdown() {
            warn!("Engine shutdown failed: {}", e);
        }
        debug!("ShutdownCompleted");

        let mut machine = self.machine();
        machine.state = FetchState::Terminated;
        match machine.fault.take() {
            Some(fault) => Err(fault),
            None => {
                info!(
                    "Fetch completed: {} saved, {} empty, {} skipped",
                    machine.summary.saved, machine.summary.empty, machine.summary.skipped
                );
                Ok(machine.summary)
            }
        }
    }

    /// # Summary
    /// 派发队首任务；队列耗尽时打开关闭闸门。
    ///
    /// # Logic
    /// 1. 在锁内出队并切换状态，随即释放锁。
    /// 2. 推导回放参数，开启新的 K 线集合，再向引擎发起回放。
    /// 3. 任一步失败都按致命故障中止。
    fn dispatch_next(&self) {
        let next = {
            let mut machine = self.machine();
            match machine.state {
                FetchState::ShuttingDown | FetchState::Terminated => Next::Halted,
                _ => match machine.jobs.pop_front() {
                    Some(job) => {
                        machine.state = FetchState::ReplayingBars;
                        machine.in_flight = Some(job.id());
                        Next::Dispatch(job)
                    }
                    None => {
                        machine.state = FetchState::ShuttingDown;
                        machine.in_flight = None;
                        Next::Finished
                    }
                },
            }
        };

        let job = match next {
            Next::Dispatch(job) => job,
            Next::Finished => {
                debug!("Job queue drained");
                self.gate.open();
                return;
            }
            Next::Halted => return,
        };

        let request = match job.query_params(&self.contracts, &self.calendar) {
            Ok(request) => request,
            Err(e) => {
                self.abort(e.into());
                return;
            }
        };

        debug!(
            "Replaying {} as {} ({} to {})",
            job, request.symbol, request.start, request.end
        );
        self.adapter.begin(job);
        if let Err(e) = self.engine.replay_bars(request) {
            self.abort(e.into());
        }
    }

    /// 回到等待状态并派发下一个任务
    fn complete_in_flight(&self, job_id: u64) -> bool {
        let mut machine = self.machine();
        if machine.state != FetchState::ReplayingBars || machine.in_flight != Some(job_id) {
            return false;
        }
        machine.in_flight = None;
        machine.state = FetchState::AwaitingNextJob;
        true
    }

    /// # Summary
    /// 记录故障并触发关闭；关闭途中的后续故障只记日志。
    fn abort(&self, fault: FetchError) {
        {
            let mut machine = self.machine();
            if matches!(
                machine.state,
                FetchState::ShuttingDown | FetchState::Terminated
            ) {
                debug!("Ignoring fault while shutting down: {}", fault);
                return;
            }
            error!("{}", fault);
            if !machine.jobs.is_empty() {
                warn!("{} jobs abandoned", machine.jobs.len());
                machine.jobs.clear();
            }
            machine.fault = Some(fault);
            machine.in_flight = None;
            machine.state = FetchState::ShuttingDown;
        }
        self.adapter.clear();
        self.gate.open();
    }
}

impl EventSink for Fetcher {
    fn login_succeeded(&self) {
        {
            let mut machine = self.machine();
            if machine.state != FetchState::LoggingIn {
                debug!("Ignoring login success in state {:?}", machine.state);
                return;
            }
            machine.state = FetchState::AwaitingNextJob;
        }
        info!("Logged in");
        self.dispatch_next();
    }

    fn login_failed(&self, reason: String) {
        self.abort(FetchError::LoginFailed(reason));
    }

    fn save_bar_set(&self, bar_set: BarSet) {
        if !self.complete_in_flight(bar_set.job().id()) {
            warn!("Ignoring bar set for {}: not in flight", bar_set.job());
            return;
        }

        match self.store.save(&bar_set) {
            Ok(_) => self.machine().summary.saved += 1,
            Err(e) => {
                self.abort(e.into());
                return;
            }
        }
        self.dispatch_next();
    }

    fn empty_job(&self, job: Job) {
        if !self.complete_in_flight(job.id()) {
            warn!("Ignoring empty result for {}: not in flight", job);
            return;
        }

        warn!("BadJobIgnored: {} (no bars)", job);
        self.machine().summary.empty += 1;
        self.dispatch_next();
    }

    fn bar_set_faulted(&self, error: BarSetError) {
        self.abort(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gate_opened_before_wait_does_not_block() {
        let gate = ShutdownGate::default();
        gate.open();
        gate.open();
        assert!(gate.is_open());
        gate.wait().await;
    }

    #[tokio::test]
    async fn test_gate_wakes_waiter() {
        let gate = Arc::new(ShutdownGate::default());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait().await })
        };
        tokio::task::yield_now().await;
        gate.open();
        waiter.await.unwrap();
    }
}
