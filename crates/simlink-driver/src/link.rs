//! SimLink 对外 API
//!
//! 封装 socket、IO 线程和状态机细节。

use crate::command::{ConstantThrust, MotorSource};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::hooks::TelemetryCallback;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{LoopExit, exchange_loop};
use crate::policy::{BestEffort, ErrorPolicy};
use crate::state::{LinkContext, LinkState};
use crate::transport::{MotorSink, TelemetrySource, open_udp};
use simlink_protocol::TelemetryFrame;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Drop 时等待 IO 线程退出的上限
const DROP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// IO 线程启动前持有的组件
///
/// 启动时整体移交给 IO 线程；线程退出时随之释放（socket 关闭）。
pub(crate) struct LoopParts {
    pub(crate) sink: Box<dyn MotorSink + Send>,
    pub(crate) source: Box<dyn TelemetrySource + Send>,
    pub(crate) motor_source: Box<dyn MotorSource>,
    pub(crate) policy: Box<dyn ErrorPolicy>,
}

/// 仿真器链路
///
/// 构造后处于 `Idle`（socket 已打开，未发送任何数据）；
/// `start()` 启动 IO 线程，`halt()` 请求停止，线程退出后进入 `Terminated`，不可重启。
///
/// # Example
///
/// ```no_run
/// use simlink_driver::{LinkConfig, SimLink};
/// use std::time::Duration;
///
/// let mut link = SimLink::new(LinkConfig::new("127.0.0.1", 5000, 5001))?;
/// link.start()?;
/// std::thread::sleep(Duration::from_secs(10));
/// link.halt();
/// link.join()?;
/// # Ok::<(), simlink_driver::LinkError>(())
/// ```
pub struct SimLink {
    config: LinkConfig,
    ctx: Arc<LinkContext>,
    /// 未启动时的组件（启动后为 None）
    parts: Mutex<Option<LoopParts>>,
    /// IO 线程句柄
    io_thread: Option<JoinHandle<LoopExit>>,
    /// 遥测 socket 实际绑定地址
    telemetry_addr: Option<SocketAddr>,
}

impl SimLink {
    /// 打开 UDP socket 并创建链路（默认常量推力 + 尽力而为策略）
    ///
    /// # Errors
    /// - `LinkError::InvalidConfig` / `LinkError::InvalidAddress`: 配置非法
    /// - `LinkError::Io`: socket 创建或绑定失败
    pub fn new(config: LinkConfig) -> Result<Self, LinkError> {
        let (sink, source) = open_udp(&config)?;
        Self::with_transport(config, sink, source)
    }

    /// 使用自定义传输层创建链路
    pub fn with_transport<S, R>(config: LinkConfig, sink: S, source: R) -> Result<Self, LinkError>
    where
        S: MotorSink + Send + 'static,
        R: TelemetrySource + Send + 'static,
    {
        config.validate()?;
        Ok(Self::from_parts(
            config,
            LoopParts {
                sink: Box::new(sink),
                source: Box::new(source),
                motor_source: Box::new(ConstantThrust::default()),
                policy: Box::new(BestEffort),
            },
        ))
    }

    pub(crate) fn from_parts(config: LinkConfig, parts: LoopParts) -> Self {
        let telemetry_addr = parts.source.local_addr();
        Self {
            config,
            ctx: Arc::new(LinkContext::new()),
            parts: Mutex::new(Some(parts)),
            io_thread: None,
            telemetry_addr,
        }
    }

    /// 启动 IO 线程
    ///
    /// # Errors
    /// - `LinkError::AlreadyStarted`: 已在运行或正在停止
    /// - `LinkError::NotRestartable`: 已终止
    /// - `LinkError::IoThread`: 线程创建失败
    pub fn start(&mut self) -> Result<(), LinkError> {
        match self.ctx.state.transition(LinkState::Idle, LinkState::Running) {
            Ok(_) => {},
            Err(LinkState::Running | LinkState::Stopping) => return Err(LinkError::AlreadyStarted),
            Err(_) => {
                self.release_parts();
                return Err(LinkError::NotRestartable);
            },
        }

        let Some(parts) = self.take_parts() else {
            self.ctx.state.set(LinkState::Terminated);
            return Err(LinkError::NotRestartable);
        };

        let ctx = self.ctx.clone();
        let config = self.config.clone();
        let spawned = std::thread::Builder::new()
            .name("simlink-io".to_string())
            .spawn(move || run_io_thread(parts, ctx, config));

        match spawned {
            Ok(handle) => {
                info!(
                    "Exchange loop started: {} motors -> {}:{}, telemetry <- {:?}",
                    self.config.motor_count,
                    self.config.host,
                    self.config.motor_port,
                    self.telemetry_addr
                );
                self.io_thread = Some(handle);
                Ok(())
            },
            Err(e) => {
                self.ctx.state.set(LinkState::Terminated);
                Err(LinkError::IoThread(e.to_string()))
            },
        }
    }

    /// 请求停止
    ///
    /// 运行中：IO 线程在当前迭代结束后退出（最坏延迟 = 一次迭代 + 接收超时）。
    /// 未启动：直接终止并释放 socket。
    ///
    /// 返回调用后的状态。
    pub fn halt(&self) -> LinkState {
        let state = self.ctx.request_halt();
        if state.is_terminated() {
            self.release_parts();
        }
        state
    }

    /// 获取可跨线程使用的停止句柄
    pub fn halt_handle(&self) -> HaltHandle {
        HaltHandle {
            ctx: self.ctx.clone(),
        }
    }

    /// 等待 IO 线程退出
    ///
    /// # Errors
    /// - `LinkError::NotStarted`: 从未启动
    /// - `LinkError::IoThread`: IO 线程 panic
    pub fn join(&mut self) -> Result<LoopExit, LinkError> {
        match self.io_thread.take() {
            Some(handle) => self.finish(handle),
            None => self.no_thread_exit(),
        }
    }

    /// 带超时等待 IO 线程退出
    ///
    /// 超时返回 `LinkError::Timeout`，句柄保留，可以再次等待。
    /// 句柄必须留在 `self` 中，因此这里以 1 ms 间隔轮询 `is_finished()`，
    /// 而不是把句柄交给看门狗线程去 join。
    pub fn join_timeout(&mut self, timeout: Duration) -> Result<LoopExit, LinkError> {
        let Some(handle) = self.io_thread.take() else {
            return self.no_thread_exit();
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                self.io_thread = Some(handle);
                return Err(LinkError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.finish(handle)
    }

    /// 停止并等待退出
    pub fn shutdown(&mut self, timeout: Duration) -> Result<LoopExit, LinkError> {
        self.halt();
        self.join_timeout(timeout)
    }

    pub fn state(&self) -> LinkState {
        self.ctx.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 最新遥测帧（无锁读取）
    pub fn latest_telemetry(&self) -> Option<Arc<TelemetryFrame>> {
        self.ctx.latest_telemetry()
    }

    /// 遥测 socket 实际绑定地址（`telemetry_port = 0` 时用于获取系统分配的端口）
    pub fn telemetry_local_addr(&self) -> Option<SocketAddr> {
        self.telemetry_addr
    }

    /// 注册遥测回调（可在运行中注册）
    pub fn add_hook(&self, callback: Arc<dyn TelemetryCallback>) {
        match self.ctx.hooks.write() {
            Ok(mut hooks) => hooks.add_callback(callback),
            Err(poisoned) => poisoned.into_inner().add_callback(callback),
        }
    }

    fn take_parts(&self) -> Option<LoopParts> {
        match self.parts.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn release_parts(&self) {
        drop(self.take_parts());
    }

    fn finish(&mut self, handle: JoinHandle<LoopExit>) -> Result<LoopExit, LinkError> {
        let result = handle
            .join()
            .map_err(|_| LinkError::IoThread("IO thread panicked".to_string()));
        self.ctx.state.set(LinkState::Terminated);
        result
    }

    fn no_thread_exit(&self) -> Result<LoopExit, LinkError> {
        if self.state().is_terminated() {
            self.release_parts();
            Ok(LoopExit::Halted)
        } else {
            Err(LinkError::NotStarted)
        }
    }
}

impl std::fmt::Debug for SimLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimLink")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("telemetry_addr", &self.telemetry_addr)
            .finish()
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        self.halt();
        if self.io_thread.is_some()
            && let Err(e) = self.join_timeout(DROP_JOIN_TIMEOUT)
        {
            error!(
                "IO thread failed to shut down within {:?}: {}",
                DROP_JOIN_TIMEOUT, e
            );
        }
    }
}

/// IO 线程入口
///
/// 循环退出后先释放 socket，再置为 `Terminated`，
/// 观察到 `Terminated` 即可确认两个 socket 都已关闭。
fn run_io_thread(parts: LoopParts, ctx: Arc<LinkContext>, config: LinkConfig) -> LoopExit {
    let LoopParts {
        mut sink,
        mut source,
        mut motor_source,
        mut policy,
    } = parts;

    let exit = exchange_loop(
        sink.as_mut(),
        source.as_mut(),
        motor_source.as_mut(),
        policy.as_mut(),
        &ctx,
        &config,
    );

    drop(sink);
    drop(source);
    ctx.state.set(LinkState::Terminated);

    info!(
        "Exchange loop terminated ({:?}): {}",
        exit,
        ctx.metrics.snapshot()
    );
    exit
}

/// 停止句柄
///
/// 可克隆、可跨线程传递，用于在其他线程（如 Ctrl-C 处理器）中停止链路。
#[derive(Clone)]
pub struct HaltHandle {
    ctx: Arc<LinkContext>,
}

impl HaltHandle {
    /// 请求停止
    ///
    /// 与 `SimLink::halt` 不同，未启动时这里只修改状态，socket 在 `SimLink` 下次调用或 Drop 时释放。
    pub fn halt(&self) -> LinkState {
        self.ctx.request_halt()
    }

    pub fn state(&self) -> LinkState {
        self.ctx.state.get()
    }

    pub fn is_terminated(&self) -> bool {
        self.state().is_terminated()
    }
}

impl std::fmt::Debug for HaltHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaltHandle").field("state", &self.state()).finish()
    }
}
