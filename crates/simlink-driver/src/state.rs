//! 链路状态与共享上下文
//!
//! 状态机：`Idle -> start() -> Running -> halt() -> Stopping -> Terminated`
//!
//! IO 线程每次迭代开头读取一次状态；其他线程只通过原子操作修改它。

use crate::hooks::HookManager;
use crate::metrics::LinkMetrics;
use arc_swap::ArcSwapOption;
use simlink_protocol::TelemetryFrame;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LinkState {
    /// 已构造，socket 已打开，尚未发送任何数据
    #[default]
    Idle = 0,
    /// IO 线程运行中
    Running = 1,
    /// 已请求停止，等待当前迭代结束
    Stopping = 2,
    /// 已退出，socket 已释放（终态）
    Terminated = 3,
}

impl LinkState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Terminated。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Terminated,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }
}

/// 链路状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicLinkState {
    inner: AtomicU8,
}

impl AtomicLinkState {
    pub fn new(state: LinkState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> LinkState {
        LinkState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: LinkState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换
    ///
    /// 成功返回 `Ok(previous)`，失败返回 `Err(actual)`。
    pub fn transition(&self, from: LinkState, to: LinkState) -> Result<LinkState, LinkState> {
        self.inner
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(LinkState::from_u8)
            .map_err(LinkState::from_u8)
    }
}

/// 共享状态上下文
///
/// 由 `SimLink`、`HaltHandle` 和 IO 线程共同持有。
#[derive(Default)]
pub struct LinkContext {
    /// 链路状态
    pub state: AtomicLinkState,
    /// 最新遥测帧（无锁读取）
    pub latest: ArcSwapOption<TelemetryFrame>,
    /// 性能指标
    pub metrics: LinkMetrics,
    /// 运行时回调
    pub hooks: RwLock<HookManager>,
}

impl LinkContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布最新遥测帧
    pub fn publish(&self, frame: TelemetryFrame) {
        self.latest.store(Some(Arc::new(frame)));
    }

    /// 读取最新遥测帧（尚未收到时为 None）
    pub fn latest_telemetry(&self) -> Option<Arc<TelemetryFrame>> {
        self.latest.load_full()
    }

    /// 请求停止
    ///
    /// - Running -> Stopping：IO 线程在下一次迭代开头退出
    /// - Idle -> Terminated：从未启动，直接终止
    ///
    /// 返回调用后的状态。
    pub fn request_halt(&self) -> LinkState {
        match self.state.transition(LinkState::Running, LinkState::Stopping) {
            Ok(_) => LinkState::Stopping,
            Err(LinkState::Idle) => {
                match self.state.transition(LinkState::Idle, LinkState::Terminated) {
                    Ok(_) => LinkState::Terminated,
                    // 与 start() 竞争：对方已进入 Running，再请求一次
                    Err(_) => self.request_halt(),
                }
            },
            Err(other) => other,
        }
    }
}
