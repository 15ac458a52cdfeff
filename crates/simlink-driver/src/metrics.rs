//! 链路性能指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use simlink_driver::LinkMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = LinkMetrics::new();
/// metrics.tx_datagrams.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.tx_datagrams, 1);
/// ```
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// 循环迭代次数
    pub iterations: AtomicU64,

    /// 成功发送的电机指令数据报
    pub tx_datagrams: AtomicU64,

    /// 发送失败次数
    pub tx_errors: AtomicU64,

    /// 成功接收的遥测数据报
    pub rx_datagrams: AtomicU64,

    /// 接收超时次数（仿真器未回包时属于正常现象）
    pub rx_timeouts: AtomicU64,

    /// 接收错误次数（不含超时）
    pub rx_errors: AtomicU64,

    /// 长度短于配置遥测帧的数据报
    pub rx_short_frames: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别读取，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            tx_datagrams: self.tx_datagrams.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            rx_datagrams: self.rx_datagrams.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            rx_short_frames: self.rx_short_frames.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.iterations.store(0, Ordering::Relaxed);
        self.tx_datagrams.store(0, Ordering::Relaxed);
        self.tx_errors.store(0, Ordering::Relaxed);
        self.rx_datagrams.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.rx_errors.store(0, Ordering::Relaxed);
        self.rx_short_frames.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub iterations: u64,
    pub tx_datagrams: u64,
    pub tx_errors: u64,
    pub rx_datagrams: u64,
    pub rx_timeouts: u64,
    pub rx_errors: u64,
    pub rx_short_frames: u64,
}

impl MetricsSnapshot {
    /// 发送尝试次数（成功 + 失败）
    pub fn tx_attempts(&self) -> u64 {
        self.tx_datagrams + self.tx_errors
    }

    /// 接收尝试次数（成功 + 超时 + 错误）
    pub fn rx_attempts(&self) -> u64 {
        self.rx_datagrams + self.rx_timeouts + self.rx_errors
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "iterations={} tx={} tx_err={} rx={} rx_timeout={} rx_err={} rx_short={}",
            self.iterations,
            self.tx_datagrams,
            self.tx_errors,
            self.rx_datagrams,
            self.rx_timeouts,
            self.rx_errors,
            self.rx_short_frames
        )
    }
}
