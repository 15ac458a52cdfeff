//! 钩子系统
//!
//! 在收到遥测帧 / 发出电机指令时触发自定义回调。
//! 回调运行在 IO 线程上，必须是非阻塞的；需要重处理时请用
//! [`ChannelTelemetryHook`] 转交给其他线程。
//!
//! # 使用示例
//!
//! ```rust
//! use simlink_driver::hooks::{ChannelTelemetryHook, HookManager, TelemetryCallback};
//! use simlink_protocol::TelemetryFrame;
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (hook, rx) = ChannelTelemetryHook::new(16);
//! hooks.add_callback(Arc::new(hook) as Arc<dyn TelemetryCallback>);
//!
//! hooks.trigger_telemetry(&TelemetryFrame::from_values(vec![3.14]));
//! assert_eq!(rx.try_recv().unwrap().first(), Some(3.14));
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use simlink_protocol::TelemetryFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 遥测回调 Trait
pub trait TelemetryCallback: Send + Sync {
    /// 当成功接收并解码遥测帧时调用
    fn on_telemetry(&self, frame: &TelemetryFrame);

    /// 当电机指令发送成功后调用（可选）
    ///
    /// 仅在 `send` 成功后触发，发送失败的指令不会出现在这里。
    fn on_motors_sent(&self, motors: &[f64]) {
        let _ = motors;
    }
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，由 `LinkContext` 通过 `RwLock` 保护。
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn TelemetryCallback>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback(&mut self, callback: Arc<dyn TelemetryCallback>) {
        self.callbacks.push(callback);
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn trigger_telemetry(&self, frame: &TelemetryFrame) {
        for callback in &self.callbacks {
            callback.on_telemetry(frame);
        }
    }

    pub fn trigger_motors_sent(&self, motors: &[f64]) {
        for callback in &self.callbacks {
            callback.on_motors_sent(motors);
        }
    }
}

impl std::fmt::Debug for HookManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager").field("callbacks", &self.callbacks.len()).finish()
    }
}

/// 基于 Channel 的遥测转发钩子
///
/// 使用 `try_send`，通道满时丢弃新帧并计数，不会阻塞 IO 线程。
pub struct ChannelTelemetryHook {
    sender: Sender<TelemetryFrame>,
    dropped: Arc<AtomicU64>,
}

impl ChannelTelemetryHook {
    /// 创建钩子和对应的接收端
    pub fn new(capacity: usize) -> (Self, Receiver<TelemetryFrame>) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    /// 丢帧计数器（可在钩子注册后继续读取）
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TelemetryCallback for ChannelTelemetryHook {
    fn on_telemetry(&self, frame: &TelemetryFrame) {
        match self.sender.try_send(frame.clone()) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        telemetry: Mutex<Vec<f64>>,
        sent: Mutex<Vec<Vec<f64>>>,
    }

    impl TelemetryCallback for RecordingCallback {
        fn on_telemetry(&self, frame: &TelemetryFrame) {
            self.telemetry.lock().unwrap().extend_from_slice(frame.values());
        }

        fn on_motors_sent(&self, motors: &[f64]) {
            self.sent.lock().unwrap().push(motors.to_vec());
        }
    }

    #[test]
    fn test_trigger_all_callbacks() {
        let mut hooks = HookManager::new();
        let first = Arc::new(RecordingCallback::default());
        let second = Arc::new(RecordingCallback::default());
        hooks.add_callback(first.clone());
        hooks.add_callback(second.clone());
        assert_eq!(hooks.len(), 2);

        hooks.trigger_telemetry(&TelemetryFrame::from_values(vec![1.0]));
        hooks.trigger_motors_sent(&[0.6, 0.6]);

        for cb in [&first, &second] {
            assert_eq!(*cb.telemetry.lock().unwrap(), vec![1.0]);
            assert_eq!(*cb.sent.lock().unwrap(), vec![vec![0.6, 0.6]]);
        }

        hooks.clear();
        assert!(hooks.is_empty());
    }

    #[test]
    fn test_channel_hook_drops_when_full() {
        let (hook, rx) = ChannelTelemetryHook::new(1);
        let frame = TelemetryFrame::from_values(vec![2.0]);

        hook.on_telemetry(&frame);
        hook.on_telemetry(&frame);
        assert_eq!(hook.dropped(), 1);
        assert_eq!(rx.len(), 1);

        drop(rx);
        hook.on_telemetry(&frame);
        assert_eq!(hook.dropped(), 2);
    }

    #[test]
    fn test_motors_sent_default_is_noop() {
        let (hook, rx) = ChannelTelemetryHook::new(4);
        hook.on_motors_sent(&[1.0]);
        assert!(rx.is_empty());
    }
}
