//! Pipeline IO 循环模块
//!
//! 每次迭代：填充电机向量 -> 编码并发送一个数据报 -> 带超时接收一个遥测数据报 -> 让出时间片。
//!
//! 发送和接收互相独立，没有序列号，也不保证收到的遥测对应刚发出的指令。

use crate::command::MotorSource;
use crate::config::LinkConfig;
use crate::policy::{ErrorPolicy, FailureStage, LinkFailure, PolicyDecision};
use crate::state::LinkContext;
use crate::transport::{MotorSink, TelemetrySource};
use bytes::BytesMut;
use simlink_protocol::{MotorCommand, TelemetryFrame};
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// 循环退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// 收到停止请求
    Halted,
    /// 错误策略要求中止
    Aborted(FailureStage),
}

/// IO 线程循环
///
/// 调用前状态必须已经是 `Running`；状态在每次迭代开头检查一次。
/// 函数返回时不修改状态，由调用方在释放 socket 后置为 `Terminated`。
///
/// # 参数
/// - `sink` / `source`: 电机指令发送端 / 遥测接收端
/// - `motor_source`: 每次迭代的电机指令来源
/// - `policy`: 发送/接收失败时的处理策略
/// - `ctx`: 共享状态上下文
/// - `config`: 链路配置（决定数据报长度）
pub fn exchange_loop(
    sink: &mut dyn MotorSink,
    source: &mut dyn TelemetrySource,
    motor_source: &mut dyn MotorSource,
    policy: &mut dyn ErrorPolicy,
    ctx: &LinkContext,
    config: &LinkConfig,
) -> LoopExit {
    let metrics = &ctx.metrics;

    let mut motors = MotorCommand::new(config.motor_count);
    let mut tx_buf = BytesMut::with_capacity(config.motor_frame_len());
    let mut rx_buf = vec![0u8; config.telemetry_frame_len()];

    // 各阶段连续失败次数（超时不计入）
    let mut tx_failures: u32 = 0;
    let mut rx_failures: u32 = 0;

    while ctx.state.get().is_running() {
        metrics.iterations.fetch_add(1, Ordering::Relaxed);

        // ============================================================
        // 1. 填充并发送电机指令
        // ============================================================
        motor_source.fill(&mut motors);
        tx_buf.clear();
        motors.encode_into(&mut tx_buf);

        match sink.send(&tx_buf) {
            Ok(()) => {
                tx_failures = 0;
                metrics.tx_datagrams.fetch_add(1, Ordering::Relaxed);
                if let Ok(hooks) = ctx.hooks.read() {
                    hooks.trigger_motors_sent(motors.values());
                }
            },
            Err(e) => {
                tx_failures = tx_failures.saturating_add(1);
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                let failure = LinkFailure {
                    stage: FailureStage::Send,
                    error: &e,
                    consecutive: tx_failures,
                };
                if policy.on_failure(&failure) == PolicyDecision::Abort {
                    warn!("Exchange loop aborted on send error: {}", e);
                    return LoopExit::Aborted(FailureStage::Send);
                }
            },
        }

        // ============================================================
        // 2. 接收遥测（带超时）
        // ============================================================
        match source.receive(&mut rx_buf) {
            Ok(len) => {
                rx_failures = 0;
                metrics.rx_datagrams.fetch_add(1, Ordering::Relaxed);
                if len < rx_buf.len() {
                    metrics.rx_short_frames.fetch_add(1, Ordering::Relaxed);
                }

                let frame = TelemetryFrame::decode(&rx_buf[..len]);
                if let Some(value) = frame.first() {
                    debug!("telemetry: {:.6}", value);
                    if let Ok(hooks) = ctx.hooks.read() {
                        hooks.trigger_telemetry(&frame);
                    }
                    ctx.publish(frame);
                }
            },
            Err(e) => {
                if e.is_timeout() {
                    metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                } else {
                    rx_failures = rx_failures.saturating_add(1);
                    metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                }
                let failure = LinkFailure {
                    stage: FailureStage::Receive,
                    error: &e,
                    consecutive: rx_failures,
                };
                if policy.on_failure(&failure) == PolicyDecision::Abort {
                    warn!("Exchange loop aborted on receive error: {}", e);
                    return LoopExit::Aborted(FailureStage::Receive);
                }
            },
        }

        std::thread::yield_now();
    }

    LoopExit::Halted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ConstantThrust;
    use crate::error::LinkError;
    use crate::policy::{BestEffort, FailureBudget};
    use crate::state::LinkState;
    use simlink_protocol::{decode, encode};
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// 记录所有发送内容；可配置为一直失败
    #[derive(Default)]
    struct MockSink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl MotorSink for MockSink {
        fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
            if self.fail {
                return Err(LinkError::Io(io::Error::from(io::ErrorKind::ConnectionRefused)));
            }
            self.sent.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    /// 按脚本返回接收结果；脚本耗尽后把状态置为 Stopping
    struct ScriptedSource {
        script: VecDeque<Result<Vec<u8>, LinkError>>,
        ctx: Arc<LinkContext>,
    }

    impl TelemetrySource for ScriptedSource {
        fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
            let next = self.script.pop_front();
            if self.script.is_empty() {
                self.ctx.request_halt();
            }
            match next {
                Some(Ok(bytes)) => {
                    let len = bytes.len().min(buf.len());
                    buf[..len].copy_from_slice(&bytes[..len]);
                    Ok(len)
                },
                Some(Err(e)) => Err(e),
                None => Err(LinkError::Timeout),
            }
        }
    }

    fn running_ctx() -> Arc<LinkContext> {
        let ctx = Arc::new(LinkContext::new());
        ctx.state.set(LinkState::Running);
        ctx
    }

    fn io_err() -> LinkError {
        LinkError::Io(io::Error::from(io::ErrorKind::Other))
    }

    #[test]
    fn test_one_send_and_receive_per_iteration() {
        let ctx = running_ctx();
        let sink_log = Arc::new(Mutex::new(Vec::new()));
        let mut sink = MockSink {
            sent: sink_log.clone(),
            fail: false,
        };
        let mut source = ScriptedSource {
            script: VecDeque::from(vec![
                Ok(encode(&[1.5])),
                Err(LinkError::Timeout),
                Ok(encode(&[3.14])),
            ]),
            ctx: ctx.clone(),
        };

        let exit = exchange_loop(
            &mut sink,
            &mut source,
            &mut ConstantThrust::default(),
            &mut BestEffort,
            &ctx,
            &LinkConfig::default(),
        );
        assert_eq!(exit, LoopExit::Halted);

        let sent = sink_log.lock().unwrap();
        assert_eq!(sent.len(), 3);
        for datagram in sent.iter() {
            assert_eq!(datagram.len(), 32);
            assert_eq!(decode(datagram), vec![0.6; 4]);
        }

        let m = ctx.metrics.snapshot();
        assert_eq!(m.iterations, 3);
        assert_eq!(m.tx_datagrams, 3);
        assert_eq!(m.rx_datagrams, 2);
        assert_eq!(m.rx_timeouts, 1);
        assert_eq!(ctx.latest_telemetry().unwrap().first(), Some(3.14));
    }

    #[test]
    fn test_send_failure_does_not_skip_receive() {
        let ctx = running_ctx();
        let mut sink = MockSink {
            fail: true,
            ..Default::default()
        };
        let mut source = ScriptedSource {
            script: VecDeque::from(vec![Ok(encode(&[2.0])), Ok(encode(&[4.0]))]),
            ctx: ctx.clone(),
        };

        let exit = exchange_loop(
            &mut sink,
            &mut source,
            &mut ConstantThrust::default(),
            &mut BestEffort,
            &ctx,
            &LinkConfig::default(),
        );
        assert_eq!(exit, LoopExit::Halted);

        let m = ctx.metrics.snapshot();
        assert_eq!(m.tx_errors, 2);
        assert_eq!(m.tx_datagrams, 0);
        assert_eq!(m.rx_datagrams, 2);
        assert_eq!(ctx.latest_telemetry().unwrap().first(), Some(4.0));
    }

    #[test]
    fn test_receive_errors_keep_loop_alive() {
        let ctx = running_ctx();
        let mut sink = MockSink::default();
        let mut source = ScriptedSource {
            script: VecDeque::from(vec![Err(io_err()), Err(io_err()), Ok(encode(&[1.0]))]),
            ctx: ctx.clone(),
        };

        let exit = exchange_loop(
            &mut sink,
            &mut source,
            &mut ConstantThrust::default(),
            &mut BestEffort,
            &ctx,
            &LinkConfig::default(),
        );
        assert_eq!(exit, LoopExit::Halted);
        assert_eq!(ctx.metrics.snapshot().rx_errors, 2);
        assert_eq!(ctx.metrics.snapshot().rx_datagrams, 1);
    }

    #[test]
    fn test_failure_budget_aborts() {
        let ctx = running_ctx();
        let mut sink = MockSink::default();
        let mut source = ScriptedSource {
            script: VecDeque::from(vec![
                Err(io_err()),
                Err(io_err()),
                Err(io_err()),
                Ok(encode(&[1.0])),
            ]),
            ctx: ctx.clone(),
        };

        let exit = exchange_loop(
            &mut sink,
            &mut source,
            &mut ConstantThrust::default(),
            &mut FailureBudget::new(2),
            &ctx,
            &LinkConfig::default(),
        );
        assert_eq!(exit, LoopExit::Aborted(FailureStage::Receive));
        assert_eq!(ctx.metrics.snapshot().iterations, 3);
        assert!(ctx.latest_telemetry().is_none());
    }

    #[test]
    fn test_short_and_truncated_datagrams() {
        let ctx = running_ctx();
        let config = LinkConfig {
            telemetry_count: 2,
            ..LinkConfig::default()
        };
        let mut long = encode(&[7.0, 8.0]);
        long.extend_from_slice(&encode(&[9.0]));
        let mut sink = MockSink::default();
        let mut source = ScriptedSource {
            script: VecDeque::from(vec![
                // 只有 12 字节：解码出 1 个值
                Ok(encode(&[5.0, 6.0])[..12].to_vec()),
                // 超过帧长：多余部分被丢弃
                Ok(long),
            ]),
            ctx: ctx.clone(),
        };

        exchange_loop(
            &mut sink,
            &mut source,
            &mut ConstantThrust::default(),
            &mut BestEffort,
            &ctx,
            &config,
        );

        assert_eq!(ctx.metrics.snapshot().rx_short_frames, 1);
        assert_eq!(ctx.latest_telemetry().unwrap().values(), &[7.0, 8.0]);
    }

    #[test]
    fn test_not_running_does_nothing() {
        let ctx = Arc::new(LinkContext::new());
        let sink_log = Arc::new(Mutex::new(Vec::new()));
        let mut sink = MockSink {
            sent: sink_log.clone(),
            fail: false,
        };
        let mut source = ScriptedSource {
            script: VecDeque::new(),
            ctx: ctx.clone(),
        };

        let exit = exchange_loop(
            &mut sink,
            &mut source,
            &mut ConstantThrust::default(),
            &mut BestEffort,
            &ctx,
            &LinkConfig::default(),
        );
        assert_eq!(exit, LoopExit::Halted);
        assert!(sink_log.lock().unwrap().is_empty());
    }
}
