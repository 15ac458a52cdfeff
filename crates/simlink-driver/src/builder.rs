//! Builder 模式实现
//!
//! 提供链式构造 `SimLink` 实例的便捷方式。

use crate::command::{ConstantThrust, MotorSource};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::hooks::TelemetryCallback;
use crate::link::{LoopParts, SimLink};
use crate::policy::{BestEffort, ErrorPolicy};
use crate::transport::{MotorSink, TelemetrySource, open_udp};
use std::sync::Arc;
use std::time::Duration;

/// SimLink Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use simlink_driver::{ConstantThrust, FailureBudget, SimLinkBuilder};
/// use std::time::Duration;
///
/// let mut link = SimLinkBuilder::new()
///     .host("127.0.0.1")
///     .motor_port(5000)
///     .telemetry_port(5001)
///     .motor_count(4)
///     .receive_timeout(Duration::from_millis(500))
///     .motor_source(ConstantThrust(0.55))
///     .error_policy(FailureBudget::new(100))
///     .build()
///     .unwrap();
/// link.start().unwrap();
/// ```
pub struct SimLinkBuilder {
    config: LinkConfig,
    motor_source: Option<Box<dyn MotorSource>>,
    policy: Option<Box<dyn ErrorPolicy>>,
    hooks: Vec<Arc<dyn TelemetryCallback>>,
    transport: Option<(Box<dyn MotorSink + Send>, Box<dyn TelemetrySource + Send>)>,
}

impl SimLinkBuilder {
    pub fn new() -> Self {
        Self {
            config: LinkConfig::default(),
            motor_source: None,
            policy: None,
            hooks: Vec::new(),
            transport: None,
        }
    }

    /// 以完整配置为基础（后续链式调用会覆盖对应字段）
    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn motor_port(mut self, port: u16) -> Self {
        self.config.motor_port = port;
        self
    }

    /// 本地遥测端口（0 表示由系统分配）
    pub fn telemetry_port(mut self, port: u16) -> Self {
        self.config.telemetry_port = port;
        self
    }

    pub fn motor_count(mut self, count: usize) -> Self {
        self.config.motor_count = count;
        self
    }

    pub fn telemetry_count(mut self, count: usize) -> Self {
        self.config.telemetry_count = count;
        self
    }

    /// 接收超时（按毫秒存储，不足 1 ms 的非零值取 1 ms）
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.config.receive_timeout_ms = if ms == 0 && !timeout.is_zero() { 1 } else { ms };
        self
    }

    /// 电机指令来源（默认 `ConstantThrust(0.6)`）
    pub fn motor_source(mut self, source: impl MotorSource + 'static) -> Self {
        self.motor_source = Some(Box::new(source));
        self
    }

    /// 错误处理策略（默认 `BestEffort`）
    pub fn error_policy(mut self, policy: impl ErrorPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn hook(mut self, callback: Arc<dyn TelemetryCallback>) -> Self {
        self.hooks.push(callback);
        self
    }

    /// 使用自定义传输层替代 UDP（主要用于测试）
    pub fn transport<S, R>(mut self, sink: S, source: R) -> Self
    where
        S: MotorSink + Send + 'static,
        R: TelemetrySource + Send + 'static,
    {
        self.transport = Some((Box::new(sink), Box::new(source)));
        self
    }

    /// 构建 SimLink 实例（状态为 `Idle`）
    ///
    /// # Errors
    /// - `LinkError::InvalidConfig` / `LinkError::InvalidAddress`: 配置非法
    /// - `LinkError::Io`: UDP socket 创建失败
    pub fn build(self) -> Result<SimLink, LinkError> {
        self.config.validate()?;

        let (sink, source) = match self.transport {
            Some(transport) => transport,
            None => {
                let (sink, source) = open_udp(&self.config)?;
                (
                    Box::new(sink) as Box<dyn MotorSink + Send>,
                    Box::new(source) as Box<dyn TelemetrySource + Send>,
                )
            },
        };

        let link = SimLink::from_parts(
            self.config,
            LoopParts {
                sink,
                source,
                motor_source: self
                    .motor_source
                    .unwrap_or_else(|| Box::new(ConstantThrust::default())),
                policy: self.policy.unwrap_or_else(|| Box::new(BestEffort)),
            },
        );
        for hook in self.hooks {
            link.add_hook(hook);
        }
        Ok(link)
    }
}

impl Default for SimLinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
