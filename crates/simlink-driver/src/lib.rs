//! 驱动层模块
//!
//! 与多旋翼仿真器之间的 UDP 电机指令 / 遥测交换，包括：
//! - IO 线程管理（单个工作线程，一发一收）
//! - 链路状态机（原子状态，跨线程停止）
//! - 错误处理策略（记录并继续 / 中止）
//! - 钩子系统与性能指标
//!
//! # 使用场景
//!
//! ```no_run
//! use simlink_driver::SimLinkBuilder;
//! use std::time::Duration;
//!
//! let mut link = SimLinkBuilder::new().build()?;
//! link.start()?;
//! std::thread::sleep(Duration::from_secs(1));
//! if let Some(frame) = link.latest_telemetry() {
//!     println!("{:?}", frame.first());
//! }
//! link.shutdown(Duration::from_secs(2))?;
//! # Ok::<(), simlink_driver::LinkError>(())
//! ```

mod builder;
pub mod command;
pub mod config;
mod error;
pub mod hooks;
mod link;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod state;
pub mod transport;

pub use builder::SimLinkBuilder;
pub use command::{ConstantThrust, DEFAULT_THRUST, MotorSource};
pub use config::LinkConfig;
pub use error::LinkError;
pub use hooks::{ChannelTelemetryHook, HookManager, TelemetryCallback};
pub use link::{HaltHandle, SimLink};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use pipeline::{LoopExit, exchange_loop};
pub use policy::{BestEffort, ErrorPolicy, FailureBudget, FailureStage, LinkFailure, PolicyDecision};
pub use state::{AtomicLinkState, LinkContext, LinkState};
pub use transport::{MotorSink, TelemetrySource, UdpMotorSink, UdpTelemetrySource, open_udp};

// 协议层类型
pub use simlink_protocol::{MotorCommand, TelemetryFrame};
