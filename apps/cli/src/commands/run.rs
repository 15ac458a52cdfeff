//! 运行交换循环
//!
//! 配置来源优先级：命令行参数 > 配置文件 > 默认值。

use anyhow::{Context, Result, bail};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use simlink_driver::{
    ChannelTelemetryHook, ConstantThrust, DEFAULT_THRUST, FailureBudget, LinkConfig, LoopExit,
    SimLinkBuilder,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 遥测打印通道容量
const TELEMETRY_CHANNEL_CAPACITY: usize = 256;

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// TOML 配置文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 仿真器主机地址（覆盖配置）
    #[arg(long)]
    pub host: Option<String>,

    /// 仿真器电机指令端口
    #[arg(long)]
    pub motor_port: Option<u16>,

    /// 本地遥测端口（0 = 系统分配）
    #[arg(long)]
    pub telemetry_port: Option<u16>,

    /// 电机数量
    #[arg(long)]
    pub motors: Option<usize>,

    /// 每个遥测帧的值数量
    #[arg(long)]
    pub telemetry_count: Option<usize>,

    /// 接收超时（毫秒）
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// 所有电机的常量推力
    #[arg(long, default_value_t = DEFAULT_THRUST)]
    pub thrust: f64,

    /// 运行时长（秒）
    #[arg(long, default_value_t = 10)]
    pub duration_secs: u64,

    /// 同一阶段连续失败超过此次数后中止（默认永不中止）
    #[arg(long)]
    pub max_failures: Option<u32>,
}

impl RunCommand {
    /// 合并配置文件与命令行参数
    pub fn resolve_config(&self) -> Result<LinkConfig> {
        // 文件只解析不校验，命令行覆盖后统一校验
        let mut config = match &self.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?;
                toml::from_str::<LinkConfig>(&content)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            },
            None => LinkConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.motor_port {
            config.motor_port = port;
        }
        if let Some(port) = self.telemetry_port {
            config.telemetry_port = port;
        }
        if let Some(count) = self.motors {
            config.motor_count = count;
        }
        if let Some(count) = self.telemetry_count {
            config.telemetry_count = count;
        }
        if let Some(ms) = self.timeout_ms {
            config.receive_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn execute(&self) -> Result<()> {
        let config = self.resolve_config()?;
        let join_timeout = config.receive_timeout() + Duration::from_secs(1);

        let (hook, telemetry_rx) = ChannelTelemetryHook::new(TELEMETRY_CHANNEL_CAPACITY);
        let dropped = hook.dropped_counter();

        let mut builder = SimLinkBuilder::new()
            .config(config)
            .motor_source(ConstantThrust(self.thrust))
            .hook(Arc::new(hook));
        if let Some(max) = self.max_failures {
            builder = builder.error_policy(FailureBudget::new(max));
        }
        let mut link = builder.build().context("Failed to open simulator link")?;

        let halt = link.halt_handle();
        ctrlc::set_handler(move || {
            halt.halt();
        })
        .context("Failed to install Ctrl-C handler")?;

        link.start()?;

        let deadline = Instant::now() + Duration::from_secs(self.duration_secs);
        while link.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(Duration::from_millis(100));
            match telemetry_rx.recv_timeout(wait) {
                Ok(frame) => {
                    if let Some(value) = frame.first() {
                        println!("{:.6}", value);
                    }
                },
                Err(RecvTimeoutError::Timeout) => {},
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        link.halt();
        let exit = link.join_timeout(join_timeout)?;

        let metrics = link.metrics();
        println!("{}", metrics);
        let dropped = dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!("{} telemetry frames were not printed (channel full)", dropped);
        }

        match exit {
            LoopExit::Halted => {
                info!("Link halted");
                Ok(())
            },
            LoopExit::Aborted(stage) => {
                bail!("Exchange loop aborted after repeated {} failures", stage)
            },
        }
    }
}
