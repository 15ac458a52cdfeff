//! 模拟仿真器
//!
//! 在电机端口监听，每收到一个电机指令数据报就向遥测端口回传一个固定值。
//! 用于在没有真实仿真器时联调 `run` 命令。

use anyhow::{Context, Result};
use clap::Args;
use simlink_protocol::{DEFAULT_MOTOR_PORT, DEFAULT_TELEMETRY_PORT, decode, encode};
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 模拟仿真器参数
#[derive(Args, Debug)]
pub struct MockSimCommand {
    /// 电机指令监听端口
    #[arg(long, default_value_t = DEFAULT_MOTOR_PORT)]
    pub listen_port: u16,

    /// 遥测回传主机
    #[arg(long, default_value = "127.0.0.1")]
    pub reply_host: String,

    /// 遥测回传端口
    #[arg(long, default_value_t = DEFAULT_TELEMETRY_PORT)]
    pub reply_port: u16,

    /// 回传的遥测值
    #[arg(long, default_value_t = 3.14)]
    pub value: f64,

    /// 运行时长（秒，0 = 直到 Ctrl-C）
    #[arg(long, default_value_t = 0)]
    pub duration_secs: u64,
}

impl MockSimCommand {
    pub fn execute(&self) -> Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.listen_port))
            .with_context(|| format!("Failed to bind motor port {}", self.listen_port))?;
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_handler = stop.clone();
        ctrlc::set_handler(move || stop_handler.store(true, Ordering::Release))
            .context("Failed to install Ctrl-C handler")?;

        let deadline = (self.duration_secs > 0)
            .then(|| Instant::now() + Duration::from_secs(self.duration_secs));
        let reply = encode(&[self.value]);
        let reply_addr = (self.reply_host.as_str(), self.reply_port);

        info!(
            "Mock simulator listening on {}, replying {} to {}:{}",
            self.listen_port, self.value, self.reply_host, self.reply_port
        );

        let mut buf = [0u8; 1024];
        let mut handled: u64 = 0;
        while !stop.load(Ordering::Acquire) && deadline.is_none_or(|d| Instant::now() < d) {
            let len = match socket.recv_from(&mut buf) {
                Ok((len, _src)) => len,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                },
                Err(e) => return Err(e.into()),
            };

            handled += 1;
            debug!("motors: {:?}", decode(&buf[..len]));
            if let Err(e) = socket.send_to(&reply, reply_addr) {
                debug!("reply failed: {}", e);
            }
        }

        info!("Mock simulator stopped after {} datagrams", handled);
        Ok(())
    }
}
