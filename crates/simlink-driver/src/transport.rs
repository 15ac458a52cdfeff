//! 传输层抽象
//!
//! 电机指令和遥测是两条独立的单向 UDP 流，各自一个 socket：
//! - `MotorSink`: 发送电机指令数据报
//! - `TelemetrySource`: 带超时接收遥测数据报
//!
//! 两个 trait 只在 IO 线程中使用，测试可以替换为 Mock 实现。

use crate::config::{LinkConfig, unspecified_for};
use crate::error::LinkError;
use std::net::{SocketAddr, UdpSocket};
use tracing::debug;

/// 电机指令发送端
pub trait MotorSink {
    /// 发送一个完整数据报
    fn send(&mut self, payload: &[u8]) -> Result<(), LinkError>;
}

/// 遥测接收端
pub trait TelemetrySource {
    /// 接收一个数据报到 `buf`，返回实际长度
    ///
    /// 超时返回 `LinkError::Timeout`。数据报长于 `buf` 时多余部分被丢弃。
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// 本地监听地址（用于诊断）
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// UDP 电机指令发送端
///
/// 使用系统分配的临时端口，每次 `send_to` 到仿真器电机端口。
/// 本地 socket 与目标地址同一地址族。
#[derive(Debug)]
pub struct UdpMotorSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpMotorSink {
    pub fn new(dest: SocketAddr) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind((unspecified_for(&dest), 0))?;
        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl MotorSink for UdpMotorSink {
    fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.socket.send_to(payload, self.dest)?;
        Ok(())
    }
}

/// UDP 遥测接收端
///
/// 绑定在本地遥测端口上，读超时即为配置的接收超时。
#[derive(Debug)]
pub struct UdpTelemetrySource {
    socket: UdpSocket,
}

impl UdpTelemetrySource {
    pub fn bind(config: &LinkConfig) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind(config.telemetry_bind_addr())?;
        socket.set_read_timeout(Some(config.receive_timeout()))?;
        Ok(Self { socket })
    }
}

impl TelemetrySource for UdpTelemetrySource {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let (len, _src) = self.socket.recv_from(buf).map_err(LinkError::from_recv)?;
        Ok(len)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

/// 打开两条 UDP 流
///
/// # Errors
/// - `LinkError::InvalidConfig` / `LinkError::InvalidAddress`: 配置非法
/// - `LinkError::Io`: socket 创建或绑定失败（如端口被占用）
pub fn open_udp(config: &LinkConfig) -> Result<(UdpMotorSink, UdpTelemetrySource), LinkError> {
    config.validate()?;
    let sink = UdpMotorSink::new(config.motor_addr()?)?;
    let source = UdpTelemetrySource::bind(config)?;
    debug!(
        "UDP link opened: motors -> {}, telemetry <- {:?}",
        sink.dest(),
        source.local_addr()
    );
    Ok((sink, source))
}
