//! 驱动层错误类型定义

use simlink_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    /// Socket IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 主机地址无法解析
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// 配置值非法（如电机数量为 0）
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 配置文件解析失败
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 接收超时（正常现象，仿真器未回包）
    #[error("Receive timeout")]
    Timeout,

    /// 循环已在运行
    #[error("Exchange loop already started")]
    AlreadyStarted,

    /// 循环从未启动
    #[error("Exchange loop not started")]
    NotStarted,

    /// 实例已终止，不可重启
    #[error("Exchange loop terminated and cannot be restarted")]
    NotRestartable,

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

impl LinkError {
    /// 是否为接收超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout)
    }

    /// 将 socket 读超时映射为 `Timeout`
    ///
    /// 不同平台上 `set_read_timeout` 到期分别返回 `WouldBlock`（Unix）或 `TimedOut`（Windows）。
    pub(crate) fn from_recv(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => LinkError::Timeout,
            _ => LinkError::Io(err),
        }
    }
}
