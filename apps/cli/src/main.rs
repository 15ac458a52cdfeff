//! # Simlink CLI
//!
//! 多旋翼仿真器 UDP 链路的命令行入口。
//!
//! ```bash
//! # 启动一个模拟仿真器（回传 3.14）
//! simlink-cli mock-sim --value 3.14
//!
//! # 运行交换循环 10 秒后停止
//! simlink-cli run --host 127.0.0.1 --motor-port 5000 --telemetry-port 5001
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{MockSimCommand, RunCommand};

/// Simlink CLI - 仿真器链路命令行工具
#[derive(Parser, Debug)]
#[command(name = "simlink-cli")]
#[command(about = "Exchange motor commands and telemetry with a multicopter simulator over UDP", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行交换循环（固定时长后停止，Ctrl-C 提前停止）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 启动模拟仿真器（对每个电机数据报回传一个遥测值）
    MockSim {
        #[command(flatten)]
        args: MockSimCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simlink_cli=info".parse()?)
                .add_directive("simlink_driver=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::MockSim { args } => args.execute(),
    }
}
