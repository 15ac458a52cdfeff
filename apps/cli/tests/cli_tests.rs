//! CLI 端到端测试

use assert_cmd::Command;
use predicates::prelude::*;
use simlink_protocol::{decode, encode};
use std::net::UdpSocket;
use std::process::Stdio;
use std::time::{Duration, Instant};

fn cli() -> Command {
    Command::cargo_bin("simlink-cli").unwrap()
}

fn unused_udp_port() -> u16 {
    let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

#[test]
fn test_help_lists_subcommands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("mock-sim"));
}

#[test]
fn test_zero_motors_rejected() {
    cli()
        .args(["run", "--motors", "0", "--duration-secs", "1"])
        .assert()
        .failure();
}

#[test]
fn test_short_run_prints_metrics() {
    let port = unused_udp_port().to_string();
    cli()
        .args([
            "run",
            "--motor-port",
            port.as_str(),
            "--telemetry-port",
            "0",
            "--timeout-ms",
            "50",
            "--duration-secs",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("iterations="));
}

#[test]
fn test_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("link.toml");
    std::fs::write(&path, "motor_count = 0\n").unwrap();

    cli()
        .args(["run", "--config"])
        .arg(&path)
        .args(["--duration-secs", "1"])
        .assert()
        .failure();
}

#[test]
fn test_mock_sim_replies_to_motor_datagram() {
    let listen_port = unused_udp_port();
    let reply_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    reply_socket
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let reply_port = reply_socket.local_addr().unwrap().port();

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("simlink-cli"))
        .args([
            "mock-sim",
            "--listen-port",
            &listen_port.to_string(),
            "--reply-port",
            &reply_port.to_string(),
            "--value",
            "3.14",
            "--duration-secs",
            "2",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // 进程启动并绑定端口之前发出的数据报会丢失，因此重复发送直到收到回复
    let motors = encode(&[0.6, 0.6, 0.6, 0.6]);
    assert_eq!(motors.len(), 32);
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut reply = None;
    let mut buf = [0u8; 64];
    while reply.is_none() && Instant::now() < deadline {
        reply_socket
            .send_to(&motors, ("127.0.0.1", listen_port))
            .unwrap();
        if let Ok((len, _)) = reply_socket.recv_from(&mut buf) {
            reply = Some(decode(&buf[..len]));
        }
    }

    let status = child.wait().unwrap();
    assert!(status.success());
    assert_eq!(reply, Some(vec![3.14]));
}
