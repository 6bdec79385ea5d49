//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use auth_gate::config::{parse_config, GateConfig};
use auth_gate::http::GateServer;
use auth_gate::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a mock upstream that answers `upstream:{METHOD} {request-target}`.
pub async fn start_mock_upstream(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let request_line = head.lines().next().unwrap_or_default();
                        let target = request_line
                            .rsplit_once(' ')
                            .map_or(request_line, |(line, _version)| line);
                        let body = format!("upstream:{target}");

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Config for a gate on `gate_addr` in front of `upstream_addr`.
///
/// Server identity header `X-Gate-Peer: server-secret` (the same pair signs
/// server-to-server requests), user `alice` (token `tok-alice`) with read
/// access to namespace `dev`.
#[allow(dead_code)]
pub fn base_config(gate_addr: SocketAddr, upstream_addr: SocketAddr) -> GateConfig {
    let toml = format!(
        r#"
[listener]
bind_address = "{gate_addr}"

[upstream]
address = "{upstream_addr}"

[auth]
server_identity_key = "X-Gate-Peer"
server_identity_value = "server-secret"

[[auth.users]]
username = "alice"
token = "tok-alice"

[[auth.users.grants]]
resource = "dev:*"
action = "r"

[[routes]]
name = "config-read"
method = "GET"
path = "/nacos/v1/cs/configs"
permission = {{ action = "read", parser = "config" }}

[[routes]]
name = "ops-blank"
method = "GET"
path = "/nacos/v1/ops/**"
permission = {{ action = "read" }}

[[routes]]
name = "health"
path = "/nacos/v1/console/health/**"
"#
    );
    parse_config(&toml).unwrap()
}

/// Start the gate and wait until it accepts connections.
#[allow(dead_code)]
pub async fn start_gate(config: GateConfig) -> (Shutdown, mpsc::UnboundedSender<GateConfig>) {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let shutdown = Shutdown::new();
    let (update_tx, config_updates) = mpsc::unbounded_channel();

    let server = GateServer::new(config).unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    (shutdown, update_tx)
}

/// Client without pooling or system proxies.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
