//! Shared fixtures for the integration tests: JSON payload builders and a
//! scripted server that plays back frames to a real client over TCP.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use ironwood_shared::{
    config::ClientConfig,
    net::{decode_server_msg, ClientMsg, ReliableConn, ReliableListener, ServerMsg},
};
use serde_json::{json, Value};

/// `2024-01-01T00:00:00Z` in epoch seconds.
pub const EPOCH_2024: f64 = 1_704_067_200.0;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Clock payload. `server_ms` is the server wall clock in milliseconds.
pub fn time_json(simulation_time: &str, velocity: f64, server_ms: f64) -> Value {
    json!({
        "simulationTime": simulation_time,
        "simulationTimeVelocity": velocity,
        "serverTime": server_ms,
    })
}

pub fn actor_json(id: &str, x: f64, y: f64) -> Value {
    json!({
        "id": id,
        "type": "PERSON",
        "name": id,
        "posture": { "x": x, "y": y, "bearing": 0.0 },
        "vision": { "fov": 90.0, "range": 50.0 },
        "actions": [],
    })
}

pub fn move_json(start_at: f64, finish_at: f64, from: (f64, f64), to: (f64, f64)) -> Value {
    json!({
        "type": "MOVE",
        "startAt": start_at,
        "finishAt": finish_at,
        "parameters": { "fromX": from.0, "fromY": from.1, "toX": to.0, "toY": to.1 },
    })
}

pub fn with_actions(mut actor: Value, actions: Vec<Value>) -> Value {
    actor["actions"] = Value::Array(actions);
    actor
}

pub fn metadata_frame(seed: &str, chunk_size: f64, columns: u32, rows: u32) -> Value {
    json!({
        "event": "metadata",
        "data": {
            "seed": seed,
            "chunkSize": chunk_size,
            "chunkColumnCount": columns,
            "chunkRowCount": rows,
        }
    })
}

pub fn initialize_frame(view: (f64, f64), time: Value, actors: Vec<Value>) -> Value {
    json!({
        "event": "initialize",
        "data": {
            "view": { "x": view.0, "y": view.1 },
            "time": time,
            "actors": actors,
        }
    })
}

pub fn simulation_frame(time: Value, actors: Vec<Value>) -> Value {
    json!({
        "event": "simulation",
        "data": { "time": time, "updatedActors": actors }
    })
}

/// Decodes a JSON frame the same way the client's reader does.
pub fn decode(frame: &Value) -> anyhow::Result<ServerMsg> {
    let bytes = serde_json::to_vec(frame).context("encode frame")?;
    Ok(decode_server_msg(&bytes)?)
}

/// A TCP server that sends whatever the test tells it to.
pub struct ScriptedServer {
    listener: ReliableListener,
}

/// Binds on an ephemeral localhost port and returns a client config aimed
/// at it.
pub async fn bind_ephemeral() -> anyhow::Result<(ScriptedServer, ClientConfig)> {
    let bind = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = ReliableListener::bind(bind).await?;
    let cfg = ClientConfig {
        server_addr: listener.local_addr()?.to_string(),
        surface_width: 1000,
        surface_height: 1000,
        view_target_interval_ms: 0,
        ..ClientConfig::default()
    };
    Ok((ScriptedServer { listener }, cfg))
}

impl ScriptedServer {
    /// Accepts one client and checks its hello.
    pub async fn accept(&self) -> anyhow::Result<ServerPeer> {
        let (conn, addr) = self.listener.accept().await?;
        let mut peer = ServerPeer { conn, addr };
        match peer.recv(Duration::from_secs(5)).await? {
            ClientMsg::Hello { .. } => Ok(peer),
            other => anyhow::bail!("expected Hello, got {other:?}"),
        }
    }
}

pub struct ServerPeer {
    conn: ReliableConn,
    pub addr: SocketAddr,
}

impl ServerPeer {
    pub async fn send(&mut self, frame: &Value) -> anyhow::Result<()> {
        self.conn.send(frame).await
    }

    pub async fn recv(&mut self, timeout: Duration) -> anyhow::Result<ClientMsg> {
        let payload = tokio::time::timeout(timeout, self.conn.recv_raw())
            .await
            .context("timed out waiting for client")??;
        serde_json::from_slice(&payload).context("decode client msg")
    }
}
