//! Networking primitives.
//!
//! Goals:
//! - Decode server payloads strictly at the boundary into typed messages.
//! - Provide a simple reliable (TCP) channel with length-prefixed JSON frames.
//! - Keep the wire envelope explicit: `{ "event": name, "data": payload }`.
//!
//! Optional actor fields fall back to defaults; a missing or unparsable clock
//! rejects the whole message with a [`SnapshotError`].

use std::fmt;
use std::net::SocketAddr;

use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
};

use crate::{
    actor::{Action, ActionKind, Actor, ActorId, Pose, Vision},
    clock::SimulationClock,
    config::WorldGrid,
    math::Vec2,
};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

// ─── Wire payloads ───

/// Server -> client envelope as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerFrame {
    Metadata(MetadataPayload),
    Initialize(InitializePayload),
    Simulation(SimulationPayload),
    Disconnect { reason: String },
}

/// World description published by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    #[serde(default)]
    pub seed: String,
    pub chunk_size: f64,
    pub chunk_column_count: u32,
    pub chunk_row_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewPayload {
    pub x: f64,
    pub y: f64,
}

/// Accepts `"1.5"` as well as `1.5`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(v) => *v,
            Numeric::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimePayload {
    /// ISO-8601 simulation timestamp.
    pub simulation_time: String,
    pub simulation_time_velocity: Numeric,
    /// Wall-clock capture time, epoch milliseconds.
    pub server_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializePayload {
    pub view: ViewPayload,
    pub time: TimePayload,
    #[serde(default)]
    pub actors: Vec<ActorPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPayload {
    pub time: TimePayload,
    #[serde(default)]
    pub updated_actors: Vec<ActorPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PosturePayload {
    pub x: f64,
    pub y: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct VisionPayload {
    pub fov: f64,
    pub range: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorPayload {
    #[serde(default = "default_actor_id")]
    pub id: String,
    #[serde(rename = "type", default = "default_actor_type")]
    pub kind: String,
    #[serde(default = "default_actor_name")]
    pub name: String,
    #[serde(default)]
    pub posture: PosturePayload,
    #[serde(default)]
    pub vision: VisionPayload,
    #[serde(default)]
    pub actions: Vec<ActionPayload>,
}

fn default_actor_id() -> String {
    "unknown".to_string()
}

fn default_actor_type() -> String {
    "NONE".to_string()
}

fn default_actor_name() -> String {
    "Nameless".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub start_at: f64,
    pub finish_at: f64,
    #[serde(default)]
    pub parameters: ActionParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionParameters {
    pub from_x: Option<f64>,
    pub from_y: Option<f64>,
    pub to_x: Option<f64>,
    pub to_y: Option<f64>,
    pub delta: Option<f64>,
    pub to_bearing: Option<f64>,
}

/// Client -> server envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMsg {
    Hello { protocol: u32 },
    View(ViewTarget),
}

/// The client's focal point, sent so the server can scope its updates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewTarget {
    pub view_x: f64,
    pub view_y: f64,
}

// ─── Decoded messages ───

/// World description.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMetadata {
    pub seed: String,
    pub grid: WorldGrid,
}

/// Full snapshot sent once after connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct Initialize {
    pub view: Vec2,
    pub clock: SimulationClock,
    pub actors: Vec<Actor>,
}

/// Incremental snapshot: fresh clock plus changed or added actors.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationUpdate {
    pub clock: SimulationClock,
    pub updated_actors: Vec<Actor>,
}

/// Typed server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMsg {
    Metadata(WorldMetadata),
    Initialize(Initialize),
    Update(SimulationUpdate),
    Disconnect { reason: String },
}

/// Malformed server payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// Not valid JSON, unknown event or missing required field.
    Malformed(String),
    InvalidTimestamp(String),
    InvalidVelocity(String),
    InvalidServerTime(f64),
    InvalidAction { actor: String, reason: String },
    InvalidMetadata(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Malformed(e) => write!(f, "malformed payload: {e}"),
            SnapshotError::InvalidTimestamp(s) => write!(f, "invalid simulation time: {s:?}"),
            SnapshotError::InvalidVelocity(s) => write!(f, "invalid time velocity: {s}"),
            SnapshotError::InvalidServerTime(t) => write!(f, "invalid server time: {t}"),
            SnapshotError::InvalidAction { actor, reason } => {
                write!(f, "invalid action for actor {actor}: {reason}")
            }
            SnapshotError::InvalidMetadata(reason) => write!(f, "invalid metadata: {reason}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl TryFrom<&TimePayload> for SimulationClock {
    type Error = SnapshotError;

    fn try_from(time: &TimePayload) -> Result<Self, Self::Error> {
        let sim = DateTime::parse_from_rfc3339(&time.simulation_time)
            .map_err(|_| SnapshotError::InvalidTimestamp(time.simulation_time.clone()))?;
        let velocity = time
            .simulation_time_velocity
            .to_f64()
            .ok_or_else(|| SnapshotError::InvalidVelocity(format!("{:?}", time.simulation_time_velocity)))?;
        if !time.server_time.is_finite() {
            return Err(SnapshotError::InvalidServerTime(time.server_time));
        }
        Ok(SimulationClock::new(
            sim.timestamp_micros() as f64 / 1_000_000.0,
            time.server_time / 1000.0,
            velocity,
        ))
    }
}

impl ActionPayload {
    fn into_action(self, actor: &str) -> Result<Action, SnapshotError> {
        let invalid = |reason: &str| SnapshotError::InvalidAction {
            actor: actor.to_string(),
            reason: reason.to_string(),
        };
        if !self.start_at.is_finite() || !self.finish_at.is_finite() {
            return Err(invalid("non-finite action window"));
        }
        let p = self.parameters;
        let kind = match self.kind.as_str() {
            "MOVE" => ActionKind::Move {
                from_x: p.from_x.ok_or_else(|| invalid("MOVE without fromX"))?,
                from_y: p.from_y.ok_or_else(|| invalid("MOVE without fromY"))?,
                to_x: p.to_x,
                to_y: p.to_y,
            },
            "ROTATE" => ActionKind::Rotate {
                delta: p.delta.ok_or_else(|| invalid("ROTATE without delta"))?,
                to_bearing: p.to_bearing,
            },
            other => ActionKind::Other(other.to_string()),
        };
        Ok(Action {
            kind,
            start_at: self.start_at,
            finish_at: self.finish_at,
        })
    }
}

impl TryFrom<ActorPayload> for Actor {
    type Error = SnapshotError;

    fn try_from(payload: ActorPayload) -> Result<Self, Self::Error> {
        let actions = payload
            .actions
            .into_iter()
            .map(|a| a.into_action(&payload.id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Actor {
            id: ActorId(payload.id),
            kind: payload.kind,
            name: payload.name,
            pose: Pose::new(payload.posture.x, payload.posture.y, payload.posture.bearing),
            vision: Vision {
                fov: payload.vision.fov,
                range: payload.vision.range,
            },
            actions,
        })
    }
}

fn decode_actors(actors: Vec<ActorPayload>) -> Result<Vec<Actor>, SnapshotError> {
    actors.into_iter().map(Actor::try_from).collect()
}

impl TryFrom<ServerFrame> for ServerMsg {
    type Error = SnapshotError;

    fn try_from(frame: ServerFrame) -> Result<Self, Self::Error> {
        match frame {
            ServerFrame::Metadata(m) => {
                if !(m.chunk_size.is_finite() && m.chunk_size > 0.0) {
                    return Err(SnapshotError::InvalidMetadata(format!(
                        "chunk size {}",
                        m.chunk_size
                    )));
                }
                if m.chunk_column_count == 0 || m.chunk_row_count == 0 {
                    return Err(SnapshotError::InvalidMetadata("empty chunk grid".into()));
                }
                Ok(ServerMsg::Metadata(WorldMetadata {
                    seed: m.seed,
                    grid: WorldGrid {
                        chunk_size: m.chunk_size,
                        chunk_columns: m.chunk_column_count,
                        chunk_rows: m.chunk_row_count,
                    },
                }))
            }
            ServerFrame::Initialize(init) => Ok(ServerMsg::Initialize(Initialize {
                view: Vec2::new(init.view.x, init.view.y),
                clock: SimulationClock::try_from(&init.time)?,
                actors: decode_actors(init.actors)?,
            })),
            ServerFrame::Simulation(sim) => Ok(ServerMsg::Update(SimulationUpdate {
                clock: SimulationClock::try_from(&sim.time)?,
                updated_actors: decode_actors(sim.updated_actors)?,
            })),
            ServerFrame::Disconnect { reason } => Ok(ServerMsg::Disconnect { reason }),
        }
    }
}

/// Decodes one server frame payload into a typed message.
pub fn decode_server_msg(b: &[u8]) -> Result<ServerMsg, SnapshotError> {
    let frame: ServerFrame =
        serde_json::from_slice(b).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
    ServerMsg::try_from(frame)
}

/// Convenience codec helper.
pub fn encode_to_bytes<T: Serialize>(msg: &T) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

// ─── Framing ───

/// Writes one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, payload: &[u8]) -> anyhow::Result<()> {
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(payload);
    w.write_all(&buf).await.context("tcp write")?;
    Ok(())
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> anyhow::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).await.context("tcp read len")?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        anyhow::bail!("frame of {len} bytes exceeds limit");
    }
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)
        .await
        .context("tcp read payload")?;
    Ok(payload)
}

/// Reliable connection over TCP with length-prefixed frames.
#[derive(Debug)]
pub struct ReliableConn {
    stream: TcpStream,
}

impl ReliableConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        Ok(Self::new(stream))
    }

    pub async fn send<T: Serialize>(&mut self, msg: &T) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize msg")?;
        write_frame(&mut self.stream, &payload).await
    }

    pub async fn recv_raw(&mut self) -> anyhow::Result<Vec<u8>> {
        read_frame(&mut self.stream).await
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Splits into independently owned read and write halves.
    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        let (read, write) = self.stream.into_split();
        (FrameReader { read }, FrameWriter { write })
    }
}

/// Read half of a [`ReliableConn`].
#[derive(Debug)]
pub struct FrameReader {
    read: OwnedReadHalf,
}

impl FrameReader {
    pub async fn recv_raw(&mut self) -> anyhow::Result<Vec<u8>> {
        read_frame(&mut self.read).await
    }
}

/// Write half of a [`ReliableConn`].
#[derive(Debug)]
pub struct FrameWriter {
    write: OwnedWriteHalf,
}

impl FrameWriter {
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize msg")?;
        write_frame(&mut self.write, &payload).await
    }
}

/// TCP listener, used by scripted servers in tests and tools.
pub struct ReliableListener {
    listener: TcpListener,
}

impl ReliableListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(ReliableConn, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        Ok((ReliableConn::new(stream), addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}
