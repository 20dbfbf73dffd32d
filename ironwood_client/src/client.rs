//! Client implementation.
//!
//! The client maintains:
//! - A reliable control stream to the simulation server
//! - A reader task decoding frames into an inbox drained once per frame
//! - The synchronization driver and its renderer
//! - A debounced view target sent back upstream

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use ironwood_shared::{
    config::ClientConfig,
    net::{
        decode_server_msg, ClientMsg, FrameReader, FrameWriter, ReliableConn, ServerMsg,
        ViewTarget, PROTOCOL_VERSION,
    },
    render::RenderBackend,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    driver::{SyncDriver, TickReport},
    input::{InputEvent, InputOutcome, PointerState},
    session::{Session, Status},
};

/// Wall clock in seconds since the Unix epoch.
pub fn wall_clock_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// The server hung up or sent a disconnect.
    Closed { reason: String },
}

/// What the reader task hands to the frame loop.
#[derive(Debug)]
enum Inbound {
    Msg(ServerMsg),
    Closed(String),
}

/// Trailing-edge debounce for view targets.
///
/// A target is released once no newer one arrived for `interval`. Repeats of
/// the last released target are swallowed.
#[derive(Debug)]
pub struct ViewTargetDebounce {
    interval: Duration,
    pending: Option<(ViewTarget, Instant)>,
    last_sent: Option<ViewTarget>,
}

impl ViewTargetDebounce {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            last_sent: None,
        }
    }

    /// Records a new target and restarts the quiet period.
    pub fn push(&mut self, target: ViewTarget, now: Instant) {
        self.pending = Some((target, now));
    }

    /// Returns the pending target once it has been quiet long enough.
    pub fn poll(&mut self, now: Instant) -> Option<ViewTarget> {
        let (target, since) = self.pending?;
        if now.saturating_duration_since(since) < self.interval {
            return None;
        }
        self.pending = None;
        if self.last_sent == Some(target) {
            return None;
        }
        self.last_sent = Some(target);
        Some(target)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// High-level client: network plumbing around a [`SyncDriver`].
pub struct GameClient<R: RenderBackend> {
    pub state: ConnectionState,
    pub pointer: PointerState,

    driver: SyncDriver<R>,
    writer: FrameWriter,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    reader: JoinHandle<()>,
    debounce: ViewTargetDebounce,
    server: SocketAddr,
    messages: u64,
}

impl<R: RenderBackend> GameClient<R> {
    /// Connects to the server and announces the protocol version.
    pub async fn connect(cfg: &ClientConfig, renderer: R) -> anyhow::Result<Self> {
        let server: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        info!(server = %server, "Connecting to server");

        let conn = ReliableConn::connect(server).await?;
        let (reader, mut writer) = conn.into_split();
        writer
            .send(&ClientMsg::Hello {
                protocol: PROTOCOL_VERSION,
            })
            .await?;

        let (tx, inbox) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(reader, tx));

        info!(server = %server, "Connected to server");
        Ok(Self {
            state: ConnectionState::Connected,
            pointer: PointerState::default(),
            driver: SyncDriver::new(Session::new(cfg), renderer),
            writer,
            inbox,
            reader,
            debounce: ViewTargetDebounce::new(Duration::from_millis(cfg.view_target_interval_ms)),
            server,
            messages: 0,
        })
    }

    pub fn driver(&self) -> &SyncDriver<R> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut SyncDriver<R> {
        &mut self.driver
    }

    pub fn session(&self) -> &Session {
        self.driver.session()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConnectionState::Closed { .. })
    }

    /// Applies every message that arrived since the last call.
    pub fn poll_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(inbound) = self.inbox.try_recv() {
            self.handle_inbound(inbound);
            applied += 1;
        }
        applied
    }

    /// Waits up to `timeout` for one message. Returns whether one arrived.
    pub async fn wait_for_message(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.inbox.recv()).await {
            Ok(Some(inbound)) => {
                self.handle_inbound(inbound);
                true
            }
            Ok(None) => {
                self.close("reader stopped".to_string());
                false
            }
            Err(_) => false,
        }
    }

    /// Routes one input event into the view.
    pub fn handle_input(&mut self, event: InputEvent) -> InputOutcome {
        self.pointer
            .handle(event, &mut self.driver.session_mut().view)
    }

    /// Runs one frame and sends the view target once it settles.
    ///
    /// Assets of the headless renderer load instantly, so the first frame
    /// after world metadata configures the driver. View targets are only
    /// queued once the session is running.
    pub async fn frame(
        &mut self,
        now_wall: f64,
        render_time: f64,
        now: Instant,
    ) -> anyhow::Result<TickReport> {
        if self.driver.session().status() == Status::PendingAssets {
            self.driver.configure(now_wall);
        }

        let report = self.driver.tick(now_wall, render_time);
        // The server has no use for a focal point before the first snapshot.
        if let Some(target) = report.view_target {
            if self.driver.session().status() == Status::Running {
                self.debounce.push(target, now);
            }
        }
        if let Some(target) = self.debounce.poll(now) {
            debug!(x = target.view_x, y = target.view_y, "Sending view target");
            self.writer.send(&ClientMsg::View(target)).await?;
        }
        Ok(report)
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, line: &str) -> Vec<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else {
            return Vec::new();
        };

        match command {
            "status" => self.status_lines(),
            "pan" => match (parse_f64(tokens.get(1)), parse_f64(tokens.get(2))) {
                (Some(dx), Some(dy)) => {
                    self.driver.session_mut().view.pan(dx, dy);
                    Vec::new()
                }
                _ => vec!["Usage: pan <dx> <dy>".to_string()],
            },
            "zoom" => match tokens.get(1).copied() {
                Some("in") => {
                    self.handle_input(InputEvent::Scroll { delta_y: -1.0 });
                    vec![format!("Scale: {}", self.session().view.scale())]
                }
                Some("out") => {
                    self.handle_input(InputEvent::Scroll { delta_y: 1.0 });
                    vec![format!("Scale: {}", self.session().view.scale())]
                }
                _ => vec!["Usage: zoom <in|out>".to_string()],
            },
            "resize" => {
                let w = tokens.get(1).and_then(|t| t.parse::<u32>().ok());
                let h = tokens.get(2).and_then(|t| t.parse::<u32>().ok());
                match (w, h) {
                    (Some(w), Some(h)) => {
                        self.driver.resize(w, h);
                        Vec::new()
                    }
                    _ => vec!["Usage: resize <width> <height>".to_string()],
                }
            }
            "disconnect" => {
                self.close("disconnect command".to_string());
                vec!["Disconnected".to_string()]
            }
            other => vec![format!("Unknown command: {other}")],
        }
    }

    pub fn status_lines(&self) -> Vec<String> {
        let session = self.session();
        let view = &session.view;
        let mut out = vec![
            format!("State: {:?}", self.state),
            format!("Server: {}", self.server),
            format!("Status: {:?}", session.status()),
            format!("Messages: {}", self.messages),
            format!("Actors: {} ({} active)", session.actors.len(), session.actors.active_count()),
            format!(
                "View: ({:.1}, {:.1}) x{}",
                view.position().x,
                view.position().y,
                view.scale()
            ),
            format!("Chunks visible: {}", self.driver.viewport().visible().len()),
        ];
        if let Some(metadata) = session.metadata() {
            out.push(format!("Seed: {}", metadata.seed));
        }
        if let Some(sim) = session.sim_time(wall_clock_secs()) {
            out.push(format!("Simulation time: {sim:.3}"));
        }
        out
    }

    fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Msg(ServerMsg::Disconnect { reason }) => {
                self.messages += 1;
                self.driver.apply(ServerMsg::Disconnect {
                    reason: reason.clone(),
                });
                self.close(reason);
            }
            Inbound::Msg(msg) => {
                self.messages += 1;
                self.driver.apply(msg);
            }
            Inbound::Closed(reason) => {
                warn!(reason = %reason, "Server connection lost");
                self.close(reason);
            }
        }
    }

    fn close(&mut self, reason: String) {
        if !self.is_closed() {
            self.state = ConnectionState::Closed { reason };
        }
    }
}

impl<R: RenderBackend> Drop for GameClient<R> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn parse_f64(token: Option<&&str>) -> Option<f64> {
    token.and_then(|t| t.parse::<f64>().ok())
}

/// Decodes frames until the connection fails or the client goes away.
async fn read_loop(mut reader: FrameReader, tx: mpsc::UnboundedSender<Inbound>) {
    loop {
        let payload = match reader.recv_raw().await {
            Ok(payload) => payload,
            Err(e) => {
                let _ = tx.send(Inbound::Closed(format!("{e:#}")));
                return;
            }
        };
        match decode_server_msg(&payload) {
            Ok(msg) => {
                if tx.send(Inbound::Msg(msg)).is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, bytes = payload.len(), "Dropping malformed server message"),
        }
    }
}
