//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p ironwood_client -- [--config client.json] [--addr 127.0.0.1:19160]
//!       [--frame-hz 60] [--boundary clamp|wrap] [--size 1280x720]
//!
//! The client connects to the simulation server, follows its snapshots and
//! lays out a headless scene every frame.
//!
//! Console commands:
//!   status              - Show client status
//!   pan <dx> <dy>       - Move the view by surface pixels
//!   zoom <in|out>       - Change the view scale
//!   resize <w> <h>      - Resize the render surface
//!   disconnect          - Close the connection
//!   quit                - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::Context;
use ironwood_client::client::{wall_clock_secs, ConnectionState, GameClient};
use ironwood_shared::{config::ClientConfig, render::HeadlessRenderer};
use tokio::sync::mpsc;
use tracing::{info, warn};

fn parse_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn parse_args() -> anyhow::Result<ClientConfig> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).context("--config needs a path")?;
            let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
            ClientConfig::from_json_str(&text).with_context(|| format!("parse {path}"))?
        }
        None => ClientConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--frame-hz" if i + 1 < args.len() => {
                cfg.frame_hz = args[i + 1].parse().context("parse --frame-hz")?;
                i += 2;
            }
            "--boundary" if i + 1 < args.len() => {
                cfg.boundary = args[i + 1]
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
                i += 2;
            }
            "--size" if i + 1 < args.len() => {
                let (w, h) = parse_size(&args[i + 1]).context("--size expects WxH")?;
                cfg.surface_width = w;
                cfg.surface_height = h;
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        server = %cfg.server_addr,
        frame_hz = cfg.frame_hz,
        boundary = %cfg.boundary,
        width = cfg.surface_width,
        height = cfg.surface_height,
        "Starting client"
    );

    let renderer = HeadlessRenderer::new(cfg.surface_width, cfg.surface_height);
    let mut client = GameClient::connect(&cfg, renderer)
        .await
        .context("connect")?;

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(cfg.frame_hz.max(1)));
    let started = Instant::now();
    let mut frames: u64 = 0;

    'frames: loop {
        // Process console commands.
        while let Ok(line) = console_rx.try_recv() {
            if matches!(line.as_str(), "quit" | "exit") {
                break 'frames;
            }
            for out in client.exec_console(&line) {
                println!("{out}");
            }
        }

        client.poll_messages();

        if let ConnectionState::Closed { reason } = &client.state {
            println!("Disconnected from server: {reason}");
            break;
        }

        let now = Instant::now();
        let render_time = now.duration_since(started).as_secs_f64() * 1000.0;
        match client.frame(wall_clock_secs(), render_time, now).await {
            Ok(report) => {
                frames += 1;
                if frames % (u64::from(cfg.frame_hz.max(1)) * 10) == 0 {
                    let session = client.session();
                    info!(
                        frames,
                        status = ?session.status(),
                        actors = session.actors.len(),
                        active = session.actors.active_count(),
                        shown = report.actors.shown,
                        "Frame"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Frame failed"),
        }

        tokio::time::sleep(frame_interval).await;
    }

    Ok(())
}
