//! Socket-based integration tests: a scripted server feeds a real client.

use std::time::{Duration, Instant};

use ironwood_client::{
    client::{wall_clock_secs, ConnectionState},
    session::Status,
    GameClient,
};
use ironwood_shared::{
    actor::ActorId,
    net::{encode_to_bytes, ClientMsg, ViewTarget, PROTOCOL_VERSION},
    render::HeadlessRenderer,
};
use ironwood_tests::{
    actor_json, bind_ephemeral, init_tracing, initialize_frame, metadata_frame, simulation_frame,
    time_json, EPOCH_2024,
};
use serde_json::json;

/// Runs frames until the connection closes or `limit` passes.
async fn run_until_closed(
    client: &mut GameClient<HeadlessRenderer>,
    limit: Duration,
) -> anyhow::Result<()> {
    let deadline = Instant::now() + limit;
    while !client.is_closed() && Instant::now() < deadline {
        client.wait_for_message(Duration::from_millis(20)).await;
        client.poll_messages();
        client.frame(wall_clock_secs(), 0.0, Instant::now()).await?;
    }
    Ok(())
}

#[test]
fn client_messages_use_event_envelope() -> anyhow::Result<()> {
    let hello = encode_to_bytes(&ClientMsg::Hello {
        protocol: PROTOCOL_VERSION,
    })?;
    let value: serde_json::Value = serde_json::from_slice(&hello)?;
    assert_eq!(value, json!({ "event": "hello", "data": { "protocol": 1 } }));
    Ok(())
}

/// Full session: metadata, snapshot, view target upstream, an update, a
/// malformed frame that gets dropped, then a server-side disconnect.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_follows_scripted_server() -> anyhow::Result<()> {
    init_tracing();
    let (server, cfg) = bind_ephemeral().await?;

    let server_handle = tokio::spawn(async move {
        let mut peer = server.accept().await?;
        peer.send(&metadata_frame("it", 1000.0, 10, 10)).await?;
        // Paused clock keeps placements independent of the real wall clock.
        let time = time_json("2024-01-01T00:00:00Z", 0.0, EPOCH_2024 * 1000.0);
        peer.send(&initialize_frame(
            (500.0, 500.0),
            time.clone(),
            vec![actor_json("a", 500.0, 500.0)],
        ))
        .await?;

        let view = peer.recv(Duration::from_secs(5)).await?;

        peer.send(&json!({ "event": "teleport", "data": {} })).await?;
        peer.send(&simulation_frame(time, vec![actor_json("b", 700.0, 500.0)]))
            .await?;
        peer.send(&json!({ "event": "disconnect", "data": { "reason": "shutdown" } }))
            .await?;
        Ok::<_, anyhow::Error>(view)
    });

    let mut client = GameClient::connect(&cfg, HeadlessRenderer::new(1000, 1000)).await?;
    run_until_closed(&mut client, Duration::from_secs(5)).await?;

    let view = server_handle.await??;
    assert_eq!(
        view,
        ClientMsg::View(ViewTarget {
            view_x: 500.0,
            view_y: 500.0
        })
    );

    assert_eq!(
        client.state,
        ConnectionState::Closed {
            reason: "shutdown".to_string()
        }
    );
    let session = client.session();
    assert_eq!(session.status(), Status::Running);
    assert_eq!(session.actors.len(), 2);

    let renderer = client.driver().renderer();
    let b = renderer.actor(&ActorId::new("b")).expect("b drawable");
    assert!(b.visible);
    assert_eq!(b.placement.x, 700.0);
    assert!(renderer.frames() > 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_connection_closes_client() -> anyhow::Result<()> {
    init_tracing();
    let (server, cfg) = bind_ephemeral().await?;

    let server_handle = tokio::spawn(async move {
        let peer = server.accept().await?;
        drop(peer);
        Ok::<_, anyhow::Error>(())
    });

    let mut client = GameClient::connect(&cfg, HeadlessRenderer::new(1000, 1000)).await?;
    server_handle.await??;
    run_until_closed(&mut client, Duration::from_secs(5)).await?;

    assert!(client.is_closed());
    assert_eq!(client.session().status(), Status::PendingMetadata);
    Ok(())
}

#[tokio::test]
async fn connect_to_closed_port_fails() -> anyhow::Result<()> {
    let (server, cfg) = bind_ephemeral().await?;
    drop(server);
    let result = GameClient::connect(&cfg, HeadlessRenderer::new(10, 10)).await;
    assert!(result.is_err());
    Ok(())
}
