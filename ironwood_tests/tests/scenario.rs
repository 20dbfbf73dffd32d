//! Frame-by-frame scenarios: decoded server frames driven through the sync
//! driver into a headless renderer, with explicit wall clock values.

use std::collections::BTreeSet;

use ironwood_client::{session::Session, session::Status, SyncDriver};
use ironwood_shared::{
    actor::ActorId,
    config::{BoundaryPolicy, ClientConfig},
    render::{ChunkKey, ChunkPlacement, HeadlessRenderer},
};
use ironwood_tests::{
    actor_json, decode, init_tracing, initialize_frame, metadata_frame, move_json,
    simulation_frame, time_json, with_actions, EPOCH_2024,
};

const T0: &str = "2024-01-01T00:00:00Z";

fn driver(boundary: BoundaryPolicy) -> SyncDriver<HeadlessRenderer> {
    let cfg = ClientConfig {
        surface_width: 1000,
        surface_height: 1000,
        boundary,
        ..ClientConfig::default()
    };
    SyncDriver::new(Session::new(&cfg), HeadlessRenderer::new(1000, 1000))
}

/// Metadata, configure, then initialize. Wall time equals simulation time.
fn start(
    d: &mut SyncDriver<HeadlessRenderer>,
    view: (f64, f64),
    actors: Vec<serde_json::Value>,
) -> anyhow::Result<()> {
    d.apply(decode(&metadata_frame("scenario", 1000.0, 10, 10))?);
    assert_eq!(d.session().status(), Status::PendingAssets);
    d.configure(EPOCH_2024);
    assert_eq!(d.session().status(), Status::PendingInitialize);
    d.apply(decode(&initialize_frame(
        view,
        time_json(T0, 1.0, EPOCH_2024 * 1000.0),
        actors,
    ))?);
    assert_eq!(d.session().status(), Status::Running);
    Ok(())
}

fn keys(keys: &[(u32, u32)]) -> BTreeSet<ChunkKey> {
    keys.iter().map(|&(x, y)| ChunkKey::new(x, y)).collect()
}

#[test]
fn single_chunk_and_centered_actor() -> anyhow::Result<()> {
    init_tracing();
    let mut d = driver(BoundaryPolicy::Clamp);
    start(&mut d, (500.0, 500.0), vec![actor_json("a", 500.0, 500.0)])?;

    let report = d.tick(EPOCH_2024, 0.0);
    let layout = report.layout.expect("initial layout");
    assert_eq!(layout.visible, 1);
    assert_eq!(d.renderer().attached_chunks(), &keys(&[(0, 0)]));
    assert_eq!(
        d.renderer().chunk_placement(ChunkKey::new(0, 0)),
        Some(ChunkPlacement {
            x: 0.0,
            y: 0.0,
            scale: 1.0
        })
    );

    let sprite = d.renderer().actor(&ActorId::new("a")).expect("actor drawable");
    assert!(sprite.visible);
    assert_eq!((sprite.placement.x, sprite.placement.y), (500.0, 500.0));
    Ok(())
}

#[test]
fn actor_interpolates_across_frames() -> anyhow::Result<()> {
    init_tracing();
    let mut d = driver(BoundaryPolicy::Clamp);
    let walker = with_actions(
        actor_json("w", 500.0, 500.0),
        vec![move_json(
            EPOCH_2024,
            EPOCH_2024 + 10.0,
            (500.0, 500.0),
            (600.0, 500.0),
        )],
    );
    start(&mut d, (500.0, 500.0), vec![walker])?;
    d.tick(EPOCH_2024, 0.0);

    let id = ActorId::new("w");
    for (dt, expected) in [(2.5, 525.0), (5.0, 550.0), (10.0, 600.0)] {
        let report = d.tick(EPOCH_2024 + dt, dt * 1000.0);
        assert!(report.layout.is_none());
        assert_eq!(report.actors.visited, 1);
        assert_eq!(d.renderer().actor(&id).unwrap().placement.x, expected);
    }
    assert!(d.session().actors.is_active(&id));

    let report = d.tick(EPOCH_2024 + 11.0, 11_000.0);
    assert_eq!(report.actors.settled, 1);
    assert!(!d.session().actors.has_active());
    assert_eq!(d.session().actors.get(&id).unwrap().pose.x, 600.0);
    assert_eq!(d.renderer().actor(&id).unwrap().placement.x, 600.0);
    Ok(())
}

#[test]
fn paused_clock_freezes_actors() -> anyhow::Result<()> {
    init_tracing();
    let mut d = driver(BoundaryPolicy::Clamp);
    d.apply(decode(&metadata_frame("paused", 1000.0, 10, 10))?);
    d.configure(EPOCH_2024);
    let walker = with_actions(
        actor_json("w", 500.0, 500.0),
        vec![move_json(
            EPOCH_2024,
            EPOCH_2024 + 10.0,
            (500.0, 500.0),
            (600.0, 500.0),
        )],
    );
    d.apply(decode(&initialize_frame(
        (500.0, 500.0),
        time_json("2024-01-01T00:00:04Z", 0.0, EPOCH_2024 * 1000.0),
        vec![walker],
    ))?);

    for wall in [0.0, 30.0, 600.0] {
        d.tick(EPOCH_2024 + wall, wall * 1000.0);
        let sprite = d.renderer().actor(&ActorId::new("w")).unwrap();
        assert_eq!(sprite.placement.x, 540.0);
    }
    Ok(())
}

#[test]
fn update_replaces_actor_and_relays_out() -> anyhow::Result<()> {
    init_tracing();
    let mut d = driver(BoundaryPolicy::Clamp);
    start(&mut d, (500.0, 500.0), vec![actor_json("a", 500.0, 500.0)])?;
    d.tick(EPOCH_2024, 0.0);

    d.apply(decode(&simulation_frame(
        time_json("2024-01-01T00:00:01Z", 1.0, (EPOCH_2024 + 1.0) * 1000.0),
        vec![actor_json("a", 250.0, 750.0), actor_json("b", 5000.0, 5000.0)],
    ))?);
    let report = d.tick(EPOCH_2024 + 1.0, 1000.0);
    assert!(report.layout.is_some());
    assert_eq!(report.actors.visited, 2);
    assert_eq!(report.actors.shown, 1);
    assert_eq!(report.actors.hidden, 1);

    let a = d.renderer().actor(&ActorId::new("a")).unwrap();
    assert_eq!((a.placement.x, a.placement.y), (250.0, 750.0));
    assert!(!d.renderer().actor(&ActorId::new("b")).unwrap().visible);
    Ok(())
}

#[test]
fn panning_swaps_chunks() -> anyhow::Result<()> {
    init_tracing();
    let mut d = driver(BoundaryPolicy::Clamp);
    start(&mut d, (500.0, 500.0), vec![])?;
    d.tick(EPOCH_2024, 0.0);

    d.session_mut().view.pan(1000.0, 0.0);
    let layout = d.tick(EPOCH_2024 + 0.1, 100.0).layout.expect("layout after pan");
    assert_eq!((layout.attached, layout.detached, layout.visible), (1, 1, 1));
    assert_eq!(d.renderer().attached_chunks(), &keys(&[(1, 0)]));

    d.session_mut().view.pan(-1000.0, 0.0);
    let layout = d.tick(EPOCH_2024 + 0.2, 200.0).layout.expect("layout after pan back");
    assert_eq!(layout.created, 0);
    assert_eq!(d.viewport().cached(), 2);
    Ok(())
}

#[test]
fn world_corner_depends_on_boundary_policy() -> anyhow::Result<()> {
    init_tracing();
    let mut clamp = driver(BoundaryPolicy::Clamp);
    start(&mut clamp, (0.0, 0.0), vec![])?;
    clamp.tick(EPOCH_2024, 0.0);
    assert_eq!(clamp.renderer().attached_chunks(), &keys(&[(0, 0)]));

    let mut wrap = driver(BoundaryPolicy::Wrap);
    start(&mut wrap, (0.0, 0.0), vec![])?;
    wrap.tick(EPOCH_2024, 0.0);
    assert_eq!(
        wrap.renderer().attached_chunks(),
        &keys(&[(0, 0), (9, 0), (0, 9), (9, 9)])
    );
    assert_eq!(
        wrap.renderer().chunk_placement(ChunkKey::new(9, 9)),
        Some(ChunkPlacement {
            x: -500.0,
            y: -500.0,
            scale: 1.0
        })
    );
    Ok(())
}
