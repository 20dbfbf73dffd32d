//! Synchronization driver.
//!
//! The per-frame orchestrator. A tick where the view moved re-lays out the
//! chunk grid and re-places every actor; any other tick only advances actors
//! with in-flight actions. Time is passed in so ticks are deterministic.

use ironwood_shared::{
    net::{ServerMsg, ViewTarget},
    render::RenderBackend,
};
use tracing::{debug, info, warn};

use crate::{
    directory::RefreshStats,
    session::{Session, SessionEvent},
    viewport::{LayoutStats, ViewportWindow},
};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    /// Assets were not loaded; nothing ran.
    pub skipped: bool,
    /// `Some` when the view was dirty and a full layout ran.
    pub layout: Option<LayoutStats>,
    pub actors: RefreshStats,
    /// Focal point to propagate upstream after a full layout.
    pub view_target: Option<ViewTarget>,
}

pub struct SyncDriver<R: RenderBackend> {
    session: Session,
    viewport: ViewportWindow,
    renderer: R,
}

impl<R: RenderBackend> SyncDriver<R> {
    pub fn new(session: Session, renderer: R) -> Self {
        let viewport = ViewportWindow::new(session.view.boundary());
        Self {
            session,
            viewport,
            renderer,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn viewport(&self) -> &ViewportWindow {
        &self.viewport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Applies a decoded server message to the session.
    pub fn apply(&mut self, msg: ServerMsg) {
        self.session.apply(msg);
    }

    /// The render surface changed size.
    pub fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "Render surface resized");
        self.session.resize(width, height);
        self.renderer.resize(width, height);
    }

    /// Marks assets loaded, runs the first layout and actor placement, then
    /// marks rendering initialized.
    pub fn configure(&mut self, now_wall: f64) {
        self.session.set_assets_loaded();
        self.dispatch_events();
        self.layout();
        if let Some(now_sim) = self.session.sim_time(now_wall) {
            self.refresh_actors(true, now_sim);
        }
        self.session.set_render_initialized();
        self.dispatch_events();
    }

    /// Runs one frame at wall time `now_wall` (seconds).
    pub fn tick(&mut self, now_wall: f64, render_time: f64) -> TickReport {
        if !self.session.assets_loaded() {
            return TickReport {
                skipped: true,
                ..TickReport::default()
            };
        }

        self.dispatch_events();

        let mut report = TickReport::default();
        if self.session.view.is_dirty() {
            report.layout = Some(self.layout());
            if let Some(now_sim) = self.session.sim_time(now_wall) {
                report.actors = self.refresh_actors(true, now_sim);
            }
            let focus = self.session.view.position();
            report.view_target = Some(ViewTarget {
                view_x: focus.x,
                view_y: focus.y,
            });
            self.session.view.clear_dirty();
        } else if self.session.actors.has_active() {
            if let Some(now_sim) = self.session.sim_time(now_wall) {
                report.actors = self.refresh_actors(false, now_sim);
            }
        }

        self.renderer.present(render_time);
        report
    }

    fn layout(&mut self) -> LayoutStats {
        let session = &self.session;
        self.viewport.layout(
            session.grid(),
            &session.view,
            session.surface(),
            &mut self.renderer,
        )
    }

    fn refresh_actors(&mut self, all: bool, now_sim: f64) -> RefreshStats {
        let surface = self.session.surface();
        self.session.actors.refresh(
            all,
            now_sim,
            &self.session.view,
            surface,
            &mut self.renderer,
        )
    }

    /// Forwards queued session events to the renderer in push order.
    fn dispatch_events(&mut self) {
        for event in self.session.drain_events() {
            match event {
                SessionEvent::ActorAdded(id) => match self.session.actors.get(&id) {
                    Some(actor) => self.renderer.add_actor(actor),
                    None => warn!(actor = %id, "Added actor vanished before dispatch"),
                },
                SessionEvent::ActorUpdated(id) => match self.session.actors.get(&id) {
                    Some(actor) => self.renderer.update_actor(actor),
                    None => warn!(actor = %id, "Updated actor vanished before dispatch"),
                },
                SessionEvent::StatusChanged(status) => {
                    info!(status = ?status, "Client status changed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ironwood_shared::{
        actor::{Action, Actor, ActorId, Pose},
        clock::SimulationClock,
        config::{ClientConfig, WorldGrid},
        math::Vec2,
        net::{Initialize, SimulationUpdate, WorldMetadata},
        render::{ChunkKey, HeadlessRenderer},
    };

    use super::*;
    use crate::session::Status;

    fn driver() -> SyncDriver<HeadlessRenderer> {
        let cfg = ClientConfig {
            surface_width: 1000,
            surface_height: 1000,
            ..ClientConfig::default()
        };
        let mut session = Session::new(&cfg);
        session.set_metadata(WorldMetadata {
            seed: "t".into(),
            grid: WorldGrid::default(),
        });
        SyncDriver::new(session, HeadlessRenderer::new(1000, 1000))
    }

    fn walker() -> Actor {
        Actor::new(ActorId::new("w"), "PERSON", "Walker", Pose::new(500.0, 500.0, 0.0)).with_actions(
            vec![Action::moving(0.0, 10.0, Vec2::new(500.0, 500.0), Vec2::new(600.0, 500.0))],
        )
    }

    fn initialize(driver: &mut SyncDriver<HeadlessRenderer>, actors: Vec<Actor>) {
        driver.apply(ServerMsg::Initialize(Initialize {
            view: Vec2::new(500.0, 500.0),
            clock: SimulationClock::new(0.0, 0.0, 1.0),
            actors,
        }));
    }

    #[test]
    fn tick_before_assets_is_noop() {
        let mut d = driver();
        initialize(&mut d, vec![walker()]);
        let report = d.tick(1.0, 16.0);
        assert!(report.skipped);
        assert_eq!(d.renderer().frames(), 0);
        assert_eq!(d.renderer().actor_count(), 0);
    }

    #[test]
    fn configure_reaches_running_and_places_actors() {
        let mut d = driver();
        initialize(&mut d, vec![walker()]);
        d.configure(5.0);

        assert_eq!(d.session().status(), Status::Running);
        let sprite = d.renderer().actor(&ActorId::new("w")).unwrap();
        assert!(sprite.visible);
        assert_eq!(sprite.placement.x, 550.0);
    }

    #[test]
    fn dirty_tick_lays_out_and_emits_view_target() {
        let mut d = driver();
        initialize(&mut d, vec![walker()]);
        d.configure(0.0);

        let report = d.tick(1.0, 16.0);
        assert!(report.layout.is_some());
        assert_eq!(
            report.view_target,
            Some(ViewTarget {
                view_x: 500.0,
                view_y: 500.0
            })
        );
        assert!(!d.session().view.is_dirty());
        assert!(d.viewport().is_visible(ChunkKey::new(0, 0)));
        assert_eq!(d.renderer().frames(), 1);
    }

    #[test]
    fn clean_tick_refreshes_only_active_actors() {
        let mut d = driver();
        initialize(
            &mut d,
            vec![
                walker(),
                Actor::new(ActorId::new("idle"), "PERSON", "Idle", Pose::new(400.0, 400.0, 0.0)),
            ],
        );
        d.configure(0.0);
        d.tick(0.0, 0.0);

        let report = d.tick(2.0, 16.0);
        assert!(report.layout.is_none());
        assert!(report.view_target.is_none());
        assert_eq!(report.actors.visited, 1);
        assert_eq!(d.renderer().actor(&ActorId::new("w")).unwrap().placement.x, 520.0);
    }

    #[test]
    fn settled_actors_stop_being_refreshed() {
        let mut d = driver();
        initialize(&mut d, vec![walker()]);
        d.configure(0.0);
        d.tick(0.0, 0.0);

        let report = d.tick(11.0, 16.0);
        assert_eq!(report.actors.settled, 1);
        let report = d.tick(12.0, 32.0);
        assert_eq!(report.actors.visited, 0);
        assert_eq!(d.renderer().frames(), 3);
    }

    #[test]
    fn update_with_actors_forces_full_refresh() {
        let mut d = driver();
        initialize(&mut d, vec![]);
        d.configure(0.0);
        d.tick(0.0, 0.0);

        d.apply(ServerMsg::Update(SimulationUpdate {
            clock: SimulationClock::new(0.0, 0.0, 1.0),
            updated_actors: vec![walker()],
        }));
        let report = d.tick(1.0, 16.0);
        assert!(report.layout.is_some());
        assert_eq!(report.actors.shown, 1);
        assert_eq!(d.renderer().actor_count(), 1);
    }

    #[test]
    fn resize_triggers_layout() {
        let mut d = driver();
        initialize(&mut d, vec![]);
        d.configure(0.0);
        d.tick(0.0, 0.0);

        d.resize(2000, 1000);
        assert_eq!(d.renderer().size(), (2000, 1000));
        let report = d.tick(1.0, 16.0);
        let layout = report.layout.expect("layout after resize");
        assert!(layout.visible > 1);
    }
}
