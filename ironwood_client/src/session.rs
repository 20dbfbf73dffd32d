//! Session state.
//!
//! Everything the client knows about the remote world lives in one owned
//! [`Session`]: the world grid, the simulation clock, the actor directory, the
//! view and the render surface. Message handlers mutate it between frames and
//! queue [`SessionEvent`]s for the driver to drain on the next tick.

use ironwood_shared::{
    actor::ActorId,
    clock::SimulationClock,
    config::{BoundaryPolicy, ClientConfig, WorldGrid},
    event::EventQueue,
    math::Vec2,
    net::{Initialize, ServerMsg, SimulationUpdate, WorldMetadata},
};
use tracing::{debug, info};

use crate::directory::ActorDirectory;

/// Client lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting for the world metadata.
    PendingMetadata,
    /// Waiting for the renderer to load its assets.
    PendingAssets,
    /// Waiting for the initial snapshot and render setup.
    PendingInitialize,
    Running,
}

/// Notifications for the driver, delivered in push order once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ActorAdded(ActorId),
    ActorUpdated(ActorId),
    StatusChanged(Status),
}

/// Zoom limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 8.0,
            step: 0.5,
        }
    }
}

/// Pan/zoom state of the camera.
///
/// Every change sets `dirty`; the driver clears it after a full re-layout.
/// Input between ticks is coalesced since only the current value is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    x: f64,
    y: f64,
    scale: f64,
    dirty: bool,
    limits: ScaleLimits,
    boundary: BoundaryPolicy,
    /// World extent the focal point is kept inside.
    extent: Vec2,
}

impl ViewState {
    pub fn new(limits: ScaleLimits, boundary: BoundaryPolicy, grid: &WorldGrid) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: limits.min,
            dirty: true,
            limits,
            boundary,
            extent: Vec2::new(grid.width(), grid.height()),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Moves the focal point, clamped into the world or wrapped around it.
    pub fn set_target(&mut self, x: f64, y: f64) {
        self.x = bound(x, self.extent.x, self.boundary);
        self.y = bound(y, self.extent.y, self.boundary);
        self.dirty = true;
    }

    /// Pans by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.set_target(self.x + dx / self.scale, self.y + dy / self.scale);
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(self.limits.min, self.limits.max);
        self.dirty = true;
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + self.limits.step);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - self.limits.step);
    }

    /// Adopts a new world extent and re-bounds the focal point.
    pub fn set_world(&mut self, grid: &WorldGrid) {
        self.extent = Vec2::new(grid.width(), grid.height());
        self.set_target(self.x, self.y);
    }
}

fn bound(value: f64, extent: f64, boundary: BoundaryPolicy) -> f64 {
    match boundary {
        BoundaryPolicy::Clamp => value.clamp(0.0, extent),
        BoundaryPolicy::Wrap if extent > 0.0 => value.rem_euclid(extent),
        BoundaryPolicy::Wrap => 0.0,
    }
}

/// Pixel size of the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSurface {
    pub width: u32,
    pub height: u32,
}

impl RenderSurface {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Strictly inside the surface, edges excluded.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x > 0.0
            && point.y > 0.0
            && point.x < self.width as f64
            && point.y < self.height as f64
    }
}

/// Explicitly owned client state.
#[derive(Debug)]
pub struct Session {
    status: Status,
    metadata: Option<WorldMetadata>,
    grid: WorldGrid,
    clock: Option<SimulationClock>,
    pub actors: ActorDirectory,
    pub view: ViewState,
    surface: RenderSurface,
    assets_loaded: bool,
    render_initialized: bool,
    events: EventQueue<SessionEvent>,
}

impl Session {
    pub fn new(cfg: &ClientConfig) -> Self {
        let limits = ScaleLimits {
            min: cfg.min_scale,
            max: cfg.max_scale,
            step: cfg.scale_step,
        };
        Self {
            status: Status::PendingMetadata,
            metadata: None,
            grid: cfg.world.clone(),
            clock: None,
            actors: ActorDirectory::default(),
            view: ViewState::new(limits, cfg.boundary, &cfg.world),
            surface: RenderSurface {
                width: cfg.surface_width,
                height: cfg.surface_height,
            },
            assets_loaded: false,
            render_initialized: false,
            events: EventQueue::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn metadata(&self) -> Option<&WorldMetadata> {
        self.metadata.as_ref()
    }

    pub fn clock(&self) -> Option<&SimulationClock> {
        self.clock.as_ref()
    }

    pub fn surface(&self) -> RenderSurface {
        self.surface
    }

    pub fn assets_loaded(&self) -> bool {
        self.assets_loaded
    }

    /// Simulation time at `now_wall`, once a snapshot has installed a clock.
    pub fn sim_time(&self, now_wall: f64) -> Option<f64> {
        self.clock.map(|clock| clock.sim_time_at(now_wall))
    }

    /// Applies one decoded server message.
    pub fn apply(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Metadata(metadata) => self.set_metadata(metadata),
            ServerMsg::Initialize(init) => self.initialize(init),
            ServerMsg::Update(update) => self.update(update),
            ServerMsg::Disconnect { reason } => {
                info!(reason = %reason, "Server closed the session");
            }
        }
    }

    pub fn set_metadata(&mut self, metadata: WorldMetadata) {
        info!(
            seed = %metadata.seed,
            chunk_size = metadata.grid.chunk_size,
            columns = metadata.grid.chunk_columns,
            rows = metadata.grid.chunk_rows,
            "World metadata received"
        );
        self.grid = metadata.grid.clone();
        self.view.set_world(&self.grid);
        self.metadata = Some(metadata);
        self.update_status();
    }

    /// Installs the initial snapshot: view focal point, clock and actors.
    pub fn initialize(&mut self, init: Initialize) {
        info!(
            actors = init.actors.len(),
            sim_time = init.clock.last_known_sim_time,
            velocity = init.clock.velocity,
            "Simulation initialized"
        );
        self.view.set_target(init.view.x, init.view.y);
        self.clock = Some(init.clock);
        self.actors.apply_initialize(init.actors, &mut self.events);
        self.update_status();
    }

    /// Replaces the clock and merges changed actors.
    pub fn update(&mut self, update: SimulationUpdate) {
        self.clock = Some(update.clock);
        if update.updated_actors.is_empty() {
            return;
        }
        debug!(actors = update.updated_actors.len(), "Simulation update");
        self.actors
            .apply_update(update.updated_actors, &mut self.events);
        self.view.mark_dirty();
    }

    pub fn set_assets_loaded(&mut self) {
        self.assets_loaded = true;
        self.update_status();
    }

    pub fn set_render_initialized(&mut self) {
        self.render_initialized = true;
        self.update_status();
    }

    /// The render surface changed size; the next tick re-lays out.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = RenderSurface { width, height };
        self.view.mark_dirty();
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    fn determine_status(&self) -> Status {
        if self.metadata.is_none() {
            return Status::PendingMetadata;
        }
        if !self.assets_loaded {
            return Status::PendingAssets;
        }
        if !self.render_initialized || self.clock.is_none() {
            return Status::PendingInitialize;
        }
        Status::Running
    }

    fn update_status(&mut self) {
        let status = self.determine_status();
        if status != self.status {
            debug!(from = ?self.status, to = ?status, "Status transition");
            self.status = status;
            self.events.push(SessionEvent::StatusChanged(status));
        }
    }
}
