//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend.
//! The sync engine drives a [`RenderBackend`]: chunk drawables are created
//! lazily, attached/detached as they scroll in and out of view and placed in
//! screen space; actor drawables are placed or hidden every refresh.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::actor::{Actor, ActorId, Vision};

/// Canonical chunk coordinates inside the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub x: u32,
    pub y: u32,
}

impl ChunkKey {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Screen-space placement of a chunk (top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChunkPlacement {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

/// Screen-space placement of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActorPlacement {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    /// Radians.
    pub rotation: f64,
}

/// Renderer-side failures the sync engine reports but survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No drawable was materialized for this actor.
    UnknownActor(ActorId),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownActor(id) => write!(f, "no drawable for actor {id}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// A minimal rendering API.
pub trait RenderBackend: Send {
    /// Builds the drawable for a chunk. Called once per key.
    fn create_chunk(&mut self, key: ChunkKey, chunk_size: f64);
    fn attach_chunk(&mut self, key: ChunkKey);
    fn detach_chunk(&mut self, key: ChunkKey);
    fn place_chunk(&mut self, key: ChunkKey, placement: ChunkPlacement);

    /// Materializes a drawable for a newly known actor.
    fn add_actor(&mut self, actor: &Actor);
    /// The actor record was replaced by the server.
    fn update_actor(&mut self, actor: &Actor);
    /// Shows the actor at `placement`, or hides it when `None`.
    fn place_actor(
        &mut self,
        id: &ActorId,
        placement: Option<ActorPlacement>,
    ) -> Result<(), RenderError>;

    fn resize(&mut self, width: u32, height: u32);
    fn present(&mut self, render_time: f64);
}

/// Drawable state kept by [`HeadlessRenderer`] for one actor.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorSprite {
    pub name: String,
    pub vision: Vision,
    pub visible: bool,
    pub placement: ActorPlacement,
}

/// A renderer that only records scene state. Used by the headless client
/// and by tests.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    created: BTreeSet<ChunkKey>,
    attached: BTreeSet<ChunkKey>,
    chunk_placements: HashMap<ChunkKey, ChunkPlacement>,
    actors: BTreeMap<ActorId, ActorSprite>,
    width: u32,
    height: u32,
    frames: u64,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Chunks currently attached to the scene.
    pub fn attached_chunks(&self) -> &BTreeSet<ChunkKey> {
        &self.attached
    }

    /// Every chunk drawable ever built.
    pub fn created_chunks(&self) -> &BTreeSet<ChunkKey> {
        &self.created
    }

    pub fn chunk_placement(&self, key: ChunkKey) -> Option<ChunkPlacement> {
        self.chunk_placements.get(&key).copied()
    }

    pub fn actor(&self, id: &ActorId) -> Option<&ActorSprite> {
        self.actors.get(id)
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderBackend for HeadlessRenderer {
    fn create_chunk(&mut self, key: ChunkKey, _chunk_size: f64) {
        self.created.insert(key);
    }

    fn attach_chunk(&mut self, key: ChunkKey) {
        self.attached.insert(key);
    }

    fn detach_chunk(&mut self, key: ChunkKey) {
        self.attached.remove(&key);
    }

    fn place_chunk(&mut self, key: ChunkKey, placement: ChunkPlacement) {
        self.chunk_placements.insert(key, placement);
    }

    fn add_actor(&mut self, actor: &Actor) {
        self.actors
            .entry(actor.id.clone())
            .or_insert_with(|| ActorSprite {
                name: actor.name.clone(),
                vision: actor.vision,
                visible: false,
                placement: ActorPlacement::default(),
            });
    }

    fn update_actor(&mut self, actor: &Actor) {
        if let Some(sprite) = self.actors.get_mut(&actor.id) {
            sprite.name = actor.name.clone();
            sprite.vision = actor.vision;
        }
    }

    fn place_actor(
        &mut self,
        id: &ActorId,
        placement: Option<ActorPlacement>,
    ) -> Result<(), RenderError> {
        let sprite = self
            .actors
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownActor(id.clone()))?;
        match placement {
            Some(p) => {
                sprite.visible = true;
                sprite.placement = p;
            }
            None => sprite.visible = false,
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn present(&mut self, _render_time: f64) {
        self.frames += 1;
    }
}
