//! Actor directory.
//!
//! Owns every actor known to the session, keyed by id, plus the set of actors
//! with pending actions. Only active actors are revisited on frames where the
//! view did not move.

use std::collections::{BTreeMap, BTreeSet};

use ironwood_shared::{
    actor::{Actor, ActorId},
    event::EventQueue,
    render::{ActorPlacement, RenderBackend},
};
use tracing::{debug, error};

use crate::session::{RenderSurface, SessionEvent, ViewState};

/// Counters from one [`ActorDirectory::refresh`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStats {
    pub visited: usize,
    pub shown: usize,
    pub hidden: usize,
    /// Actors that ran out of actions and left the active set.
    pub settled: usize,
    /// Actors without a drawable.
    pub desynced: usize,
}

#[derive(Debug, Default)]
pub struct ActorDirectory {
    actors: BTreeMap<ActorId, Actor>,
    active: BTreeSet<ActorId>,
}

impl ActorDirectory {
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn get(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ActorId> {
        self.actors.keys()
    }

    pub fn is_active(&self, id: &ActorId) -> bool {
        self.active.contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Registers every actor of the initial snapshot.
    pub fn apply_initialize(&mut self, actors: Vec<Actor>, events: &mut EventQueue<SessionEvent>) {
        for actor in actors {
            let id = actor.id.clone();
            if actor.has_actions() {
                self.active.insert(id.clone());
            }
            self.actors.insert(id.clone(), actor);
            events.push(SessionEvent::ActorAdded(id));
        }
    }

    /// Registers new actors and replaces known ones wholesale.
    pub fn apply_update(&mut self, actors: Vec<Actor>, events: &mut EventQueue<SessionEvent>) {
        for actor in actors {
            let id = actor.id.clone();
            let has_actions = actor.has_actions();
            let event = match self.actors.insert(id.clone(), actor) {
                Some(_) => SessionEvent::ActorUpdated(id.clone()),
                None => SessionEvent::ActorAdded(id.clone()),
            };
            events.push(event);
            if has_actions {
                self.active.insert(id);
            }
        }
    }

    /// Retires expired actions and re-places drawables at `now_sim`.
    ///
    /// `all` visits every known actor, otherwise only active ones. A missing
    /// drawable is logged and skipped.
    pub fn refresh<R: RenderBackend + ?Sized>(
        &mut self,
        all: bool,
        now_sim: f64,
        view: &ViewState,
        surface: RenderSurface,
        renderer: &mut R,
    ) -> RefreshStats {
        let ids: Vec<ActorId> = if all {
            self.actors.keys().cloned().collect()
        } else {
            self.active.iter().cloned().collect()
        };

        let center = surface.center();
        let mut stats = RefreshStats::default();
        for id in ids {
            let Some(actor) = self.actors.get_mut(&id) else {
                error!(actor = %id, "Active actor missing from directory");
                self.active.remove(&id);
                continue;
            };
            stats.visited += 1;

            if !actor.retire_expired(now_sim) && self.active.remove(&id) {
                debug!(actor = %id, "Actor settled");
                stats.settled += 1;
            }

            let screen = center + (actor.position_at(now_sim) - view.position()) * view.scale();
            let placement = surface.contains(screen).then(|| ActorPlacement {
                x: screen.x,
                y: screen.y,
                scale: view.scale(),
                rotation: actor.azimuth_at(now_sim),
            });
            let visible = placement.is_some();

            match renderer.place_actor(&id, placement) {
                Ok(()) if visible => stats.shown += 1,
                Ok(()) => stats.hidden += 1,
                Err(e) => {
                    error!(actor = %id, error = %e, "Unknown actor or drawable not added, can't render");
                    stats.desynced += 1;
                }
            }
        }
        stats
    }
}
