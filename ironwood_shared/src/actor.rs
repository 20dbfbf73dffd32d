//! Actors and their scheduled actions.
//!
//! An actor has a resting [`Pose`] plus a queue of server-scheduled actions.
//! Actions stay in the queue, in the order the server sent them, until their
//! finish time has passed; then their terminal effect is folded into the pose.
//!
//! An action is in flight while `now <= finish_at`. Retirement therefore uses
//! a strict `finish_at < now`, and an action queried exactly at its finish
//! time still interpolates (to its end point).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::Vec2;

/// Stable server-assigned actor identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        ActorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resting state of an actor absent any in-flight action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Radians.
    pub bearing: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, bearing: f64) -> Self {
        Self { x, y, bearing }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Vision cone. Only the renderer reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vision {
    /// Field of view in radians.
    pub fov: f64,
    pub range: f64,
}

/// What an action does.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Move {
        from_x: f64,
        from_y: f64,
        to_x: Option<f64>,
        to_y: Option<f64>,
    },
    Rotate {
        /// Signed radians applied over the action window.
        delta: f64,
        to_bearing: Option<f64>,
    },
    /// An action type this client does not know. It is retired like any
    /// other action but never interpolated and leaves the pose alone.
    Other(String),
}

/// A scheduled, time-bounded action. Times are simulation seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub start_at: f64,
    pub finish_at: f64,
}

impl Action {
    pub fn moving(start_at: f64, finish_at: f64, from: Vec2, to: Vec2) -> Self {
        Self {
            kind: ActionKind::Move {
                from_x: from.x,
                from_y: from.y,
                to_x: Some(to.x),
                to_y: Some(to.y),
            },
            start_at,
            finish_at,
        }
    }

    pub fn rotating(start_at: f64, finish_at: f64, delta: f64, to_bearing: Option<f64>) -> Self {
        Self {
            kind: ActionKind::Rotate { delta, to_bearing },
            start_at,
            finish_at,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self.kind, ActionKind::Move { .. })
    }

    pub fn is_rotate(&self) -> bool {
        matches!(self.kind, ActionKind::Rotate { .. })
    }

    /// True while the action still contributes to interpolation.
    pub fn in_flight(&self, now_sim: f64) -> bool {
        self.finish_at >= now_sim
    }

    /// True once the action can be folded into the resting pose.
    pub fn expired(&self, now_sim: f64) -> bool {
        self.finish_at < now_sim
    }

    /// Fraction of the action window elapsed at `now_sim`.
    ///
    /// Not clamped: a value outside `[0, 1]` means client and server clocks
    /// disagree, and is passed through as-is. A zero-length window counts as
    /// complete.
    pub fn progress(&self, now_sim: f64) -> f64 {
        let span = self.finish_at - self.start_at;
        if span <= 0.0 {
            return 1.0;
        }
        let progress = (now_sim - self.start_at) / span;
        if !(0.0..=1.0).contains(&progress) {
            debug!(
                progress,
                start_at = self.start_at,
                finish_at = self.finish_at,
                now_sim,
                "Action progress out of range"
            );
        }
        progress
    }

    /// Folds the terminal effect of this action into `pose`.
    fn apply_terminal(&self, pose: &mut Pose) {
        match self.kind {
            ActionKind::Move { to_x, to_y, .. } => {
                pose.x = to_x.unwrap_or(pose.x);
                pose.y = to_y.unwrap_or(pose.y);
            }
            ActionKind::Rotate { to_bearing, .. } => {
                pose.bearing = to_bearing.unwrap_or(pose.bearing);
            }
            ActionKind::Other(_) => {}
        }
    }
}

/// A server-authoritative actor mirrored on the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    /// Server-side actor type, e.g. `"PERSON"`.
    pub kind: String,
    pub name: String,
    pub pose: Pose,
    pub vision: Vision,
    pub actions: Vec<Action>,
}

impl Actor {
    pub fn new(id: ActorId, kind: impl Into<String>, name: impl Into<String>, pose: Pose) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: name.into(),
            pose,
            vision: Vision::default(),
            actions: Vec::new(),
        }
    }

    pub fn with_vision(mut self, vision: Vision) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Removes every expired action, folding each into the resting pose.
    ///
    /// Scans back to front so removal by index stays stable. Returns whether
    /// any actions remain.
    pub fn retire_expired(&mut self, now_sim: f64) -> bool {
        for index in (0..self.actions.len()).rev() {
            if self.actions[index].expired(now_sim) {
                let action = self.actions.remove(index);
                action.apply_terminal(&mut self.pose);
            }
        }
        self.has_actions()
    }

    /// World position at `now_sim`: the first in-flight move, else the pose.
    pub fn position_at(&self, now_sim: f64) -> Vec2 {
        for action in &self.actions {
            if !action.in_flight(now_sim) {
                continue;
            }
            if let ActionKind::Move {
                from_x,
                from_y,
                to_x,
                to_y,
            } = action.kind
            {
                let from = Vec2::new(from_x, from_y);
                // A missing target component means no motion along that axis.
                let to = Vec2::new(to_x.unwrap_or(from_x), to_y.unwrap_or(from_y));
                return from.lerp(to, action.progress(now_sim));
            }
        }
        self.pose.position()
    }

    /// Bearing at `now_sim`: the first in-flight rotation, else the pose.
    pub fn azimuth_at(&self, now_sim: f64) -> f64 {
        for action in &self.actions {
            if !action.in_flight(now_sim) {
                continue;
            }
            if let ActionKind::Rotate { delta, .. } = action.kind {
                return self.pose.bearing + delta * action.progress(now_sim);
            }
        }
        self.pose.bearing
    }
}
