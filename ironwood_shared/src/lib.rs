//! `ironwood_shared`
//!
//! Libraries shared by the client and its tooling.
//!
//! Design goals:
//! - Deterministic and free of wall-clock reads; callers pass time in.
//! - Strict decoding at the network boundary, plain domain types inside.
//! - Traits at the renderer seam so the engine runs headless.
//! - No `unsafe`.

pub mod actor;
pub mod clock;
pub mod config;
pub mod event;
pub mod math;
pub mod net;
pub mod render;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::actor::*;
    pub use crate::clock::*;
    pub use crate::config::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::render::*;
}
