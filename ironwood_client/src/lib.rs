//! `ironwood_client`
//!
//! Client-side systems:
//! - Session state machine and view control
//! - Actor directory with interpolated placement
//! - Chunk viewport windowing over the world grid
//! - Per-frame synchronization driver
//! - Connection management and view target propagation

pub mod client;
pub mod directory;
pub mod driver;
pub mod input;
pub mod session;
pub mod viewport;

pub use client::GameClient;
pub use driver::SyncDriver;
