//! Simulation clock.
//!
//! The server owns simulation time. Each snapshot carries the simulation time
//! at capture, the wall-clock instant it was captured and a time velocity
//! (simulation seconds per wall second, 0 when the world is paused). The
//! client extrapolates from the last capture until the next snapshot replaces
//! the whole clock.

use serde::{Deserialize, Serialize};

/// Last known simulation clock. All times are seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulationClock {
    /// Simulation time reported by the server.
    pub last_known_sim_time: f64,
    /// Wall-clock time the simulation time was captured at.
    pub captured_at_wall: f64,
    /// Simulation time speed multiplier.
    pub velocity: f64,
}

impl SimulationClock {
    pub const fn new(last_known_sim_time: f64, captured_at_wall: f64, velocity: f64) -> Self {
        Self {
            last_known_sim_time,
            captured_at_wall,
            velocity,
        }
    }

    /// Translates a wall-clock timestamp into simulation time.
    ///
    /// Zero velocity yields a constant; negative velocity runs backwards.
    /// Malformed (NaN) inputs propagate into the result.
    pub fn sim_time_at(&self, now_wall: f64) -> f64 {
        self.last_known_sim_time + (now_wall - self.captured_at_wall) * self.velocity
    }

    pub fn is_paused(&self) -> bool {
        self.velocity == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_at_capture_returns_last_known() {
        let clock = SimulationClock::new(1_000.0, 50.0, 2.0);
        assert_eq!(clock.sim_time_at(50.0), 1_000.0);
    }

    #[test]
    fn clock_is_strictly_increasing_with_positive_velocity() {
        let clock = SimulationClock::new(100.0, 10.0, 0.25);
        let mut prev = clock.sim_time_at(0.0);
        for step in 1..200 {
            let now = clock.sim_time_at(step as f64 * 0.5);
            assert!(now > prev, "step {step}: {now} <= {prev}");
            prev = now;
        }
    }

    #[test]
    fn paused_clock_is_constant() {
        let clock = SimulationClock::new(42.0, 10.0, 0.0);
        assert!(clock.is_paused());
        assert_eq!(clock.sim_time_at(10.0), 42.0);
        assert_eq!(clock.sim_time_at(1_000_000.0), 42.0);
        assert_eq!(clock.sim_time_at(-5.0), 42.0);
    }

    #[test]
    fn negative_velocity_does_not_panic() {
        let clock = SimulationClock::new(10.0, 0.0, -1.0);
        assert_eq!(clock.sim_time_at(4.0), 6.0);
    }

    #[test]
    fn nan_propagates() {
        let clock = SimulationClock::new(f64::NAN, 0.0, 1.0);
        assert!(clock.sim_time_at(1.0).is_nan());
    }
}
