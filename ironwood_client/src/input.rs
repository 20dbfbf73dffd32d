//! Input handling.
//!
//! Translates pointer and wheel events into view changes: dragging with the
//! primary button pans, the wheel zooms. Events only mutate [`ViewState`];
//! several events between two ticks collapse into one re-layout.

use crate::session::ViewState;

/// Raw pointer/wheel input, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    /// Pointer left the surface or the gesture was cancelled.
    PointerCancel,
    /// Positive `delta_y` zooms out, negative zooms in.
    Scroll { delta_y: f64 },
}

/// What an input event amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputOutcome {
    None,
    ViewChanged,
    /// Press and release at the same pixel.
    Click { x: f64, y: f64 },
}

/// Drag tracking state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerState {
    pub primary_down: bool,
    pub start: (f64, f64),
    pub last: (f64, f64),
}

impl PointerState {
    pub fn handle(&mut self, event: InputEvent, view: &mut ViewState) -> InputOutcome {
        match event {
            InputEvent::PointerDown { x, y } => {
                let p = (x.round(), y.round());
                self.primary_down = true;
                self.start = p;
                self.last = p;
                InputOutcome::None
            }
            InputEvent::PointerMove { x, y } => {
                if !self.primary_down {
                    return InputOutcome::None;
                }
                let p = (x.round(), y.round());
                // Dragging right moves the focal point left.
                let (dx, dy) = (self.last.0 - p.0, self.last.1 - p.1);
                self.last = p;
                view.pan(dx, dy);
                InputOutcome::ViewChanged
            }
            InputEvent::PointerUp { x, y } => {
                if !self.primary_down {
                    return InputOutcome::None;
                }
                self.primary_down = false;
                self.last = (x.round(), y.round());
                if self.last == self.start {
                    InputOutcome::Click {
                        x: self.last.0,
                        y: self.last.1,
                    }
                } else {
                    InputOutcome::None
                }
            }
            InputEvent::PointerCancel => {
                self.primary_down = false;
                InputOutcome::None
            }
            InputEvent::Scroll { delta_y } => {
                if delta_y > 0.0 {
                    view.zoom_out();
                } else if delta_y < 0.0 {
                    view.zoom_in();
                } else {
                    return InputOutcome::None;
                }
                InputOutcome::ViewChanged
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ironwood_shared::{
        config::{BoundaryPolicy, WorldGrid},
        math::Vec2,
    };

    use super::*;
    use crate::session::ScaleLimits;

    fn view() -> ViewState {
        let mut view = ViewState::new(ScaleLimits::default(), BoundaryPolicy::Clamp, &WorldGrid::default());
        view.set_target(5000.0, 5000.0);
        view.clear_dirty();
        view
    }

    #[test]
    fn drag_pans_opposite_to_pointer() {
        let mut view = view();
        let mut pointer = PointerState::default();
        pointer.handle(InputEvent::PointerDown { x: 100.0, y: 100.0 }, &mut view);
        let outcome = pointer.handle(InputEvent::PointerMove { x: 130.0, y: 90.0 }, &mut view);
        assert_eq!(outcome, InputOutcome::ViewChanged);
        assert_eq!(view.position(), Vec2::new(4970.0, 5010.0));
        assert!(view.is_dirty());
    }

    #[test]
    fn moves_coalesce_to_last_position() {
        let mut view = view();
        let mut pointer = PointerState::default();
        pointer.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 }, &mut view);
        for step in 1..=10 {
            pointer.handle(InputEvent::PointerMove { x: -(step as f64), y: 0.0 }, &mut view);
        }
        assert_eq!(view.position(), Vec2::new(5010.0, 5000.0));
    }

    #[test]
    fn hover_without_press_does_nothing() {
        let mut view = view();
        let mut pointer = PointerState::default();
        let outcome = pointer.handle(InputEvent::PointerMove { x: 50.0, y: 50.0 }, &mut view);
        assert_eq!(outcome, InputOutcome::None);
        assert!(!view.is_dirty());
    }

    #[test]
    fn press_release_in_place_is_click() {
        let mut view = view();
        let mut pointer = PointerState::default();
        pointer.handle(InputEvent::PointerDown { x: 10.2, y: 20.4 }, &mut view);
        let outcome = pointer.handle(InputEvent::PointerUp { x: 9.8, y: 19.6 }, &mut view);
        assert_eq!(outcome, InputOutcome::Click { x: 10.0, y: 20.0 });
    }

    #[test]
    fn cancel_ends_drag() {
        let mut view = view();
        let mut pointer = PointerState::default();
        pointer.handle(InputEvent::PointerDown { x: 0.0, y: 0.0 }, &mut view);
        pointer.handle(InputEvent::PointerCancel, &mut view);
        pointer.handle(InputEvent::PointerMove { x: 100.0, y: 0.0 }, &mut view);
        assert_eq!(view.position(), Vec2::new(5000.0, 5000.0));
    }

    #[test]
    fn wheel_zooms() {
        let mut view = view();
        let mut pointer = PointerState::default();
        pointer.handle(InputEvent::Scroll { delta_y: -120.0 }, &mut view);
        assert_eq!(view.scale(), 1.5);
        pointer.handle(InputEvent::Scroll { delta_y: 120.0 }, &mut view);
        assert_eq!(view.scale(), 1.0);
        assert_eq!(
            pointer.handle(InputEvent::Scroll { delta_y: 0.0 }, &mut view),
            InputOutcome::None
        );
    }
}
