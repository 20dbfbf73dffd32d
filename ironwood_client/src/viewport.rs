//! Viewport window.
//!
//! Maps the continuous view (focal point + zoom) onto the discrete chunk grid
//! and keeps the renderer's attached chunks in sync with what covers the
//! surface. Layout diffs against the previously visible set instead of
//! rebuilding it, and chunk drawables are built lazily and cached for the
//! rest of the session.

use std::collections::{BTreeSet, HashSet};

use ironwood_shared::{
    config::{BoundaryPolicy, WorldGrid},
    render::{ChunkKey, ChunkPlacement, RenderBackend},
};
use tracing::{debug, warn};

use crate::session::{RenderSurface, ViewState};

/// What one layout pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
    pub attached: usize,
    pub detached: usize,
    pub visible: usize,
    /// Chunk drawables built for the first time.
    pub created: usize,
}

/// Maps a raw grid coordinate to a canonical chunk key, or `None` when the
/// policy leaves that cell empty.
pub fn resolve_chunk(
    boundary: BoundaryPolicy,
    raw_x: i64,
    raw_y: i64,
    grid: &WorldGrid,
) -> Option<ChunkKey> {
    let columns = grid.chunk_columns as i64;
    let rows = grid.chunk_rows as i64;
    if columns == 0 || rows == 0 {
        return None;
    }
    match boundary {
        BoundaryPolicy::Wrap => Some(ChunkKey::new(
            raw_x.rem_euclid(columns) as u32,
            raw_y.rem_euclid(rows) as u32,
        )),
        BoundaryPolicy::Clamp => {
            if raw_x < 0 || raw_x >= columns || raw_y < 0 || raw_y >= rows {
                return None;
            }
            Some(ChunkKey::new(raw_x as u32, raw_y as u32))
        }
    }
}

/// Chunk span along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisSpan {
    /// Chunk containing the focal point.
    view_chunk: i64,
    /// Screen coordinate of that chunk's leading edge.
    anchor: f64,
    /// Chunks needed before the anchor chunk.
    prefix: i64,
    /// Chunks needed after the anchor chunk.
    suffix: i64,
}

impl AxisSpan {
    fn compute(view: f64, scale: f64, chunk_size: f64, extent: f64) -> Self {
        let scaled = chunk_size * scale;
        let offset = (view * scale).rem_euclid(scaled);
        let anchor = extent / 2.0 - offset;
        Self {
            view_chunk: (view / chunk_size).floor() as i64,
            anchor,
            prefix: (anchor.max(0.0) / scaled).ceil() as i64,
            suffix: ((extent - anchor - scaled).max(0.0) / scaled).ceil() as i64,
        }
    }

    fn count(&self) -> i64 {
        self.prefix + self.suffix + 1
    }

    /// Raw grid coordinate of step `i` of the span.
    fn raw(&self, i: i64) -> i64 {
        i + self.view_chunk - self.prefix
    }

    /// Screen coordinate of step `i` of the span.
    fn screen(&self, i: i64, scaled: f64) -> f64 {
        self.anchor - (self.prefix - i) as f64 * scaled
    }
}

#[derive(Debug)]
pub struct ViewportWindow {
    boundary: BoundaryPolicy,
    visible: BTreeSet<ChunkKey>,
    created: HashSet<ChunkKey>,
}

impl ViewportWindow {
    pub fn new(boundary: BoundaryPolicy) -> Self {
        Self {
            boundary,
            visible: BTreeSet::new(),
            created: HashSet::new(),
        }
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Chunks currently attached to the surface.
    pub fn visible(&self) -> &BTreeSet<ChunkKey> {
        &self.visible
    }

    pub fn is_visible(&self, key: ChunkKey) -> bool {
        self.visible.contains(&key)
    }

    /// Number of chunk drawables built so far.
    pub fn cached(&self) -> usize {
        self.created.len()
    }

    /// Full layout: recomputes the covering chunk rectangle, attaches newly
    /// visible chunks, re-places every visible chunk and detaches the rest.
    pub fn layout<R: RenderBackend + ?Sized>(
        &mut self,
        grid: &WorldGrid,
        view: &ViewState,
        surface: RenderSurface,
        renderer: &mut R,
    ) -> LayoutStats {
        let scale = view.scale();
        let scaled = grid.chunk_size * scale;
        let focus = view.position();
        if !(scaled.is_finite() && scaled > 0.0) || !focus.is_finite() {
            warn!(
                chunk_size = grid.chunk_size,
                scale,
                x = focus.x,
                y = focus.y,
                "Skipping layout for degenerate view"
            );
            return LayoutStats {
                visible: self.visible.len(),
                ..LayoutStats::default()
            };
        }

        let cols = AxisSpan::compute(focus.x, scale, grid.chunk_size, surface.width as f64);
        let rows = AxisSpan::compute(focus.y, scale, grid.chunk_size, surface.height as f64);

        let mut stats = LayoutStats::default();
        let mut touched = BTreeSet::new();
        for j in 0..rows.count() {
            for i in 0..cols.count() {
                let Some(key) = resolve_chunk(self.boundary, cols.raw(i), rows.raw(j), grid)
                else {
                    continue;
                };

                if self.created.insert(key) {
                    renderer.create_chunk(key, grid.chunk_size);
                    stats.created += 1;
                }
                if !self.visible.contains(&key) && !touched.contains(&key) {
                    renderer.attach_chunk(key);
                    stats.attached += 1;
                }
                renderer.place_chunk(
                    key,
                    ChunkPlacement {
                        x: cols.screen(i, scaled),
                        y: rows.screen(j, scaled),
                        scale,
                    },
                );
                touched.insert(key);
            }
        }

        for key in self.visible.difference(&touched) {
            renderer.detach_chunk(*key);
            stats.detached += 1;
        }
        self.visible = touched;
        stats.visible = self.visible.len();

        debug!(
            attached = stats.attached,
            detached = stats.detached,
            visible = stats.visible,
            "Viewport layout"
        );
        stats
    }
}
