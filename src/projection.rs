//! World to viewport projection.
//!
//! The classic map window draws the world rotated 45 degrees so the
//! isometric art lines up with the compass. The forward projection is
//! integer shaped: translate to the view center, scale truncating toward
//! zero, then rotate rounding to the nearest tile. The inverse
//! ([`Viewport::screen_to_world`]) is the float approximation the classic
//! window shipped with, 1.41 divisor and all, so hit testing agrees with
//! what players learned to expect.

use glam::IVec2;

use crate::context::FacetTable;
use crate::pack::WorldRect;

/// Magnification steps; `zoom_index` picks a slot.
pub const ZOOM_TABLE: [f32; 10] = [0.125, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 4.0, 6.0, 8.0];
/// zoom table slot of a fresh viewport (factor 1.0)
pub const DEFAULT_ZOOM_INDEX: usize = 4;
/// window border around the map content, in pixels
pub const MAP_BORDER: i32 = 4;
/// rendered edge of marker and entity dots, in pixels
pub const DOT_SIZE: i32 = 4;
pub const DOT_SIZE_HALF: i32 = DOT_SIZE / 2;

/// The map window's view of the world: which facet, which world point sits
/// at the center, how far zoomed and whether the 45 degree flip is on.
///
/// Screen coordinates are window relative: `(0, 0)` is the window's top
/// left corner, the map content starts at `(MAP_BORDER, MAP_BORDER)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    /// world position at the middle of the window
    pub center: IVec2,
    pub zoom_index: usize,
    /// rotate the view 45 degrees, aligning it with the game camera
    pub flip: bool,
    /// active facet
    pub map_id: i32,
    /// full window size including the border
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn zoom(&self) -> f32 {
        // tolerate an out of range index from a hand edited settings file
        ZOOM_TABLE[self.zoom_index.min(ZOOM_TABLE.len() - 1)]
    }

    pub fn zoom_in(&mut self) {
        self.zoom_index = (self.zoom_index + 1).min(ZOOM_TABLE.len() - 1);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_index = self.zoom_index.saturating_sub(1);
    }

    pub fn content_size(&self) -> IVec2 {
        IVec2::new(
            self.width - 2 * MAP_BORDER,
            self.height - 2 * MAP_BORDER,
        )
    }

    pub fn half_extents(&self) -> IVec2 {
        let content = self.content_size();
        IVec2::new(content.x >> 1, content.y >> 1)
    }

    /// Projected offset of a world point from the window center, before
    /// translation into window space. Entity clamping works in this space.
    pub(crate) fn project_offset(&self, world: IVec2) -> IVec2 {
        rotate_scaled(world - self.center, self.zoom(), 1, self.flip)
    }

    /// Project a world point into window coordinates.
    pub fn world_to_screen(&self, world: IVec2) -> IVec2 {
        self.project_offset(world) + self.half_extents() + IVec2::splat(MAP_BORDER)
    }

    /// Approximate inverse of [`Self::world_to_screen`], mapping a window
    /// position back to a world tile.
    ///
    /// This is the classic single precision computation: the flip branch
    /// divides by 1.41 instead of sqrt(2) and feeds each freshly truncated
    /// value into the next line, so the result can be off by a couple of
    /// tiles from the exact inverse. Close enough to pick a tile under the
    /// cursor, and every goto and marker placement players calibrated
    /// against it.
    pub fn screen_to_world(&self, screen: IVec2) -> IVec2 {
        let zoom = self.zoom();
        let mut view_w = self.width as f32 / zoom;
        let mut view_h = self.height as f32 / zoom;
        let mut x = screen.x as f32 / zoom;
        let mut y = screen.y as f32 / zoom;
        if self.flip {
            view_w = ((view_w + view_h) / 1.41) as i32 as f32;
            view_h = ((view_h - view_w) / 1.41) as i32 as f32;
            x = ((x + y) / 1.41) as i32 as f32;
            y = ((y - x) / 1.41) as i32 as f32;
        }
        IVec2::new(
            self.center.x - (view_w / 2.0) as i32 + x as i32,
            self.center.y - (view_h / 2.0) as i32 + y as i32,
        )
    }

    /// World rectangle currently worth drawing: a square 1.75 content sizes
    /// wide around the center, so rotated corners stay covered. Zones and
    /// the grid prefilter against this.
    pub fn visible_world_rect(&self) -> WorldRect {
        let content = self.content_size();
        let size = (content.x as f32 * 1.75).max(content.y as f32 * 1.75) as i32;
        let size_zoom = (size as f32 / self.zoom()) as i32;
        let half = size_zoom >> 1;
        WorldRect::new(
            self.center.x + 1 - half,
            self.center.y + 1 - half,
            size_zoom,
            size_zoom,
        )
    }

    /// Drag the map: `anchor` is the view center captured when the drag
    /// started, `drag` the pointer travel in window pixels since then. The
    /// center stays inside the current facet.
    pub fn scroll_by(&mut self, anchor: IVec2, drag: IVec2, facets: &FacetTable) {
        let delta = rotate_scaled(drag, 1.0 / self.zoom(), -1, self.flip);
        let bounds = facets.size_of(self.map_id);
        self.center = (anchor - delta).clamp(IVec2::ZERO, bounds);
    }

    pub fn center_on(&mut self, world: IVec2) {
        self.center = world;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: IVec2::ZERO,
            zoom_index: DEFAULT_ZOOM_INDEX,
            flip: true,
            map_id: 0,
            width: 400,
            height: 400,
        }
    }
}

/// Scale a pixel/tile delta (truncating toward zero, like the rest of the
/// window math) and rotate it by `eighth_turns` 45 degree steps when the
/// flip is on.
fn rotate_scaled(delta: IVec2, zoom: f32, eighth_turns: i32, flip: bool) -> IVec2 {
    let x = (delta.x as f32 * zoom) as i32;
    let y = (delta.y as f32 * zoom) as i32;
    if !flip {
        return IVec2::new(x, y);
    }
    let (sin, cos) = (eighth_turns as f64 * std::f64::consts::FRAC_PI_4).sin_cos();
    IVec2::new(
        (cos * x as f64 - sin * y as f64).round() as i32,
        (sin * x as f64 + cos * y as f64).round() as i32,
    )
}

/// Pull a projected offset back onto the edge of the centered box
/// `[-half, +half]`, keeping it on the ray from the center. Entity dots use
/// this so off screen party members hug the window edge in their true
/// direction; lines keep their unclamped endpoints.
pub fn clamp_to_bounds(point: IVec2, half: IVec2) -> IVec2 {
    let half = half.max(IVec2::ZERO);
    let mut x = point.x;
    let mut y = point.y;
    let mut code = outcode(x, y, half);
    while code != 0 {
        let mut cx = x;
        let mut cy = y;
        if code & 1 != 0 {
            cy = half.y;
            if y != 0 {
                cx = x * cy / y;
            }
        } else if code & 2 != 0 {
            cy = -half.y;
            if y != 0 {
                cx = x * cy / y;
            }
        } else if code & 4 != 0 {
            cx = half.x;
            if x != 0 {
                cy = y * cx / x;
            }
        } else {
            cx = -half.x;
            if x != 0 {
                cy = y * cx / x;
            }
        }
        x = cx;
        y = cy;
        code = outcode(x, y, half);
    }
    IVec2::new(x, y)
}

fn outcode(x: i32, y: i32, half: IVec2) -> u8 {
    if y > half.y {
        1
    } else if y < -half.y {
        2
    } else if x > half.x {
        4
    } else if x >= -half.x {
        0
    } else {
        8
    }
}
