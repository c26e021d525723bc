//! Per frame overlay queries.
//!
//! The host calls [`compose_frame`] once per frame with the current viewport
//! and pointer and gets back plain geometry: which zones to fill, which
//! markers to draw as dots or icons, the hover label and the tile grid. What
//! a "draw" means (sprites, vector art, a terminal cell) is the host's
//! business; nothing here touches a GPU.
//!
//! Entities (party members, tracked targets) are positioned one at a time
//! through [`place_entity_dot`] because the host owns that list and its
//! drawing order.

use glam::IVec2;

use crate::context::{OverlayContext, Rgba};
use crate::manager::MarkerManager;
use crate::pack::Marker;
use crate::projection::{clamp_to_bounds, Viewport, DOT_SIZE, DOT_SIZE_HALF, MAP_BORDER};

/// zoom table slot above which marker names are drawn continuously
pub const NAME_ALWAYS_ZOOM_INDEX: usize = 5;
/// the tile grid appears at this zoom factor and beyond
pub const GRID_MIN_ZOOM: f32 = 4.0;
/// world tiles between grid lines
pub const GRID_SKIP: i32 = 8;

/// Draw toggles for a frame. Everything defaults to on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayOptions {
    pub show_markers: bool,
    pub show_marker_names: bool,
    pub show_marker_icons: bool,
    pub show_grid_if_zoomed: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            show_markers: true,
            show_marker_names: true,
            show_marker_icons: true,
            show_grid_if_zoomed: true,
        }
    }
}

/// How one visible marker wants to be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerShape {
    /// small square of the marker's color. The transparent sentinel arrives
    /// here unchanged, so named but dotless spots stay hoverable
    Dot(Rgba),
    /// icon from the registry, centered on the point
    Icon {
        name: String,
        width: u32,
        height: u32,
    },
}

/// One marker that survived facet, zoom and bounds filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerItem {
    /// window position of the marker's center
    pub screen: IVec2,
    pub shape: MarkerShape,
    /// draw the name under the marker continuously (high zoom)
    pub show_name: bool,
    pub marker: Marker,
}

/// A zone polygon projected into window space. Vertices are unclamped; the
/// closing edge back to the first vertex is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneItem {
    pub label: String,
    pub color: Rgba,
    pub points: Vec<IVec2>,
}

/// Text pinned to a window position (the hover label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelItem {
    pub text: String,
    pub anchor: IVec2,
}

/// One frame of overlay geometry, in draw order: zones first, markers above
/// them, hover label on top, grid last. The host draws its entity dots
/// between the markers and the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayFrame {
    pub zones: Vec<ZoneItem>,
    pub markers: Vec<MarkerItem>,
    pub hover: Option<LabelItem>,
    pub grid: Vec<(IVec2, IVec2)>,
}

/// Assemble a full frame. `pointer` is the cursor in window coordinates,
/// `goto_marker` the temporary travel pin if one is active. The goto pin
/// draws even when markers are toggled off and never takes the hover label;
/// when several markers sit under the pointer the last one drawn (topmost)
/// wins the label.
pub fn compose_frame(
    manager: &MarkerManager,
    context: &OverlayContext,
    viewport: &Viewport,
    options: &OverlayOptions,
    pointer: Option<IVec2>,
    goto_marker: Option<&Marker>,
) -> OverlayFrame {
    let mut frame = OverlayFrame {
        zones: visible_zones(manager, viewport),
        ..OverlayFrame::default()
    };
    if options.show_markers {
        for file in manager.files() {
            if file.hidden {
                continue;
            }
            for marker in &file.markers {
                let Some((item, hovered)) = marker_item(marker, context, viewport, options, pointer)
                else {
                    continue;
                };
                if hovered {
                    frame.hover = Some(LabelItem {
                        text: marker.name.clone(),
                        anchor: item.screen,
                    });
                }
                frame.markers.push(item);
            }
        }
    }
    if let Some(goto) = goto_marker {
        if let Some((item, _)) = marker_item(goto, context, viewport, options, None) {
            frame.markers.push(item);
        }
    }
    if options.show_grid_if_zoomed && viewport.zoom() >= GRID_MIN_ZOOM {
        frame.grid = grid_lines(viewport);
    }
    frame
}

/// The markers that would draw right now, without hover tracking.
pub fn visible_markers(
    manager: &MarkerManager,
    context: &OverlayContext,
    viewport: &Viewport,
    options: &OverlayOptions,
) -> Vec<MarkerItem> {
    let mut items = Vec::new();
    if !options.show_markers {
        return items;
    }
    for file in manager.files() {
        if file.hidden {
            continue;
        }
        for marker in &file.markers {
            if let Some((item, _)) = marker_item(marker, context, viewport, options, None) {
                items.push(item);
            }
        }
    }
    items
}

/// Zone polygons of the current facet whose bounds touch the view.
pub fn visible_zones(manager: &MarkerManager, viewport: &Viewport) -> Vec<ZoneItem> {
    let view = viewport.visible_world_rect();
    let mut items = Vec::new();
    for set in manager.zone_sets() {
        if set.hidden || set.map_id != viewport.map_id {
            continue;
        }
        for zone in &set.zones {
            if !zone.bounds.intersects(&view) {
                continue;
            }
            items.push(ZoneItem {
                label: zone.label.clone(),
                color: zone.color,
                points: zone
                    .vertices
                    .iter()
                    .map(|&vertex| viewport.world_to_screen(vertex))
                    .collect(),
            });
        }
    }
    items
}

/// Tile grid line segments over the visible world, every [`GRID_SKIP`]
/// tiles, snapped to the grid. Endpoints may stick out past the window; the
/// host clips lines anyway.
pub fn grid_lines(viewport: &Viewport) -> Vec<(IVec2, IVec2)> {
    let view = viewport.visible_world_rect();
    let mut lines = Vec::new();
    let mut world_y = (view.y / GRID_SKIP) * GRID_SKIP;
    while world_y < view.bottom() {
        lines.push((
            viewport.world_to_screen(IVec2::new(view.x, world_y)),
            viewport.world_to_screen(IVec2::new(view.right(), world_y)),
        ));
        world_y += GRID_SKIP;
    }
    let mut world_x = (view.x / GRID_SKIP) * GRID_SKIP;
    while world_x < view.right() {
        lines.push((
            viewport.world_to_screen(IVec2::new(world_x, view.y)),
            viewport.world_to_screen(IVec2::new(world_x, view.bottom())),
        ));
        world_x += GRID_SKIP;
    }
    lines
}

/// Window position for an entity dot. Off view entities are pulled back to
/// the window edge along their true direction, so the dot still points the
/// way toward them.
pub fn place_entity_dot(viewport: &Viewport, world: IVec2) -> IVec2 {
    let half = viewport.half_extents();
    let clamped = clamp_to_bounds(
        viewport.project_offset(world),
        half - IVec2::splat(MAP_BORDER),
    );
    let position = clamped + half + IVec2::splat(MAP_BORDER);
    let content = viewport.content_size();
    position.clamp(
        IVec2::splat(MAP_BORDER),
        IVec2::new(
            MAP_BORDER + content.x - DOT_SIZE,
            MAP_BORDER + content.y - DOT_SIZE,
        ),
    )
}

/// Filter and project one marker. Returns the draw item and whether the
/// pointer is on it (hover only counts while the name is not already
/// showing).
fn marker_item(
    marker: &Marker,
    context: &OverlayContext,
    viewport: &Viewport,
    options: &OverlayOptions,
    pointer: Option<IVec2>,
) -> Option<(MarkerItem, bool)> {
    // a negative map id means "both base facets"
    if marker.map_id != viewport.map_id && (marker.map_id >= 0 || viewport.map_id > 1) {
        return None;
    }
    if marker.zoom_index > viewport.zoom_index as i32 {
        return None;
    }
    let screen = viewport.world_to_screen(IVec2::new(marker.x, marker.y));
    let content = viewport.content_size();
    if screen.x < MAP_BORDER
        || screen.x > MAP_BORDER + content.x - DOT_SIZE
        || screen.y < MAP_BORDER
        || screen.y > MAP_BORDER + content.y - DOT_SIZE
    {
        return None;
    }

    let show_name = options.show_marker_names
        && !marker.name.is_empty()
        && viewport.zoom_index > NAME_ALWAYS_ZOOM_INDEX;
    let icon = if options.show_marker_icons {
        context.icons().get(&marker.icon_name)
    } else {
        None
    };
    let (shape, hovered) = match icon {
        Some(icon) => {
            let half_w = (icon.width >> 1) as i32;
            let half_h = (icon.height >> 1) as i32;
            let hovered = pointer.is_some_and(|p| {
                p.x >= screen.x - half_w
                    && p.x <= screen.x + half_w
                    && p.y >= screen.y - half_h
                    && p.y <= screen.y + half_h
            });
            (
                MarkerShape::Icon {
                    name: marker.icon_name.clone(),
                    width: icon.width,
                    height: icon.height,
                },
                hovered,
            )
        }
        None => {
            // the classic hit box for dots is asymmetric: four pixels out on
            // the near side, two on the far side
            let hovered = pointer.is_some_and(|p| {
                p.x >= screen.x - DOT_SIZE
                    && p.x <= screen.x + DOT_SIZE_HALF
                    && p.y >= screen.y - DOT_SIZE
                    && p.y <= screen.y + DOT_SIZE_HALF
            });
            (
                MarkerShape::Dot(context.colors().resolve(&marker.color_name)),
                hovered,
            )
        }
    };
    let item = MarkerItem {
        screen,
        shape,
        show_name,
        marker: marker.clone(),
    };
    Some((item, hovered && !show_name))
}
