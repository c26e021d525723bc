use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::context::{MarkerColors, Rgba};

/// Axis aligned world-space rectangle with integer corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WorldRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_min_max(min: IVec2, max: IVec2) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Strict overlap test. Rectangles that merely share an edge do not
    /// intersect.
    pub fn intersects(&self, other: &WorldRect) -> bool {
        other.x < self.right()
            && self.x < other.right()
            && other.y < self.bottom()
            && self.y < other.bottom()
    }
}

/// On-disk shape of a `*.zones.json` file. Accepts both the camelCase keys
/// we write and the PascalCase keys older exporters produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesFile {
    #[serde(alias = "MapIndex")]
    pub map_index: i32,
    #[serde(alias = "Zones")]
    pub zones: Vec<ZonesFileZone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesFileZone {
    #[serde(alias = "Label")]
    pub label: String,
    #[serde(alias = "Color")]
    pub color: String,
    /// closed polygon as `[[x, y], ...]` pairs. the closing edge back to the
    /// first vertex is implicit
    #[serde(alias = "Polygon")]
    pub polygon: Vec<[i32; 2]>,
}

/// A named polygon on one facet, with its color resolved and its bounding
/// rectangle precomputed at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub label: String,
    pub color: Rgba,
    pub vertices: Vec<IVec2>,
    /// tight bound of `vertices`, used as a cheap visibility prefilter
    pub bounds: WorldRect,
}

impl Zone {
    pub fn new(label: String, color: Rgba, polygon: &[[i32; 2]]) -> Self {
        let vertices: Vec<IVec2> = polygon.iter().map(|&[x, y]| IVec2::new(x, y)).collect();
        let bounds = if vertices.is_empty() {
            WorldRect::default()
        } else {
            let mut min = IVec2::MAX;
            let mut max = IVec2::MIN;
            for v in &vertices {
                min = min.min(*v);
                max = max.max(*v);
            }
            WorldRect::from_min_max(min, max)
        };
        Self {
            label,
            color,
            vertices,
            bounds,
        }
    }
}

/// One zones file: a set of zones bound to a single facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSet {
    pub map_id: i32,
    pub zones: Vec<Zone>,
    pub hidden: bool,
    /// file name with both extension layers stripped
    /// ("ruins.zones.json" becomes "ruins"). lowercased, it is the registry key
    pub nice_name: String,
}

impl ZoneSet {
    pub fn from_file(
        file: ZonesFile,
        nice_name: String,
        colors: &MarkerColors,
        hidden: bool,
    ) -> Self {
        let zones = file
            .zones
            .into_iter()
            .map(|z| Zone::new(z.label, colors.resolve(&z.color), &z.polygon))
            .collect();
        Self {
            map_id: file.map_index,
            zones,
            hidden,
            nice_name,
        }
    }

    /// Strip both extension layers from a zones file name.
    pub fn nice_file_name(file_name: &str) -> String {
        let once = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem);
        once.rsplit_once('.')
            .map_or(once, |(stem, _)| stem)
            .to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    #[rstest]
    #[case("ruins.zones.json", "ruins")]
    #[case("champ spawns.zones.json", "champ spawns")]
    #[case("plain.json", "plain")]
    #[case("bare", "bare")]
    fn nice_name_strips_both_extension_layers(#[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(ZoneSet::nice_file_name(file_name), expected);
    }

    #[test]
    fn zone_bounds_cover_all_vertices() {
        let zone = Zone::new(
            "Despise".to_string(),
            [255, 0, 0, 255],
            &[[100, 50], [40, 200], [160, 90]],
        );
        assert_eq!(zone.bounds, WorldRect::new(40, 50, 120, 150));
        assert_eq!(zone.vertices.len(), 3);
    }

    #[test]
    fn empty_polygon_gets_zero_bounds() {
        let zone = Zone::new("empty".to_string(), [0, 0, 0, 255], &[]);
        assert_eq!(zone.bounds, WorldRect::default());
    }

    #[rstest]
    // overlapping
    #[case(WorldRect::new(0, 0, 10, 10), WorldRect::new(5, 5, 10, 10), true)]
    // containment counts as overlap
    #[case(WorldRect::new(0, 0, 100, 100), WorldRect::new(10, 10, 5, 5), true)]
    // edge contact is not an intersection
    #[case(WorldRect::new(0, 0, 10, 10), WorldRect::new(10, 0, 10, 10), false)]
    #[case(WorldRect::new(0, 0, 10, 10), WorldRect::new(0, 10, 10, 10), false)]
    // disjoint
    #[case(WorldRect::new(0, 0, 10, 10), WorldRect::new(50, 50, 10, 10), false)]
    fn rect_intersection_is_strict(
        #[case] a: WorldRect,
        #[case] b: WorldRect,
        #[case] expected: bool,
    ) {
        assert_eq!(a.intersects(&b), expected);
        assert_eq!(b.intersects(&a), expected);
    }

    #[test]
    fn zones_file_accepts_pascal_case_keys() {
        let text = r#"{
            "MapIndex": 1,
            "Zones": [
                { "Label": "Yew", "Color": "green", "Polygon": [[1, 2], [3, 4]] }
            ]
        }"#;
        let parsed: ZonesFile = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.map_index, 1);
        assert_eq!(parsed.zones[0].label, "Yew");
        assert_eq!(parsed.zones[0].polygon, vec![[1, 2], [3, 4]]);
    }

    #[test]
    fn zones_file_round_trips_through_camel_case() {
        let file = ZonesFile {
            map_index: 3,
            zones: vec![ZonesFileZone {
                label: "Luna".to_string(),
                color: "purple".to_string(),
                polygon: vec![[900, 500], [980, 500], [980, 560]],
            }],
        };
        let text = serde_json::to_string(&file).unwrap();
        assert!(text.contains("\"mapIndex\""));
        assert!(text.contains("\"polygon\""));
        let back: ZonesFile = serde_json::from_str(&text).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn zone_set_resolves_colors_at_load() {
        let colors = MarkerColors::default();
        let file = ZonesFile {
            map_index: 0,
            zones: vec![
                ZonesFileZone {
                    label: "a".to_string(),
                    color: "RED".to_string(),
                    polygon: vec![[0, 0], [1, 1]],
                },
                ZonesFileZone {
                    label: "b".to_string(),
                    color: "no such color".to_string(),
                    polygon: vec![[0, 0], [1, 1]],
                },
            ],
        };
        let set = ZoneSet::from_file(file, "test".to_string(), &colors, false);
        assert_eq!(set.zones[0].color, [255, 0, 0, 255]);
        // unknown names fall back to white
        assert_eq!(set.zones[1].color, [255, 255, 255, 255]);
    }
}
