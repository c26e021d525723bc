//! Shared lookup tables for the overlay: named colors, marker icons and per
//! facet world bounds.
//!
//! One [`OverlayContext`] per overlay instance. Components borrow it instead
//! of reaching into process globals, so two overlays (or a test and the real
//! thing) never step on each other.

use cap_std::fs_utf8::Dir;
use glam::IVec2;
use indexmap::IndexMap;
use tracing::{error, warn};

use crate::geo::{BASE_FACET_HEIGHT, BASE_FACET_WIDTH};

pub type Rgba = [u8; 4];

/// the "draw nothing but stay hoverable" sentinel
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
const WHITE: Rgba = [255, 255, 255, 255];

/// Case insensitive color registry seeded with the classic palette.
#[derive(Debug, Clone)]
pub struct MarkerColors {
    names: IndexMap<String, Rgba>,
}

impl MarkerColors {
    /// Look a color up by name. Unknown names fall back to white so a typo
    /// in a marker file still draws something.
    pub fn resolve(&self, name: &str) -> Rgba {
        self.names
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or(WHITE)
    }

    pub fn is_transparent(&self, name: &str) -> bool {
        self.resolve(name) == TRANSPARENT
    }

    pub fn insert(&mut self, name: &str, color: Rgba) {
        self.names.insert(name.to_lowercase(), color);
    }

    /// Registered names in palette order, for editor dropdowns.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

impl Default for MarkerColors {
    fn default() -> Self {
        let mut names = IndexMap::new();
        for (name, color) in [
            ("red", [255, 0, 0, 255]),
            ("green", [0, 128, 0, 255]),
            ("blue", [0, 0, 255, 255]),
            ("purple", [128, 0, 128, 255]),
            ("black", [0, 0, 0, 255]),
            ("yellow", [255, 255, 0, 255]),
            ("white", WHITE),
            ("marine", [127, 255, 212, 255]),
            ("none", TRANSPARENT),
        ] {
            names.insert(name.to_string(), color);
        }
        Self { names }
    }
}

/// A decoded marker icon. The pixel data is plain rgba8, ready for the host
/// to upload as a texture; width and height also size the hover hit box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerIcon {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Marker icons keyed by lowercased file stem.
#[derive(Debug, Clone, Default)]
pub struct MarkerIcons {
    icons: IndexMap<String, MarkerIcon>,
}

impl MarkerIcons {
    /// subdirectory of the marker directory that holds the icon images
    pub const DIR_NAME: &'static str = "MapIcons";

    /// Load every icon under `MapIcons/`, creating the directory on first
    /// run. Cursor and icon containers load before the plain image formats
    /// and the first file to claim a stem wins.
    pub fn load(marker_dir: &Dir) -> Self {
        let mut icons = Self::default();
        if let Err(error) = marker_dir.create_dir_all(Self::DIR_NAME) {
            error!(%error, "failed to create the MapIcons directory");
            return icons;
        }
        let dir = match marker_dir.open_dir(Self::DIR_NAME) {
            Ok(dir) => dir,
            Err(error) => {
                error!(%error, "failed to open the MapIcons directory");
                return icons;
            }
        };
        let entries = match dir.entries() {
            Ok(entries) => entries,
            Err(error) => {
                error!(%error, "failed to list the MapIcons directory");
                return icons;
            }
        };
        // group by extension so cur/ico take precedence, then sort for a
        // stable load order
        let mut groups: [Vec<String>; 4] = Default::default();
        for entry in entries.flatten() {
            let Ok(file_name) = entry.file_name() else {
                continue;
            };
            let Some((_, extension)) = file_name.rsplit_once('.') else {
                continue;
            };
            let slot = match extension.to_ascii_lowercase().as_str() {
                "cur" => 0,
                "ico" => 1,
                "png" => 2,
                "jpg" => 3,
                _ => continue,
            };
            groups[slot].push(file_name);
        }
        for group in &mut groups {
            group.sort();
        }
        for (slot, group) in groups.iter().enumerate() {
            for file_name in group {
                icons.load_one(&dir, file_name, slot <= 1);
            }
        }
        icons
    }

    fn load_one(&mut self, dir: &Dir, file_name: &str, container: bool) {
        let Some((stem, _)) = file_name.rsplit_once('.') else {
            return;
        };
        let key = stem.to_lowercase();
        if self.icons.contains_key(&key) {
            warn!(file = file_name, "duplicate icon stem, keeping the first");
            return;
        }
        let bytes = match dir.read(file_name) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(file = file_name, %error, "failed to read marker icon");
                return;
            }
        };
        // .cur shares the .ico container but is not self identifying
        let decoded = if container {
            image::load_from_memory_with_format(&bytes, image::ImageFormat::Ico)
        } else {
            image::load_from_memory(&bytes)
        };
        match decoded {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                self.icons.insert(
                    key,
                    MarkerIcon {
                        width: rgba.width(),
                        height: rgba.height(),
                        rgba: rgba.into_raw(),
                    },
                );
            }
            Err(error) => warn!(file = file_name, %error, "failed to decode marker icon"),
        }
    }

    /// Register an icon directly, for hosts that ship built in art.
    pub fn insert(&mut self, name: &str, icon: MarkerIcon) {
        self.icons.insert(name.to_lowercase(), icon);
    }

    pub fn get(&self, name: &str) -> Option<&MarkerIcon> {
        self.icons.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Loaded icon stems, for editor dropdowns.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.icons.keys().map(String::as_str)
    }
}

/// Per facet world dimensions, indexed by facet id.
#[derive(Debug, Clone)]
pub struct FacetTable {
    sizes: Vec<IVec2>,
}

impl FacetTable {
    /// The classic era facet dimensions.
    pub fn classic() -> Self {
        Self {
            sizes: vec![
                IVec2::new(BASE_FACET_WIDTH, BASE_FACET_HEIGHT),
                IVec2::new(BASE_FACET_WIDTH, BASE_FACET_HEIGHT),
                IVec2::new(2304, 1600),
                IVec2::new(2560, 2048),
                IVec2::new(1448, 1448),
                IVec2::new(1280, 4096),
            ],
        }
    }

    pub fn new(sizes: Vec<IVec2>) -> Self {
        Self { sizes }
    }

    /// World size of a facet. Negative ids and ids past the table fall back
    /// to the base facet size.
    pub fn size_of(&self, map_id: i32) -> IVec2 {
        self.sizes
            .get(map_id.max(0) as usize)
            .copied()
            .unwrap_or(IVec2::new(BASE_FACET_WIDTH, BASE_FACET_HEIGHT))
    }
}

impl Default for FacetTable {
    fn default() -> Self {
        Self::classic()
    }
}

/// Everything the overlay looks up by name while drawing.
#[derive(Debug, Clone, Default)]
pub struct OverlayContext {
    colors: MarkerColors,
    icons: MarkerIcons,
    facets: FacetTable,
}

impl OverlayContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the icon registry from `MapIcons/` under the marker
    /// directory.
    pub fn load_icons(&mut self, marker_dir: &Dir) {
        self.icons = MarkerIcons::load(marker_dir);
    }

    pub fn colors(&self) -> &MarkerColors {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut MarkerColors {
        &mut self.colors
    }

    pub fn icons(&self) -> &MarkerIcons {
        &self.icons
    }

    pub fn icons_mut(&mut self) -> &mut MarkerIcons {
        &mut self.icons
    }

    pub fn facets(&self) -> &FacetTable {
        &self.facets
    }

    pub fn set_facets(&mut self, facets: FacetTable) {
        self.facets = facets;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn colors_resolve_case_insensitively() {
        let colors = MarkerColors::default();
        assert_eq!(colors.resolve("green"), [0, 128, 0, 255]);
        assert_eq!(colors.resolve("GREEN"), [0, 128, 0, 255]);
        assert_eq!(colors.resolve("Marine"), [127, 255, 212, 255]);
    }

    #[test]
    fn unknown_colors_fall_back_to_white() {
        let colors = MarkerColors::default();
        assert_eq!(colors.resolve("chartreuse"), [255, 255, 255, 255]);
        assert_eq!(colors.resolve(""), [255, 255, 255, 255]);
    }

    #[test]
    fn none_is_the_transparent_sentinel() {
        let colors = MarkerColors::default();
        assert_eq!(colors.resolve("none"), TRANSPARENT);
        assert!(colors.is_transparent("NONE"));
        assert!(!colors.is_transparent("white"));
    }

    #[test]
    fn custom_colors_can_be_registered() {
        let mut colors = MarkerColors::default();
        colors.insert("Guild", [10, 20, 30, 255]);
        assert_eq!(colors.resolve("guild"), [10, 20, 30, 255]);
    }

    #[test]
    fn facet_sizes_follow_the_classic_table() {
        let facets = FacetTable::classic();
        assert_eq!(facets.size_of(0), IVec2::new(5120, 4096));
        assert_eq!(facets.size_of(2), IVec2::new(2304, 1600));
        assert_eq!(facets.size_of(5), IVec2::new(1280, 4096));
    }

    #[test]
    fn out_of_table_facets_fall_back_to_base_size() {
        let facets = FacetTable::classic();
        assert_eq!(facets.size_of(-1), IVec2::new(5120, 4096));
        assert_eq!(facets.size_of(99), IVec2::new(5120, 4096));
    }

    fn temp_dir() -> (tempfile::TempDir, Dir) {
        let temp = tempfile::tempdir().unwrap();
        let dir = Dir::open_ambient_dir(
            camino::Utf8Path::from_path(temp.path()).unwrap(),
            cap_std::ambient_authority(),
        )
        .unwrap();
        (temp, dir)
    }

    #[test]
    fn icons_load_from_the_map_icons_directory() {
        use image::ImageEncoder;

        let (_temp, dir) = temp_dir();
        dir.create_dir(MarkerIcons::DIR_NAME).unwrap();
        let icons_dir = dir.open_dir(MarkerIcons::DIR_NAME).unwrap();
        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png)
            .write_image(
                &[255u8, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 0, 0, 0, 255],
                2,
                2,
                image::ExtendedColorType::Rgba8,
            )
            .unwrap();
        icons_dir.write("Dungeon.png", &png).unwrap();
        icons_dir.write("notes.txt", b"not an image").unwrap();

        let icons = MarkerIcons::load(&dir);
        assert_eq!(icons.len(), 1);
        let icon = icons.get("DUNGEON").unwrap();
        assert_eq!((icon.width, icon.height), (2, 2));
        assert_eq!(icon.rgba.len(), 16);
        assert!(icons.get("missing").is_none());
    }

    #[test]
    fn icon_load_creates_the_directory() {
        let (_temp, dir) = temp_dir();
        let icons = MarkerIcons::load(&dir);
        assert!(icons.is_empty());
        assert!(dir.metadata(MarkerIcons::DIR_NAME).unwrap().is_dir());
    }
}
