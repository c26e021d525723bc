use camino::Utf8PathBuf;

/// A point of interest on the world map.
///
/// Markers come from the files in the overlay directory. Equality is
/// structural over all seven fields; the repository uses it to find a marker
/// again when the caller asks to remove or edit one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub x: i32,
    pub y: i32,
    /// facet the marker belongs to. negative means "either base facet", so
    /// the marker shows on facets 0 and 1
    pub map_id: i32,
    pub name: String,
    /// key into the icon registry. empty when the marker has no icon
    pub icon_name: String,
    /// key into the color registry. unknown names fall back to white
    pub color_name: String,
    /// lowest zoom table slot at which the marker is visible
    pub zoom_index: i32,
}

impl Marker {
    pub const DEFAULT_COLOR: &'static str = "white";
    pub const DEFAULT_ZOOM_INDEX: i32 = 3;

    pub fn new(x: i32, y: i32, map_id: i32) -> Self {
        Self {
            x,
            y,
            map_id,
            ..Self::default()
        }
    }

    /// The temporary "go to" pin. Manual jumps get a label with the raw
    /// coordinates, follow style jumps stay unlabeled.
    pub fn goto(x: i32, y: i32, map_id: i32, manual: bool) -> Self {
        Self {
            x,
            y,
            map_id,
            name: if manual {
                format!("Go to: {x}, {y}")
            } else {
                String::new()
            },
            icon_name: String::new(),
            color_name: "marine".to_string(),
            zoom_index: 1,
        }
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            map_id: 0,
            name: String::new(),
            icon_name: String::new(),
            color_name: Self::DEFAULT_COLOR.to_string(),
            zoom_index: Self::DEFAULT_ZOOM_INDEX,
        }
    }
}

/// One marker file's worth of markers, as loaded from the overlay directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFile {
    /// file stem. lowercased, it doubles as the registry key
    pub name: String,
    /// path relative to the marker directory
    pub full_path: Utf8PathBuf,
    pub markers: Vec<Marker>,
    pub hidden: bool,
    /// true only for the user store; every mutation goes through it
    pub is_editable: bool,
}
