use cap_std::fs_utf8::Dir;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::overlay::OverlayOptions;
use crate::projection::DEFAULT_ZOOM_INDEX;

/// name of the settings sidecar inside the overlay directory
pub const SETTINGS_FILE_NAME: &str = "overlay_settings.json";

/// Display preferences and hidden sets, persisted as a json sidecar next to
/// the marker files.
///
/// Loading never fails: a missing or unreadable sidecar logs a warning and
/// falls back to defaults, so a corrupt settings file cannot keep the
/// overlay from starting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub flip_map: bool,
    pub zoom_index: usize,
    pub top_most: bool,
    pub free_view: bool,
    pub show_markers: bool,
    pub show_marker_names: bool,
    pub show_marker_icons: bool,
    pub show_grid_if_zoomed: bool,
    pub show_coordinates: bool,
    pub show_mouse_coordinates: bool,
    /// lowercased stems of marker files the user toggled off
    pub hidden_marker_files: Vec<String>,
    /// lowercased nice names of zone sets the user toggled off
    pub hidden_zone_files: Vec<String>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            flip_map: true,
            zoom_index: DEFAULT_ZOOM_INDEX,
            top_most: false,
            free_view: false,
            show_markers: true,
            show_marker_names: true,
            show_marker_icons: true,
            show_grid_if_zoomed: true,
            show_coordinates: false,
            show_mouse_coordinates: false,
            hidden_marker_files: Vec::new(),
            hidden_zone_files: Vec::new(),
        }
    }
}

impl OverlaySettings {
    /// Load the sidecar from `overlay_dir`, defaulting when it is missing
    /// or unreadable.
    pub fn load(overlay_dir: &Dir) -> Self {
        match overlay_dir.read_to_string(SETTINGS_FILE_NAME) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => settings,
                Err(error) => {
                    warn!(%error, "unreadable overlay settings, using defaults");
                    Self::default()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => {
                warn!(%error, "failed to read overlay settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, overlay_dir: &Dir) -> Result<()> {
        let text = serde_json::to_string_pretty(self).into_diagnostic()?;
        overlay_dir
            .write(SETTINGS_FILE_NAME, text)
            .into_diagnostic()
            .wrap_err("failed to write overlay settings")
    }

    /// Copy the repository's hidden sets back in, ready to be saved.
    pub fn capture_hidden(&mut self, manager: &super::MarkerManager) {
        self.hidden_marker_files = manager.hidden_file_keys().map(str::to_string).collect();
        self.hidden_zone_files = manager.hidden_zone_keys().map(str::to_string).collect();
    }

    /// The draw toggles as the overlay query layer wants them.
    pub fn overlay_options(&self) -> OverlayOptions {
        OverlayOptions {
            show_markers: self.show_markers,
            show_marker_names: self.show_marker_names,
            show_marker_icons: self.show_marker_icons,
            show_grid_if_zoomed: self.show_grid_if_zoomed,
        }
    }

    /// Apply the persisted view preferences to a viewport.
    pub fn apply_to_viewport(&self, viewport: &mut crate::projection::Viewport) {
        viewport.flip = self.flip_map;
        viewport.zoom_index = self.zoom_index;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use similar_asserts::assert_eq;

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
    fn missing_sidecar_loads_defaults() {
        let (_temp, dir) = temp_dir();
        assert_eq!(OverlaySettings::load(&dir), OverlaySettings::default());
    }

    #[test]
    fn corrupt_sidecar_loads_defaults() {
        let (_temp, dir) = temp_dir();
        dir.write(SETTINGS_FILE_NAME, "{ not json").unwrap();
        assert_eq!(OverlaySettings::load(&dir), OverlaySettings::default());
    }

    #[test]
    fn settings_round_trip() {
        let (_temp, dir) = temp_dir();
        let settings = OverlaySettings {
            flip_map: false,
            zoom_index: 7,
            show_markers: false,
            hidden_marker_files: vec!["towns".to_string()],
            hidden_zone_files: vec!["ruins".to_string()],
            ..OverlaySettings::default()
        };
        settings.save(&dir).unwrap();
        assert_eq!(OverlaySettings::load(&dir), settings);
    }

    #[test]
    fn partial_sidecar_fills_in_defaults() {
        let (_temp, dir) = temp_dir();
        dir.write(SETTINGS_FILE_NAME, r#"{ "zoom_index": 9 }"#).unwrap();
        let settings = OverlaySettings::load(&dir);
        assert_eq!(settings.zoom_index, 9);
        assert!(settings.flip_map);
        assert!(settings.show_markers);
    }

    #[test]
    fn options_mirror_the_toggles() {
        let settings = OverlaySettings {
            show_marker_names: false,
            ..OverlaySettings::default()
        };
        let options = settings.overlay_options();
        assert!(options.show_markers);
        assert!(!options.show_marker_names);
    }
}
