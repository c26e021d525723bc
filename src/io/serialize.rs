use crate::pack::Marker;

/// Line terminator used when writing the user store. Matches what the rest
/// of the platform's text editors expect.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Encode one marker as a user store line:
/// `x,y,mapId,name,iconName,colorName,zoomIndex`.
///
/// The store format is unquoted, so a comma inside `name` would shift every
/// following field on the next load. Callers feeding user input through here
/// sanitize it first with [`sanitize_name`].
pub fn marker_to_line(marker: &Marker) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        marker.x,
        marker.y,
        marker.map_id,
        marker.name,
        marker.icon_name,
        marker.color_name,
        marker.zoom_index
    )
}

/// Encode a whole store, one line per marker, each line terminated.
pub fn markers_to_store(markers: &[Marker]) -> String {
    let mut out = String::new();
    for marker in markers {
        out.push_str(&marker_to_line(marker));
        out.push_str(LINE_ENDING);
    }
    out
}

/// Replace commas so a display name survives the unquoted line format.
pub fn sanitize_name(name: &str) -> String {
    name.replace(',', "_")
}
