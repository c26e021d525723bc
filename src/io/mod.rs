//! Reading and writing the marker file formats.
//!
//! Three legacy read formats (`.csv`, UOAM `.map`, `.xml` markup) plus the
//! editable user store, which shares the csv line codec. Decoders never fail
//! the whole file for one bad record: the record is logged and skipped.

pub mod deserialize;
pub mod serialize;

pub use deserialize::{markers_from_csv, markers_from_uoam, markers_from_xml};
pub use serialize::{marker_to_line, markers_to_store, sanitize_name, LINE_ENDING};

use crate::pack::Marker;

/// The marker formats we can decode, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerFormat {
    /// `x,y,mapId,name,iconName,colorName[,zoomIndex]` per line
    Csv,
    /// sign prefixed legacy `<icon>: x y mapId name` lines
    Uoam,
    /// `<Marker X Y Facet Name Icon/>` elements
    Xml,
    /// same line codec as csv, owned by the editor
    UserStore,
}

impl MarkerFormat {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "map" => Some(Self::Uoam),
            "xml" => Some(Self::Xml),
            "usr" => Some(Self::UserStore),
            _ => None,
        }
    }
}

/// Decode `text` as `format`. `file_name` only flavors the log messages.
pub fn markers_from_str(format: MarkerFormat, text: &str, file_name: &str) -> Vec<Marker> {
    match format {
        MarkerFormat::Csv | MarkerFormat::UserStore => markers_from_csv(text, file_name),
        MarkerFormat::Uoam => markers_from_uoam(text, file_name),
        MarkerFormat::Xml => markers_from_xml(text, file_name),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("towns.csv", Some(MarkerFormat::Csv))]
    #[case("TOWNS.CSV", Some(MarkerFormat::Csv))]
    #[case("uoam.map", Some(MarkerFormat::Uoam))]
    #[case("export.xml", Some(MarkerFormat::Xml))]
    #[case("userMarkers.usr", Some(MarkerFormat::UserStore))]
    #[case("notes.txt", None)]
    #[case("noextension", None)]
    fn format_follows_the_extension(#[case] file_name: &str, #[case] expected: Option<MarkerFormat>) {
        assert_eq!(MarkerFormat::from_file_name(file_name), expected);
    }
}
