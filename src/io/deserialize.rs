use tracing::warn;

use crate::pack::{Marker, PackError};

/// Decode comma separated marker lines, the format shared by `.csv` exports
/// and the user store.
///
/// Lines without a comma (headers, blanks) are skipped silently like the
/// classic tools did. Lines that have commas but fail to decode are logged
/// and skipped, the rest of the file still loads.
pub fn markers_from_csv(text: &str, file_name: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if !line.contains(',') {
            continue;
        }
        match csv_marker(line) {
            Ok(marker) => markers.push(marker),
            Err(error) => warn!(
                file = file_name,
                line = number + 1,
                %error,
                "skipping bad marker line"
            ),
        }
    }
    markers
}

fn csv_marker(line: &str) -> Result<Marker, PackError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 6 {
        return Err(PackError::ShortLine {
            need: 6,
            got: fields.len(),
        });
    }
    let mut marker = Marker {
        x: int_field("x", fields[0])?,
        y: int_field("y", fields[1])?,
        map_id: int_field("mapId", fields[2])?,
        name: fields[3].to_string(),
        icon_name: fields[4].to_string(),
        color_name: fields[5].to_string(),
        ..Marker::default()
    };
    // exactly seven fields carry a zoom index. anything longer is a line
    // with stray commas, those keep the default like the classic reader
    if fields.len() == 7 {
        marker.zoom_index = int_field("zoomIndex", fields[6])?;
    }
    Ok(marker)
}

/// Decode the legacy UOAM `.map` format:
///
/// ```text
/// 3
/// +bank: 1424 1683 0 Britain West Bank
/// -dungeon gate: 4111 434 0 Deceit
/// ```
///
/// The leading `3` is the format version, `+`/`-` is UOAM's visibility
/// toggle, the icon sits between the sign and the colon and only its first
/// word counts. Everything after `x y mapId` is the display name.
pub fn markers_from_uoam(text: &str, file_name: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.is_empty() || line == "3" {
            continue;
        }
        if !line.starts_with('+') && !line.starts_with('-') {
            continue;
        }
        match uoam_marker(line) {
            Ok(Some(marker)) => markers.push(marker),
            Ok(None) => {}
            Err(error) => warn!(
                file = file_name,
                line = number + 1,
                %error,
                "skipping bad marker line"
            ),
        }
    }
    markers
}

fn uoam_marker(line: &str) -> Result<Option<Marker>, PackError> {
    let body = &line[1..];
    let (icon_field, payload) = body.split_once(':').ok_or(PackError::NoIconSeparator)?;
    // the colon is followed by a single separator character
    let payload = payload.get(1..).unwrap_or_default();
    let tokens: Vec<&str> = payload.split(' ').collect();
    if tokens.len() <= 1 {
        return Ok(None);
    }
    if tokens.len() < 3 {
        return Err(PackError::ShortLine {
            need: 3,
            got: tokens.len(),
        });
    }
    Ok(Some(Marker {
        x: int_field("x", tokens[0])?,
        y: int_field("y", tokens[1])?,
        map_id: int_field("mapId", tokens[2])?,
        name: tokens[3..].join(" "),
        icon_name: icon_field
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string(),
        ..Marker::default()
    }))
}

/// Decode `<Marker X=".." Y=".." Facet=".." Name=".." Icon=".."/>` elements
/// anywhere in an xml document. `Name` and `Icon` are optional.
pub fn markers_from_xml(text: &str, file_name: &str) -> Vec<Marker> {
    let document = match roxmltree::Document::parse(text) {
        Ok(document) => document,
        Err(error) => {
            warn!(file = file_name, %error, "unreadable marker xml, skipping the file");
            return Vec::new();
        }
    };
    let mut markers = Vec::new();
    for node in document
        .descendants()
        .filter(|n| n.has_tag_name("Marker"))
    {
        match xml_marker(&node) {
            Ok(marker) => markers.push(marker),
            Err(error) => warn!(
                file = file_name,
                position = %document.text_pos_at(node.range().start),
                %error,
                "skipping bad marker element"
            ),
        }
    }
    markers
}

fn xml_marker(node: &roxmltree::Node) -> Result<Marker, PackError> {
    Ok(Marker {
        x: int_attribute(node, "X")?,
        y: int_attribute(node, "Y")?,
        map_id: int_attribute(node, "Facet")?,
        name: node.attribute("Name").unwrap_or_default().to_string(),
        icon_name: node.attribute("Icon").unwrap_or_default().to_string(),
        ..Marker::default()
    })
}

fn int_attribute(node: &roxmltree::Node, attribute: &'static str) -> Result<i32, PackError> {
    let value = node
        .attribute(attribute)
        .ok_or(PackError::MissingAttribute(attribute))?;
    value.trim().parse().map_err(|_| PackError::BadInt {
        field: attribute,
        value: value.to_string(),
    })
}

fn int_field(field: &'static str, value: &str) -> Result<i32, PackError> {
    value.trim().parse().map_err(|_| PackError::BadInt {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn csv_line_with_all_fields() {
        let markers = markers_from_csv("100,200,0,Bank,bankicon,green,2", "t.csv");
        assert_eq!(
            markers,
            vec![Marker {
                x: 100,
                y: 200,
                map_id: 0,
                name: "Bank".to_string(),
                icon_name: "bankicon".to_string(),
                color_name: "green".to_string(),
                zoom_index: 2,
            }]
        );
    }

    #[test]
    fn csv_line_without_zoom_gets_the_default() {
        let markers = markers_from_csv("1,2,3,a,b,red", "t.csv");
        assert_eq!(markers[0].zoom_index, Marker::DEFAULT_ZOOM_INDEX);
    }

    #[test]
    fn csv_extra_fields_fall_back_to_default_zoom() {
        // a stray comma in the name shifts everything; the classic reader
        // only honored the zoom slot on exactly seven fields
        let markers = markers_from_csv("1,2,3,a,b,red,5,junk", "t.csv");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].zoom_index, Marker::DEFAULT_ZOOM_INDEX);
    }

    #[test]
    fn csv_skips_headers_and_blanks_silently() {
        let text = "this is a header\n\n1,2,0,a,,white,3\n";
        let markers = markers_from_csv(text, "t.csv");
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn csv_skips_undecodable_lines_but_keeps_the_rest() {
        let text = "1,2,0,first,,white,3\nnot,a,number,x,y,z\n3,4,1,second,,red,3\nonly,two\n";
        let markers = markers_from_csv(text, "t.csv");
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].name, "first");
        assert_eq!(markers[1].name, "second");
    }

    #[test]
    fn csv_preserves_spaces_in_names() {
        let markers = markers_from_csv("1,2,0, Bank West ,icon,white,3", "t.csv");
        assert_eq!(markers[0].name, " Bank West ");
    }

    #[test]
    fn uoam_parses_signed_lines() {
        let text = "3\n+bank: 1424 1683 0 Britain West Bank\n-gate: 4111 434 1 Deceit\n";
        let markers = markers_from_uoam(text, "t.map");
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].x, 1424);
        assert_eq!(markers[0].y, 1683);
        assert_eq!(markers[0].map_id, 0);
        assert_eq!(markers[0].name, "Britain West Bank");
        assert_eq!(markers[0].icon_name, "bank");
        assert_eq!(markers[1].map_id, 1);
        assert_eq!(markers[1].name, "Deceit");
    }

    #[test]
    fn uoam_icon_keeps_only_the_first_word() {
        let markers = markers_from_uoam("+gray dot: 10 20 0 Spot", "t.map");
        assert_eq!(markers[0].icon_name, "gray");
    }

    #[test]
    fn uoam_marker_without_name_is_allowed() {
        let markers = markers_from_uoam("+x: 10 20 0", "t.map");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "");
    }

    #[test]
    fn uoam_unsigned_lines_are_skipped() {
        let markers = markers_from_uoam("comment line\n*odd: 1 2 0 x\n", "t.map");
        assert!(markers.is_empty());
    }

    #[test]
    fn uoam_line_without_colon_is_skipped() {
        let markers = markers_from_uoam("+1424 1683 0 Britain\n+ok: 1 2 0 fine\n", "t.map");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "fine");
    }

    #[test]
    fn uoam_defaults_color_and_zoom() {
        let markers = markers_from_uoam("+bank: 1 2 0 Bank", "t.map");
        assert_eq!(markers[0].color_name, Marker::DEFAULT_COLOR);
        assert_eq!(markers[0].zoom_index, Marker::DEFAULT_ZOOM_INDEX);
    }

    #[test]
    fn xml_markers_anywhere_in_the_document() {
        let text = r#"<?xml version="1.0"?>
            <Markers>
                <Group>
                    <Marker X="100" Y="200" Facet="0" Name="Moongate" Icon="gate"/>
                </Group>
                <Marker X="300" Y="400" Facet="2"/>
            </Markers>"#;
        let markers = markers_from_xml(text, "t.xml");
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].name, "Moongate");
        assert_eq!(markers[0].icon_name, "gate");
        assert_eq!(markers[1].map_id, 2);
        assert_eq!(markers[1].name, "");
        assert_eq!(markers[1].icon_name, "");
    }

    #[test]
    fn xml_element_missing_a_coordinate_is_skipped() {
        let text = r#"<Markers>
            <Marker X="1" Facet="0" Name="broken"/>
            <Marker X="1" Y="2" Facet="0" Name="ok"/>
        </Markers>"#;
        let markers = markers_from_xml(text, "t.xml");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "ok");
    }

    #[test]
    fn unparseable_xml_loads_nothing() {
        let markers = markers_from_xml("<Markers><Marker X=", "t.xml");
        assert!(markers.is_empty());
    }

    #[test]
    fn xml_defaults_color_and_zoom() {
        let markers = markers_from_xml(r#"<Marker X="1" Y="2" Facet="0"/>"#, "t.xml");
        assert_eq!(markers[0].color_name, Marker::DEFAULT_COLOR);
        assert_eq!(markers[0].zoom_index, Marker::DEFAULT_ZOOM_INDEX);
    }
}
