//! The data model of the overlay: markers, marker files, zones and the
//! errors produced while decoding them.

pub mod error;
mod marker;
mod zone;

pub use error::PackError;
pub use marker::{Marker, MarkerFile};
pub use zone::{WorldRect, Zone, ZoneSet, ZonesFile, ZonesFileZone};
