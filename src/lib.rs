//! Terramap
//! The world map overlay core of a classic shard client.
//!
//! The host client owns the window, the textures and the input loop. This
//! library owns everything between the marker files on disk and the geometry
//! the host draws each frame:
//! 1. [`pack`] and [`io`] read and write the marker file formats that packs
//!     ship in (csv, the old UOAM `.map` files, xml exports) plus the user's
//!     own editable store, and the zone polygon sidecars.
//! 2. [`manager`] keeps all of those loaded, reloads them off thread, and
//!     routes edits to the one file the user may write.
//! 3. [`geo`] converts between sextant coordinates ("55o54'N, 72o42'E") and
//!     world tiles, which is how players trade locations in chat.
//! 4. [`projection`] maps world tiles to window pixels and back, including
//!     the 45 degree flipped view and its historical float inverse.
//! 5. [`overlay`] filters and projects it all into one [`OverlayFrame`] of
//!     plain shapes per frame.
//!
//! [`trace::install_tracing`] sets up logging into the overlay directory;
//! [`context::OverlayContext`] carries the color, icon and facet registries
//! that used to be globals.

pub mod context;
pub mod geo;
pub mod io;
pub mod manager;
pub mod overlay;
pub mod pack;
pub mod projection;
pub mod trace;

pub use context::OverlayContext;
pub use manager::{MarkerManager, OverlaySettings, RepoEvent};
pub use overlay::{compose_frame, OverlayFrame, OverlayOptions};
pub use pack::{Marker, MarkerFile, Zone, ZoneSet};
pub use projection::Viewport;
