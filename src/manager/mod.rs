//! The marker and zone repository.
//!
//! One [`MarkerManager`] owns everything read from the overlay directory:
//!
//! 1. scans the directory for marker files: the editable user store first,
//!    then legacy `.map`, `.csv` and `.xml` exports, each keyed by its
//!    lowercased file stem
//! 2. loads `*.zones.json` zone sets next to them
//! 3. routes every mutation through the one editable user store and keeps
//!    the on disk copy in sync: adds append a single line, removals rewrite
//!    the file, batched edits mark the store dirty until the next
//!    [`MarkerManager::save_user_markers`] checkpoint
//! 4. reloads in the background on request; [`MarkerManager::tick`] swaps
//!    the finished scan in atomically, dropping results from stale requests
//!
//! Interested parties subscribe with [`MarkerManager::subscribe`] instead of
//! hooking process wide events.

mod settings;

pub use settings::{OverlaySettings, SETTINGS_FILE_NAME};

use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8::Dir;
use glam::IVec2;
use indexmap::IndexMap;
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::{debug, error, info, warn};

use crate::context::{MarkerColors, OverlayContext};
use crate::geo;
use crate::io::{self, MarkerFormat};
use crate::pack::{Marker, MarkerFile, ZoneSet, ZonesFile};

/// the one editable marker file
pub const USER_MARKERS_FILE_NAME: &str = "userMarkers.usr";
/// registry key of the user store (keys are lowercased stems)
pub const USER_MARKERS_KEY: &str = "usermarkers";
/// suffix picking zone sets out of the overlay directory
pub const ZONES_FILE_SUFFIX: &str = ".zones.json";

/// icon name stamped on auto imported rescue markers
pub const RESCUE_ICON: &str = "SOS";
/// icon name stamped on auto imported treasure cache markers
pub const CACHE_ICON: &str = "TMAP";

/// Repository change notification, delivered to every live subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoEvent {
    /// the whole registry was replaced by a rescan
    Reloaded,
    MarkerAdded(Marker),
    MarkerRemoved(Marker),
    MarkerUpdated { old: Marker, new: Marker },
    FileHidden { key: String, hidden: bool },
    ZoneSetHidden { key: String, hidden: bool },
}

/// What became of an auto detected marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectOutcome {
    Added,
    /// an equivalent marker already sits at that spot
    AlreadyKnown,
}

/// Result of one directory scan, built off thread and swapped in whole.
struct Scan {
    files: IndexMap<String, MarkerFile>,
    zones: IndexMap<String, ZoneSet>,
}

enum ReloadState {
    Idle,
    Loading,
    Done { generation: u64, scan: Scan },
    Failed { generation: u64, error: miette::Report },
}

pub struct MarkerManager {
    /// sandboxed handle to the overlay directory
    marker_dir: Dir,
    /// marker files in scan order, keyed by lowercased stem
    files: IndexMap<String, MarkerFile>,
    /// zone sets keyed by lowercased nice name
    zones: IndexMap<String, ZoneSet>,
    /// keys the user toggled off. kept even for files not currently on disk
    hidden_files: HashSet<String>,
    hidden_zones: HashSet<String>,
    /// palette snapshot used to resolve zone colors at parse time
    colors: MarkerColors,
    /// user store changed in memory but was not written yet
    user_dirty: bool,
    /// bumped per reload request so stale background results get dropped
    generation: u64,
    reload: Arc<Mutex<ReloadState>>,
    subscribers: Vec<flume::Sender<RepoEvent>>,
}

impl MarkerManager {
    /// Open the repository over `marker_dir` and do the first scan
    /// synchronously, so the caller starts with a populated registry.
    pub fn new(
        marker_dir: &Dir,
        context: &OverlayContext,
        settings: &OverlaySettings,
    ) -> Result<Self> {
        let marker_dir = marker_dir
            .try_clone()
            .into_diagnostic()
            .wrap_err("failed to clone the marker dir handle")?;
        let mut manager = Self {
            marker_dir,
            files: IndexMap::new(),
            zones: IndexMap::new(),
            hidden_files: settings
                .hidden_marker_files
                .iter()
                .map(|key| key.to_lowercase())
                .collect(),
            hidden_zones: settings
                .hidden_zone_files
                .iter()
                .map(|key| key.to_lowercase())
                .collect(),
            colors: context.colors().clone(),
            user_dirty: false,
            generation: 0,
            reload: Arc::new(Mutex::new(ReloadState::Idle)),
            subscribers: Vec::new(),
        };
        manager.reload_all()?;
        Ok(manager)
    }

    /// Rescan the overlay directory synchronously, replacing the registry.
    /// In-memory edits that were not saved yet are lost, by design: a reload
    /// is the "discard and resync with disk" operation.
    pub fn reload_all(&mut self) -> Result<()> {
        let scan = scan_markers(
            &self.marker_dir,
            &self.colors,
            &self.hidden_files,
            &self.hidden_zones,
        )?;
        self.files = scan.files;
        self.zones = scan.zones;
        self.user_dirty = false;
        self.notify(RepoEvent::Reloaded);
        Ok(())
    }

    /// Kick off a background rescan. The result lands on a later
    /// [`Self::tick`]; a newer request supersedes an unfinished one.
    pub fn start_reload(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let dir = match self.marker_dir.try_clone() {
            Ok(dir) => dir,
            Err(error) => {
                error!(%error, "failed to clone the marker dir for a background reload");
                return;
            }
        };
        let colors = self.colors.clone();
        let hidden_files = self.hidden_files.clone();
        let hidden_zones = self.hidden_zones.clone();
        let state = self.reload.clone();
        *state.lock().unwrap() = ReloadState::Loading;
        rayon::spawn(move || {
            let result = scan_markers(&dir, &colors, &hidden_files, &hidden_zones);
            *state.lock().unwrap() = match result {
                Ok(scan) => ReloadState::Done { generation, scan },
                Err(error) => ReloadState::Failed { generation, error },
            };
        });
    }

    /// Poll the background reload. Call once per frame; a finished scan that
    /// still matches the newest request is swapped in atomically.
    pub fn tick(&mut self) {
        let mut finished = None;
        if let Ok(mut state) = self.reload.lock() {
            if matches!(
                &*state,
                ReloadState::Done { .. } | ReloadState::Failed { .. }
            ) {
                finished = Some(std::mem::replace(&mut *state, ReloadState::Idle));
            }
        }
        match finished {
            Some(ReloadState::Done { generation, scan }) => {
                if generation == self.generation {
                    self.files = scan.files;
                    self.zones = scan.zones;
                    self.user_dirty = false;
                    self.notify(RepoEvent::Reloaded);
                } else {
                    debug!(
                        generation,
                        newest = self.generation,
                        "dropping a stale reload result"
                    );
                }
            }
            Some(ReloadState::Failed { generation, error }) => {
                if generation == self.generation {
                    error!(?error, "background reload failed");
                } else {
                    debug!(generation, "dropping a stale reload failure");
                }
            }
            _ => {}
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload
            .lock()
            .map(|state| matches!(&*state, ReloadState::Loading))
            .unwrap_or(false)
    }

    /// Marker files in scan order: the user store first, then the legacy
    /// formats grouped by extension.
    pub fn files(&self) -> impl Iterator<Item = &MarkerFile> {
        self.files.values()
    }

    pub fn file(&self, key: &str) -> Option<&MarkerFile> {
        self.files.get(&key.to_lowercase())
    }

    pub fn zone_sets(&self) -> impl Iterator<Item = &ZoneSet> {
        self.zones.values()
    }

    pub fn zone_set(&self, key: &str) -> Option<&ZoneSet> {
        self.zones.get(&key.to_lowercase())
    }

    pub fn user_file(&self) -> Option<&MarkerFile> {
        self.files.get(USER_MARKERS_KEY)
    }

    fn user_file_mut(&mut self) -> Option<&mut MarkerFile> {
        self.files.get_mut(USER_MARKERS_KEY)
    }

    pub fn marker_count(&self) -> usize {
        self.files.values().map(|file| file.markers.len()).sum()
    }

    /// Unsaved batched edits pending?
    pub fn is_user_dirty(&self) -> bool {
        self.user_dirty
    }

    pub fn hidden_file_keys(&self) -> impl Iterator<Item = &str> {
        self.hidden_files.iter().map(String::as_str)
    }

    pub fn hidden_zone_keys(&self) -> impl Iterator<Item = &str> {
        self.hidden_zones.iter().map(String::as_str)
    }

    /// Add a marker to the user store. The encoded line is appended to disk
    /// immediately; the in-memory copy follows. Names are stored verbatim,
    /// callers sanitize user input first (see [`crate::io::sanitize_name`]).
    pub fn add_user_marker(&mut self, marker: Marker) {
        if let Err(error) = self.append_user_line(&marker) {
            error!(%error, "failed to append to the user marker store");
        }
        if self.files.contains_key(USER_MARKERS_KEY) {
            if let Some(file) = self.user_file_mut() {
                file.markers.push(marker.clone());
            }
        } else {
            // the store was not in the registry (first write after an
            // external delete): resync the whole file from disk
            let file =
                load_marker_file(&self.marker_dir, USER_MARKERS_FILE_NAME, &self.hidden_files);
            self.files.shift_insert(0, file.name.to_lowercase(), file);
        }
        self.notify(RepoEvent::MarkerAdded(marker));
    }

    /// Remove the first marker structurally equal to `marker` from the user
    /// store. On success the whole store file is rewritten from memory.
    pub fn remove_user_marker(&mut self, marker: &Marker) -> bool {
        let Some(file) = self.user_file_mut() else {
            return false;
        };
        let Some(index) = file.markers.iter().position(|m| m == marker) else {
            return false;
        };
        let removed = file.markers.remove(index);
        self.write_user_store();
        self.notify(RepoEvent::MarkerRemoved(removed));
        true
    }

    /// Replace the first marker structurally equal to `old` with `new`,
    /// leaving the store dirty. The rewrite happens at the next
    /// [`Self::save_user_markers`] checkpoint, so a whole editing session
    /// costs one write.
    pub fn update_user_marker(&mut self, old: &Marker, new: Marker) -> bool {
        let Some(file) = self.user_file_mut() else {
            return false;
        };
        let Some(index) = file.markers.iter().position(|m| m == old) else {
            return false;
        };
        file.markers[index] = new.clone();
        self.user_dirty = true;
        self.notify(RepoEvent::MarkerUpdated {
            old: old.clone(),
            new,
        });
        true
    }

    /// Checkpoint flush: rewrite the store if batched edits are pending.
    pub fn save_user_markers(&mut self) {
        if self.user_dirty {
            self.write_user_store();
        }
    }

    /// Toggle a marker file's visibility. The key sticks across reloads and
    /// can be persisted through [`OverlaySettings::capture_hidden`].
    pub fn set_file_hidden(&mut self, key: &str, hidden: bool) -> bool {
        let key = key.to_lowercase();
        let Some(file) = self.files.get_mut(&key) else {
            return false;
        };
        file.hidden = hidden;
        if hidden {
            self.hidden_files.insert(key.clone());
        } else {
            self.hidden_files.remove(&key);
        }
        self.notify(RepoEvent::FileHidden { key, hidden });
        true
    }

    pub fn set_zone_set_hidden(&mut self, key: &str, hidden: bool) -> bool {
        let key = key.to_lowercase();
        let Some(set) = self.zones.get_mut(&key) else {
            return false;
        };
        set.hidden = hidden;
        if hidden {
            self.hidden_zones.insert(key.clone());
        } else {
            self.hidden_zones.remove(&key);
        }
        self.notify(RepoEvent::ZoneSetHidden { key, hidden });
        true
    }

    /// Scan free text (a rescue note, a message body) for a sextant
    /// coordinate and pin a rescue marker there. Returns the world position
    /// alongside whether anything new was added; `None` when the text holds
    /// no usable coordinate.
    ///
    /// Rescue spots exist on both base facets, so the marker lands on
    /// map id -1 and the duplicate check accepts any negative map id.
    pub fn import_rescue_marker(&mut self, text: &str, label: &str) -> Option<(DetectOutcome, IVec2)> {
        let coordinates = geo::find_sextant(text)?;
        let world = match geo::parse_sextant(coordinates) {
            Ok(world) => world,
            Err(error) => {
                warn!(%error, "detected coordinate did not parse");
                return None;
            }
        };
        let marker = Marker {
            x: world.x,
            y: world.y,
            map_id: -1,
            name: label.to_string(),
            icon_name: RESCUE_ICON.to_string(),
            color_name: "green".to_string(),
            zoom_index: 3,
        };
        let outcome = self.import_detected(marker, RESCUE_ICON, true)?;
        Some((outcome, world))
    }

    /// Pin a treasure cache marker at a known digging spot. Cache spots are
    /// facet exact, so the duplicate check compares map ids directly.
    pub fn import_cache_marker(
        &mut self,
        x: i32,
        y: i32,
        map_id: i32,
        label: &str,
    ) -> Option<DetectOutcome> {
        let marker = Marker {
            x,
            y,
            map_id,
            name: label.to_string(),
            icon_name: CACHE_ICON.to_string(),
            color_name: "yellow".to_string(),
            zoom_index: 3,
        };
        self.import_detected(marker, CACHE_ICON, false)
    }

    /// Drop every cache marker at the spot (dug up or dismissed). Rewrites
    /// the store when anything was removed.
    pub fn clear_cache_marker(&mut self, x: i32, y: i32, map_id: i32) -> bool {
        let Some(file) = self.user_file_mut() else {
            return false;
        };
        let mut removed = Vec::new();
        file.markers.retain(|m| {
            let hit = m.icon_name.contains(CACHE_ICON) && m.map_id == map_id && m.x == x && m.y == y;
            if hit {
                removed.push(m.clone());
            }
            !hit
        });
        if removed.is_empty() {
            return false;
        }
        self.write_user_store();
        for marker in removed {
            self.notify(RepoEvent::MarkerRemoved(marker));
        }
        true
    }

    /// Case insensitive name search across the non hidden files.
    pub fn search_markers(&self, query: &str) -> Vec<&Marker> {
        let query = query.to_lowercase();
        self.files
            .values()
            .filter(|file| !file.hidden)
            .flat_map(|file| &file.markers)
            .filter(|marker| marker.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Subscribe to repository changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> flume::Receiver<RepoEvent> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn notify(&mut self, event: RepoEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn import_detected(&mut self, marker: Marker, icon_tag: &str, any_base_facet: bool) -> Option<DetectOutcome> {
        let Some(file) = self.user_file_mut() else {
            warn!("user store not loaded, dropping the detected marker");
            return None;
        };
        let exists = file.markers.iter().any(|m| {
            let facet_hit = if any_base_facet {
                m.map_id < 0
            } else {
                m.map_id == marker.map_id
            };
            m.icon_name.contains(icon_tag) && facet_hit && m.x == marker.x && m.y == marker.y
        });
        if exists {
            return Some(DetectOutcome::AlreadyKnown);
        }
        file.markers.push(marker.clone());
        self.write_user_store();
        self.notify(RepoEvent::MarkerAdded(marker));
        Some(DetectOutcome::Added)
    }

    fn append_user_line(&self, marker: &Marker) -> std::io::Result<()> {
        let mut file = self
            .marker_dir
            .open_with(
                USER_MARKERS_FILE_NAME,
                OpenOptions::new().append(true).create(true),
            )?;
        file.write_all(io::marker_to_line(marker).as_bytes())?;
        file.write_all(io::LINE_ENDING.as_bytes())
    }

    /// Rewrite the on disk user store from the in-memory list. A failed
    /// write is logged and leaves memory as the source of truth.
    fn write_user_store(&mut self) {
        let Some(file) = self.files.get(USER_MARKERS_KEY) else {
            return;
        };
        let text = io::markers_to_store(&file.markers);
        match self.marker_dir.write(USER_MARKERS_FILE_NAME, text) {
            Ok(()) => self.user_dirty = false,
            Err(error) => error!(%error, "failed to rewrite the user marker store"),
        }
    }
}

/// One full directory scan. Fatal only when the directory itself cannot be
/// listed or the user store cannot be created; single bad files are logged
/// and loaded empty.
fn scan_markers(
    dir: &Dir,
    colors: &MarkerColors,
    hidden_files: &HashSet<String>,
    hidden_zones: &HashSet<String>,
) -> Result<Scan> {
    if !dir.exists(USER_MARKERS_FILE_NAME) {
        dir.write(USER_MARKERS_FILE_NAME, "")
            .into_diagnostic()
            .wrap_err("failed to create the user marker store")?;
    }

    let mut groups: [Vec<String>; 3] = Default::default();
    let mut zone_files = Vec::new();
    for entry in dir
        .entries()
        .into_diagnostic()
        .wrap_err("failed to list the overlay directory")?
        .flatten()
    {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(file_name) = entry.file_name() else {
            continue;
        };
        if file_name.eq_ignore_ascii_case(USER_MARKERS_FILE_NAME) {
            continue;
        }
        let lower = file_name.to_lowercase();
        if lower.ends_with(ZONES_FILE_SUFFIX) {
            zone_files.push(file_name);
            continue;
        }
        match lower.rsplit_once('.').map(|(_, extension)| extension) {
            Some("map") => groups[0].push(file_name),
            Some("csv") => groups[1].push(file_name),
            Some("xml") => groups[2].push(file_name),
            _ => {}
        }
    }
    for group in &mut groups {
        group.sort();
    }
    zone_files.sort();

    let mut files = IndexMap::new();
    let user = load_marker_file(dir, USER_MARKERS_FILE_NAME, hidden_files);
    files.insert(user.name.to_lowercase(), user);
    for file_name in groups.iter().flatten() {
        let file = load_marker_file(dir, file_name, hidden_files);
        if !file.markers.is_empty() {
            info!(
                file = %file_name,
                count = file.markers.len(),
                "loaded marker file"
            );
        }
        files.insert(file.name.to_lowercase(), file);
    }
    info!(
        files = files.len(),
        markers = files.values().map(|f| f.markers.len()).sum::<usize>(),
        "marker scan finished"
    );

    let mut zones = IndexMap::new();
    for file_name in &zone_files {
        if let Some(set) = load_zone_set(dir, file_name, colors, hidden_zones) {
            info!(file = %file_name, zones = set.zones.len(), "loaded zone file");
            zones.insert(set.nice_name.to_lowercase(), set);
        }
    }

    Ok(Scan { files, zones })
}

fn load_marker_file(dir: &Dir, file_name: &str, hidden: &HashSet<String>) -> MarkerFile {
    let stem = file_stem(file_name);
    let markers = match MarkerFormat::from_file_name(file_name) {
        Some(format) => match dir.read_to_string(file_name) {
            Ok(text) => io::markers_from_str(format, &text, file_name),
            Err(error) => {
                error!(file = %file_name, %error, "failed to read marker file");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    MarkerFile {
        name: stem.to_string(),
        full_path: Utf8PathBuf::from(file_name),
        markers,
        hidden: hidden.contains(&stem.to_lowercase()),
        is_editable: file_name.eq_ignore_ascii_case(USER_MARKERS_FILE_NAME),
    }
}

/// A zone file that fails to read or parse is skipped whole: per zone
/// recovery is not worth it for a format with one writer.
fn load_zone_set(
    dir: &Dir,
    file_name: &str,
    colors: &MarkerColors,
    hidden: &HashSet<String>,
) -> Option<ZoneSet> {
    let text = match dir.read_to_string(file_name) {
        Ok(text) => text,
        Err(error) => {
            error!(file = %file_name, %error, "failed to read zone file");
            return None;
        }
    };
    let parsed: ZonesFile = match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(error) => {
            error!(file = %file_name, %error, "unreadable zone file, skipping it");
            return None;
        }
    };
    let nice_name = ZoneSet::nice_file_name(file_name);
    let is_hidden = hidden.contains(&nice_name.to_lowercase());
    Some(ZoneSet::from_file(parsed, nice_name, colors, is_hidden))
}

fn file_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
}
