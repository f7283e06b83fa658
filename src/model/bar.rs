//! The per-display render model handed to the bar's renderer.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, trace};

use super::exclusion::Exclusions;
use super::order::{IconOrder, sort_refs};
use super::reconcile::{DedupKey, reconcile};
use super::snapshot::{DisplayId, Snapshot, Window, WindowId};
use crate::common::config::SpacesSettings;
use crate::common::error::{Error, Result};

const WM_NOT_RUNNING_OUTPUT: &str = "yabaiError";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WindowIcon {
    pub id: WindowId,
    pub app: String,
    pub title: String,
    pub focused: bool,
    /// Zoomed to fill its parent or the whole space.
    pub fullscreen: bool,
}

impl From<&Window> for WindowIcon {
    fn from(w: &Window) -> Self {
        WindowIcon {
            id: w.id,
            app: w.app.clone(),
            title: w.title.clone(),
            focused: w.focused,
            fullscreen: w.zoom_parent || w.zoom_fullscreen,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SpaceEntry {
    pub key: String,
    pub index: u32,
    pub label: Option<String>,
    pub focused: bool,
    pub visible: bool,
    pub native_fullscreen: bool,
    /// First space of its display, excluded or not.
    pub first_of_display: bool,
    pub windows: Vec<WindowIcon>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BarModel {
    pub display_index: u32,
    /// Index of the focused space, which may be on another display.
    pub current_space_index: Option<u32>,
    /// Spaces can only be created when SIP is disabled.
    pub can_add_space: bool,
    pub spaces: Vec<SpaceEntry>,
    /// Present when sticky windows are shown apart from the spaces.
    pub stickies: Option<Vec<WindowIcon>>,
}

impl BarModel {
    #[instrument(level = "debug", skip(snapshot, settings, exclusions))]
    pub fn build(
        snapshot: &Snapshot,
        display_id: DisplayId,
        settings: &SpacesSettings,
        exclusions: &Exclusions,
    ) -> Result<Self> {
        let display_index = snapshot
            .display_by_id(display_id)
            .map(|d| d.index)
            .ok_or_else(|| Error::malformed(format!("unknown display id {}", display_id.0)))?;
        let current_space_index = snapshot.focused_space().map(|s| s.index);

        let known_spaces = snapshot.space_indices();
        let windows: Vec<Window> = snapshot
            .windows
            .iter()
            .filter(|w| {
                let known = known_spaces.contains(&w.space);
                if !known {
                    debug!(window = %w.id, space = w.space, "Window on unknown space, skipping");
                }
                known
            })
            .cloned()
            .collect();

        let first_index = snapshot.spaces.iter().find(|s| s.display == display_index).map(|s| s.index);
        let dedup = DedupKey::from_unique_apps(settings.unique_apps);
        let separate_stickies = settings.display_sticky_windows_separately;

        let spaces = snapshot
            .spaces
            .iter()
            .filter(|space| space.display == display_index)
            .filter(|space| {
                let excluded = exclusions.is_space_excluded(space);
                if excluded {
                    trace!(key = %space.key(), "Space excluded");
                }
                !excluded
            })
            .map(|space| {
                let reconciled = reconcile(&windows, dedup, display_index, space.index, exclusions);
                let mut members = reconciled.non_sticky;
                if !separate_stickies {
                    members.extend(reconciled.sticky);
                }
                SpaceEntry {
                    key: space.key(),
                    index: space.index,
                    label: space.label.clone().filter(|l| !l.is_empty()),
                    focused: space.has_focus,
                    visible: space.is_visible,
                    native_fullscreen: space.is_native_fullscreen,
                    first_of_display: first_index == Some(space.index),
                    windows: icons(members, settings.icon_order),
                }
            })
            .collect();

        let stickies = separate_stickies.then(|| {
            let reconciled = reconcile(
                &windows,
                dedup,
                display_index,
                current_space_index.unwrap_or_default(),
                exclusions,
            );
            icons(reconciled.sticky, settings.icon_order)
        });

        Ok(BarModel {
            display_index,
            current_space_index,
            can_add_space: snapshot.sip_disabled(),
            spaces,
            stickies,
        })
    }
}

fn icons(mut windows: Vec<&Window>, order: IconOrder) -> Vec<WindowIcon> {
    sort_refs(&mut windows, order);
    windows.into_iter().filter(|w| !w.minimized).map(WindowIcon::from).collect()
}

/// What the renderer shows instead of the bar when there is nothing usable
/// to render.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    Error,
    NoOutput,
    WindowManagerNotRunning,
    NoData,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::Error => "Something went wrong...",
            EmptyState::NoOutput => "Loading...",
            EmptyState::WindowManagerNotRunning => "yabai is not running",
            EmptyState::NoData => "JSON error...",
        }
    }

    /// How long to wait before asking for a fresh snapshot.
    pub fn retry_after(self) -> Option<Duration> {
        match self {
            EmptyState::Error | EmptyState::NoData => Some(Duration::from_secs(2)),
            EmptyState::WindowManagerNotRunning => Some(Duration::from_secs(15)),
            EmptyState::NoOutput => None,
        }
    }
}

/// Turns raw query output into a snapshot, or the empty state to show.
pub fn classify_output(output: &str) -> std::result::Result<Snapshot, EmptyState> {
    let cleaned: String = output.trim().chars().filter(|c| *c != '\n' && *c != '\r').collect();
    if cleaned.is_empty() {
        return Err(EmptyState::NoOutput);
    }
    if cleaned == WM_NOT_RUNNING_OUTPUT {
        return Err(EmptyState::WindowManagerNotRunning);
    }
    Snapshot::parse(output).map_err(|e| {
        debug!(error = %e, "Discarding unusable snapshot");
        EmptyState::NoData
    })
}
