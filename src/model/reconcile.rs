//! Splits a snapshot's windows into the ones pinned to every space of a
//! display and the ones that belong to a single space.

use serde::{Deserialize, Serialize};

use super::exclusion::{Exclusions, is_window_visible};
use super::snapshot::{Window, WindowId};
use crate::common::collections::HashSet;

/// What makes two windows "the same" entry in a reconciled list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    Window,
    App,
}

impl DedupKey {
    pub fn from_unique_apps(unique_apps: bool) -> Self {
        if unique_apps { DedupKey::App } else { DedupKey::Window }
    }
}

#[derive(Hash, PartialEq, Eq)]
enum Key<'a> {
    Id(WindowId),
    App(&'a str),
}

impl DedupKey {
    fn of<'a>(self, window: &'a Window) -> Key<'a> {
        match self {
            DedupKey::Window => Key::Id(window.id),
            DedupKey::App => Key::App(&window.app),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconciledWindows<'a> {
    pub sticky: Vec<&'a Window>,
    pub non_sticky: Vec<&'a Window>,
}

impl ReconciledWindows<'_> {
    pub fn is_empty(&self) -> bool { self.sticky.is_empty() && self.non_sticky.is_empty() }
}

/// Both lists keep snapshot order and the first window seen for each key.
///
/// Sticky windows are taken from the whole display; native fullscreen windows
/// never count as sticky, even when flagged so, and are instead matched by
/// their space like any other window.
pub fn reconcile<'a>(
    windows: &'a [Window],
    dedup: DedupKey,
    current_display: u32,
    current_space: u32,
    exclusions: &Exclusions,
) -> ReconciledWindows<'a> {
    let mut sticky_seen = HashSet::default();
    let sticky = windows
        .iter()
        .filter(|w| {
            w.sticky
                && !w.native_fullscreen
                && w.display == current_display
                && is_window_visible(w, exclusions)
                && sticky_seen.insert(dedup.of(*w))
        })
        .collect();

    let mut non_sticky_seen = HashSet::default();
    let non_sticky = windows
        .iter()
        .filter(|w| {
            (!w.sticky || w.native_fullscreen)
                && w.space == current_space
                && is_window_visible(w, exclusions)
                && non_sticky_seen.insert(dedup.of(*w))
        })
        .collect();

    ReconciledWindows { sticky, non_sticky }
}
