//! Typed view of one window manager query.
//!
//! yabai has renamed several attributes over time (`focused` became
//! `has-focus`, `sticky` became `is-sticky`, ...) and older releases encode
//! flags as `0`/`1`. Everything is normalized here, per field, so the rest of
//! the crate only ever sees the canonical shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::common::collections::HashSet;
use crate::common::error::{Error, Result};

const SIP_ENABLED: &str = "System Integrity Protection status: enabled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "w")]
    pub width: f64,
    #[serde(rename = "h")]
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub id: DisplayId,
    pub index: u32,
    pub uuid: Option<String>,
    pub frame: Option<Frame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub id: Option<u64>,
    pub index: u32,
    pub label: Option<String>,
    /// Index of the display this space lives on.
    pub display: u32,
    pub has_focus: bool,
    pub is_visible: bool,
    pub is_native_fullscreen: bool,
}

impl Space {
    /// The label when one is set, otherwise the index.
    pub fn key(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self.index.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub id: WindowId,
    pub pid: Option<i32>,
    pub app: String,
    pub title: String,
    /// Index of the display the window is on.
    pub display: u32,
    /// Index of the space the window is on.
    pub space: u32,
    pub frame: Frame,
    pub stack_index: i64,
    pub minimized: bool,
    pub sticky: bool,
    pub native_fullscreen: bool,
    pub focused: bool,
    pub zoom_parent: bool,
    pub zoom_fullscreen: bool,
    pub is_floating: bool,
    pub is_visible: bool,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub displays: Vec<Display>,
    pub spaces: Vec<Space>,
    pub windows: Vec<Window>,
    /// `csrutil status` output, when the query included it.
    pub sip: Option<String>,
    pub shadow: Option<String>,
}

impl Snapshot {
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| Error::malformed(e.to_string()))?;
        Self::from_value(value)
    }

    #[instrument(level = "trace", skip_all)]
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(Error::malformed("top level is not an object"));
        };

        let displays: Vec<RawDisplay> = take_array(&mut root, "displays")?;
        let spaces: Vec<RawSpace> = take_array(&mut root, "spaces")?;
        let windows: Vec<RawWindow> = take_array(&mut root, "windows")?;
        let sip = root.get("SIP").and_then(Value::as_str).map(str::to_string);
        let shadow = root.get("shadow").and_then(Value::as_str).map(str::to_string);

        let snapshot = Snapshot {
            displays: displays.into_iter().map(RawDisplay::normalize).collect(),
            spaces: spaces.into_iter().map(RawSpace::normalize).collect(),
            windows: windows.into_iter().map(RawWindow::normalize).collect(),
            sip,
            shadow,
        };
        debug!(
            displays = snapshot.displays.len(),
            spaces = snapshot.spaces.len(),
            windows = snapshot.windows.len(),
            "Parsed snapshot"
        );
        Ok(snapshot)
    }

    pub fn focused_space(&self) -> Option<&Space> { self.spaces.iter().find(|s| s.has_focus) }

    pub fn display_by_id(&self, id: DisplayId) -> Option<&Display> {
        self.displays.iter().find(|d| d.id == id)
    }

    /// Distinct display indices referenced by spaces, in first-seen order.
    pub fn display_indices(&self) -> Vec<u32> {
        let mut seen = HashSet::default();
        self.spaces.iter().map(|s| s.display).filter(|d| seen.insert(*d)).collect()
    }

    pub fn space_indices(&self) -> HashSet<u32> { self.spaces.iter().map(|s| s.index).collect() }

    /// Adding or removing spaces needs the scripting addition, which needs
    /// SIP to be (at least partially) disabled. A missing status counts as
    /// enabled.
    pub fn sip_disabled(&self) -> bool { self.sip.as_deref().is_some_and(|s| s.trim() != SIP_ENABLED) }
}

fn take_array<T>(root: &mut serde_json::Map<String, Value>, key: &str) -> Result<Vec<T>>
where T: serde::de::DeserializeOwned {
    match root.remove(key) {
        Some(v @ Value::Array(_)) => serde_json::from_value(v)
            .map_err(|e| Error::malformed(format!("invalid entry in `{key}`: {e}"))),
        Some(_) => Err(Error::malformed(format!("`{key}` is not an array"))),
        None => Err(Error::malformed(format!("missing `{key}`"))),
    }
}

/// A flag as yabai emits it: a JSON bool, or `0`/`1` from older releases.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl From<Flag> for bool {
    fn from(flag: Flag) -> bool {
        match flag {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

fn coalesce(current: Option<Flag>, legacy: Option<Flag>) -> bool {
    current.or(legacy).map(bool::from).unwrap_or(false)
}

#[derive(Deserialize)]
struct RawDisplay {
    id: DisplayId,
    index: u32,
    uuid: Option<String>,
    frame: Option<Frame>,
}

impl RawDisplay {
    fn normalize(self) -> Display {
        Display {
            id: self.id,
            index: self.index,
            uuid: self.uuid,
            frame: self.frame,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSpace {
    id: Option<u64>,
    index: u32,
    label: Option<String>,
    display: u32,
    has_focus: Option<Flag>,
    #[serde(rename = "focused")]
    legacy_focused: Option<Flag>,
    is_visible: Option<Flag>,
    #[serde(rename = "visible")]
    legacy_visible: Option<Flag>,
    is_native_fullscreen: Option<Flag>,
    #[serde(rename = "native-fullscreen")]
    legacy_native_fullscreen: Option<Flag>,
}

impl RawSpace {
    fn normalize(self) -> Space {
        Space {
            id: self.id,
            index: self.index,
            label: self.label,
            display: self.display,
            has_focus: coalesce(self.has_focus, self.legacy_focused),
            is_visible: coalesce(self.is_visible, self.legacy_visible),
            is_native_fullscreen: coalesce(
                self.is_native_fullscreen,
                self.legacy_native_fullscreen,
            ),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawWindow {
    id: WindowId,
    pid: Option<i32>,
    app: String,
    #[serde(default)]
    title: String,
    display: u32,
    space: u32,
    #[serde(default)]
    frame: Frame,
    #[serde(default)]
    stack_index: i64,
    has_focus: Option<Flag>,
    #[serde(rename = "focused")]
    legacy_focused: Option<Flag>,
    is_minimized: Option<Flag>,
    #[serde(rename = "minimized")]
    legacy_minimized: Option<Flag>,
    is_sticky: Option<Flag>,
    #[serde(rename = "sticky")]
    legacy_sticky: Option<Flag>,
    is_native_fullscreen: Option<Flag>,
    #[serde(rename = "native-fullscreen")]
    legacy_native_fullscreen: Option<Flag>,
    has_parent_zoom: Option<Flag>,
    #[serde(rename = "zoom-parent")]
    legacy_zoom_parent: Option<Flag>,
    has_fullscreen_zoom: Option<Flag>,
    #[serde(rename = "zoom-fullscreen")]
    legacy_zoom_fullscreen: Option<Flag>,
    is_floating: Option<Flag>,
    #[serde(rename = "floating")]
    legacy_floating: Option<Flag>,
    is_visible: Option<Flag>,
    #[serde(rename = "visible")]
    legacy_visible: Option<Flag>,
    is_hidden: Option<Flag>,
}

impl RawWindow {
    fn normalize(self) -> Window {
        Window {
            id: self.id,
            pid: self.pid,
            app: self.app,
            title: self.title,
            display: self.display,
            space: self.space,
            frame: self.frame,
            stack_index: self.stack_index,
            minimized: coalesce(self.is_minimized, self.legacy_minimized),
            sticky: coalesce(self.is_sticky, self.legacy_sticky),
            native_fullscreen: coalesce(self.is_native_fullscreen, self.legacy_native_fullscreen),
            focused: coalesce(self.has_focus, self.legacy_focused),
            zoom_parent: coalesce(self.has_parent_zoom, self.legacy_zoom_parent),
            zoom_fullscreen: coalesce(self.has_fullscreen_zoom, self.legacy_zoom_fullscreen),
            is_floating: coalesce(self.is_floating, self.legacy_floating),
            is_visible: coalesce(self.is_visible, self.legacy_visible),
            is_hidden: coalesce(self.is_hidden, None),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    pub(crate) fn window(id: u32, app: &str, space: u32) -> Window {
        Window {
            id: WindowId(id),
            pid: None,
            app: app.to_string(),
            title: String::new(),
            display: 1,
            space,
            frame: Frame::default(),
            stack_index: 0,
            minimized: false,
            sticky: false,
            native_fullscreen: false,
            focused: false,
            zoom_parent: false,
            zoom_fullscreen: false,
            is_floating: false,
            is_visible: true,
            is_hidden: false,
        }
    }

    pub(crate) fn space(index: u32, display: u32) -> Space {
        Space {
            id: None,
            index,
            label: None,
            display,
            has_focus: false,
            is_visible: false,
            is_native_fullscreen: false,
        }
    }

    fn minimal() -> Value {
        json!({
            "displays": [{ "id": 1, "index": 1 }],
            "spaces": [{ "index": 1, "label": "", "display": 1, "has-focus": true }],
            "windows": [],
        })
    }

    #[test]
    fn parses_current_field_names() {
        let snapshot = Snapshot::from_value(json!({
            "displays": [{ "id": 69734272, "uuid": "37D8832A", "index": 1,
                           "frame": { "x": 0.0, "y": 0.0, "w": 1512.0, "h": 982.0 } }],
            "spaces": [
                { "id": 3, "index": 1, "label": "code", "display": 1,
                  "has-focus": true, "is-visible": true, "is-native-fullscreen": false },
                { "id": 4, "index": 2, "label": "", "display": 1,
                  "has-focus": false, "is-visible": false, "is-native-fullscreen": false },
            ],
            "windows": [{
                "id": 1201, "pid": 512, "app": "kitty", "title": "zsh",
                "frame": { "x": 10.0, "y": 40.0, "w": 700.0, "h": 900.0 },
                "display": 1, "space": 1, "stack-index": 0,
                "has-focus": true, "is-sticky": false, "is-minimized": false,
                "is-native-fullscreen": false, "has-parent-zoom": true,
                "has-fullscreen-zoom": false, "is-floating": false, "is-visible": true,
                "is-hidden": false,
            }],
            "SIP": "System Integrity Protection status: enabled.",
            "shadow": "on",
        }))
        .unwrap();

        assert_eq!(snapshot.displays[0].id, DisplayId(69734272));
        assert_eq!(snapshot.spaces[0].key(), "code");
        assert_eq!(snapshot.spaces[1].key(), "2");
        assert_eq!(snapshot.focused_space().map(|s| s.index), Some(1));

        let w = &snapshot.windows[0];
        assert_eq!(w.id, WindowId(1201));
        assert_eq!(w.frame.width, 700.0);
        assert!(w.focused);
        assert!(w.zoom_parent);
        assert!(!w.sticky);
        assert!(!snapshot.sip_disabled());
        assert_eq!(snapshot.shadow.as_deref(), Some("on"));
    }

    #[test]
    fn legacy_aliases_resolve_per_field() {
        let snapshot = Snapshot::from_value(json!({
            "displays": [{ "id": 1, "index": 1 }],
            "spaces": [{ "index": 1, "display": 1, "focused": 1, "visible": 1 }],
            "windows": [{
                "id": 7, "app": "Finder", "title": "", "display": 1, "space": 1,
                "sticky": 1, "is-minimized": true, "native-fullscreen": 0,
                "focused": 1, "zoom-fullscreen": 1,
            }],
        }))
        .unwrap();

        assert!(snapshot.spaces[0].has_focus);
        assert!(snapshot.spaces[0].is_visible);

        let w = &snapshot.windows[0];
        assert!(w.sticky);
        assert!(w.minimized);
        assert!(!w.native_fullscreen);
        assert!(w.focused);
        assert!(w.zoom_fullscreen);
        assert!(!w.zoom_parent);
    }

    #[test]
    fn current_name_wins_over_legacy() {
        let snapshot = Snapshot::from_value(json!({
            "displays": [],
            "spaces": [],
            "windows": [{
                "id": 7, "app": "Finder", "display": 1, "space": 1,
                "is-sticky": false, "sticky": 1,
            }],
        }))
        .unwrap();
        assert!(!snapshot.windows[0].sticky);
    }

    #[test]
    fn rejects_malformed_shapes() {
        for raw in [
            json!([]),
            json!("yabaiError"),
            json!({ "spaces": [], "windows": [] }),
            json!({ "displays": [], "spaces": {}, "windows": [] }),
            json!({ "displays": [], "spaces": [], "windows": [{ "id": "x" }] }),
        ] {
            let err = Snapshot::from_value(raw.clone()).unwrap_err();
            assert!(matches!(err, Error::MalformedSnapshot(_)), "{raw}: {err}");
        }
        assert!(matches!(Snapshot::parse("{"), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn sip_status() {
        let mut snapshot = Snapshot::from_value(minimal()).unwrap();
        assert!(!snapshot.sip_disabled());
        snapshot.sip = Some("System Integrity Protection status: disabled.".into());
        assert!(snapshot.sip_disabled());
        snapshot.sip = Some("System Integrity Protection status: enabled.\n".into());
        assert!(!snapshot.sip_disabled());
    }

    #[test]
    fn display_indices_are_distinct_in_order() {
        let snapshot = Snapshot {
            displays: Vec::new(),
            spaces: vec![space(1, 2), space(2, 1), space(3, 2)],
            windows: Vec::new(),
            sip: None,
            shadow: None,
        };
        assert_eq!(snapshot.display_indices(), vec![2, 1]);
    }
}
