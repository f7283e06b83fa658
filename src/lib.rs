//! Core of the spaces bar: turns window manager snapshots into a per-display
//! render model, and drives space navigation and refresh pacing.

pub mod actor;
pub mod common;
pub mod model;
