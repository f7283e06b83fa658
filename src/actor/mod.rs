//! The asynchronous parts of the bar: stepping the window manager between
//! spaces, and pacing how often work is triggered.

pub mod debounce;
pub mod navigator;

pub use debounce::{DebounceOptions, Debounced};
pub use navigator::{Direction, NavigationRequest, OsascriptSwitcher, SpaceNavigator, SpaceSwitcher};
