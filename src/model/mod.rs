pub mod bar;
pub mod exclusion;
pub mod order;
pub mod reconcile;
pub mod snapshot;

pub use bar::{BarModel, EmptyState, SpaceEntry, WindowIcon, classify_output};
pub use exclusion::{ExclusionRule, Exclusions, is_excluded, is_window_visible};
pub use order::{IconOrder, compare, sort_windows};
pub use reconcile::{DedupKey, ReconciledWindows, reconcile};
pub use snapshot::{Display, DisplayId, Frame, Snapshot, Space, Window, WindowId};
