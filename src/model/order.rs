use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::snapshot::Window;

/// How the icons of one space are ordered in the bar.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IconOrder {
    /// Left to right, top to bottom, as laid out on screen.
    #[default]
    Position,
    /// By position inside a stack.
    Stack,
    /// By window id, i.e. roughly creation order.
    Id,
}

/// Total order by on-screen position: `x`, then `y`, then stack index, with
/// the window id as the final tie break.
pub fn compare(a: &Window, b: &Window) -> Ordering {
    a.frame
        .x
        .total_cmp(&b.frame.x)
        .then_with(|| a.frame.y.total_cmp(&b.frame.y))
        .then_with(|| a.stack_index.cmp(&b.stack_index))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn compare_by(order: IconOrder) -> fn(&Window, &Window) -> Ordering {
    match order {
        IconOrder::Position => compare,
        IconOrder::Stack => |a: &Window, b: &Window| {
            a.stack_index.cmp(&b.stack_index).then_with(|| a.id.cmp(&b.id))
        },
        IconOrder::Id => |a: &Window, b: &Window| a.id.cmp(&b.id),
    }
}

pub fn sort_windows(windows: &mut [Window]) { windows.sort_by(compare); }

pub(crate) fn sort_refs(windows: &mut [&Window], order: IconOrder) {
    let cmp = compare_by(order);
    windows.sort_by(|a, b| cmp(a, b));
}
