//! Spiral plot layout.
//!
//! Slot indices are laid out on concentric square rings around the origin so
//! that every slot gets its own grid cell and the occupied area stays compact
//! when slots are handed out lowest-first.

use crate::types::{Position, SlotIndex};
use serde::{Deserialize, Serialize};

/// Distance between the centres of neighbouring plots, in world units.
pub const PLOT_PITCH: f64 = 100.0;

/// Edge length of a plot's ground plate, in world units.
pub const PLOT_SIZE: f64 = 30.0;

/// Integer cell of the plot grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub x: i32,
    pub y: i32,
}

impl GridCoordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<GridCoordinate> for (i32, i32) {
    fn from(c: GridCoordinate) -> Self {
        (c.x, c.y)
    }
}

/// Smallest ring `k` whose side `2k + 1` squared covers `n`.
fn ring_of(n: i64) -> i64 {
    let mut k = ((((n as f64).sqrt()) - 1.0) / 2.0).ceil().max(0.0) as i64;
    // The float estimate can be one off for large n.
    while (2 * k + 1) * (2 * k + 1) < n {
        k += 1;
    }
    while k > 0 && (2 * k - 1) * (2 * k - 1) >= n {
        k -= 1;
    }
    k
}

/// Maps a slot index to its grid cell.
///
/// Index 0 sits at the origin. Ring `k` holds the indices whose one-based
/// position `n` satisfies `(2k-1)^2 < n <= (2k+1)^2`, walked in four runs of
/// `2k` cells starting from the ring's last cell on the bottom edge.
///
/// ```rust
/// use cubeworld_core::layout::{locate, GridCoordinate};
///
/// assert_eq!(locate(0), GridCoordinate::new(0, 0));
/// assert_eq!(locate(1), GridCoordinate::new(1, 0));
/// assert_eq!(locate(9), GridCoordinate::new(2, -1));
/// ```
pub fn locate(index: SlotIndex) -> GridCoordinate {
    let n = i64::from(index) + 1;
    let k = ring_of(n);
    let side = 2 * k;
    let mut m = (side + 1) * (side + 1);

    let (x, y) = if n >= m - side {
        (k - (m - n), -k)
    } else {
        m -= side;
        if n >= m - side {
            (-k, -k + (m - n))
        } else {
            m -= side;
            if n >= m - side {
                (-k + (m - n), k)
            } else {
                (k, k - (m - n - side))
            }
        }
    };

    // |x|, |y| <= k <= 2^16 for any u32 index.
    GridCoordinate::new(x as i32, y as i32)
}

/// World-space origin of a slot's plot as `[x, y, z]`.
///
/// The grid's `y` axis maps onto world `z`; plates rest on `y = 0`.
pub fn plot_origin(index: SlotIndex) -> [f64; 3] {
    let cell = locate(index);
    [f64::from(cell.x) * PLOT_PITCH, 0.0, f64::from(cell.y) * PLOT_PITCH]
}

/// Whether a unit cube at `position` lies on the build surface of the plot.
pub fn plot_contains(index: SlotIndex, position: &Position) -> bool {
    let [ox, _, oz] = plot_origin(index);
    let reach = PLOT_SIZE / 2.0 - 0.5;
    (position.x - ox).abs() <= reach && (position.z - oz).abs() <= reach
}
