#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::pattern::BEATS_PER_BAR;

/// Number of equal subdivisions of a bar a track counts in.
///
/// The tick counter runs 0..16 regardless; the division decides how a tick
/// maps onto a beat position: `(tick / division) * 4`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Division(u32);

impl Division {
    pub const QUARTER: Division = Division(4);
    pub const EIGHTH: Division = Division(8);
    pub const SIXTEENTH: Division = Division(16);
    pub const THIRTY_SECOND: Division = Division(32);

    /// Straight subdivisions offered in pickers
    pub const STANDARD: [u32; 4] = [4, 8, 16, 32];

    /// Triplet, quintuplet and septuplet variants
    pub const TUPLETS: [u32; 7] = [3, 6, 12, 5, 10, 7, 14];

    /// Any positive count is accepted; zero is not.
    pub fn new(count: u32) -> Option<Self> {
        (count > 0).then_some(Division(count))
    }

    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn is_standard(&self) -> bool {
        Self::STANDARD.contains(&self.0)
    }

    pub fn is_tuplet(&self) -> bool {
        Self::TUPLETS.contains(&self.0)
    }

    /// Beat position in the bar for a tick counter value.
    pub fn beat_position(&self, tick: u32) -> f32 {
        (tick as f32 / self.0 as f32) * BEATS_PER_BAR
    }
}

impl Default for Division {
    fn default() -> Self {
        Division::SIXTEENTH
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1/{}", self.0)
    }
}
