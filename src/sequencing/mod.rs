pub mod division;
pub mod euclidean;
pub mod pattern;
pub mod presets;
pub mod transform;

pub use division::Division;
pub use pattern::{matches, normalize, parse, Pattern, BEATS_PER_BAR, DEFAULT_TOLERANCE};
pub use transform::{transform, EuclidParams, TransformKind};
