/*
Pattern Transforms
==================

Pure rewrites of a pattern's beat positions. Every transform returns a new
vector and leaves empty input empty.

    Reverse       [0, 1, 2]      -> [2, 1, 0]
    Double        [0, 1, 2]      -> [0, 0.5, 1]        (twice as dense)
    Half          [0.25, 0.75]   -> [0.5, 0.5]         (x2, then mod 1)
    Offset(0.25)  [0.5, 0.9]     -> [0.75, 0.15]       (wraps into [0, 1))
    Every(2)      [a, b, c, d]   -> [a, c]
    Euclid        distribute hits over a step grid, scaled to [0, 1)
    Rotate(1)     [a, b, c]      -> [b, c, a]
    Randomize     shuffled order (caller supplies the rng)

Half and Offset reduce into a single beat on purpose; they are meant for
patterns already written inside [0, 1).
*/

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::euclidean;

/// Steps used by `Euclid` when no parameters are given.
pub const DEFAULT_EUCLID_STEPS: usize = 16;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EuclidParams {
    pub beats: usize,
    pub steps: usize,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformKind {
    Reverse,
    Double,
    Half,
    Offset(f32),
    Every(usize),
    /// `None` uses as many beats as the input has positions over 16 steps
    Euclid(Option<EuclidParams>),
    Rotate(isize),
    Randomize,
    /// Unrecognised transform names map here
    Identity,
}

impl TransformKind {
    /// Build a transform from its name and optional numeric parameter.
    ///
    /// Missing parameters fall back to the defaults: offset 0, every 2,
    /// rotate 1. For `euclid` the parameter is the beat count over 16 steps.
    /// Unknown names give [`TransformKind::Identity`].
    pub fn parse(name: &str, param: Option<f32>) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "reverse" => TransformKind::Reverse,
            "double" => TransformKind::Double,
            "half" => TransformKind::Half,
            "offset" => TransformKind::Offset(param.unwrap_or(0.0)),
            "every" => TransformKind::Every(param.map(|n| n as usize).unwrap_or(2)),
            "euclid" => TransformKind::Euclid(param.map(|beats| EuclidParams {
                beats: beats.max(0.0) as usize,
                steps: DEFAULT_EUCLID_STEPS,
            })),
            "rotate" => TransformKind::Rotate(param.map(|n| n as isize).unwrap_or(1)),
            "randomize" | "random" | "shuffle" => TransformKind::Randomize,
            _ => TransformKind::Identity,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Reverse => "reverse",
            TransformKind::Double => "double",
            TransformKind::Half => "half",
            TransformKind::Offset(_) => "offset",
            TransformKind::Every(_) => "every",
            TransformKind::Euclid(_) => "euclid",
            TransformKind::Rotate(_) => "rotate",
            TransformKind::Randomize => "randomize",
            TransformKind::Identity => "identity",
        }
    }
}

/// Apply `kind` to `positions`.
///
/// `rng` is only consulted by [`TransformKind::Randomize`]; pass a seeded
/// `StdRng` for reproducible shuffles.
pub fn transform<R: Rng + ?Sized>(positions: &[f32], kind: TransformKind, rng: &mut R) -> Vec<f32> {
    if positions.is_empty() {
        return Vec::new();
    }

    match kind {
        TransformKind::Reverse => positions.iter().rev().copied().collect(),
        TransformKind::Double => positions.iter().map(|pos| pos / 2.0).collect(),
        TransformKind::Half => positions.iter().map(|pos| (pos * 2.0) % 1.0).collect(),
        TransformKind::Offset(amount) => positions
            .iter()
            .map(|pos| {
                let shifted = (pos + amount) % 1.0;
                if shifted < 0.0 {
                    shifted + 1.0
                } else {
                    shifted
                }
            })
            .collect(),
        TransformKind::Every(n) => {
            // every(0) would divide by zero; treat it like the default
            let n = if n == 0 { 2 } else { n };
            positions.iter().step_by(n).copied().collect()
        }
        TransformKind::Euclid(params) => {
            let EuclidParams { beats, steps } = params.unwrap_or(EuclidParams {
                beats: positions.len(),
                steps: DEFAULT_EUCLID_STEPS,
            });
            euclidean::generate(beats, steps)
                .into_iter()
                .map(|index| index as f32 / steps as f32)
                .collect()
        }
        TransformKind::Rotate(n) => {
            let len = positions.len() as isize;
            (0..len)
                .map(|i| positions[(i + n).rem_euclid(len) as usize])
                .collect()
        }
        TransformKind::Randomize => {
            let mut shuffled = positions.to_vec();
            for i in (1..shuffled.len()).rev() {
                let j = rng.gen_range(0..=i);
                shuffled.swap(i, j);
            }
            shuffled
        }
        TransformKind::Identity => positions.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn apply(positions: &[f32], kind: TransformKind) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(7);
        transform(positions, kind, &mut rng)
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_reverse() {
        assert_eq!(apply(&[0.0, 1.0, 2.0], TransformKind::Reverse), vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_double_and_half() {
        assert_eq!(apply(&[0.0, 1.0, 2.0], TransformKind::Double), vec![0.0, 0.5, 1.0]);
        assert_close(&apply(&[0.25, 0.75, 1.5], TransformKind::Half), &[0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_offset_wraps_into_unit_range() {
        assert_close(&apply(&[0.5, 0.9], TransformKind::Offset(0.25)), &[0.75, 0.15]);
        assert_close(&apply(&[0.1], TransformKind::Offset(-0.25)), &[0.85]);
    }

    #[test]
    fn test_every() {
        let input = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(apply(&input, TransformKind::Every(2)), vec![0.0, 2.0, 4.0]);
        assert_eq!(apply(&input, TransformKind::Every(3)), vec![0.0, 3.0]);
        assert_eq!(apply(&input, TransformKind::Every(0)), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_euclid_defaults_to_input_length() {
        let out = apply(&[0.0, 1.0, 2.0, 3.0], TransformKind::Euclid(None));
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.75]);

        let explicit = apply(
            &[0.0],
            TransformKind::Euclid(Some(EuclidParams { beats: 3, steps: 8 })),
        );
        assert_eq!(explicit, vec![0.0, 0.25, 0.625]);
    }

    #[test]
    fn test_rotate() {
        let input = [0.0, 1.0, 2.0];
        assert_eq!(apply(&input, TransformKind::Rotate(1)), vec![1.0, 2.0, 0.0]);
        assert_eq!(apply(&input, TransformKind::Rotate(4)), vec![1.0, 2.0, 0.0]);
        assert_eq!(apply(&input, TransformKind::Rotate(-1)), vec![2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_randomize_is_a_permutation_and_seeded() {
        let input: Vec<f32> = (0..12).map(|i| i as f32).collect();

        let a = apply(&input, TransformKind::Randomize);
        let b = apply(&input, TransformKind::Randomize);
        assert_eq!(a, b, "same seed should give the same shuffle");

        let mut sorted = a.clone();
        sorted.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(sorted, input);
    }

    #[test]
    fn test_empty_input_unchanged_for_every_kind() {
        let kinds = [
            TransformKind::Reverse,
            TransformKind::Double,
            TransformKind::Half,
            TransformKind::Offset(0.5),
            TransformKind::Every(2),
            TransformKind::Euclid(None),
            TransformKind::Euclid(Some(EuclidParams { beats: 4, steps: 16 })),
            TransformKind::Rotate(3),
            TransformKind::Randomize,
            TransformKind::Identity,
        ];
        for kind in kinds {
            assert!(apply(&[], kind).is_empty(), "{} should keep empty input", kind.name());
        }
    }

    #[test]
    fn test_parse_names_and_defaults() {
        assert_eq!(TransformKind::parse("reverse", None), TransformKind::Reverse);
        assert_eq!(TransformKind::parse("Every", None), TransformKind::Every(2));
        assert_eq!(TransformKind::parse("rotate", None), TransformKind::Rotate(1));
        assert_eq!(TransformKind::parse("rotate", Some(-2.0)), TransformKind::Rotate(-2));
        assert_eq!(TransformKind::parse("offset", None), TransformKind::Offset(0.0));
        assert_eq!(
            TransformKind::parse("euclid", Some(5.0)),
            TransformKind::Euclid(Some(EuclidParams { beats: 5, steps: 16 }))
        );
        assert_eq!(TransformKind::parse("wobble", None), TransformKind::Identity);
    }

    #[test]
    fn test_unknown_kind_is_identity() {
        let input = [0.0, 1.5, 3.0];
        let kind = TransformKind::parse("scramble-eggs", None);
        assert_eq!(apply(&input, kind), input.to_vec());
    }
}
