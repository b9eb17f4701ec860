/// Evenly spaced beat placement over a step grid.
///
/// Places `beats` hits over `steps` at `floor(i * steps / beats)`. This is the
/// simple spacing rule, not a full Bjorklund rotation, so `generate(3, 8)`
/// gives `[0, 2, 5]`.
///
/// - `beats == 0` yields no hits
/// - `beats >= steps` fills every step
pub fn generate(beats: usize, steps: usize) -> Vec<usize> {
    if beats == 0 {
        return Vec::new();
    }
    if beats >= steps {
        return (0..steps).collect();
    }

    let per_beat = steps as f64 / beats as f64;
    (0..beats)
        .map(|i| (i as f64 * per_beat).floor() as usize)
        .collect()
}

/// Step-grid view of [`generate`], one flag per step.
pub fn to_steps(beats: usize, steps: usize) -> Vec<bool> {
    let mut grid = vec![false; steps];
    for index in generate(beats, steps) {
        grid[index] = true;
    }
    grid
}
