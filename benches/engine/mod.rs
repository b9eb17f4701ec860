//! Benchmarks for the engine's hot paths.

mod mixer;
mod pattern;
mod tick;

pub use mixer::bench_mixer;
pub use pattern::bench_pattern;
pub use tick::bench_tick;
