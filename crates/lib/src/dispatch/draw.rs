//! Random source for the omikuji draw.

use rand::Rng;

pub trait Draw: Send + Sync {
    /// Uniform integer in `0..upper`.
    fn below(&self, upper: u32) -> u32;
}

/// Thread-local RNG; unseeded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngDraw;

impl Draw for ThreadRngDraw {
    fn below(&self, upper: u32) -> u32 {
        rand::thread_rng().gen_range(0..upper)
    }
}
