//! Math types for AudioSim

pub use glam::Vec3;

/// Returns `sqrt(n)` when `n` is a perfect square.
pub fn exact_sqrt(n: usize) -> Option<usize> {
    let root = (n as f64).sqrt().floor() as usize;
    // float sqrt can land one off for large n
    (root.saturating_sub(1)..=root + 1).find(|r| r * r == n)
}

/// Euclidean distance between two points, widened to f64.
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    a.as_dvec3().distance(b.as_dvec3())
}
