//! The record type the pipeline processes in bulk, and its generator.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// A four-component RGBA value, layout-compatible with the kernel's `float4`.
///
/// `#[repr(C)]` so a `&[Pixel]` can be staged into a device buffer directly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Pixel {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Pixel {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// All four components set to the same value.
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    pub fn components(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Process-wide generator, seeded once per run from the system clock.
fn global_rng() -> &'static Mutex<StdRng> {
    static RNG: OnceLock<Mutex<StdRng>> = OnceLock::new();
    RNG.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Mutex::new(StdRng::seed_from_u64(seed))
    })
}

/// Generate `count` pixels with components drawn uniformly from [0, 1].
///
/// `count == 0` yields an empty vec.
pub fn generate(count: usize) -> Vec<Pixel> {
    let mut rng = global_rng().lock();
    generate_with(&mut *rng, count)
}

/// Same transform over a caller-supplied generator, for reproducible sequences.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Pixel> {
    (0..count)
        .map(|_| {
            Pixel::new(
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn generates_requested_count() {
        let pixels = generate(1000);
        assert_eq!(pixels.len(), 1000);
    }

    #[test]
    fn zero_count_yields_empty() {
        assert!(generate(0).is_empty());
    }

    #[test]
    fn components_are_in_unit_range() {
        let pixels = generate(10_000);
        for p in &pixels {
            for c in p.components() {
                assert!((0.0..=1.0).contains(&c), "component {} out of range", c);
            }
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let mut a = Pcg64Mcg::new(0xcafe_f00d);
        let mut b = Pcg64Mcg::new(0xcafe_f00d);
        assert_eq!(generate_with(&mut a, 64), generate_with(&mut b, 64));
    }

    #[test]
    fn pixel_layout_matches_float4() {
        assert_eq!(std::mem::size_of::<Pixel>(), 4 * std::mem::size_of::<f32>());
        assert_eq!(std::mem::align_of::<Pixel>(), std::mem::align_of::<f32>());
    }
}
