//! Serial transform engine: the single-threaded reference implementations
//! the device results are checked against.

use crate::pixel::Pixel;

/// Component-wise arithmetic mean across all pixels.
///
/// An empty slice divides by zero and yields NaN components; callers that
/// cannot rule out empty input must guard for it themselves.
pub fn average_color(pixels: &[Pixel]) -> Pixel {
    let mut total = Pixel::default();

    for p in pixels {
        total.x += p.x;
        total.y += p.y;
        total.z += p.z;
        total.w += p.w;
    }

    let n = pixels.len() as f32;
    Pixel::new(total.x / n, total.y / n, total.z / n, total.w / n)
}

/// Halve every component of every pixel. Output length and order match the
/// input exactly.
pub fn halve_brightness(pixels: &[Pixel]) -> Vec<Pixel> {
    pixels
        .iter()
        .map(|p| Pixel::new(p.x / 2.0, p.y / 2.0, p.z / 2.0, p.w / 2.0))
        .collect()
}
