pub mod conversion;

pub use conversion::*;

/// An 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// Euclidean distance between two RGB colors.
pub fn rgb_distance(a: Rgb, b: Rgb) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Euclidean distance between two Lab colors.
pub fn lab_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
