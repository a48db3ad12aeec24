//! Conversions between RGB, HSL and CIE Lab (D65).
//!
//! RGB channels are in `0..=255`. HSL components are all in `0..=1`.

use palette::{FromColor, Hsl, Lab, LinSrgb, Srgb, white_point::D65};

fn to_srgb(rgb: [f64; 3]) -> Srgb<f64> {
    Srgb::new(rgb[0] / 255.0, rgb[1] / 255.0, rgb[2] / 255.0)
}

fn from_srgb(srgb: Srgb<f64>) -> [f64; 3] {
    [srgb.red, srgb.green, srgb.blue].map(|c| c.clamp(0.0, 1.0) * 255.0)
}

pub fn rgb_to_hsl(r: f64, g: f64, b: f64) -> [f64; 3] {
    let hsl: Hsl<palette::encoding::Srgb, f64> = Hsl::from_color(to_srgb([r, g, b]));
    [
        hsl.hue.into_positive_degrees() / 360.0,
        hsl.saturation,
        hsl.lightness,
    ]
}

pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [f64; 3] {
    let hsl: Hsl<palette::encoding::Srgb, f64> = Hsl::new(h * 360.0, s, l);
    from_srgb(Srgb::from_color(hsl))
}

pub fn rgb_to_lab(rgb: [f64; 3]) -> [f64; 3] {
    let linear: LinSrgb<f64> = to_srgb(rgb).into_linear();
    let lab = Lab::<D65, f64>::from_color(linear);
    [lab.l, lab.a, lab.b]
}

/// Inverse of [`rgb_to_lab`], clamped to the displayable range.
pub fn lab_to_rgb(lab: [f64; 3]) -> [f64; 3] {
    let linear = LinSrgb::<f64>::from_color(Lab::<D65, f64>::new(lab[0], lab[1], lab[2]));
    from_srgb(Srgb::from_linear(linear))
}
