//! Pixel color-space conversions used by the detectors.

/// HSV triple in OpenCV 8-bit units: hue in `0..180`, saturation and value
/// in `0..=255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    /// True if every channel lies inside the inclusive `[lower, upper]` band.
    #[inline]
    pub fn in_band(&self, lower: [u8; 3], upper: [u8; 3]) -> bool {
        (lower[0]..=upper[0]).contains(&self.h)
            && (lower[1]..=upper[1]).contains(&self.s)
            && (lower[2]..=upper[2]).contains(&self.v)
    }
}

/// Convert an 8-bit RGB pixel to HSV with the half-degree hue scale.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: ((h / 2.0).round() as u16 % 180) as u8,
        s: s.round().clamp(0.0, 255.0) as u8,
        v: max as u8,
    }
}

/// Convert an 8-bit RGB pixel to `[Y, Cr, Cb]` (BT.601, full range).
pub fn rgb_to_ycrcb(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    [
        y.round().clamp(0.0, 255.0) as u8,
        cr.round().clamp(0.0, 255.0) as u8,
        cb.round().clamp(0.0, 255.0) as u8,
    ]
}
