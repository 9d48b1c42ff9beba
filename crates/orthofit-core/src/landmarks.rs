use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Number of anatomical points in a hand pose.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices in the 21-point hand topology.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// One landmark: `x`/`y` normalized to the image size, `z` relative depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Pixel position for an image of `width` × `height`.
    #[inline]
    pub fn to_pixel(&self, width: u32, height: u32) -> Point2<f64> {
        Point2::new(
            f64::from(self.x) * f64::from(width),
            f64::from(self.y) * f64::from(height),
        )
    }
}

/// A complete 21-point hand pose.
///
/// There is no partial state: a value of this type always holds all points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub const fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from raw `(x, y, z)` triples.
    ///
    /// Returns `None` unless there are exactly 21 finite triples.
    pub fn from_triples(triples: &[[f32; 3]]) -> Option<Self> {
        if triples.len() != LANDMARK_COUNT {
            return None;
        }
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (dst, &[x, y, z]) in points.iter_mut().zip(triples) {
            if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                return None;
            }
            *dst = Landmark::new(x, y, z);
        }
        Some(Self { points })
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Pixel position of landmark `index`, or `None` if the index is out of range.
    #[inline]
    pub fn pixel(&self, index: usize, width: u32, height: u32) -> Option<Point2<f64>> {
        self.get(index).map(|lm| lm.to_pixel(width, height))
    }

    #[inline]
    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    pub fn pixels(&self, width: u32, height: u32) -> Vec<Point2<f64>> {
        self.points
            .iter()
            .map(|lm| lm.to_pixel(width, height))
            .collect()
    }
}

impl TryFrom<Vec<Landmark>> for HandLandmarks {
    type Error = String;

    fn try_from(value: Vec<Landmark>) -> Result<Self, Self::Error> {
        let len = value.len();
        let points: [Landmark; LANDMARK_COUNT] = value
            .try_into()
            .map_err(|_| format!("expected {LANDMARK_COUNT} landmarks, got {len}"))?;
        Ok(Self { points })
    }
}

impl From<HandLandmarks> for Vec<Landmark> {
    fn from(value: HandLandmarks) -> Self {
        value.points.to_vec()
    }
}

/// Laterality of the photographed hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

impl Handedness {
    /// Parse a detector label such as `"Left"`, `"right"` or `"L"`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "right" | "r" => Some(Self::Right),
            "left" | "l" => Some(Self::Left),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Right => "Right",
            Self::Left => "Left",
        }
    }
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(n: usize) -> Vec<[f32; 3]> {
        (0..n).map(|i| [i as f32 / 40.0, 0.5, 0.0]).collect()
    }

    #[test]
    fn from_triples_requires_exactly_21_points() {
        assert!(HandLandmarks::from_triples(&triples(21)).is_some());
        assert!(HandLandmarks::from_triples(&triples(20)).is_none());
        assert!(HandLandmarks::from_triples(&triples(22)).is_none());
    }

    #[test]
    fn from_triples_rejects_non_finite() {
        let mut t = triples(21);
        t[7][1] = f32::NAN;
        assert!(HandLandmarks::from_triples(&t).is_none());
    }

    #[test]
    fn pixel_scales_by_image_size_and_rejects_bad_index() {
        let lms = HandLandmarks::from_triples(&triples(21)).expect("landmarks");
        let p = lms.pixel(landmark::PINKY_MCP, 400, 200).expect("pixel");
        assert!((p.x - 170.0).abs() < 1e-4);
        assert!((p.y - 100.0).abs() < 1e-9);
        assert!(lms.pixel(LANDMARK_COUNT, 400, 200).is_none());
    }

    #[test]
    fn json_rejects_partial_pose() {
        let lms = HandLandmarks::from_triples(&triples(21)).expect("landmarks");
        let json = serde_json::to_string(&lms).expect("serialize");
        let back: HandLandmarks = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, lms);

        let partial = r#"[{"x":0.1,"y":0.2,"z":0.0}]"#;
        assert!(serde_json::from_str::<HandLandmarks>(partial).is_err());
    }

    #[test]
    fn handedness_labels() {
        assert_eq!(Handedness::from_label(" Left "), Some(Handedness::Left));
        assert_eq!(Handedness::from_label("R"), Some(Handedness::Right));
        assert_eq!(Handedness::from_label("both"), None);
        assert_eq!(Handedness::Left.to_string(), "Left");
    }
}
