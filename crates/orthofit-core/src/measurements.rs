use serde::{Deserialize, Serialize};

/// Discrete brace size bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SizeClass {
    PP,
    P,
    M,
    G,
    GG,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PP => "PP",
            Self::P => "P",
            Self::M => "M",
            Self::G => "G",
            Self::GG => "GG",
        }
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper wrist-width bound (inclusive) for one size class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeBand {
    pub max_wrist_cm: f64,
    pub class: SizeClass,
}

/// Wrist-width → size class lookup.
///
/// Bands are checked in ascending `max_wrist_cm` order; widths above every
/// band map to `above`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeTable {
    pub bands: Vec<SizeBand>,
    pub above: SizeClass,
}

impl Default for SizeTable {
    fn default() -> Self {
        Self {
            bands: vec![
                SizeBand {
                    max_wrist_cm: 7.0,
                    class: SizeClass::P,
                },
                SizeBand {
                    max_wrist_cm: 9.0,
                    class: SizeClass::M,
                },
            ],
            above: SizeClass::G,
        }
    }
}

impl SizeTable {
    pub fn classify(&self, wrist_width_cm: f64) -> SizeClass {
        self.bands
            .iter()
            .filter(|band| wrist_width_cm <= band.max_wrist_cm)
            .min_by(|a, b| a.max_wrist_cm.total_cmp(&b.max_wrist_cm))
            .map_or(self.above, |band| band.class)
    }
}

/// Round a centimeter value to two decimal places.
#[inline]
pub fn round_cm(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calibrated hand measurements for one photograph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub wrist_width_cm: f64,
    pub palm_width_cm: f64,
    pub hand_length_cm: f64,
    /// Scale the centimeter values were derived with.
    pub scale_px_per_cm: f64,
    pub size_class: SizeClass,
    /// Index-base to little-base distance in pixels, when landmarks were used.
    #[serde(default)]
    pub base_distance_px: Option<f64>,
}
