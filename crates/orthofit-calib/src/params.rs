use serde::{Deserialize, Serialize};

/// Parameters for the color-square detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Inclusive lower HSV bound (hue in OpenCV `0..180` units).
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound.
    pub hsv_upper: [u8; 3],
    /// Square structuring element radius; side is `2 * r + 1`.
    pub kernel_radius: u8,
    pub close_iterations: u32,
    pub open_iterations: u32,
    /// Contours with a smaller enclosed area (px²) are ignored.
    pub min_area_px: f64,
    /// Polygon approximation tolerance relative to the contour perimeter.
    pub approx_epsilon_frac: f64,
    /// Accepted bounding-box `w / h` range.
    pub aspect_min: f64,
    pub aspect_max: f64,
    /// Physical side length of the printed square.
    pub marker_side_cm: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            hsv_lower: [90, 80, 50],
            hsv_upper: [130, 255, 255],
            kernel_radius: 7,
            close_iterations: 2,
            open_iterations: 1,
            min_area_px: 2000.0,
            approx_epsilon_frac: 0.02,
            aspect_min: 0.7,
            aspect_max: 1.3,
            marker_side_cm: 6.0,
        }
    }
}

/// Parameter validation errors.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CalibrationError {
    #[error("marker_side_cm must be > 0 (got {0})")]
    InvalidMarkerSide(f64),
    #[error("hsv band is empty: lower {lower:?} exceeds upper {upper:?}")]
    EmptyHsvBand { lower: [u8; 3], upper: [u8; 3] },
    #[error("aspect range [{min}, {max}] is empty or non-positive")]
    InvalidAspectRange { min: f64, max: f64 },
    #[error("approx_epsilon_frac must be in (0, 1)")]
    InvalidEpsilon,
}

impl CalibrationParams {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.marker_side_cm.is_finite() || self.marker_side_cm <= 0.0 {
            return Err(CalibrationError::InvalidMarkerSide(self.marker_side_cm));
        }
        if self
            .hsv_lower
            .iter()
            .zip(&self.hsv_upper)
            .any(|(lo, hi)| lo > hi)
        {
            return Err(CalibrationError::EmptyHsvBand {
                lower: self.hsv_lower,
                upper: self.hsv_upper,
            });
        }
        if !(self.aspect_min > 0.0 && self.aspect_min <= self.aspect_max) {
            return Err(CalibrationError::InvalidAspectRange {
                min: self.aspect_min,
                max: self.aspect_max,
            });
        }
        if !(self.approx_epsilon_frac > 0.0 && self.approx_epsilon_frac < 1.0) {
            return Err(CalibrationError::InvalidEpsilon);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(CalibrationParams::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_inverted_band_and_bad_side() {
        let params = CalibrationParams {
            hsv_lower: [140, 0, 0],
            ..CalibrationParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(CalibrationError::EmptyHsvBand { .. })
        ));

        let params = CalibrationParams {
            marker_side_cm: 0.0,
            ..CalibrationParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(CalibrationError::InvalidMarkerSide(0.0))
        );
    }
}
