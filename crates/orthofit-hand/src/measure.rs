use nalgebra::{distance, Point2};
use orthofit_core::{landmark, round_cm, HandLandmarks, Measurements, SizeTable};
use serde::{Deserialize, Serialize};

/// Errors that make a landmark set unusable for measuring.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MeasureError {
    #[error("landmark index {0} out of range")]
    LandmarkOutOfRange(usize),
    #[error("index-base and little-base landmarks coincide")]
    ZeroBaseDistance,
    #[error("scale must be finite and > 0 (got {0})")]
    InvalidScale(f64),
    #[error("image has zero size")]
    EmptyImage,
    #[error("{what} rounds to {value_cm} cm")]
    DegenerateMeasurement { what: &'static str, value_cm: f64 },
    #[error("{what} must be finite and > 0 (got {value})")]
    InvalidFactor { what: &'static str, value: f64 },
}

/// Empirical measurement constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureParams {
    /// Wrist width as a multiple of the index-base → little-base distance.
    pub wrist_factor: f64,
    /// Palm width as a multiple of the same base distance.
    pub palm_factor: f64,
    pub size_table: SizeTable,
    pub wrist_index: usize,
    pub index_base_index: usize,
    pub little_base_index: usize,
    pub middle_tip_index: usize,
}

impl Default for MeasureParams {
    fn default() -> Self {
        Self {
            wrist_factor: 0.9,
            palm_factor: 1.45,
            size_table: SizeTable::default(),
            wrist_index: landmark::WRIST,
            index_base_index: landmark::INDEX_MCP,
            little_base_index: landmark::PINKY_MCP,
            middle_tip_index: landmark::MIDDLE_TIP,
        }
    }
}

impl MeasureParams {
    pub fn validate(&self) -> Result<(), MeasureError> {
        for (what, value) in [
            ("wrist_factor", self.wrist_factor),
            ("palm_factor", self.palm_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MeasureError::InvalidFactor { what, value });
            }
        }
        Ok(())
    }
}

/// The four reference points in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ReferencePoints {
    pub wrist: Point2<f64>,
    pub index_base: Point2<f64>,
    pub little_base: Point2<f64>,
    pub middle_tip: Point2<f64>,
}

impl ReferencePoints {
    pub(crate) fn resolve(
        landmarks: &HandLandmarks,
        width: u32,
        height: u32,
        params: &MeasureParams,
    ) -> Result<Self, MeasureError> {
        let px = |index: usize| {
            landmarks
                .pixel(index, width, height)
                .ok_or(MeasureError::LandmarkOutOfRange(index))
        };
        Ok(Self {
            wrist: px(params.wrist_index)?,
            index_base: px(params.index_base_index)?,
            little_base: px(params.little_base_index)?,
            middle_tip: px(params.middle_tip_index)?,
        })
    }
}

fn positive_cm(what: &'static str, raw_cm: f64) -> Result<f64, MeasureError> {
    let value_cm = round_cm(raw_cm);
    if value_cm > 0.0 {
        Ok(value_cm)
    } else {
        Err(MeasureError::DegenerateMeasurement { what, value_cm })
    }
}

/// Calibrated wrist/palm/length measurements from a landmark set.
///
/// Wrist and palm widths are fixed multiples of the index-base to
/// little-base distance; hand length is the wrist to middle-tip distance.
/// All values are rounded to two decimals and must stay above zero.
pub fn compute_measurements(
    landmarks: &HandLandmarks,
    scale_px_per_cm: f64,
    width: u32,
    height: u32,
    params: &MeasureParams,
) -> Result<Measurements, MeasureError> {
    if !scale_px_per_cm.is_finite() || scale_px_per_cm <= 0.0 {
        return Err(MeasureError::InvalidScale(scale_px_per_cm));
    }
    if width == 0 || height == 0 {
        return Err(MeasureError::EmptyImage);
    }

    let pts = ReferencePoints::resolve(landmarks, width, height, params)?;
    let base_distance_px = distance(&pts.index_base, &pts.little_base);
    if base_distance_px <= f64::EPSILON {
        return Err(MeasureError::ZeroBaseDistance);
    }

    let wrist_px = base_distance_px * params.wrist_factor;
    let palm_px = base_distance_px * params.palm_factor;
    let length_px = distance(&pts.wrist, &pts.middle_tip);

    let wrist_width_cm = positive_cm("wrist width", wrist_px / scale_px_per_cm)?;
    let m = Measurements {
        wrist_width_cm,
        palm_width_cm: positive_cm("palm width", palm_px / scale_px_per_cm)?,
        hand_length_cm: positive_cm("hand length", length_px / scale_px_per_cm)?,
        scale_px_per_cm,
        size_class: params.size_table.classify(wrist_width_cm),
        base_distance_px: Some(base_distance_px),
    };
    log::debug!(
        "measure: base {base_distance_px:.1} px -> wrist {} cm, palm {} cm, length {} cm ({})",
        m.wrist_width_cm,
        m.palm_width_cm,
        m.hand_length_cm,
        m.size_class
    );
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use orthofit_core::{Landmark, SizeClass, LANDMARK_COUNT};

    /// Landmarks on a 1000×500 image with chosen pixel positions for the
    /// four reference points; everything else sits at the center.
    fn hand(
        wrist: (f32, f32),
        index: (f32, f32),
        little: (f32, f32),
        tip: (f32, f32),
    ) -> HandLandmarks {
        let norm = |(x, y): (f32, f32)| Landmark::new(x / 1000.0, y / 500.0, 0.0);
        let mut pts = [norm((500.0, 250.0)); LANDMARK_COUNT];
        pts[landmark::WRIST] = norm(wrist);
        pts[landmark::INDEX_MCP] = norm(index);
        pts[landmark::PINKY_MCP] = norm(little);
        pts[landmark::MIDDLE_TIP] = norm(tip);
        HandLandmarks::new(pts)
    }

    /// Base is a 96-128-160 triangle; length 300 px.
    fn standard_hand() -> HandLandmarks {
        hand((500.0, 450.0), (452.0, 210.0), (548.0, 338.0), (500.0, 150.0))
    }

    #[test]
    fn known_distances_give_expected_centimeters() {
        let lms = standard_hand();
        let m = compute_measurements(&lms, 20.0, 1000, 500, &MeasureParams::default())
            .expect("measurements");
        assert_relative_eq!(m.base_distance_px.expect("base"), 160.0, epsilon = 1e-3);
        assert_relative_eq!(m.wrist_width_cm, 7.2);
        assert_relative_eq!(m.palm_width_cm, 11.6);
        assert_relative_eq!(m.hand_length_cm, 15.0);
        assert_eq!(m.size_class, SizeClass::M);
        assert_relative_eq!(m.scale_px_per_cm, 20.0);
    }

    #[test]
    fn coincident_bases_are_rejected() {
        let base = (480.0, 250.0);
        let lms = hand((500.0, 450.0), base, base, (500.0, 150.0));
        assert_eq!(
            compute_measurements(&lms, 20.0, 1000, 500, &MeasureParams::default()),
            Err(MeasureError::ZeroBaseDistance)
        );
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let lms = standard_hand();
        let params = MeasureParams {
            middle_tip_index: 21,
            ..MeasureParams::default()
        };
        assert_eq!(
            compute_measurements(&lms, 20.0, 1000, 500, &params),
            Err(MeasureError::LandmarkOutOfRange(21))
        );
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let lms = standard_hand();
        assert!(matches!(
            compute_measurements(&lms, 0.0, 1000, 500, &MeasureParams::default()),
            Err(MeasureError::InvalidScale(_))
        ));
    }

    #[test]
    fn size_class_follows_wrist_width() {
        // base distance chosen so the wrist lands on 6, 8 and 10 cm at 10 px/cm
        for (base_px, expected) in [
            (600.0 / 9.0, SizeClass::P),
            (800.0 / 9.0, SizeClass::M),
            (1000.0 / 9.0, SizeClass::G),
        ] {
            let half = base_px as f32 / 2.0;
            let lms = hand(
                (500.0, 450.0),
                (500.0 - half, 250.0),
                (500.0 + half, 250.0),
                (500.0, 150.0),
            );
            let m = compute_measurements(&lms, 10.0, 1000, 500, &MeasureParams::default())
                .expect("measurements");
            assert_eq!(m.size_class, expected, "wrist {}", m.wrist_width_cm);
        }
    }

    #[test]
    fn zero_length_hand_is_rejected() {
        let tip = (500.0, 150.0);
        let lms = hand(tip, (452.0, 210.0), (548.0, 338.0), tip);
        assert_eq!(
            compute_measurements(&lms, 20.0, 1000, 500, &MeasureParams::default()),
            Err(MeasureError::DegenerateMeasurement {
                what: "hand length",
                value_cm: 0.0
            })
        );
    }

    #[test]
    fn widths_rounding_to_zero_are_rejected() {
        // 0.1 px base at 20 px/cm: every width rounds to 0.00 cm
        let lms = hand(
            (500.0, 450.0),
            (500.0, 250.0),
            (500.1, 250.0),
            (500.0, 150.0),
        );
        assert!(matches!(
            compute_measurements(&lms, 20.0, 1000, 500, &MeasureParams::default()),
            Err(MeasureError::DegenerateMeasurement {
                what: "wrist width",
                ..
            })
        ));
    }

    #[test]
    fn non_positive_factors_fail_validation() {
        assert_eq!(MeasureParams::default().validate(), Ok(()));
        let params = MeasureParams {
            wrist_factor: 0.0,
            ..MeasureParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(MeasureError::InvalidFactor {
                what: "wrist_factor",
                value: 0.0
            })
        );
        let params = MeasureParams {
            palm_factor: f64::NAN,
            ..MeasureParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MeasureError::InvalidFactor {
                what: "palm_factor",
                ..
            })
        ));
    }
}
