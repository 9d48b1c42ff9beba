//! Silhouette-based refinement of wrist and palm widths.
//!
//! The fixed multipliers in [`compute_measurements`](crate::compute_measurements)
//! only approximate the true widths. Here the hand is segmented by skin
//! color and the silhouette is measured across the wrist (perpendicular to
//! the wrist → middle-tip axis) and across the palm (along the index-base →
//! little-base line). A measured width is accepted only when it stays
//! within `[min_ratio, max_ratio]` of the multiplier estimate.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use nalgebra::{Point2, Vector2};
use orthofit_core::{rgb_to_ycrcb, round_cm, HandLandmarks, Measurements};
use serde::{Deserialize, Serialize};

use crate::measure::{MeasureError, MeasureParams, ReferencePoints};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RefineError {
    #[error(transparent)]
    Measure(#[from] MeasureError),
    #[error("{0} anchor is not on the skin mask")]
    AnchorOffMask(&'static str),
    #[error("degenerate {0} axis")]
    DegenerateAxis(&'static str),
    #[error("{what} width {measured_px:.1} px implausible against estimate {estimate_px:.1} px")]
    Implausible {
        what: &'static str,
        measured_px: f64,
        estimate_px: f64,
    },
    #[error("{channel} band [{lo}, {hi}] is empty")]
    EmptySkinBand { channel: &'static str, lo: u8, hi: u8 },
    #[error("ratio range [{min}, {max}] is empty or non-positive")]
    InvalidRatioRange { min: f64, max: f64 },
}

/// Skin segmentation and silhouette scan settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    /// Inclusive Cr band for skin.
    pub cr_range: [u8; 2],
    /// Inclusive Cb band for skin.
    pub cb_range: [u8; 2],
    /// Morphology radius used to clean the skin mask (0 disables).
    pub kernel_radius: u8,
    /// Consecutive off-mask samples that end a scan.
    pub max_gap_px: u32,
    /// Search radius for an on-mask anchor around a landmark.
    pub anchor_search_px: i32,
    /// Accepted `measured / estimate` ratio range.
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            cr_range: [133, 173],
            cb_range: [77, 127],
            kernel_radius: 2,
            max_gap_px: 3,
            anchor_search_px: 4,
            min_ratio: 0.6,
            max_ratio: 1.6,
        }
    }
}

impl RefineParams {
    pub fn validate(&self) -> Result<(), RefineError> {
        for (channel, [lo, hi]) in [("Cr", self.cr_range), ("Cb", self.cb_range)] {
            if lo > hi {
                return Err(RefineError::EmptySkinBand { channel, lo, hi });
            }
        }
        let (min, max) = (self.min_ratio, self.max_ratio);
        if !(min > 0.0 && min <= max && max.is_finite()) {
            return Err(RefineError::InvalidRatioRange { min, max });
        }
        Ok(())
    }
}

/// Binary skin mask (255 = skin) cleaned by closing then opening.
pub fn skin_mask(image: &RgbImage, params: &RefineParams) -> GrayImage {
    let [cr_lo, cr_hi] = params.cr_range;
    let [cb_lo, cb_hi] = params.cb_range;
    let raw = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [_, cr, cb] = rgb_to_ycrcb(image.get_pixel(x, y).0);
        let skin = (cr_lo..=cr_hi).contains(&cr) && (cb_lo..=cb_hi).contains(&cb);
        Luma([if skin { 255 } else { 0 }])
    });
    if params.kernel_radius == 0 {
        return raw;
    }
    open(
        &close(&raw, Norm::LInf, params.kernel_radius),
        Norm::LInf,
        params.kernel_radius,
    )
}

fn on_mask(mask: &GrayImage, p: Point2<f64>) -> bool {
    let (x, y) = (p.x.round(), p.y.round());
    if x < 0.0 || y < 0.0 || x >= f64::from(mask.width()) || y >= f64::from(mask.height()) {
        return false;
    }
    mask.get_pixel(x as u32, y as u32).0[0] > 0
}

fn find_anchor(mask: &GrayImage, p: Point2<f64>, radius: i32) -> Option<Point2<f64>> {
    if on_mask(mask, p) {
        return Some(p);
    }
    let mut best: Option<(i32, Point2<f64>)> = None;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let q = Point2::new(p.x + f64::from(dx), p.y + f64::from(dy));
            let d2 = dx * dx + dy * dy;
            if on_mask(mask, q) && best.map_or(true, |(bd, _)| d2 < bd) {
                best = Some((d2, q));
            }
        }
    }
    best.map(|(_, q)| q)
}

/// Distance to the last on-mask sample walking from `start` along `dir`.
fn scan(mask: &GrayImage, start: Point2<f64>, dir: Vector2<f64>, max_gap: u32) -> f64 {
    let limit = f64::from(mask.width().max(mask.height()));
    let mut last_hit = 0.0;
    let mut gap = 0;
    let mut t = 1.0;
    while t <= limit {
        if on_mask(mask, start + dir * t) {
            last_hit = t;
            gap = 0;
        } else {
            gap += 1;
            if gap > max_gap {
                break;
            }
        }
        t += 1.0;
    }
    last_hit
}

/// Silhouette width through `center` along `dir`, in pixels (inclusive extent).
fn chord_width(mask: &GrayImage, center: Point2<f64>, dir: Vector2<f64>, max_gap: u32) -> f64 {
    scan(mask, center, dir, max_gap) + scan(mask, center, -dir, max_gap) + 1.0
}

fn check_ratio(
    what: &'static str,
    measured_px: f64,
    estimate_px: f64,
    params: &RefineParams,
) -> Result<f64, RefineError> {
    let ratio = measured_px / estimate_px;
    if ratio.is_finite() && (params.min_ratio..=params.max_ratio).contains(&ratio) {
        Ok(measured_px)
    } else {
        Err(RefineError::Implausible {
            what,
            measured_px,
            estimate_px,
        })
    }
}

/// Replace the multiplier-based wrist and palm widths in `base` by widths
/// measured on the skin silhouette.
///
/// Hand length and scale are kept from `base`; the size class is
/// re-derived from the refined wrist width.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(width = image.width(), height = image.height()))
)]
pub fn refine_measurements(
    image: &RgbImage,
    landmarks: &HandLandmarks,
    base: &Measurements,
    measure: &MeasureParams,
    params: &RefineParams,
) -> Result<Measurements, RefineError> {
    let (w, h) = image.dimensions();
    let pts = ReferencePoints::resolve(landmarks, w, h, measure)?;
    let base_px = base
        .base_distance_px
        .ok_or(RefineError::DegenerateAxis("palm"))?;

    let axis = pts.middle_tip - pts.wrist;
    if axis.norm() <= f64::EPSILON {
        return Err(RefineError::DegenerateAxis("hand"));
    }
    let axis = axis.normalize();
    let across_wrist = Vector2::new(-axis.y, axis.x);

    let palm_dir = pts.little_base - pts.index_base;
    if palm_dir.norm() <= f64::EPSILON {
        return Err(RefineError::DegenerateAxis("palm"));
    }
    let palm_dir = palm_dir.normalize();
    let palm_center = nalgebra::center(&pts.index_base, &pts.little_base);

    let mask = skin_mask(image, params);
    let wrist_anchor = find_anchor(&mask, pts.wrist, params.anchor_search_px)
        .ok_or(RefineError::AnchorOffMask("wrist"))?;
    let palm_anchor = find_anchor(&mask, palm_center, params.anchor_search_px)
        .ok_or(RefineError::AnchorOffMask("palm"))?;

    let wrist_px = check_ratio(
        "wrist",
        chord_width(&mask, wrist_anchor, across_wrist, params.max_gap_px),
        base_px * measure.wrist_factor,
        params,
    )?;
    let palm_px = check_ratio(
        "palm",
        chord_width(&mask, palm_anchor, palm_dir, params.max_gap_px),
        base_px * measure.palm_factor,
        params,
    )?;

    let scale = base.scale_px_per_cm;
    let wrist_width_cm = round_cm(wrist_px / scale);
    log::debug!(
        "refine: wrist {:.1} px ({} -> {wrist_width_cm} cm), palm {palm_px:.1} px",
        wrist_px,
        base.wrist_width_cm
    );
    Ok(Measurements {
        wrist_width_cm,
        palm_width_cm: round_cm(palm_px / scale),
        size_class: measure.size_table.classify(wrist_width_cm),
        ..base.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_measurements;
    use approx::assert_relative_eq;
    use image::Rgb;
    use orthofit_core::{landmark, Landmark, SizeClass, LANDMARK_COUNT};

    const SKIN: Rgb<u8> = Rgb([224, 172, 140]);
    const BACKGROUND: Rgb<u8> = Rgb([30, 90, 30]);

    fn fill(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, SKIN);
            }
        }
    }

    /// 400×400 frame: fingers 120 px, palm 140 px, wrist/forearm 100 px wide.
    fn hand_image() -> RgbImage {
        let mut img = RgbImage::from_pixel(400, 400, BACKGROUND);
        fill(&mut img, 140, 40, 260, 120);
        fill(&mut img, 130, 120, 270, 250);
        fill(&mut img, 150, 250, 250, 400);
        img
    }

    fn hand_landmarks() -> HandLandmarks {
        let norm = |x: f32, y: f32| Landmark::new(x / 400.0, y / 400.0, 0.0);
        let mut pts = [norm(200.0, 180.0); LANDMARK_COUNT];
        pts[landmark::WRIST] = norm(200.0, 300.0);
        pts[landmark::INDEX_MCP] = norm(150.0, 140.0);
        pts[landmark::PINKY_MCP] = norm(250.0, 140.0);
        pts[landmark::MIDDLE_TIP] = norm(200.0, 50.0);
        HandLandmarks::new(pts)
    }

    fn base(params: &MeasureParams) -> Measurements {
        compute_measurements(&hand_landmarks(), 20.0, 400, 400, params).expect("base")
    }

    #[test]
    fn skin_mask_separates_hand_from_background() {
        let mask = skin_mask(&hand_image(), &RefineParams::default());
        assert_eq!(mask.get_pixel(200, 300).0[0], 255);
        assert_eq!(mask.get_pixel(10, 10).0[0], 0);
        assert_eq!(mask.get_pixel(140, 300).0[0], 0);
    }

    #[test]
    fn refines_wrist_and_palm_to_silhouette() {
        let measure = MeasureParams::default();
        let base = base(&measure);
        assert_relative_eq!(base.wrist_width_cm, 4.5);

        let refined = refine_measurements(
            &hand_image(),
            &hand_landmarks(),
            &base,
            &measure,
            &RefineParams::default(),
        )
        .expect("refined");
        assert_relative_eq!(refined.wrist_width_cm, 5.0);
        assert_relative_eq!(refined.palm_width_cm, 7.0);
        assert_relative_eq!(refined.hand_length_cm, base.hand_length_cm);
        assert_eq!(refined.size_class, SizeClass::P);
    }

    #[test]
    fn implausible_width_is_rejected() {
        let measure = MeasureParams::default();
        let params = RefineParams {
            max_ratio: 1.05,
            ..RefineParams::default()
        };
        let err = refine_measurements(
            &hand_image(),
            &hand_landmarks(),
            &base(&measure),
            &measure,
            &params,
        )
        .expect_err("wrist is 100 px vs 90 px estimate");
        assert!(matches!(
            err,
            RefineError::Implausible { what: "wrist", .. }
        ));
    }

    #[test]
    fn settings_validation() {
        assert_eq!(RefineParams::default().validate(), Ok(()));

        let params = RefineParams {
            cb_range: [130, 120],
            ..RefineParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(RefineError::EmptySkinBand {
                channel: "Cb",
                lo: 130,
                hi: 120
            })
        );

        let params = RefineParams {
            min_ratio: 1.8,
            ..RefineParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(RefineError::InvalidRatioRange { min: 1.8, max: 1.6 })
        );
    }

    #[test]
    fn no_skin_means_no_anchor() {
        let measure = MeasureParams::default();
        let blank = RgbImage::from_pixel(400, 400, BACKGROUND);
        let err = refine_measurements(
            &blank,
            &hand_landmarks(),
            &base(&measure),
            &measure,
            &RefineParams::default(),
        )
        .expect_err("no skin");
        assert_eq!(err, RefineError::AnchorOffMask("wrist"));
    }
}
