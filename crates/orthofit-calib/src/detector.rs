use image::RgbImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::mask::{border_pad, clean_mask, marker_mask, pad_mask};
use crate::polygon::approximate_closed_polygon;
use crate::{CalibrationError, CalibrationParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Axis-aligned pixel bounding box (inclusive extent, OpenCV convention).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    fn of_points(points: &[Point<i32>]) -> Option<Self> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        Some(Self {
            x: u32::try_from(min_x).ok()?,
            y: u32::try_from(min_y).ok()?,
            w: u32::try_from(max_x - min_x + 1).ok()?,
            h: u32::try_from(max_y - min_y + 1).ok()?,
        })
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.w) / f64::from(self.h.max(1))
    }
}

/// `(w + h) / (2 * side_cm)`: mean box side in pixels per centimeter.
#[inline]
pub fn scale_from_box(bbox: &BoundingBox, marker_side_cm: f64) -> f64 {
    f64::from(bbox.w + bbox.h) / (2.0 * marker_side_cm)
}

/// An accepted calibration square.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Traced outer border of the square blob.
    pub contour: Vec<Point2<i32>>,
    /// Four-vertex approximation of `contour`.
    pub quad: [Point2<i32>; 4],
    pub bbox: BoundingBox,
    pub scale_px_per_cm: f64,
}

/// Detector for a single saturated-color calibration square.
#[derive(Clone, Debug)]
pub struct ColorSquareDetector {
    params: CalibrationParams,
}

impl ColorSquareDetector {
    pub fn new(params: CalibrationParams) -> Result<Self, CalibrationError> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Find the largest square-like blob of the calibration color.
    ///
    /// Returns `None` when no contour passes the area, vertex-count and
    /// aspect checks; callers fall back to a default scale.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image),
            fields(width = image.width(), height = image.height())
        )
    )]
    pub fn detect(&self, image: &RgbImage) -> Option<CalibrationResult> {
        let p = &self.params;
        let pad = border_pad(p.kernel_radius, p.close_iterations, p.open_iterations);
        let mask = clean_mask(
            &pad_mask(&marker_mask(image, p), pad),
            p.kernel_radius,
            p.close_iterations,
            p.open_iterations,
        );

        // contours are traced on the padded mask, then moved back into the image
        let offset = i32::try_from(pad).unwrap_or(i32::MAX);
        let max_x = (i32::try_from(image.width()).unwrap_or(i32::MAX) - 1).max(0);
        let max_y = (i32::try_from(image.height()).unwrap_or(i32::MAX) - 1).max(0);
        let unpad = |q: &Point<i32>| {
            Point::new(
                (q.x - offset).clamp(0, max_x),
                (q.y - offset).clamp(0, max_y),
            )
        };
        let mut candidates: Vec<(f64, Vec<Point<i32>>)> = find_contours::<i32>(&mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                let area = contour_area(&c.points).abs();
                (area, c.points.iter().map(unpad).collect())
            })
            .collect();
        if candidates.is_empty() {
            log::debug!("calibration: no colored blob found");
            return None;
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (area, points) in candidates {
            if area < p.min_area_px {
                // sorted by area: everything after is smaller
                break;
            }
            let epsilon = p.approx_epsilon_frac * arc_length(&points, true);
            let approx = approximate_closed_polygon(&points, epsilon);
            let Ok(quad) = <[Point<i32>; 4]>::try_from(approx.as_slice()) else {
                log::trace!(
                    "calibration: blob area {area:.0} has {} vertices",
                    approx.len()
                );
                continue;
            };
            let Some(bbox) = BoundingBox::of_points(&quad) else {
                continue;
            };
            let aspect = bbox.aspect_ratio();
            if aspect < p.aspect_min || aspect > p.aspect_max {
                log::trace!("calibration: quad aspect {aspect:.2} out of range");
                continue;
            }

            let scale_px_per_cm = scale_from_box(&bbox, p.marker_side_cm);
            log::debug!(
                "calibration: square {}x{} px at ({}, {}), {scale_px_per_cm:.2} px/cm",
                bbox.w,
                bbox.h,
                bbox.x,
                bbox.y
            );
            return Some(CalibrationResult {
                contour: points.iter().map(|q| Point2::new(q.x, q.y)).collect(),
                quad: quad.map(|q| Point2::new(q.x, q.y)),
                bbox,
                scale_px_per_cm,
            });
        }

        log::debug!("calibration: no blob passed the square test");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    const BLUE: Rgb<u8> = Rgb([30, 60, 200]);

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(320, 240, Rgb([235, 235, 230]))
    }

    fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, color);
            }
        }
    }

    fn detector() -> ColorSquareDetector {
        ColorSquareDetector::new(CalibrationParams::default()).expect("params")
    }

    #[test]
    fn scale_matches_box_formula() {
        let bbox = BoundingBox {
            x: 0,
            y: 0,
            w: 118,
            h: 122,
        };
        assert_relative_eq!(scale_from_box(&bbox, 6.0), 20.0);
        assert_relative_eq!(scale_from_box(&bbox, 4.0), 30.0);
    }

    #[test]
    fn detects_solid_square() {
        let mut img = canvas();
        fill(&mut img, 100, 60, 120, 120, BLUE);

        let res = detector().detect(&img).expect("square");
        assert_eq!(
            res.bbox,
            BoundingBox {
                x: 100,
                y: 60,
                w: 120,
                h: 120
            }
        );
        assert_relative_eq!(res.scale_px_per_cm, 20.0);
    }

    #[test]
    fn detects_square_with_inner_pattern() {
        let mut img = canvas();
        fill(&mut img, 100, 60, 120, 120, BLUE);
        for j in 0..8 {
            for i in 0..8 {
                if (i + j) % 2 == 0 {
                    let (x, y) = (120 + i * 10, 80 + j * 10);
                    fill(&mut img, x, y, 5, 5, Rgb([250, 250, 250]));
                }
            }
        }
        let res = detector().detect(&img).expect("square");
        assert_eq!(res.bbox.w, 120);
        assert_eq!(res.bbox.h, 120);
    }

    #[test]
    fn rejects_elongated_rectangle() {
        let mut img = canvas();
        fill(&mut img, 20, 80, 240, 80, BLUE);
        assert!(detector().detect(&img).is_none());
    }

    #[test]
    fn ignores_small_blobs() {
        let mut img = canvas();
        fill(&mut img, 40, 40, 30, 30, BLUE);
        assert!(detector().detect(&img).is_none());
    }

    #[test]
    fn picks_largest_square() {
        let mut img = canvas();
        fill(&mut img, 20, 20, 60, 60, BLUE);
        fill(&mut img, 150, 50, 100, 100, BLUE);
        let res = detector().detect(&img).expect("square");
        assert_eq!(res.bbox.x, 150);
        assert_eq!(res.bbox.w, 100);
    }

    #[test]
    fn detects_square_touching_the_border() {
        for off in [0u32, 3, 5] {
            let mut img = RgbImage::from_pixel(400, 400, Rgb([235, 235, 230]));
            fill(&mut img, off, off, 120, 120, BLUE);
            let res = detector()
                .detect(&img)
                .unwrap_or_else(|| panic!("square at offset {off}"));
            assert_eq!(
                res.bbox,
                BoundingBox {
                    x: off,
                    y: off,
                    w: 120,
                    h: 120
                },
                "offset {off}"
            );
            assert_relative_eq!(res.scale_px_per_cm, 20.0);
        }
    }

    #[test]
    fn square_flush_with_bottom_right_corner() {
        let mut img = canvas();
        fill(&mut img, 200, 120, 120, 120, BLUE);
        let res = detector().detect(&img).expect("square");
        assert_eq!((res.bbox.x, res.bbox.y), (200, 120));
        assert_eq!((res.bbox.w, res.bbox.h), (120, 120));
    }

    #[test]
    fn second_closing_pass_bridges_a_slot() {
        let mut img = canvas();
        fill(&mut img, 100, 60, 120, 120, BLUE);
        // 20 px wide notch cut down from the top edge
        fill(&mut img, 150, 60, 20, 60, Rgb([250, 250, 250]));

        let res = detector().detect(&img).expect("slot bridged");
        assert_eq!((res.bbox.w, res.bbox.h), (120, 120));

        let single = ColorSquareDetector::new(CalibrationParams {
            close_iterations: 1,
            ..CalibrationParams::default()
        })
        .expect("params");
        assert!(single.detect(&img).is_none());
    }

    #[test]
    fn blank_image_has_no_marker() {
        assert!(detector().detect(&canvas()).is_none());
    }
}
