//! Measurement overlay drawn on the input photo.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use nalgebra::{Point2, Vector2};
use orthofit_calib::CalibrationResult;
use orthofit_core::{landmark, HandLandmarks, Measurements};
use serde::{Deserialize, Serialize};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    pub line_thickness: u32,
    pub landmark_radius: i32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            line_thickness: 3,
            landmark_radius: 4,
        }
    }
}

fn thick_line(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, thickness: u32, color: Rgb<u8>) {
    let d = b - a;
    let normal = if d.norm() > f64::EPSILON {
        Vector2::new(-d.y, d.x).normalize()
    } else {
        Vector2::zeros()
    };
    let t = thickness.max(1) as i32;
    for k in -(t - 1) / 2..=t / 2 {
        let o = normal * f64::from(k);
        let (p, q) = (a + o, b + o);
        draw_line_segment_mut(
            img,
            (p.x as f32, p.y as f32),
            (q.x as f32, q.y as f32),
            color,
        );
    }
}

/// Copy of `image` with the calibration outline (black), palm line
/// (blue), hand length (green), wrist width across landmark 0 (orange) and
/// every landmark (red) drawn on top.
pub fn annotate(
    image: &RgbImage,
    landmarks: &HandLandmarks,
    measurements: &Measurements,
    calibration: Option<&CalibrationResult>,
    style: &AnnotationStyle,
) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = image.dimensions();
    let thickness = style.line_thickness;

    if let Some(cal) = calibration {
        let pts: Vec<Point2<f64>> = cal.contour.iter().map(|p| p.cast::<f64>()).collect();
        for (i, &a) in pts.iter().enumerate() {
            let b = pts[(i + 1) % pts.len()];
            thick_line(&mut out, a, b, thickness, BLACK);
        }
    }

    let px = |i: usize| landmarks.pixel(i, w, h).unwrap_or_else(Point2::origin);
    let wrist = px(landmark::WRIST);
    let tip = px(landmark::MIDDLE_TIP);

    thick_line(
        &mut out,
        px(landmark::INDEX_MCP),
        px(landmark::PINKY_MCP),
        thickness,
        BLUE,
    );
    thick_line(&mut out, wrist, tip, thickness, GREEN);

    let axis = tip - wrist;
    if axis.norm() > f64::EPSILON {
        let across = Vector2::new(-axis.y, axis.x).normalize();
        let half = measurements.wrist_width_cm * measurements.scale_px_per_cm / 2.0;
        thick_line(
            &mut out,
            wrist - across * half,
            wrist + across * half,
            thickness,
            ORANGE,
        );
    }

    for p in landmarks.pixels(w, h) {
        draw_filled_circle_mut(
            &mut out,
            (p.x.round() as i32, p.y.round() as i32),
            style.landmark_radius,
            RED,
        );
    }
    out
}
