//! Binary mask construction for the calibration color.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use orthofit_core::rgb_to_hsv;

use crate::CalibrationParams;

/// Foreground (255) wherever the pixel's HSV value lies inside the band.
pub fn marker_mask(image: &RgbImage, params: &CalibrationParams) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let hsv = rgb_to_hsv(image.get_pixel(x, y).0);
        if hsv.in_band(params.hsv_lower, params.hsv_upper) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Zero margin that keeps [`clean_mask`] and contour tracing off the border.
pub fn border_pad(radius: u8, close_iterations: u32, open_iterations: u32) -> u32 {
    u32::from(radius) * close_iterations.max(open_iterations) + 1
}

/// Copy `mask` into the center of a zero canvas grown by `pad` on each side.
pub fn pad_mask(mask: &GrayImage, pad: u32) -> GrayImage {
    let mut out = GrayImage::new(mask.width() + 2 * pad, mask.height() + 2 * pad);
    image::imageops::replace(&mut out, mask, i64::from(pad), i64::from(pad));
    out
}

/// Closing then opening with iterated passes: `close_iterations` dilations
/// followed by as many erosions, then `open_iterations` erosions followed by
/// as many dilations.
///
/// Uses a square structuring element of side `2 * radius + 1`. Pixels outside
/// the image never erode the foreground, so pass a [`pad_mask`]ed mask when
/// blobs may sit near the border.
pub fn clean_mask(
    mask: &GrayImage,
    radius: u8,
    close_iterations: u32,
    open_iterations: u32,
) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let mut out = mask.clone();
    for _ in 0..close_iterations {
        out = dilate(&out, Norm::LInf, radius);
    }
    for _ in 0..close_iterations {
        out = erode(&out, Norm::LInf, radius);
    }
    for _ in 0..open_iterations {
        out = erode(&out, Norm::LInf, radius);
    }
    for _ in 0..open_iterations {
        out = dilate(&out, Norm::LInf, radius);
    }
    out
}
