//! Calibration-square detection.
//!
//! A square of known side length, printed in a saturated color, is
//! photographed next to the hand. The detector:
//! 1. thresholds the image into a mask by an HSV band,
//! 2. closes then opens the mask so any pattern printed inside the square
//!    (e.g. a QR code) merges into one solid blob and speckle disappears,
//! 3. walks outer contours from the largest down, skipping small ones,
//! 4. accepts the first contour whose polygon approximation has exactly four
//!    vertices and a near-unit bounding-box aspect ratio.
//!
//! The accepted bounding box yields `scale_px_per_cm`.

mod detector;
mod mask;
mod params;
mod polygon;

pub use detector::{scale_from_box, BoundingBox, CalibrationResult, ColorSquareDetector};
pub use mask::{border_pad, clean_mask, marker_mask, pad_mask};
pub use params::{CalibrationError, CalibrationParams};
pub use polygon::approximate_closed_polygon;
