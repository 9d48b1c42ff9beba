use orthofit_core::{HandLandmarks, Landmark};

/// Normalized `(x, y)` of an open right hand, palm to the camera, wrist at
/// the bottom of the frame.
const CANONICAL_RIGHT_HAND: [(f32, f32); 21] = [
    (0.500, 0.800), // wrist
    (0.440, 0.750),
    (0.390, 0.690),
    (0.350, 0.630),
    (0.320, 0.580), // thumb tip
    (0.440, 0.550), // index base
    (0.430, 0.450),
    (0.425, 0.390),
    (0.420, 0.340),
    (0.500, 0.540), // middle base
    (0.500, 0.430),
    (0.500, 0.360),
    (0.500, 0.300), // middle tip
    (0.555, 0.555),
    (0.565, 0.455),
    (0.570, 0.395),
    (0.575, 0.345),
    (0.600, 0.580), // little base
    (0.620, 0.500),
    (0.630, 0.455),
    (0.640, 0.410), // pinky tip
];

/// Fixed landmark layout used when no detection is available.
pub fn canonical_right_hand() -> HandLandmarks {
    HandLandmarks::new(CANONICAL_RIGHT_HAND.map(|(x, y)| Landmark::new(x, y, 0.0)))
}
