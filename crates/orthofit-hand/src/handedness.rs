use orthofit_core::{landmark, HandLandmarks, Handedness};

/// Laterality from the thumb tip / pinky tip horizontal order.
///
/// Thumb tip left of the pinky tip reads as a right hand, anything else as a
/// left hand. This assumes the usual capture pose (palm towards the camera,
/// fingers up and spread); rotated or back-of-hand photos can invert it.
/// The estimator's label only feeds the log.
pub fn reconcile_handedness(landmarks: &HandLandmarks, raw: Handedness) -> Handedness {
    let (Some(thumb), Some(pinky)) = (
        landmarks.get(landmark::THUMB_TIP),
        landmarks.get(landmark::PINKY_TIP),
    ) else {
        return raw;
    };

    let reconciled = if thumb.x < pinky.x {
        Handedness::Right
    } else {
        Handedness::Left
    };
    if reconciled != raw {
        log::info!(
            "handedness: estimator said {raw}, thumb x={:.3} pinky x={:.3} -> {reconciled}",
            thumb.x,
            pinky.x
        );
    }
    reconciled
}
