use orthofit_core::Handedness;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Axis, BraceMesh, MeshError};

/// Whether the thickness axis follows the in-plane scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThicknessMode {
    /// All three axes scale by the same factor.
    #[default]
    Uniform,
    /// Only the two in-plane axes scale; thickness stays as modelled.
    Planar,
}

/// Template-to-patient scaling constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Wrist circumference estimate as a multiple of wrist width.
    pub circumference_ratio: f64,
    /// Circumference the template was modelled for, in cm.
    pub template_circumference_cm: f64,
    pub thickness: ThicknessMode,
    pub thickness_axis: Axis,
    /// Axis negated for left hands.
    pub mirror_axis: Axis,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            circumference_ratio: 2.2,
            template_circumference_cm: 10.0,
            thickness: ThicknessMode::Uniform,
            thickness_axis: Axis::Z,
            mirror_axis: Axis::X,
        }
    }
}

impl MeshParams {
    pub fn validate(&self) -> Result<(), MeshError> {
        let ratio = self.circumference_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(MeshError::InvalidCircumferenceRatio(ratio));
        }
        let template = self.template_circumference_cm;
        if !template.is_finite() || template <= 0.0 {
            return Err(MeshError::InvalidTemplateCircumference(template));
        }
        Ok(())
    }
}

/// `circumference_ratio × wrist / template_circumference`.
pub fn scale_factor(wrist_width_cm: f64, params: &MeshParams) -> Result<f64, MeshError> {
    if !wrist_width_cm.is_finite() || wrist_width_cm <= 0.0 {
        return Err(MeshError::NonPositiveWristWidth(wrist_width_cm));
    }
    params.validate()?;
    Ok(params.circumference_ratio * wrist_width_cm / params.template_circumference_cm)
}

/// Patient-specific copy of `template`: scaled to the wrist width and
/// mirrored for a left hand.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(template, params), fields(faces = template.face_count()))
)]
pub fn fit_brace(
    template: &BraceMesh,
    wrist_width_cm: f64,
    handedness: Handedness,
    params: &MeshParams,
) -> Result<BraceMesh, MeshError> {
    template.validate()?;
    let factor = scale_factor(wrist_width_cm, params)?;

    let mut factors = [factor; 3];
    if params.thickness == ThicknessMode::Planar {
        factors[params.thickness_axis.index()] = 1.0;
    }
    let scaled = template.scaled(factors);
    log::info!(
        "brace: wrist {wrist_width_cm} cm -> factor {factor:.4} ({:?}), {handedness}",
        params.thickness
    );

    Ok(match handedness {
        Handedness::Right => scaled,
        Handedness::Left => scaled.mirrored(params.mirror_axis),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::tetrahedron;
    use approx::assert_relative_eq;

    #[test]
    fn factor_from_wrist_width() {
        let params = MeshParams::default();
        assert_relative_eq!(scale_factor(5.0, &params).unwrap(), 1.1, epsilon = 1e-12);
        assert_relative_eq!(scale_factor(7.2, &params).unwrap(), 1.584, epsilon = 1e-12);
    }

    #[test]
    fn factor_rejects_bad_inputs() {
        let params = MeshParams::default();
        for w in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                scale_factor(w, &params),
                Err(MeshError::NonPositiveWristWidth(_))
            ));
        }
        let bad = MeshParams {
            template_circumference_cm: 0.0,
            ..MeshParams::default()
        };
        assert!(matches!(
            scale_factor(7.0, &bad),
            Err(MeshError::InvalidTemplateCircumference(_))
        ));
    }

    #[test]
    fn non_positive_ratio_fails_validation() {
        assert!(MeshParams::default().validate().is_ok());
        for ratio in [0.0, -2.2, f64::NAN] {
            let params = MeshParams {
                circumference_ratio: ratio,
                ..MeshParams::default()
            };
            assert!(matches!(
                params.validate(),
                Err(MeshError::InvalidCircumferenceRatio(_))
            ));
            assert!(fit_brace(&tetrahedron(), 7.0, Handedness::Right, &params).is_err());
        }
    }

    #[test]
    fn unit_factor_right_hand_reproduces_template() {
        let params = MeshParams {
            circumference_ratio: 1.0,
            ..MeshParams::default()
        };
        let template = tetrahedron();
        let fitted = fit_brace(&template, 10.0, Handedness::Right, &params).unwrap();
        assert_eq!(fitted, template);
    }

    #[test]
    fn uniform_scales_thickness_planar_does_not() {
        let template = tetrahedron();
        let uniform = fit_brace(&template, 5.0, Handedness::Right, &MeshParams::default())
            .unwrap()
            .bounds()
            .unwrap();
        assert_relative_eq!(uniform.max.z, 1.1, epsilon = 1e-12);

        let params = MeshParams {
            thickness: ThicknessMode::Planar,
            ..MeshParams::default()
        };
        let planar = fit_brace(&template, 5.0, Handedness::Right, &params)
            .unwrap()
            .bounds()
            .unwrap();
        assert_relative_eq!(planar.max.x, 1.1, epsilon = 1e-12);
        assert_relative_eq!(planar.max.z, 1.0);
    }

    #[test]
    fn left_hand_is_mirrored_and_oriented() {
        let template = tetrahedron();
        let left = fit_brace(&template, 5.0, Handedness::Left, &MeshParams::default()).unwrap();
        let b = left.bounds().unwrap();
        assert_relative_eq!(b.min.x, -1.1, epsilon = 1e-12);
        assert_relative_eq!(b.max.x, 0.0);
        assert!(left.signed_volume() > 0.0);
        // template untouched
        assert_eq!(template, tetrahedron());
    }

    #[test]
    fn invalid_template_is_rejected() {
        let params = MeshParams::default();
        let err = fit_brace(&BraceMesh::new(), 7.0, Handedness::Right, &params).unwrap_err();
        assert!(matches!(err, MeshError::EmptyMesh));
    }
}
