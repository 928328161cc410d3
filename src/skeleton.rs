//! Empties for armature bones.
//!
//! Plans one empty per pose bone, placed at the bone's world-space head, so
//! the bones can be driven by copy-location constraints targeting the
//! empties (which in turn follow tracked markers).

use std::ops::RangeInclusive;

use nalgebra::{Matrix4, Point3};

use crate::{Error, Result};

/// Display size of generated empties.
pub const EMPTY_DRAW_SIZE: f64 = 0.02;

/// Scene layers empties may be placed on (1-based).
pub const EMPTY_LAYERS: RangeInclusive<u8> = 1..=20;

/// Layer used when none is chosen.
pub const DEFAULT_EMPTY_LAYER: u8 = 1;

/// A bone of an armature, with its rest matrix in armature space.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub matrix_local: Matrix4<f64>,
}

impl Bone {
    pub fn new(name: impl Into<String>, matrix_local: Matrix4<f64>) -> Self {
        Self {
            name: name.into(),
            matrix_local,
        }
    }
}

/// Where to create an empty, and which bone gets constrained to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyPlacement {
    /// Empty name: 1-based bone index.
    pub name: String,
    /// Bone that receives the copy-location constraint.
    pub bone: String,
    pub location: Point3<f64>,
    pub draw_size: f64,
    /// Scene layer, within [`EMPTY_LAYERS`].
    pub layer: u8,
}

/// Plan one empty per bone, in bone order.
///
/// Each location is the translation of `armature_world * bone.matrix_local`.
/// Fails with [`Error::InvalidConfig`] if `layer` is outside [`EMPTY_LAYERS`].
pub fn bone_empties(
    armature_world: &Matrix4<f64>,
    bones: &[Bone],
    layer: u8,
) -> Result<Vec<EmptyPlacement>> {
    if !EMPTY_LAYERS.contains(&layer) {
        return Err(Error::InvalidConfig(format!(
            "empty layer must be in {}..={}, got {}",
            EMPTY_LAYERS.start(),
            EMPTY_LAYERS.end(),
            layer
        )));
    }

    Ok(bones
        .iter()
        .enumerate()
        .map(|(i, bone)| {
            let world = armature_world * bone.matrix_local;
            let t = world.fixed_view::<3, 1>(0, 3);
            EmptyPlacement {
                name: (i + 1).to_string(),
                bone: bone.name.clone(),
                location: Point3::new(t[0], t[1], t[2]),
                draw_size: EMPTY_DRAW_SIZE,
                layer,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn test_identity_armature() {
        let bones = vec![
            Bone::new("hip", Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1.0))),
            Bone::new("knee", Matrix4::new_translation(&Vector3::new(0.1, 0.0, 0.5))),
        ];
        let empties = bone_empties(&Matrix4::identity(), &bones, DEFAULT_EMPTY_LAYER).unwrap();

        assert_eq!(empties.len(), 2);
        assert_eq!(empties[0].name, "1");
        assert_eq!(empties[0].bone, "hip");
        assert_eq!(empties[1].name, "2");
        assert_eq!(empties[1].location, Point3::new(0.1, 0.0, 0.5));
        assert_eq!(empties[1].draw_size, EMPTY_DRAW_SIZE);
        assert_eq!(empties[1].layer, 1);
    }

    #[test]
    fn test_armature_transform_applied() {
        let world = Matrix4::new_translation(&Vector3::new(2.0, 0.0, 0.0))
            * Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2)
                .to_homogeneous();
        let bones = vec![Bone::new("arm", Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)))];

        let empties = bone_empties(&world, &bones, 20).unwrap();
        // (1,0,0) rotated 90 degrees about z -> (0,1,0), then shifted by x+2
        assert_relative_eq!(empties[0].location.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(empties[0].location.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(empties[0].location.z, 0.0, epsilon = 1e-12);
        assert_eq!(empties[0].layer, 20);
    }

    #[test]
    fn test_no_bones() {
        assert!(bone_empties(&Matrix4::identity(), &[], DEFAULT_EMPTY_LAYER)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_layer_out_of_range() {
        let bones = vec![Bone::new("hip", Matrix4::identity())];
        assert!(matches!(
            bone_empties(&Matrix4::identity(), &bones, 0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(bone_empties(&Matrix4::identity(), &bones, 21).is_err());

        let empties = bone_empties(&Matrix4::identity(), &bones, 7).unwrap();
        assert_eq!(empties[0].layer, 7);
    }
}
