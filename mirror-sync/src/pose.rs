use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Position and orientation of an entity, in whatever space the caller is
/// working in (world or parent-relative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Composes `child` expressed in this pose's local frame into the frame
    /// this pose is expressed in.
    pub fn transform(&self, child: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * child.position,
            rotation: self.rotation * child.rotation,
        }
    }

    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            position: -(rotation * self.position),
            rotation,
        }
    }

    /// Per-component position comparison, the same contract engine vector
    /// equality uses.
    pub fn position_eq(&self, other: &Pose, tolerance: f32) -> bool {
        (self.position - other.position).amax() <= tolerance
    }

    /// Rotation comparison by angular distance.
    pub fn rotation_eq(&self, other: &Pose, tolerance: f32) -> bool {
        self.rotation.angle_to(&other.rotation) <= tolerance
    }

    pub fn approx_eq(&self, other: &Pose, tolerance: f32) -> bool {
        self.position_eq(other, tolerance) && self.rotation_eq(other, tolerance)
    }
}
