use crate::pose::Pose;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Reference frame a center-space mirror reflects about: a world position
/// plus the up axis of the center entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirrorFrame {
    pub position: Vector3<f32>,
    pub up: Unit<Vector3<f32>>,
}

impl MirrorFrame {
    pub fn new(position: Vector3<f32>, up: Vector3<f32>) -> Self {
        Self {
            position,
            up: Unit::new_normalize(up),
        }
    }

    /// Frame of a center entity: its position and its local Z axis.
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            position: pose.position,
            up: pose.rotation * Vector3::z_axis(),
        }
    }

    /// Mirrors a world-space pose about this frame.
    ///
    /// The position is rotated half a turn around the up axis through the
    /// frame origin. The orientation delta is built from Euler angles taking
    /// half a turn per up-axis component (roll from X, pitch from Y, yaw from
    /// Z) and composed in front of the source rotation. For axis-aligned up
    /// vectors the delta is an involution, so mirroring twice is the
    /// identity.
    pub fn mirrored_pose(&self, pose: &Pose) -> Pose {
        let half_turn = UnitQuaternion::from_axis_angle(&self.up, PI);
        let position = half_turn * (pose.position - self.position) + self.position;

        let angles = self.up.into_inner() * PI;
        let delta = UnitQuaternion::from_euler_angles(angles.x, angles.y, angles.z);

        Pose {
            position,
            rotation: delta * pose.rotation,
        }
    }
}

/// Mirrors `pose` about `frame`, if one is set. An unconfigured mirror
/// produces nothing rather than an error.
pub fn mirrored_pose(pose: &Pose, frame: Option<&MirrorFrame>) -> Option<Pose> {
    frame.map(|frame| frame.mirrored_pose(pose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn absent_frame_yields_nothing() {
        let pose = Pose::from_position(Vector3::new(1.0, 2.0, 3.0));
        assert!(mirrored_pose(&pose, None).is_none());

        let frame = MirrorFrame::new(Vector3::zeros(), Vector3::z());
        assert!(mirrored_pose(&pose, Some(&frame)).is_some());
    }

    #[test]
    fn unit_offset_reflects_through_origin() {
        let frame = MirrorFrame::new(Vector3::zeros(), Vector3::z());
        let pose = Pose::from_position(Vector3::new(1.0, 0.0, 0.0));

        let mirrored = frame.mirrored_pose(&pose);

        assert_relative_eq!(
            mirrored.position,
            Vector3::new(-1.0, 0.0, 0.0),
            epsilon = 1.0e-5
        );

        // Identity orientation picks up the half-turn yaw delta.
        let expected = UnitQuaternion::from_euler_angles(0.0, 0.0, PI);
        assert!(mirrored.rotation.angle_to(&expected) < 1.0e-5);
    }

    #[test]
    fn offset_along_the_axis_is_preserved() {
        let frame = MirrorFrame::new(Vector3::new(0.0, 0.0, 2.0), Vector3::z());
        let pose = Pose::from_position(Vector3::new(1.0, 0.0, 0.0));

        let mirrored = frame.mirrored_pose(&pose);

        // X/Y reflect about the center, Z (along the axis) stays.
        assert_relative_eq!(
            mirrored.position,
            Vector3::new(-1.0, 0.0, 0.0),
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn mirroring_twice_restores_the_pose() {
        for up in [Vector3::x(), Vector3::y(), Vector3::z()] {
            let frame = MirrorFrame::new(Vector3::new(3.0, -1.0, 0.5), up);
            let pose = Pose::new(
                Vector3::new(1.0, 2.0, 3.0),
                UnitQuaternion::from_euler_angles(0.2, -0.4, 1.1),
            );

            let back = frame.mirrored_pose(&frame.mirrored_pose(&pose));
            assert!(back.approx_eq(&pose, 1.0e-4));
        }
    }

    #[test]
    fn positional_mirror_is_an_involution_for_any_axis() {
        let frame = MirrorFrame::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 2.0, -0.5));
        let pose = Pose::from_position(Vector3::new(-4.0, 0.25, 9.0));

        let back = frame.mirrored_pose(&frame.mirrored_pose(&pose));
        assert_relative_eq!(back.position, pose.position, epsilon = 1.0e-4);
    }

    #[test]
    fn frame_from_pose_uses_the_local_z_axis() {
        use std::f32::consts::FRAC_PI_2;

        // Center rolled a quarter turn about X: its up axis now points at -Y.
        let center = Pose::new(
            Vector3::new(5.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(FRAC_PI_2, 0.0, 0.0),
        );
        let frame = MirrorFrame::from_pose(&center);

        assert_relative_eq!(frame.position, center.position, epsilon = 1.0e-6);
        assert_relative_eq!(
            frame.up.into_inner(),
            Vector3::new(0.0, -1.0, 0.0),
            epsilon = 1.0e-6
        );
    }
}
