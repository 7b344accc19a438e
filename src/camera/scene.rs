//! In-process scene camera built from transform operators.
//!
//! A camera carries an optional translate operator and an optional
//! rotateXYZ operator. Moves create the translate operator on demand but
//! never create a rotation operator: a camera without one keeps its
//! orientation untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transform::Mat3;
use super::{CameraPoseTransport, Movement, Pose};

/// Camera described by its transform operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneCamera {
    translate: Option<[f64; 3]>,
    rotate_xyz: Option<[f64; 3]>,
}

impl SceneCamera {
    /// Camera with both operators set from `pose`.
    pub fn new(pose: Pose) -> Self {
        Self {
            translate: Some(pose.translation),
            rotate_xyz: Some(pose.rotation),
        }
    }

    /// Camera with a translate operator only.
    pub fn without_rotation(translation: [f64; 3]) -> Self {
        Self {
            translate: Some(translation),
            rotate_xyz: None,
        }
    }

    pub fn translate_op(&self) -> Option<[f64; 3]> {
        self.translate
    }

    pub fn rotate_op(&self) -> Option<[f64; 3]> {
        self.rotate_xyz
    }

    /// Rotational part of the local-to-world transform.
    pub fn local_to_world(&self) -> Mat3 {
        self.rotate_xyz
            .map(Mat3::from_euler_xyz_degrees)
            .unwrap_or(Mat3::IDENTITY)
    }
}

impl CameraPoseTransport for SceneCamera {
    fn pose(&self) -> Pose {
        Pose {
            translation: self.translate.unwrap_or_default(),
            rotation: self.rotate_xyz.unwrap_or_default(),
        }
    }

    fn set_pose(&mut self, pose: Pose) {
        self.translate = Some(pose.translation);
        self.rotate_xyz = Some(pose.rotation);
    }

    fn apply_delta(&mut self, movement: &Movement) {
        if movement.has_translation() {
            // Camera space: +X right, +Y up, looking down -Z.
            let local = [
                f64::from(movement.right),
                f64::from(movement.upward),
                -f64::from(movement.forward),
            ];
            let world = self.local_to_world().transform(local);
            let current = self.translate.unwrap_or_default();
            self.translate = Some([
                current[0].trunc() + world[0].trunc(),
                current[1].trunc() + world[1].trunc(),
                current[2].trunc() + world[2].trunc(),
            ]);
        }

        if movement.has_rotation() {
            match self.rotate_xyz {
                Some(current) => {
                    // Looking right is a negative turn about +Z.
                    self.rotate_xyz = Some([
                        current[0].trunc() + f64::from(movement.pitch),
                        current[1].trunc(),
                        current[2].trunc() - f64::from(movement.yaw),
                    ]);
                }
                None => debug!("camera has no rotateXYZ operator, skipping rotation"),
            }
        }
    }
}

/// A [`SceneCamera`] shared between the agent and a renderer.
#[derive(Debug, Clone, Default)]
pub struct SharedCamera(Arc<Mutex<SceneCamera>>);

impl SharedCamera {
    pub fn new(camera: SceneCamera) -> Self {
        Self(Arc::new(Mutex::new(camera)))
    }

    /// Copy of the current camera state.
    pub fn snapshot(&self) -> SceneCamera {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SceneCamera> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CameraPoseTransport for SharedCamera {
    fn pose(&self) -> Pose {
        self.lock().pose()
    }

    fn set_pose(&mut self, pose: Pose) {
        self.lock().set_pose(pose);
    }

    fn apply_delta(&mut self, movement: &Movement) {
        self.lock().apply_delta(movement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright_camera() -> SceneCamera {
        SceneCamera::new(Pose::new([100.0, 200.0, 150.0], [90.0, 0.0, 0.0]))
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let mut cam = SceneCamera::new(Pose::new([1.5, 2.5, 3.5], [90.25, 0.5, 10.75]));
        let before = cam.clone();
        cam.apply_delta(&Movement::default());
        assert_eq!(cam, before);
    }

    #[test]
    fn test_forward_follows_view_direction() {
        let mut cam = upright_camera();
        cam.apply_delta(&Movement {
            forward: 300,
            ..Default::default()
        });
        assert_eq!(cam.pose().translation, [100.0, 500.0, 150.0]);
        assert_eq!(cam.pose().rotation, [90.0, 0.0, 0.0]);
    }

    #[test]
    fn test_right_and_upward_signs() {
        let mut cam = upright_camera();
        cam.apply_delta(&Movement {
            right: 50,
            upward: 20,
            ..Default::default()
        });
        // Facing +Y with Z up, the camera's right is +X.
        assert_eq!(cam.pose().translation, [150.0, 200.0, 170.0]);
    }

    #[test]
    fn test_yaw_right_turns_clockwise() {
        let mut cam = upright_camera();
        cam.apply_delta(&Movement {
            yaw: 90,
            ..Default::default()
        });
        assert_eq!(cam.pose().rotation, [90.0, 0.0, -90.0]);
        assert_eq!(cam.pose().translation, [100.0, 200.0, 150.0]);

        cam.apply_delta(&Movement {
            forward: 100,
            ..Default::default()
        });
        assert_eq!(cam.pose().translation, [200.0, 200.0, 150.0]);
    }

    #[test]
    fn test_pitch_keeps_roll() {
        let mut cam = SceneCamera::new(Pose::new([0.0; 3], [80.0, 12.0, 30.0]));
        cam.apply_delta(&Movement {
            pitch: 15,
            ..Default::default()
        });
        assert_eq!(cam.pose().rotation, [95.0, 12.0, 30.0]);
    }

    #[test]
    fn test_results_truncate_to_whole_units() {
        let mut cam = SceneCamera::new(Pose::new([10.9, -3.7, 0.2], [90.6, 0.4, -20.8]));
        cam.apply_delta(&Movement {
            forward: 1,
            yaw: 1,
            ..Default::default()
        });
        let pose = cam.pose();
        for v in pose.translation.iter().chain(pose.rotation.iter()) {
            assert_eq!(v.fract(), 0.0, "{:?} not truncated", pose);
        }
        assert_eq!(pose.rotation, [90.0, 0.0, -21.0]);
    }

    #[test]
    fn test_inverse_translation_returns_to_truncated_pose() {
        let start = Pose::new([12.4, -7.9, 150.6], [75.0, 0.0, 33.0]);
        let mut cam = SceneCamera::new(start);
        let step = Movement {
            forward: 137,
            upward: -41,
            right: 58,
            ..Default::default()
        };
        cam.apply_delta(&step);
        cam.apply_delta(&step.inverse());
        let end = cam.pose().translation;
        for i in 0..3 {
            assert!((end[i] - start.translation[i]).abs() <= 1.0);
            assert_eq!(end[i], start.translation[i].trunc());
        }
    }

    #[test]
    fn test_inverse_rotation_returns_to_truncated_pose() {
        let start = Pose::new([0.0; 3], [88.5, 3.0, -12.25]);
        let mut cam = SceneCamera::new(start);
        let step = Movement {
            pitch: -17,
            yaw: 64,
            ..Default::default()
        };
        cam.apply_delta(&step);
        cam.apply_delta(&step.inverse());
        assert_eq!(cam.pose().rotation, [88.0, 3.0, -12.0]);
    }

    #[test]
    fn test_combined_move_translates_along_previous_heading() {
        let mut cam = SceneCamera::new(Pose::new([0.0; 3], [90.0, 0.0, 0.0]));
        let step = Movement {
            forward: 100,
            yaw: 90,
            ..Default::default()
        };
        cam.apply_delta(&step);
        assert_eq!(cam.pose(), Pose::new([0.0, 100.0, 0.0], [90.0, 0.0, -90.0]));

        // The inverse backs off along the new heading, so only the
        // orientation comes back.
        cam.apply_delta(&step.inverse());
        assert_eq!(cam.pose(), Pose::new([-100.0, 100.0, 0.0], [90.0, 0.0, 0.0]));
    }

    #[test]
    fn test_missing_rotation_operator_is_not_created() {
        let mut cam = SceneCamera::without_rotation([0.0, 0.0, 500.0]);
        cam.apply_delta(&Movement {
            forward: 100,
            pitch: 20,
            yaw: -30,
            ..Default::default()
        });
        // Without rotation the camera looks straight down world -Z.
        assert_eq!(cam.pose().translation, [0.0, 0.0, 400.0]);
        assert!(cam.rotate_op().is_none());
    }

    #[test]
    fn test_translate_operator_created_on_demand() {
        let mut cam = SceneCamera::default();
        assert!(cam.translate_op().is_none());
        cam.apply_delta(&Movement {
            right: 25,
            ..Default::default()
        });
        assert_eq!(cam.translate_op(), Some([25.0, 0.0, 0.0]));
    }

    #[test]
    fn test_set_pose_round_trip() {
        let mut cam = SceneCamera::default();
        let pose = Pose::new([1.25, -2.5, 300.0], [90.0, 0.0, 45.5]);
        cam.set_pose(pose);
        assert_eq!(cam.pose(), pose);
        assert!(cam.rotate_op().is_some());
    }

    #[test]
    fn test_shared_camera_sees_moves() {
        let shared = SharedCamera::new(upright_camera());
        let mut writer = shared.clone();
        writer.apply_delta(&Movement {
            forward: 10,
            ..Default::default()
        });
        assert_eq!(shared.pose().translation, [100.0, 210.0, 150.0]);
        assert_eq!(shared.snapshot().pose(), shared.pose());
    }
}
