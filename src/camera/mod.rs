//! Camera pose access for the observed scene.
//!
//! The agent only ever touches the camera through [`CameraPoseTransport`]:
//! read the pose, write it back for a reset, or apply a relative
//! [`Movement`] expressed in the camera's own frame.

pub mod scene;
pub mod transform;

use serde::{Deserialize, Serialize};

pub use scene::{SceneCamera, SharedCamera};
pub use transform::Mat3;

/// World-space camera pose.
///
/// Serializes as `{"translation":[x,y,z],"rotation":[rx,ry,rz]}`, rotation in
/// degrees (X = pitch, Y = roll, Z = yaw).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
}

impl Pose {
    pub fn new(translation: [f64; 3], rotation: [f64; 3]) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

/// A relative camera move in camera-local terms.
///
/// Translations are centimeters, rotations degrees. Signs follow what a
/// viewer expects: `+right` strafes right, `+yaw` looks right, `+pitch`
/// looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Movement {
    pub forward: i32,
    pub upward: i32,
    pub right: i32,
    pub pitch: i32,
    pub yaw: i32,
}

impl Movement {
    /// The move that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            forward: -self.forward,
            upward: -self.upward,
            right: -self.right,
            pitch: -self.pitch,
            yaw: -self.yaw,
        }
    }

    pub fn has_translation(&self) -> bool {
        self.forward != 0 || self.upward != 0 || self.right != 0
    }

    pub fn has_rotation(&self) -> bool {
        self.pitch != 0 || self.yaw != 0
    }

    pub fn is_zero(&self) -> bool {
        !self.has_translation() && !self.has_rotation()
    }

    /// Euclidean length of the translation part.
    pub fn translation_magnitude(&self) -> f64 {
        let (f, u, r) = (
            f64::from(self.forward),
            f64::from(self.upward),
            f64::from(self.right),
        );
        (f * f + u * u + r * r).sqrt()
    }

    /// Pitch and yaw are independent axes, so their magnitudes add.
    pub fn rotation_magnitude(&self) -> f64 {
        f64::from(self.pitch).abs() + f64::from(self.yaw).abs()
    }
}

/// Read/write access to the single camera the agent drives.
pub trait CameraPoseTransport: Send {
    /// Current world-space translation and rotation.
    fn pose(&self) -> Pose;

    /// Overwrite translation and rotation, creating operators as needed.
    fn set_pose(&mut self, pose: Pose);

    /// Apply a camera-local move. Results are truncated to whole units.
    fn apply_delta(&mut self, movement: &Movement);
}
