//! Synthetic viewport: a pinhole render of labeled boxes.
//!
//! Stands in for a 3D application's viewport so the control loop can run
//! end-to-end. Objects are camera-facing rectangles placed in a Z-up world;
//! the renderer reads the pose from the same [`SharedCamera`] the agent moves.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::backend::{CaptureBackend, CaptureResult, MockFramebuffer};
use super::types::SnapshotResult;
use crate::camera::{CameraPoseTransport, Pose, SceneCamera, SharedCamera};

/// Anything closer than this (cm) to the image plane is culled
const NEAR_PLANE: f64 = 10.0;
const HUD_FG: [u8; 3] = [230, 230, 230];
const HUD_BG: [u8; 3] = [20, 20, 20];

/// A labeled box facing the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub label: String,
    /// World-space center (cm)
    pub position: [f64; 3],
    /// Width and height (cm)
    pub size: [f64; 2],
    pub color: [u8; 3],
}

/// A scene file: objects plus the camera pose a run starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    pub start_pose: Pose,
    pub objects: Vec<SceneObject>,
}

fn default_background() -> [u8; 3] {
    [70, 80, 95]
}

impl Scene {
    /// Small factory floor with a red car in view of the start pose
    pub fn demo() -> Self {
        let object = |label: &str, position: [f64; 3], size: [f64; 2], color: [u8; 3]| SceneObject {
            label: label.to_string(),
            position,
            size,
            color,
        };
        Self {
            name: "demo-factory".to_string(),
            background: default_background(),
            start_pose: Pose::new([0.0, -1500.0, 170.0], [90.0, 0.0, 0.0]),
            objects: vec![
                object("car", [150.0, 400.0, 75.0], [450.0, 150.0], [200, 30, 30]),
                object("robot", [-700.0, 900.0, 100.0], [80.0, 200.0], [240, 160, 20]),
                object("column", [-900.0, 1800.0, 400.0], [60.0, 800.0], [150, 150, 150]),
                object("column", [900.0, 1800.0, 400.0], [60.0, 800.0], [150, 150, 150]),
                object("workstation", [1600.0, -200.0, 60.0], [200.0, 120.0], [40, 110, 200]),
            ],
        }
    }

    pub fn from_json_file(path: &Path) -> SnapshotResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Renders a [`Scene`] as seen from a [`SharedCamera`]
pub struct SceneViewport {
    scene: Scene,
    camera: SharedCamera,
    width: u32,
    height: u32,
    /// Focal length in pixels
    focal: f64,
}

impl SceneViewport {
    pub fn new(scene: Scene, camera: SharedCamera, width: u32, height: u32) -> Self {
        Self {
            scene,
            camera,
            width,
            height,
            focal: f64::from(width) * 0.8,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Project a world point to (screen x, screen y, depth)
    pub fn project(&self, camera: &SceneCamera, point: [f64; 3]) -> Option<(f64, f64, f64)> {
        let origin = camera.pose().translation;
        let offset = [
            point[0] - origin[0],
            point[1] - origin[1],
            point[2] - origin[2],
        ];
        let local = camera.local_to_world().transpose().transform(offset);
        let depth = -local[2];
        if depth < NEAR_PLANE {
            return None;
        }
        let sx = f64::from(self.width) / 2.0 + self.focal * local[0] / depth;
        let sy = f64::from(self.height) / 2.0 - self.focal * local[1] / depth;
        Some((sx, sy, depth))
    }

    /// Render the current view
    pub fn render(&self) -> MockFramebuffer {
        let camera = self.camera.snapshot();
        let mut fb = MockFramebuffer::with_color(self.width, self.height, self.scene.background);

        let mut visible: Vec<(&SceneObject, f64, f64, f64)> = self
            .scene
            .objects
            .iter()
            .filter_map(|obj| {
                self.project(&camera, obj.position)
                    .map(|(x, y, depth)| (obj, x, y, depth))
            })
            .collect();
        // Painter's order: far to near
        visible.sort_by(|a, b| b.3.total_cmp(&a.3));

        for (obj, cx, cy, depth) in visible {
            let w = self.focal * obj.size[0] / depth;
            let h = self.focal * obj.size[1] / depth;
            let left = cx - w / 2.0;
            let top = cy - h / 2.0;
            if let Some((x, y, cw, ch)) = self.clip(left, top, w, h) {
                fb.draw_rect(x, y, cw, ch, obj.color);
                if y >= 10 {
                    fb.draw_text(x, y - 10, &obj.label, HUD_FG, self.scene.background);
                }
            }
        }

        let pose = camera.pose();
        let hud = format!(
            "pos {:.0} {:.0} {:.0}  rot {:.0} {:.0} {:.0}",
            pose.translation[0],
            pose.translation[1],
            pose.translation[2],
            pose.rotation[0],
            pose.rotation[1],
            pose.rotation[2]
        );
        fb.draw_text(4, 4, &hud, HUD_FG, HUD_BG);
        fb
    }

    fn clip(&self, left: f64, top: f64, w: f64, h: f64) -> Option<(u32, u32, u32, u32)> {
        let x0 = left.max(0.0);
        let y0 = top.max(0.0);
        let x1 = (left + w).min(f64::from(self.width));
        let y1 = (top + h).min(f64::from(self.height));
        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

impl CaptureBackend for SceneViewport {
    fn capture(&mut self) -> SnapshotResult<CaptureResult> {
        Ok(CaptureResult {
            image_data: self.render().to_png()?,
            width: self.width,
            height: self.height,
        })
    }

    fn source_type(&self) -> &str {
        "scene"
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
