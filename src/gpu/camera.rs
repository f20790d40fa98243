//! Projection for the first-person camera.

use glam::{Mat4, Vec3};

use crate::camera::CameraPose;
use crate::config::CameraConfig;

/// Perspective lens parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCamera {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl RenderCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
        }
    }

    /// Calculate the projection matrix for the given aspect ratio.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far)
    }

    /// Combined view-projection for `pose`.
    pub fn view_proj(&self, pose: &CameraPose, aspect: f32) -> Mat4 {
        self.projection(aspect) * pose.view_matrix()
    }

    /// World-space right and up vectors, used to face billboards at the camera.
    pub fn billboard_axes(pose: &CameraPose) -> (Vec3, Vec3) {
        (pose.right(), pose.up())
    }
}

impl Default for RenderCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec4};

    #[test]
    fn test_point_ahead_is_visible() {
        let camera = RenderCamera::default();
        let pose = CameraPose::looking_at(Vec3::new(0.0, 50.0, 400.0), Vec3::ZERO);
        let clip = camera.view_proj(&pose, 16.0 / 9.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;

        assert!(clip.w > 0.0);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_point_behind_is_clipped() {
        let camera = RenderCamera::default();
        let pose = CameraPose::new(Vec3::ZERO, Quat::IDENTITY);
        let clip = camera.view_proj(&pose, 1.0) * Vec4::new(0.0, 0.0, 10.0, 1.0);
        assert!(clip.w < 0.0);
    }

    #[test]
    fn test_far_plane() {
        let camera = RenderCamera::default();
        let pose = CameraPose::new(Vec3::ZERO, Quat::IDENTITY);
        let clip = camera.view_proj(&pose, 1.0) * Vec4::new(0.0, 0.0, -3500.0, 1.0);
        assert!(clip.z / clip.w > 1.0);
    }
}
