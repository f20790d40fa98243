//! CPU node picking.
//!
//! The pointer position is turned into a world-space ray through the camera
//! and tested against a small sphere around every node. The nearest hit in
//! front of the camera wins.

use glam::{Vec2, Vec3};

use crate::camera::CameraPose;
use crate::nodes::Node;

/// A ray from the camera through a screen position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickRay {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl PickRay {
    /// Ray through `pointer` (window pixels, origin top-left) for a
    /// perspective camera with vertical field of view `fov_degrees`.
    ///
    /// Returns `None` for an empty viewport.
    pub fn from_screen(pose: &CameraPose, fov_degrees: f32, pointer: Vec2, viewport: Vec2) -> Option<Self> {
        if !(viewport.x > 0.0 && viewport.y > 0.0) {
            return None;
        }

        let ndc = Vec2::new(
            pointer.x / viewport.x * 2.0 - 1.0,
            1.0 - pointer.y / viewport.y * 2.0,
        );
        let half_height = (fov_degrees.to_radians() * 0.5).tan();
        let aspect = viewport.x / viewport.y;
        let local = Vec3::new(ndc.x * half_height * aspect, ndc.y * half_height, -1.0);

        let direction = (pose.orientation * local).normalize_or_zero();
        if direction == Vec3::ZERO || !direction.is_finite() {
            return None;
        }
        Some(Self {
            origin: pose.position,
            direction,
        })
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first sphere surface point at or ahead
    /// of the origin.
    pub fn hit_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }

        let root = disc.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        // Origin inside the sphere
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }

    /// Id of the nearest node whose pick sphere the ray hits.
    pub fn pick(&self, nodes: &[Node], radius: f32) -> Option<usize> {
        nodes
            .iter()
            .filter_map(|n| self.hit_sphere(n.position, radius).map(|t| (n.id, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}
