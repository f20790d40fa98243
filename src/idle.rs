//! Scripted elliptical orbit that takes the camera over when nobody is
//! interacting.
//!
//! An episode starts with [`IdleOrbit::enter`], which freezes the current pose
//! and derives an ellipse around the vertical axis from it. From then on
//! [`IdleOrbit::update`] is a pure function of the time since entry, apart
//! from the per-tick smoothing toward the scripted target.

use serde::{Deserialize, Serialize};

use crate::camera::{look_at_rotation, CameraPose};
use crate::config::IdleConfig;
use crate::spawn::SwarmRng;
use crate::{Quat, Vec2, Vec3};

/// Shape of the angular speed ramp over the acceleration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrbitRamp {
    /// `θ0 + (ω/k)(1 − e^{−kt})`: fast start that levels off.
    #[default]
    Saturating,
    /// `θ0 + ω(t − (1 − e^{−kt})/k)`: starts at rest and approaches `ω`.
    SmoothStart,
}

/// Where an episode is in its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePhase {
    /// Position and orientation are still blending away from the entry pose.
    Entering,
    /// On the orbit, angular ramp still running.
    Accelerating,
    /// Constant angular speed.
    Steady,
}

/// Per-episode orbit parameters, fixed at entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitParams {
    pub ellipse_a: f32,
    pub ellipse_b: f32,
    /// Rotation of the ellipse about the vertical axis.
    pub rotation: f32,
    pub theta0: f32,
    pub height: f32,
    pub start_position: Vec3,
    pub start_orientation: Quat,
    /// Session time of entry.
    pub entered_at: f64,
}

/// The idle-orbit driver.
#[derive(Debug, Clone)]
pub struct IdleOrbit {
    params: Option<OrbitParams>,
    acceleration_time: f32,
    angular_speed: f32,
    ramp: OrbitRamp,
    blend_duration: f32,
    position_blend: f32,
    orientation_slerp: f32,
    ellipse_major: f32,
    ellipse_minor: f32,
    min_radius: f32,
}

impl IdleOrbit {
    pub fn new(config: &IdleConfig) -> Self {
        Self {
            params: None,
            acceleration_time: config.acceleration_time,
            angular_speed: config.angular_speed,
            ramp: config.ramp,
            blend_duration: config.blend_duration,
            position_blend: config.position_blend,
            orientation_slerp: config.orientation_slerp,
            ellipse_major: config.ellipse_major,
            ellipse_minor: config.ellipse_minor,
            min_radius: config.min_radius,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.params.is_some()
    }

    #[inline]
    pub fn params(&self) -> Option<&OrbitParams> {
        self.params.as_ref()
    }

    /// Start an episode from `pose` at session time `now`.
    pub fn enter(&mut self, pose: &CameraPose, now: f64, rng: &mut SwarmRng) -> &OrbitParams {
        let horizontal = Vec2::new(pose.position.x, pose.position.z);
        let mut radius = horizontal.length();
        let degenerate = !radius.is_finite() || radius < 1e-3;
        if degenerate {
            radius = self.min_radius;
        }

        let ellipse_a = self.ellipse_major * radius;
        let ellipse_b = self.ellipse_minor * radius;
        let rotation = rng.random_angle();

        // Ellipse parameter of the camera's own bearing
        let local = Vec2::from_angle(-rotation).rotate(horizontal);
        let theta0 = if degenerate {
            0.0
        } else {
            (local.y / ellipse_b).atan2(local.x / ellipse_a)
        };

        self.params.insert(OrbitParams {
            ellipse_a,
            ellipse_b,
            rotation,
            theta0,
            height: pose.position.y,
            start_position: pose.position,
            start_orientation: pose.orientation,
            entered_at: now,
        })
    }

    /// End the episode.
    pub fn exit(&mut self) {
        self.params = None;
    }

    /// Orbit angle `t` seconds after entry.
    pub fn angle(&self, t: f32) -> f32 {
        let theta0 = self.params.map_or(0.0, |p| p.theta0);
        let t_acc = self.acceleration_time;
        let omega = self.angular_speed;
        let k = 3.0 / t_acc;

        let ramp = |t: f32| match self.ramp {
            OrbitRamp::Saturating => (omega / k) * (1.0 - (-k * t).exp()),
            OrbitRamp::SmoothStart => omega * (t - (1.0 - (-k * t).exp()) / k),
        };

        if t < t_acc {
            theta0 + ramp(t)
        } else {
            theta0 + ramp(t_acc) + omega * (t - t_acc)
        }
    }

    /// Point on the ellipse for `angle`, at entry height.
    pub fn orbit_point(&self, angle: f32) -> Vec3 {
        let Some(p) = self.params else {
            return Vec3::ZERO;
        };
        let local = Vec2::new(p.ellipse_a * angle.cos(), p.ellipse_b * angle.sin());
        let world = Vec2::from_angle(p.rotation).rotate(local);
        Vec3::new(world.x, p.height, world.y)
    }

    /// Scripted orbit point `t` seconds after entry.
    #[inline]
    pub fn target_at(&self, t: f32) -> Vec3 {
        self.orbit_point(self.angle(t))
    }

    pub fn phase(&self, t: f32) -> IdlePhase {
        if t < self.blend_duration {
            IdlePhase::Entering
        } else if t < self.acceleration_time {
            IdlePhase::Accelerating
        } else {
            IdlePhase::Steady
        }
    }

    /// Seconds since entry at session time `now`.
    pub fn elapsed(&self, now: f64) -> Option<f32> {
        self.params.map(|p| (now - p.entered_at).max(0.0) as f32)
    }

    /// Drive `pose` for session time `now`. Does nothing when inactive.
    pub fn update(&self, pose: &mut CameraPose, now: f64) -> Option<IdlePhase> {
        let p = self.params?;
        let t = (now - p.entered_at).max(0.0) as f32;
        let target = self.target_at(t);
        let blending = t < self.blend_duration;

        if blending {
            let s = t / self.blend_duration;
            let blended = p.start_position.lerp(target, s);
            pose.position = pose.position.lerp(blended, self.position_blend);
        } else {
            pose.position = target;
        }

        let look = look_at_rotation(pose.position, Vec3::ZERO, Vec3::Y).unwrap_or(pose.orientation);
        let wanted = if blending {
            p.start_orientation.slerp(look, t / self.blend_duration)
        } else {
            look
        };
        pose.orientation = pose.orientation.slerp(wanted, self.orientation_slerp).normalize();

        Some(self.phase(t))
    }
}
