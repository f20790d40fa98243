//! Tunables for a swarm session.
//!
//! Every constant the simulation, camera and idle orbit use lives here so a
//! session can be reproduced from a JSON file. Missing keys fall back to the
//! defaults below.
//!
//! ```json
//! {
//!   "seed": 7,
//!   "simulation": { "num_points": 500, "sphere_radius": 1200.0 },
//!   "camera": { "scheme": "pointer_lock_free_fly" },
//!   "idle": { "idle_delay": 20.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::camera::ControlScheme;
use crate::error::ConfigError;
use crate::idle::OrbitRamp;
use crate::Vec3;

/// Node pool and integration settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of nodes in the fixed pool.
    pub num_points: usize,
    /// Radius of the boundary sphere.
    pub sphere_radius: f32,
    /// Velocity cap, in units per tick.
    pub max_speed: f32,
    /// Magnitude of the per-tick random velocity jitter.
    pub accel_factor: f32,
    /// Half-width of the initial per-axis velocity range.
    pub initial_speed: f32,
    /// Whether the random walk runs at all.
    pub jitter: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_points: 300,
            sphere_radius: 1500.0,
            max_speed: 1.9,
            accel_factor: 0.04,
            initial_speed: 0.5,
            jitter: true,
        }
    }
}

/// Proximity connection settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Pairs closer than this are connected.
    pub connect_dist: f32,
    /// Lower bound of a fresh sticky timer, in seconds.
    pub sticky_min: f32,
    /// Upper bound (exclusive) of a fresh sticky timer, in seconds.
    pub sticky_max: f32,
    /// Fixed amount removed from a running sticky timer each tick.
    pub sticky_decrement: f32,
    /// Per-tick probability that an idle connection re-arms its timer.
    pub rearm_chance: f32,
    /// Fraction of the way each velocity moves toward the pair average.
    pub cohesion: f32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_dist: 300.0,
            sticky_min: 0.5,
            sticky_max: 2.0,
            sticky_decrement: 1.0 / 60.0,
            rearm_chance: 0.005,
            cohesion: 0.02,
        }
    }
}

/// First-person camera settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub scheme: ControlScheme,
    pub start_position: Vec3,
    /// Units per second.
    pub movement_speed: f32,
    /// Speed multiplier while the turbo key is held.
    pub turbo_multiplier: f32,
    /// Per-tick approach factor of yaw/pitch toward their targets.
    pub smoothing: f32,
    /// Radians per second for keyboard yaw.
    pub keyboard_turn_speed: f32,
    /// Radians per pixel of drag.
    pub drag_sensitivity: f32,
    /// Drag moves at or below this many pixels on both axes are ignored.
    pub drag_threshold: f32,
    /// Radians per pixel of raw pointer motion.
    pub pointer_sensitivity: f32,
    /// Radians of roll per tick while a roll key is held.
    pub roll_step: f32,
    /// Pitch target limit in radians.
    pub pitch_limit: f32,
    /// Units moved per wheel step.
    pub zoom_step: f32,
    /// Units moved per unit of pinch scale change.
    pub pinch_zoom_factor: f32,
    /// Radius of the sphere around each node that the pointer ray can hit.
    pub pick_radius: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            scheme: ControlScheme::DragOrbit,
            start_position: Vec3::new(0.0, 50.0, 400.0),
            movement_speed: 300.0,
            turbo_multiplier: 3.0,
            smoothing: 0.1,
            keyboard_turn_speed: 1.0,
            drag_sensitivity: 0.002,
            drag_threshold: 2.0,
            pointer_sensitivity: 0.002,
            roll_step: 0.02,
            pitch_limit: 1.5,
            zoom_step: 20.0,
            pinch_zoom_factor: 20.0,
            pick_radius: 2.0,
            fov_degrees: 75.0,
            near: 0.1,
            far: 3000.0,
        }
    }
}

/// Idle orbit settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdleConfig {
    /// Seconds without interaction before the orbit takes over.
    pub idle_delay: f64,
    /// Length of the angular ramp, in seconds.
    pub acceleration_time: f32,
    /// Steady angular speed, in radians per second.
    pub angular_speed: f32,
    pub ramp: OrbitRamp,
    /// Length of the blend-in window, in seconds.
    pub blend_duration: f32,
    /// Per-tick approach factor of the position during blend-in.
    pub position_blend: f32,
    /// Per-tick slerp factor toward the target orientation.
    pub orientation_slerp: f32,
    /// Semi-major axis as a multiple of the entry radius.
    pub ellipse_major: f32,
    /// Semi-minor axis as a multiple of the entry radius.
    pub ellipse_minor: f32,
    /// Entry radius used when the camera is on the vertical axis.
    pub min_radius: f32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_delay: 10.0,
            acceleration_time: 15.0,
            angular_speed: 0.03,
            ramp: OrbitRamp::Saturating,
            blend_duration: 3.0,
            position_blend: 0.05,
            orientation_slerp: 0.05,
            ellipse_major: 1.6,
            ellipse_minor: 0.8,
            min_radius: 100.0,
        }
    }
}

/// Animated label settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelConfig {
    /// Labels closer than this to the camera are shown and animated.
    pub display_dist: f32,
    pub code_length: usize,
    /// Label anchor relative to its node.
    pub offset: Vec3,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            display_dist: 200.0,
            code_length: 6,
            offset: Vec3::new(10.0, 10.0, 0.0),
        }
    }
}

/// Complete session configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwarmConfig {
    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
    pub simulation: SimulationConfig,
    pub connections: ConnectionConfig,
    pub camera: CameraConfig,
    pub idle: IdleConfig,
    pub labels: LabelConfig,
}

impl SwarmConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SwarmConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        let conn = &self.connections;
        let idle = &self.idle;

        positive("simulation.sphere_radius", sim.sphere_radius)?;
        positive("simulation.max_speed", sim.max_speed)?;
        non_negative("simulation.accel_factor", sim.accel_factor)?;
        non_negative("simulation.initial_speed", sim.initial_speed)?;
        if sim.num_points == 0 {
            return Err(ConfigError::Invalid("simulation.num_points must be at least 1".into()));
        }

        positive("connections.connect_dist", conn.connect_dist)?;
        positive("connections.sticky_min", conn.sticky_min)?;
        positive("connections.sticky_decrement", conn.sticky_decrement)?;
        if conn.sticky_max <= conn.sticky_min {
            return Err(ConfigError::Invalid(
                "connections.sticky_max must exceed connections.sticky_min".into(),
            ));
        }
        unit("connections.rearm_chance", conn.rearm_chance)?;
        unit("connections.cohesion", conn.cohesion)?;

        if !(idle.idle_delay.is_finite() && idle.idle_delay > 0.0) {
            return Err(ConfigError::Invalid("idle.idle_delay must be positive".into()));
        }
        positive("idle.acceleration_time", idle.acceleration_time)?;
        non_negative("idle.angular_speed", idle.angular_speed)?;
        positive("idle.ellipse_major", idle.ellipse_major)?;
        positive("idle.ellipse_minor", idle.ellipse_minor)?;
        positive("idle.blend_duration", idle.blend_duration)?;
        positive("idle.min_radius", idle.min_radius)?;
        unit("idle.position_blend", idle.position_blend)?;
        unit("idle.orientation_slerp", idle.orientation_slerp)?;

        let cam = &self.camera;
        if !cam.start_position.is_finite() {
            return Err(ConfigError::Invalid("camera.start_position must be finite".into()));
        }
        non_negative("camera.movement_speed", cam.movement_speed)?;
        non_negative("camera.turbo_multiplier", cam.turbo_multiplier)?;
        non_negative("camera.keyboard_turn_speed", cam.keyboard_turn_speed)?;
        non_negative("camera.drag_sensitivity", cam.drag_sensitivity)?;
        non_negative("camera.drag_threshold", cam.drag_threshold)?;
        non_negative("camera.pointer_sensitivity", cam.pointer_sensitivity)?;
        non_negative("camera.roll_step", cam.roll_step)?;
        non_negative("camera.pitch_limit", cam.pitch_limit)?;
        non_negative("camera.zoom_step", cam.zoom_step)?;
        non_negative("camera.pinch_zoom_factor", cam.pinch_zoom_factor)?;
        non_negative("camera.pick_radius", cam.pick_radius)?;
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid("camera.fov_degrees must lie in (0, 180)".into()));
        }
        unit("camera.smoothing", self.camera.smoothing)?;
        positive("camera.far", self.camera.far)?;
        if self.camera.near <= 0.0 || self.camera.near >= self.camera.far {
            return Err(ConfigError::Invalid("camera.near must lie in (0, camera.far)".into()));
        }

        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must not be negative, got {}", name, value)))
    }
}

fn unit(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must lie in [0, 1], got {}", name, value)))
    }
}
