//! First-person camera pose and the user-driven controller.
//!
//! The pose is a plain position/orientation pair shared by both camera
//! drivers. [`FirstPersonController`] owns everything that comes from the
//! user: held keys, drag state, smoothed yaw/pitch and pending zoom. It
//! receives [`InputEvent`]s one at a time and moves the pose once per tick.

use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::CameraConfig;
use crate::input::{InputEvent, KeyCode};

/// How pointer input turns the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlScheme {
    /// Drag to steer smoothed yaw/pitch targets. Q/E turn.
    #[default]
    DragOrbit,
    /// Click to capture the pointer, raw motion turns the camera directly.
    /// Q/E roll.
    PointerLockFreeFly,
}

/// Camera position and orientation in world space.
///
/// The camera looks down its local `-Z` axis with `+Y` up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl CameraPose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// A pose at `position` looking at `target`, or straight down `-Z` when
    /// the direction is degenerate.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let orientation = look_at_rotation(position, target, Vec3::Y).unwrap_or(Quat::IDENTITY);
        Self { position, orientation }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }

    /// World-to-view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }
}

impl Default for CameraPose {
    /// The start position, looking down `-Z`.
    fn default() -> Self {
        Self::new(CameraConfig::default().start_position, Quat::IDENTITY)
    }
}

/// Rotation that points the camera's `-Z` axis from `eye` toward `target`.
///
/// Returns `None` when `eye == target` or the view direction is parallel to
/// `up`.
pub fn look_at_rotation(eye: Vec3, target: Vec3, up: Vec3) -> Option<Quat> {
    let forward = (target - eye).normalize_or_zero();
    if forward == Vec3::ZERO {
        return None;
    }
    let right = forward.cross(up).normalize_or_zero();
    if right == Vec3::ZERO {
        return None;
    }
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize())
}

/// Keys whose press counts as user interaction.
fn is_control_key(key: KeyCode) -> bool {
    matches!(
        key,
        KeyCode::W
            | KeyCode::A
            | KeyCode::S
            | KeyCode::D
            | KeyCode::Q
            | KeyCode::E
            | KeyCode::Space
            | KeyCode::Shift
            | KeyCode::Control
    )
}

/// User-driven camera controller.
#[derive(Debug, Clone)]
pub struct FirstPersonController {
    scheme: ControlScheme,
    held: HashSet<KeyCode>,

    // Pointer
    pointer: Option<Vec2>,
    dragging: bool,
    drag_anchor: Option<Vec2>,
    look_engaged: bool,
    pending_look: Vec2,
    pending_zoom: f32,

    // Smoothed orientation for DragOrbit
    yaw: f32,
    pitch: f32,
    target_yaw: f32,
    target_pitch: f32,

    movement_speed: f32,
    turbo_multiplier: f32,
    smoothing: f32,
    keyboard_turn_speed: f32,
    drag_sensitivity: f32,
    drag_threshold: f32,
    pointer_sensitivity: f32,
    roll_step: f32,
    pitch_limit: f32,
    zoom_step: f32,
    pinch_zoom_factor: f32,
}

impl FirstPersonController {
    /// A controller whose yaw/pitch start from `pose`.
    pub fn new(config: &CameraConfig, pose: &CameraPose) -> Self {
        let mut controller = Self {
            scheme: config.scheme,
            held: HashSet::new(),
            pointer: None,
            dragging: false,
            drag_anchor: None,
            look_engaged: false,
            pending_look: Vec2::ZERO,
            pending_zoom: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            movement_speed: config.movement_speed,
            turbo_multiplier: config.turbo_multiplier,
            smoothing: config.smoothing,
            keyboard_turn_speed: config.keyboard_turn_speed,
            drag_sensitivity: config.drag_sensitivity,
            drag_threshold: config.drag_threshold,
            pointer_sensitivity: config.pointer_sensitivity,
            roll_step: config.roll_step,
            pitch_limit: config.pitch_limit,
            zoom_step: config.zoom_step,
            pinch_zoom_factor: config.pinch_zoom_factor,
        };
        controller.sync_from_pose(pose);
        controller
    }

    #[inline]
    pub fn scheme(&self) -> ControlScheme {
        self.scheme
    }

    /// Whether the host should keep the cursor captured.
    pub fn wants_pointer_lock(&self) -> bool {
        self.scheme == ControlScheme::PointerLockFreeFly && self.look_engaged
    }

    #[inline]
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Last reported pointer position in window pixels.
    #[inline]
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    /// Current and target yaw/pitch, in that order.
    pub fn angles(&self) -> (f32, f32, f32, f32) {
        (self.yaw, self.pitch, self.target_yaw, self.target_pitch)
    }

    /// Feed one event. Returns `true` when it counts as user interaction.
    pub fn apply(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::KeyDown(KeyCode::Escape) => {
                self.look_engaged = false;
                false
            }
            InputEvent::KeyDown(key) => {
                if !is_control_key(key) {
                    return false;
                }
                self.held.insert(key);
                true
            }
            InputEvent::KeyUp(key) => {
                self.held.remove(&key);
                false
            }
            InputEvent::PointerDown => {
                self.dragging = true;
                self.drag_anchor = self.pointer;
                if self.scheme == ControlScheme::PointerLockFreeFly {
                    self.look_engaged = true;
                }
                true
            }
            InputEvent::PointerUp => {
                self.dragging = false;
                self.drag_anchor = None;
                false
            }
            InputEvent::PointerMove { position } => {
                self.pointer = Some(position);
                if self.scheme != ControlScheme::DragOrbit || !self.dragging {
                    return false;
                }
                let Some(anchor) = self.drag_anchor else {
                    self.drag_anchor = Some(position);
                    return false;
                };
                let delta = position - anchor;
                if delta.x.abs() <= self.drag_threshold && delta.y.abs() <= self.drag_threshold {
                    return false;
                }
                self.target_yaw -= delta.x * self.drag_sensitivity;
                self.target_pitch = (self.target_pitch - delta.y * self.drag_sensitivity)
                    .clamp(-self.pitch_limit, self.pitch_limit);
                self.drag_anchor = Some(position);
                true
            }
            InputEvent::PointerDelta { delta } => {
                if !self.wants_pointer_lock() || delta == Vec2::ZERO {
                    return false;
                }
                self.pending_look += delta;
                true
            }
            InputEvent::Wheel(steps) => {
                if steps == 0.0 || !steps.is_finite() {
                    return false;
                }
                // One fixed step per event; scrolling toward the user moves forward
                self.pending_zoom -= steps.signum() * self.zoom_step;
                true
            }
            InputEvent::Pinch(delta) => {
                if !delta.is_finite() {
                    return false;
                }
                self.pending_zoom += delta * self.pinch_zoom_factor;
                true
            }
            InputEvent::FocusLost => {
                self.held.clear();
                self.dragging = false;
                self.drag_anchor = None;
                self.look_engaged = false;
                false
            }
        }
    }

    /// Re-seed yaw/pitch and their targets from an externally driven pose.
    pub fn sync_from_pose(&mut self, pose: &CameraPose) {
        let (yaw, pitch, _) = pose.orientation.to_euler(EulerRot::YXZ);
        self.yaw = yaw;
        self.pitch = pitch;
        self.target_yaw = yaw;
        self.target_pitch = pitch.clamp(-self.pitch_limit, self.pitch_limit);
        self.pending_look = Vec2::ZERO;
        self.pending_zoom = 0.0;
    }

    /// Move and turn `pose` by one frame of `dt` seconds.
    pub fn tick(&mut self, pose: &mut CameraPose, dt: f32) {
        match self.scheme {
            ControlScheme::DragOrbit => self.turn_smoothed(pose, dt),
            ControlScheme::PointerLockFreeFly => self.turn_free(pose),
        }

        let axis = |pos: KeyCode, neg: KeyCode| self.is_held(pos) as i32 as f32 - self.is_held(neg) as i32 as f32;
        let local = Vec3::new(
            axis(KeyCode::D, KeyCode::A),
            axis(KeyCode::Space, KeyCode::Shift),
            axis(KeyCode::S, KeyCode::W),
        )
        .normalize_or_zero();

        if local != Vec3::ZERO {
            let mut speed = self.movement_speed;
            if self.is_held(KeyCode::Control) {
                speed *= self.turbo_multiplier;
            }
            pose.position += pose.orientation * (local * speed * dt);
        }

        if self.pending_zoom != 0.0 {
            pose.position += pose.forward() * self.pending_zoom;
            self.pending_zoom = 0.0;
        }
    }

    fn turn_smoothed(&mut self, pose: &mut CameraPose, dt: f32) {
        let turn = self.keyboard_turn_speed * dt;
        if self.is_held(KeyCode::Q) {
            self.target_yaw += turn;
        }
        if self.is_held(KeyCode::E) {
            self.target_yaw -= turn;
        }

        self.yaw += (self.target_yaw - self.yaw) * self.smoothing;
        self.pitch += (self.target_pitch - self.pitch) * self.smoothing;
        pose.orientation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
    }

    fn turn_free(&mut self, pose: &mut CameraPose) {
        let mut orientation = pose.orientation;
        if self.pending_look != Vec2::ZERO {
            let look = self.pending_look * self.pointer_sensitivity;
            orientation = orientation * Quat::from_rotation_y(-look.x) * Quat::from_rotation_x(-look.y);
            self.pending_look = Vec2::ZERO;
        }
        if self.is_held(KeyCode::Q) {
            orientation *= Quat::from_rotation_z(self.roll_step);
        }
        if self.is_held(KeyCode::E) {
            orientation *= Quat::from_rotation_z(-self.roll_step);
        }
        pose.orientation = orientation.normalize();
    }
}
