//! Input collection for the swarm session.
//!
//! Window callbacks never touch simulation state. They translate raw winit
//! events into [`InputEvent`]s and queue them, stamped with the session time,
//! in an [`InputInbox`]. The session drains the inbox once at the start of each
//! tick, which is also the only place the [`InteractionClock`] is written.

use glam::Vec2;
use std::collections::VecDeque;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Left, // Default for other buttons
        }
    }
}

/// Keys the camera responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    W, A, S, D,
    Q, E,
    Space, Shift, Control,
    Escape,

    // Other
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::KeyW => KeyCode::W,
            WinitKeyCode::KeyA => KeyCode::A,
            WinitKeyCode::KeyS => KeyCode::S,
            WinitKeyCode::KeyD => KeyCode::D,
            WinitKeyCode::KeyQ => KeyCode::Q,
            WinitKeyCode::KeyE => KeyCode::E,
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::ShiftLeft | WinitKeyCode::ShiftRight => KeyCode::Shift,
            WinitKeyCode::ControlLeft | WinitKeyCode::ControlRight => KeyCode::Control,
            WinitKeyCode::Escape => KeyCode::Escape,

            _ => KeyCode::Other(key as u32),
        }
    }
}

/// A device-independent input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    /// Primary pointer (left mouse button or first touch) went down at the
    /// last reported pointer position.
    PointerDown,
    PointerUp,
    /// Absolute pointer position in window pixels.
    PointerMove { position: Vec2 },
    /// Raw relative motion, used while the pointer is locked.
    PointerDelta { delta: Vec2 },
    /// Wheel steps, positive away from the user.
    Wheel(f32),
    /// Incremental pinch magnification, positive when spreading.
    Pinch(f32),
    /// The window lost keyboard focus; held keys will never see a release.
    FocusLost,
}

/// An event and the session time it arrived at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedInput {
    pub event: InputEvent,
    pub at: f64,
}

/// Queue of input waiting for the next tick.
#[derive(Debug, Default)]
pub struct InputInbox {
    queue: VecDeque<TimedInput>,
    // Touch id currently acting as the pointer
    touch_id: Option<u64>,
}

impl InputInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event stamped with session time `at`.
    pub fn push(&mut self, event: InputEvent, at: f64) {
        self.queue.push_back(TimedInput { event, at });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every queued event in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = TimedInput> + '_ {
        self.queue.drain(..)
    }

    /// Translate a winit window event and queue the result, if any.
    pub fn handle_window_event(&mut self, event: &WindowEvent, at: f64) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        // Repeats are dropped; held state lives in the controller
                        ElementState::Pressed if !event.repeat => self.push(InputEvent::KeyDown(key), at),
                        ElementState::Pressed => {}
                        ElementState::Released => self.push(InputEvent::KeyUp(key), at),
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if MouseButton::from(*button) != MouseButton::Left {
                    return;
                }
                match state {
                    ElementState::Pressed => self.push(InputEvent::PointerDown, at),
                    ElementState::Released => self.push(InputEvent::PointerUp, at),
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.push(InputEvent::PointerMove { position }, at);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                if steps != 0.0 {
                    self.push(InputEvent::Wheel(steps), at);
                }
            }

            WindowEvent::Touch(touch) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started if self.touch_id.is_none() => {
                        self.touch_id = Some(touch.id);
                        self.push(InputEvent::PointerMove { position }, at);
                        self.push(InputEvent::PointerDown, at);
                    }
                    TouchPhase::Moved if self.touch_id == Some(touch.id) => {
                        self.push(InputEvent::PointerMove { position }, at);
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled if self.touch_id == Some(touch.id) => {
                        self.touch_id = None;
                        self.push(InputEvent::PointerUp, at);
                    }
                    _ => {}
                }
            }

            WindowEvent::PinchGesture { delta, .. } => {
                self.push(InputEvent::Pinch(*delta as f32), at);
            }

            WindowEvent::Focused(false) => {
                self.touch_id = None;
                self.push(InputEvent::FocusLost, at);
            }

            _ => {}
        }
    }
}

/// Consistent view of the interaction clock for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSnapshot {
    pub last_interaction: f64,
    pub idle_active: bool,
}

impl ClockSnapshot {
    /// Seconds since the last interaction at session time `now`.
    #[inline]
    pub fn inactive_for(&self, now: f64) -> f64 {
        now - self.last_interaction
    }
}

/// When the user last interacted, and whether the idle orbit currently owns
/// the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionClock {
    last_interaction: f64,
    idle_active: bool,
}

impl InteractionClock {
    /// A clock whose last interaction is `now`.
    pub fn new(now: f64) -> Self {
        Self {
            last_interaction: now,
            idle_active: false,
        }
    }

    /// Record an interaction. Returns `true` when this ends an idle episode.
    pub fn touch(&mut self, at: f64) -> bool {
        self.last_interaction = self.last_interaction.max(at);
        std::mem::replace(&mut self.idle_active, false)
    }

    pub fn set_idle_active(&mut self) {
        self.idle_active = true;
    }

    #[inline]
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            last_interaction: self.last_interaction,
            idle_active: self.idle_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_preserves_order_and_drains() {
        let mut inbox = InputInbox::new();
        inbox.push(InputEvent::KeyDown(KeyCode::W), 1.0);
        inbox.push(InputEvent::KeyUp(KeyCode::W), 1.5);

        let drained: Vec<_> = inbox.drain().collect();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].event, InputEvent::KeyDown(KeyCode::W));
        assert_eq!(drained[1].at, 1.5);
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_touch_becomes_pointer() {
        use winit::dpi::PhysicalPosition;
        use winit::event::{DeviceId, Touch};

        let mut inbox = InputInbox::new();
        let touch = |phase, id, x| {
            WindowEvent::Touch(Touch {
                // SAFETY: dummy ids are only compared, never dereferenced
                device_id: unsafe { DeviceId::dummy() },
                phase,
                location: PhysicalPosition::new(x, 0.0),
                force: None,
                id,
            })
        };

        inbox.handle_window_event(&touch(TouchPhase::Started, 1, 10.0), 0.0);
        // A second finger is ignored while the first one is down
        inbox.handle_window_event(&touch(TouchPhase::Started, 2, 50.0), 0.0);
        inbox.handle_window_event(&touch(TouchPhase::Moved, 1, 20.0), 0.1);
        inbox.handle_window_event(&touch(TouchPhase::Ended, 1, 20.0), 0.2);

        let events: Vec<_> = inbox.drain().map(|t| t.event).collect();
        assert_eq!(
            events,
            vec![
                InputEvent::PointerMove { position: Vec2::new(10.0, 0.0) },
                InputEvent::PointerDown,
                InputEvent::PointerMove { position: Vec2::new(20.0, 0.0) },
                InputEvent::PointerUp,
            ]
        );
    }

    #[test]
    fn test_clock_touch_clears_idle() {
        let mut clock = InteractionClock::new(0.0);
        clock.set_idle_active();
        assert!(clock.snapshot().idle_active);

        assert!(clock.touch(12.0));
        let snap = clock.snapshot();
        assert!(!snap.idle_active);
        assert_eq!(snap.last_interaction, 12.0);
        assert_eq!(snap.inactive_for(15.0), 3.0);

        // A second touch does not report an idle exit
        assert!(!clock.touch(13.0));
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = InteractionClock::new(5.0);
        clock.touch(3.0);
        assert_eq!(clock.snapshot().last_interaction, 5.0);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyCode::from(WinitKeyCode::ShiftRight), KeyCode::Shift);
        assert_eq!(KeyCode::from(WinitKeyCode::KeyQ), KeyCode::Q);
        assert!(matches!(KeyCode::from(WinitKeyCode::KeyZ), KeyCode::Other(_)));
    }
}
