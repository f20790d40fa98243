//! # Neon Swarm
//!
//! A swarm of points random-walking inside a sphere, linked by proximity
//! connections, seen through a first-person camera that hands over to a
//! scripted elliptical orbit when nobody touches the controls.
//!
//! ## Quick Start
//!
//! ```ignore
//! use neon_swarm::prelude::*;
//!
//! fn main() -> Result<(), SwarmError> {
//!     Swarm::new()
//!         .with_node_count(300)
//!         .with_seed(7)
//!         .run()
//! }
//! ```
//!
//! ## Headless
//!
//! The simulation does not need a window. A [`Session`] can be driven
//! directly, which is how the tests exercise it:
//!
//! ```ignore
//! let mut session = Session::new(SwarmConfig { seed: Some(1), ..Default::default() });
//! session.push_input(InputEvent::KeyDown(KeyCode::W));
//! for _ in 0..600 {
//!     session.tick(1.0 / 60.0)?;
//! }
//! println!("{} connections", session.connections().len());
//! ```
//!
//! ## Frame order
//!
//! Each [`Session::tick`] drains queued input, decides between first-person
//! and idle mode, then runs camera → nodes → connections → labels, and
//! finally picks the node under the pointer.

pub mod camera;
pub mod config;
pub mod connections;
pub mod error;
pub mod gpu;
pub mod idle;
pub mod input;
pub mod labels;
pub mod nodes;
pub mod picking;
pub mod session;
pub mod spawn;
mod swarm;
pub mod time;

pub use camera::{CameraPose, ControlScheme, FirstPersonController};
pub use config::SwarmConfig;
pub use connections::{Connection, ConnectionGraph};
pub use error::{ConfigError, GpuError, SwarmError, TickError};
pub use glam::{Quat, Vec2, Vec3};
pub use idle::{IdleOrbit, OrbitRamp};
pub use input::{InputEvent, KeyCode};
pub use nodes::{Node, NodeField};
pub use picking::PickRay;
pub use session::{FrameMode, FrameReport, FrameView, Session};
pub use spawn::SwarmRng;
pub use swarm::Swarm;

/// Common imports.
pub mod prelude {
    pub use crate::camera::ControlScheme;
    pub use crate::config::SwarmConfig;
    pub use crate::error::SwarmError;
    pub use crate::idle::OrbitRamp;
    pub use crate::input::{InputEvent, KeyCode};
    pub use crate::session::Session;
    pub use crate::swarm::Swarm;
    pub use crate::{Vec2, Vec3};
}
