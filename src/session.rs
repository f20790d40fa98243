//! Per-frame orchestration of the whole swarm.
//!
//! A [`Session`] owns every piece of mutable state: the node arena, the
//! connection graph, labels, both camera drivers and the interaction clock.
//! Hosts feed it input through [`Session::push_input`] or
//! [`Session::handle_window_event`] and call [`Session::tick`] once per
//! displayed frame, then draw [`Session::view`].
//!
//! ```ignore
//! let mut session = Session::new(SwarmConfig::default());
//! session.push_input(InputEvent::KeyDown(KeyCode::W));
//! let report = session.tick(1.0 / 60.0)?;
//! renderer.draw(&session.view());
//! ```

use winit::event::WindowEvent;

use crate::camera::{CameraPose, FirstPersonController};
use crate::config::SwarmConfig;
use crate::connections::{ConnectionDelta, ConnectionGraph};
use crate::error::TickError;
use crate::idle::{IdleOrbit, IdlePhase};
use crate::input::{ClockSnapshot, InputEvent, InputInbox, InteractionClock};
use crate::labels::LabelField;
use crate::nodes::{Node, NodeField};
use crate::picking::PickRay;
use crate::spawn::SwarmRng;
use crate::{Quat, Vec2};

/// Window size assumed until the host reports one.
const DEFAULT_VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

/// Stream of the session seed reserved for label animation.
const LABEL_STREAM: u64 = 1;

/// Which driver owned the camera during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    FirstPerson,
    Idle,
}

impl FrameMode {
    /// Human-readable mode name.
    pub fn label(&self) -> &'static str {
        match self {
            FrameMode::FirstPerson => "First-Person Mode",
            FrameMode::Idle => "Idle Mode",
        }
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Ticks run so far, including this one.
    pub frame: u64,
    /// Session time after this tick, in seconds.
    pub now: f64,
    pub mode: FrameMode,
    /// Set when `mode` differs from the previous tick.
    pub mode_changed: bool,
    pub idle_phase: Option<IdlePhase>,
    /// Interaction-class inputs consumed this tick.
    pub interactions: usize,
    pub connections: ConnectionDelta,
    pub visible_labels: usize,
    /// Node under the pointer after this tick.
    pub hovered: Option<usize>,
    /// Node picked by the most recent click, if it hit one.
    pub selected: Option<usize>,
}

/// Borrowed state the renderer draws from.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub nodes: &'a [Node],
    pub connections: &'a ConnectionGraph,
    pub labels: &'a LabelField,
    pub pose: CameraPose,
    pub mode: FrameMode,
    pub sphere_radius: f32,
    pub selected: Option<usize>,
}

/// A running swarm.
pub struct Session {
    config: SwarmConfig,
    rng: SwarmRng,
    nodes: NodeField,
    connections: ConnectionGraph,
    labels: LabelField,
    controller: FirstPersonController,
    pose: CameraPose,
    idle: IdleOrbit,
    clock: InteractionClock,
    inbox: InputInbox,
    viewport: Vec2,
    hovered: Option<usize>,
    selected: Option<usize>,
    now: f64,
    frame: u64,
    mode: FrameMode,
}

impl Session {
    /// Spawn a fresh swarm. The config is assumed to be validated.
    pub fn new(config: SwarmConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SwarmRng::seeded(seed),
            None => SwarmRng::from_clock(),
        };
        let nodes = NodeField::initialize(&config.simulation, &mut rng);
        Self::assemble(config, nodes, rng)
    }

    /// Start from explicit nodes instead of a random spawn.
    pub fn with_nodes(config: SwarmConfig, nodes: Vec<Node>) -> Self {
        let rng = match config.seed {
            Some(seed) => SwarmRng::seeded(seed),
            None => SwarmRng::from_clock(),
        };
        let nodes = NodeField::from_nodes(nodes, &config.simulation);
        Self::assemble(config, nodes, rng)
    }

    fn assemble(config: SwarmConfig, nodes: NodeField, rng: SwarmRng) -> Self {
        let pose = CameraPose::new(config.camera.start_position, Quat::IDENTITY);
        let label_rng = match config.seed {
            Some(seed) => SwarmRng::seeded_stream(seed, LABEL_STREAM),
            None => SwarmRng::from_clock(),
        };
        let labels = LabelField::new(nodes.nodes(), &config.labels, label_rng);

        log::info!(
            "Swarm of {} nodes in a sphere of radius {}, connect distance {}",
            nodes.len(),
            nodes.sphere_radius(),
            config.connections.connect_dist
        );

        Self {
            connections: ConnectionGraph::new(&config.connections),
            controller: FirstPersonController::new(&config.camera, &pose),
            idle: IdleOrbit::new(&config.idle),
            clock: InteractionClock::new(0.0),
            inbox: InputInbox::new(),
            viewport: DEFAULT_VIEWPORT,
            hovered: None,
            selected: None,
            now: 0.0,
            frame: 0,
            mode: FrameMode::FirstPerson,
            labels,
            pose,
            nodes,
            rng,
            config,
        }
    }

    // ========== Input ==========

    /// Queue an input event stamped with the current session time.
    pub fn push_input(&mut self, event: InputEvent) {
        self.inbox.push(event, self.now);
    }

    /// Translate and queue a winit window event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.inbox.handle_window_event(event, self.now);
    }

    /// Window size in the same pixels as pointer positions.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
    }

    // ========== Frame ==========

    /// Advance the session by `dt` seconds.
    ///
    /// On [`TickError`] the nodes and camera are back at their pre-tick state,
    /// with any corruption that was already there reset, and the frame should
    /// not be drawn. Connections and labels are only advanced once the node
    /// state is known to be finite.
    pub fn tick(&mut self, dt: f32) -> Result<FrameReport, TickError> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.now += dt as f64;
        self.frame += 1;

        let saved_nodes = self.nodes.nodes().to_vec();
        let saved_pose = self.pose;

        // Input that ends an idle episode must start from the orbit's pose
        if self.clock.snapshot().idle_active && !self.inbox.is_empty() {
            self.controller.sync_from_pose(&self.pose);
        }

        let mut interactions = 0;
        let mut clicked = false;
        for input in self.inbox.drain() {
            clicked |= input.event == InputEvent::PointerDown;
            if self.controller.apply(&input.event) {
                interactions += 1;
                if self.clock.touch(input.at) {
                    self.idle.exit();
                }
            }
        }

        let snapshot = self.clock.snapshot();
        let mode = self.select_mode(&snapshot);
        if mode == FrameMode::Idle && !snapshot.idle_active {
            self.idle.enter(&self.pose, self.now, &mut self.rng);
            self.clock.set_idle_active();
        }

        let mode_changed = mode != self.mode;
        if mode_changed {
            log::info!("{}", mode.label());
            self.mode = mode;
        }

        let idle_phase = match mode {
            FrameMode::FirstPerson => {
                self.controller.tick(&mut self.pose, dt);
                None
            }
            FrameMode::Idle => self.idle.update(&mut self.pose, self.now),
        };

        self.nodes.tick(&mut self.rng);

        if let Err(err) = self.check_finite() {
            log::warn!("Skipping frame {}: {}", self.frame, err);
            self.recover(&saved_nodes, saved_pose, &err);
            return Err(err);
        }

        let connections = self.connections.tick(self.nodes.nodes_mut(), &mut self.rng);
        let visible_labels = self.labels.tick(self.nodes.nodes(), self.pose.position);

        if connections.created > 0 || connections.removed > 0 {
            log::debug!(
                "frame {}: +{} -{} connections ({} active)",
                self.frame,
                connections.created,
                connections.removed,
                connections.active
            );
        }

        self.hovered = self.pick_under_pointer();
        if clicked {
            self.select(self.hovered);
        }

        Ok(FrameReport {
            frame: self.frame,
            now: self.now,
            mode,
            mode_changed,
            idle_phase,
            interactions,
            connections,
            visible_labels,
            hovered: self.hovered,
            selected: self.selected,
        })
    }

    /// Roll back a rejected tick and clear corruption that predates it, so
    /// the next tick can succeed.
    fn recover(&mut self, saved_nodes: &[Node], saved_pose: CameraPose, err: &TickError) {
        self.nodes.restore(saved_nodes);
        self.pose = saved_pose;

        let repaired = self.nodes.sanitize();
        if repaired > 0 {
            log::warn!("Reset {} corrupted node(s)", repaired);
        }
        if !self.pose.is_finite() {
            log::warn!("Camera pose corrupted, returning to the start position");
            self.pose = CameraPose::new(self.config.camera.start_position, Quat::IDENTITY);
        }
        if matches!(err, TickError::NonFiniteCamera) && self.idle.is_active() {
            // Hand the camera back; a fresh episode starts after the idle delay
            self.idle.exit();
            self.clock.touch(self.now);
        }
        self.controller.sync_from_pose(&self.pose);
    }

    /// Node under the pointer, or under the screen centre while the pointer
    /// is captured.
    fn pick_under_pointer(&self) -> Option<usize> {
        let pointer = if self.controller.wants_pointer_lock() {
            self.viewport * 0.5
        } else {
            self.controller.pointer()?
        };
        let ray = PickRay::from_screen(&self.pose, self.config.camera.fov_degrees, pointer, self.viewport)?;
        ray.pick(self.nodes.nodes(), self.config.camera.pick_radius)
    }

    fn select(&mut self, picked: Option<usize>) {
        match picked.and_then(|id| self.nodes.nodes().get(id)) {
            Some(node) => log::info!("{}: {}", node.profile_id(), node.describe()),
            None if self.selected.is_some() => log::info!("Selection cleared"),
            None => {}
        }
        self.selected = picked;
    }

    fn select_mode(&self, snapshot: &ClockSnapshot) -> FrameMode {
        if snapshot.inactive_for(self.now) > self.config.idle.idle_delay {
            FrameMode::Idle
        } else {
            FrameMode::FirstPerson
        }
    }

    fn check_finite(&self) -> Result<(), TickError> {
        if let Some(id) = self.nodes.first_non_finite() {
            return Err(TickError::NonFiniteNode { id });
        }
        if !self.pose.is_finite() {
            return Err(TickError::NonFiniteCamera);
        }
        Ok(())
    }

    /// Everything the renderer needs for this frame.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            nodes: self.nodes.nodes(),
            connections: &self.connections,
            labels: &self.labels,
            pose: self.pose,
            mode: self.mode,
            sphere_radius: self.nodes.sphere_radius(),
            selected: self.selected,
        }
    }

    // ========== Accessors ==========

    #[inline]
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    #[inline]
    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    #[inline]
    pub fn nodes(&self) -> &NodeField {
        &self.nodes
    }

    /// Direct node access for hosts and tests that perturb the swarm.
    #[inline]
    pub fn nodes_mut(&mut self) -> &mut NodeField {
        &mut self.nodes
    }

    #[inline]
    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    #[inline]
    pub fn labels(&self) -> &LabelField {
        &self.labels
    }

    #[inline]
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    #[inline]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[inline]
    pub fn controller(&self) -> &FirstPersonController {
        &self.controller
    }

    #[inline]
    pub fn idle(&self) -> &IdleOrbit {
        &self.idle
    }

    #[inline]
    pub fn clock(&self) -> ClockSnapshot {
        self.clock.snapshot()
    }
}
