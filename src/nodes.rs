//! Node simulation: a fixed pool of bodies random-walking inside a sphere.
//!
//! Velocities are per-tick displacements. The jitter, the speed clamp and the
//! integration all happen once per [`NodeField::tick`] call regardless of the
//! frame's wall-clock delta, so the swarm's pace follows the display refresh
//! rate.

use crate::config::SimulationConfig;
use crate::spawn::SwarmRng;
use crate::Vec3;

/// Fraction of the radius a node is put back to after touching the boundary.
const BOUNDARY_INSET: f32 = 0.99;

/// A simulated point body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Stable index into the pool.
    pub id: usize,
    pub position: Vec3,
    /// Displacement applied per tick.
    pub velocity: Vec3,
}

impl Node {
    /// Profile identifier shown by hosts that list nodes.
    pub fn profile_id(&self) -> String {
        format!("Node-{}", self.id)
    }

    /// One-line description of the node's current location.
    pub fn describe(&self) -> String {
        format!(
            "Node #{} at ({:.1}, {:.1}, {:.1})",
            self.id, self.position.x, self.position.y, self.position.z
        )
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// The fixed-size node arena and its integration parameters.
#[derive(Debug, Clone)]
pub struct NodeField {
    nodes: Vec<Node>,
    sphere_radius: f32,
    max_speed: f32,
    accel_factor: f32,
    jitter: bool,
}

impl NodeField {
    /// Populate `config.num_points` nodes uniformly inside the sphere.
    pub fn initialize(config: &SimulationConfig, rng: &mut SwarmRng) -> Self {
        let nodes = (0..config.num_points)
            .map(|id| Node {
                id,
                position: rng.random_in_sphere(config.sphere_radius),
                velocity: rng.random_vector(config.initial_speed),
            })
            .collect();

        Self {
            nodes,
            sphere_radius: config.sphere_radius,
            max_speed: config.max_speed,
            accel_factor: config.accel_factor,
            jitter: config.jitter,
        }
    }

    /// Build a field from explicit nodes. Ids are reassigned to match order.
    pub fn from_nodes(mut nodes: Vec<Node>, config: &SimulationConfig) -> Self {
        for (id, node) in nodes.iter_mut().enumerate() {
            node.id = id;
        }
        Self {
            nodes,
            sphere_radius: config.sphere_radius,
            max_speed: config.max_speed,
            accel_factor: config.accel_factor,
            jitter: config.jitter,
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn sphere_radius(&self) -> f32 {
        self.sphere_radius
    }

    #[inline]
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Enable or disable the random walk.
    pub fn set_jitter(&mut self, enabled: bool) {
        self.jitter = enabled;
    }

    /// Advance every node by one step.
    pub fn tick(&mut self, rng: &mut SwarmRng) {
        for node in &mut self.nodes {
            if self.jitter {
                node.velocity += rng.jitter(self.accel_factor);
            }
            node.velocity = clamp_speed(node.velocity, self.max_speed);
            node.position += node.velocity;
            reflect_at_boundary(node, self.sphere_radius);
        }
    }

    /// Id of the first node holding a NaN or infinite component.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.nodes.iter().find(|n| !n.is_finite()).map(|n| n.id)
    }

    /// Overwrite all node state, used to roll back a rejected tick.
    pub(crate) fn restore(&mut self, snapshot: &[Node]) {
        self.nodes.copy_from_slice(snapshot);
    }

    /// Zero non-finite velocities and put nodes with a non-finite position
    /// back at the centre. Returns how many nodes were touched.
    pub(crate) fn sanitize(&mut self) -> usize {
        let mut repaired = 0;
        for node in self.nodes.iter_mut().filter(|n| !n.is_finite()) {
            if !node.velocity.is_finite() {
                node.velocity = Vec3::ZERO;
            }
            if !node.position.is_finite() {
                node.position = Vec3::ZERO;
            }
            reflect_at_boundary(node, self.sphere_radius);
            repaired += 1;
        }
        repaired
    }
}

/// Rescale `v` to exactly `max` when it is longer, keeping its direction.
pub fn clamp_speed(v: Vec3, max: f32) -> Vec3 {
    let speed = v.length();
    if speed > max && speed > 0.0 {
        v * (max / speed)
    } else {
        v
    }
}

/// Elastic reflection off the inside of the boundary sphere.
///
/// The velocity is mirrored about the outward normal and the node is pulled
/// back inside so the next tick does not trigger again.
pub fn reflect_at_boundary(node: &mut Node, radius: f32) {
    let distance = node.position.length();
    if distance < radius || distance == 0.0 {
        return;
    }
    let normal = node.position / distance;
    let dot = node.velocity.dot(normal);
    node.velocity -= normal * (2.0 * dot);
    node.position = normal * (radius * BOUNDARY_INSET);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(num_points: usize, radius: f32) -> SimulationConfig {
        SimulationConfig {
            num_points,
            sphere_radius: radius,
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_inside_sphere() {
        let mut rng = SwarmRng::seeded(11);
        let field = NodeField::initialize(&config(300, 1500.0), &mut rng);

        assert_eq!(field.len(), 300);
        for (i, node) in field.nodes().iter().enumerate() {
            assert_eq!(node.id, i);
            assert!(node.position.length() <= 1500.0);
            assert!(node.velocity.abs().max_element() <= 0.5);
        }
    }

    #[test]
    fn test_clamp_speed_preserves_direction() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let clamped = clamp_speed(v, 1.9);
        assert!((clamped.length() - 1.9).abs() < 1e-5);
        assert!((clamped.normalize() - v.normalize()).length() < 1e-5);

        let slow = Vec3::new(0.1, 0.0, 0.0);
        assert_eq!(clamp_speed(slow, 1.9), slow);
        assert_eq!(clamp_speed(Vec3::ZERO, 1.9), Vec3::ZERO);
    }

    #[test]
    fn test_reflection_mirrors_outward_velocity() {
        let mut node = Node {
            id: 0,
            position: Vec3::new(101.0, 0.0, 0.0),
            velocity: Vec3::new(1.0, 0.5, 0.0),
        };
        reflect_at_boundary(&mut node, 100.0);

        assert!((node.position - Vec3::new(99.0, 0.0, 0.0)).length() < 1e-4);
        assert!((node.velocity - Vec3::new(-1.0, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_reflection_ignores_interior() {
        let mut node = Node {
            id: 0,
            position: Vec3::new(10.0, 0.0, 0.0),
            velocity: Vec3::X,
        };
        let before = node;
        reflect_at_boundary(&mut node, 100.0);
        assert_eq!(node, before);
    }

    #[test]
    fn test_tick_respects_bounds_and_speed() {
        let mut rng = SwarmRng::seeded(12);
        let cfg = SimulationConfig {
            num_points: 50,
            sphere_radius: 20.0,
            max_speed: 1.9,
            accel_factor: 0.5,
            ..Default::default()
        };
        let mut field = NodeField::initialize(&cfg, &mut rng);

        for _ in 0..2000 {
            field.tick(&mut rng);
            for node in field.nodes() {
                assert!(node.position.length() <= 20.0 + 1e-3);
                assert!(node.velocity.length() <= 1.9 + 1e-4);
            }
        }
    }

    #[test]
    fn test_tick_without_jitter_is_straight_line() {
        let mut rng = SwarmRng::seeded(13);
        let cfg = SimulationConfig {
            jitter: false,
            ..config(1, 1500.0)
        };
        let node = Node {
            id: 0,
            position: Vec3::ZERO,
            velocity: Vec3::new(1.0, 0.0, 0.0),
        };
        let mut field = NodeField::from_nodes(vec![node], &cfg);
        for _ in 0..10 {
            field.tick(&mut rng);
        }
        assert!((field.nodes()[0].position - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_describe() {
        let node = Node {
            id: 3,
            position: Vec3::new(1.0, 2.5, -3.04),
            velocity: Vec3::ZERO,
        };
        assert_eq!(node.profile_id(), "Node-3");
        assert_eq!(node.describe(), "Node #3 at (1.0, 2.5, -3.0)");
    }

    #[test]
    fn test_first_non_finite() {
        let mut rng = SwarmRng::seeded(14);
        let mut field = NodeField::initialize(&config(4, 10.0), &mut rng);
        assert_eq!(field.first_non_finite(), None);
        field.nodes_mut()[2].velocity.y = f32::NAN;
        assert_eq!(field.first_non_finite(), Some(2));
    }

    #[test]
    fn test_sanitize_resets_only_corrupt_nodes() {
        let config = SimulationConfig { sphere_radius: 100.0, ..Default::default() };
        let healthy = Node { id: 0, position: Vec3::new(10.0, 0.0, 0.0), velocity: Vec3::X };
        let mut field = NodeField::from_nodes(
            vec![
                healthy,
                Node { id: 1, position: Vec3::new(20.0, 0.0, 0.0), velocity: Vec3::new(f32::NAN, 0.0, 0.0) },
                Node { id: 2, position: Vec3::new(f32::INFINITY, 0.0, 0.0), velocity: Vec3::Y },
            ],
            &config,
        );

        assert_eq!(field.sanitize(), 2);
        assert_eq!(field.nodes()[0], healthy);
        assert_eq!(field.nodes()[1].position, Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(field.nodes()[1].velocity, Vec3::ZERO);
        assert_eq!(field.nodes()[2].position, Vec3::ZERO);
        assert_eq!(field.nodes()[2].velocity, Vec3::Y);
        assert_eq!(field.first_non_finite(), None);
    }
}
