//! Proximity connections between nearby nodes.
//!
//! The graph is derived from live distances: after every [`ConnectionGraph::tick`]
//! a pair is connected exactly when its nodes are closer than the connect
//! distance. What persists across ticks is the per-connection sticky timer,
//! which pulls the two velocities together while it runs.

use std::collections::BTreeMap;

use crate::config::ConnectionConfig;
use crate::nodes::Node;
use crate::spawn::SwarmRng;
use crate::Vec3;

/// Canonical key of an unordered node pair, smaller id first.
pub type PairKey = (usize, usize);

/// Build the canonical key for a pair.
#[inline]
pub fn pair_key(i: usize, j: usize) -> PairKey {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

/// A live edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    /// Seconds of velocity coupling left. Zero or below means idle.
    pub sticky_timer: f32,
}

impl Connection {
    #[inline]
    pub fn is_sticky(&self) -> bool {
        self.sticky_timer > 0.0
    }
}

/// Connection churn of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionDelta {
    pub created: usize,
    pub removed: usize,
    /// Connections alive after the tick.
    pub active: usize,
}

/// All live connections, keyed by [`PairKey`].
#[derive(Debug, Clone)]
pub struct ConnectionGraph {
    connections: BTreeMap<PairKey, Connection>,
    connect_dist: f32,
    sticky_min: f32,
    sticky_max: f32,
    sticky_decrement: f32,
    rearm_chance: f32,
    cohesion: f32,
}

impl ConnectionGraph {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            connections: BTreeMap::new(),
            connect_dist: config.connect_dist,
            sticky_min: config.sticky_min,
            sticky_max: config.sticky_max,
            sticky_decrement: config.sticky_decrement,
            rearm_chance: config.rearm_chance,
            cohesion: config.cohesion,
        }
    }

    #[inline]
    pub fn connect_dist(&self) -> f32 {
        self.connect_dist
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Look up the connection between `i` and `j`, in either order.
    pub fn get(&self, i: usize, j: usize) -> Option<&Connection> {
        self.connections.get(&pair_key(i, j))
    }

    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.connections.contains_key(&pair_key(i, j))
    }

    /// Connections in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Line segments for every connection, with the sticky flag for styling.
    pub fn segments<'a>(&'a self, nodes: &'a [Node]) -> impl Iterator<Item = (Vec3, Vec3, bool)> + 'a {
        self.connections
            .values()
            .map(move |c| (nodes[c.a].position, nodes[c.b].position, c.is_sticky()))
    }

    /// Re-evaluate every pair `i < j` against current positions.
    ///
    /// Sticky connections nudge both velocities toward their average, so this
    /// mutates `nodes`. The timer decrement is a fixed step per call.
    pub fn tick(&mut self, nodes: &mut [Node], rng: &mut SwarmRng) -> ConnectionDelta {
        let mut delta = ConnectionDelta::default();
        let dist_sq = self.connect_dist * self.connect_dist;

        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let key = (i, j);
                let within = nodes[i].position.distance_squared(nodes[j].position) < dist_sq;

                if !within {
                    if self.connections.remove(&key).is_some() {
                        delta.removed += 1;
                    }
                    continue;
                }

                match self.connections.get_mut(&key) {
                    None => {
                        let sticky_timer = rng.random_range(self.sticky_min, self.sticky_max);
                        self.connections.insert(key, Connection { a: i, b: j, sticky_timer });
                        delta.created += 1;
                    }
                    Some(conn) if conn.sticky_timer > 0.0 => {
                        let (vi, vj) = (nodes[i].velocity, nodes[j].velocity);
                        let avg = (vi + vj) * 0.5;
                        nodes[i].velocity = vi.lerp(avg, self.cohesion);
                        nodes[j].velocity = vj.lerp(avg, self.cohesion);
                        conn.sticky_timer -= self.sticky_decrement;
                    }
                    Some(conn) => {
                        if rng.chance(self.rearm_chance) {
                            conn.sticky_timer = rng.random_range(self.sticky_min, self.sticky_max);
                        }
                    }
                }
            }
        }

        delta.active = self.connections.len();
        delta
    }

    /// Drop every connection.
    pub fn clear(&mut self) {
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: usize, position: Vec3, velocity: Vec3) -> Node {
        Node { id, position, velocity }
    }

    fn graph() -> ConnectionGraph {
        ConnectionGraph::new(&ConnectionConfig::default())
    }

    #[test]
    fn test_pair_key_is_canonical() {
        assert_eq!(pair_key(3, 1), (1, 3));
        assert_eq!(pair_key(1, 3), (1, 3));
    }

    #[test]
    fn test_connects_close_pair() {
        let mut rng = SwarmRng::seeded(21);
        let mut g = graph();
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::ZERO),
            node(1, Vec3::new(299.0, 0.0, 0.0), Vec3::ZERO),
            node(2, Vec3::new(0.0, 301.0, 0.0), Vec3::ZERO),
        ];

        let delta = g.tick(&mut nodes, &mut rng);

        assert_eq!(delta, ConnectionDelta { created: 1, removed: 0, active: 1 });
        assert!(g.contains(1, 0));
        assert!(!g.contains(0, 2));
        let timer = g.get(0, 1).unwrap().sticky_timer;
        assert!((0.5..2.0).contains(&timer));
    }

    #[test]
    fn test_exact_distance_is_not_connected() {
        let mut rng = SwarmRng::seeded(22);
        let mut g = graph();
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::ZERO),
            node(1, Vec3::new(300.0, 0.0, 0.0), Vec3::ZERO),
        ];
        g.tick(&mut nodes, &mut rng);
        assert!(g.is_empty());
    }

    #[test]
    fn test_sticky_timer_counts_down_and_couples_velocities() {
        let mut rng = SwarmRng::seeded(23);
        let mut g = graph();
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)),
            node(1, Vec3::new(10.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)),
        ];

        g.tick(&mut nodes, &mut rng);
        let first = g.get(0, 1).unwrap().sticky_timer;
        // Creation tick leaves velocities alone.
        assert_eq!(nodes[0].velocity.x, 1.0);

        g.tick(&mut nodes, &mut rng);
        let second = g.get(0, 1).unwrap().sticky_timer;
        assert!((first - second - 1.0 / 60.0).abs() < 1e-6);
        assert!((nodes[0].velocity.x - 0.98).abs() < 1e-6);
        assert!((nodes[1].velocity.x + 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_timer_runs_out_but_connection_stays() {
        let mut rng = SwarmRng::seeded(24);
        let mut g = graph();
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::ZERO),
            node(1, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO),
        ];

        // 2.0 s of 1/60 decrements is 120 ticks; run well past it.
        let mut saw_idle = false;
        for _ in 0..400 {
            let delta = g.tick(&mut nodes, &mut rng);
            assert_eq!(delta.active, 1);
            assert_eq!(delta.removed, 0);
            if !g.get(0, 1).unwrap().is_sticky() {
                saw_idle = true;
            }
        }
        assert!(saw_idle);
    }

    /// Tick a stationary close pair until its sticky timer has run out.
    fn run_until_expired(g: &mut ConnectionGraph, nodes: &mut [Node], rng: &mut SwarmRng) {
        for _ in 0..200 {
            g.tick(nodes, rng);
            if !g.get(0, 1).unwrap().is_sticky() {
                return;
            }
        }
        panic!("sticky timer never ran out");
    }

    #[test]
    fn test_expired_connection_rearms() {
        let mut rng = SwarmRng::seeded(27);
        let mut g = ConnectionGraph::new(&ConnectionConfig {
            rearm_chance: 1.0,
            ..Default::default()
        });
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::ZERO),
            node(1, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO),
        ];

        run_until_expired(&mut g, &mut nodes, &mut rng);
        assert!(g.get(0, 1).unwrap().sticky_timer <= 0.0);

        let delta = g.tick(&mut nodes, &mut rng);
        assert_eq!(delta, ConnectionDelta { created: 0, removed: 0, active: 1 });
        let timer = g.get(0, 1).unwrap().sticky_timer;
        assert!((0.5..2.0).contains(&timer), "re-armed timer {}", timer);
    }

    #[test]
    fn test_expired_connection_stays_idle_without_rearm() {
        let mut rng = SwarmRng::seeded(28);
        let mut g = ConnectionGraph::new(&ConnectionConfig {
            rearm_chance: 0.0,
            ..Default::default()
        });
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)),
            node(1, Vec3::new(5.0, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0)),
        ];

        run_until_expired(&mut g, &mut nodes, &mut rng);
        let expired = g.get(0, 1).unwrap().sticky_timer;
        let velocity = nodes[0].velocity;

        for _ in 0..100 {
            g.tick(&mut nodes, &mut rng);
            let conn = g.get(0, 1).unwrap();
            assert!(conn.sticky_timer <= 0.0);
            assert_eq!(conn.sticky_timer, expired);
        }
        // No cohesion once the timer is spent
        assert_eq!(nodes[0].velocity, velocity);
    }

    #[test]
    fn test_removed_once_out_of_range() {
        let mut rng = SwarmRng::seeded(25);
        let mut g = graph();
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::ZERO),
            node(1, Vec3::new(100.0, 0.0, 0.0), Vec3::ZERO),
        ];
        g.tick(&mut nodes, &mut rng);
        assert_eq!(g.len(), 1);

        nodes[1].position.x = 300.5;
        let delta = g.tick(&mut nodes, &mut rng);
        assert_eq!(delta, ConnectionDelta { created: 0, removed: 1, active: 0 });
        assert!(!g.contains(0, 1));
    }

    #[test]
    fn test_segments_follow_nodes() {
        let mut rng = SwarmRng::seeded(26);
        let mut g = graph();
        let mut nodes = vec![
            node(0, Vec3::ZERO, Vec3::ZERO),
            node(1, Vec3::new(0.0, 50.0, 0.0), Vec3::ZERO),
        ];
        g.tick(&mut nodes, &mut rng);
        let segs: Vec<_> = g.segments(&nodes).collect();
        assert_eq!(segs, vec![(Vec3::ZERO, Vec3::new(0.0, 50.0, 0.0), true)]);
    }
}
