//! End-to-end scenarios driving a headless session.

use neon_swarm::config::SimulationConfig;
use neon_swarm::prelude::*;
use neon_swarm::{FrameMode, Node};

const DT: f32 = 1.0 / 60.0;

fn config(seed: u64) -> SwarmConfig {
    SwarmConfig {
        seed: Some(seed),
        ..Default::default()
    }
}

fn still(position: Vec3) -> Node {
    Node {
        id: 0,
        position,
        velocity: Vec3::ZERO,
    }
}

// ============================================================================
// Node bounds
// ============================================================================

#[test]
fn test_small_swarm_stays_in_bounds() {
    let mut cfg = config(2024);
    cfg.simulation = SimulationConfig {
        num_points: 10,
        sphere_radius: 100.0,
        ..Default::default()
    };
    let mut session = Session::new(cfg);

    for _ in 0..600 {
        let report = session.tick(DT).unwrap();
        assert!(report.connections.active <= 45);
        for node in session.nodes().nodes() {
            assert!(node.position.length() <= 100.0 + 1e-3);
            assert!(node.velocity.length() <= 1.9 + 1e-4);
        }
    }
    assert!(session.connections().len() <= 45);
}

#[test]
fn test_default_swarm_survives_long_run() {
    let mut session = Session::new(config(99));
    for _ in 0..300 {
        session.tick(DT).unwrap();
    }
    assert_eq!(session.nodes().len(), 300);
    for node in session.nodes().nodes() {
        assert!(node.position.length() <= 1500.0 + 1e-2);
    }
}

// ============================================================================
// Connections
// ============================================================================

fn pair_session(gap: f32) -> Session {
    let mut cfg = config(7);
    cfg.simulation.jitter = false;
    let nodes = vec![still(Vec3::ZERO), still(Vec3::new(gap, 0.0, 0.0))];
    Session::with_nodes(cfg, nodes)
}

#[test]
fn test_stationary_pair_connects_after_one_tick() {
    let mut session = pair_session(300.0 - 1.0);
    let report = session.tick(DT).unwrap();

    assert_eq!(report.connections.created, 1);
    let conn = session.connections().get(0, 1).unwrap();
    assert!((0.5..2.0).contains(&conn.sticky_timer));
}

#[test]
fn test_connection_persists_without_recreation() {
    let mut session = pair_session(120.0);
    session.tick(DT).unwrap();

    for _ in 1..200 {
        let report = session.tick(DT).unwrap();
        assert_eq!(report.connections.created, 0);
        assert_eq!(report.connections.removed, 0);
        assert!(session.connections().contains(0, 1));
    }
}

#[test]
fn test_connection_dropped_after_leaving_range() {
    let mut session = pair_session(250.0);
    session.tick(DT).unwrap();
    assert!(session.connections().contains(0, 1));

    session.nodes_mut().nodes_mut()[1].position = Vec3::new(450.0, 0.0, 0.0);
    let report = session.tick(DT).unwrap();

    assert_eq!(report.connections.removed, 1);
    assert!(session.connections().is_empty());
}

// ============================================================================
// Idle orbit
// ============================================================================

#[test]
fn test_idle_reaches_orbit_three_seconds_after_entry() {
    let mut session = Session::new(config(3));
    assert_eq!(session.pose().position, Vec3::new(0.0, 50.0, 400.0));

    // No input: idle kicks in just after ten seconds
    let mut entered = false;
    for _ in 0..700 {
        let report = session.tick(DT).unwrap();
        if report.mode == FrameMode::Idle {
            entered = true;
            break;
        }
    }
    assert!(entered);

    let params = *session.idle().params().unwrap();
    assert_eq!(params.start_position, Vec3::new(0.0, 50.0, 400.0));

    while session.now() < params.entered_at + 3.0 {
        session.tick(DT).unwrap();
    }

    let t = session.idle().elapsed(session.now()).unwrap();
    let expected = session.idle().target_at(t);
    assert!((session.pose().position - expected).length() < 1e-3);
    assert_eq!(session.pose().position.y, 50.0);
}

#[test]
fn test_key_press_returns_control() {
    let mut session = Session::new(config(4));
    while session.mode() != FrameMode::Idle {
        session.tick(DT).unwrap();
    }
    for _ in 0..120 {
        session.tick(DT).unwrap();
    }

    session.push_input(InputEvent::KeyDown(KeyCode::W));
    let report = session.tick(DT).unwrap();

    assert_eq!(report.mode, FrameMode::FirstPerson);
    assert!(!session.idle().is_active());

    // The camera keeps going from where the orbit left it
    let before = session.pose().position;
    session.tick(DT).unwrap();
    let moved = session.pose().position.distance(before);
    assert!((moved - 300.0 * DT).abs() < 1e-2);
}

#[test]
fn test_second_idle_episode_starts_fresh() {
    let mut session = Session::new(config(5));
    while session.mode() != FrameMode::Idle {
        session.tick(DT).unwrap();
    }
    let first = session.idle().params().unwrap().entered_at;

    session.push_input(InputEvent::Wheel(1.0));
    session.tick(DT).unwrap();
    while session.mode() != FrameMode::Idle {
        session.tick(DT).unwrap();
    }

    let second = session.idle().params().unwrap().entered_at;
    assert!(second - first > 10.0);
}
