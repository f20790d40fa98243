//! Random sampling helpers for spawning and animating the swarm.
//!
//! A seeded session replays identically. Cosmetic animation draws from a
//! separate stream of the same seed (see [`SwarmRng::seeded_stream`]) so it
//! never perturbs the simulation.

use crate::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Alphabet used for label codes.
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Session random source with helpers for the sampling patterns the swarm uses.
///
/// ```ignore
/// let mut rng = SwarmRng::seeded(7);
/// let p = rng.random_in_sphere(1500.0);
/// let v = rng.random_vector(0.5);
/// let code = rng.random_code(6);
/// ```
#[derive(Debug, Clone)]
pub struct SwarmRng {
    rng: SmallRng,
}

impl SwarmRng {
    /// Deterministic generator for reproducible sessions and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Deterministic generator for stream `stream` of `seed`, independent of
    /// `seeded(seed)`.
    pub fn seeded_stream(seed: u64, stream: u64) -> Self {
        Self::seeded(seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Generator seeded from the wall clock, different each program execution.
    pub fn from_clock() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::seeded(seed)
    }

    // ========== Random primitives ==========

    /// Random f32 in [0, 1).
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in [min, max).
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// True with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f32) -> bool {
        self.random() < p
    }

    // ========== Vector helpers ==========

    /// Random point inside a sphere of given radius, centered at origin.
    ///
    /// Inverse-transform sampling: `θ = 2πu`, `φ = acos(2v − 1)`, `r = R·∛w`,
    /// which is uniform by volume.
    pub fn random_in_sphere(&mut self, radius: f32) -> Vec3 {
        let theta = TAU * self.random();
        let phi = (2.0 * self.random() - 1.0).clamp(-1.0, 1.0).acos();
        let r = radius * self.random().cbrt();

        Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        )
    }

    /// Random vector with each component uniform in [-scale, scale).
    pub fn random_vector(&mut self, scale: f32) -> Vec3 {
        Vec3::new(
            (self.random() - 0.5) * 2.0 * scale,
            (self.random() - 0.5) * 2.0 * scale,
            (self.random() - 0.5) * 2.0 * scale,
        )
    }

    /// Per-axis jitter with each component uniform in [-factor/2, factor/2).
    pub fn jitter(&mut self, factor: f32) -> Vec3 {
        Vec3::new(
            (self.random() - 0.5) * factor,
            (self.random() - 0.5) * factor,
            (self.random() - 0.5) * factor,
        )
    }

    /// Random angle in [0, 2π).
    #[inline]
    pub fn random_angle(&mut self) -> f32 {
        TAU * self.random()
    }

    // ========== Text ==========

    /// Random code of uppercase letters and digits.
    pub fn random_code(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| CODE_CHARS[self.rng.gen_range(0..CODE_CHARS.len())] as char)
            .collect()
    }
}
