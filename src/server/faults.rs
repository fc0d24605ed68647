//! Fault injection for protocol testing
//!
//! A probabilistic gate in front of request dispatch that emulates lossy
//! transport. When the gate rejects, the connection driver drops the request
//! without writing any response, so the client sees a request that simply
//! never answered rather than an application-level error.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Probabilistic request gate.
///
/// Each call draws an independent uniform value in [0, 1) and admits the
/// request when the draw clears the configured drop probability
/// (0.0 = admit everything, 1.0 = drop everything). The probability is fixed
/// per configuration; the gate keeps no memory of prior decisions.
pub struct PacketLossSimulator {
    drop_probability: f64,
    rng: Mutex<StdRng>,
}

impl PacketLossSimulator {
    /// Creates a gate seeded from OS entropy.
    ///
    /// The probability is clamped to [0.0, 1.0]; configuration validation
    /// rejects out-of-range values before a gate is built.
    pub fn new(drop_probability: f64) -> Self {
        Self::from_rng(drop_probability, StdRng::from_entropy())
    }

    /// Creates a gate with a fixed seed for reproducible loss patterns.
    pub fn with_seed(drop_probability: f64, seed: u64) -> Self {
        Self::from_rng(drop_probability, StdRng::seed_from_u64(seed))
    }

    fn from_rng(drop_probability: f64, rng: StdRng) -> Self {
        Self {
            drop_probability: drop_probability.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }

    /// Draws once and decides whether this request passes the gate.
    pub fn should_admit(&self) -> bool {
        let draw = self
            .rng
            .lock()
            .expect("fault rng poisoned")
            .gen_range(0.0..1.0);
        draw >= self.drop_probability
    }

    pub fn drop_probability(&self) -> f64 {
        self.drop_probability
    }
}
