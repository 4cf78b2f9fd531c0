//! Seeded simulated datasets. Every generator is deterministic in its seed.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Named columns of equal length.
pub type Columns = BTreeMap<String, Vec<f64>>;

/// Seeded sampler for the distributions the scenarios need.
pub struct Simulator {
    rng: StdRng,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Standard normal draw (Box-Muller).
    pub fn normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn bernoulli(&mut self, p: f64) -> f64 {
        if self.rng.gen::<f64>() < p {
            1.0
        } else {
            0.0
        }
    }
}

pub fn expit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn columns(names: &[&str], n: usize) -> Columns {
    names
        .iter()
        .map(|name| (name.to_string(), Vec::with_capacity(n)))
        .collect()
}

fn push(data: &mut Columns, name: &str, value: f64) {
    if let Some(column) = data.get_mut(name) {
        column.push(value);
    }
}

/// `C -> T -> Y`, `C -> Y`, binary `C` and `T`, continuous `Y`.
/// The average causal effect of `T` on `Y` is 2.
pub fn backdoor(n: usize, seed: u64) -> Columns {
    let mut sim = Simulator::new(seed);
    let mut data = columns(&["C", "T", "Y"], n);
    for _ in 0..n {
        let c = sim.bernoulli(0.5);
        let t = sim.bernoulli(expit(-0.5 + 1.2 * c));
        let y = 1.0 + 2.0 * t + 1.5 * c + 0.5 * sim.normal();
        push(&mut data, "C", c);
        push(&mut data, "T", t);
        push(&mut data, "Y", y);
    }
    data
}

/// Same structure as [`backdoor`] with a binary outcome.
pub fn backdoor_binary(n: usize, seed: u64) -> Columns {
    let mut sim = Simulator::new(seed);
    let mut data = columns(&["C", "T", "Y"], n);
    for _ in 0..n {
        let c = sim.bernoulli(0.5);
        let t = sim.bernoulli(expit(-0.5 + 1.2 * c));
        let y = sim.bernoulli(expit(-1.0 + 1.0 * t + 0.8 * c));
        push(&mut data, "C", c);
        push(&mut data, "T", t);
        push(&mut data, "Y", y);
    }
    data
}

/// Front-door model: `T -> M -> Y` with `T <-> Y` through a latent `U`.
/// All variables binary; `U` is not returned.
pub fn frontdoor(n: usize, seed: u64) -> Columns {
    let mut sim = Simulator::new(seed);
    let mut data = columns(&["M", "T", "Y"], n);
    for _ in 0..n {
        let u = sim.bernoulli(0.5);
        let t = sim.bernoulli(expit(-0.8 + 1.6 * u));
        let m = sim.bernoulli(expit(-1.0 + 2.0 * t));
        let y = sim.bernoulli(expit(-1.2 + 1.5 * m + 1.4 * u));
        push(&mut data, "T", t);
        push(&mut data, "M", m);
        push(&mut data, "Y", y);
    }
    data
}

/// Napkin model: `W1 -> W2 -> X -> Y` with `W1 <-> X` through a latent
/// `U1` and `W1 <-> Y` through a latent `U2`. All variables binary; the
/// latents are not returned. `E[Y(x)] = Σ_u 0.5 expit(-1.5 + 1.5x + 3u)`.
pub fn napkin(n: usize, seed: u64) -> Columns {
    let mut sim = Simulator::new(seed);
    let mut data = columns(&["W1", "W2", "X", "Y"], n);
    for _ in 0..n {
        let u1 = sim.bernoulli(0.5);
        let u2 = sim.bernoulli(0.5);
        let w1 = sim.bernoulli(expit(-1.5 + 0.5 * u1 + 3.0 * u2));
        let w2 = sim.bernoulli(expit(-1.0 + 2.0 * w1));
        let x = sim.bernoulli(expit(-1.0 + 2.0 * w2 + 0.5 * u1));
        let y = sim.bernoulli(expit(-1.5 + 1.5 * x + 3.0 * u2));
        push(&mut data, "W1", w1);
        push(&mut data, "W2", w2);
        push(&mut data, "X", x);
        push(&mut data, "Y", y);
    }
    data
}

/// Linear Gaussian Verma model: `A -> B -> C -> D`, `B <-> D` with
/// `B = 3A`, `C = -B`, `D = 2.5C` plus unit-variance noise, and a
/// residual covariance of `cov_bd` between `B` and `D`.
pub fn verma_linear_gaussian(n: usize, seed: u64, cov_bd: f64) -> Columns {
    let mut sim = Simulator::new(seed);
    let mut data = columns(&["A", "B", "C", "D"], n);
    let rho = cov_bd.clamp(-0.99, 0.99);
    for _ in 0..n {
        let a = sim.normal();
        let e_b = sim.normal();
        let e_d = rho * e_b + (1.0 - rho * rho).sqrt() * sim.normal();
        let b = 3.0 * a + e_b;
        let c = -b + sim.normal();
        let d = 2.5 * c + e_d;
        push(&mut data, "A", a);
        push(&mut data, "B", b);
        push(&mut data, "C", c);
        push(&mut data, "D", d);
    }
    data
}
