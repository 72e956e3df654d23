use std::f64::consts::PI;

use noisy_float::prelude::*;
use serde::{Deserialize, Serialize};

/// A basic four-vector
///
/// The zero component is the energy/time component. The remainder are
/// the spatial components
#[derive(
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub struct FourVector {
    p: [N64; 4],
}

impl FourVector {
    /// Construct a new four-vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a four-vector from transverse momentum, pseudorapidity,
    /// azimuthal angle and rest mass
    ///
    /// All arguments have to be finite. A NaN component panics in debug
    /// builds, like any other `N64` arithmetic producing NaN.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        [n64(e), n64(px), n64(py), n64(pz)].into()
    }

    /// The spatial norm \sqrt{\sum v_i^2} with i = 1,2,3
    pub fn spatial_norm(&self) -> N64 {
        self.spatial_norm_sq().sqrt()
    }

    /// The square \sum v_i^2 with i = 1,2,3 of the spatial norm
    pub fn spatial_norm_sq(&self) -> N64 {
        self.p.iter().skip(1).map(|e| *e * *e).sum()
    }

    /// The scalar transverse momentum
    pub fn pt(&self) -> N64 {
        (self.p[1] * self.p[1] + self.p[2] * self.p[2]).sqrt()
    }

    /// The pseudorapidity
    pub fn eta(&self) -> N64 {
        let pt = self.pt();
        if pt == 0. {
            return if self.p[3] >= 0. { n64(f64::MAX) } else { n64(f64::MIN) };
        }
        (self.p[3] / pt).asinh()
    }

    /// The azimuthal angle in [-π, π]
    pub fn phi(&self) -> N64 {
        if self.p[1] == 0. && self.p[2] == 0. {
            return n64(0.);
        }
        self.p[2].atan2(self.p[1])
    }

    const fn len() -> usize {
        4
    }

    /// The invariant mass \sqrt{v_0^2 - \sum v_i^2} with i = 1,2,3
    ///
    /// Space-like vectors get a negative mass -\sqrt{\sum v_i^2 - v_0^2}
    pub fn m(&self) -> N64 {
        let m_sq = self.m_sq();
        if m_sq < 0. {
            -(-m_sq).sqrt()
        } else {
            m_sq.sqrt()
        }
    }

    /// The invariant mass square v_0^2 - \sum v_i^2 with i = 1,2,3
    pub fn m_sq(&self) -> N64 {
        self.p[0] * self.p[0] - self.spatial_norm_sq()
    }
}

/// Azimuthal angle difference, wrapped into [-π, π)
///
/// Non-finite angles give NaN.
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    (phi2 - phi1 + PI).rem_euclid(2. * PI) - PI
}

/// Angular separation \sqrt{Δη^2 + Δφ^2}
pub fn delta_r(eta1: f64, eta2: f64, phi1: f64, phi2: f64) -> f64 {
    let deta = eta2 - eta1;
    let dphi = delta_phi(phi1, phi2);
    (deta * deta + dphi * dphi).sqrt()
}

impl std::convert::From<[N64; 4]> for FourVector {
    fn from(p: [N64; 4]) -> FourVector {
        FourVector { p }
    }
}

impl std::ops::Index<usize> for FourVector {
    type Output = N64;

    fn index(&self, i: usize) -> &Self::Output {
        &self.p[i]
    }
}

impl std::ops::AddAssign for FourVector {
    fn add_assign(&mut self, rhs: FourVector) {
        for i in 0..Self::len() {
            self.p[i] += rhs[i]
        }
    }
}

impl std::ops::Add for FourVector {
    type Output = Self;

    fn add(mut self, rhs: FourVector) -> Self::Output {
        self += rhs;
        self
    }
}

impl std::iter::Sum for FourVector {
    fn sum<I: Iterator<Item = FourVector>>(iter: I) -> Self {
        iter.fold(FourVector::new(), std::ops::Add::add)
    }
}
