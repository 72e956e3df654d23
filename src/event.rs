use std::default::Default;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::four_vector::FourVector;

/// Lepton flavour of a collection
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
)]
pub enum Flavour {
    Muon,
    Electron,
}

/// A single reconstructed lepton
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Lepton {
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    pub mass: f32,
    pub charge: i32,
    /// Relative isolation
    pub rel_iso: f32,
    /// Transverse impact parameter
    pub dxy: f32,
    /// Longitudinal impact parameter
    pub dz: f32,
    pub dxy_err: f32,
    pub dz_err: f32,
}

/// Columns of all leptons of one flavour in an event
///
/// All columns have the same length.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Leptons {
    pub(crate) pt: Vec<f32>,
    pub(crate) eta: Vec<f32>,
    pub(crate) phi: Vec<f32>,
    pub(crate) mass: Vec<f32>,
    pub(crate) charge: Vec<i32>,
    pub(crate) rel_iso: Vec<f32>,
    pub(crate) dxy: Vec<f32>,
    pub(crate) dz: Vec<f32>,
    pub(crate) dxy_err: Vec<f32>,
    pub(crate) dz_err: Vec<f32>,
}

impl Leptons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            pt: Vec::with_capacity(cap),
            eta: Vec::with_capacity(cap),
            phi: Vec::with_capacity(cap),
            mass: Vec::with_capacity(cap),
            charge: Vec::with_capacity(cap),
            rel_iso: Vec::with_capacity(cap),
            dxy: Vec::with_capacity(cap),
            dz: Vec::with_capacity(cap),
            dxy_err: Vec::with_capacity(cap),
            dz_err: Vec::with_capacity(cap),
        }
    }

    pub fn push(&mut self, l: Lepton) {
        self.pt.push(l.pt);
        self.eta.push(l.eta);
        self.phi.push(l.phi);
        self.mass.push(l.mass);
        self.charge.push(l.charge);
        self.rel_iso.push(l.rel_iso);
        self.dxy.push(l.dxy);
        self.dz.push(l.dz);
        self.dxy_err.push(l.dxy_err);
        self.dz_err.push(l.dz_err);
    }

    /// Number of leptons
    pub fn len(&self) -> usize {
        self.pt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pt.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Lepton> {
        if i >= self.len() {
            return None;
        }
        Some(Lepton {
            pt: self.pt[i],
            eta: self.eta[i],
            phi: self.phi[i],
            mass: self.mass[i],
            charge: self.charge[i],
            rel_iso: self.rel_iso[i],
            dxy: self.dxy[i],
            dz: self.dz[i],
            dxy_err: self.dxy_err[i],
            dz_err: self.dz_err[i],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Lepton> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn pt(&self) -> &[f32] {
        &self.pt
    }

    pub fn eta(&self) -> &[f32] {
        &self.eta
    }

    pub fn phi(&self) -> &[f32] {
        &self.phi
    }

    pub fn mass(&self) -> &[f32] {
        &self.mass
    }

    pub fn charge(&self) -> &[i32] {
        &self.charge
    }

    pub fn rel_iso(&self) -> &[f32] {
        &self.rel_iso
    }

    pub fn dxy(&self) -> &[f32] {
        &self.dxy
    }

    pub fn dz(&self) -> &[f32] {
        &self.dz
    }

    pub fn dxy_err(&self) -> &[f32] {
        &self.dxy_err
    }

    pub fn dz_err(&self) -> &[f32] {
        &self.dz_err
    }

    /// Four-momentum of the lepton with index `i`
    pub fn momentum(&self, i: usize) -> FourVector {
        FourVector::from_pt_eta_phi_m(
            self.pt[i].into(),
            self.eta[i].into(),
            self.phi[i].into(),
            self.mass[i].into(),
        )
    }

    /// Three-dimensional impact parameter sqrt(dxy^2 + dz^2)
    pub fn ip3d(&self, i: usize) -> f32 {
        (self.dxy[i] * self.dxy[i] + self.dz[i] * self.dz[i]).sqrt()
    }

    /// Significance of the three-dimensional impact parameter
    pub fn sip3d(&self, i: usize) -> f32 {
        let err = (self.dxy_err[i] * self.dxy_err[i]
            + self.dz_err[i] * self.dz_err[i])
            .sqrt();
        self.ip3d(i) / err
    }
}

impl FromIterator<Lepton> for Leptons {
    fn from_iter<I: IntoIterator<Item = Lepton>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut res = Self::with_capacity(iter.size_hint().0);
        for l in iter {
            res.push(l)
        }
        res
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventBuilder {
    id: usize,
    muons: Leptons,
    electrons: Leptons,
}

impl EventBuilder {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn add_lepton(&mut self, flavour: Flavour, l: Lepton) -> &mut Self {
        match flavour {
            Flavour::Muon => self.muons.push(l),
            Flavour::Electron => self.electrons.push(l),
        }
        self
    }

    pub fn leptons(&mut self, flavour: Flavour, leptons: Leptons) -> &mut Self {
        match flavour {
            Flavour::Muon => self.muons = leptons,
            Flavour::Electron => self.electrons = leptons,
        }
        self
    }

    pub fn build(self) -> Event {
        Event {
            id: self.id,
            muons: self.muons,
            electrons: self.electrons,
        }
    }
}

impl From<EventBuilder> for Event {
    fn from(b: EventBuilder) -> Self {
        b.build()
    }
}

/// A recorded collision event
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Event {
    id: usize,
    muons: Leptons,
    electrons: Leptons,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn muons(&self) -> &Leptons {
        &self.muons
    }

    pub fn electrons(&self) -> &Leptons {
        &self.electrons
    }

    pub fn leptons(&self, flavour: Flavour) -> &Leptons {
        match flavour {
            Flavour::Muon => &self.muons,
            Flavour::Electron => &self.electrons,
        }
    }
}
