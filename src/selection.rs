use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::cutflow::Cutflow;
use crate::event::{Event, Flavour, Leptons};
use crate::reco::{
    compute_higgs_mass_4l, compute_z_masses_4l, filter_z1_mass, filter_z2_mass,
    filter_z_dr, reco_zz_to_4l, HiggsCandidate,
};
use crate::traits::Select;

const MUON_FILTERS: &[&str] = &[
    "At least four muons",
    "Require good isolation",
    "Good muon kinematics",
    "Track close to primary vertex with small uncertainty",
    "Two positive and two negative muons",
    "Delta R separation of muons building Z system",
    "Mass of first Z candidate in [40, 120]",
    "Mass of second Z candidate in [12, 120]",
];

const ELECTRON_FILTERS: &[&str] = &[
    "At least four electrons",
    "Require good isolation",
    "Good Electron kinematics",
    "Track close to primary vertex with small uncertainty",
    "Two positive and two negative electrons",
    "Delta R separation of Electrons building Z system",
    "Mass of first Z candidate in [40, 120]",
    "Mass of second Z candidate in [12, 120]",
];

/// Quality requirements for the leptons in a channel
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LeptonCuts {
    pub max_rel_iso: f32,
    pub min_pt: f32,
    pub max_abs_eta: f32,
    pub max_sip3d: f32,
    pub max_abs_dxy: f32,
    pub max_abs_dz: f32,
}

impl LeptonCuts {
    pub const MUON: LeptonCuts = LeptonCuts {
        max_rel_iso: 0.4,
        min_pt: 5.,
        max_abs_eta: 2.4,
        max_sip3d: 4.,
        max_abs_dxy: 0.5,
        max_abs_dz: 1.0,
    };

    pub const ELECTRON: LeptonCuts = LeptonCuts {
        max_rel_iso: 0.4,
        min_pt: 7.,
        max_abs_eta: 2.5,
        max_sip3d: 4.,
        max_abs_dxy: 0.5,
        max_abs_dz: 1.0,
    };

    pub fn at_least_four(&self, leptons: &Leptons) -> bool {
        leptons.len() >= 4
    }

    pub fn good_isolation(&self, leptons: &Leptons) -> bool {
        leptons.rel_iso().iter().all(|iso| iso.abs() < self.max_rel_iso)
    }

    /// Transverse momentum and pseudorapidity cuts
    ///
    /// Leptons with a non-finite momentum component fail, so that all
    /// selected leptons have valid four-momenta.
    pub fn good_kinematics(&self, leptons: &Leptons) -> bool {
        let finite = |values: &[f32]| values.iter().all(|v| v.is_finite());
        finite(leptons.pt())
            && finite(leptons.phi())
            && finite(leptons.mass())
            && leptons.pt().iter().all(|&pt| pt > self.min_pt)
            && leptons.eta().iter().all(|eta| eta.abs() < self.max_abs_eta)
    }

    pub fn close_to_primary_vertex(&self, leptons: &Leptons) -> bool {
        (0..leptons.len()).all(|i| leptons.sip3d(i) < self.max_sip3d)
            && leptons.dxy().iter().all(|dxy| dxy.abs() < self.max_abs_dxy)
            && leptons.dz().iter().all(|dz| dz.abs() < self.max_abs_dz)
    }

    /// Exactly four leptons, two with charge +1 and two with charge -1
    pub fn two_plus_two_minus(&self, leptons: &Leptons) -> bool {
        let charge = leptons.charge();
        let npos = charge.iter().filter(|&&q| q == 1).count();
        let nneg = charge.iter().filter(|&&q| q == -1).count();
        leptons.len() == 4 && npos == 2 && nneg == 2
    }
}

/// Final state of the H -> ZZ -> 4l decay
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
pub enum Channel {
    #[strum(serialize = "4mu")]
    FourMuon,
    #[strum(serialize = "4el")]
    FourElectron,
}

impl Channel {
    pub fn flavour(&self) -> Flavour {
        match self {
            Channel::FourMuon => Flavour::Muon,
            Channel::FourElectron => Flavour::Electron,
        }
    }

    pub fn cuts(&self) -> &'static LeptonCuts {
        match self {
            Channel::FourMuon => &LeptonCuts::MUON,
            Channel::FourElectron => &LeptonCuts::ELECTRON,
        }
    }

    /// Axis label for the four-lepton mass
    pub fn mass_label(&self) -> &'static str {
        match self {
            Channel::FourMuon => "m₄μ (GeV)",
            Channel::FourElectron => "m₄e (GeV)",
        }
    }
}

impl Select for Channel {
    fn filter_names(&self) -> &'static [&'static str] {
        match self {
            Channel::FourMuon => MUON_FILTERS,
            Channel::FourElectron => ELECTRON_FILTERS,
        }
    }

    fn select(
        &self,
        event: &Event,
        cutflow: &mut Cutflow,
    ) -> Option<HiggsCandidate> {
        let leptons = event.leptons(self.flavour());
        let cuts = self.cuts();
        cutflow.enter();

        let base_filters = [
            LeptonCuts::at_least_four,
            LeptonCuts::good_isolation,
            LeptonCuts::good_kinematics,
            LeptonCuts::close_to_primary_vertex,
            LeptonCuts::two_plus_two_minus,
        ];
        let mut step = 0;
        for filter in base_filters {
            if !filter(cuts, leptons) {
                return None;
            }
            cutflow.pass(step);
            step += 1;
        }

        let z_idx = reco_zz_to_4l(leptons);
        if !filter_z_dr(&z_idx, leptons) {
            return None;
        }
        cutflow.pass(step);
        step += 1;

        let z_mass = compute_z_masses_4l(&z_idx, leptons);
        for filter in [filter_z1_mass, filter_z2_mass] {
            if !filter(&z_mass) {
                return None;
            }
            cutflow.pass(step);
            step += 1;
        }
        debug_assert_eq!(step, self.filter_names().len());

        let h_mass = compute_higgs_mass_4l(&z_idx, leptons);
        Some(HiggsCandidate {
            z_idx,
            z_mass,
            h_mass,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::event::{EventBuilder, Lepton};
    use crate::reco::tests::lepton;
    use approx::assert_relative_eq;

    /// A four-muon event with Z masses of about 90 and 30 GeV
    pub(crate) fn golden_event(id: usize, flavour: Flavour) -> Event {
        let leptons = [
            lepton(45., 0., 0., 1),
            lepton(45., 0., PI as f32, -1),
            lepton(15., 1., 1.5, 1),
            lepton(15., 1., -1.5, -1),
        ];
        let mut ev = EventBuilder::new(id);
        for l in leptons {
            ev.add_lepton(flavour, l);
        }
        ev.build()
    }

    fn modified(f: impl Fn(&mut Lepton)) -> Event {
        let ev = golden_event(0, Flavour::Muon);
        let mut leptons: Vec<_> = ev.muons().iter().collect();
        f(&mut leptons[2]);
        let mut ev = EventBuilder::new(0);
        ev.leptons(Flavour::Muon, leptons.into_iter().collect());
        ev.build()
    }

    fn failed_step(event: &Event, channel: Channel) -> Option<&'static str> {
        let mut cutflow = Cutflow::new(channel.filter_names());
        channel.select(event, &mut cutflow);
        channel
            .filter_names()
            .iter()
            .find(|name| cutflow.passed(name) == Some(0))
            .copied()
    }

    #[test]
    fn golden_event_selected() {
        let ev = golden_event(0, Flavour::Muon);
        let mut cutflow = Cutflow::new(Channel::FourMuon.filter_names());
        let cand = Channel::FourMuon.select(&ev, &mut cutflow).unwrap();
        assert_eq!(cand.z_idx, [[0, 1], [2, 3]]);
        assert_relative_eq!(cand.z_mass[0], 90., epsilon = 1e-3);
        // m^2 = 2 pt1 pt2 (1 - cos(3))
        let z2 = (2. * 15. * 15. * (1. - 3f64.cos())).sqrt();
        assert_relative_eq!(cand.z_mass[1], z2, epsilon = 1e-3);
        assert!(cand.h_mass > cand.z_mass[0] + cand.z_mass[1]);
        assert_eq!(cutflow.entered(), 1);
        assert_eq!(cutflow.selected(), 1);

        // no electrons in this event
        let mut cutflow = Cutflow::new(Channel::FourElectron.filter_names());
        assert!(Channel::FourElectron.select(&ev, &mut cutflow).is_none());
        assert_eq!(failed_step(&ev, Channel::FourElectron), Some("At least four electrons"));
    }

    #[test]
    fn electron_channel() {
        let ev = golden_event(0, Flavour::Electron);
        let mut cutflow = Cutflow::new(Channel::FourElectron.filter_names());
        assert!(Channel::FourElectron.select(&ev, &mut cutflow).is_some());
        assert_eq!(cutflow.selected(), 1);
    }

    #[test]
    fn each_cut_rejects() {
        let ch = Channel::FourMuon;
        let ev = modified(|l| l.rel_iso = 0.5);
        assert_eq!(failed_step(&ev, ch), Some("Require good isolation"));
        let ev = modified(|l| l.rel_iso = -0.5);
        assert_eq!(failed_step(&ev, ch), Some("Require good isolation"));
        let ev = modified(|l| l.pt = 4.);
        assert_eq!(failed_step(&ev, ch), Some("Good muon kinematics"));
        let ev = modified(|l| l.eta = -2.45);
        assert_eq!(failed_step(&ev, ch), Some("Good muon kinematics"));
        for value in [f32::NAN, f32::INFINITY] {
            let ev = modified(|l| l.pt = value);
            assert_eq!(failed_step(&ev, ch), Some("Good muon kinematics"));
            let ev = modified(|l| l.phi = value);
            assert_eq!(failed_step(&ev, ch), Some("Good muon kinematics"));
            let ev = modified(|l| l.mass = value);
            assert_eq!(failed_step(&ev, ch), Some("Good muon kinematics"));
        }
        let ev = modified(|l| l.dxy = 0.6);
        assert_eq!(
            failed_step(&ev, ch),
            Some("Track close to primary vertex with small uncertainty")
        );
        let ev = modified(|l| l.dxy = 0.01);
        assert_eq!(
            failed_step(&ev, ch),
            Some("Track close to primary vertex with small uncertainty")
        );
        let ev = modified(|l| l.charge = -1);
        assert_eq!(failed_step(&ev, ch), Some("Two positive and two negative muons"));
        let ev = modified(|l| {
            l.eta = 1.;
            l.phi = -1.5;
        });
        assert_eq!(
            failed_step(&ev, ch),
            Some("Delta R separation of muons building Z system")
        );
        let ev = modified(|l| l.phi = -1.2);
        assert_eq!(failed_step(&ev, ch), Some("Mass of second Z candidate in [12, 120]"));
    }

    #[test]
    fn five_muons_rejected() {
        let ev = golden_event(0, Flavour::Muon);
        let mut leptons: Vec<_> = ev.muons().iter().collect();
        leptons.push(lepton(10., 0.1, 0.1, 1));
        let mut ev = EventBuilder::new(0);
        ev.leptons(Flavour::Muon, leptons.into_iter().collect());
        let ev = ev.build();
        assert_eq!(
            failed_step(&ev, Channel::FourMuon),
            Some("Two positive and two negative muons")
        );
    }

    #[test]
    fn channel_names() {
        assert_eq!(Channel::FourMuon.to_string(), "4mu");
        assert_eq!("4el".parse::<Channel>().unwrap(), Channel::FourElectron);
    }
}
