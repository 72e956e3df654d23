use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::event::Leptons;
use crate::four_vector::{delta_r, FourVector};

/// Nominal Z boson mass in GeV
pub const Z_MASS: f64 = 91.2;

/// Minimum angular separation between the leptons building a Z candidate
pub const MIN_DELTA_R: f64 = 0.02;

/// Allowed mass window of the Z candidate closest to the nominal Z mass
pub const Z1_MASS_WINDOW: (f64, f64) = (40., 120.);

/// Allowed mass window of the second Z candidate
pub const Z2_MASS_WINDOW: (f64, f64) = (12., 120.);

/// Lepton indices of the two Z candidates
///
/// The first pair is the opposite-charge pair with invariant mass
/// closest to [Z_MASS], the second pair consists of the remaining
/// two leptons.
pub type ZPairs = [[usize; 2]; 2];

/// A reconstructed H -> ZZ -> 4l candidate
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct HiggsCandidate {
    pub z_idx: ZPairs,
    /// Z candidate masses, the first one being closest to [Z_MASS]
    pub z_mass: [f64; 2],
    pub h_mass: f64,
}

fn pair_mass(pair: [usize; 2], leptons: &Leptons) -> f64 {
    (leptons.momentum(pair[0]) + leptons.momentum(pair[1])).m().into()
}

/// Reconstruct two Z candidates from four leptons of the same kind
///
/// Among all opposite-charge pairs, the one with invariant mass closest
/// to [Z_MASS] is chosen, with the first one winning in case of a
/// tie. Pairs are enumerated in the order (0,1), (0,2), (0,3), (1,2),
/// (1,3), (2,3). The remaining two leptons form the second pair.
///
/// The leptons must contain exactly two positive and two negative
/// charges. Without any opposite-charge pair, the first pair is (0, 0).
pub fn reco_zz_to_4l(leptons: &Leptons) -> ZPairs {
    debug_assert!(leptons.len() >= 4);
    let charge = leptons.charge();
    let mut best = None;
    for (i1, i2) in (0..4).tuple_combinations() {
        if charge[i1] == charge[i2] {
            continue;
        }
        let dist = (Z_MASS - pair_mass([i1, i2], leptons)).abs();
        match best {
            Some((best_dist, _)) if best_dist <= dist => {}
            _ => best = Some((dist, [i1, i2])),
        }
    }
    let z1 = best.map(|(_, pair)| pair).unwrap_or_default();

    let mut rest = (0..4).filter(|i| !z1.contains(i));
    let z2 = [rest.next().unwrap_or_default(), rest.next().unwrap_or_default()];
    [z1, z2]
}

/// Compute the Z candidate masses
///
/// The masses are ordered by their distance to [Z_MASS]. Unless the
/// first pair is strictly closer, the order is reversed.
pub fn compute_z_masses_4l(idx: &ZPairs, leptons: &Leptons) -> [f64; 2] {
    order_by_z_distance([pair_mass(idx[0], leptons), pair_mass(idx[1], leptons)])
}

fn order_by_z_distance(z_masses: [f64; 2]) -> [f64; 2] {
    if (z_masses[0] - Z_MASS).abs() < (z_masses[1] - Z_MASS).abs() {
        z_masses
    } else {
        [z_masses[1], z_masses[0]]
    }
}

/// Invariant mass of all four leptons building the Z candidates
pub fn compute_higgs_mass_4l(idx: &ZPairs, leptons: &Leptons) -> f64 {
    let p: FourVector = idx
        .iter()
        .flatten()
        .map(|&i| leptons.momentum(i))
        .sum();
    p.m().into()
}

/// Whether the leptons in each Z candidate are sufficiently separated
pub fn filter_z_dr(idx: &ZPairs, leptons: &Leptons) -> bool {
    let (eta, phi) = (leptons.eta(), leptons.phi());
    idx.iter().all(|&[i1, i2]| {
        let dr = delta_r(
            eta[i1].into(),
            eta[i2].into(),
            phi[i1].into(),
            phi[i2].into(),
        );
        dr >= MIN_DELTA_R
    })
}

fn in_window(m: f64, (low, high): (f64, f64)) -> bool {
    m > low && m < high
}

/// Whether the first Z candidate mass lies inside (40, 120)
pub fn filter_z1_mass(z_mass: &[f64; 2]) -> bool {
    in_window(z_mass[0], Z1_MASS_WINDOW)
}

/// Whether the second Z candidate mass lies inside (12, 120)
pub fn filter_z2_mass(z_mass: &[f64; 2]) -> bool {
    in_window(z_mass[1], Z2_MASS_WINDOW)
}

/// Apply both cuts on the Z candidate masses
pub fn filter_z_candidates(z_mass: &[f64; 2]) -> bool {
    filter_z1_mass(z_mass) && filter_z2_mass(z_mass)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::event::Lepton;
    use approx::assert_relative_eq;

    pub(crate) fn lepton(pt: f32, eta: f32, phi: f32, charge: i32) -> Lepton {
        Lepton {
            pt,
            eta,
            phi,
            mass: 0.,
            charge,
            rel_iso: 0.05,
            dxy: 0.001,
            dz: 0.002,
            dxy_err: 0.001,
            dz_err: 0.001,
        }
    }

    // Massless leptons: a back-to-back pair with equal pt has mass 2 pt
    pub(crate) fn four_leptons() -> Leptons {
        [
            lepton(45., 0., 0., 1),
            lepton(30., 0.5, 1.0, 1),
            lepton(45., 0., PI as f32, -1),
            lepton(20., -0.7, -1.5, -1),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn best_pair_closest_to_z() {
        let leptons = four_leptons();
        let idx = reco_zz_to_4l(&leptons);
        assert_eq!(idx, [[0, 2], [1, 3]]);

        let best = pair_mass(idx[0], &leptons);
        assert_relative_eq!(best, 90., epsilon = 1e-3);
        for (i1, i2) in (0..4).tuple_combinations() {
            if leptons.charge()[i1] != leptons.charge()[i2] {
                let m = pair_mass([i1, i2], &leptons);
                assert!((best - Z_MASS).abs() <= (m - Z_MASS).abs());
            }
        }
    }

    #[test]
    fn same_charge_pairs_ignored() {
        // leptons 0 and 1 are a perfect Z, but have the same charge
        let leptons: Leptons = [
            lepton(45.6, 0., 0., 1),
            lepton(45.6, 0., PI as f32, 1),
            lepton(10., 1., 1., -1),
            lepton(10., -1., -1., -1),
        ]
        .into_iter()
        .collect();
        let [z1, z2] = reco_zz_to_4l(&leptons);
        assert_ne!(z1, [0, 1]);
        assert_ne!(leptons.charge()[z1[0]], leptons.charge()[z1[1]]);
        assert_ne!(leptons.charge()[z2[0]], leptons.charge()[z2[1]]);
    }

    #[test]
    fn no_opposite_charge_pair() {
        let leptons: Leptons = [
            lepton(45., 0., 0., 1),
            lepton(45., 0., PI as f32, 1),
            lepton(20., 1., 1., 1),
            lepton(20., -1., -1., 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(reco_zz_to_4l(&leptons), [[0, 0], [1, 2]]);
    }

    #[test]
    fn first_pair_wins_tie() {
        // all four leptons identical up to charge: every opposite-charge
        // pair has the same mass
        let leptons: Leptons = [
            lepton(20., 0., 0., 1),
            lepton(20., 0., PI as f32, -1),
            lepton(20., 0., 0., 1),
            lepton(20., 0., PI as f32, -1),
        ]
        .into_iter()
        .collect();
        assert_eq!(reco_zz_to_4l(&leptons), [[0, 1], [2, 3]]);
    }

    #[test]
    fn z_masses_ordered() {
        let leptons = four_leptons();
        let idx = reco_zz_to_4l(&leptons);
        let z_mass = compute_z_masses_4l(&idx, &leptons);
        assert!((z_mass[0] - Z_MASS).abs() <= (z_mass[1] - Z_MASS).abs());

        let swapped = [idx[1], idx[0]];
        assert_eq!(compute_z_masses_4l(&swapped, &leptons), z_mass);
    }

    #[test]
    fn equal_z_distance_swaps() {
        // both are exactly 0.5 away from the nominal mass
        let (below, above) = (Z_MASS - 0.5, Z_MASS + 0.5);
        assert_eq!(order_by_z_distance([below, above]), [above, below]);
        assert_eq!(order_by_z_distance([above, below]), [below, above]);

        assert_eq!(order_by_z_distance([90., 30.]), [90., 30.]);
        assert_eq!(order_by_z_distance([30., 90.]), [90., 30.]);
    }

    #[test]
    fn higgs_mass_invariant_under_reordering() {
        let leptons = four_leptons();
        let idx = reco_zz_to_4l(&leptons);
        let m = compute_higgs_mass_4l(&idx, &leptons);
        let reordered = [
            [idx[1], idx[0]],
            [[idx[0][1], idx[0][0]], idx[1]],
            [[idx[1][1], idx[1][0]], [idx[0][1], idx[0][0]]],
        ];
        for idx in reordered {
            assert_relative_eq!(
                compute_higgs_mass_4l(&idx, &leptons),
                m,
                epsilon = 1e-9
            );
        }
        let total: FourVector = (0..4).map(|i| leptons.momentum(i)).sum();
        assert_relative_eq!(m, f64::from(total.m()), epsilon = 1e-9);
    }

    #[test]
    fn collinear_leptons_rejected() {
        let leptons: Leptons = [
            lepton(40., 0.3, 0.2, 1),
            lepton(40., 0.3, 0.2, -1),
            lepton(30., -1., 2., 1),
            lepton(25., 1., -2., -1),
        ]
        .into_iter()
        .collect();
        assert!(!filter_z_dr(&[[0, 1], [2, 3]], &leptons));
        assert!(filter_z_dr(&[[0, 3], [1, 2]], &leptons));
    }

    #[test]
    fn mass_window_boundaries() {
        assert!(filter_z_candidates(&[91., 30.]));
        assert!(!filter_z1_mass(&[40., 30.]));
        assert!(!filter_z1_mass(&[120., 30.]));
        assert!(filter_z1_mass(&[40.001, 30.]));
        assert!(!filter_z2_mass(&[91., 12.]));
        assert!(!filter_z2_mass(&[91., 120.]));
        assert!(filter_z2_mass(&[91., 12.001]));
        assert!(!filter_z_candidates(&[91., 12.]));
    }
}
