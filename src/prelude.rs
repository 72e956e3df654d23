pub use crate::{
    analysis::{Analysis, AnalysisSettings, AnalysisSettingsBuilder, BookedResult},
    config::Config,
    histogram::{Hist1D, HistSpec},
    plot::Plotter,
    reader::CombinedReader,
    reco::{
        compute_higgs_mass_4l, compute_z_masses_4l, filter_z_candidates,
        filter_z_dr, reco_zz_to_4l,
    },
    selection::Channel,
    traits::Select,
};
