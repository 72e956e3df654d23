//! `hzz4l` reconstructs Higgs boson candidates decaying into four
//! leptons, H -> ZZ -> 4l, from CMS open data in the NanoAOD format.
//!
//! # How to use
//!
//! The `hzz4l` binary runs the complete analysis: it books the
//! four-muon and four-electron mass histograms for the signal,
//! background and data samples, runs one event loop per sample and
//! plots the resulting distributions.
//!
//! ## Most relevant modules
//!
//! - [prelude] exports a list of the most relevant classes and objects
//! - [reco] for the reconstruction of the Z and Higgs candidates
//! - [selection] for the four-muon and four-electron selection chains
//! - [analysis] for booking results and running event loops
//! - [reader] defines readers from one or more event files
//! - [plot] for the final plots
//!

/// Booked results and event loop
pub mod analysis;
/// Analysis configuration
pub mod config;
/// Selection statistics
pub mod cutflow;
/// Collision events with lepton collections
pub mod event;
/// Four-vector class
pub mod four_vector;
/// Weighted histograms
pub mod histogram;
/// Plotting
pub mod plot;
/// Most important exports
pub mod prelude;
/// Progress bar
pub mod progress_bar;
/// Event readers
pub mod reader;
/// Z and Higgs candidate reconstruction
pub mod reco;
/// NanoAOD ROOT file interface
pub mod root;
/// Samples and their weights
pub mod sample;
/// Lepton selection chains
pub mod selection;
/// Common traits
pub mod traits;
pub mod workflow;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
