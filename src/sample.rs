use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::event::Event;

/// Physics process a sample represents
#[derive(
    Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum SampleKind {
    /// Simulated H -> ZZ -> 4l
    Signal,
    /// Simulated ZZ -> 4l
    Background,
    /// Recorded collision data
    Data,
}

/// Where the events of a sample come from
#[derive(Clone, Debug)]
pub enum Source {
    /// ROOT files, read in the given order
    ///
    /// The same file may appear several times.
    Files(Vec<PathBuf>),
    /// Events held in memory
    Events(Arc<[Event]>),
}

/// A named collection of events
#[derive(Clone, Debug)]
pub struct Sample {
    name: String,
    kind: SampleKind,
    source: Source,
}

impl Sample {
    pub fn from_files<I, P>(name: impl Into<String>, kind: SampleKind, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            kind,
            source: Source::Files(files.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_events(
        name: impl Into<String>,
        kind: SampleKind,
        events: impl Into<Arc<[Event]>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source: Source::Events(events.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

/// Event weight of a sample
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Weight {
    /// Normalise simulated events to the integrated luminosity of the data
    Simulated {
        /// Integrated luminosity in pb^-1
        luminosity: f64,
        /// Cross section in pb
        cross_section: f64,
        /// Correction factor for the cross section
        scale: f64,
        /// Number of generated events
        generated_events: f64,
    },
    /// Recorded events have unit weight
    Recorded,
}

impl Weight {
    pub fn value(&self) -> f64 {
        match *self {
            Weight::Simulated {
                luminosity,
                cross_section,
                scale,
                generated_events,
            } => luminosity * cross_section * scale / generated_events,
            Weight::Recorded => 1.,
        }
    }
}
