use crate::cutflow::Cutflow;
use crate::event::Event;
use crate::reco::HiggsCandidate;

pub trait Rewind {
    type Error;

    fn rewind(&mut self) -> Result<(), Self::Error>;
}

/// Chain of named filters reconstructing a Higgs candidate
pub trait Select {
    /// Names of the filters in the order in which they are applied
    fn filter_names(&self) -> &'static [&'static str];

    /// Reconstruct a candidate, recording passed filters in `cutflow`
    ///
    /// Returns `None` if any filter rejects the event.
    fn select(&self, event: &Event, cutflow: &mut Cutflow)
        -> Option<HiggsCandidate>;
}

pub trait Progress {
    fn inc(&self, i: u64);
    fn finish(&self);
}
