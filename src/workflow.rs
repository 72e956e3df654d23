//! Fixed four-muon background workflow
//!
//! Runs the four-muon selection over a single stream of ZZ -> 4mu events
//! with a constant event weight and fills the `h_bkg_4mu` histogram.
use log::info;

use crate::analysis::BookedResult;
use crate::cutflow::Cutflow;
use crate::event::Event;
use crate::histogram::{Hist1D, HistSpec};
use crate::selection::Channel;
use crate::traits::Select;

/// Event weight of the ZZ -> 4mu background, 11580 * 0.077 * 1.386 / 1499064
pub const WORKFLOW_WEIGHT: f64 = 0.0008244082707609547;

pub fn bkg_4mu_spec() -> HistSpec {
    HistSpec::new("h_bkg_4mu", 36, 70., 180.)
}

/// Select four-muon candidates and fill their weighted mass
pub fn run_bkg_4mu<I, E>(events: I) -> Result<BookedResult, E>
where
    I: IntoIterator<Item = Result<Event, E>>,
{
    let channel = Channel::FourMuon;
    let mut histogram = Hist1D::new(bkg_4mu_spec());
    let mut cutflow = Cutflow::new(channel.filter_names());
    for event in events {
        if let Some(candidate) = channel.select(&event?, &mut cutflow) {
            histogram.fill(candidate.h_mass, WORKFLOW_WEIGHT);
        }
    }
    info!(
        "Selected {} of {} events",
        cutflow.selected(),
        cutflow.entered()
    );
    Ok(BookedResult { histogram, cutflow })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event::Flavour;
    use crate::selection::tests::golden_event;
    use approx::assert_relative_eq;

    #[test]
    fn weight_matches_background_normalisation() {
        let weight = Config::default().samples().background_4mu.weight.value();
        assert_relative_eq!(weight, WORKFLOW_WEIGHT, max_relative = 1e-15);
    }

    #[test]
    fn fill_selected() {
        let events = [
            golden_event(0, Flavour::Muon),
            golden_event(1, Flavour::Electron),
            golden_event(2, Flavour::Muon),
        ];
        let res =
            run_bkg_4mu(events.into_iter().map(Ok::<_, std::convert::Infallible>))
                .unwrap();
        assert_eq!(res.histogram.name(), "h_bkg_4mu");
        assert_eq!(res.cutflow.entered(), 3);
        assert_eq!(res.histogram.entries(), 2);
        assert_relative_eq!(res.histogram.integral(), 2. * WORKFLOW_WEIGHT);
    }

    #[test]
    fn read_error() {
        let events = vec![Ok(golden_event(0, Flavour::Muon)), Err("broken")];
        assert_eq!(run_bkg_4mu(events).unwrap_err(), "broken");
    }
}
