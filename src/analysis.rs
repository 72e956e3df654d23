use std::path::PathBuf;

use derive_builder::Builder;
use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::cutflow::Cutflow;
use crate::event::Event;
use crate::histogram::{Hist1D, HistError, HistSpec};
use crate::progress_bar::{Progress, ProgressBar};
use crate::reader::{CombinedReader, CreateError, EventReadError};
use crate::root::DEFAULT_TREE;
use crate::sample::{Sample, Source};
use crate::traits::Select;
use crate::selection::Channel;

/// Settings for the event loop
#[derive(Clone, Debug, Builder)]
pub struct AnalysisSettings {
    /// Number of events read before they are processed in parallel
    #[builder(default = "10_000")]
    chunk_size: usize,
    /// Name of the event tree in the input files
    #[builder(default = "DEFAULT_TREE.to_owned()", setter(into))]
    tree: String,
    /// Whether to show a progress bar
    #[builder(default = "true")]
    progress: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            tree: DEFAULT_TREE.to_owned(),
            progress: true,
        }
    }
}

/// Identifies a sample added to an [Analysis]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SampleId(usize);

/// Identifies a booked result
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResultHandle(usize);

#[derive(Clone, Debug)]
struct Booking {
    label: String,
    sample: usize,
    channel: Channel,
    spec: HistSpec,
    weight: f64,
}

/// Four-lepton mass histogram and cutflow of a booked selection
#[derive(Clone, Debug, PartialEq)]
pub struct BookedResult {
    pub histogram: Hist1D,
    pub cutflow: Cutflow,
}

impl BookedResult {
    fn new(booking: &Booking) -> Self {
        Self {
            histogram: Hist1D::new(booking.spec.clone()),
            cutflow: Cutflow::new(booking.channel.filter_names()),
        }
    }

    fn merge(&mut self, other: &BookedResult) {
        self.histogram.merge(&other.histogram);
        self.cutflow.merge(&other.cutflow);
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No result booked with handle {0:?}")]
    UnknownResult(ResultHandle),
    #[error("No sample with id {0:?}")]
    UnknownSample(SampleId),
    #[error("Failed to create event reader: {0}")]
    CreateErr(#[from] CreateError),
    #[error("Failed to read event: {0}")]
    ReadErr(#[from] EventReadError),
    #[error("Cannot book histogram: {0}")]
    HistErr(#[from] HistError),
}

/// Lazily evaluated H -> ZZ -> 4l analysis
///
/// Results are booked first. Requesting a result runs a single pass
/// over its sample, which fills all results booked on the same sample.
#[derive(Debug, Default)]
pub struct Analysis {
    settings: AnalysisSettings,
    samples: Vec<Sample>,
    bookings: Vec<Booking>,
    results: Vec<Option<BookedResult>>,
    passes: usize,
}

impl Analysis {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn add_sample(&mut self, sample: Sample) -> SampleId {
        self.samples.push(sample);
        SampleId(self.samples.len() - 1)
    }

    /// Book the weighted four-lepton mass histogram of `channel` on `sample`
    pub fn book(
        &mut self,
        label: impl Into<String>,
        sample: SampleId,
        channel: Channel,
        spec: HistSpec,
        weight: f64,
    ) -> Result<ResultHandle, AnalysisError> {
        if sample.0 >= self.samples.len() {
            return Err(AnalysisError::UnknownSample(sample));
        }
        spec.validate()?;
        let label = label.into();
        debug!(
            "Booking {label}: channel {channel}, sample {}, weight {weight}",
            self.samples[sample.0].name()
        );
        self.bookings.push(Booking {
            label,
            sample: sample.0,
            channel,
            spec,
            weight,
        });
        self.results.push(None);
        Ok(ResultHandle(self.bookings.len() - 1))
    }

    pub fn label(&self, handle: ResultHandle) -> Option<&str> {
        self.bookings.get(handle.0).map(|b| b.label.as_str())
    }

    /// Number of passes over samples so far
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Whether the result is available without running an event loop
    pub fn is_ready(&self, handle: ResultHandle) -> bool {
        matches!(self.results.get(handle.0), Some(Some(_)))
    }

    /// Get a booked result, running the event loop if necessary
    pub fn get_value(
        &mut self,
        handle: ResultHandle,
    ) -> Result<&BookedResult, AnalysisError> {
        let Some(sample) = self.bookings.get(handle.0).map(|b| b.sample) else {
            return Err(AnalysisError::UnknownResult(handle));
        };
        if self.results[handle.0].is_none() {
            self.run(sample)?;
        }
        self.results[handle.0]
            .as_ref()
            .ok_or(AnalysisError::UnknownResult(handle))
    }

    /// One pass over a sample, filling all pending bookings on it
    fn run(&mut self, sample: usize) -> Result<(), AnalysisError> {
        let pending: Vec<_> = self
            .bookings
            .iter()
            .enumerate()
            .filter(|(idx, b)| b.sample == sample && self.results[*idx].is_none())
            .map(|(idx, _)| idx)
            .collect();
        let bookings: Vec<_> =
            pending.iter().map(|&idx| &self.bookings[idx]).collect();
        let sample = &self.samples[sample];
        info!(
            "Event loop over {} sample {} for {} result(s)",
            sample.kind(),
            sample.name(),
            bookings.len()
        );
        let results = match sample.source() {
            Source::Events(events) => {
                let progress = self.progress(events.len(), sample.name());
                let res = process_events(events, &bookings, self.settings.chunk_size);
                progress.inc(events.len() as u64);
                progress.finish();
                res
            }
            Source::Files(files) => self.process_files(files, &bookings, sample.name())?,
        };
        self.passes += 1;
        for (idx, res) in pending.into_iter().zip(results) {
            res.cutflow.report(&self.bookings[idx].label);
            self.results[idx] = Some(res);
        }
        Ok(())
    }

    fn process_files(
        &self,
        files: &[PathBuf],
        bookings: &[&Booking],
        name: &str,
    ) -> Result<Vec<BookedResult>, AnalysisError> {
        let mut results: Vec<_> =
            bookings.iter().map(|b| BookedResult::new(b)).collect();
        let progress = self.progress(files.len(), name);
        let chunk_size = self.settings.chunk_size.max(1);
        // one file at a time to keep only its columns in memory
        for file in files {
            debug!("Reading {file:?}");
            let mut reader =
                CombinedReader::from_files([file], &self.settings.tree)?;
            loop {
                let chunk: Vec<Event> = reader
                    .by_ref()
                    .take(chunk_size)
                    .collect::<Result<_, _>>()?;
                if chunk.is_empty() {
                    break;
                }
                let partial = process_events(&chunk, bookings, chunk_size);
                for (acc, res) in results.iter_mut().zip(&partial) {
                    acc.merge(res);
                }
            }
            progress.inc(1);
        }
        progress.finish();
        Ok(results)
    }

    fn progress(&self, len: usize, name: &str) -> ProgressBar {
        if self.settings.progress {
            ProgressBar::new(len as u64, name)
        } else {
            ProgressBar::default()
        }
    }
}

fn select_and_fill(results: &mut [BookedResult], bookings: &[&Booking], event: &Event) {
    for (res, booking) in results.iter_mut().zip(bookings) {
        if let Some(candidate) = booking.channel.select(event, &mut res.cutflow) {
            res.histogram.fill(candidate.h_mass, booking.weight);
        }
    }
}

/// Run all booked selections over the events in parallel
fn process_events(
    events: &[Event],
    bookings: &[&Booking],
    chunk_size: usize,
) -> Vec<BookedResult> {
    let init = || -> Vec<BookedResult> {
        bookings.iter().map(|b| BookedResult::new(b)).collect()
    };
    events
        .par_chunks(chunk_size.max(1))
        .fold(init, |mut acc, chunk| {
            for event in chunk {
                select_and_fill(&mut acc, bookings, event);
            }
            acc
        })
        .reduce(init, |mut acc, partial| {
            for (a, p) in acc.iter_mut().zip(&partial) {
                a.merge(p);
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventBuilder, Flavour};
    use crate::sample::SampleKind;
    use crate::selection::tests::golden_event;
    use approx::assert_relative_eq;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn settings() -> AnalysisSettings {
        AnalysisSettingsBuilder::default()
            .chunk_size(3)
            .progress(false)
            .build()
            .unwrap()
    }

    fn spec(name: &str) -> HistSpec {
        HistSpec::new(name, 36, 70., 180.)
    }

    // 7 four-muon events, 4 four-electron events and 2 empty events
    fn mixed_events() -> Vec<Event> {
        let mut events = Vec::new();
        for id in 0..7 {
            events.push(golden_event(id, Flavour::Muon));
        }
        for id in 7..11 {
            events.push(golden_event(id, Flavour::Electron));
        }
        events.push(EventBuilder::new(11).build());
        events.push(EventBuilder::new(12).build());
        events
    }

    #[test]
    fn one_pass_per_sample() {
        log_init();
        let mut analysis = Analysis::new(settings());
        let sig = analysis.add_sample(Sample::from_events(
            "sig",
            SampleKind::Signal,
            mixed_events(),
        ));
        let data = analysis.add_sample(Sample::from_events(
            "data",
            SampleKind::Data,
            mixed_events(),
        ));
        let sig_4mu = analysis
            .book("sig_4mu", sig, Channel::FourMuon, spec("h_sig_4mu"), 0.5)
            .unwrap();
        let sig_4el = analysis
            .book("sig_4el", sig, Channel::FourElectron, spec("h_sig_4el"), 0.25)
            .unwrap();
        let data_4mu = analysis
            .book("data_4mu", data, Channel::FourMuon, spec("h_data_4mu"), 1.)
            .unwrap();
        assert_eq!(analysis.passes(), 0);
        assert_eq!(analysis.label(sig_4el), Some("sig_4el"));

        let res = analysis.get_value(sig_4mu).unwrap();
        assert_eq!(res.histogram.name(), "h_sig_4mu");
        assert_eq!(res.histogram.entries(), 7);
        assert_relative_eq!(res.histogram.integral(), 3.5);
        assert_eq!(res.cutflow.entered(), 13);
        assert_eq!(res.cutflow.passed("At least four muons"), Some(7));
        assert_eq!(analysis.passes(), 1);
        assert!(analysis.is_ready(sig_4el));
        assert!(!analysis.is_ready(data_4mu));

        let res = analysis.get_value(sig_4el).unwrap();
        assert_eq!(res.histogram.entries(), 4);
        assert_relative_eq!(res.histogram.integral(), 1.);
        assert_eq!(analysis.passes(), 1);

        let res = analysis.get_value(data_4mu).unwrap();
        assert_relative_eq!(res.histogram.integral(), 7.);
        assert_eq!(analysis.passes(), 2);
    }

    #[test]
    fn chunking_does_not_matter() {
        let events = mixed_events();
        let booking = Booking {
            label: "bkg_4mu".to_owned(),
            sample: 0,
            channel: Channel::FourMuon,
            spec: spec("h_bkg_4mu"),
            weight: 2.,
        };
        let bookings = [&booking];
        let reference = process_events(&events, &bookings, events.len());
        for chunk_size in [0, 1, 2, 5] {
            let res = process_events(&events, &bookings, chunk_size);
            assert_eq!(res, reference);
        }
        assert_relative_eq!(reference[0].histogram.integral(), 14.);
    }

    #[test]
    fn unknown_handles() {
        let mut analysis = Analysis::new(settings());
        assert!(matches!(
            analysis.book("x", SampleId(0), Channel::FourMuon, spec("h"), 1.),
            Err(AnalysisError::UnknownSample(_))
        ));
        assert!(matches!(
            analysis.get_value(ResultHandle(3)),
            Err(AnalysisError::UnknownResult(_))
        ));
    }

    #[test]
    fn invalid_binning() {
        let mut analysis = Analysis::new(settings());
        let sample = analysis.add_sample(Sample::from_events(
            "sig",
            SampleKind::Signal,
            mixed_events(),
        ));
        for spec in [
            HistSpec::new("h", 0, 70., 180.),
            HistSpec::new("h", 36, 180., 70.),
        ] {
            assert!(matches!(
                analysis.book("sig_4mu", sample, Channel::FourMuon, spec, 1.),
                Err(AnalysisError::HistErr(HistError::InvalidBinning(..)))
            ));
        }
        assert_eq!(analysis.label(ResultHandle(0)), None);
    }

    #[test]
    fn missing_file() {
        log_init();
        let mut analysis = Analysis::new(settings());
        let sample = analysis.add_sample(Sample::from_files(
            "missing",
            SampleKind::Data,
            ["/does/not/exist.root"],
        ));
        let handle = analysis
            .book("data_4el", sample, Channel::FourElectron, spec("h"), 1.)
            .unwrap();
        assert!(matches!(
            analysis.get_value(handle),
            Err(AnalysisError::CreateErr(_))
        ));
        assert_eq!(analysis.passes(), 0);
    }
}
