use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::histogram::HistSpec;
use crate::sample::{Sample, SampleKind, Weight};

/// Integrated luminosity of the 2012 B and C runs in pb^-1
pub const LUMINOSITY: f64 = 11580.;
/// Scale factor for the ZZ -> 4l cross section
pub const ZZ_SCALE: f64 = 1.386;

fn default_replicas() -> usize {
    1
}

fn default_scale() -> f64 {
    1.
}

/// Files and normalisation of a simulated sample
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatedSample {
    pub files: Vec<PathBuf>,
    /// How often the list of files is processed
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// Cross section in pb
    pub cross_section: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Number of generated events
    pub generated_events: f64,
}

/// Files of a recorded data sample
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecordedSample {
    pub files: Vec<PathBuf>,
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

/// Binning of the four-lepton mass histograms
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Binning {
    pub nbins: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for Binning {
    fn default() -> Self {
        Self {
            nbins: 36,
            low: 70.,
            high: 180.,
        }
    }
}

impl Binning {
    pub fn spec(&self, name: &str) -> HistSpec {
        HistSpec::new(name, self.nbins, self.low, self.high)
    }
}

/// Analysis settings
///
/// Every setting has a default, so a configuration file only has to
/// list the settings that differ.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory containing the input files
    pub datadir: PathBuf,
    /// Directory for the plots
    pub outdir: PathBuf,
    /// Name of the event tree in the input files
    pub tree: String,
    /// Integrated luminosity in pb^-1
    pub luminosity: f64,
    pub binning: Binning,
    pub signal: SimulatedSample,
    pub background_4mu: SimulatedSample,
    pub background_4el: SimulatedSample,
    pub data_4mu: RecordedSample,
    pub data_4el: RecordedSample,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datadir: PathBuf::from("data"),
            outdir: PathBuf::from("."),
            tree: "Events".to_owned(),
            luminosity: LUMINOSITY,
            binning: Binning::default(),
            signal: SimulatedSample {
                files: vec!["SMHiggsToZZTo4L.root".into()],
                replicas: 10,
                cross_section: 0.0065,
                scale: 1.,
                generated_events: 299973.,
            },
            background_4mu: SimulatedSample {
                files: vec!["ZZTo4mu.root".into()],
                replicas: 10,
                cross_section: 0.077,
                scale: ZZ_SCALE,
                generated_events: 1499064.,
            },
            background_4el: SimulatedSample {
                files: vec!["ZZTo4e.root".into()],
                replicas: 10,
                cross_section: 0.077,
                scale: ZZ_SCALE,
                generated_events: 1499093.,
            },
            data_4mu: RecordedSample {
                files: vec![
                    "Run2012B_DoubleMuParked.root".into(),
                    "Run2012C_DoubleMuParked.root".into(),
                ],
                replicas: 5,
            },
            data_4el: RecordedSample {
                files: vec![
                    "Run2012B_DoubleElectron.root".into(),
                    "Run2012C_DoubleElectron.root".into(),
                ],
                replicas: 5,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open configuration file {0:?}: {1}")]
    Open(PathBuf, std::io::Error),
    #[error("Failed to parse configuration file {0:?}: {1}")]
    Parse(PathBuf, serde_yaml::Error),
    #[error("Sample {0} has no input files")]
    NoFiles(&'static str),
    #[error("Invalid binning: {0} bins in [{1}, {2})")]
    Binning(usize, f64, f64),
}

/// A sample together with its event weight
#[derive(Clone, Debug)]
pub struct WeightedSample {
    pub sample: Sample,
    pub weight: Weight,
}

/// All samples entering the analysis
#[derive(Clone, Debug)]
pub struct Samples {
    pub signal: WeightedSample,
    pub background_4mu: WeightedSample,
    pub background_4el: WeightedSample,
    pub data_4mu: WeightedSample,
    pub data_4el: WeightedSample,
}

impl Config {
    /// Read the configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|err| ConfigError::Open(path.to_owned(), err))?;
        let config: Config = serde_yaml::from_reader(file)
            .map_err(|err| ConfigError::Parse(path.to_owned(), err))?;
        config.validate()
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        let Binning { nbins, low, high } = self.binning;
        if nbins == 0 || !(low < high) {
            return Err(ConfigError::Binning(nbins, low, high));
        }
        let files = [
            ("signal", &self.signal.files, self.signal.replicas),
            ("background_4mu", &self.background_4mu.files, self.background_4mu.replicas),
            ("background_4el", &self.background_4el.files, self.background_4el.replicas),
            ("data_4mu", &self.data_4mu.files, self.data_4mu.replicas),
            ("data_4el", &self.data_4el.files, self.data_4el.replicas),
        ];
        for (name, files, replicas) in files {
            if files.is_empty() || replicas == 0 {
                return Err(ConfigError::NoFiles(name));
            }
        }
        Ok(self)
    }

    /// Input file paths, with the file list repeated `replicas` times
    fn paths(&self, files: &[PathBuf], replicas: usize) -> Vec<PathBuf> {
        std::iter::repeat(files)
            .take(replicas)
            .flatten()
            .map(|f| self.datadir.join(f))
            .collect()
    }

    fn simulated(
        &self,
        name: &str,
        kind: SampleKind,
        s: &SimulatedSample,
    ) -> WeightedSample {
        WeightedSample {
            sample: Sample::from_files(name, kind, self.paths(&s.files, s.replicas)),
            weight: Weight::Simulated {
                luminosity: self.luminosity,
                cross_section: s.cross_section,
                scale: s.scale,
                generated_events: s.generated_events,
            },
        }
    }

    fn recorded(&self, name: &str, s: &RecordedSample) -> WeightedSample {
        WeightedSample {
            sample: Sample::from_files(
                name,
                SampleKind::Data,
                self.paths(&s.files, s.replicas),
            ),
            weight: Weight::Recorded,
        }
    }

    pub fn samples(&self) -> Samples {
        use SampleKind::*;
        Samples {
            signal: self.simulated("SMHiggsToZZTo4L", Signal, &self.signal),
            background_4mu: self.simulated("ZZTo4mu", Background, &self.background_4mu),
            background_4el: self.simulated("ZZTo4e", Background, &self.background_4el),
            data_4mu: self.recorded("DoubleMuParked", &self.data_4mu),
            data_4el: self.recorded("DoubleElectron", &self.data_4el),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::sample::Source;
    use approx::assert_relative_eq;

    fn files(s: &WeightedSample) -> Vec<PathBuf> {
        match s.sample.source() {
            Source::Files(files) => files.clone(),
            Source::Events(_) => panic!("expected files"),
        }
    }

    #[test]
    fn default_samples() {
        let samples = Config::default().samples();
        let sig = files(&samples.signal);
        assert_eq!(sig.len(), 10);
        assert!(sig.iter().all(|f| f == Path::new("data/SMHiggsToZZTo4L.root")));

        let data = files(&samples.data_4mu);
        assert_eq!(data.len(), 10);
        assert_eq!(data[0], Path::new("data/Run2012B_DoubleMuParked.root"));
        assert_eq!(data[1], Path::new("data/Run2012C_DoubleMuParked.root"));
        assert_eq!(data[2], data[0]);

        assert_relative_eq!(samples.background_4mu.weight.value(), 0.0008244082707609547);
        assert_eq!(samples.data_4el.weight, Weight::Recorded);
        assert_eq!(samples.background_4el.sample.kind(), SampleKind::Background);
    }

    #[test]
    fn partial_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "datadir: /tmp/nanoaod
binning:
  nbins: 22
  low: 70
  high: 180
data_4el:
  files: [Run2012C_DoubleElectron.root]
"
        )
        .unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.datadir, PathBuf::from("/tmp/nanoaod"));
        assert_eq!(config.binning.nbins, 22);
        assert_eq!(config.data_4el.replicas, 1);
        assert_eq!(config.signal, Config::default().signal);
        let data = files(&config.samples().data_4el);
        assert_eq!(data, vec![PathBuf::from("/tmp/nanoaod/Run2012C_DoubleElectron.root")]);
    }

    #[test]
    fn invalid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "lumi: 3").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse(..))
        ));

        let mut config = Config::default();
        config.binning.high = 10.;
        assert!(matches!(config.validate(), Err(ConfigError::Binning(..))));

        let mut config = Config::default();
        config.signal.files.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoFiles("signal"))));
    }
}
