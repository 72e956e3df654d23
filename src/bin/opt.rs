use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hzz4l::config::Config;

#[derive(Debug, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Configuration file in YAML format.
    ///
    /// Settings that are not given take their default values.
    #[clap(long, short, value_parser)]
    pub(crate) config: Option<PathBuf>,

    /// Directory containing the input ROOT files.
    ///
    /// Overrides the setting in the configuration file.
    #[clap(long, short, value_parser)]
    pub(crate) datadir: Option<PathBuf>,

    /// Output directory for the plots.
    ///
    /// Overrides the setting in the configuration file.
    #[clap(long, short, value_parser)]
    pub(crate) outdir: Option<PathBuf>,

    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    pub(crate) loglevel: String,

    #[clap(
        short,
        long,
        default_value_t,
        help = "Number of threads.

If set to 0, a default number of threads is chosen.
The default can be set with the `RAYON_NUM_THREADS` environment
variable."
    )]
    pub(crate) threads: usize,

    /// Number of events read at once before they are processed in parallel.
    #[clap(long, default_value_t = 10_000)]
    pub(crate) chunk_size: usize,

    /// Don't show progress bars.
    #[clap(long)]
    pub(crate) no_progress: bool,
}

impl Opt {
    /// The analysis configuration with command line overrides applied
    pub(crate) fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(file) => Config::from_file(file)?,
            None => Config::default(),
        };
        if let Some(datadir) = &self.datadir {
            config.datadir = datadir.clone();
        }
        if let Some(outdir) = &self.outdir {
            config.outdir = outdir.clone();
        }
        config.validate().context("Invalid configuration")
    }
}
