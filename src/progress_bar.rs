pub use crate::traits::Progress;

impl Progress for indicatif::ProgressBar {
    fn inc(&self, i: u64) {
        indicatif::ProgressBar::inc(self, i)
    }

    fn finish(&self) {
        indicatif::ProgressBar::finish_and_clear(self)
    }
}

impl Progress for logbar::ProgressBar {
    fn inc(&self, i: u64) {
        logbar::ProgressBar::inc(self, i as usize)
    }

    fn finish(&self) {
        logbar::ProgressBar::finish(self)
    }
}

/// Progress indicator for an event loop pass
///
/// Depending on the log level and on whether stderr is an interactive
/// terminal, this is an `indicatif` bar, a `logbar` bar, or nothing.
pub enum ProgressBar {
    Hidden,
    Shown {
        bar: Box<dyn Progress + Send + Sync>,
        /// Log level to restore once the bar is finished
        log_level: log::LevelFilter,
    },
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::Hidden
    }
}

impl Progress for ProgressBar {
    fn inc(&self, i: u64) {
        if let Self::Shown { bar, .. } = self {
            bar.inc(i)
        }
    }

    fn finish(&self) {
        if let Self::Shown { bar, log_level } = self {
            bar.finish();
            log::set_max_level(*log_level);
        }
    }
}

impl Drop for ProgressBar {
    // the bar may be dropped without `finish` on an early error return
    fn drop(&mut self) {
        if let Self::Shown { log_level, .. } = self {
            log::set_max_level(*log_level);
        }
    }
}

impl ProgressBar {
    /// A new progress bar with the given maximum progress and message
    pub fn new(len: u64, message: &str) -> Self {
        if log::max_level() != log::LevelFilter::Info {
            ProgressBar::Hidden
        } else if console::Term::stderr().features().is_attended() {
            ProgressBar::indicatif(len, message)
        } else {
            ProgressBar::logbar(len, message)
        }
    }

    fn indicatif(len: u64, message: &str) -> Self {
        let bar = indicatif::ProgressBar::new(len);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{bar:60.cyan/cyan} {msg} {pos}/{len} [{elapsed}]")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_owned());
        Self::shown(Box::new(bar))
    }

    fn logbar(len: u64, message: &str) -> Self {
        let style = logbar::Style::new().indicator('█');
        eprintln!("{message}");
        let bar = logbar::ProgressBar::with_style(len as usize, style);
        Self::shown(Box::new(bar))
    }

    fn shown(bar: Box<dyn Progress + Send + Sync>) -> Self {
        let log_level = log::max_level();
        // log messages would overwrite the bar
        log::set_max_level(log::LevelFilter::Off);
        Self::Shown { bar, log_level }
    }
}
