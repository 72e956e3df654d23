use std::fmt::{self, Display};

use log::info;

/// Number of events passing each of a sequence of named filters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cutflow {
    names: &'static [&'static str],
    entered: u64,
    passed: Vec<u64>,
}

impl Cutflow {
    pub fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            entered: 0,
            passed: vec![0; names.len()],
        }
    }

    /// Record an event entering the first filter
    pub fn enter(&mut self) {
        self.entered += 1;
    }

    /// Record an event passing the filter with index `step`
    pub fn pass(&mut self, step: usize) {
        self.passed[step] += 1;
    }

    pub fn entered(&self) -> u64 {
        self.entered
    }

    /// Number of events passing the filter with the given name
    pub fn passed(&self, name: &str) -> Option<u64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|pos| self.passed[pos])
    }

    /// Number of events passing all filters
    pub fn selected(&self) -> u64 {
        self.passed.last().copied().unwrap_or(self.entered)
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Combine the counts from a cutflow with the same filters
    pub fn merge(&mut self, other: &Cutflow) {
        debug_assert_eq!(self.names, other.names);
        self.entered += other.entered;
        for (acc, n) in self.passed.iter_mut().zip(&other.passed) {
            *acc += n;
        }
    }

    /// Log the cutflow at info level
    pub fn report(&self, label: &str) {
        info!("Cutflow for {label}:");
        for line in self.to_string().lines() {
            info!("{line}");
        }
    }
}

fn percent(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.
    } else {
        100. * num as f64 / denom as f64
    }
}

impl Display for Cutflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.names.iter().map(|n| n.len()).max().unwrap_or(0);
        let mut prev = self.entered;
        for (name, &pass) in self.names.iter().zip(&self.passed) {
            writeln!(
                f,
                "{name:<width$}: pass={pass:<10} all={prev:<10} -- eff={:.2} % cumulative eff={:.2} %",
                percent(pass, prev),
                percent(pass, self.entered),
            )?;
            prev = pass;
        }
        Ok(())
    }
}
