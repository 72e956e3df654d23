use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name and binning of a one-dimensional histogram
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HistSpec {
    pub name: String,
    pub nbins: usize,
    pub low: f64,
    pub high: f64,
}

impl HistSpec {
    pub fn new(name: impl Into<String>, nbins: usize, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            nbins,
            low,
            high,
        }
    }

    /// Check that there is at least one bin and the range is finite and non-empty
    pub fn validate(&self) -> Result<(), HistError> {
        let Self {
            nbins, low, high, ..
        } = *self;
        if nbins == 0 || !low.is_finite() || !high.is_finite() || low >= high {
            return Err(HistError::InvalidBinning(nbins, low, high));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum HistError {
    #[error("Invalid binning: {0} bins in [{1}, {2})")]
    InvalidBinning(usize, f64, f64),
    #[error("Incompatible binning: {0} bins in [{1}, {2}) vs {3} bins in [{4}, {5})")]
    IncompatibleBinning(usize, f64, f64, usize, f64, f64),
}

/// Weighted histogram with equal-width bins
///
/// Bin 0 is the underflow and bin `nbins + 1` the overflow.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Hist1D {
    spec: HistSpec,
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    entries: u64,
}

impl From<HistSpec> for Hist1D {
    fn from(spec: HistSpec) -> Self {
        Self::new(spec)
    }
}

impl Hist1D {
    /// Empty histogram with the given binning
    ///
    /// # Panics
    ///
    /// Panics if the binning is invalid, see [HistSpec::validate].
    /// [Hist1D::try_new] returns an error instead.
    pub fn new(spec: HistSpec) -> Self {
        if let Err(err) = spec.validate() {
            panic!("{err}");
        }
        Self::empty(spec)
    }

    pub fn try_new(spec: HistSpec) -> Result<Self, HistError> {
        spec.validate()?;
        Ok(Self::empty(spec))
    }

    fn empty(spec: HistSpec) -> Self {
        let n = spec.nbins + 2;
        Self {
            spec,
            sumw: vec![0.; n],
            sumw2: vec![0.; n],
            entries: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &HistSpec {
        &self.spec
    }

    pub fn nbins(&self) -> usize {
        self.spec.nbins
    }

    pub fn low(&self) -> f64 {
        self.spec.low
    }

    pub fn high(&self) -> f64 {
        self.spec.high
    }

    pub fn bin_width(&self) -> f64 {
        (self.spec.high - self.spec.low) / self.spec.nbins as f64
    }

    /// Index of the bin containing `x`, including under- and overflow
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() {
            return self.spec.nbins + 1;
        }
        if x < self.spec.low {
            return 0;
        }
        if x >= self.spec.high {
            return self.spec.nbins + 1;
        }
        let bin = ((x - self.spec.low) / self.bin_width()) as usize + 1;
        bin.min(self.spec.nbins)
    }

    pub fn fill(&mut self, x: f64, weight: f64) {
        let bin = self.find_bin(x);
        self.sumw[bin] += weight;
        self.sumw2[bin] += weight * weight;
        self.entries += 1;
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of weights in bin `bin`
    pub fn content(&self, bin: usize) -> f64 {
        self.sumw[bin]
    }

    /// Statistical uncertainty sqrt(sum of squared weights) in bin `bin`
    pub fn error(&self, bin: usize) -> f64 {
        self.sumw2[bin].sqrt()
    }

    pub fn underflow(&self) -> f64 {
        self.sumw[0]
    }

    pub fn overflow(&self) -> f64 {
        self.sumw[self.spec.nbins + 1]
    }

    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.spec.low + (bin as f64 - 1.) * self.bin_width()
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.bin_low_edge(bin) + 0.5 * self.bin_width()
    }

    /// Iterator over the regular bins as (low edge, high edge, content, error)
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        (1..=self.spec.nbins).map(move |bin| {
            let low = self.bin_low_edge(bin);
            (
                low,
                low + self.bin_width(),
                self.content(bin),
                self.error(bin),
            )
        })
    }

    /// Sum of weights in all regular bins
    pub fn integral(&self) -> f64 {
        self.sumw[1..=self.spec.nbins].iter().sum()
    }

    /// Largest content of any regular bin
    pub fn maximum(&self) -> f64 {
        self.sumw[1..=self.spec.nbins]
            .iter()
            .copied()
            .fold(f64::MIN, f64::max)
    }

    pub(crate) fn check_compatible(&self, other: &Hist1D) -> Result<(), HistError> {
        let (a, b) = (&self.spec, &other.spec);
        if a.nbins != b.nbins || a.low != b.low || a.high != b.high {
            return Err(HistError::IncompatibleBinning(
                a.nbins, a.low, a.high, b.nbins, b.low, b.high,
            ));
        }
        Ok(())
    }

    /// Add the contents of another histogram with the same binning
    pub fn add(&mut self, other: &Hist1D) -> Result<(), HistError> {
        self.check_compatible(other)?;
        self.merge(other);
        Ok(())
    }

    /// Merge a partial histogram filled from the same specification
    pub(crate) fn merge(&mut self, other: &Hist1D) {
        debug_assert!(self.check_compatible(other).is_ok());
        for (acc, w) in self.sumw.iter_mut().zip(&other.sumw) {
            *acc += w;
        }
        for (acc, w2) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *acc += w2;
        }
        self.entries += other.entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mass_hist() -> Hist1D {
        HistSpec::new("h", 36, 70., 180.).into()
    }

    #[test]
    fn binning() {
        let h = mass_hist();
        assert_relative_eq!(h.bin_width(), 110. / 36.);
        assert_eq!(h.find_bin(69.9), 0);
        assert_eq!(h.find_bin(70.), 1);
        assert_eq!(h.find_bin(124.), 18);
        assert_eq!(h.find_bin(179.999), 36);
        assert_eq!(h.find_bin(180.), 37);
        assert_eq!(h.find_bin(f64::NAN), 37);
        assert_relative_eq!(h.bin_low_edge(1), 70.);
        assert_relative_eq!(h.bin_low_edge(37), 180., epsilon = 1e-9);
    }

    #[test]
    fn invalid_binning() {
        for (nbins, low, high) in [
            (0, 70., 180.),
            (36, 180., 70.),
            (36, 70., 70.),
            (36, f64::NAN, 180.),
            (36, 70., f64::INFINITY),
        ] {
            let spec = HistSpec::new("h", nbins, low, high);
            assert!(matches!(
                spec.validate(),
                Err(HistError::InvalidBinning(..))
            ));
            assert!(Hist1D::try_new(spec).is_err());
        }
        let h = Hist1D::try_new(HistSpec::new("h", 36, 70., 180.)).unwrap();
        assert_eq!(h, mass_hist());
    }

    #[test]
    #[should_panic]
    fn new_rejects_empty_range() {
        Hist1D::new(HistSpec::new("h", 36, 70., 70.));
    }

    #[test]
    fn weighted_fill() {
        let mut h = mass_hist();
        h.fill(124., 0.5);
        h.fill(124.1, 0.5);
        h.fill(60., 2.);
        h.fill(200., 3.);
        assert_eq!(h.entries(), 4);
        assert_relative_eq!(h.content(18), 1.);
        assert_relative_eq!(h.error(18), 0.5f64.sqrt());
        assert_relative_eq!(h.underflow(), 2.);
        assert_relative_eq!(h.overflow(), 3.);
        assert_relative_eq!(h.integral(), 1.);
        assert_relative_eq!(h.maximum(), 1.);
        assert_eq!(h.bins().count(), 36);
    }

    #[test]
    fn add() {
        let mut a = mass_hist();
        a.fill(100., 1.);
        let mut b = mass_hist();
        b.fill(100., 2.);
        b.fill(150., 1.);
        a.add(&b).unwrap();
        let bin = a.find_bin(100.);
        assert_relative_eq!(a.content(bin), 3.);
        assert_relative_eq!(a.error(bin), 5f64.sqrt());
        assert_relative_eq!(a.integral(), 4.);
        assert_eq!(a.entries(), 3);

        let c = Hist1D::new(HistSpec::new("c", 10, 70., 180.));
        assert!(a.add(&c).is_err());
    }
}
