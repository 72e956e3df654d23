use std::path::{Path, PathBuf};

use log::debug;
use oxyroot::{ReaderTree, RootFile, Slice};

use crate::event::{Event, EventBuilder, Flavour, Leptons};
use crate::reader::{EventReadError, RewindError};
use crate::traits::Rewind;

/// Name of the tree holding the events in NanoAOD files
pub const DEFAULT_TREE: &str = "Events";

// Read a scalar branch into a vector with one entry per event
macro_rules! read_scalars {
    ($tree:expr, $file:expr, $name:expr, $ty:ty) => {{
        let name: &str = $name;
        let branch = $tree
            .branch(name)
            .ok_or_else(|| EventReadError::MissingBranch($file.to_owned(), name.to_owned()))?;
        branch
            .as_iter::<$ty>()
            .map_err(|err| EventReadError::Branch($file.to_owned(), name.to_owned(), err.to_string()))?
            .collect::<Vec<_>>()
    }};
}

// Read a variable-length array branch into one vector per event
//
// NanoAOD stores C arrays. Branches written as std::vector are accepted too.
macro_rules! read_arrays {
    ($tree:expr, $file:expr, $name:expr, $ty:ty) => {{
        let name: &str = $name;
        let branch = $tree
            .branch(name)
            .ok_or_else(|| EventReadError::MissingBranch($file.to_owned(), name.to_owned()))?;
        match branch.as_iter::<Slice<$ty>>() {
            Ok(arrays) => arrays.map(Slice::into_vec).collect::<Vec<Vec<$ty>>>(),
            Err(_) => branch
                .as_iter::<Vec<$ty>>()
                .map_err(|err| EventReadError::Branch($file.to_owned(), name.to_owned(), err.to_string()))?
                .collect::<Vec<Vec<$ty>>>(),
        }
    }};
}

/// All lepton columns of one flavour, one entry per event
#[derive(Debug, Default)]
struct LeptonColumns {
    n: Vec<u32>,
    pt: Vec<Vec<f32>>,
    eta: Vec<Vec<f32>>,
    phi: Vec<Vec<f32>>,
    mass: Vec<Vec<f32>>,
    charge: Vec<Vec<i32>>,
    rel_iso: Vec<Vec<f32>>,
    dxy: Vec<Vec<f32>>,
    dz: Vec<Vec<f32>>,
    dxy_err: Vec<Vec<f32>>,
    dz_err: Vec<Vec<f32>>,
}

fn prefix(flavour: Flavour) -> &'static str {
    match flavour {
        Flavour::Muon => "Muon",
        Flavour::Electron => "Electron",
    }
}

fn isolation_branch(flavour: Flavour) -> &'static str {
    match flavour {
        Flavour::Muon => "pfRelIso04_all",
        Flavour::Electron => "pfRelIso03_all",
    }
}

impl LeptonColumns {
    fn read(
        tree: &ReaderTree,
        file: &Path,
        flavour: Flavour,
    ) -> Result<Self, EventReadError> {
        let p = prefix(flavour);
        let col = |name: &str| format!("{p}_{name}");
        let res = Self {
            n: read_scalars!(tree, file, &format!("n{p}"), u32),
            pt: read_arrays!(tree, file, &col("pt"), f32),
            eta: read_arrays!(tree, file, &col("eta"), f32),
            phi: read_arrays!(tree, file, &col("phi"), f32),
            mass: read_arrays!(tree, file, &col("mass"), f32),
            charge: read_arrays!(tree, file, &col("charge"), i32),
            rel_iso: read_arrays!(tree, file, &col(isolation_branch(flavour)), f32),
            dxy: read_arrays!(tree, file, &col("dxy"), f32),
            dz: read_arrays!(tree, file, &col("dz"), f32),
            dxy_err: read_arrays!(tree, file, &col("dxyErr"), f32),
            dz_err: read_arrays!(tree, file, &col("dzErr"), f32),
        };
        res.check(file, flavour)?;
        Ok(res)
    }

    fn nevents(&self) -> usize {
        self.n.len()
    }

    fn check(&self, file: &Path, flavour: Flavour) -> Result<(), EventReadError> {
        let nevents = self.nevents();
        let columns = [
            self.pt.len(),
            self.eta.len(),
            self.phi.len(),
            self.mass.len(),
            self.charge.len(),
            self.rel_iso.len(),
            self.dxy.len(),
            self.dz.len(),
            self.dxy_err.len(),
            self.dz_err.len(),
        ];
        if columns.iter().any(|&len| len != nevents) {
            return Err(EventReadError::EntryMismatch(
                file.to_owned(),
                prefix(flavour),
            ));
        }
        Ok(())
    }

    /// Move the leptons of event `i` out of the columns
    fn take(
        &mut self,
        i: usize,
        file: &Path,
        flavour: Flavour,
    ) -> Result<Leptons, EventReadError> {
        let n = self.n[i] as usize;
        let res = Leptons {
            pt: std::mem::take(&mut self.pt[i]),
            eta: std::mem::take(&mut self.eta[i]),
            phi: std::mem::take(&mut self.phi[i]),
            mass: std::mem::take(&mut self.mass[i]),
            charge: std::mem::take(&mut self.charge[i]),
            rel_iso: std::mem::take(&mut self.rel_iso[i]),
            dxy: std::mem::take(&mut self.dxy[i]),
            dz: std::mem::take(&mut self.dz[i]),
            dxy_err: std::mem::take(&mut self.dxy_err[i]),
            dz_err: std::mem::take(&mut self.dz_err[i]),
        };
        let lengths = [
            res.eta.len(),
            res.phi.len(),
            res.mass.len(),
            res.charge.len(),
            res.rel_iso.len(),
            res.dxy.len(),
            res.dz.len(),
            res.dxy_err.len(),
            res.dz_err.len(),
        ];
        if res.pt.len() != n || lengths.iter().any(|&len| len != n) {
            return Err(EventReadError::LengthMismatch {
                file: file.to_owned(),
                collection: prefix(flavour),
                entry: i,
                expected: n,
            });
        }
        Ok(res)
    }
}

#[derive(Debug, Default)]
struct Columns {
    muons: LeptonColumns,
    electrons: LeptonColumns,
}

/// Reader for the lepton content of a NanoAOD ROOT file
///
/// The branches are read completely when the first event is requested.
#[derive(Debug)]
pub struct NanoAodReader {
    file: PathBuf,
    tree: String,
    columns: Option<Columns>,
    next: usize,
    first_id: usize,
}

impl NanoAodReader {
    pub fn new<P: AsRef<Path>>(file: P) -> Self {
        Self::with_tree(file, DEFAULT_TREE)
    }

    pub fn with_tree<P: AsRef<Path>>(file: P, tree: &str) -> Self {
        Self {
            file: file.as_ref().to_owned(),
            tree: tree.to_owned(),
            columns: None,
            next: 0,
            first_id: 0,
        }
    }

    /// Number the events starting from the given id
    pub fn first_id(mut self, id: usize) -> Self {
        self.first_id = id;
        self
    }

    fn load(&self) -> Result<Columns, EventReadError> {
        debug!("Reading tree {} from {:?}", self.tree, self.file);
        let mut root = RootFile::open(&self.file).map_err(|err| {
            EventReadError::Open(self.file.clone(), err.to_string())
        })?;
        let tree = root.get_tree(&self.tree).map_err(|err| {
            EventReadError::Tree(self.file.clone(), self.tree.clone(), err.to_string())
        })?;
        let muons = LeptonColumns::read(&tree, &self.file, Flavour::Muon)?;
        let electrons = LeptonColumns::read(&tree, &self.file, Flavour::Electron)?;
        if muons.nevents() != electrons.nevents() {
            return Err(EventReadError::EntryMismatch(self.file.clone(), "Electron"));
        }
        debug!("{} events in {:?}", muons.nevents(), self.file);
        Ok(Columns { muons, electrons })
    }

    fn next_event(&mut self) -> Option<Result<Event, EventReadError>> {
        if self.columns.is_none() {
            match self.load() {
                Ok(columns) => self.columns = Some(columns),
                Err(err) => {
                    // report the error only once
                    self.columns = Some(Columns::default());
                    return Some(Err(err));
                }
            }
        }
        let columns = self.columns.as_mut()?;
        let i = self.next;
        if i >= columns.muons.nevents() {
            return None;
        }
        self.next += 1;
        let muons = match columns.muons.take(i, &self.file, Flavour::Muon) {
            Ok(m) => m,
            Err(err) => return Some(Err(err)),
        };
        let electrons =
            match columns.electrons.take(i, &self.file, Flavour::Electron) {
                Ok(e) => e,
                Err(err) => return Some(Err(err)),
            };
        let mut ev = EventBuilder::new(self.first_id + i);
        ev.leptons(Flavour::Muon, muons)
            .leptons(Flavour::Electron, electrons);
        Some(Ok(ev.build()))
    }
}

impl Rewind for NanoAodReader {
    type Error = RewindError;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        // columns are moved out while iterating, so read them again
        self.columns = None;
        self.next = 0;
        Ok(())
    }
}

impl Iterator for NanoAodReader {
    type Item = Result<Event, EventReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.columns {
            Some(c) => {
                let left = c.muons.nevents().saturating_sub(self.next);
                (left, Some(left))
            }
            None => (0, None),
        }
    }
}
