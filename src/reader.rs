use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use log::debug;
use thiserror::Error;

use crate::{event::Event, root::NanoAodReader, traits::Rewind};

const ROOT_MAGIC_BYTES: [u8; 4] = [b'r', b'o', b'o', b't'];

pub struct FileReader(Box<dyn EventFileReader + Send>);

impl Rewind for FileReader {
    type Error = RewindError;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        self.0.rewind()
    }
}

impl Iterator for FileReader {
    type Item = Result<Event, EventReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

/// Returns an event reader for the file at `path`
pub fn make_reader<P: AsRef<Path>>(
    path: P,
    tree: &str,
) -> Result<FileReader, CreateError> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|err| CreateError::IoError(path.to_owned(), err))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|err| CreateError::IoError(path.to_owned(), err))?;
    if magic != ROOT_MAGIC_BYTES {
        return Err(CreateError::NotRoot(path.to_owned()));
    }
    debug!("Read {path:?} as ROOT file");
    Ok(FileReader(Box::new(NanoAodReader::with_tree(path, tree))))
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Failed to open {0:?}: {1}")]
    IoError(PathBuf, std::io::Error),

    #[error("{0:?} is not a ROOT file")]
    NotRoot(PathBuf),
}

#[derive(Debug, Error)]
pub enum RewindError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EventReadError {
    #[error("Failed to open ROOT file {0:?}: {1}")]
    Open(PathBuf, String),
    #[error("Failed to read tree `{1}` from {0:?}: {2}")]
    Tree(PathBuf, String, String),
    #[error("Branch `{1}` not found in {0:?}")]
    MissingBranch(PathBuf, String),
    #[error("Failed to read branch `{1}` from {0:?}: {2}")]
    Branch(PathBuf, String, String),
    #[error("Inconsistent number of entries in {1} branches of {0:?}")]
    EntryMismatch(PathBuf, &'static str),
    #[error("Entry {entry} in {file:?}: {collection} columns do not have the expected length {expected}")]
    LengthMismatch {
        file: PathBuf,
        collection: &'static str,
        entry: usize,
        expected: usize,
    },
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CombinedReader<R> {
    readers: Vec<R>,
    current: usize,
}

impl<R> CombinedReader<R> {
    pub fn new(readers: Vec<R>) -> Self {
        Self { readers, current: 0 }
    }

    /// Number of underlying readers
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Index of the reader currently in use
    pub fn current(&self) -> usize {
        self.current
    }
}

impl<R: Rewind> Rewind for CombinedReader<R> {
    type Error = <R as Rewind>::Error;

    fn rewind(&mut self) -> Result<(), Self::Error> {
        let end = self.current.min(self.readers.len().saturating_sub(1));
        for reader in self.readers.iter_mut().take(end + 1) {
            reader.rewind()?;
        }
        self.current = 0;
        Ok(())
    }
}

impl<R: Iterator> Iterator for CombinedReader<R> {
    type Item = <R as Iterator>::Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.readers.get_mut(self.current)?.next();
            if next.is_some() {
                return next;
            }
            if self.current + 1 >= self.readers.len() {
                return None;
            }
            self.current += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.readers
            .get(self.current..)
            .unwrap_or_default()
            .iter()
            .map(|r| r.size_hint())
            .reduce(|(accmin, accmax), (min, max)| {
                let accmax = match (accmax, max) {
                    (Some(accmax), Some(max)) => Some(accmax + max),
                    _ => None,
                };
                (accmin + min, accmax)
            })
            .unwrap_or_default()
    }
}

impl CombinedReader<FileReader> {
    /// Construct a new reader reading from the files with the given names
    pub fn from_files<I, P>(files: I, tree: &str) -> Result<Self, CreateError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let readers: Result<_, _> =
            files.into_iter().map(|f| make_reader(f, tree)).collect();
        Ok(Self::new(readers?))
    }
}

pub trait EventFileReader:
    Iterator<Item = Result<Event, EventReadError>> + Rewind<Error = RewindError>
{
}

impl EventFileReader for NanoAodReader {}
