//! Fetching of raw descriptors.

use crate::config::ContentConfiguration;
use log::trace;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum TransportError {
    /// No content root contains the requested url.
    NotFound(String),
    /// The file exists but could not be read.
    CannotRead(String, std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotFound(url) => write!(f, "{:?} was not found in any root", url),
            TransportError::CannotRead(url, e) => write!(f, "cannot read {:?}: {}", url, e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::NotFound(_) => None,
            TransportError::CannotRead(_, e) => Some(e),
        }
    }
}

/// Source of raw descriptor text addressed by url.
pub trait DescriptorSource {
    fn fetch(&self, url: &str) -> Result<String, TransportError>;
}

impl<F> DescriptorSource for F
where
    F: Fn(&str) -> Result<String, TransportError>,
{
    fn fetch(&self, url: &str) -> Result<String, TransportError> {
        self(url)
    }
}

/// Reads descriptors from files in one of the content roots.
pub struct FileSystemSource {
    roots: Vec<PathBuf>,
}

impl FileSystemSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn from_config(config: &ContentConfiguration) -> Self {
        Self::new(config.content_roots.clone())
    }

    /// Tries to find the file for the url in one of the roots.
    ///
    /// If the file is not found in any of the configured roots this
    /// function returns `None`.
    pub fn find(&self, url: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(url))
            .find(|path| path.is_file())
    }
}

impl DescriptorSource for FileSystemSource {
    fn fetch(&self, url: &str) -> Result<String, TransportError> {
        let path = self
            .find(url)
            .ok_or_else(|| TransportError::NotFound(url.to_string()))?;

        trace!("Reading {:?} from {:?}", url, path);
        std::fs::read_to_string(path).map_err(|e| TransportError::CannotRead(url.to_string(), e))
    }
}
