//! Resources (images, materials, animations) and handlers that load them.

use crate::io::TransportError;
use crate::resources::material::MaterialError;
use std::fmt;

pub mod animation;
pub mod image;
pub mod material;

/// Errors that stop a handler from producing its resource at all.
#[derive(Debug)]
pub enum LoadError {
    /// Raw descriptor could not be fetched.
    Transport(TransportError),
    /// Raw descriptor was fetched but could not be parsed.
    Parse(descriptor::Error),
    /// Material could not be initialized from the descriptor.
    Material(MaterialError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Transport(e) => write!(f, "cannot fetch descriptor: {}", e),
            LoadError::Parse(e) => write!(f, "cannot parse descriptor: {}", e),
            LoadError::Material(e) => write!(f, "cannot initialize material: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Transport(e) => Some(e),
            LoadError::Parse(e) => Some(e),
            LoadError::Material(e) => Some(e),
        }
    }
}

impl From<TransportError> for LoadError {
    fn from(e: TransportError) -> Self {
        LoadError::Transport(e)
    }
}

impl From<descriptor::Error> for LoadError {
    fn from(e: descriptor::Error) -> Self {
        LoadError::Parse(e)
    }
}

impl From<MaterialError> for LoadError {
    fn from(e: MaterialError) -> Self {
        LoadError::Material(e)
    }
}
