//! Image resources that materials link to.

use crate::assets::{Resource, ResourceRef};
use std::rc::Rc;

/// Edge sizes of the prefiltered levels that accompany a prefiltered cube
/// map, from the largest to the smallest.
pub const PREFILTERED_SIZES: [u32; 6] = [128, 64, 32, 16, 8, 4];

/// Loaded two-dimensional texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn new<N: Into<String>>(name: N, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

impl Resource for Texture {}

/// Loaded cube map.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeMap {
    pub name: String,
    pub size: u32,
}

impl CubeMap {
    pub fn new<N: Into<String>>(name: N, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Creates the resources of a prefiltered cube map asset: the cube map
    /// itself followed by its six prefiltered levels.
    pub fn prefiltered<N: Into<String>>(name: N, size: u32) -> Vec<ResourceRef> {
        let name = name.into();
        let mut resources: Vec<ResourceRef> = Vec::with_capacity(1 + PREFILTERED_SIZES.len());

        resources.push(Rc::new(CubeMap::new(name.clone(), size)));
        for level in PREFILTERED_SIZES.iter() {
            resources.push(Rc::new(CubeMap::new(format!("{}@{}", name, level), *level)));
        }

        resources
    }
}

impl Resource for CubeMap {}
