//! Loading of animation descriptors.

use crate::assets::Resource;
use crate::io::DescriptorSource;
use crate::resources::LoadError;
use descriptor::animation::AnimationTrackSet;
use descriptor::load_animation_from_str;
use log::trace;
use std::ops::Deref;
use std::rc::Rc;

/// Loaded animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation(pub AnimationTrackSet);

impl Resource for Animation {}

impl Deref for Animation {
    type Target = AnimationTrackSet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct AnimationHandler {
    source: Rc<dyn DescriptorSource>,
}

impl AnimationHandler {
    pub fn new(source: Rc<dyn DescriptorSource>) -> Self {
        Self { source }
    }

    /// Fetches the raw animation descriptor.
    pub fn load(&self, url: &str) -> Result<String, LoadError> {
        trace!("Loading animation descriptor {:?}", url);
        Ok(self.source.fetch(url)?)
    }

    /// Parses the raw descriptor of any supported version.
    pub fn open(&self, text: &str) -> Result<Rc<Animation>, LoadError> {
        let tracks = load_animation_from_str(text)?;
        trace!(
            "Opened animation {:?} with {} nodes",
            tracks.name,
            tracks.nodes.len()
        );
        Ok(Rc::new(Animation(tracks)))
    }

    pub fn load_and_open(&self, url: &str) -> Result<Rc<Animation>, LoadError> {
        let text = self.load(url)?;
        self.open(&text)
    }
}
