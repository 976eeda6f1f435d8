//! Keeping materials up to date when the resources they use are replaced.

use crate::assets::{Asset, AssetId, ResourceChange, ResourceRef};
use crate::resources::material::patch::expand_prefiltered;
use crate::resources::material::{Descriptor, MaterialAsset, ParamData, PREFILTERED_CUBE_MAPS};
use common::notification::ListenerId;
use descriptor::material::ParameterKind;
use log::{error, trace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Change listeners a material has registered on assets, at most one
/// per asset.
#[derive(Default)]
pub struct Bindings {
    bound: RefCell<HashMap<AssetId, (Weak<Asset>, ListenerId)>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the listener on the asset unless a listener for the same
    /// asset exists already. Returns `true` if it was registered.
    pub fn bind<F>(&self, asset: &Rc<Asset>, listener: F) -> bool
    where
        F: Fn(&ResourceChange) + 'static,
    {
        if self.is_bound(asset.id()) {
            return false;
        }

        let id = asset.on_changed(listener);
        self.bound
            .borrow_mut()
            .insert(asset.id(), (Rc::downgrade(asset), id));
        true
    }

    pub fn unbind(&self, id: AssetId) -> bool {
        let removed = self.bound.borrow_mut().remove(&id);
        match removed {
            None => false,
            Some((asset, listener)) => {
                if let Some(asset) = asset.upgrade() {
                    asset.off_changed(listener);
                }
                true
            }
        }
    }

    pub fn unbind_all(&self) {
        let all = std::mem::take(&mut *self.bound.borrow_mut());
        for (asset, listener) in all.values() {
            if let Some(asset) = asset.upgrade() {
                asset.off_changed(*listener);
            }
        }
    }

    #[inline]
    pub fn is_bound(&self, id: AssetId) -> bool {
        self.bound.borrow().contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bound.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Makes the material follow resource changes of the asset.
pub fn bind(material: &Rc<MaterialAsset>, asset: &Rc<Asset>) {
    let weak = Rc::downgrade(material);
    let generation = material.generation();
    let id = asset.id();

    let bound = material.bindings().bind(asset, move |change| {
        if let Some(material) = weak.upgrade() {
            if material.is_current(generation) {
                on_resource_changed(&material, id, change);
            }
        }
    });

    if bound {
        trace!("Material {:?} follows asset {}", material.url(), id);
    }
}

/// Replaces every resource of the descriptor that is in `change.old` with
/// its counterpart in `change.new`. Returns the number of rewritten
/// parameters.
pub fn rewrite(descriptor: &mut Descriptor, change: &ResourceChange) -> usize {
    let mut rewritten = 0;
    let mut cube = false;

    for param in descriptor.parameters.iter_mut() {
        let replacement = change
            .old
            .iter()
            .zip(change.new.iter())
            .find(|(old, _)| param.data.holds(old))
            .map(|(_, new)| new.clone());

        if let Some(new) = replacement {
            param.data = ParamData::Resource(new);
            rewritten += 1;

            if param.kind == Some(ParameterKind::Cubemap)
                && !PREFILTERED_CUBE_MAPS.contains(&param.name.as_str())
            {
                cube = true;
            }
        }
    }

    if cube {
        if change.new.len() > 1 {
            // the new set may carry levels the old one did not
            rewritten += expand_prefiltered(descriptor, &change.new);
        } else {
            rewritten += clear_prefiltered(descriptor, &change.old);
        }
    }

    rewritten
}

/// Empties prefiltered levels that still hold a resource of `old`.
fn clear_prefiltered(descriptor: &mut Descriptor, old: &[ResourceRef]) -> usize {
    let mut cleared = 0;

    for param in descriptor.parameters.iter_mut() {
        if PREFILTERED_CUBE_MAPS.contains(&param.name.as_str())
            && old.iter().any(|r| param.data.holds(r))
        {
            param.data = ParamData::Empty;
            cleared += 1;
        }
    }

    cleared
}

fn on_resource_changed(material: &Rc<MaterialAsset>, id: AssetId, change: &ResourceChange) {
    let rewritten = rewrite(&mut material.descriptor_mut(), change);

    if rewritten == 0 {
        trace!(
            "Material {:?} no longer uses asset {}, unbinding",
            material.url(),
            id
        );
        material.bindings().unbind(id);
        return;
    }

    trace!(
        "Asset {} changed, rewrote {} parameters of material {:?}",
        id,
        rewritten,
        material.url()
    );
    if let Err(e) = material.reinitialize() {
        error!("Cannot re-initialize material {:?}: {}", material.url(), e);
    }
}
