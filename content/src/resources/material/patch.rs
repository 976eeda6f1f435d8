//! Writing resolved resources into the descriptor of a material.

use crate::assets::{Asset, ResourceRef};
use crate::resources::material::{
    propagate, Descriptor, MaterialAsset, ParamData, PREFILTERED_CUBE_MAPS,
};
use descriptor::material::ParameterKind;
use log::{error, trace, warn};
use smallvec::SmallVec;
use std::rc::{Rc, Weak};

/// Indices of parameters that wait for the same asset.
pub type Fields = SmallVec<[usize; 4]>;

/// Requests the asset to be loaded and applies it to the fields once it
/// is ready. If the asset is ready already, it is applied right away.
pub fn request(material: &Rc<MaterialAsset>, fields: Fields, asset: &Rc<Asset>) {
    material.track(&fields);

    let weak: Weak<MaterialAsset> = Rc::downgrade(material);
    let generation = material.generation();
    let name = asset.name().to_string();

    asset.when_ready(move |result| {
        let material = match weak.upgrade() {
            Some(m) if m.is_current(generation) => m,
            _ => return,
        };

        match result {
            Ok(asset) => apply(&material, &fields, &asset),
            Err(e) => {
                material.untrack(&fields);
                error!(
                    "Material {:?} cannot use {:?} due to {}",
                    material.url(),
                    name,
                    e
                );
            }
        }
    });

    material.registry().load(asset);
}

/// Writes the primary resource of a ready asset into the fields, expands
/// prefiltered levels of cube maps, re-initializes the material and
/// starts listening to changes of the asset.
pub fn apply(material: &Rc<MaterialAsset>, fields: &[usize], asset: &Rc<Asset>) {
    let resources = asset.resources();
    let primary = match resources.first() {
        Some(t) => t.clone(),
        None => {
            material.untrack(fields);
            warn!("Asset {} is ready but has no resource", asset.id());
            return;
        }
    };

    {
        let mut descriptor = material.descriptor_mut();
        let mut cube = false;

        for idx in fields {
            if let Some(param) = descriptor.parameters.get_mut(*idx) {
                // slots that already hold a resource are never re-resolved
                if let ParamData::Value(_) = param.data {
                    param.data = ParamData::Resource(primary.clone());
                    cube |= param.kind == Some(ParameterKind::Cubemap);
                }
            }
        }

        if cube && resources.len() > 1 {
            expand_prefiltered(&mut descriptor, &resources);
        }
    }

    trace!(
        "Applied asset {} to {:?} of material {:?}",
        asset.id(),
        fields,
        material.url()
    );

    material.untrack(fields);
    if let Err(e) = material.reinitialize() {
        error!("Cannot re-initialize material {:?}: {}", material.url(), e);
    }
    propagate::bind(material, asset);
}

/// Stores auxiliary resources of a cube map asset (indices 1 to 6) into
/// the `prefilteredCubeMap*` parameters, adding the parameters that are
/// missing. Returns the number of parameters added.
pub fn expand_prefiltered(descriptor: &mut Descriptor, resources: &[ResourceRef]) -> usize {
    let mut added = 0;
    for (name, resource) in PREFILTERED_CUBE_MAPS.iter().zip(resources.iter().skip(1)) {
        let data = ParamData::Resource(resource.clone());
        if descriptor.upsert(name, Some(ParameterKind::Cubemap), data) {
            added += 1;
        }
    }
    added
}
