//! Finding parameters of a descriptor that link to other assets.

use crate::resources::material::{Descriptor, ParamData, ShadingModel, SHADING_MODEL};
use descriptor::material::Value;

/// Returns indices (in parameter order) of map parameters that hold a
/// reference which was not resolved yet.
pub fn classify(descriptor: &Descriptor) -> Vec<usize> {
    descriptor
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_map() && matches!(p.data, ParamData::Value(_)))
        .map(|(idx, _)| idx)
        .collect()
}

/// Sets the `shadingModel` parameter from the shader of the descriptor.
/// Returns `true` if the parameter was appended, `false` if an existing
/// one was updated.
pub fn derive_shading_model(descriptor: &mut Descriptor) -> bool {
    let model = ShadingModel::from(descriptor.shader);
    descriptor.upsert(
        SHADING_MODEL,
        None,
        ParamData::Value(Value::Number(model as u8 as f64)),
    )
}
