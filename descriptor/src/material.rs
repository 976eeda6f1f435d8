use serde::{Deserialize, Serialize};

/// Shading model requested by the material.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shader {
    Blinn,
    #[serde(other)]
    Phong,
}

/// How texture and cube map references of a material are addressed.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingFormat {
    /// References are paths relative to the directory of the material.
    Path,
    /// References are numeric asset ids.
    #[serde(other)]
    Id,
}

/// Declared kind of a material parameter.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Texture,
    Cubemap,
    Float,
    Boolean,
    Vec2,
    Vec3,
    Vec4,
    #[serde(other)]
    Other,
}

impl ParameterKind {
    /// Returns whether parameters of this kind reference other assets.
    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, ParameterKind::Texture | ParameterKind::Cubemap)
    }
}

/// Raw value stored in the `data` field of a parameter.
///
/// Whether a value is a literal or a reference to another asset depends
/// on the kind of the parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(u64),
    Number(f64),
    Vector(Vec<f32>),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParameterKind>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Material descriptor is a list of parameters. Some of them are literals
/// and some of them link to other assets (maps).
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shader: Option<Shader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_format: Option<MappingFormat>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl MaterialDescriptor {
    #[inline]
    pub fn is_path_mapped(&self) -> bool {
        self.mapping_format == Some(MappingFormat::Path)
    }
}
