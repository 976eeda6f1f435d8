//! Materials whose maps are linked to other assets.
//!
//! A material is created from a `Descriptor`. Parameters of the descriptor
//! that link to textures or cube maps are resolved asynchronously: once the
//! linked asset is loaded its resource is written into the descriptor and
//! the `Material` is rebuilt from the whole descriptor.

use crate::assets::{same_resource, ResourceRef};
use common::impl_stats_struct;
use descriptor::material::{MappingFormat, MaterialDescriptor, ParameterKind, Shader, Value};
use std::fmt;

pub mod classify;
mod handler;
pub mod patch;
pub mod propagate;
pub mod resolve;

pub use handler::{MaterialAsset, MaterialHandler, MaterialState};

/// Name of the parameter derived from the shader of the descriptor.
pub const SHADING_MODEL: &str = "shadingModel";

/// Names of parameters that hold the prefiltered levels of a cube map,
/// from the largest to the smallest level.
pub const PREFILTERED_CUBE_MAPS: [&str; 6] = [
    "prefilteredCubeMap128",
    "prefilteredCubeMap64",
    "prefilteredCubeMap32",
    "prefilteredCubeMap16",
    "prefilteredCubeMap8",
    "prefilteredCubeMap4",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ShadingModel {
    Phong = 0,
    Blinn = 1,
}

impl From<Shader> for ShadingModel {
    fn from(shader: Shader) -> Self {
        match shader {
            Shader::Blinn => ShadingModel::Blinn,
            Shader::Phong => ShadingModel::Phong,
        }
    }
}

/// Content of a parameter's data slot.
#[derive(Clone, Debug)]
pub enum ParamData {
    Empty,
    /// A literal, or an unresolved reference if the parameter is a map.
    Value(Value),
    /// Resolved resource. Never interpreted as a reference again.
    Resource(ResourceRef),
}

impl ParamData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, ParamData::Empty)
    }

    #[inline]
    pub fn resource(&self) -> Option<&ResourceRef> {
        match self {
            ParamData::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Returns whether the slot holds exactly this resource instance.
    #[inline]
    pub fn holds(&self, resource: &ResourceRef) -> bool {
        self.resource().map_or(false, |r| same_resource(r, resource))
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub kind: Option<ParameterKind>,
    pub data: ParamData,
}

impl Parameter {
    pub fn new<N: Into<String>>(name: N, kind: Option<ParameterKind>, data: ParamData) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        self.kind.map_or(false, |k| k.is_map())
    }
}

/// Live descriptor of a material. It starts as a copy of the raw descriptor
/// and is patched in place as references get resolved.
#[derive(Clone, Debug)]
pub struct Descriptor {
    pub shader: Shader,
    pub mapping: MappingFormat,
    pub parameters: Vec<Parameter>,
}

impl Descriptor {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Number of parameters with the specified name.
    pub fn count(&self, name: &str) -> usize {
        self.parameters.iter().filter(|p| p.name == name).count()
    }

    /// Sets the data of the parameter with the specified name, appending
    /// the parameter if there is none. Returns `true` if it was appended.
    pub fn upsert(&mut self, name: &str, kind: Option<ParameterKind>, data: ParamData) -> bool {
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.data = data;
                false
            }
            None => {
                self.parameters.push(Parameter::new(name, kind, data));
                true
            }
        }
    }
}

impl From<MaterialDescriptor> for Descriptor {
    fn from(raw: MaterialDescriptor) -> Self {
        Self {
            shader: raw.shader.unwrap_or(Shader::Phong),
            mapping: if raw.is_path_mapped() {
                MappingFormat::Path
            } else {
                MappingFormat::Id
            },
            parameters: raw
                .parameters
                .into_iter()
                .map(|p| Parameter {
                    name: p.name,
                    kind: p.kind,
                    data: p.data.map_or(ParamData::Empty, ParamData::Value),
                })
                .collect(),
        }
    }
}

/// Value of a material parameter as seen by the renderer.
#[derive(Clone, Debug)]
pub enum Uniform {
    Float(f32),
    Boolean(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Map(ResourceRef),
}

impl PartialEq for Uniform {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Uniform::Float(a), Uniform::Float(b)) => a == b,
            (Uniform::Boolean(a), Uniform::Boolean(b)) => a == b,
            (Uniform::Vec2(a), Uniform::Vec2(b)) => a == b,
            (Uniform::Vec3(a), Uniform::Vec3(b)) => a == b,
            (Uniform::Vec4(a), Uniform::Vec4(b)) => a == b,
            (Uniform::Map(a), Uniform::Map(b)) => same_resource(a, b),
            _ => false,
        }
    }
}

/// Errors that may happen when initializing a material.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialError {
    /// Literal value of the parameter does not match its declared kind.
    InvalidParameter {
        name: String,
        expected: &'static str,
    },
    /// The material was destroyed.
    Destroyed,
}

impl fmt::Display for MaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialError::InvalidParameter { name, expected } => {
                write!(f, "parameter {:?} is not a valid {}", name, expected)
            }
            MaterialError::Destroyed => write!(f, "material was destroyed"),
        }
    }
}

impl std::error::Error for MaterialError {}

impl_stats_struct!(pub MaterialStatistics; initialize);

/// Renderer-facing material: a snapshot of all resolved parameters.
///
/// The snapshot is always rebuilt from the whole descriptor so calling
/// `init()` any number of times in any order yields the same result for
/// the same descriptor.
#[derive(Debug, Clone)]
pub struct Material {
    shading_model: ShadingModel,
    uniforms: Vec<(String, Uniform)>,
    stats: MaterialStatistics,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            shading_model: ShadingModel::Phong,
            uniforms: Vec::new(),
            stats: MaterialStatistics::default(),
        }
    }
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the snapshot from the descriptor. Parameters that are empty
    /// or hold unresolved references are left out. On error the previous
    /// snapshot is kept.
    pub fn init(&mut self, descriptor: &Descriptor) -> Result<(), MaterialError> {
        let _m = self.stats.initialize.measure();

        let mut uniforms = Vec::with_capacity(descriptor.parameters.len());
        let mut shading_model = ShadingModel::from(descriptor.shader);

        for param in descriptor.parameters.iter() {
            let uniform = match &param.data {
                ParamData::Empty => continue,
                ParamData::Resource(r) => Uniform::Map(r.clone()),
                ParamData::Value(_) if param.is_map() => continue,
                ParamData::Value(v) => match to_uniform(param, v)? {
                    Some(u) => u,
                    None => continue,
                },
            };

            if param.name == SHADING_MODEL {
                if let Uniform::Float(x) = uniform {
                    shading_model = if x as u8 == ShadingModel::Blinn as u8 {
                        ShadingModel::Blinn
                    } else {
                        ShadingModel::Phong
                    };
                }
            }

            match uniforms.iter_mut().find(|(n, _)| *n == param.name) {
                Some((_, u)) => *u = uniform,
                None => uniforms.push((param.name.clone(), uniform)),
            }
        }

        self.uniforms = uniforms;
        self.shading_model = shading_model;
        Ok(())
    }

    #[inline]
    pub fn shading_model(&self) -> ShadingModel {
        self.shading_model
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.iter().find(|(n, _)| n == name).map(|(_, u)| u)
    }

    /// Returns the resource bound to the map with the specified name.
    pub fn map(&self, name: &str) -> Option<&ResourceRef> {
        match self.uniform(name)? {
            Uniform::Map(r) => Some(r),
            _ => None,
        }
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.uniforms.iter().map(|(n, u)| (n.as_str(), u))
    }

    /// Number of times the material was initialized.
    #[inline]
    pub fn initializations(&self) -> u64 {
        self.stats.initialize.runs()
    }

    #[inline]
    pub fn statistics(&self) -> &MaterialStatistics {
        &self.stats
    }
}

fn to_uniform(param: &Parameter, value: &Value) -> Result<Option<Uniform>, MaterialError> {
    let invalid = |expected| MaterialError::InvalidParameter {
        name: param.name.clone(),
        expected,
    };

    Ok(Some(match param.kind {
        Some(ParameterKind::Float) => match value {
            Value::Number(x) => Uniform::Float(*x as f32),
            Value::Integer(x) => Uniform::Float(*x as f32),
            _ => return Err(invalid("float")),
        },
        Some(ParameterKind::Boolean) => match value {
            Value::Boolean(b) => Uniform::Boolean(*b),
            _ => return Err(invalid("boolean")),
        },
        Some(ParameterKind::Vec2) => match components(value, 2) {
            Some(v) => Uniform::Vec2([v[0], v[1]]),
            None => return Err(invalid("vec2")),
        },
        Some(ParameterKind::Vec3) => match components(value, 3) {
            Some(v) => Uniform::Vec3([v[0], v[1], v[2]]),
            None => return Err(invalid("vec3")),
        },
        Some(ParameterKind::Vec4) => match components(value, 4) {
            Some(v) => Uniform::Vec4([v[0], v[1], v[2], v[3]]),
            None => return Err(invalid("vec4")),
        },
        // untyped parameters take the shape of their value
        _ => match value {
            Value::Boolean(b) => Uniform::Boolean(*b),
            Value::Integer(x) => Uniform::Float(*x as f32),
            Value::Number(x) => Uniform::Float(*x as f32),
            Value::Vector(v) if v.len() == 2 => Uniform::Vec2([v[0], v[1]]),
            Value::Vector(v) if v.len() == 3 => Uniform::Vec3([v[0], v[1], v[2]]),
            Value::Vector(v) if v.len() == 4 => Uniform::Vec4([v[0], v[1], v[2], v[3]]),
            _ => return Ok(None),
        },
    }))
}

fn components(value: &Value, len: usize) -> Option<&[f32]> {
    match value {
        Value::Vector(v) if v.len() == len => Some(v.as_slice()),
        _ => None,
    }
}
