use crate::animation::{self, AnimationTrackSet};
use crate::material::MaterialDescriptor;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The text is not valid JSON or does not have the expected shape.
    InvalidJson(serde_json::Error),
    /// Animation descriptor declares a version this crate cannot read.
    UnsupportedVersion(u32),
    /// A key has no value for a channel and its node has no default for it.
    MissingKeyValue {
        node: String,
        key: usize,
        channel: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidJson(e) => write!(f, "invalid descriptor: {}", e),
            Error::UnsupportedVersion(v) => write!(f, "unsupported animation version {}", v),
            Error::MissingKeyValue { node, key, channel } => write!(
                f,
                "key {} of node {:?} has no {} value and no default",
                key, node, channel
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidJson(e)
    }
}

/// Deserializes a material descriptor from its JSON representation.
pub fn load_material_from_str(text: &str) -> Result<MaterialDescriptor, Error> {
    Ok(serde_json::from_str(text)?)
}

/// Deserializes an animation descriptor of any supported version.
pub fn load_animation_from_str(text: &str) -> Result<AnimationTrackSet, Error> {
    animation::parse(text)
}

#[cfg(test)]
mod tests {
    use crate::material::{MappingFormat, ParameterKind, Shader, Value};
    use crate::{load_material_from_str, Error};

    #[test]
    fn loads_material_descriptor() {
        let text = r#"{
            "shader": "blinn",
            "mapping_format": "path",
            "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": "tex/wood.png" },
                { "name": "shininess", "type": "float", "data": 32.5 },
                { "name": "cubeMap", "type": "cubemap", "data": 17 },
                { "name": "diffuse", "type": "vec3", "data": [1.0, 0.5, 0.25] },
                { "name": "specularMap", "type": "texture", "data": null }
            ]
        }"#;

        let material = load_material_from_str(text).unwrap();

        assert_eq!(material.shader, Some(Shader::Blinn));
        assert_eq!(material.mapping_format, Some(MappingFormat::Path));
        assert!(material.is_path_mapped());
        assert_eq!(material.parameters.len(), 5);
        assert_eq!(material.parameters[0].kind, Some(ParameterKind::Texture));
        assert_eq!(
            material.parameters[0].data,
            Some(Value::Text("tex/wood.png".into()))
        );
        assert_eq!(material.parameters[1].data, Some(Value::Number(32.5)));
        assert_eq!(material.parameters[2].data, Some(Value::Integer(17)));
        assert_eq!(
            material.parameters[3].data,
            Some(Value::Vector(vec![1.0, 0.5, 0.25]))
        );
        assert_eq!(material.parameters[4].data, None);
    }

    #[test]
    fn unknown_shader_and_mapping_fall_back() {
        let text = r#"{ "shader": "toon", "mapping_format": "uuid", "parameters": [] }"#;
        let material = load_material_from_str(text).unwrap();

        assert_eq!(material.shader, Some(Shader::Phong));
        assert_eq!(material.mapping_format, Some(MappingFormat::Id));
        assert!(!material.is_path_mapped());
    }

    #[test]
    fn rejects_garbage() {
        match load_material_from_str("{ \"parameters\": 5 }") {
            Err(Error::InvalidJson(_)) => {}
            other => panic!("expected InvalidJson, got {:?}", other),
        }
    }
}
