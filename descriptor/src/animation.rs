//! Versioned animation descriptors.
//!
//! Two versions of the format exist. Version 3 stores every channel in every
//! key. Version 4 uses shorter field names and lets a node declare default
//! channel values that replace the values of all its keys.

use crate::Error;
use cgmath::{Deg, Quaternion, Rotation3, Vector3};
use serde::Deserialize;

/// Single keyframe of a node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Key {
    pub time: f32,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub keys: Vec<Key>,
}

/// In-memory animation: named tracks of keyframes.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTrackSet {
    pub name: String,
    pub duration: f32,
    pub nodes: Vec<Node>,
}

impl AnimationTrackSet {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

type Triple = [f32; 3];

#[derive(Deserialize)]
struct File<T> {
    animation: T,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct AnimationV3 {
    name: String,
    duration: f32,
    nodes: Vec<NodeV3>,
}

#[derive(Deserialize)]
struct NodeV3 {
    name: String,
    keys: Vec<KeyV3>,
}

#[derive(Deserialize)]
struct KeyV3 {
    time: f32,
    pos: Triple,
    rot: Triple,
    scale: Triple,
}

#[derive(Deserialize)]
struct AnimationV4 {
    name: String,
    duration: f32,
    nodes: Vec<NodeV4>,
}

#[derive(Deserialize)]
struct NodeV4 {
    name: String,
    #[serde(default)]
    defaults: ChannelsV4,
    keys: Vec<KeyV4>,
}

#[derive(Deserialize, Default)]
struct ChannelsV4 {
    #[serde(default)]
    p: Option<Triple>,
    #[serde(default)]
    r: Option<Triple>,
    #[serde(default)]
    s: Option<Triple>,
}

#[derive(Deserialize)]
struct KeyV4 {
    t: f32,
    #[serde(flatten)]
    channels: ChannelsV4,
}

/// Converts Euler angles in degrees to a quaternion. Rotation is applied
/// around X first, then Y, then Z.
pub fn euler_degrees(r: Triple) -> Quaternion<f32> {
    Quaternion::from_angle_z(Deg(r[2]))
        * Quaternion::from_angle_y(Deg(r[1]))
        * Quaternion::from_angle_x(Deg(r[0]))
}

#[inline]
fn vec3(t: Triple) -> Vector3<f32> {
    Vector3::new(t[0], t[1], t[2])
}

/// Parses an animation descriptor, dispatching on its declared version.
pub fn parse(text: &str) -> Result<AnimationTrackSet, Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let header: File<Header> = serde_json::from_value(value.clone())?;

    match header.animation.version {
        3 => parse_v3(serde_json::from_value::<File<AnimationV3>>(value)?.animation),
        4 => parse_v4(serde_json::from_value::<File<AnimationV4>>(value)?.animation),
        v => Err(Error::UnsupportedVersion(v)),
    }
}

fn parse_v3(data: AnimationV3) -> Result<AnimationTrackSet, Error> {
    let nodes = data
        .nodes
        .into_iter()
        .map(|n| Node {
            name: n.name,
            keys: n
                .keys
                .iter()
                .map(|k| Key {
                    time: k.time,
                    position: vec3(k.pos),
                    rotation: euler_degrees(k.rot),
                    scale: vec3(k.scale),
                })
                .collect(),
        })
        .collect();

    Ok(AnimationTrackSet {
        name: data.name,
        duration: data.duration,
        nodes,
    })
}

fn parse_v4(data: AnimationV4) -> Result<AnimationTrackSet, Error> {
    let mut nodes = Vec::with_capacity(data.nodes.len());

    for n in data.nodes {
        let mut keys = Vec::with_capacity(n.keys.len());

        for (idx, k) in n.keys.iter().enumerate() {
            // node defaults win over the values stored in keys
            let channel = |default: Option<Triple>, own: Option<Triple>, name| {
                default.or(own).ok_or_else(|| Error::MissingKeyValue {
                    node: n.name.clone(),
                    key: idx,
                    channel: name,
                })
            };

            keys.push(Key {
                time: k.t,
                position: vec3(channel(n.defaults.p, k.channels.p, "position")?),
                rotation: euler_degrees(channel(n.defaults.r, k.channels.r, "rotation")?),
                scale: vec3(channel(n.defaults.s, k.channels.s, "scale")?),
            });
        }

        nodes.push(Node { name: n.name, keys });
    }

    Ok(AnimationTrackSet {
        name: data.name,
        duration: data.duration,
        nodes,
    })
}
