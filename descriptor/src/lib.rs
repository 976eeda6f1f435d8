//! Serializable descriptors of content that references other content
//! (materials) and of animations.
//!
//! Descriptors are the raw, not yet resolved definitions as they come
//! from the transport layer. Resolving the references they contain is
//! the job of the `content` crate.

pub mod animation;
mod file;
pub mod material;

pub use file::{load_animation_from_str, load_material_from_str, Error};
