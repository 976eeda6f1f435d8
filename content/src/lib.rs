//! Loading of content that references other content.
//!
//! Materials link to textures and cube maps either by numeric asset id or
//! by a path relative to the material. The linked assets may not be loaded
//! or even registered yet when the material is opened. This crate resolves
//! such links without blocking, splices the loaded resources into the live
//! material and keeps it up to date when the linked assets are reloaded.

pub mod assets;
pub mod config;
pub mod io;
pub mod path;
pub mod resources;

#[cfg(test)]
pub(crate) mod testing;
