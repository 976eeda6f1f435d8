//! Functionality shared between the content crates and tools.

pub mod notification;
pub mod perf;
pub mod tool;
