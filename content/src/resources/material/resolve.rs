//! Mapping of references stored in a descriptor to registry entries.

use crate::assets::{Asset, AssetId, AssetKey, Registry};
use crate::path;
use descriptor::material::{MappingFormat, Value};
use std::rc::Rc;

/// Reference to another asset, by exactly one of id or normalized url.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reference {
    Id(AssetId),
    Path(String),
}

impl Reference {
    pub fn key(&self) -> AssetKey {
        match self {
            Reference::Id(id) => AssetKey::Id(*id),
            Reference::Path(url) => AssetKey::Url(url.clone()),
        }
    }
}

/// Outcome of resolving a single reference.
#[derive(Debug)]
pub enum Resolution {
    /// The registry has an entry. It still has to become ready.
    Resolved(Rc<Asset>),
    /// No entry yet; wait until one with this key is added.
    Pending(AssetKey),
    /// The value cannot be interpreted as a reference.
    Unresolvable,
}

/// Everything besides the value itself that decides how a reference
/// is resolved.
#[derive(Clone, Debug)]
pub struct ResolveContext<'a> {
    pub mapping: MappingFormat,
    /// Directory of the descriptor, paths are relative to it.
    pub directory: &'a str,
    /// Whether id-mapped strings that look like paths may be looked up
    /// by url.
    pub path_fallback: bool,
}

/// Interprets a raw value as a reference. Returns `None` if the value
/// cannot be a reference in the specified context.
pub fn reference(value: &Value, ctx: &ResolveContext) -> Option<Reference> {
    match ctx.mapping {
        MappingFormat::Path => match value {
            Value::Text(s) if !s.is_empty() => Some(Reference::Path(path::join(ctx.directory, s))),
            _ => None,
        },
        MappingFormat::Id => match value {
            Value::Integer(id) => id_of(*id).map(Reference::Id),
            Value::Text(s) => match s.trim().parse::<u64>() {
                Ok(id) => id_of(id).map(Reference::Id),
                Err(_) if ctx.path_fallback && path::looks_like_path(s) => {
                    Some(Reference::Path(path::join(ctx.directory, s)))
                }
                Err(_) => None,
            },
            _ => None,
        },
    }
}

fn id_of(raw: u64) -> Option<AssetId> {
    if raw <= u32::MAX as u64 {
        Some(AssetId(raw as u32))
    } else {
        None
    }
}

/// Resolves the value against the registry. Does not modify anything.
pub fn resolve(value: &Value, ctx: &ResolveContext, registry: &dyn Registry) -> Resolution {
    let reference = match reference(value, ctx) {
        None => return Resolution::Unresolvable,
        Some(t) => t,
    };

    let found = match &reference {
        Reference::Id(id) => registry.get(*id),
        Reference::Path(url) => registry.get_by_url(url),
    };

    match found {
        Some(asset) => Resolution::Resolved(asset),
        None => Resolution::Pending(reference.key()),
    }
}
