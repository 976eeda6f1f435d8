//! Registry of assets, asset entries and waiting for assets to be added
//! to the registry.

use downcast_rs::{impl_downcast, Downcast};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

mod asset;
mod storage;
pub mod waiter;

pub use asset::{Asset, AssetState, ResourceChange};
pub use storage::{Storage, Transport};
pub use waiter::{WaitToken, Waiter};

/// Marker trait that specifies some struct as a "resource", meaning it is
/// the loaded form of an asset that other content can link to (eg. texture).
pub trait Resource: Downcast + fmt::Debug {}
impl_downcast!(Resource);

/// Shared reference to a loaded resource.
///
/// Resources are compared by identity, never by value.
pub type ResourceRef = Rc<dyn Resource>;

/// Returns whether both references point to the same resource instance.
#[inline]
pub fn same_resource(a: &ResourceRef, b: &ResourceRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Numeric identity of an asset in the registry.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key under which the registry announces newly added assets. Ids and
/// urls are separate namespaces.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum AssetKey {
    Id(AssetId),
    Url(String),
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKey::Id(id) => write!(f, "id:{}", id),
            AssetKey::Url(url) => write!(f, "url:{}", url),
        }
    }
}

/// Result of asset load operation.
pub type LoadResult<T> = std::result::Result<T, AssetLoadError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AssetLoadError {
    /// The transport could not provide the asset.
    Transport(String),
    /// The transport succeeded but returned no resource.
    Empty,
    /// The asset was removed from the registry before it was loaded.
    Removed,
}

impl fmt::Display for AssetLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLoadError::Transport(e) => write!(f, "transport error: {}", e),
            AssetLoadError::Empty => write!(f, "asset contains no resource"),
            AssetLoadError::Removed => write!(f, "asset was removed before it was loaded"),
        }
    }
}

impl std::error::Error for AssetLoadError {}

/// Capabilities of an asset registry that content loading depends on.
///
/// All methods are called from the single thread that drives the
/// registry. Continuations must never be invoked from inside the call
/// that registered them.
pub trait Registry {
    /// Looks up an asset by its id.
    fn get(&self, id: AssetId) -> Option<Rc<Asset>>;

    /// Looks up an asset by its normalized url.
    fn get_by_url(&self, url: &str) -> Option<Rc<Asset>>;

    /// Starts loading the asset if it is not loaded or being loaded already.
    fn load(&self, asset: &Rc<Asset>);

    /// Registers a one-shot continuation that runs when an asset with
    /// the specified key is added to the registry.
    fn once_added(&self, key: AssetKey, continuation: Box<dyn FnOnce(Rc<Asset>)>) -> WaitToken;

    /// Removes a continuation registered with `once_added()`. Returns
    /// `false` if it already ran or was cancelled.
    fn cancel_added(&self, token: WaitToken) -> bool;
}
