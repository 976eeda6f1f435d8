//! In-memory registry of assets, loading of assets and the load queue.

use crate::assets::{
    Asset, AssetId, AssetKey, AssetLoadError, AssetState, LoadResult, Registry, ResourceRef,
    WaitToken, Waiter,
};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{error, info, trace, warn};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Something that can produce the resources of an asset (eg. by reading
/// and decoding a file).
pub trait Transport {
    fn fetch(&self, asset: &Asset) -> LoadResult<Vec<ResourceRef>>;
}

impl<F> Transport for F
where
    F: Fn(&Asset) -> LoadResult<Vec<ResourceRef>>,
{
    fn fetch(&self, asset: &Asset) -> LoadResult<Vec<ResourceRef>> {
        self(asset)
    }
}

/// The storage is a single-threaded registry of assets stored by their id
/// and url.
///
/// Loading is cooperative. `load()` only places the asset into the load
/// queue; the queue is processed by calling `process_queue()` and all
/// continuations of loaded assets run from inside that call.
pub struct Storage {
    assets: RefCell<HashMap<AssetId, Rc<Asset>>>,
    urls: RefCell<HashMap<String, AssetId>>,
    waiter: Waiter,
    load_queue: Sender<AssetId>,
    load_recv: Receiver<AssetId>,
    transport: Box<dyn Transport>,
    next_id: Cell<u32>,
}

impl Storage {
    /// Constructs a new empty `Storage` that loads assets using the
    /// specified transport.
    pub fn new<T: Transport + 'static>(transport: T) -> Rc<Self> {
        info!("Creating a Storage.");

        let (send, recv) = unbounded();

        Rc::new(Self {
            assets: RefCell::new(HashMap::new()),
            urls: RefCell::new(HashMap::new()),
            waiter: Waiter::new(),
            load_queue: send,
            load_recv: recv,
            transport: Box::new(transport),
            next_id: Cell::new(1),
        })
    }

    /// Adds the asset to the storage and announces it to everybody who
    /// waits for its id or url (in this order).
    ///
    /// Returns `false` and does nothing if an asset with the same id or
    /// url is already present.
    pub fn add(&self, asset: Rc<Asset>) -> bool {
        {
            let mut assets = self.assets.borrow_mut();
            let mut urls = self.urls.borrow_mut();

            if assets.contains_key(&asset.id()) {
                warn!("Asset with id {} is already registered!", asset.id());
                return false;
            }
            if let Some(url) = asset.url() {
                if urls.contains_key(url) {
                    warn!("Asset with url {:?} is already registered!", url);
                    return false;
                }
                urls.insert(url.to_string(), asset.id());
            }
            assets.insert(asset.id(), asset.clone());
        }

        if asset.id().0 >= self.next_id.get() {
            self.next_id.set(asset.id().0 + 1);
        }

        trace!("Added asset {} ({:?})", asset.id(), asset.name());

        self.waiter.announce(&AssetKey::Id(asset.id()), &asset);
        if let Some(url) = asset.url() {
            self.waiter.announce(&AssetKey::Url(url.to_string()), &asset);
        }

        true
    }

    /// Creates a new asset with the next free id and adds it to the storage.
    pub fn create<N: Into<String>>(&self, name: N, url: Option<String>) -> Option<Rc<Asset>> {
        let asset = Asset::new(AssetId(self.next_id.get()), name, url);
        if self.add(asset.clone()) {
            Some(asset)
        } else {
            None
        }
    }

    /// Removes the asset from the storage. Everybody who waits for it to
    /// become ready receives `AssetLoadError::Removed`.
    pub fn remove(&self, id: AssetId) -> Option<Rc<Asset>> {
        let asset = self.assets.borrow_mut().remove(&id)?;
        if let Some(url) = asset.url() {
            self.urls.borrow_mut().remove(url);
        }

        if !asset.is_loaded() {
            asset.fail_load(AssetLoadError::Removed);
        }

        Some(asset)
    }

    /// Places the asset to the load queue even if it is already loaded.
    /// When the load finishes, listeners of the asset are notified about
    /// the replaced resources.
    pub fn request_reload(&self, id: AssetId) -> bool {
        let asset = match self.get(id) {
            None => return false,
            Some(t) => t,
        };

        match asset.state() {
            AssetState::Queued | AssetState::Loading => {}
            _ => self.enqueue(&asset),
        }
        true
    }

    /// Replaces resources of a loaded asset in place. Returns `false` if
    /// the asset does not exist or is not loaded.
    pub fn replace_resources(&self, id: AssetId, resources: Vec<ResourceRef>) -> bool {
        match self.get(id) {
            None => false,
            Some(asset) => asset.replace_resources(resources),
        }
    }

    /// Loads all assets in the load queue, including assets queued by
    /// continuations while the queue is processed. Returns the number
    /// of processed load requests.
    pub fn process_queue(&self) -> usize {
        let mut processed = 0;

        while let Ok(id) = self.load_recv.try_recv() {
            processed += 1;

            let asset = match self.get(id) {
                None => {
                    trace!("Skipping load of removed asset {}", id);
                    continue;
                }
                Some(t) => t,
            };

            if asset.state() != AssetState::Queued {
                continue;
            }

            trace!("Starting to load {} ({:?})...", id, asset.name());
            asset.set_state(AssetState::Loading);

            match self.transport.fetch(&asset) {
                Ok(resources) if resources.is_empty() => {
                    error!("Cannot load asset {} due to {:?}", id, AssetLoadError::Empty);
                    asset.fail_load(AssetLoadError::Empty);
                }
                Ok(resources) => asset.finish_load(resources),
                Err(e) => {
                    error!("Cannot load asset {} due to {:?}", id, e);
                    asset.fail_load(e);
                }
            }
        }

        processed
    }

    /// Number of load requests waiting in the load queue.
    #[inline]
    pub fn queued(&self) -> usize {
        self.load_recv.len()
    }

    /// The table of continuations waiting for assets to be added.
    #[inline]
    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.assets.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enqueue(&self, asset: &Rc<Asset>) {
        trace!("Adding {} to load queue", asset.id());
        asset.set_state(AssetState::Queued);
        // the receiver lives as long as self
        self.load_queue.send(asset.id()).ok();
    }
}

impl Registry for Storage {
    fn get(&self, id: AssetId) -> Option<Rc<Asset>> {
        self.assets.borrow().get(&id).cloned()
    }

    fn get_by_url(&self, url: &str) -> Option<Rc<Asset>> {
        let id = *self.urls.borrow().get(url)?;
        self.get(id)
    }

    fn load(&self, asset: &Rc<Asset>) {
        if self.get(asset.id()).is_none() {
            warn!("Requested load of asset {} that is not registered!", asset.id());
            return;
        }

        match asset.state() {
            AssetState::Queued | AssetState::Loading | AssetState::Loaded => {}
            AssetState::LoadError(e) => {
                error!(
                    "Requested re-load of asset that previously failed to load! {} Error: {:?}",
                    asset.id(),
                    e
                );
                self.enqueue(asset);
            }
            AssetState::Unloaded => self.enqueue(asset),
        }
    }

    fn once_added(&self, key: AssetKey, continuation: Box<dyn FnOnce(Rc<Asset>)>) -> WaitToken {
        self.waiter.register(key, continuation)
    }

    fn cancel_added(&self, token: WaitToken) -> bool {
        self.waiter.cancel(token)
    }
}
