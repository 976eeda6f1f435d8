use crate::assets::{same_resource, AssetId, AssetLoadError, ResourceRef};
use common::notification::{Event, ListenerId};
use log::trace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// All possible states of an asset entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    /// Nobody requested the asset to be loaded yet.
    Unloaded,
    /// The asset is present in the load queue.
    Queued,
    /// The asset is currently being fetched by the transport.
    Loading,
    /// The last attempt to load the asset failed. Another load request
    /// will try again.
    LoadError(AssetLoadError),
    /// The resources of the asset are available.
    Loaded,
}

/// Notification sent to listeners when resources of a loaded asset are
/// replaced (eg. after a reload). `old[i]` was replaced by `new[i]`.
#[derive(Debug, Clone)]
pub struct ResourceChange {
    pub old: Vec<ResourceRef>,
    pub new: Vec<ResourceRef>,
}

type ReadyContinuation = Box<dyn FnOnce(Result<Rc<Asset>, AssetLoadError>)>;

/// Entry of a registry. It owns the loaded resources of the asset and
/// notifies interested parties when they become available or change.
///
/// The first resource is the primary one. Some assets carry additional
/// resources (eg. prefiltered levels of a cube map).
pub struct Asset {
    id: AssetId,
    name: String,
    url: Option<String>,
    state: RefCell<AssetState>,
    resources: RefCell<Vec<ResourceRef>>,
    revision: Cell<u32>,
    ready: RefCell<Vec<ReadyContinuation>>,
    changed: Event<ResourceChange>,
}

impl Asset {
    /// Creates a new entry that is not loaded.
    pub fn new<N: Into<String>>(id: AssetId, name: N, url: Option<String>) -> Rc<Self> {
        Rc::new(Self {
            id,
            name: name.into(),
            url,
            state: RefCell::new(AssetState::Unloaded),
            resources: RefCell::new(Vec::new()),
            revision: Cell::new(0),
            ready: RefCell::new(Vec::new()),
            changed: Event::new(),
        })
    }

    /// Creates a new entry whose resources are already loaded.
    pub fn with_resources<N: Into<String>>(
        id: AssetId,
        name: N,
        url: Option<String>,
        resources: Vec<ResourceRef>,
    ) -> Rc<Self> {
        let asset = Self::new(id, name, url);
        *asset.resources.borrow_mut() = resources;
        *asset.state.borrow_mut() = AssetState::Loaded;
        asset.revision.set(1);
        asset
    }

    #[inline]
    pub fn id(&self) -> AssetId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[inline]
    pub fn state(&self) -> AssetState {
        self.state.borrow().clone()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.borrow(), AssetState::Loaded)
    }

    /// Returns the primary resource if the asset is loaded.
    pub fn resource(&self) -> Option<ResourceRef> {
        self.resources.borrow().first().cloned()
    }

    /// Returns all resources of the asset. Empty if the asset is not loaded.
    pub fn resources(&self) -> Vec<ResourceRef> {
        self.resources.borrow().clone()
    }

    /// Returns the number of times the asset was loaded or had its resources
    /// replaced. Assets that were never loaded have revision zero.
    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision.get()
    }

    /// Runs the continuation once the asset is loaded. If the asset is
    /// already loaded the continuation runs immediately.
    ///
    /// If the next load attempt fails the continuation receives the error.
    /// This function does not request the load itself.
    pub fn when_ready<F>(self: &Rc<Self>, continuation: F)
    where
        F: FnOnce(Result<Rc<Asset>, AssetLoadError>) + 'static,
    {
        if self.is_loaded() {
            continuation(Ok(self.clone()));
        } else {
            self.ready.borrow_mut().push(Box::new(continuation));
        }
    }

    /// Number of continuations waiting for this asset to become ready.
    pub fn waiting(&self) -> usize {
        self.ready.borrow().len()
    }

    /// Subscribes to resource replacement notifications.
    pub fn on_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ResourceChange) + 'static,
    {
        self.changed.subscribe(listener)
    }

    /// Unsubscribes a listener registered with `on_changed()`.
    pub fn off_changed(&self, id: ListenerId) -> bool {
        self.changed.unsubscribe(id)
    }

    /// Number of active resource replacement listeners.
    pub fn changed_listeners(&self) -> usize {
        self.changed.len()
    }

    pub(crate) fn set_state(&self, state: AssetState) {
        *self.state.borrow_mut() = state;
    }

    /// Stores freshly loaded resources and resumes everybody who waits
    /// for this asset. If the asset had resources before, listeners are
    /// notified about the replacement.
    pub(crate) fn finish_load(self: &Rc<Self>, resources: Vec<ResourceRef>) {
        let old = std::mem::replace(&mut *self.resources.borrow_mut(), resources.clone());
        self.set_state(AssetState::Loaded);
        self.revision.set(self.revision.get() + 1);

        trace!(
            "Asset {} ({:?}) loaded, revision {}",
            self.id,
            self.name,
            self.revision.get()
        );

        if !old.is_empty() {
            self.notify_changed(old, resources);
        }

        let pending = std::mem::take(&mut *self.ready.borrow_mut());
        for continuation in pending {
            continuation(Ok(self.clone()));
        }
    }

    /// Marks the asset as failed and resumes everybody who waits for it
    /// with the error.
    pub(crate) fn fail_load(&self, error: AssetLoadError) {
        self.set_state(AssetState::LoadError(error.clone()));

        let pending = std::mem::take(&mut *self.ready.borrow_mut());
        for continuation in pending {
            continuation(Err(error.clone()));
        }
    }

    /// Replaces resources of a loaded asset in place. Returns `false` if
    /// the asset is not loaded.
    pub(crate) fn replace_resources(&self, resources: Vec<ResourceRef>) -> bool {
        if !self.is_loaded() {
            return false;
        }

        let old = std::mem::replace(&mut *self.resources.borrow_mut(), resources.clone());
        self.revision.set(self.revision.get() + 1);
        self.notify_changed(old, resources);
        true
    }

    fn notify_changed(&self, old: Vec<ResourceRef>, new: Vec<ResourceRef>) {
        let unchanged = old.len() == new.len()
            && old.iter().zip(new.iter()).all(|(a, b)| same_resource(a, b));

        if !unchanged {
            self.changed.emit(&ResourceChange { old, new });
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("state", &*self.state.borrow())
            .field("revision", &self.revision.get())
            .finish()
    }
}
