//! Shared fixtures for unit tests.

use crate::assets::{Asset, AssetId, AssetLoadError, Registry, ResourceRef, Storage};
use crate::resources::image::Texture;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub fn texture(name: &str) -> ResourceRef {
    Rc::new(Texture::new(name, 4, 4))
}

/// Storage whose transport serves resources from an in-memory catalog.
pub struct Fixture {
    pub storage: Rc<Storage>,
    pub catalog: Rc<RefCell<HashMap<AssetId, Vec<ResourceRef>>>>,
    pub fetches: Rc<Cell<usize>>,
}

impl Fixture {
    pub fn new() -> Self {
        let catalog: Rc<RefCell<HashMap<AssetId, Vec<ResourceRef>>>> = Default::default();
        let fetches = Rc::new(Cell::new(0));

        let c = catalog.clone();
        let f = fetches.clone();
        let storage = Storage::new(move |asset: &Asset| {
            f.set(f.get() + 1);
            c.borrow()
                .get(&asset.id())
                .cloned()
                .ok_or_else(|| AssetLoadError::Transport(format!("{} not in catalog", asset.id())))
        });

        Self {
            storage,
            catalog,
            fetches,
        }
    }

    /// Sets the resources the transport returns for the asset.
    pub fn provide(&self, id: u32, resources: Vec<ResourceRef>) {
        self.catalog.borrow_mut().insert(AssetId(id), resources);
    }

    /// Adds an unloaded asset to the storage.
    pub fn register(&self, id: u32, url: Option<&str>) -> Rc<Asset> {
        let asset = Asset::new(AssetId(id), format!("asset{}", id), url.map(String::from));
        assert!(self.storage.add(asset.clone()));
        asset
    }

    /// Adds an asset and loads it right away.
    pub fn loaded(&self, id: u32, url: Option<&str>, resources: Vec<ResourceRef>) -> Rc<Asset> {
        self.provide(id, resources);
        let asset = self.register(id, url);
        self.storage.load(&asset);
        self.storage.process_queue();
        asset
    }

    pub fn registry(&self) -> Rc<dyn Registry> {
        self.storage.clone()
    }
}
