use crate::assets::{Asset, AssetId, AssetKey, Registry, WaitToken};
use crate::config::ContentConfiguration;
use crate::io::DescriptorSource;
use crate::path;
use crate::resources::material::classify::{classify, derive_shading_model};
use crate::resources::material::patch::{self, Fields};
use crate::resources::material::propagate::Bindings;
use crate::resources::material::resolve::{resolve, ResolveContext, Resolution};
use crate::resources::material::{Descriptor, Material, MaterialError, ParamData};
use crate::resources::LoadError;
use common::notification::{Event, ListenerId};
use descriptor::load_material_from_str;
use descriptor::material::MaterialDescriptor;
use log::{error, info, trace, warn};
use smallvec::smallvec;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MaterialState {
    /// Created from a raw descriptor, no material exists yet.
    Unopened,
    /// The material is built from literal parameters only.
    Opening,
    /// References were resolved or are being waited for.
    Ready,
    /// Every binding and wait of the material was released.
    Destroyed,
}

/// Fields waiting for the same asset to be added share one token.
struct PendingFields {
    token: WaitToken,
    fields: Fields,
}

/// Material together with the live descriptor it is built from and all
/// the bookkeeping needed to resolve and follow the assets it links to.
pub struct MaterialAsset {
    url: Option<String>,
    registry: Rc<dyn Registry>,
    settings: ContentConfiguration,
    state: Cell<MaterialState>,
    /// Incremented every time pending work of the material is abandoned.
    /// Continuations of older generations do nothing.
    generation: Cell<u32>,

    data: RefCell<MaterialDescriptor>,
    data_changed: Event<()>,
    watch: Cell<Option<ListenerId>>,
    failure: RefCell<Option<MaterialError>>,

    descriptor: RefCell<Descriptor>,
    material: RefCell<Material>,
    shading_derived: Cell<bool>,

    pending: RefCell<HashMap<AssetKey, PendingFields>>,
    in_flight: RefCell<HashSet<usize>>,
    bindings: Bindings,
    /// `Some` while references are processed synchronously. Holds whether
    /// the material has to be re-initialized at the end.
    batch: Cell<Option<bool>>,
}

impl MaterialAsset {
    pub fn new(
        url: Option<String>,
        registry: Rc<dyn Registry>,
        settings: ContentConfiguration,
        data: MaterialDescriptor,
    ) -> Rc<Self> {
        let descriptor = Descriptor::from(data.clone());

        Rc::new(Self {
            url: url.map(|u| path::normalize(&u)),
            registry,
            settings,
            state: Cell::new(MaterialState::Unopened),
            generation: Cell::new(0),
            data: RefCell::new(data),
            data_changed: Event::new(),
            watch: Cell::new(None),
            failure: RefCell::new(None),
            descriptor: RefCell::new(descriptor),
            material: RefCell::new(Material::new()),
            shading_derived: Cell::new(false),
            pending: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashSet::new()),
            bindings: Bindings::new(),
            batch: Cell::new(None),
        })
    }

    /// Builds the material from the literal parameters of the descriptor.
    pub fn open(&self) -> Result<(), MaterialError> {
        match self.state.get() {
            MaterialState::Unopened => {}
            MaterialState::Destroyed => return Err(MaterialError::Destroyed),
            _ => return Ok(()),
        }

        self.material.borrow_mut().init(&self.descriptor.borrow())?;
        self.state.set(MaterialState::Opening);
        trace!("Opened material {:?}", self.url);
        Ok(())
    }

    /// Resolves all references of the descriptor. References to assets that
    /// are registered and ready are applied before this function returns,
    /// the rest is applied as the assets become available.
    pub fn patch(self: &Rc<Self>) -> Result<(), MaterialError> {
        match self.state.get() {
            MaterialState::Destroyed => return Err(MaterialError::Destroyed),
            MaterialState::Unopened => self.open()?,
            _ => {}
        }

        let mut dirty = false;
        if !self.shading_derived.replace(true) {
            dirty = derive_shading_model(&mut self.descriptor.borrow_mut());
        }

        self.update(dirty)?;

        if self.state.get() != MaterialState::Ready {
            if self.settings.watch_descriptors {
                self.watch_data();
            }
            self.state.set(MaterialState::Ready);
        }

        Ok(())
    }

    /// Replaces the raw descriptor. A material that was not patched yet
    /// takes the new descriptor as is. If a patched material watches its
    /// descriptor all pending work is abandoned and the whole material is
    /// patched again from the new descriptor.
    pub fn set_data(&self, data: MaterialDescriptor) -> Result<(), MaterialError> {
        match self.state.get() {
            MaterialState::Destroyed => return Err(MaterialError::Destroyed),
            MaterialState::Unopened => {
                *self.descriptor.borrow_mut() = Descriptor::from(data.clone());
                *self.data.borrow_mut() = data;
                return Ok(());
            }
            MaterialState::Opening => {
                *self.descriptor.borrow_mut() = Descriptor::from(data.clone());
                *self.data.borrow_mut() = data;
                return self.material.borrow_mut().init(&self.descriptor.borrow());
            }
            MaterialState::Ready => {}
        }

        *self.data.borrow_mut() = data;
        self.data_changed.emit(&());

        match self.failure.borrow_mut().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Releases all bindings and waits of the material. Continuations that
    /// are still scheduled do nothing when they run.
    pub fn destroy(&self) {
        if self.state.get() == MaterialState::Destroyed {
            return;
        }

        self.release();
        if let Some(id) = self.watch.take() {
            self.data_changed.unsubscribe(id);
        }
        *self.material.borrow_mut() = Material::new();
        self.state.set(MaterialState::Destroyed);

        trace!("Destroyed material {:?}", self.url);
    }

    fn watch_data(self: &Rc<Self>) {
        if self.watch.get().is_some() {
            return;
        }

        let weak = Rc::downgrade(self);
        let id = self.data_changed.subscribe(move |_| {
            if let Some(material) = weak.upgrade() {
                if let Err(e) = material.repatch() {
                    error!("Cannot re-patch material {:?}: {}", material.url, e);
                    *material.failure.borrow_mut() = Some(e);
                }
            }
        });
        self.watch.set(Some(id));
    }

    fn repatch(self: &Rc<Self>) -> Result<(), MaterialError> {
        info!("Descriptor of material {:?} changed, patching again", self.url);

        self.release();
        let mut descriptor = Descriptor::from(self.data.borrow().clone());
        derive_shading_model(&mut descriptor);
        *self.descriptor.borrow_mut() = descriptor;

        self.update(true)
    }

    /// Resolves every unresolved reference that is not being resolved yet.
    /// Re-initialization requested while doing so is performed once at
    /// the end.
    fn update(self: &Rc<Self>, dirty: bool) -> Result<(), MaterialError> {
        let resolutions = {
            let descriptor = self.descriptor.borrow();
            let in_flight = self.in_flight.borrow();
            let ctx = ResolveContext {
                mapping: descriptor.mapping,
                directory: self.url.as_deref().map_or("", path::directory),
                path_fallback: self.settings.path_fallback,
            };

            let resolutions: Vec<_> = classify(&descriptor)
                .into_iter()
                .filter(|idx| !in_flight.contains(idx))
                .filter_map(|idx| match &descriptor.parameters[idx].data {
                    ParamData::Value(v) => Some((idx, resolve(v, &ctx, &*self.registry))),
                    _ => None,
                })
                .collect();
            resolutions
        };

        self.batch.set(Some(dirty));

        let mut resolved: Vec<(Rc<Asset>, Fields)> = Vec::new();
        for (idx, resolution) in resolutions {
            match resolution {
                Resolution::Resolved(asset) => {
                    match resolved.iter_mut().find(|(a, _)| a.id() == asset.id()) {
                        Some((_, fields)) => fields.push(idx),
                        None => resolved.push((asset, smallvec![idx])),
                    }
                }
                Resolution::Pending(key) => self.wait_for(key, idx),
                Resolution::Unresolvable => warn!(
                    "Cannot resolve parameter {:?} of material {:?}",
                    self.descriptor.borrow().parameters[idx].name,
                    self.url
                ),
            }
        }

        for (asset, fields) in resolved {
            patch::request(self, fields, &asset);
        }

        match self.batch.replace(None) {
            Some(true) => self.reinitialize(),
            _ => Ok(()),
        }
    }

    /// Waits until an asset with the key is added to the registry. Fields
    /// waiting for the same key share one wait.
    fn wait_for(self: &Rc<Self>, key: AssetKey, idx: usize) {
        self.in_flight.borrow_mut().insert(idx);

        if let Some(pending) = self.pending.borrow_mut().get_mut(&key) {
            pending.fields.push(idx);
            return;
        }

        trace!("Material {:?} waits for {}", self.url, key);

        let weak = Rc::downgrade(self);
        let generation = self.generation.get();
        let k = key.clone();
        let token = self.registry.once_added(
            key.clone(),
            Box::new(move |asset| {
                if let Some(material) = weak.upgrade() {
                    if material.is_current(generation) {
                        material.added(&k, &asset);
                    }
                }
            }),
        );

        self.pending.borrow_mut().insert(
            key,
            PendingFields {
                token,
                fields: smallvec![idx],
            },
        );
    }

    fn added(self: &Rc<Self>, key: &AssetKey, asset: &Rc<Asset>) {
        let pending = match self.pending.borrow_mut().remove(key) {
            None => return,
            Some(t) => t,
        };

        trace!("Asset {} added for material {:?}", key, self.url);
        patch::request(self, pending.fields, asset);
    }

    /// Abandons pending waits and bindings of the current generation.
    fn release(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));

        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for (_, p) in pending {
            self.registry.cancel_added(p.token);
        }
        self.in_flight.borrow_mut().clear();
        self.bindings.unbind_all();
    }

    /// Rebuilds the material from the current descriptor, or marks it for
    /// rebuilding if references are being processed synchronously.
    pub(crate) fn reinitialize(&self) -> Result<(), MaterialError> {
        if self.batch.get().is_some() {
            self.batch.set(Some(true));
            return Ok(());
        }

        self.material.borrow_mut().init(&self.descriptor.borrow())
    }

    pub(crate) fn is_current(&self, generation: u32) -> bool {
        self.state.get() != MaterialState::Destroyed && self.generation.get() == generation
    }

    pub(crate) fn track(&self, fields: &[usize]) {
        self.in_flight.borrow_mut().extend(fields.iter().copied());
    }

    pub(crate) fn untrack(&self, fields: &[usize]) {
        let mut in_flight = self.in_flight.borrow_mut();
        for idx in fields {
            in_flight.remove(idx);
        }
    }

    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        self.generation.get()
    }

    #[inline]
    pub(crate) fn registry(&self) -> &dyn Registry {
        &*self.registry
    }

    #[inline]
    pub(crate) fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub(crate) fn descriptor_mut(&self) -> RefMut<'_, Descriptor> {
        self.descriptor.borrow_mut()
    }

    #[inline]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[inline]
    pub fn state(&self) -> MaterialState {
        self.state.get()
    }

    pub fn descriptor(&self) -> Ref<'_, Descriptor> {
        self.descriptor.borrow()
    }

    pub fn material(&self) -> Ref<'_, Material> {
        self.material.borrow()
    }

    /// Number of keys the material waits to be added to the registry.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Number of assets whose changes the material follows.
    pub fn bindings_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_bound(&self, id: AssetId) -> bool {
        self.bindings.is_bound(id)
    }
}

impl Drop for MaterialAsset {
    fn drop(&mut self) {
        if self.state.get() != MaterialState::Destroyed {
            self.release();
        }
    }
}

impl fmt::Debug for MaterialAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialAsset")
            .field("url", &self.url)
            .field("state", &self.state.get())
            .field("generation", &self.generation.get())
            .field("pending", &self.pending_count())
            .field("bindings", &self.bindings_count())
            .finish()
    }
}

/// Loads material descriptors and creates materials from them.
pub struct MaterialHandler {
    registry: Rc<dyn Registry>,
    source: Rc<dyn DescriptorSource>,
    settings: ContentConfiguration,
}

impl MaterialHandler {
    pub fn new(
        registry: Rc<dyn Registry>,
        source: Rc<dyn DescriptorSource>,
        settings: ContentConfiguration,
    ) -> Self {
        Self {
            registry,
            source,
            settings,
        }
    }

    /// Fetches and parses the descriptor of the material.
    pub fn load(&self, url: &str) -> Result<MaterialDescriptor, LoadError> {
        trace!("Loading material descriptor {:?}", url);
        let text = self.source.fetch(url)?;
        Ok(load_material_from_str(&text)?)
    }

    /// Creates the material from the descriptor. The material contains
    /// only literal parameters until it is patched.
    pub fn open(
        &self,
        url: Option<&str>,
        data: MaterialDescriptor,
    ) -> Result<Rc<MaterialAsset>, LoadError> {
        let material = MaterialAsset::new(
            url.map(String::from),
            self.registry.clone(),
            self.settings.clone(),
            data,
        );
        material.open()?;
        Ok(material)
    }

    pub fn patch(&self, material: &Rc<MaterialAsset>) -> Result<(), LoadError> {
        Ok(material.patch()?)
    }

    /// Loads, opens and patches the material.
    pub fn load_and_open(&self, url: &str) -> Result<Rc<MaterialAsset>, LoadError> {
        let data = self.load(url)?;
        let material = self.open(Some(url), data)?;
        self.patch(&material)?;
        Ok(material)
    }
}

#[cfg(test)]
mod tests {
    use crate::assets::{same_resource, AssetId, Registry};
    use crate::config::ContentConfiguration;
    use crate::io::TransportError;
    use crate::resources::image::CubeMap;
    use crate::resources::material::{
        MaterialAsset, MaterialError, MaterialHandler, MaterialState, ParamData, Uniform,
        PREFILTERED_CUBE_MAPS, SHADING_MODEL,
    };
    use crate::resources::LoadError;
    use crate::testing::{texture, Fixture};
    use descriptor::load_material_from_str;
    use std::rc::Rc;

    fn open(fx: &Fixture, url: &str, json: &str) -> Rc<MaterialAsset> {
        let material = MaterialAsset::new(
            Some(url.to_string()),
            fx.registry(),
            ContentConfiguration::default(),
            load_material_from_str(json).unwrap(),
        );
        material.open().unwrap();
        material
    }

    #[test]
    fn literal_material_is_ready_immediately() {
        let fx = Fixture::new();
        let m = open(
            &fx,
            "materials/plain.json",
            r#"{ "parameters": [ { "name": "shininess", "type": "float", "data": 8 } ] }"#,
        );
        assert_eq!(m.state(), MaterialState::Opening);

        m.patch().unwrap();

        assert_eq!(m.state(), MaterialState::Ready);
        assert_eq!(m.pending_count(), 0);
        assert_eq!(m.bindings_count(), 0);
        assert!(fx.storage.waiter().is_empty());
        assert_eq!(m.material().uniform("shininess"), Some(&Uniform::Float(8.0)));
    }

    #[test]
    fn ready_asset_is_applied_with_one_initialization() {
        let fx = Fixture::new();
        let tex = texture("wood");
        fx.loaded(12, None, vec![tex.clone()]);
        let m = open(
            &fx,
            "materials/wood.json",
            r#"{ "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": 12 },
                { "name": "normalMap", "type": "texture", "data": "12" }
            ] }"#,
        );
        let before = m.material().initializations();

        m.patch().unwrap();

        assert_eq!(m.material().initializations() - before, 1);
        assert!(m.descriptor().parameters[0].data.holds(&tex));
        assert!(m.descriptor().parameters[1].data.holds(&tex));
        assert_eq!(m.pending_count(), 0);
        assert!(fx.storage.waiter().is_empty());
        assert!(m.is_bound(AssetId(12)));
    }

    #[test]
    fn registered_asset_is_applied_once_loaded() {
        let fx = Fixture::new();
        let tex = texture("wood");
        fx.provide(3, vec![tex.clone()]);
        fx.register(3, None);
        let m = open(
            &fx,
            "wood.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 3 } ] }"#,
        );

        m.patch().unwrap();
        assert!(m.material().map("diffuseMap").is_none());
        assert_eq!(fx.storage.queued(), 1);

        let before = m.material().initializations();
        fx.storage.process_queue();

        assert_eq!(m.material().initializations() - before, 1);
        assert!(m.material().map("diffuseMap").is_some());
    }

    #[test]
    fn absent_asset_is_waited_for() {
        let fx = Fixture::new();
        let tex = texture("late");
        fx.provide(7, vec![tex.clone()]);
        fx.provide(8, vec![texture("unrelated")]);
        let m = open(
            &fx,
            "late.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 7 } ] }"#,
        );

        m.patch().unwrap();
        assert_eq!(m.pending_count(), 1);

        let before = m.material().initializations();
        fx.register(8, None);
        fx.storage.process_queue();
        assert_eq!(m.pending_count(), 1);
        assert_eq!(m.material().initializations(), before);

        fx.register(7, None);
        assert_eq!(m.pending_count(), 0);
        assert!(fx.storage.waiter().is_empty());
        fx.storage.process_queue();

        assert_eq!(m.material().initializations() - before, 1);
        assert!(m.descriptor().parameters[0].data.holds(&tex));
    }

    #[test]
    fn fields_waiting_for_same_key_share_one_wait() {
        let fx = Fixture::new();
        let tex = texture("shared");
        fx.provide(5, vec![tex.clone()]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": 5 },
                { "name": "detailMap", "type": "texture", "data": 5 }
            ] }"#,
        );

        m.patch().unwrap();
        assert_eq!(fx.storage.waiter().len(), 1);

        fx.register(5, None);
        fx.storage.process_queue();

        assert!(m.descriptor().parameters[0].data.holds(&tex));
        assert!(m.descriptor().parameters[1].data.holds(&tex));
    }

    #[test]
    fn path_references_are_relative_to_material() {
        let fx = Fixture::new();
        let tex = texture("wood");
        fx.loaded(20, Some("materials/tex/wood.png"), vec![tex.clone()]);
        fx.loaded(21, Some("tex/wood.png"), vec![texture("wrong")]);
        let m = open(
            &fx,
            "materials/wood.json",
            r#"{ "mapping_format": "path", "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": "tex/wood.png" }
            ] }"#,
        );

        m.patch().unwrap();

        assert!(m.material().map("diffuseMap").map_or(false, |r| same_resource(r, &tex)));
    }

    #[test]
    fn cube_map_levels_are_expanded_once() {
        let fx = Fixture::new();
        let set = CubeMap::prefiltered("sky", 512);
        fx.loaded(30, Some("sky.cubemap"), set.clone());
        let m = open(
            &fx,
            "sky.json",
            r#"{ "parameters": [
                { "name": "environment", "type": "cubemap", "data": 30 },
                { "name": "reflection", "type": "cubemap", "data": "sky.cubemap" }
            ] }"#,
        );

        m.patch().unwrap();
        m.patch().unwrap();

        let d = m.descriptor();
        for (idx, name) in PREFILTERED_CUBE_MAPS.iter().enumerate() {
            assert_eq!(d.count(name), 1);
            assert!(d.parameter(name).unwrap().data.holds(&set[idx + 1]));
        }
        assert_eq!(d.count(SHADING_MODEL), 1);
        assert!(m.material().map("prefilteredCubeMap4").is_some());
    }

    #[test]
    fn blinn_derives_single_shading_model() {
        let fx = Fixture::new();
        let m = open(&fx, "m.json", r#"{ "shader": "blinn", "parameters": [] }"#);

        m.patch().unwrap();
        m.patch().unwrap();

        assert_eq!(m.descriptor().count(SHADING_MODEL), 1);
        assert_eq!(m.material().uniform(SHADING_MODEL), Some(&Uniform::Float(1.0)));
    }

    #[test]
    fn replaced_resource_is_propagated() {
        let fx = Fixture::new();
        let (v1, v2) = (texture("v1"), texture("v2"));
        fx.loaded(40, None, vec![v1.clone()]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": 40 },
                { "name": "detailMap", "type": "texture", "data": 40 }
            ] }"#,
        );
        m.patch().unwrap();

        let before = m.material().initializations();
        assert!(fx.storage.replace_resources(AssetId(40), vec![v2.clone()]));

        assert_eq!(m.material().initializations() - before, 1);
        assert!(m.descriptor().parameters[0].data.holds(&v2));
        assert!(m.descriptor().parameters[1].data.holds(&v2));
        assert!(m.is_bound(AssetId(40)));
    }

    #[test]
    fn stale_binding_is_removed() {
        let fx = Fixture::new();
        let v1 = texture("v1");
        let asset = fx.loaded(41, None, vec![v1.clone()]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 41 } ] }"#,
        );
        m.patch().unwrap();

        m.descriptor_mut().parameters[0].data = ParamData::Empty;
        let before = m.material().initializations();
        fx.storage.replace_resources(AssetId(41), vec![texture("v2")]);

        assert_eq!(m.material().initializations(), before);
        assert!(!m.is_bound(AssetId(41)));
        assert_eq!(asset.changed_listeners(), 0);
    }

    #[test]
    fn reload_of_asset_is_propagated() {
        let fx = Fixture::new();
        let (v1, v2) = (texture("v1"), texture("v2"));
        fx.loaded(42, None, vec![v1]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 42 } ] }"#,
        );
        m.patch().unwrap();

        fx.provide(42, vec![v2.clone()]);
        fx.storage.request_reload(AssetId(42));
        fx.storage.process_queue();

        assert!(m.material().map("diffuseMap").map_or(false, |r| same_resource(r, &v2)));
    }

    #[test]
    fn failed_dependency_is_not_fatal() {
        let fx = Fixture::new();
        fx.register(50, None);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": 50 },
                { "name": "shininess", "type": "float", "data": 2 }
            ] }"#,
        );

        m.patch().unwrap();
        fx.storage.process_queue();

        assert_eq!(m.state(), MaterialState::Ready);
        assert!(matches!(m.descriptor().parameters[0].data, ParamData::Value(_)));
        assert!(m.material().map("diffuseMap").is_none());
        assert_eq!(m.material().uniform("shininess"), Some(&Uniform::Float(2.0)));
        assert_eq!(m.bindings_count(), 0);
    }

    #[test]
    fn unresolvable_reference_is_left_alone() {
        let fx = Fixture::new();
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": "wood" } ] }"#,
        );

        m.patch().unwrap();

        assert_eq!(m.state(), MaterialState::Ready);
        assert_eq!(m.pending_count(), 0);
        assert!(m.material().map("diffuseMap").is_none());
    }

    #[test]
    fn destroy_releases_everything() {
        let fx = Fixture::new();
        fx.loaded(60, None, vec![texture("a")]);
        fx.provide(61, vec![texture("b")]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": 60 },
                { "name": "normalMap", "type": "texture", "data": 61 }
            ] }"#,
        );
        m.patch().unwrap();
        assert_eq!(fx.storage.waiter().len(), 1);

        m.destroy();

        assert_eq!(m.state(), MaterialState::Destroyed);
        assert!(fx.storage.waiter().is_empty());
        assert_eq!(m.bindings_count(), 0);
        assert_eq!(fx.storage.get(AssetId(60)).unwrap().changed_listeners(), 0);
        assert_eq!(m.patch(), Err(MaterialError::Destroyed));
    }

    #[test]
    fn dropped_material_ignores_late_assets() {
        let fx = Fixture::new();
        fx.provide(70, vec![texture("a")]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 70 } ] }"#,
        );
        m.patch().unwrap();
        drop(m);

        assert!(fx.storage.waiter().is_empty());
        fx.register(70, None);
        assert_eq!(fx.storage.process_queue(), 0);
    }

    #[test]
    fn changed_descriptor_is_patched_again() {
        let fx = Fixture::new();
        fx.loaded(80, None, vec![texture("old")]);
        let new = texture("new");
        fx.loaded(81, None, vec![new.clone()]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": 80 },
                { "name": "normalMap", "type": "texture", "data": 99 }
            ] }"#,
        );
        m.patch().unwrap();
        assert!(m.is_bound(AssetId(80)));
        assert_eq!(m.pending_count(), 1);

        m.set_data(
            load_material_from_str(
                r#"{ "shader": "blinn", "parameters": [
                    { "name": "diffuseMap", "type": "texture", "data": 81 }
                ] }"#,
            )
            .unwrap(),
        )
        .unwrap();

        assert!(!m.is_bound(AssetId(80)));
        assert!(m.is_bound(AssetId(81)));
        assert_eq!(m.pending_count(), 0);
        assert!(fx.storage.waiter().is_empty());
        assert_eq!(m.descriptor().count(SHADING_MODEL), 1);
        assert!(m.material().map("normalMap").is_none());
        assert!(m.material().map("diffuseMap").map_or(false, |r| same_resource(r, &new)));
    }

    #[test]
    fn descriptor_edited_before_patch_is_used() {
        let fx = Fixture::new();
        let tex = texture("new");
        fx.loaded(81, None, vec![tex.clone()]);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "old", "type": "float", "data": 1 } ] }"#,
        );

        m.set_data(
            load_material_from_str(
                r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 81 } ] }"#,
            )
            .unwrap(),
        )
        .unwrap();
        assert!(m.material().uniform("old").is_none());

        m.patch().unwrap();

        assert_eq!(m.state(), MaterialState::Ready);
        assert!(m.descriptor().parameter("old").is_none());
        assert!(m.material().map("diffuseMap").map_or(false, |r| same_resource(r, &tex)));
        assert!(m.is_bound(AssetId(81)));
    }

    #[test]
    fn destroyed_material_ignores_loaded_assets() {
        let fx = Fixture::new();
        fx.provide(90, vec![texture("a")]);
        let asset = fx.register(90, None);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 90 } ] }"#,
        );
        m.patch().unwrap();
        assert_eq!(fx.storage.queued(), 1);

        m.destroy();
        let before = m.material().initializations();
        fx.storage.process_queue();

        assert_eq!(m.state(), MaterialState::Destroyed);
        assert!(matches!(m.descriptor().parameters[0].data, ParamData::Value(_)));
        assert_eq!(asset.changed_listeners(), 0);
        assert_eq!(m.material().initializations(), before);
        assert_eq!(m.bindings_count(), 0);
    }

    #[test]
    fn edited_material_ignores_assets_of_old_descriptor() {
        let fx = Fixture::new();
        fx.provide(91, vec![texture("a")]);
        let asset = fx.register(91, None);
        let m = open(
            &fx,
            "m.json",
            r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 91 } ] }"#,
        );
        m.patch().unwrap();

        m.set_data(
            load_material_from_str(
                r#"{ "parameters": [ { "name": "diffuseMap", "type": "texture", "data": 92 } ] }"#,
            )
            .unwrap(),
        )
        .unwrap();
        let before = m.material().initializations();
        fx.storage.process_queue();

        assert!(matches!(m.descriptor().parameters[0].data, ParamData::Value(_)));
        assert!(!m.is_bound(AssetId(91)));
        assert_eq!(asset.changed_listeners(), 0);
        assert_eq!(m.material().initializations(), before);
        assert_eq!(m.pending_count(), 1);
    }

    #[test]
    fn invalid_descriptor_edit_is_reported() {
        let fx = Fixture::new();
        let m = open(&fx, "m.json", r#"{ "parameters": [] }"#);
        m.patch().unwrap();

        let result = m.set_data(
            load_material_from_str(r#"{ "parameters": [ { "name": "x", "type": "vec2", "data": true } ] }"#)
                .unwrap(),
        );

        assert!(matches!(result, Err(MaterialError::InvalidParameter { .. })));
    }

    #[test]
    fn handler_loads_opens_and_patches() {
        let fx = Fixture::new();
        let tex = texture("wood");
        fx.loaded(1, Some("materials/tex/wood.png"), vec![tex.clone()]);
        let source = Rc::new(|url: &str| match url {
            "materials/wood.json" => Ok(r#"{ "mapping_format": "path", "parameters": [
                { "name": "diffuseMap", "type": "texture", "data": "tex/wood.png" }
            ] }"#
                .to_string()),
            _ => Err(TransportError::NotFound(url.to_string())),
        });
        let handler = MaterialHandler::new(fx.registry(), source, ContentConfiguration::default());

        let m = handler.load_and_open("materials/wood.json").unwrap();
        assert_eq!(m.state(), MaterialState::Ready);
        assert!(m.material().map("diffuseMap").map_or(false, |r| same_resource(r, &tex)));

        assert!(matches!(
            handler.load_and_open("materials/stone.json"),
            Err(LoadError::Transport(TransportError::NotFound(_)))
        ));
    }

    #[test]
    fn handler_reports_invalid_descriptor() {
        let fx = Fixture::new();
        let source = Rc::new(|_: &str| Ok::<_, TransportError>("{ \"parameters\": 3 }".to_string()));
        let handler = MaterialHandler::new(fx.registry(), source, ContentConfiguration::default());

        assert!(matches!(handler.load("m.json"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn unwatched_material_keeps_its_descriptor() {
        let fx = Fixture::new();
        let settings = ContentConfiguration {
            watch_descriptors: false,
            ..ContentConfiguration::default()
        };
        let m = MaterialAsset::new(
            None,
            fx.registry(),
            settings,
            load_material_from_str(r#"{ "parameters": [] }"#).unwrap(),
        );
        m.patch().unwrap();

        m.set_data(
            load_material_from_str(r#"{ "parameters": [ { "name": "a", "type": "float", "data": 1 } ] }"#)
                .unwrap(),
        )
        .unwrap();

        assert!(m.descriptor().parameter("a").is_none());
    }
}
