use crate::MatInfoParameters;
use common::perf::CPUProfiler;
use common::tool::Tool;
use content::assets::{Asset, AssetLoadError, LoadResult, ResourceRef, Storage};
use content::config::{load_configuration, ConfigError, ContentConfiguration};
use content::io::FileSystemSource;
use content::resources::animation::AnimationHandler;
use content::resources::image::{CubeMap, Texture};
use content::resources::material::{
    MaterialHandler, MaterialState, ParamData, ShadingModel, Uniform,
};
use content::resources::LoadError;
use descriptor::animation::AnimationTrackSet;
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::WalkDir;

/// Edge size reported for cube maps found in the content root.
const CUBE_MAP_SIZE: u32 = 512;

#[derive(Debug)]
pub enum MatInfoError {
    Config(ConfigError),
    NoContentRoot,
    Load(LoadError),
}

impl fmt::Display for MatInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatInfoError::Config(e) => write!(f, "{}", e),
            MatInfoError::NoContentRoot => write!(f, "no content root specified"),
            MatInfoError::Load(e) => write!(f, "{}", e),
        }
    }
}

impl From<ConfigError> for MatInfoError {
    fn from(e: ConfigError) -> Self {
        MatInfoError::Config(e)
    }
}

impl From<LoadError> for MatInfoError {
    fn from(e: LoadError) -> Self {
        MatInfoError::Load(e)
    }
}

pub struct MaterialReport {
    pub url: String,
    pub state: MaterialState,
    pub shading_model: ShadingModel,
    pub uniforms: Vec<(String, String)>,
    pub unresolved: Vec<String>,
    pub pending: usize,
    pub bindings: usize,
    pub assets: usize,
    pub initializations: CPUProfiler,
}

pub enum Report {
    Material(MaterialReport),
    Animation(AnimationTrackSet),
}

pub struct MatInfo;

impl Tool for MatInfo {
    type Params = MatInfoParameters;
    type Result = Result<Report, MatInfoError>;

    fn execute(&self, params: Self::Params) -> Self::Result {
        let config = load_configuration()?;
        let (root, source) = match params.root {
            Some(t) => (t.clone(), FileSystemSource::new(vec![t])),
            None => (
                config
                    .content_roots
                    .first()
                    .cloned()
                    .ok_or(MatInfoError::NoContentRoot)?,
                FileSystemSource::from_config(&config),
            ),
        };
        let source = Rc::new(source);

        if params.animation {
            let handler = AnimationHandler::new(source);
            let animation = handler.load_and_open(&params.input)?;
            return Ok(Report::Animation(animation.0.clone()));
        }

        inspect_material(root, source, config, &params.input)
    }
}

fn inspect_material(
    root: PathBuf,
    source: Rc<FileSystemSource>,
    config: ContentConfiguration,
    url: &str,
) -> Result<Report, MatInfoError> {
    let storage = Storage::new(FileTransport { root: root.clone() });
    let assets = scan(&root, &storage);
    info!("Registered {} assets from {:?}", assets, root);

    let handler = MaterialHandler::new(storage.clone(), source, config);
    let material = handler.load_and_open(url)?;

    // load everything the material requested
    while storage.queued() > 0 {
        storage.process_queue();
    }

    let descriptor = material.descriptor();
    let instance = material.material();

    let unresolved = descriptor
        .parameters
        .iter()
        .filter(|p| p.is_map() && matches!(p.data, ParamData::Value(_)))
        .map(|p| p.name.clone())
        .collect();

    Ok(Report::Material(MaterialReport {
        url: url.to_string(),
        state: material.state(),
        shading_model: instance.shading_model(),
        uniforms: instance
            .uniforms()
            .map(|(n, u)| (n.to_string(), describe(u)))
            .collect(),
        unresolved,
        pending: material.pending_count(),
        bindings: material.bindings_count(),
        assets,
        initializations: instance.statistics().initialize.clone(),
    }))
}

/// Registers every file in the root (except descriptors) as an asset
/// addressed by its path relative to the root.
fn scan(root: &Path, storage: &Storage) -> usize {
    let mut count = 0;

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(t) => t,
            Err(e) => {
                warn!("Cannot scan entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(false, |x| x == "json") {
            continue;
        }

        let url = match path.strip_prefix(root) {
            Ok(t) => t
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };

        let name = path
            .file_stem()
            .map(|x| x.to_string_lossy().to_string())
            .unwrap_or_else(|| url.clone());

        if storage.create(name, Some(url)).is_some() {
            count += 1;
        }
    }

    count
}

/// Produces resources of assets found in the content root. Images are
/// not decoded, only their presence is checked.
struct FileTransport {
    root: PathBuf,
}

impl content::assets::Transport for FileTransport {
    fn fetch(&self, asset: &Asset) -> LoadResult<Vec<ResourceRef>> {
        let url = asset
            .url()
            .ok_or_else(|| AssetLoadError::Transport("asset has no url".into()))?;

        std::fs::metadata(self.root.join(url))
            .map_err(|e| AssetLoadError::Transport(e.to_string()))?;

        if url.ends_with(".cubemap") {
            Ok(CubeMap::prefiltered(asset.name(), CUBE_MAP_SIZE))
        } else {
            Ok(vec![Rc::new(Texture::new(asset.name(), 0, 0))])
        }
    }
}

fn describe(uniform: &Uniform) -> String {
    match uniform {
        Uniform::Float(x) => format!("{}", x),
        Uniform::Boolean(x) => format!("{}", x),
        Uniform::Vec2(x) => format!("{:?}", x),
        Uniform::Vec3(x) => format!("{:?}", x),
        Uniform::Vec4(x) => format!("{:?}", x),
        Uniform::Map(r) => {
            if let Some(t) = r.downcast_ref::<Texture>() {
                format!("texture({})", t.name)
            } else if let Some(c) = r.downcast_ref::<CubeMap>() {
                format!("cubemap({}, {})", c.name, c.size)
            } else {
                format!("{:?}", r)
            }
        }
    }
}
