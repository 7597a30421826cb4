//! Layer infrastructure for rasterizing a composition.
//!
//! Each layer encapsulates a configuration, version tracking for cache
//! invalidation, and a small cache of its most recent frames.
//!
//! # Architecture
//!
//! Each layer config implements [`LayerEffect`], which defines:
//! - How the layer draws itself onto the frame
//! - What properties it emits for downstream layers
//! - Which upstream layers its output depends on
//!
//! Properties flow through the pipeline via [`RenderContext`], so the panel
//! can reuse the backdrop's decoded image without the two configs knowing
//! about each other.

pub mod backdrop;
pub mod chrome;
pub mod code;
pub mod panel;
pub mod svg;

pub use backdrop::{BackdropConfig, BackgroundImage};
pub use chrome::ChromeConfig;
pub use code::CodeConfig;
pub use panel::PanelConfig;

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};

use image::RgbaImage;

use crate::composition::Composition;
use crate::error::ExportError;
use crate::export::{RasterRequest, Rasterizer};

// ============================================================================
// Render Context
// ============================================================================

/// Context that flows through the rendering pipeline.
///
/// Layers read the composition and device scale, draw into `image`, and may
/// leave typed properties for downstream layers.
///
/// # Example
///
/// ```ignore
/// // Upstream layer emits a property
/// ctx.set(BackgroundPixels(image.clone()));
///
/// // Downstream layer reads the property
/// if let Some(BackgroundPixels(image)) = ctx.get::<BackgroundPixels>() {
///     // Reuse the decoded background...
/// }
/// ```
pub struct RenderContext<'a> {
    /// The frame being drawn, `composition.frame * scale` pixels.
    pub image: RgbaImage,

    pub composition: &'a Composition,

    /// Device pixels per CSS pixel.
    pub scale: f32,

    properties: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<'a> RenderContext<'a> {
    /// Creates a context with a transparent frame of the requested size.
    pub fn new(composition: &'a Composition, request: RasterRequest) -> Self {
        Self {
            image: RgbaImage::new(request.size.width, request.size.height),
            composition,
            scale: request.scale,
            properties: HashMap::new(),
        }
    }

    /// Sets a typed property that downstream layers can read.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.properties.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed property set by an upstream layer.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.properties
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    pub fn has<T: Any + Send + Sync>(&self) -> bool {
        self.properties.contains_key(&TypeId::of::<T>())
    }
}

// ============================================================================
// Layer Traits
// ============================================================================

/// Trait for layer configuration types.
///
/// Implementations must detect when a configuration meaningfully differs
/// from another, which drives cache invalidation.
pub trait LayerConfig: Clone {
    fn differs_from(&self, other: &Self) -> bool;
}

/// Trait for layer configurations that know how to apply themselves.
///
/// The separation of [`transform`](Self::transform) and [`emit`](Self::emit)
/// keeps property emission in one place: on a cache hit only `emit` runs.
pub trait LayerEffect: LayerConfig {
    /// Returns the dependency version for cache invalidation.
    ///
    /// Layers draw on top of the upstream output, so they depend on every
    /// layer below them. Root layers return `DependencyVersion::NONE`.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion;

    /// Draws onto `ctx.image`.
    fn transform(&self, ctx: &mut RenderContext<'_>);

    /// Emits properties for downstream layers. The default emits nothing.
    fn emit(&self, _ctx: &mut RenderContext<'_>) {}
}

// ============================================================================
// Layer Dependencies
// ============================================================================

/// Represents the combined version of upstream layer dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DependencyVersion(u64);

impl DependencyVersion {
    /// No dependencies (root layer).
    pub const NONE: Self = Self(0);

    pub fn from_version(version: u64) -> Self {
        Self(version)
    }

    /// Combines multiple upstream layer versions into one.
    ///
    /// Versions only ever grow, so the sum changes whenever any input does.
    pub fn combine(versions: &[u64]) -> Self {
        Self(versions.iter().fold(0u64, |acc, v| acc.wrapping_add(*v)))
    }
}

/// Snapshot of all layer versions in the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct LayerVersions {
    pub backdrop: u64,
    pub panel: u64,
    pub chrome: u64,
    pub code: u64,
}

// ============================================================================
// CacheKey
// ============================================================================

/// Key for cached rendered frames.
///
/// Identifies the output size, the device scale (as integer bits) and a
/// fingerprint of the composition geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    width: u32,
    height: u32,
    scale_bits: u32,
    geometry: u64,
}

impl CacheKey {
    pub fn new(composition: &Composition, request: RasterRequest) -> Self {
        let mut hasher = DefaultHasher::new();
        composition.frame.hash(&mut hasher);
        composition.panel.hash(&mut hasher);
        composition.layout.hash(&mut hasher);
        if let Some(title) = &composition.title {
            title.text.hash(&mut hasher);
            title.is_placeholder.hash(&mut hasher);
        }
        Self {
            width: request.size.width,
            height: request.size.height,
            scale_bits: request.scale.to_bits(),
            geometry: hasher.finish(),
        }
    }
}

// ============================================================================
// Frame Cache
// ============================================================================

/// Frames kept per layer: the latest preview and the latest export.
const FRAME_CACHE_CAPACITY: usize = 2;

/// The most recently rendered frames, oldest first.
///
/// Storing a frame drops any older entry under the same key, then the
/// oldest entries beyond [`FRAME_CACHE_CAPACITY`].
#[derive(Default)]
struct FrameCache {
    entries: VecDeque<(CacheKey, RgbaImage, DependencyVersion)>,
}

impl FrameCache {
    fn get(&self, key: CacheKey, deps: DependencyVersion) -> Option<&RgbaImage> {
        self.entries
            .iter()
            .find(|(k, _, stored)| *k == key && *stored == deps)
            .map(|(_, img, _)| img)
    }

    fn store(&mut self, key: CacheKey, image: RgbaImage, deps: DependencyVersion) {
        self.entries.retain(|(k, _, _)| *k != key);
        self.entries.push_back((key, image, deps));
        while self.entries.len() > FRAME_CACHE_CAPACITY {
            self.entries.pop_front();
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Generic Layer
// ============================================================================

/// A generic layer with configuration, caching, and version tracking.
pub struct Layer<C: LayerConfig> {
    config: Option<C>,
    version: u64,
    cache: FrameCache,
}

impl<C: LayerConfig> Default for Layer<C> {
    fn default() -> Self {
        Self {
            config: None,
            version: 0,
            cache: FrameCache::default(),
        }
    }
}

impl<C: LayerConfig> Layer<C> {
    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    /// Returns true if this layer has a config and will draw.
    pub fn is_active(&self) -> bool {
        self.config.is_some()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the configuration. Returns true if it changed.
    ///
    /// Clears the cache and increments version if the config differs.
    pub fn set_config(&mut self, config: Option<C>) -> bool {
        let differs = match (&self.config, &config) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(old), Some(new)) => old.differs_from(new),
        };

        if differs {
            self.config = config;
            self.invalidate();
        }
        differs
    }

    pub fn invalidate(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.cache.clear();
    }
}

impl<C: LayerEffect> Layer<C> {
    /// Apply this layer to the render context, using cache if valid.
    ///
    /// An inactive layer leaves the context untouched.
    pub fn apply(&mut self, ctx: &mut RenderContext<'_>, key: CacheKey, versions: &LayerVersions) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let deps = C::dependencies(versions);

        if let Some(cached) = self.cache.get(key, deps) {
            ctx.image = cached.clone();
            // Properties are not cached, only the image
            config.emit(ctx);
            return;
        }

        config.transform(ctx);
        config.emit(ctx);

        self.cache.store(key, ctx.image.clone(), deps);
    }
}

// ============================================================================
// Composite Layer
// ============================================================================

/// A cache-only layer for final frames.
#[derive(Default)]
pub struct CompositeLayer {
    cache: FrameCache,
}

// ============================================================================
// Layer Pipeline
// ============================================================================

/// Defines the layer pipeline with explicit dependency relationships.
///
/// # Dependency Graph
///
/// ```text
/// Transparent frame
///     │
///     ▼
/// ┌──────────┐
/// │ Backdrop │ ◄── root; emits BackgroundPixels
/// └────┬─────┘
///      ▼
/// ┌──────────┐
/// │  Panel   │ ◄── depends on: Backdrop (consumes BackgroundPixels)
/// └────┬─────┘
///      ▼
/// ┌──────────┐
/// │  Chrome  │ ◄── depends on: Backdrop + Panel
/// └────┬─────┘
///      ▼
/// ┌──────────┐
/// │   Code   │ ◄── depends on: Backdrop + Panel + Chrome
/// └────┬─────┘
///      ▼
/// ┌───────────┐
/// │ Composite │ ◄── depends on: all layers
/// └───────────┘
/// ```
#[derive(Default)]
pub struct LayerPipeline {
    pub backdrop: Layer<BackdropConfig>,
    pub panel: Layer<PanelConfig>,
    pub chrome: Layer<ChromeConfig>,
    pub code: Layer<CodeConfig>,
    pub composite: CompositeLayer,
}

impl LayerPipeline {
    pub fn layer_versions(&self) -> LayerVersions {
        LayerVersions {
            backdrop: self.backdrop.version(),
            panel: self.panel.version(),
            chrome: self.chrome.version(),
            code: self.code.version(),
        }
    }

    fn composite_dependencies(&self) -> DependencyVersion {
        let v = self.layer_versions();
        DependencyVersion::combine(&[v.backdrop, v.panel, v.chrome, v.code])
    }

    /// Renders a composition through every layer, reusing cached frames.
    pub fn render(&mut self, composition: &Composition, request: RasterRequest) -> RgbaImage {
        let key = CacheKey::new(composition, request);
        let composite_deps = self.composite_dependencies();

        if let Some(cached) = self.composite.cache.get(key, composite_deps) {
            log::debug!("frame cache hit at {}x{}", request.size.width, request.size.height);
            return cached.clone();
        }

        let mut ctx = RenderContext::new(composition, request);
        let versions = self.layer_versions();
        self.backdrop.apply(&mut ctx, key, &versions);
        self.panel.apply(&mut ctx, key, &versions);
        self.chrome.apply(&mut ctx, key, &versions);
        self.code.apply(&mut ctx, key, &versions);

        self.composite.cache.store(key, ctx.image.clone(), composite_deps);
        ctx.image
    }
}

impl Rasterizer for LayerPipeline {
    fn rasterize(
        &mut self,
        composition: &Composition,
        request: RasterRequest,
    ) -> Result<RgbaImage, ExportError> {
        if request.size.width == 0 || request.size.height == 0 || !request.scale.is_finite() {
            return Err(ExportError::Raster(format!(
                "cannot rasterize a {}x{} frame at scale {}",
                request.size.width, request.size.height, request.scale
            )));
        }
        if !self.code.is_active() {
            return Err(ExportError::NothingRendered);
        }
        Ok(self.render(composition, request))
    }
}
