//! Font objects and their glyph caches.
//!
//! A [`FontObject`] owns the font bytes and every rendering setting. Glyphs
//! are rasterized lazily per requested size into a [`FontSizeCache`], whose
//! atlas pages are handed to the renderer on first draw.

pub mod atlas;
pub mod config;
pub mod face;
pub(crate) mod msdf;
pub(crate) mod raster;
pub mod size_cache;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use verso_core::TaskPool;
use verso_core::alloc::HashMap;
use verso_core::geometry::Rect;
use verso_core::math::{Affine2, Vec2};
use verso_core::profiling::profile_function;

use crate::config::{TextServerConfig, sanitize_oversampling};
use crate::error::{TextError, TextResult};
use crate::texture::{Color, GlyphCanvas, MsdfDrawParams};

pub use atlas::{AtlasAllocator, AtlasFormat, AtlasImage, AtlasPage};
pub use config::{Antialiasing, FontStyle, Hinting, SubpixelPositioning};
pub use face::{ContourPoint, GlyphContours, VariationAxis};
pub use size_cache::{CacheStats, FontSizeCache, GlyphInfo, SizeMetrics};

use config::{glyph_key, split_glyph_key, subpixel_bucket};
use raster::{BitmapRequest, RasterGlyph};

/// Transparent border around every glyph in the atlas.
const GLYPH_MARGIN: u32 = 1;
const DEFAULT_MSDF_PIXEL_RANGE: u32 = 14;
const DEFAULT_MSDF_SOURCE_SIZE: u32 = 48;

/// Shared resources a font uses while rasterizing.
#[derive(Debug, Clone)]
pub struct RasterContext {
    pub pool: Option<Arc<TaskPool>>,
    pub msdf_parallel_threshold: u32,
    pub bitmap_atlas: AtlasAllocator,
    pub msdf_atlas: AtlasAllocator,
    pub global_oversampling: f32,
}

impl Default for RasterContext {
    fn default() -> Self {
        Self::from_config(&TextServerConfig::default(), None)
    }
}

impl RasterContext {
    pub fn from_config(config: &TextServerConfig, pool: Option<Arc<TaskPool>>) -> Self {
        Self {
            pool,
            msdf_parallel_threshold: config.msdf_parallel_threshold,
            bitmap_atlas: AtlasAllocator::new(config.atlas_min_page_size, config.atlas_max_page_size),
            msdf_atlas: AtlasAllocator::new(config.atlas_min_page_size, config.msdf_max_page_size),
            global_oversampling: config.global_oversampling,
        }
    }
}

/// A font resource: source bytes, rendering configuration and size caches.
#[derive(Debug)]
pub struct FontObject {
    data: Option<Arc<[u8]>>,
    valid: bool,
    face_index: u32,
    face_count: u32,
    style: FontStyle,
    name: String,
    style_name: String,
    char_map: face::CharMap,
    units_per_em: f32,
    /// Font-unit kerning from the face's `kern` table, filled on lookup.
    face_kerning: HashMap<(u32, u32), i16>,

    antialiasing: Antialiasing,
    hinting: Hinting,
    subpixel: SubpixelPositioning,
    embolden: f32,
    transform: Affine2,
    variations: IndexMap<u32, f32>,
    fixed_size: u32,
    msdf: bool,
    msdf_pixel_range: u32,
    msdf_source_size: u32,
    /// 0 follows the server-wide value.
    oversampling: f32,

    language_overrides: HashMap<String, bool>,
    script_overrides: HashMap<String, bool>,
    feature_overrides: IndexMap<u32, i32>,

    caches: BTreeMap<u32, FontSizeCache>,
    context: RasterContext,
}

impl Default for FontObject {
    fn default() -> Self {
        Self::new(RasterContext::default())
    }
}

macro_rules! cache_setter {
    ($(#[$meta:meta])* $setter:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $setter(&mut self, value: $ty) {
            if self.$field != value {
                self.$field = value;
                self.invalidate(stringify!($field));
            }
        }
    };
}

impl FontObject {
    pub fn new(context: RasterContext) -> Self {
        Self {
            data: None,
            valid: false,
            face_index: 0,
            face_count: 0,
            style: FontStyle::empty(),
            name: String::new(),
            style_name: String::new(),
            char_map: face::CharMap::default(),
            units_per_em: 1000.0,
            face_kerning: HashMap::new(),
            antialiasing: Antialiasing::default(),
            hinting: Hinting::default(),
            subpixel: SubpixelPositioning::default(),
            embolden: 0.0,
            transform: Affine2::IDENTITY,
            variations: IndexMap::new(),
            fixed_size: 0,
            msdf: false,
            msdf_pixel_range: DEFAULT_MSDF_PIXEL_RANGE,
            msdf_source_size: DEFAULT_MSDF_SOURCE_SIZE,
            oversampling: 0.0,
            language_overrides: HashMap::new(),
            script_overrides: HashMap::new(),
            feature_overrides: IndexMap::new(),
            caches: BTreeMap::new(),
            context,
        }
    }

    fn invalidate(&mut self, reason: &str) {
        if !self.caches.is_empty() {
            tracing::debug!("font '{}': {} changed, dropping {} size caches", self.name, reason, self.caches.len());
        }
        self.caches.clear();
    }

    /// Loads font bytes and fills name, style name and style flags from the face.
    ///
    /// On error the bytes are kept but the font stays unusable: every glyph
    /// query resolves to not found.
    pub fn set_data(&mut self, data: impl Into<Arc<[u8]>>) -> TextResult<()> {
        let data: Arc<[u8]> = data.into();
        self.face_count = face::face_count(&data);
        if self.face_index >= self.face_count {
            self.face_index = 0;
        }
        self.data = Some(data);
        self.valid = false;
        self.char_map = face::CharMap::default();
        self.face_kerning.clear();
        self.invalidate("data");
        self.load_face()
    }

    /// Reads the font file at `path` and loads it like [`set_data`](Self::set_data).
    pub fn load_file(&mut self, path: &Path) -> TextResult<()> {
        let data = std::fs::read(path)?;
        self.set_data(data)
    }

    fn load_face(&mut self) -> TextResult<()> {
        let data = self.data.clone().ok_or(TextError::NoFontData)?;
        let face = face::parse(&data, self.face_index, &[])?;
        if let Some(name) = face::family_name(&face) {
            self.name = name;
        }
        if let Some(style_name) = face::style_name(&face) {
            self.style_name = style_name;
        }
        self.style = face::style_flags(&face);
        self.char_map = face::CharMap::new(&face);
        self.units_per_em = face::unit_metrics(&face).units_per_em;
        self.face_kerning.clear();
        self.valid = true;
        Ok(())
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// True once valid font data is loaded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn set_face_index(&mut self, index: u32) -> TextResult<()> {
        if self.data.is_some() && index >= self.face_count {
            return Err(TextError::FaceIndexOutOfRange {
                index,
                face_count: self.face_count,
            });
        }
        if self.face_index == index {
            return Ok(());
        }
        self.face_index = index;
        self.invalidate("face index");
        if self.data.is_some() {
            self.valid = false;
            self.char_map = face::CharMap::default();
            self.face_kerning.clear();
            self.load_face()?;
        }
        Ok(())
    }

    pub fn face_count(&self) -> u32 {
        self.face_count
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn set_style(&mut self, style: FontStyle) {
        self.style = style;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn style_name(&self) -> &str {
        &self.style_name
    }

    pub fn set_style_name(&mut self, style_name: impl Into<String>) {
        self.style_name = style_name.into();
    }

    pub fn antialiasing(&self) -> Antialiasing {
        self.antialiasing
    }

    cache_setter!(set_antialiasing, antialiasing, Antialiasing);

    pub fn hinting(&self) -> Hinting {
        self.hinting
    }

    cache_setter!(set_hinting, hinting, Hinting);

    pub fn subpixel_positioning(&self) -> SubpixelPositioning {
        self.subpixel
    }

    cache_setter!(set_subpixel_positioning, subpixel, SubpixelPositioning);

    pub fn embolden(&self) -> f32 {
        self.embolden
    }

    cache_setter!(
        /// Embolden strength; 1.0 widens strokes by 1/16 of the raster size.
        set_embolden,
        embolden,
        f32
    );

    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    cache_setter!(set_transform, transform, Affine2);

    pub fn variation_coordinates(&self) -> &IndexMap<u32, f32> {
        &self.variations
    }

    cache_setter!(set_variation_coordinates, variations, IndexMap<u32, f32>);

    pub fn fixed_size(&self) -> u32 {
        self.fixed_size
    }

    cache_setter!(
        /// Rasterize every size at this size and scale the result. 0 disables.
        set_fixed_size,
        fixed_size,
        u32
    );

    pub fn is_msdf(&self) -> bool {
        self.msdf
    }

    cache_setter!(set_msdf, msdf, bool);

    pub fn msdf_pixel_range(&self) -> u32 {
        self.msdf_pixel_range
    }

    pub fn set_msdf_pixel_range(&mut self, range: u32) {
        let range = range.max(1);
        if self.msdf_pixel_range != range {
            self.msdf_pixel_range = range;
            self.invalidate("msdf pixel range");
        }
    }

    pub fn msdf_size(&self) -> u32 {
        self.msdf_source_size
    }

    pub fn set_msdf_size(&mut self, size: u32) {
        let size = size.max(1);
        if self.msdf_source_size != size {
            self.msdf_source_size = size;
            self.invalidate("msdf size");
        }
    }

    pub fn oversampling(&self) -> f32 {
        self.oversampling
    }

    /// Per-font oversampling; 0 follows the server-wide value.
    pub fn set_oversampling(&mut self, oversampling: f32) {
        let oversampling = if oversampling.is_finite() { oversampling.max(0.0) } else { 0.0 };
        if self.oversampling != oversampling {
            self.oversampling = oversampling;
            self.invalidate("oversampling");
        }
    }

    pub(crate) fn set_global_oversampling(&mut self, oversampling: f32) {
        let oversampling = sanitize_oversampling(oversampling);
        if self.context.global_oversampling != oversampling {
            self.context.global_oversampling = oversampling;
            if self.oversampling == 0.0 {
                self.invalidate("global oversampling");
            }
        }
    }

    pub fn is_language_supported(&self, language: &str) -> bool {
        self.language_overrides.get(language).copied().unwrap_or(true)
    }

    pub fn language_support_override(&self, language: &str) -> Option<bool> {
        self.language_overrides.get(language).copied()
    }

    pub fn set_language_support_override(&mut self, language: &str, supported: bool) {
        self.language_overrides.insert(language.to_string(), supported);
    }

    pub fn remove_language_support_override(&mut self, language: &str) {
        self.language_overrides.remove(language);
    }

    pub fn language_support_overrides(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.language_overrides.keys().cloned().collect();
        languages.sort();
        languages
    }

    pub fn is_script_supported(&self, script: &str) -> bool {
        self.script_overrides.get(script).copied().unwrap_or(true)
    }

    pub fn script_support_override(&self, script: &str) -> Option<bool> {
        self.script_overrides.get(script).copied()
    }

    pub fn set_script_support_override(&mut self, script: &str, supported: bool) {
        self.script_overrides.insert(script.to_string(), supported);
    }

    pub fn remove_script_support_override(&mut self, script: &str) {
        self.script_overrides.remove(script);
    }

    pub fn script_support_overrides(&self) -> Vec<String> {
        let mut scripts: Vec<String> = self.script_overrides.keys().cloned().collect();
        scripts.sort();
        scripts
    }

    pub fn opentype_feature_overrides(&self) -> &IndexMap<u32, i32> {
        &self.feature_overrides
    }

    pub fn set_opentype_feature_overrides(&mut self, overrides: IndexMap<u32, i32>) {
        self.feature_overrides = overrides;
    }

    /// Variation axes declared by the face.
    pub fn supported_variations(&self) -> Vec<VariationAxis> {
        self.data
            .as_deref()
            .filter(|_| self.valid)
            .and_then(|data| face::parse(data, self.face_index, &[]).ok())
            .map(|face| face::variation_axes(&face))
            .unwrap_or_default()
    }

    fn variation_list(&self) -> Vec<(u32, f32)> {
        self.variations.iter().map(|(&tag, &value)| (tag, value)).collect()
    }

    fn effective_oversampling(&self) -> f32 {
        if self.msdf || self.fixed_size > 0 {
            1.0
        } else if self.oversampling > 0.0 {
            self.oversampling
        } else {
            self.context.global_oversampling
        }
    }

    fn raster_size_for(&self, size: u32) -> u32 {
        if self.msdf {
            self.msdf_source_size
        } else if self.fixed_size > 0 {
            self.fixed_size
        } else {
            size
        }
    }

    /// Cache for `size`, created on first use. `None` for fonts without valid data.
    pub fn ensure_size(&mut self, size: u32) -> Option<&mut FontSizeCache> {
        if !self.valid {
            return None;
        }
        let size = size.max(1);
        if !self.caches.contains_key(&size) {
            let data = self.data.clone()?;
            let face = face::parse(&data, self.face_index, &self.variation_list()).ok()?;
            let units = face::unit_metrics(&face);
            let px_per_unit = size as f32 / units.units_per_em;
            let metrics = SizeMetrics {
                ascent: units.ascender * px_per_unit,
                descent: units.descender * px_per_unit,
                underline_position: -units.underline_position * px_per_unit,
                underline_thickness: units.underline_thickness * px_per_unit,
            };
            let cache = FontSizeCache::new(
                size,
                self.raster_size_for(size),
                self.effective_oversampling(),
                metrics,
            );
            tracing::debug!(
                "font '{}': size cache {} created (raster {}, oversampling {})",
                self.name,
                size,
                cache.raster_size(),
                cache.oversampling()
            );
            self.caches.insert(size, cache);
        }
        self.caches.get_mut(&size)
    }

    pub fn size_cache(&self, size: u32) -> Option<&FontSizeCache> {
        self.caches.get(&size.max(1))
    }

    /// Requested sizes that currently have a cache, ascending.
    pub fn size_cache_list(&self) -> Vec<u32> {
        self.caches.keys().copied().collect()
    }

    pub fn clear_size_cache(&mut self) {
        self.caches.clear();
    }

    pub fn remove_size_cache(&mut self, size: u32) {
        self.caches.remove(&size.max(1));
    }

    pub fn metrics(&mut self, size: u32) -> SizeMetrics {
        self.ensure_size(size).map(|cache| cache.metrics()).unwrap_or_default()
    }

    pub fn set_metrics(&mut self, size: u32, metrics: SizeMetrics) {
        if let Some(cache) = self.ensure_size(size) {
            *cache.metrics_mut() = metrics;
        }
    }

    pub fn scale(&mut self, size: u32) -> f32 {
        self.ensure_size(size).map_or(1.0, |cache| cache.scale())
    }

    pub fn set_scale(&mut self, size: u32, scale: f32) {
        if let Some(cache) = self.ensure_size(size) {
            cache.set_scale(scale);
        }
    }

    pub fn texture_count(&mut self, size: u32) -> usize {
        self.ensure_size(size).map_or(0, |cache| cache.pages().len())
    }

    pub fn texture_image(&mut self, size: u32, idx: usize) -> Option<AtlasImage> {
        self.ensure_size(size)?
            .pages()
            .get(idx)
            .map(|page| page.image().clone())
    }

    pub fn set_texture_image(&mut self, size: u32, idx: usize, image: AtlasImage) -> bool {
        self.ensure_size(size)
            .is_some_and(|cache| cache.set_page_image(idx, image))
    }

    pub fn remove_texture(&mut self, size: u32, idx: usize) -> bool {
        self.ensure_size(size).is_some_and(|cache| cache.remove_page(idx))
    }

    pub fn clear_textures(&mut self, size: u32) {
        if let Some(cache) = self.ensure_size(size) {
            cache.clear_pages();
        }
    }

    pub fn glyph_list(&mut self, size: u32) -> Vec<u32> {
        self.ensure_size(size).map(|cache| cache.glyph_keys()).unwrap_or_default()
    }

    pub fn clear_glyphs(&mut self, size: u32) {
        if let Some(cache) = self.ensure_size(size) {
            cache.clear_glyphs();
        }
    }

    pub fn remove_glyph(&mut self, size: u32, glyph: u32) {
        if let Some(cache) = self.ensure_size(size) {
            cache.remove_glyph(glyph);
        }
    }

    /// Cached info for `glyph`, rasterizing and packing it on a miss.
    pub fn ensure_glyph(&mut self, size: u32, glyph: u32) -> GlyphInfo {
        let Some(cache) = self.ensure_size(size) else {
            return GlyphInfo::NOT_FOUND;
        };
        if let Some(info) = cache.lookup(glyph) {
            return info;
        }
        let size = size.max(1);
        let info = self.render_glyph_info(size, glyph);
        if let Some(cache) = self.caches.get_mut(&size) {
            cache.insert_glyph(glyph, info);
        }
        info
    }

    fn render_glyph_info(&mut self, size: u32, key: u32) -> GlyphInfo {
        profile_function!();
        let Some(data) = self.data.clone() else {
            return GlyphInfo::NOT_FOUND;
        };
        let variations = self.variation_list();
        let Ok(face) = face::parse(&data, self.face_index, &variations) else {
            return GlyphInfo::NOT_FOUND;
        };
        let (codepoint, bucket) = split_glyph_key(key);
        let Some(gid) = face::glyph_id(&face, codepoint) else {
            tracing::trace!("font '{}' has no glyph for U+{:04X}", self.name, codepoint);
            return GlyphInfo::NOT_FOUND;
        };
        let Some(cache) = self.caches.get(&size) else {
            return GlyphInfo::NOT_FOUND;
        };
        let raster_px = cache.raster_size() as f32 * cache.oversampling();
        let unit = cache.output_unit();
        let units = face::unit_metrics(&face);
        let px_per_unit = raster_px / units.units_per_em;
        let embolden_px = self.embolden * raster_px / 16.0;

        let mut advance = Vec2::new(
            face.glyph_hor_advance(gid).unwrap_or(0) as f32 * px_per_unit + embolden_px,
            0.0,
        );
        advance = self.transform.matrix2 * advance;

        let steps = self.subpixel.steps(cache.raster_size());
        let rendered: Option<RasterGlyph> = if self.msdf {
            face::outline(&face, gid).and_then(|segments| {
                msdf::MsdfShape::new(
                    &segments,
                    px_per_unit,
                    self.transform,
                    self.msdf_pixel_range as f32,
                    embolden_px,
                )
            })
            .map(|shape| {
                msdf::generate(
                    shape,
                    self.context.pool.as_deref(),
                    self.context.msdf_parallel_threshold,
                )
            })
        } else {
            if steps == 1 {
                advance.x = advance.x.round();
            }
            raster::rasterize(&BitmapRequest {
                data: &data,
                face_index: self.face_index,
                glyph_id: gid.0,
                pixel_size: raster_px,
                hinting: self.hinting,
                antialiasing: self.antialiasing,
                x_shift: raster::subpixel_shift(bucket, steps, cache.oversampling()),
                embolden: embolden_px,
                transform: self.transform,
                variations: &variations,
            })
        };

        let mut info = GlyphInfo {
            advance: advance * unit,
            ..GlyphInfo::EMPTY
        };

        let Some(rendered) = rendered.filter(|glyph| !glyph.image.is_empty()) else {
            return info;
        };

        let allocator = if self.msdf {
            self.context.msdf_atlas
        } else {
            self.context.bitmap_atlas
        };
        let Some(cache) = self.caches.get_mut(&size) else {
            return info;
        };
        match cache.place(&allocator, &rendered.image, GLYPH_MARGIN) {
            Ok(placement) => {
                let margin = GLYPH_MARGIN as f32;
                let rect = Rect::new(
                    rendered.left as f32 - margin,
                    -rendered.top as f32 - margin,
                    placement.width as f32,
                    placement.height as f32,
                );
                info.texture_idx = Some(placement.page);
                info.rect = rect * unit;
                info.uv_rect = Rect::new(
                    placement.x as f32,
                    placement.y as f32,
                    placement.width as f32,
                    placement.height as f32,
                );
            }
            Err(err) => {
                tracing::warn!("font '{}': glyph U+{:04X} not packed: {}", self.name, codepoint, err);
            }
        }
        info
    }

    fn update_glyph(&mut self, size: u32, glyph: u32, update: impl FnOnce(&mut GlyphInfo)) {
        if let Some(cache) = self.ensure_size(size) {
            let mut info = cache.glyph(glyph).copied().unwrap_or(GlyphInfo::EMPTY);
            update(&mut info);
            info.found = true;
            cache.insert_glyph(glyph, info);
        }
    }

    pub fn glyph_advance(&mut self, size: u32, glyph: u32) -> Vec2 {
        self.ensure_glyph(size, glyph).advance
    }

    pub fn set_glyph_advance(&mut self, size: u32, glyph: u32, advance: Vec2) {
        self.update_glyph(size, glyph, |info| info.advance = advance);
    }

    pub fn glyph_offset(&mut self, size: u32, glyph: u32) -> Vec2 {
        self.ensure_glyph(size, glyph).rect.position()
    }

    pub fn set_glyph_offset(&mut self, size: u32, glyph: u32, offset: Vec2) {
        self.update_glyph(size, glyph, |info| {
            info.rect.x = offset.x;
            info.rect.y = offset.y;
        });
    }

    pub fn glyph_size(&mut self, size: u32, glyph: u32) -> Vec2 {
        self.ensure_glyph(size, glyph).rect.size()
    }

    pub fn set_glyph_size(&mut self, size: u32, glyph: u32, glyph_size: Vec2) {
        self.update_glyph(size, glyph, |info| {
            info.rect.width = glyph_size.x;
            info.rect.height = glyph_size.y;
        });
    }

    pub fn glyph_uv_rect(&mut self, size: u32, glyph: u32) -> Rect<f32> {
        self.ensure_glyph(size, glyph).uv_rect
    }

    pub fn set_glyph_uv_rect(&mut self, size: u32, glyph: u32, uv_rect: Rect<f32>) {
        self.update_glyph(size, glyph, |info| info.uv_rect = uv_rect);
    }

    pub fn glyph_texture_idx(&mut self, size: u32, glyph: u32) -> Option<usize> {
        self.ensure_glyph(size, glyph).texture_idx
    }

    pub fn set_glyph_texture_idx(&mut self, size: u32, glyph: u32, texture_idx: Option<usize>) {
        self.update_glyph(size, glyph, |info| info.texture_idx = texture_idx);
    }

    /// Size of the atlas page holding `glyph`, zero when it has none.
    pub fn glyph_texture_size(&mut self, size: u32, glyph: u32) -> (u32, u32) {
        let Some(idx) = self.ensure_glyph(size, glyph).texture_idx else {
            return (0, 0);
        };
        self.size_cache(size)
            .and_then(|cache| cache.pages().get(idx))
            .map_or((0, 0), |page| page.size())
    }

    /// Outline of `glyph` at `size` pixels per em, y up.
    pub fn glyph_contours(&self, size: u32, glyph: u32) -> Option<GlyphContours> {
        if !self.valid {
            return None;
        }
        let data = self.data.as_deref()?;
        let face = face::parse(data, self.face_index, &self.variation_list()).ok()?;
        let gid = face::glyph_id(&face, glyph)?;
        let segments = face::outline(&face, gid)?;
        let scale = size.max(1) as f32 / face::unit_metrics(&face).units_per_em;
        Some(face::contours(&segments, scale))
    }

    pub fn kerning_list(&mut self, size: u32) -> Vec<(u32, u32)> {
        self.ensure_size(size).map(|cache| cache.kerning_pairs()).unwrap_or_default()
    }

    pub fn clear_kerning_map(&mut self, size: u32) {
        if let Some(cache) = self.ensure_size(size) {
            cache.clear_kerning();
        }
    }

    pub fn remove_kerning(&mut self, size: u32, pair: (u32, u32)) {
        if let Some(cache) = self.ensure_size(size) {
            cache.remove_kerning(pair);
        }
    }

    pub fn set_kerning(&mut self, size: u32, pair: (u32, u32), kerning: Vec2) {
        if let Some(cache) = self.ensure_size(size) {
            cache.set_kerning(pair, kerning);
        }
    }

    /// Kerning for a glyph pair: the override map first, then the face's `kern` table.
    pub fn kerning(&mut self, size: u32, pair: (u32, u32)) -> Vec2 {
        let Some(cache) = self.ensure_size(size) else {
            return Vec2::ZERO;
        };
        if let Some(offset) = cache.kerning_override(pair) {
            return offset;
        }
        let size = cache.size();
        let units = match self.face_kerning.get(&pair) {
            Some(&units) => units,
            None => {
                let units = self.lookup_face_kerning(pair);
                self.face_kerning.insert(pair, units);
                units
            }
        };
        Vec2::new(units as f32 * size as f32 / self.units_per_em, 0.0)
    }

    fn lookup_face_kerning(&self, pair: (u32, u32)) -> i16 {
        let (Some(left), Some(right)) = (self.char_map.glyph_id(pair.0), self.char_map.glyph_id(pair.1)) else {
            return 0;
        };
        self.data
            .as_deref()
            .and_then(|data| face::parse(data, self.face_index, &[]).ok())
            .map_or(0, |face| face::kerning(&face, left, right))
    }

    /// Glyph index for `ch`. Glyphs are addressed by codepoint.
    pub fn glyph_index(&self, ch: char) -> u32 {
        if self.has_char(ch) { ch as u32 } else { 0 }
    }

    pub fn has_char(&self, ch: char) -> bool {
        self.valid && self.char_map.contains(ch)
    }

    /// Every mapped character, sorted.
    pub fn supported_chars(&self) -> Vec<char> {
        if !self.valid {
            return Vec::new();
        }
        self.char_map.chars().to_vec()
    }

    /// Pre-renders every mapped character in `start..=end`.
    pub fn render_range(&mut self, size: u32, start: char, end: char) {
        for ch in start..=end {
            if self.has_char(ch) {
                self.ensure_glyph(size, ch as u32);
            }
        }
    }

    pub fn render_glyph(&mut self, size: u32, glyph: u32) {
        self.ensure_glyph(size, glyph);
    }

    /// Draws `glyph` with its pen position at `pos` on the baseline.
    ///
    /// Atlas pages are turned into textures on first use and re-uploaded when
    /// they changed since the last draw.
    pub fn draw_glyph(&mut self, canvas: &dyn GlyphCanvas, size: u32, pos: Vec2, glyph: u32, color: Color) {
        profile_function!();
        let size = size.max(1);
        let msdf = self.msdf;
        let pixel_range = self.msdf_pixel_range as f32;
        let raster_size = self.raster_size_for(size);
        let steps = if msdf { 1 } else { self.subpixel.steps(raster_size) };

        let (key, origin) = if msdf {
            (glyph, pos)
        } else if steps > 1 {
            let bucket = subpixel_bucket(pos.x, steps);
            (glyph_key(glyph, bucket), Vec2::new(pos.x.floor(), pos.y.round()))
        } else {
            (glyph, pos.round())
        };

        let info = self.ensure_glyph(size, key);
        let Some(page_idx) = info.texture_idx.filter(|_| info.found) else {
            return;
        };
        let Some(cache) = self.caches.get_mut(&size) else {
            return;
        };
        let unit = cache.output_unit();
        let Some(page) = cache.page_mut(page_idx) else {
            return;
        };

        let texture = match page.texture().cloned() {
            Some(texture) => {
                if page.is_dirty() {
                    texture.upload(page.image());
                    page.mark_clean();
                }
                texture
            }
            None => {
                let texture = canvas.create_texture(page.image());
                page.set_texture(texture.clone());
                texture
            }
        };

        let msdf_params = msdf.then_some(MsdfDrawParams {
            pixel_range,
            scale: unit,
        });
        canvas.draw_texture_rect_region(&texture, info.rect.translate(origin), info.uv_rect, color, msdf_params);
    }
}
