//! Per-size glyph cache.

use verso_core::alloc::HashMap;
use verso_core::geometry::Rect;
use verso_core::math::Vec2;

use super::atlas::{AtlasAllocator, AtlasImage, AtlasPage, AtlasPlacement};
use crate::error::TextResult;

/// Cached result for one glyph key at one size.
///
/// `rect` is relative to the pen position on the baseline, y down, in
/// requested-size pixels. `uv_rect` is in atlas page pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    pub found: bool,
    pub texture_idx: Option<usize>,
    pub rect: Rect<f32>,
    pub uv_rect: Rect<f32>,
    pub advance: Vec2,
}

impl GlyphInfo {
    pub const NOT_FOUND: GlyphInfo = GlyphInfo {
        found: false,
        texture_idx: None,
        rect: Rect::ZERO,
        uv_rect: Rect::ZERO,
        advance: Vec2::ZERO,
    };

    /// Empty entry used as the base when a setter creates a glyph.
    pub const EMPTY: GlyphInfo = GlyphInfo {
        found: true,
        ..GlyphInfo::NOT_FOUND
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Vertical metrics of one size, in requested-size pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
}

/// Metrics, glyphs, kerning overrides and atlas pages for one requested size.
#[derive(Debug)]
pub struct FontSizeCache {
    size: u32,
    raster_size: u32,
    oversampling: f32,
    scale: f32,
    metrics: SizeMetrics,
    glyphs: HashMap<u32, GlyphInfo>,
    kerning: HashMap<(u32, u32), Vec2>,
    pages: Vec<AtlasPage>,
    stats: CacheStats,
}

impl FontSizeCache {
    pub fn new(size: u32, raster_size: u32, oversampling: f32, metrics: SizeMetrics) -> Self {
        Self {
            size,
            raster_size,
            oversampling,
            scale: size as f32 / raster_size.max(1) as f32,
            metrics,
            glyphs: HashMap::new(),
            kerning: HashMap::new(),
            pages: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Size glyphs are rasterized at before oversampling.
    pub fn raster_size(&self) -> u32 {
        self.raster_size
    }

    pub fn oversampling(&self) -> f32 {
        self.oversampling
    }

    /// Requested size over raster size.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Factor from raster pixels (oversampling included) to requested pixels.
    pub fn output_unit(&self) -> f32 {
        self.scale / self.oversampling
    }

    pub fn metrics(&self) -> SizeMetrics {
        self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut SizeMetrics {
        &mut self.metrics
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Cached entry for `key`, counted as a hit or a miss.
    pub fn lookup(&mut self, key: u32) -> Option<GlyphInfo> {
        match self.glyphs.get(&key) {
            Some(info) => {
                self.stats.hits += 1;
                Some(*info)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn glyph(&self, key: u32) -> Option<&GlyphInfo> {
        self.glyphs.get(&key)
    }

    pub fn insert_glyph(&mut self, key: u32, info: GlyphInfo) {
        self.glyphs.insert(key, info);
    }

    pub fn remove_glyph(&mut self, key: u32) -> Option<GlyphInfo> {
        self.glyphs.remove(&key)
    }

    pub fn clear_glyphs(&mut self) {
        self.glyphs.clear();
    }

    pub fn glyph_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.glyphs.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn kerning_override(&self, pair: (u32, u32)) -> Option<Vec2> {
        self.kerning.get(&pair).copied()
    }

    pub fn set_kerning(&mut self, pair: (u32, u32), offset: Vec2) {
        self.kerning.insert(pair, offset);
    }

    pub fn remove_kerning(&mut self, pair: (u32, u32)) {
        self.kerning.remove(&pair);
    }

    pub fn clear_kerning(&mut self) {
        self.kerning.clear();
    }

    pub fn kerning_pairs(&self) -> Vec<(u32, u32)> {
        let mut pairs: Vec<_> = self.kerning.keys().copied().collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    pub fn page_mut(&mut self, idx: usize) -> Option<&mut AtlasPage> {
        self.pages.get_mut(idx)
    }

    pub fn place(
        &mut self,
        allocator: &AtlasAllocator,
        image: &AtlasImage,
        margin: u32,
    ) -> TextResult<AtlasPlacement> {
        let raster_px = self.raster_size as f32 * self.oversampling;
        allocator.place(&mut self.pages, image, margin, raster_px)
    }

    /// Replaces page `idx` with `image`, or appends it when `idx` is one past the end.
    pub fn set_page_image(&mut self, idx: usize, image: AtlasImage) -> bool {
        match idx.cmp(&self.pages.len()) {
            std::cmp::Ordering::Less => {
                self.pages[idx] = AtlasPage::from_image(image);
                true
            }
            std::cmp::Ordering::Equal => {
                self.pages.push(AtlasPage::from_image(image));
                true
            }
            std::cmp::Ordering::Greater => false,
        }
    }

    /// Drops page `idx` and every glyph stored on it. Later pages shift down.
    pub fn remove_page(&mut self, idx: usize) -> bool {
        if idx >= self.pages.len() {
            return false;
        }
        self.pages.remove(idx);
        self.glyphs.retain(|_, info| info.texture_idx != Some(idx));
        for info in self.glyphs.values_mut() {
            if let Some(page) = info.texture_idx.as_mut()
                && *page > idx
            {
                *page -= 1;
            }
        }
        true
    }

    /// Drops all pages together with the glyphs stored on them.
    pub fn clear_pages(&mut self) {
        self.pages.clear();
        self.glyphs.retain(|_, info| info.texture_idx.is_none());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::atlas::AtlasFormat;

    fn cache() -> FontSizeCache {
        FontSizeCache::new(32, 48, 1.0, SizeMetrics::default())
    }

    fn inked(page: usize) -> GlyphInfo {
        GlyphInfo {
            texture_idx: Some(page),
            ..GlyphInfo::EMPTY
        }
    }

    #[test]
    fn test_scale_from_raster_size() {
        let cache = cache();
        assert!((cache.scale() - 32.0 / 48.0).abs() < 1e-6);
        assert!((cache.output_unit() - cache.scale()).abs() < 1e-6);
    }

    #[test]
    fn test_lookup_counts_hits_and_misses() {
        let mut cache = cache();
        assert_eq!(cache.lookup(65), None);
        cache.insert_glyph(65, GlyphInfo::NOT_FOUND);
        assert_eq!(cache.lookup(65), Some(GlyphInfo::NOT_FOUND));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_remove_page_drops_and_shifts_glyphs() {
        let mut cache = cache();
        let allocator = AtlasAllocator::new(16, 16);
        for _ in 0..3 {
            let image = AtlasImage::new(AtlasFormat::Alpha8, 14, 14);
            cache.place(&allocator, &image, 1).unwrap();
        }
        assert_eq!(cache.pages().len(), 3);

        cache.insert_glyph(1, inked(0));
        cache.insert_glyph(2, inked(1));
        cache.insert_glyph(3, inked(2));
        cache.insert_glyph(4, GlyphInfo::EMPTY);

        assert!(cache.remove_page(1));
        assert_eq!(cache.pages().len(), 2);
        assert_eq!(cache.glyph_keys(), vec![1, 3, 4]);
        assert_eq!(cache.glyph(3).unwrap().texture_idx, Some(1));
        assert!(!cache.remove_page(5));
    }

    #[test]
    fn test_kerning_overrides() {
        let mut cache = cache();
        cache.set_kerning((65, 86), Vec2::new(-2.0, 0.0));
        cache.set_kerning((1, 2), Vec2::ZERO);
        assert_eq!(cache.kerning_pairs(), vec![(1, 2), (65, 86)]);
        cache.remove_kerning((65, 86));
        assert_eq!(cache.kerning_override((65, 86)), None);
    }
}
