use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use verso_core::TaskPool;
use verso_core::alloc::sparse_set::SparseSet;

use super::{ServerFeatures, TextServer};
use crate::config::{TextServerConfig, sanitize_oversampling};
use crate::font::{FontObject, RasterContext};
use crate::handle::{FontId, ShapedTextId};
use crate::shaped::{Direction, FontSet, Orientation, ShapedTextBuffer};

/// Text server tier without shaping, bidi reordering or support data.
///
/// Fonts and shaped buffers live in generation-checked tables behind a
/// short-held registry lock; each object carries its own mutex. A buffer
/// lock may be held while fonts are locked, never the other way round.
pub struct FallbackTextServer {
    pub(super) config: TextServerConfig,
    pool: Arc<TaskPool>,
    global_oversampling: Mutex<f32>,
    pub(super) fonts: RwLock<SparseSet<Arc<Mutex<FontObject>>>>,
    pub(super) shaped: RwLock<SparseSet<Arc<Mutex<ShapedTextBuffer>>>>,
}

impl FallbackTextServer {
    pub fn new(mut config: TextServerConfig) -> Self {
        config.worker_threads = config.worker_threads.max(1);
        tracing::info!(
            "Creating fallback text server ({} worker threads)",
            config.worker_threads
        );
        let pool = Arc::new(TaskPool::new(config.worker_threads));
        Self {
            global_oversampling: Mutex::new(config.global_oversampling),
            config,
            pool,
            fonts: RwLock::new(SparseSet::new()),
            shaped: RwLock::new(SparseSet::new()),
        }
    }

    pub fn config(&self) -> &TextServerConfig {
        &self.config
    }

    pub fn create_font(&self) -> FontId {
        let mut context = RasterContext::from_config(&self.config, Some(self.pool.clone()));
        // Held until the font is registered so a concurrent global change reaches it.
        let global = self.global_oversampling.lock();
        context.global_oversampling = *global;
        let font = FontObject::new(context);
        let slot = self.fonts.write().push(Arc::new(Mutex::new(font)));
        drop(global);
        FontId::from_slot(slot)
    }

    pub fn free_font(&self, font: FontId) -> bool {
        self.fonts.write().try_remove(font.slot()).is_some()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.read().len()
    }

    pub fn create_shaped_text(&self, direction: Direction, orientation: Orientation) -> ShapedTextId {
        let buffer = ShapedTextBuffer::new(direction, orientation);
        ShapedTextId::from_slot(self.shaped.write().push(Arc::new(Mutex::new(buffer))))
    }

    pub fn free_shaped_text(&self, shaped: ShapedTextId) -> bool {
        self.shaped.write().try_remove(shaped.slot()).is_some()
    }

    pub fn shaped_text_count(&self) -> usize {
        self.shaped.read().len()
    }

    pub fn global_oversampling(&self) -> f32 {
        *self.global_oversampling.lock()
    }

    /// Sets the server-wide oversampling. Fonts without their own value
    /// drop their caches.
    pub fn set_global_oversampling(&self, oversampling: f32) {
        let oversampling = sanitize_oversampling(oversampling);
        {
            let mut current = self.global_oversampling.lock();
            if *current == oversampling {
                return;
            }
            *current = oversampling;
        }
        let fonts: Vec<_> = self.fonts.read().values().cloned().collect();
        for font in fonts {
            font.lock().set_global_oversampling(oversampling);
        }
    }

    pub(super) fn font(&self, font: FontId) -> Option<Arc<Mutex<FontObject>>> {
        self.fonts.read().try_get(font.slot()).cloned()
    }

    pub(super) fn with_font<R>(&self, font: FontId, f: impl FnOnce(&mut FontObject) -> R) -> Option<R> {
        let font = self.font(font)?;
        let mut guard = font.lock();
        Some(f(&mut guard))
    }

    pub(super) fn buffer(&self, shaped: ShapedTextId) -> Option<Arc<Mutex<ShapedTextBuffer>>> {
        self.shaped.read().try_get(shaped.slot()).cloned()
    }

    /// Fonts referenced by `buffer`, resolved while the registry lock is held
    /// only for the lookup. Freed fonts are simply missing.
    fn font_set(&self, buffer: &ShapedTextBuffer) -> FontSet {
        let fonts = self.fonts.read();
        buffer
            .referenced_fonts()
            .into_iter()
            .filter_map(|id| fonts.try_get(id.slot()).map(|font| (id, font.clone())))
            .collect()
    }

    /// Runs `f` with the locked buffer and the fonts its spans reference.
    pub(super) fn with_shaped<R>(
        &self,
        shaped: ShapedTextId,
        f: impl FnOnce(&mut ShapedTextBuffer, &FontSet) -> R,
    ) -> Option<R> {
        let buffer = self.buffer(shaped)?;
        let mut guard = buffer.lock();
        let fonts = self.font_set(&guard);
        Some(f(&mut guard, &fonts))
    }
}

impl Default for FallbackTextServer {
    fn default() -> Self {
        Self::new(TextServerConfig::default())
    }
}

impl std::fmt::Debug for FallbackTextServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackTextServer")
            .field("fonts", &self.font_count())
            .field("shaped_texts", &self.shaped_text_count())
            .field("global_oversampling", &self.global_oversampling())
            .finish()
    }
}

impl TextServer for FallbackTextServer {
    fn name(&self) -> &str {
        "Fallback"
    }

    fn features(&self) -> ServerFeatures {
        ServerFeatures::SIMPLE_LAYOUT
            | ServerFeatures::FONT_DYNAMIC
            | ServerFeatures::FONT_MSDF
            | ServerFeatures::FONT_VARIABLE
    }

    fn load_support_data(&self, path: &Path) -> bool {
        tracing::debug!("Support data not used, ignoring {}", path.display());
        false
    }

    fn save_support_data(&self, path: &Path) -> bool {
        tracing::debug!("Support data not used, not writing {}", path.display());
        false
    }

    fn support_data_filename(&self) -> String {
        String::new()
    }

    fn support_data_info(&self) -> String {
        "Not supported".to_string()
    }
}

#[cfg(test)]
mod tests {
    use verso_test_utils::latin_font;

    use super::*;

    fn server() -> FallbackTextServer {
        FallbackTextServer::new(TextServerConfig::default().with_worker_threads(1))
    }

    #[test]
    fn test_freed_handles_are_stale() {
        let server = server();
        let font = server.create_font();
        assert!(server.free_font(font));
        assert!(!server.free_font(font));

        let reused = server.create_font();
        assert_ne!(font, reused);
        assert!(server.font(font).is_none());
        assert!(server.font(reused).is_some());
    }

    #[test]
    fn test_global_oversampling_reaches_fonts() {
        let server = server();
        let font = server.create_font();
        server.with_font(font, |font| font.set_data(latin_font()).unwrap());
        server.with_font(font, |font| font.ensure_size(16).is_some());
        assert_eq!(server.with_font(font, |font| font.size_cache_list()), Some(vec![16]));

        server.set_global_oversampling(2.0);
        assert_eq!(server.global_oversampling(), 2.0);
        assert_eq!(server.with_font(font, |font| font.size_cache_list()), Some(vec![]));

        server.set_global_oversampling(f32::NAN);
        assert_eq!(server.global_oversampling(), 1.0);
    }

    #[test]
    fn test_zero_worker_threads_is_clamped() {
        let config = TextServerConfig {
            worker_threads: 0,
            ..TextServerConfig::default()
        };
        let server = FallbackTextServer::new(config);
        assert_eq!(server.config().worker_threads, 1);
    }

    #[test]
    fn test_fonts_created_during_global_change_follow_it() {
        let server = Arc::new(server());
        let creator = {
            let server = server.clone();
            std::thread::spawn(move || (0..64).map(|_| server.create_font()).collect::<Vec<_>>())
        };
        for step in 0..64 {
            server.set_global_oversampling(1.0 + (step % 3) as f32);
        }
        let fonts = creator.join().unwrap();
        let global = server.global_oversampling();

        for font in fonts {
            let oversampling = server.with_font(font, |font| {
                font.set_data(latin_font()).unwrap();
                font.ensure_size(16).map(|cache| cache.oversampling())
            });
            assert_eq!(oversampling, Some(Some(global)));
        }
    }

    #[test]
    fn test_font_set_skips_freed_fonts() {
        let server = server();
        let kept = server.create_font();
        let freed = server.create_font();
        let shaped = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
        server.with_shaped(shaped, |buffer, _| {
            buffer.add_string("ab", &[kept, freed], 16, Default::default(), "en", None)
        });
        server.free_font(freed);

        let len = server.with_shaped(shaped, |_, fonts| fonts.len());
        assert_eq!(len, Some(1));
    }
}
