//! Server-wide configuration.

use verso_core::TaskPool;

/// Configuration for [`FallbackTextServer`](crate::server::FallbackTextServer).
///
/// # Example
///
/// ```
/// use verso_text::TextServerConfig;
///
/// let config = TextServerConfig::default()
///     .with_worker_threads(2)
///     .with_global_oversampling(2.0);
/// assert_eq!(config.worker_threads, 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TextServerConfig {
    /// Threads in the pool used for distance-field generation.
    pub worker_threads: usize,
    /// Distance fields with at least this many pixels are split across the pool.
    pub msdf_parallel_threshold: u32,
    /// Smallest side of a newly allocated atlas page.
    pub atlas_min_page_size: u32,
    /// Largest side of a newly allocated bitmap page, unless a single glyph needs more.
    pub atlas_max_page_size: u32,
    /// Largest side of a newly allocated distance-field page.
    pub msdf_max_page_size: u32,
    /// Oversampling used by fonts whose own oversampling is 0.
    pub global_oversampling: f32,
    /// Language assumed for spans that do not name one.
    pub default_language: String,
}

impl Default for TextServerConfig {
    fn default() -> Self {
        Self {
            worker_threads: TaskPool::default_thread_count(),
            msdf_parallel_threshold: 64 * 64,
            atlas_min_page_size: 256,
            atlas_max_page_size: 1024,
            msdf_max_page_size: 2048,
            global_oversampling: 1.0,
            default_language: default_language(),
        }
    }
}

impl TextServerConfig {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_msdf_parallel_threshold(mut self, pixels: u32) -> Self {
        self.msdf_parallel_threshold = pixels;
        self
    }

    pub fn with_atlas_page_sizes(mut self, min: u32, max: u32) -> Self {
        self.atlas_min_page_size = min.max(1);
        self.atlas_max_page_size = max.max(self.atlas_min_page_size);
        self
    }

    pub fn with_msdf_max_page_size(mut self, max: u32) -> Self {
        self.msdf_max_page_size = max.max(self.atlas_min_page_size);
        self
    }

    pub fn with_global_oversampling(mut self, oversampling: f32) -> Self {
        self.global_oversampling = sanitize_oversampling(oversampling);
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }
}

pub(crate) fn sanitize_oversampling(oversampling: f32) -> f32 {
    if oversampling.is_finite() && oversampling > 0.0 {
        oversampling
    } else {
        1.0
    }
}

/// Language part of the system locale, `"en"` when unknown.
fn default_language() -> String {
    sys_locale::get_locale()
        .and_then(|locale| {
            locale
                .split(['-', '_'])
                .next()
                .filter(|lang| !lang.is_empty())
                .map(str::to_ascii_lowercase)
        })
        .unwrap_or_else(|| "en".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TextServerConfig::default();
        assert!(config.worker_threads >= 1);
        assert_eq!(config.atlas_max_page_size, 1024);
        assert_eq!(config.global_oversampling, 1.0);
        assert!(!config.default_language.is_empty());
    }

    #[test]
    fn test_builder_clamps() {
        let config = TextServerConfig::default()
            .with_worker_threads(0)
            .with_atlas_page_sizes(512, 128)
            .with_global_oversampling(-3.0);
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.atlas_max_page_size, 512);
        assert_eq!(config.global_oversampling, 1.0);
    }
}
