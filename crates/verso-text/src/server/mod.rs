//! Text server capability surface.
//!
//! [`TextServer`] covers what every server tier answers: identification,
//! feature flags, support data and the string utilities. The handle-based
//! font and shaped-text API lives on the concrete [`FallbackTextServer`].

mod fallback;
mod font_ops;
mod shaped_ops;

use std::ops::Range;
use std::path::Path;

use bitflags::bitflags;
use unicode_segmentation::UnicodeSegmentation;

use crate::feature_tags;

pub use fallback::FallbackTextServer;

bitflags! {
    /// Optional capabilities a server tier may provide.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ServerFeatures: u32 {
        const SIMPLE_LAYOUT = 1 << 0;
        const BIDI_LAYOUT = 1 << 1;
        const VERTICAL_LAYOUT = 1 << 2;
        const SHAPING = 1 << 3;
        const KASHIDA_JUSTIFICATION = 1 << 4;
        const BREAK_ITERATORS = 1 << 5;
        const FONT_BITMAP = 1 << 6;
        const FONT_DYNAMIC = 1 << 7;
        const FONT_MSDF = 1 << 8;
        const FONT_SYSTEM = 1 << 9;
        const FONT_VARIABLE = 1 << 10;
        const CONTEXT_SENSITIVE_CASE_CONVERSION = 1 << 11;
        const USE_SUPPORT_DATA = 1 << 12;
        const UNICODE_IDENTIFIERS = 1 << 13;
        const UNICODE_SECURITY = 1 << 14;
    }
}

/// Languages written right to left.
const RTL_LANGUAGES: &[&str] = &["ar", "dv", "he", "fa", "ff", "ku", "ur"];

pub trait TextServer: Send + Sync {
    fn name(&self) -> &str;

    fn features(&self) -> ServerFeatures;

    fn has_feature(&self, feature: ServerFeatures) -> bool {
        self.features().contains(feature)
    }

    fn name_to_tag(&self, name: &str) -> u32 {
        feature_tags::name_to_tag(name)
    }

    fn tag_to_name(&self, tag: u32) -> String {
        feature_tags::tag_to_name(tag)
    }

    /// Loads ICU-style support data. Returns false when nothing was loaded.
    fn load_support_data(&self, path: &Path) -> bool;

    fn save_support_data(&self, path: &Path) -> bool;

    fn support_data_filename(&self) -> String;

    fn support_data_info(&self) -> String;

    /// True when the language part of `locale` is written right to left.
    fn is_locale_right_to_left(&self, locale: &str) -> bool {
        let language = locale.split(['_', '-']).next().unwrap_or_default();
        RTL_LANGUAGES
            .iter()
            .any(|rtl| rtl.eq_ignore_ascii_case(language))
    }

    /// Character ranges of the words in `text`.
    ///
    /// Whitespace and punctuation separate words and are never part of one.
    fn string_get_word_breaks(&self, text: &str, language: &str) -> Vec<Range<usize>> {
        let _ = language;
        let mut breaks = Vec::new();
        let mut char_pos = 0;
        let mut byte_pos = 0;
        for (offset, segment) in text.split_word_bound_indices() {
            char_pos += text[byte_pos..offset].chars().count();
            byte_pos = offset;
            let len = segment.chars().count();
            if segment.chars().any(char::is_alphanumeric) {
                breaks.push(char_pos..char_pos + len);
            }
        }
        breaks
    }

    fn string_to_upper(&self, text: &str, language: &str) -> String {
        let _ = language;
        text.to_uppercase()
    }

    fn string_to_lower(&self, text: &str, language: &str) -> String {
        let _ = language;
        text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextServerConfig;

    fn server() -> FallbackTextServer {
        FallbackTextServer::new(TextServerConfig::default().with_worker_threads(1))
    }

    #[test]
    fn test_fallback_features() {
        let server = server();
        assert!(server.has_feature(ServerFeatures::SIMPLE_LAYOUT));
        assert!(server.has_feature(ServerFeatures::FONT_MSDF | ServerFeatures::FONT_VARIABLE));
        assert!(!server.has_feature(ServerFeatures::SHAPING));
        assert!(!server.has_feature(ServerFeatures::USE_SUPPORT_DATA));
    }

    #[test]
    fn test_rtl_locales() {
        let server = server();
        assert!(server.is_locale_right_to_left("ar"));
        assert!(server.is_locale_right_to_left("he_IL"));
        assert!(server.is_locale_right_to_left("fa-IR"));
        assert!(!server.is_locale_right_to_left("en_US"));
        assert!(!server.is_locale_right_to_left(""));
    }

    #[test]
    fn test_word_breaks_use_char_offsets() {
        let server = server();
        let breaks = server.string_get_word_breaks("héllo, wörld!  ok", "en");
        assert_eq!(breaks, vec![0..5, 7..12, 15..17]);
    }

    #[test]
    fn test_case_conversion() {
        let server = server();
        assert_eq!(server.string_to_upper("straße", "de"), "STRASSE");
        assert_eq!(server.string_to_lower("ÀB", "fr"), "àb");
    }
}
