//! Shaped text scenarios driven through the server handles.

use indexmap::IndexMap;
use verso_core::math::Vec2;
use verso_test_utils::{RecordingCanvas, latin_font, latin_font_without};
use verso_text::{
    Color, Direction, FallbackTextServer, FontId, GlyphFlags, JustificationFlags, Orientation,
    ShapedTextId, TextServerConfig, TrimFlags, hex_code_box_size,
};

fn server() -> FallbackTextServer {
    verso_core::logging::try_init();
    FallbackTextServer::new(TextServerConfig::default().with_worker_threads(1))
}

fn font(server: &FallbackTextServer, data: Vec<u8>) -> FontId {
    let font = server.create_font();
    assert!(server.font_set_data(font, data));
    font
}

fn text(server: &FallbackTextServer, fonts: &[FontId], content: &str) -> ShapedTextId {
    let shaped = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
    assert!(server.shaped_text_add_string(shaped, content, fonts, 16, IndexMap::new(), "en", None));
    shaped
}

#[test]
fn test_hello_with_missing_e() {
    let server = server();
    let without_e = font(&server, latin_font_without("e"));
    let shaped = text(&server, &[without_e], "Hello");

    let glyphs = server.shaped_text_glyphs(shaped);
    assert_eq!(glyphs.len(), 5);
    assert!(!glyphs[1].flags.contains(GlyphFlags::VALID));
    assert_eq!(glyphs[1].font, None);
    assert!(glyphs.iter().enumerate().all(|(idx, g)| idx == 1 || g.font == Some(without_e)));

    let placeholder = hex_code_box_size(16, 'e' as u32).x;
    assert!(glyphs[1].advance > 0.0);
    assert_eq!(glyphs[1].advance, placeholder);
    assert!((server.shaped_text_width(shaped) - (4.0 * 8.0 + placeholder)).abs() < 1e-3);

    let canvas = RecordingCanvas::new();
    server.shaped_text_draw(shaped, &canvas, Vec2::new(0.0, 20.0), None, Color::WHITE);
    assert_eq!(canvas.count_draws(), 4);
    assert_eq!(canvas.count_hex_boxes(), 1);
}

#[test]
fn test_fallback_chain_fills_missing_glyph() {
    let server = server();
    let without_e = font(&server, latin_font_without("e"));
    let full = font(&server, latin_font());
    let shaped = text(&server, &[without_e, full], "Hello");

    let glyphs = server.shaped_text_glyphs(shaped);
    assert_eq!(glyphs[1].font, Some(full));
    assert!(glyphs.iter().all(|g| g.flags.contains(GlyphFlags::VALID)));
    assert!((server.shaped_text_width(shaped) - 40.0).abs() < 1e-3);
}

#[test]
fn test_language_override_skips_font() {
    let server = server();
    let first = font(&server, latin_font());
    let second = font(&server, latin_font());
    server.font_set_language_support_override(first, "en", false);
    let shaped = text(&server, &[first, second], "ab");

    let glyphs = server.shaped_text_glyphs(shaped);
    assert!(glyphs.iter().all(|g| g.font == Some(second)));
}

#[test]
fn test_substr_matches_parent_range() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "well-known fact here");
    assert!(server.shaped_text_update_breaks(shaped));

    let sub = server.shaped_text_substr(shaped, 0, 10).unwrap();
    let parent_glyphs: Vec<_> = server
        .shaped_text_glyphs(shaped)
        .into_iter()
        .filter(|g| g.end <= 10)
        .collect();
    let sub_glyphs = server.shaped_text_glyphs(sub);
    assert_eq!(sub_glyphs, parent_glyphs);
    // The soft break after the hyphen comes along.
    assert!(sub_glyphs.iter().any(|g| g.is_virtual()));

    let expected: f32 = parent_glyphs.iter().map(|g| g.total_advance()).sum();
    assert!((server.shaped_text_width(sub) - expected).abs() < 1e-3);
    assert_eq!(server.shaped_text_ascent(sub), server.shaped_text_ascent(shaped));

    // A substring of a substring points at the root.
    let nested = server.shaped_text_substr(sub, 5, 10).unwrap();
    assert_eq!(server.shaped_text_parent(nested), Some(shaped));
    assert_eq!(server.shaped_text_glyph_count(nested), 5);

    // Editing a substring detaches it.
    server.shaped_text_set_spacing(sub, verso_text::SpacingType::Glyph, 1.0);
    assert_eq!(server.shaped_text_parent(sub), None);
}

#[test]
fn test_justify_then_trim_round_trip() {
    let server = server();
    let latin = font(&server, latin_font());
    let content = "word ".repeat(10);
    assert_eq!(content.chars().count(), 50);
    let shaped = text(&server, &[latin], &content);

    let natural = server.shaped_text_width(shaped);
    assert!(server.shaped_text_update_breaks(shaped));
    let original = server.shaped_text_glyphs(shaped);
    assert_eq!(original.len(), 50);

    let target = natural * 2.0;
    let achieved = server.shaped_text_fit_to_width(shaped, target, JustificationFlags::WORD_BOUND);
    assert!((achieved - target).abs() < 1e-2);
    assert!(!server.shaped_text_fit_width_minimum_reached(shaped));
    let stretched = server.shaped_text_glyphs(shaped);
    let markers = stretched.iter().filter(|g| g.is_stretch()).count();
    assert_eq!(markers, 9);
    assert_eq!(stretched.len(), 50 + markers);

    server.shaped_text_overrun_trim_to_width(shaped, natural, TrimFlags::TRIM | TrimFlags::ADD_ELLIPSIS);
    let trimmed = server.shaped_text_glyphs(shaped);
    assert_eq!(trimmed, original);
    assert_eq!(server.shaped_text_trim_pos(shaped), None);
    assert_eq!(server.shaped_text_ellipsis_pos(shaped), None);
    assert!((server.shaped_text_width(shaped) - natural).abs() < 1e-3);
}

#[test]
fn test_overrun_trim_respects_width() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "alpha beta gamma delta epsilon");

    for width in [20.0, 57.0, 100.0, 150.0] {
        server.shaped_text_overrun_trim_to_width(
            shaped,
            width,
            TrimFlags::TRIM | TrimFlags::WORD_BOUND | TrimFlags::ADD_ELLIPSIS,
        );
        assert!(server.shaped_text_trimmed_width(shaped) <= width);
        let range = server.shaped_text_range(shaped);
        if let Some(pos) = server.shaped_text_trim_pos(shaped) {
            assert!(pos <= range.end);
        }
        if let Some(pos) = server.shaped_text_ellipsis_pos(shaped) {
            assert!(pos <= range.end);
            assert!(!server.shaped_text_ellipsis_glyphs(shaped).is_empty());
        }
    }
}

#[test]
fn test_trimmed_draw_stops_at_ellipsis() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "abcdefghijkl");
    server.shaped_text_overrun_trim_to_width(shaped, 80.0, TrimFlags::TRIM | TrimFlags::ADD_ELLIPSIS);

    let canvas = RecordingCanvas::new();
    server.shaped_text_draw(shaped, &canvas, Vec2::new(0.0, 20.0), None, Color::WHITE);
    // Seven letters and three dots.
    assert_eq!(canvas.count_draws(), 10);
}

#[test]
fn test_clipped_draw_skips_outside_glyphs() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "abcdefgh");

    let canvas = RecordingCanvas::new();
    server.shaped_text_draw(shaped, &canvas, Vec2::new(0.0, 20.0), Some((20.0, 36.0)), Color::WHITE);
    // Glyphs at 16, 24 and 32 overlap 20..36.
    assert_eq!(canvas.count_draws(), 3);
}

#[test]
fn test_inline_object_layout() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "ab");
    assert!(server.shaped_text_add_object(
        shaped,
        1,
        Vec2::new(20.0, 30.0),
        verso_text::InlineAlign::Baseline,
        1
    ));
    server.shaped_text_add_string(shaped, "c", &[latin], 16, IndexMap::new(), "en", None);

    assert!((server.shaped_text_width(shaped) - 44.0).abs() < 1e-3);
    let rect = server.shaped_text_object_rect(shaped, 1).unwrap();
    assert_eq!(rect.x, 16.0);
    assert_eq!(rect.y, -30.0);
    assert!(server.shaped_text_ascent(shaped) >= 30.0);
    assert_eq!(server.shaped_text_object_range(shaped, 1), Some(2..3));

    assert!(server.shaped_text_resize_object(shaped, 1, Vec2::new(10.0, 10.0), verso_text::InlineAlign::Baseline));
    assert!((server.shaped_text_width(shaped) - 34.0).abs() < 1e-3);
}

#[test]
fn test_trim_holds_across_later_stages() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "ab-cdefghijklmno");

    server.shaped_text_overrun_trim_to_width(shaped, 80.0, TrimFlags::TRIM);
    let real = |glyphs: Vec<verso_text::Glyph>| glyphs.into_iter().filter(|g| !g.is_virtual()).count();
    assert_eq!(real(server.shaped_text_visible_glyphs(shaped)), 10);

    // Break markers shift glyph indices; the cut moves with them.
    assert!(server.shaped_text_update_breaks(shaped));
    assert_eq!(real(server.shaped_text_visible_glyphs(shaped)), 10);
    assert_eq!(server.shaped_text_trimmed_width(shaped), 80.0);
    let canvas = RecordingCanvas::new();
    server.shaped_text_draw(shaped, &canvas, Vec2::new(0.0, 20.0), None, Color::WHITE);
    assert_eq!(canvas.count_draws(), 10);

    // Fitting changes advances, so the old cut no longer applies.
    let shaped = text(&server, &[latin], "aaaa bbbb cccc dddd");
    server.shaped_text_overrun_trim_to_width(shaped, 100.0, TrimFlags::TRIM);
    assert!(server.shaped_text_trim_pos(shaped).is_some());
    let fitted = server.shaped_text_fit_to_width(shaped, 300.0, JustificationFlags::WORD_BOUND);
    assert_eq!(server.shaped_text_trim_pos(shaped), None);
    assert_eq!(server.shaped_text_trimmed_width(shaped), fitted);

    server.shaped_text_overrun_trim_to_width(shaped, 100.0, TrimFlags::TRIM);
    assert!(server.shaped_text_trimmed_width(shaped) <= 100.0);
    let visible: f32 = server
        .shaped_text_visible_glyphs(shaped)
        .iter()
        .map(|g| g.total_advance())
        .sum();
    assert!(visible <= 100.0);
}

#[test]
fn test_edge_space_trim_is_reverted_by_next_fit() {
    let server = server();
    let latin = font(&server, latin_font());
    let shaped = text(&server, &[latin], "  one two  ");
    let natural = server.shaped_text_width(shaped);

    let trimmed = server.shaped_text_fit_to_width(shaped, 0.0, JustificationFlags::TRIM_EDGE_SPACES);
    assert!((trimmed - (natural - 16.0)).abs() < 1e-3);

    let width = server.shaped_text_fit_to_width(shaped, natural, JustificationFlags::WORD_BOUND);
    assert!((width - natural).abs() < 1e-3);
    assert!((server.shaped_text_width(shaped) - natural).abs() < 1e-3);
}
