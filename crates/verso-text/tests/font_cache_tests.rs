//! Glyph cache behaviour through the public font API.

use verso_core::math::Vec2;
use verso_test_utils::{RecordingCanvas, TestFontBuilder, latin_font};
use verso_text::{Color, FallbackTextServer, FontId, FontObject, TextServerConfig};

fn server(config: TextServerConfig) -> (FallbackTextServer, FontId) {
    let server = FallbackTextServer::new(config.with_worker_threads(1));
    let font = server.create_font();
    assert!(server.font_set_data(font, latin_font()));
    (server, font)
}

#[test]
fn test_advance_is_positive_and_stable() {
    let (server, font) = server(TextServerConfig::default());
    let glyph = server.font_glyph_index(font, 'a');
    assert_ne!(glyph, 0);

    let first = server.font_glyph_advance(font, 16, glyph);
    let second = server.font_glyph_advance(font, 16, glyph);
    assert!(first.x > 0.0);
    assert_eq!(first, second);
    assert_eq!(first, Vec2::new(8.0, 0.0));
}

#[test]
fn test_glyph_rasterized_at_most_once() {
    let mut font = FontObject::default();
    font.set_data(latin_font()).unwrap();

    let first = font.ensure_glyph(16, 'a' as u32);
    let pages = font.texture_count(16);
    let second = font.ensure_glyph(16, 'a' as u32);

    assert_eq!(first, second);
    assert_eq!(font.texture_count(16), pages);
    let stats = font.size_cache(16).unwrap().stats();
    assert_eq!(stats.misses, 1);
    assert!(stats.hits >= 1);
    assert_eq!(font.glyph_list(16), vec!['a' as u32]);
}

#[test]
fn test_rendering_options_invalidate_caches() {
    let (server, font) = server(TextServerConfig::default());
    server.font_render_range(font, 16, 'a', 'e');
    server.font_render_range(font, 24, 'a', 'e');
    assert_eq!(server.font_size_cache_list(font), vec![16, 24]);

    // Setting the current value keeps the caches.
    server.font_set_embolden(font, 0.0);
    assert_eq!(server.font_size_cache_list(font).len(), 2);

    server.font_set_embolden(font, 0.5);
    assert!(server.font_size_cache_list(font).is_empty());

    server.font_render_glyph(font, 16, 'a' as u32);
    server.font_set_msdf(font, true);
    assert!(server.font_size_cache_list(font).is_empty());
}

#[test]
fn test_pages_grow_monotonically() {
    let (server, font) = server(TextServerConfig::default().with_atlas_page_sizes(64, 64));

    let mut placed = Vec::new();
    let mut pages = 0;
    for ch in '!'..='~' {
        let glyph = ch as u32;
        server.font_render_glyph(font, 48, glyph);
        let count = server.font_texture_count(font, 48);
        assert!(count >= pages, "page count shrank at {ch:?}");
        pages = count;
        placed.push((
            glyph,
            server.font_glyph_texture_idx(font, 48, glyph),
            server.font_glyph_uv_rect(font, 48, glyph),
        ));
    }
    assert!(pages > 1);

    // Earlier glyphs never move.
    for (glyph, page, uv) in placed {
        assert_eq!(server.font_glyph_texture_idx(font, 48, glyph), page);
        assert_eq!(server.font_glyph_uv_rect(font, 48, glyph), uv);
    }
}

#[test]
fn test_missing_glyph_is_cached_as_not_found() {
    let data = TestFontBuilder::new().chars("ab", 500).build();
    let mut font = FontObject::default();
    font.set_data(data).unwrap();

    let info = font.ensure_glyph(16, 'z' as u32);
    assert!(!info.found);
    assert_eq!(info.texture_idx, None);
    font.ensure_glyph(16, 'z' as u32);
    assert_eq!(font.size_cache(16).unwrap().stats().misses, 1);
}

#[test]
fn test_draw_creates_then_uploads_dirty_pages() {
    let (server, font) = server(TextServerConfig::default());
    let canvas = RecordingCanvas::new();
    let a = server.font_glyph_index(font, 'a');
    let b = server.font_glyph_index(font, 'b');

    server.font_draw_glyph(font, &canvas, 16, Vec2::new(10.0, 20.0), a, Color::WHITE);
    server.font_draw_glyph(font, &canvas, 16, Vec2::new(30.0, 20.0), a, Color::WHITE);
    assert_eq!(canvas.count_texture_creates(), 1);
    assert_eq!(canvas.count_uploads(), 0);
    assert_eq!(canvas.count_draws(), 2);

    // A new glyph lands on the same page, which must be uploaded again.
    server.font_draw_glyph(font, &canvas, 16, Vec2::new(50.0, 20.0), b, Color::WHITE);
    assert_eq!(canvas.count_texture_creates(), 1);
    assert_eq!(canvas.count_uploads(), 1);

    server.font_draw_glyph(font, &canvas, 16, Vec2::new(70.0, 20.0), b, Color::WHITE);
    assert_eq!(canvas.count_uploads(), 1);

    let texture = &canvas.textures()[0];
    assert_eq!(Some(texture.image()), server.font_texture_image(font, 16, 0));
}

#[test]
fn test_draw_places_glyph_relative_to_pen() {
    let (server, font) = server(TextServerConfig::default());
    let canvas = RecordingCanvas::new();
    let a = server.font_glyph_index(font, 'a');

    server.font_draw_glyph(font, &canvas, 16, Vec2::new(0.0, 20.0), a, Color::WHITE);
    server.font_draw_glyph(font, &canvas, 16, Vec2::new(40.0, 20.0), a, Color::WHITE);
    let rects = canvas.draw_rects();
    assert_eq!(rects.len(), 2);
    assert_eq!(rects[1].x - rects[0].x, 40.0);
    assert_eq!(rects[1].y, rects[0].y);
    // The ink sits above the baseline.
    assert!(rects[0].y < 20.0);
}
