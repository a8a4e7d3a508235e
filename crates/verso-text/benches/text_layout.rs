use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use indexmap::IndexMap;
use verso_test_utils::latin_font;
use verso_text::{
    Direction, FallbackTextServer, FontId, JustificationFlags, Orientation, TextServerConfig,
    TrimFlags,
};

const SAMPLE: &str = "The quick brown fox jumps over the lazy dog. ";

fn setup() -> (FallbackTextServer, FontId) {
    let server = FallbackTextServer::new(TextServerConfig::default());
    let font = server.create_font();
    server.font_set_data(font, latin_font());
    (server, font)
}

fn bench_shape(c: &mut Criterion) {
    let (server, font) = setup();
    // Warm the glyph cache so the loop measures layout only.
    server.font_render_range(font, 16, ' ', '~');

    let mut group = c.benchmark_group("shape");
    for repeats in [1usize, 10, 100] {
        let text = SAMPLE.repeat(repeats);
        group.throughput(Throughput::Elements(text.chars().count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &text, |b, text| {
            b.iter(|| {
                let shaped = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
                server.shaped_text_add_string(shaped, black_box(text), &[font], 16, IndexMap::new(), "en", None);
                let width = server.shaped_text_width(shaped);
                server.free_shaped_text(shaped);
                width
            });
        });
    }
    group.finish();
}

fn bench_justify_and_trim(c: &mut Criterion) {
    let (server, font) = setup();
    let text = SAMPLE.repeat(10);

    c.bench_function("justify_then_trim", |b| {
        b.iter(|| {
            let shaped = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
            server.shaped_text_add_string(shaped, &text, &[font], 16, IndexMap::new(), "en", None);
            let natural = server.shaped_text_width(shaped);
            server.shaped_text_fit_to_width(shaped, natural * 1.5, JustificationFlags::WORD_BOUND);
            server.shaped_text_overrun_trim_to_width(
                shaped,
                black_box(natural * 0.5),
                TrimFlags::TRIM | TrimFlags::WORD_BOUND | TrimFlags::ADD_ELLIPSIS,
            );
            let width = server.shaped_text_trimmed_width(shaped);
            server.free_shaped_text(shaped);
            width
        });
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    for (name, msdf) in [("bitmap", false), ("msdf", true)] {
        group.bench_function(name, |b| {
            let (server, font) = setup();
            server.font_set_msdf(font, msdf);
            b.iter(|| {
                server.font_clear_size_cache(font);
                server.font_render_range(font, black_box(32), 'A', 'Z');
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_shape, bench_justify_and_trim, bench_rasterize);
criterion_main!(benches);
