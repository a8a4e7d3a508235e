//! Bitmap rasterization through `swash`.

use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Transform, Vector};
use swash::{FontRef, Setting};
use verso_core::math::Affine2;
use verso_core::profiling::profile_function;

use super::atlas::{AtlasFormat, AtlasImage};
use super::config::{Antialiasing, Hinting};

/// Inputs for one bitmap glyph.
#[derive(Debug, Clone)]
pub(crate) struct BitmapRequest<'a> {
    pub data: &'a [u8],
    pub face_index: u32,
    pub glyph_id: u16,
    /// Pixels per em, oversampling included.
    pub pixel_size: f32,
    pub hinting: Hinting,
    pub antialiasing: Antialiasing,
    /// Horizontal pen offset in pixels, from the subpixel bucket.
    pub x_shift: f32,
    /// Embolden strength in pixels.
    pub embolden: f32,
    pub transform: Affine2,
    pub variations: &'a [(u32, f32)],
}

/// Rasterized glyph with its placement relative to the pen position.
#[derive(Debug, Clone)]
pub(crate) struct RasterGlyph {
    pub image: AtlasImage,
    /// Pixels from the pen to the left edge.
    pub left: i32,
    /// Pixels from the baseline up to the top edge.
    pub top: i32,
}

fn to_zeno(transform: Affine2) -> Transform {
    let m = transform.matrix2;
    Transform::new(
        m.x_axis.x,
        m.x_axis.y,
        m.y_axis.x,
        m.y_axis.y,
        transform.translation.x,
        transform.translation.y,
    )
}

/// Pen offset in raster pixels for subpixel `bucket` of `steps`.
///
/// Buckets divide an output pixel, which spans `oversampling` raster pixels.
pub(crate) fn subpixel_shift(bucket: u32, steps: u32, oversampling: f32) -> f32 {
    bucket as f32 / steps.max(1) as f32 * oversampling
}

/// Renders `request.glyph_id`. `None` when the font cannot be read or the
/// glyph has no usable source.
pub(crate) fn rasterize(request: &BitmapRequest<'_>) -> Option<RasterGlyph> {
    profile_function!();
    let font = FontRef::from_index(request.data, request.face_index as usize)?;

    let mut context = ScaleContext::new();
    let mut scaler = context
        .builder(font)
        .size(request.pixel_size)
        .hint(request.hinting != Hinting::None)
        .variations(
            request
                .variations
                .iter()
                .map(|&(tag, value)| Setting { tag, value }),
        )
        .build();

    let sources = [
        Source::ColorOutline(0),
        Source::ColorBitmap(StrikeWith::BestFit),
        Source::Outline,
    ];
    let format = match request.antialiasing {
        Antialiasing::Lcd => Format::Subpixel,
        Antialiasing::None | Antialiasing::Gray => Format::Alpha,
    };
    let transform = (request.transform != Affine2::IDENTITY).then(|| to_zeno(request.transform));

    let rendered = Render::new(&sources)
        .format(format)
        .offset(Vector::new(request.x_shift, 0.0))
        .embolden(request.embolden)
        .transform(transform)
        .render(&mut scaler, request.glyph_id)?;

    let width = rendered.placement.width;
    let height = rendered.placement.height;
    let image = match rendered.content {
        Content::Mask => {
            let mut data = rendered.data;
            if request.antialiasing == Antialiasing::None {
                for value in &mut data {
                    *value = if *value >= 128 { 255 } else { 0 };
                }
            }
            AtlasImage::from_data(AtlasFormat::Alpha8, width, height, data).ok()?
        }
        Content::SubpixelMask | Content::Color => {
            AtlasImage::from_data(AtlasFormat::Rgba8, width, height, rendered.data).ok()?
        }
    };

    Some(RasterGlyph {
        image,
        left: rendered.placement.left,
        top: rendered.placement.top,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use verso_test_utils::TestFontBuilder;

    fn request<'a>(data: &'a [u8], glyph_id: u16) -> BitmapRequest<'a> {
        BitmapRequest {
            data,
            face_index: 0,
            glyph_id,
            pixel_size: 20.0,
            hinting: Hinting::None,
            antialiasing: Antialiasing::Gray,
            x_shift: 0.0,
            embolden: 0.0,
            transform: Affine2::IDENTITY,
            variations: &[],
        }
    }

    #[test]
    fn test_box_glyph_covers_expected_area() {
        // Glyph 1 is 'a': ink box 0..500 x 0..500 units, 10x10 px at 20px/em.
        let data = TestFontBuilder::new()
            .glyph_with_box('a', 500, (0, 0, 500, 500))
            .build();
        let glyph = rasterize(&request(&data, 1)).unwrap();

        assert_eq!(glyph.image.format, AtlasFormat::Alpha8);
        assert!(glyph.image.width >= 10 && glyph.image.width <= 11);
        assert!(glyph.image.height >= 10 && glyph.image.height <= 11);
        assert!((10..=11).contains(&glyph.top));
        let inked = glyph.image.data.iter().filter(|&&v| v > 200).count();
        assert!(inked >= 81);
    }

    #[test]
    fn test_no_antialiasing_is_binary() {
        let data = TestFontBuilder::new()
            .glyph_with_box('a', 500, (0, 0, 333, 333))
            .build();
        let mut req = request(&data, 1);
        req.antialiasing = Antialiasing::None;
        let glyph = rasterize(&req).unwrap();

        assert!(glyph.image.data.iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn test_lcd_produces_rgba() {
        let data = TestFontBuilder::new().chars("a", 500).build();
        let mut req = request(&data, 1);
        req.antialiasing = Antialiasing::Lcd;
        let glyph = rasterize(&req).unwrap();

        assert_eq!(glyph.image.format, AtlasFormat::Rgba8);
    }

    #[test]
    fn test_subpixel_shift_follows_oversampling() {
        assert_eq!(subpixel_shift(0, 4, 2.0), 0.0);
        assert_eq!(subpixel_shift(1, 4, 1.0), 0.25);
        assert_eq!(subpixel_shift(2, 4, 2.0), 1.0);
        assert_eq!(subpixel_shift(1, 2, 3.0), 1.5);
    }

    #[test]
    fn test_shift_moves_ink_right() {
        let data = TestFontBuilder::new()
            .glyph_with_box('a', 500, (0, 0, 500, 500))
            .build();
        let plain = rasterize(&request(&data, 1)).unwrap();
        let mut req = request(&data, 1);
        req.x_shift = subpixel_shift(2, 4, 2.0);
        let shifted = rasterize(&req).unwrap();

        // A whole raster pixel keeps the coverage and moves the placement.
        assert_eq!(shifted.left, plain.left + 1);
        assert_eq!(shifted.image.width, plain.image.width);
    }

    #[test]
    fn test_garbage_data_is_none() {
        let data = vec![0u8; 32];
        assert!(rasterize(&request(&data, 1)).is_none());
    }
}
