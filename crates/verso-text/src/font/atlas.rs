//! Shelf packing of glyph images into growable atlas pages.
//!
//! Each page keeps a list of shelves (rows). A shelf accepts images whose
//! padded height rounds up to the shelf's height bucket, packed left to
//! right. Pages are scanned in allocation order and only accept images of
//! their own pixel format; when nothing fits a new page is appended.

use std::sync::Arc;

use verso_core::math::next_power_of_two;
use verso_core::profiling::profile_function;

use crate::error::{TextError, TextResult};
use crate::texture::GlyphTexture;

/// Shelf heights are rounded up to a multiple of this.
const SHELF_STEP: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtlasFormat {
    /// One coverage byte per pixel.
    Alpha8,
    /// Four bytes per pixel: LCD coverage, color glyphs, or distance fields.
    Rgba8,
}

impl AtlasFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            AtlasFormat::Alpha8 => 1,
            AtlasFormat::Rgba8 => 4,
        }
    }
}

/// Owned pixel buffer, rows top to bottom without padding.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasImage {
    pub format: AtlasFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl AtlasImage {
    pub fn new(format: AtlasFormat, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            format,
            width,
            height,
            data: vec![0; len],
        }
    }

    pub fn from_data(format: AtlasFormat, width: u32, height: u32, data: Vec<u8>) -> TextResult<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(TextError::ImageDataSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            format,
            width,
            height,
            data,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        &self.data[start..start + bpp]
    }

    /// Copies `src` with its top-left corner at `(x, y)`, clipping at the edges.
    pub fn blit(&mut self, src: &AtlasImage, x: u32, y: u32) -> TextResult<()> {
        if src.format != self.format {
            return Err(TextError::FormatMismatch);
        }
        let bpp = self.format.bytes_per_pixel();
        let copy_w = src.width.min(self.width.saturating_sub(x)) as usize;
        let copy_h = src.height.min(self.height.saturating_sub(y));
        for row in 0..copy_h {
            let src_start = row as usize * src.width as usize * bpp;
            let dst_start = ((y + row) as usize * self.width as usize + x as usize) * bpp;
            self.data[dst_start..dst_start + copy_w * bpp]
                .copy_from_slice(&src.data[src_start..src_start + copy_w * bpp]);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

/// One texture page of a size cache.
#[derive(Debug)]
pub struct AtlasPage {
    image: AtlasImage,
    shelves: Vec<Shelf>,
    next_shelf_y: u32,
    texture: Option<Arc<dyn GlyphTexture>>,
    dirty: bool,
}

impl AtlasPage {
    pub fn new(format: AtlasFormat, size: u32) -> Self {
        Self {
            image: AtlasImage::new(format, size, size),
            shelves: Vec::new(),
            next_shelf_y: 0,
            texture: None,
            dirty: true,
        }
    }

    /// Page holding a caller-provided image. It receives no further glyphs.
    pub fn from_image(image: AtlasImage) -> Self {
        let next_shelf_y = image.height;
        Self {
            image,
            shelves: Vec::new(),
            next_shelf_y,
            texture: None,
            dirty: true,
        }
    }

    pub fn image(&self) -> &AtlasImage {
        &self.image
    }

    pub fn format(&self) -> AtlasFormat {
        self.image.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    /// True when the pixels changed since the last upload.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn texture(&self) -> Option<&Arc<dyn GlyphTexture>> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Arc<dyn GlyphTexture>) {
        self.texture = Some(texture);
        self.dirty = false;
    }

    /// Marks the page as uploaded.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn try_reserve(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let bucket = height.div_ceil(SHELF_STEP) * SHELF_STEP;
        let page_width = self.image.width;

        if let Some(shelf) = self
            .shelves
            .iter_mut()
            .find(|shelf| shelf.height == bucket && shelf.cursor_x + width <= page_width)
        {
            let x = shelf.cursor_x;
            shelf.cursor_x += width;
            return Some((x, shelf.y));
        }

        if width <= page_width && self.next_shelf_y + bucket <= self.image.height {
            let y = self.next_shelf_y;
            self.shelves.push(Shelf {
                y,
                height: bucket,
                cursor_x: width,
            });
            self.next_shelf_y += bucket;
            return Some((0, y));
        }

        None
    }
}

/// Where a glyph image landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasPlacement {
    pub page: usize,
    /// Top-left of the reserved slot, including the margin.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Page sizing policy plus the packing routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasAllocator {
    pub min_page_size: u32,
    pub max_page_size: u32,
}

impl Default for AtlasAllocator {
    fn default() -> Self {
        Self {
            min_page_size: 256,
            max_page_size: 1024,
        }
    }
}

impl AtlasAllocator {
    pub fn new(min_page_size: u32, max_page_size: u32) -> Self {
        Self {
            min_page_size,
            max_page_size: max_page_size.max(min_page_size),
        }
    }

    /// Side length of a new page for glyphs rasterized at `raster_size` pixels
    /// that must hold a `width` x `height` slot.
    pub fn page_size_for(&self, raster_size: f32, width: u32, height: u32) -> u32 {
        let wanted = ((raster_size * 8.0).ceil() as u32).max(self.min_page_size);
        let mut side = next_power_of_two(wanted).min(self.max_page_size);
        while side < width.max(height) {
            side *= 2;
        }
        side
    }

    /// Packs `image` surrounded by `margin` transparent pixels and blits it.
    ///
    /// Marks the receiving page dirty; uploading is the caller's job.
    pub fn place(
        &self,
        pages: &mut Vec<AtlasPage>,
        image: &AtlasImage,
        margin: u32,
        raster_size: f32,
    ) -> TextResult<AtlasPlacement> {
        profile_function!();
        let width = image.width + margin * 2;
        let height = image.height + margin * 2;

        let found = pages.iter_mut().enumerate().find_map(|(idx, page)| {
            if page.format() != image.format {
                return None;
            }
            page.try_reserve(width, height).map(|(x, y)| (idx, x, y))
        });

        let (page_idx, x, y) = match found {
            Some(found) => found,
            None => {
                let side = self.page_size_for(raster_size, width, height);
                let mut page = AtlasPage::new(image.format, side);
                let (x, y) = page.try_reserve(width, height).ok_or(TextError::GlyphTooLarge {
                    width,
                    height,
                    max_size: side,
                })?;
                tracing::trace!(
                    "atlas page {} allocated ({}x{}, {:?})",
                    pages.len(),
                    side,
                    side,
                    image.format
                );
                pages.push(page);
                (pages.len() - 1, x, y)
            }
        };

        let page = &mut pages[page_idx];
        page.image.blit(image, x + margin, y + margin)?;
        page.dirty = true;

        Ok(AtlasPlacement {
            page: page_idx,
            x,
            y,
            width,
            height,
        })
    }
}
