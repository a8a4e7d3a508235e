//! Recording implementation of the glyph canvas.
//!
//! Textures and draws never touch a GPU; every call is appended to a shared
//! log so tests can assert on uploads and draw order.

use std::sync::Arc;

use parking_lot::Mutex;
use verso_core::geometry::Rect;
use verso_core::math::Vec2;
use verso_text::texture::{Color, GlyphCanvas, GlyphTexture, MsdfDrawParams};
use verso_text::AtlasImage;

/// A canvas or texture operation recorded for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasCall {
    CreateTexture {
        texture_id: usize,
        width: u32,
        height: u32,
    },
    Upload {
        texture_id: usize,
    },
    DrawRegion {
        texture_id: usize,
        dest: Rect<f32>,
        source: Rect<f32>,
        color: Color,
        msdf: Option<MsdfDrawParams>,
    },
    DrawHexBox {
        size: u32,
        pos: Vec2,
        codepoint: u32,
    },
}

type CallLog = Arc<Mutex<Vec<CanvasCall>>>;

/// Texture handed out by [`RecordingCanvas`]. Keeps the last uploaded image.
#[derive(Debug)]
pub struct MockTexture {
    id: usize,
    size: (u32, u32),
    image: Mutex<AtlasImage>,
    calls: CallLog,
}

impl MockTexture {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Copy of the image this texture currently holds.
    pub fn image(&self) -> AtlasImage {
        self.image.lock().clone()
    }
}

impl GlyphTexture for MockTexture {
    fn upload(&self, image: &AtlasImage) {
        *self.image.lock() = image.clone();
        self.calls.lock().push(CanvasCall::Upload { texture_id: self.id });
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Canvas that records every call instead of drawing.
///
/// # Example
///
/// ```
/// use verso_test_utils::RecordingCanvas;
///
/// let canvas = RecordingCanvas::new();
/// assert_eq!(canvas.count_draws(), 0);
/// assert!(canvas.textures().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    calls: CallLog,
    textures: Mutex<Vec<Arc<MockTexture>>>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded calls, oldest first.
    pub fn calls(&self) -> Vec<CanvasCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn textures(&self) -> Vec<Arc<MockTexture>> {
        self.textures.lock().clone()
    }

    pub fn count_texture_creates(&self) -> usize {
        self.count(|call| matches!(call, CanvasCall::CreateTexture { .. }))
    }

    pub fn count_uploads(&self) -> usize {
        self.count(|call| matches!(call, CanvasCall::Upload { .. }))
    }

    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, CanvasCall::DrawRegion { .. }))
    }

    pub fn count_hex_boxes(&self) -> usize {
        self.count(|call| matches!(call, CanvasCall::DrawHexBox { .. }))
    }

    /// Destination rectangles of all region draws, in draw order.
    pub fn draw_rects(&self) -> Vec<Rect<f32>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CanvasCall::DrawRegion { dest, .. } => Some(*dest),
                _ => None,
            })
            .collect()
    }

    fn count(&self, filter: impl Fn(&CanvasCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| filter(call)).count()
    }

    fn texture_id(&self, texture: &Arc<dyn GlyphTexture>) -> usize {
        let target = Arc::as_ptr(texture) as *const ();
        self.textures
            .lock()
            .iter()
            .find(|mock| Arc::as_ptr(mock) as *const () == target)
            .map_or(usize::MAX, |mock| mock.id)
    }
}

impl GlyphCanvas for RecordingCanvas {
    fn create_texture(&self, image: &AtlasImage) -> Arc<dyn GlyphTexture> {
        let mut textures = self.textures.lock();
        let texture = Arc::new(MockTexture {
            id: textures.len(),
            size: (image.width, image.height),
            image: Mutex::new(image.clone()),
            calls: self.calls.clone(),
        });
        textures.push(texture.clone());
        self.calls.lock().push(CanvasCall::CreateTexture {
            texture_id: texture.id,
            width: image.width,
            height: image.height,
        });
        texture
    }

    fn draw_texture_rect_region(
        &self,
        texture: &Arc<dyn GlyphTexture>,
        dest: Rect<f32>,
        source: Rect<f32>,
        modulate: Color,
        msdf: Option<MsdfDrawParams>,
    ) {
        let texture_id = self.texture_id(texture);
        self.calls.lock().push(CanvasCall::DrawRegion {
            texture_id,
            dest,
            source,
            color: modulate,
            msdf,
        });
    }

    fn draw_hex_code_box(&self, size: u32, pos: Vec2, codepoint: u32, _color: Color) {
        self.calls.lock().push(CanvasCall::DrawHexBox {
            size,
            pos,
            codepoint,
        });
    }
}
