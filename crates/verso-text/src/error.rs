/// Errors that can occur in the text server.
///
/// Most server entry points turn these into sentinel values after logging;
/// the typed error is visible when driving [`FontObject`](crate::font::FontObject)
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub enum TextError {
    /// The bytes could not be parsed as a font.
    InvalidFontData(String),

    /// The requested face does not exist in the font collection.
    FaceIndexOutOfRange { index: u32, face_count: u32 },

    /// The font has no data loaded yet.
    NoFontData,

    /// A glyph image does not fit the maximum atlas page size.
    GlyphTooLarge {
        width: u32,
        height: u32,
        max_size: u32,
    },

    /// An image was handed to a page of another pixel format.
    FormatMismatch,

    /// Pixel data length does not match the image size and format.
    ImageDataSize { expected: usize, actual: usize },

    /// Invalid text range.
    InvalidRange {
        start: usize,
        end: usize,
        text_len: usize,
    },

    /// Embedded object key is already used by the buffer.
    DuplicateObject,

    /// Generic IO error.
    Io(String),
}

impl std::fmt::Display for TextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextError::InvalidFontData(msg) => write!(f, "Invalid font data: {}", msg),
            TextError::FaceIndexOutOfRange { index, face_count } => write!(
                f,
                "Face index {} out of range (font has {} faces)",
                index, face_count
            ),
            TextError::NoFontData => write!(f, "Font has no data"),
            TextError::GlyphTooLarge {
                width,
                height,
                max_size,
            } => write!(
                f,
                "Glyph image {}x{} exceeds the maximum page size {}",
                width, height, max_size
            ),
            TextError::FormatMismatch => write!(f, "Image format does not match the atlas page"),
            TextError::ImageDataSize { expected, actual } => write!(
                f,
                "Image data has {} bytes, expected {}",
                actual, expected
            ),
            TextError::InvalidRange {
                start,
                end,
                text_len,
            } => write!(
                f,
                "Invalid text range: {}..{} (text length: {})",
                start, end, text_len
            ),
            TextError::DuplicateObject => write!(f, "Embedded object key already in use"),
            TextError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for TextError {}

impl From<std::io::Error> for TextError {
    fn from(err: std::io::Error) -> Self {
        TextError::Io(err.to_string())
    }
}

impl From<ttf_parser::FaceParsingError> for TextError {
    fn from(err: ttf_parser::FaceParsingError) -> Self {
        TextError::InvalidFontData(err.to_string())
    }
}

/// Result type for text operations.
pub type TextResult<T> = Result<T, TextError>;
